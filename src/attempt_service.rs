use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::attempt::{Attempt, AttemptPhase, QuizMode, SelectionOutcome};
use crate::errors::ApiError;
use crate::models::{OptionIndex, ScoreReport};
use crate::quiz_service::QuizService;
use crate::review::{practice_walkthrough, LabeledOption};
use crate::{log_attempt_event, log_service_error, log_service_warn};

/// How long a finished attempt stays readable before the sweeper drops it
pub const FINISHED_RETENTION_MINUTES: i64 = 30;

/// Question as shown while an attempt is running; the answer key stays hidden.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionPrompt {
    pub question_index: usize,
    pub question: String,
    pub options: Vec<LabeledOption>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptView {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub test_name: String,
    pub mode: QuizMode,
    pub phase: AttemptPhase,
    pub total_questions: usize,
    pub answered: usize,
    pub selections: HashMap<usize, OptionIndex>,
    pub current_question: Option<QuestionPrompt>,
    pub seconds_remaining: Option<i64>,
    pub report: Option<ScoreReport>,
}

impl AttemptView {
    fn from_attempt(attempt: &Attempt, now: DateTime<Utc>) -> Self {
        let current_question = attempt.current_question().and_then(|index| {
            // reuse the walkthrough labels but drop the revealed answer
            practice_walkthrough(&attempt.questions()[index..=index])
                .into_iter()
                .next()
                .map(|item| QuestionPrompt {
                    question_index: index,
                    question: item.question,
                    options: item.options,
                })
        });

        Self {
            id: attempt.id(),
            quiz_id: attempt.quiz_id(),
            test_name: attempt.test_name().to_string(),
            mode: attempt.mode(),
            phase: attempt.phase().clone(),
            total_questions: attempt.questions().len(),
            answered: attempt.selections().len(),
            selections: attempt
                .selections()
                .iter()
                .map(|(index, option)| (*index, *option))
                .collect(),
            current_question,
            seconds_remaining: attempt.seconds_remaining(now),
            report: attempt.report().cloned(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerResult {
    pub outcome: SelectionOutcome,
    pub attempt: AttemptView,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub timed_out: usize,
    pub finalized: usize,
    pub evicted: usize,
}

type AttemptRegistry = Arc<Mutex<HashMap<Uuid, Attempt>>>;

/// In-flight attempts keyed by id. Every finalized report is written back to the
/// quiz as its latest score.
#[derive(Clone)]
pub struct AttemptService {
    quiz_service: QuizService,
    attempts: AttemptRegistry,
    question_time_limit: Duration,
}

impl AttemptService {
    pub fn new(quiz_service: QuizService, seconds_per_question: u32) -> Self {
        Self {
            quiz_service,
            attempts: Arc::new(Mutex::new(HashMap::new())),
            question_time_limit: Duration::seconds(seconds_per_question as i64),
        }
    }

    fn registry(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Attempt>>> {
        self.attempts
            .lock()
            .map_err(|_| ApiError::InternalError("attempt registry lock poisoned".to_string()).into())
    }

    fn not_found(id: Uuid) -> anyhow::Error {
        ApiError::NotFound(format!("Attempt with id '{}' not found", id)).into()
    }

    pub async fn start(&self, quiz_id: Uuid, mode: QuizMode, now: DateTime<Utc>) -> Result<AttemptView> {
        let quiz = self
            .quiz_service
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Quiz with id '{}' not found", quiz_id)))?;

        let attempt = Attempt::start(&quiz, mode, self.question_time_limit, now)?;
        let view = AttemptView::from_attempt(&attempt, now);

        log_attempt_event!(started, attempt_id = attempt.id(), quiz_id = quiz_id, mode = mode);
        self.registry()?.insert(attempt.id(), attempt);
        Ok(view)
    }

    /// Current state, with any elapsed countdowns applied first
    pub async fn view(&self, id: Uuid, now: DateTime<Utc>) -> Result<AttemptView> {
        let (view, pending) = {
            let mut attempts = self.registry()?;
            let attempt = attempts.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
            let expired = attempt.tick(now);
            if !expired.is_empty() {
                log_attempt_event!(timed_out, attempt_id = id, questions = expired);
            }
            (AttemptView::from_attempt(attempt, now), Self::pending_report(attempt))
        };

        self.persist(pending).await;
        Ok(view)
    }

    pub async fn select(
        &self,
        id: Uuid,
        question_index: usize,
        option: OptionIndex,
        now: DateTime<Utc>,
    ) -> Result<AnswerResult> {
        let (result, pending) = {
            let mut attempts = self.registry()?;
            let attempt = attempts.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
            let outcome = attempt.select(question_index, option, now);
            // a rejected selection may still have run out the clock
            let pending = Self::pending_report(attempt);
            let result = outcome.map(|outcome| AnswerResult {
                outcome,
                attempt: AttemptView::from_attempt(attempt, now),
            });
            (result, pending)
        };

        self.persist(pending).await;
        Ok(result?)
    }

    pub async fn finish(&self, id: Uuid, now: DateTime<Utc>) -> Result<ScoreReport> {
        let (report, pending) = {
            let mut attempts = self.registry()?;
            let attempt = attempts.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
            let report = attempt.finish(now);
            (report, Self::pending_report(attempt))
        };

        self.persist(pending).await;
        Ok(report?)
    }

    /// Drop an attempt without scoring it. Its countdown goes with it.
    pub fn abandon(&self, id: Uuid) -> Result<bool> {
        Ok(self.registry()?.remove(&id).is_some())
    }

    pub fn active_count(&self) -> Result<usize> {
        Ok(self
            .registry()?
            .values()
            .filter(|attempt| !attempt.is_finished())
            .count())
    }

    /// Advance every attempt whose countdown ran out, persist what finished, and
    /// forget attempts that finished longer ago than the retention window.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepStats> {
        let retention = Duration::minutes(FINISHED_RETENTION_MINUTES);
        let mut stats = SweepStats::default();

        let pending: Vec<_> = {
            let mut attempts = self.registry()?;
            let mut pending = Vec::new();
            for attempt in attempts.values_mut() {
                let expired = attempt.tick(now);
                if !expired.is_empty() {
                    stats.timed_out += expired.len();
                    log_attempt_event!(timed_out, attempt_id = attempt.id(), questions = expired);
                }
                if let Some(report) = Self::pending_report(attempt) {
                    pending.push(report);
                }
            }

            let before = attempts.len();
            attempts.retain(|_, attempt| match attempt.finished_at() {
                Some(finished_at) => now - finished_at < retention,
                None => true,
            });
            stats.evicted = before - attempts.len();
            pending
        };

        stats.finalized = pending.len();
        for report in pending {
            self.persist(Some(report)).await;
        }
        Ok(stats)
    }

    fn pending_report(attempt: &mut Attempt) -> Option<(Uuid, Uuid, ScoreReport)> {
        attempt
            .take_finished_report()
            .map(|report| (attempt.id(), attempt.quiz_id(), report))
    }

    async fn persist(&self, pending: Option<(Uuid, Uuid, ScoreReport)>) {
        let Some((attempt_id, quiz_id, report)) = pending else {
            return;
        };

        log_attempt_event!(finished, attempt_id = attempt_id, correct = report.correct, total = report.total);
        match self.quiz_service.record_score(quiz_id, &report).await {
            Ok(true) => {}
            Ok(false) => {
                log_service_warn!(
                    "attempt_service",
                    "record_score",
                    format!("quiz {} was deleted before attempt {} finished", quiz_id, attempt_id)
                );
            }
            Err(e) => {
                log_service_error!("attempt_service", "record_score", quiz_id = quiz_id, error = e);
            }
        }
    }
}

/// Periodically apply elapsed countdowns so unattended timed attempts still finish.
pub fn spawn_deadline_sweeper(service: AttemptService, interval: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match service.sweep_expired(Utc::now()).await {
                Ok(stats) if stats != SweepStats::default() => {
                    tracing::debug!(
                        timed_out = stats.timed_out,
                        finalized = stats.finalized,
                        evicted = stats.evicted,
                        "Attempt sweep completed"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    log_service_error!("attempt_service", "sweep_expired", error = e);
                }
            }
        }
    })
}
