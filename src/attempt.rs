use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::{OptionIndex, QuestionRecord, QuizDefinition, ScoreReport};
use crate::scoring::score;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizMode {
    Practice,
    Exam,
    #[serde(alias = "timer")]
    Timed,
}

impl FromStr for QuizMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "practice" => Ok(QuizMode::Practice),
            "exam" => Ok(QuizMode::Exam),
            "timed" | "timer" => Ok(QuizMode::Timed),
            other => Err(format!("Unknown quiz mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttemptPhase {
    /// Exam mode: any unanswered question may be answered
    Open,
    /// Timed mode: waiting on the current question until `deadline`
    AwaitingAnswer {
        question_index: usize,
        deadline: DateTime<Utc>,
    },
    /// Timed mode: current question resolved, countdown cleared
    Transitioning { question_index: usize },
    Finished,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AttemptError {
    #[error("Practice mode is a read-only walkthrough and cannot be scored")]
    PracticeNotScored,

    #[error("Quiz has no questions")]
    EmptyQuiz,

    #[error("Question index {index} is out of range for a quiz of {total} questions")]
    QuestionOutOfRange { index: usize, total: usize },

    #[error("Question {0} has already been answered")]
    AlreadyAnswered(usize),

    #[error("Question {requested} is not the current question ({current})")]
    NotCurrentQuestion { requested: usize, current: usize },

    #[error("Attempt has already finished")]
    AlreadyFinished,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionOutcome {
    pub question_index: usize,
    pub selected: OptionIndex,
    pub correct_option: Option<OptionIndex>,
    pub is_correct: bool,
}

/// One pass through a quiz in exam or timed mode.
///
/// Every transition takes the current time explicitly, so countdown behaviour is
/// driven by whoever polls the attempt rather than by stored callbacks.
#[derive(Debug, Clone)]
pub struct Attempt {
    id: Uuid,
    quiz_id: Uuid,
    test_name: String,
    mode: QuizMode,
    questions: Vec<QuestionRecord>,
    selections: BTreeMap<usize, OptionIndex>,
    timed_out: BTreeSet<usize>,
    phase: AttemptPhase,
    question_time_limit: Duration,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    report: Option<ScoreReport>,
    report_pending: bool,
}

impl Attempt {
    pub fn start(
        quiz: &QuizDefinition,
        mode: QuizMode,
        question_time_limit: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        let phase = match mode {
            QuizMode::Practice => return Err(AttemptError::PracticeNotScored),
            _ if quiz.questions.is_empty() => return Err(AttemptError::EmptyQuiz),
            QuizMode::Exam => AttemptPhase::Open,
            QuizMode::Timed => AttemptPhase::AwaitingAnswer {
                question_index: 0,
                deadline: now + question_time_limit,
            },
        };

        Ok(Self {
            id: Uuid::new_v4(),
            quiz_id: quiz.id,
            test_name: quiz.test_name.clone(),
            mode,
            questions: quiz.questions.clone(),
            selections: BTreeMap::new(),
            timed_out: BTreeSet::new(),
            phase,
            question_time_limit,
            started_at: now,
            finished_at: None,
            report: None,
            report_pending: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn quiz_id(&self) -> Uuid {
        self.quiz_id
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn mode(&self) -> QuizMode {
        self.mode
    }

    pub fn phase(&self) -> &AttemptPhase {
        &self.phase
    }

    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    pub fn selections(&self) -> &BTreeMap<usize, OptionIndex> {
        &self.selections
    }

    pub fn timed_out(&self) -> &BTreeSet<usize> {
        &self.timed_out
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn report(&self) -> Option<&ScoreReport> {
        self.report.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == AttemptPhase::Finished
    }

    pub fn current_question(&self) -> Option<usize> {
        match self.phase {
            AttemptPhase::AwaitingAnswer { question_index, .. } => Some(question_index),
            _ => None,
        }
    }

    /// Whole seconds left on the current question's countdown
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        match self.phase {
            AttemptPhase::AwaitingAnswer { deadline, .. } => {
                Some((deadline - now).num_seconds().max(0))
            }
            _ => None,
        }
    }

    /// Apply every countdown that has elapsed by `now`.
    ///
    /// Each timeout records no selection for its question and moves on; the next
    /// countdown starts at the elapsed deadline, not at `now`. Returns the indices
    /// of the questions that timed out.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<usize> {
        let mut expired = Vec::new();
        while let AttemptPhase::AwaitingAnswer {
            question_index,
            deadline,
        } = self.phase
        {
            if deadline > now {
                break;
            }
            self.timed_out.insert(question_index);
            self.phase = AttemptPhase::Transitioning { question_index };
            self.advance(deadline);
            expired.push(question_index);
        }
        expired
    }

    pub fn select(
        &mut self,
        question_index: usize,
        option: OptionIndex,
        now: DateTime<Utc>,
    ) -> Result<SelectionOutcome, AttemptError> {
        if self.is_finished() {
            return Err(AttemptError::AlreadyFinished);
        }

        let total = self.questions.len();
        if question_index >= total {
            return Err(AttemptError::QuestionOutOfRange {
                index: question_index,
                total,
            });
        }

        match self.mode {
            QuizMode::Timed => {
                self.tick(now);
                match self.phase {
                    AttemptPhase::Finished => return Err(AttemptError::AlreadyFinished),
                    AttemptPhase::AwaitingAnswer {
                        question_index: current,
                        ..
                    } if current != question_index => {
                        return Err(AttemptError::NotCurrentQuestion {
                            requested: question_index,
                            current,
                        });
                    }
                    _ => {}
                }
            }
            _ => {
                if self.selections.contains_key(&question_index) {
                    return Err(AttemptError::AlreadyAnswered(question_index));
                }
            }
        }

        self.selections.insert(question_index, option);
        let correct_option = self.questions[question_index].answer_index();

        if self.mode == QuizMode::Timed {
            self.phase = AttemptPhase::Transitioning { question_index };
            self.advance(now);
        }

        Ok(SelectionOutcome {
            question_index,
            selected: option,
            correct_option,
            is_correct: correct_option == Some(option),
        })
    }

    /// Submit the attempt. Questions without a selection count as skipped.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<ScoreReport, AttemptError> {
        if self.is_finished() {
            return Err(AttemptError::AlreadyFinished);
        }

        self.tick(now);
        if !self.is_finished() {
            self.finalize(now);
        }

        self.report.clone().ok_or(AttemptError::AlreadyFinished)
    }

    /// The finalized report, handed out once so it is persisted exactly once
    pub fn take_finished_report(&mut self) -> Option<ScoreReport> {
        if !self.report_pending {
            return None;
        }
        self.report_pending = false;
        self.report.clone()
    }

    fn advance(&mut self, now: DateTime<Utc>) {
        let AttemptPhase::Transitioning { question_index } = self.phase else {
            return;
        };

        let next = question_index + 1;
        if next < self.questions.len() {
            self.phase = AttemptPhase::AwaitingAnswer {
                question_index: next,
                deadline: now + self.question_time_limit,
            };
        } else {
            self.finalize(now);
        }
    }

    fn finalize(&mut self, now: DateTime<Utc>) {
        let elapsed = (now - self.started_at).num_seconds().max(0) as u64;
        let report = score(&self.questions, &self.selections)
            .with_time_taken(elapsed)
            .with_date(now);

        self.phase = AttemptPhase::Finished;
        self.finished_at = Some(now);
        self.report = Some(report);
        self.report_pending = true;
    }
}
