use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::warn;

use crate::models::{OptionIndex, QuestionRecord, ScoreReport};

/// Score selections against the answer keys.
///
/// Keys of `selections` are question indices. Indices outside the question list are
/// ignored so that `correct + wrong + skipped == total` always holds.
pub fn score(questions: &[QuestionRecord], selections: &BTreeMap<usize, OptionIndex>) -> ScoreReport {
    let total = questions.len();
    let mut user_answers = vec![None; total];
    let mut correct = 0;
    let mut wrong = 0;

    for (&index, &selected) in selections {
        let Some(question) = questions.get(index) else {
            warn!(
                question_index = index,
                total_questions = total,
                "Ignoring selection for question outside the quiz"
            );
            continue;
        };

        user_answers[index] = Some(selected);
        if question.answer_index() == Some(selected) {
            correct += 1;
        } else {
            wrong += 1;
        }
    }

    ScoreReport {
        correct,
        wrong,
        skipped: total - correct - wrong,
        total,
        user_answers,
        time_taken: None,
        date: Utc::now(),
    }
}

impl ScoreReport {
    pub fn with_time_taken(mut self, seconds: u64) -> Self {
        self.time_taken = Some(seconds);
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    /// Share of correct answers, rounded to a whole percent
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.correct as f64 / self.total as f64) * 100.0).round() as u32
    }

    pub fn is_consistent(&self) -> bool {
        self.correct + self.wrong + self.skipped == self.total && self.user_answers.len() == self.total
    }
}
