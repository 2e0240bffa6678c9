//! Presentation helpers for finished attempts and practice walkthroughs.
//!
//! This is the only place where option indices become `A`..`D` labels.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::{OptionIndex, QuestionRecord, ScoreReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerOutcome {
    Correct,
    Wrong,
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewFilter {
    #[default]
    All,
    Correct,
    Wrong,
    Skipped,
}

impl ReviewFilter {
    pub fn matches(self, outcome: AnswerOutcome) -> bool {
        match self {
            ReviewFilter::All => true,
            ReviewFilter::Correct => outcome == AnswerOutcome::Correct,
            ReviewFilter::Wrong => outcome == AnswerOutcome::Wrong,
            ReviewFilter::Skipped => outcome == AnswerOutcome::Skipped,
        }
    }

    pub fn empty_message(self) -> &'static str {
        match self {
            ReviewFilter::All => "No Questions Found",
            ReviewFilter::Correct => "No Correct Answers Found",
            ReviewFilter::Wrong => "No Wrong Answers Found",
            ReviewFilter::Skipped => "No Skipped Questions Found",
        }
    }
}

impl FromStr for ReviewFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(ReviewFilter::All),
            "correct" => Ok(ReviewFilter::Correct),
            "wrong" | "incorrect" => Ok(ReviewFilter::Wrong),
            "skipped" | "skip" => Ok(ReviewFilter::Skipped),
            other => Err(format!("Unknown review filter '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledOption {
    pub label: char,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEntry {
    /// 1-based position in the quiz
    pub number: usize,
    pub question: String,
    pub options: Vec<LabeledOption>,
    pub correct_label: Option<char>,
    pub your_label: Option<char>,
    pub outcome: AnswerOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizReview {
    pub test_name: String,
    pub filter: ReviewFilter,
    pub report: ScoreReport,
    pub percentage: u32,
    pub entries: Vec<ReviewEntry>,
    /// Set when the filter leaves nothing to show
    pub empty_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeItem {
    pub number: usize,
    pub question: String,
    pub options: Vec<LabeledOption>,
    pub correct_label: Option<char>,
    /// e.g. `(B) 4`
    pub correct_answer: Option<String>,
}

fn labeled_options(question: &QuestionRecord) -> Vec<LabeledOption> {
    OptionIndex::all()
        .map(|index| LabeledOption {
            label: index.label(),
            text: question.option(index).map(str::to_string),
        })
        .collect()
}

pub fn outcome_for(question: &QuestionRecord, selected: Option<OptionIndex>) -> AnswerOutcome {
    match selected {
        None => AnswerOutcome::Skipped,
        Some(selected) if question.answer_index() == Some(selected) => AnswerOutcome::Correct,
        Some(_) => AnswerOutcome::Wrong,
    }
}

/// Per-question breakdown of a report, restricted by `filter`.
///
/// Entries keep their real position in the quiz, even when several questions share
/// the same text.
pub fn review_answers(
    questions: &[QuestionRecord],
    report: &ScoreReport,
    filter: ReviewFilter,
) -> Vec<ReviewEntry> {
    questions
        .iter()
        .enumerate()
        .filter_map(|(index, question)| {
            let selected = report.user_answers.get(index).copied().flatten();
            let outcome = outcome_for(question, selected);
            if !filter.matches(outcome) {
                return None;
            }

            Some(ReviewEntry {
                number: index + 1,
                question: question.question.clone(),
                options: labeled_options(question),
                correct_label: question.answer_index().map(OptionIndex::label),
                your_label: selected.map(OptionIndex::label),
                outcome,
            })
        })
        .collect()
}

pub fn build_review(
    test_name: &str,
    questions: &[QuestionRecord],
    report: &ScoreReport,
    filter: ReviewFilter,
) -> QuizReview {
    let entries = review_answers(questions, report, filter);
    QuizReview {
        test_name: test_name.to_string(),
        filter,
        report: report.clone(),
        percentage: report.percentage(),
        empty_message: entries.is_empty().then(|| filter.empty_message().to_string()),
        entries,
    }
}

/// Read-only walkthrough with every answer revealed. Practice never produces a score.
pub fn practice_walkthrough(questions: &[QuestionRecord]) -> Vec<PracticeItem> {
    questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let answer = question.answer_index();
            PracticeItem {
                number: index + 1,
                question: question.question.clone(),
                options: labeled_options(question),
                correct_label: answer.map(OptionIndex::label),
                correct_answer: answer.map(|a| {
                    format!("({}) {}", a.label(), question.option(a).unwrap_or_default())
                }),
            }
        })
        .collect()
}
