use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Number of answer options a question file supplies per question (A..D)
pub const OPTION_COUNT: usize = 4;

/// Zero-based index of an answer option, always within `0..OPTION_COUNT`.
///
/// This is the single representation used when comparing a selection against an
/// answer key. Letter labels only appear at the presentation edge via [`OptionIndex::label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct OptionIndex(u8);

impl OptionIndex {
    pub fn new(index: usize) -> Option<Self> {
        if index < OPTION_COUNT {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }

    /// Display label, `A` for index 0 through `D` for index 3
    pub fn label(self) -> char {
        (b'A' + self.0) as char
    }

    /// Normalize a stored answer key.
    ///
    /// Question files write the key as a digit (`"0"`..`"3"`). A single letter
    /// `A`..`D` (any case) is accepted as the same index.
    pub fn from_answer_key(raw: &str) -> Option<Self> {
        let key = raw.trim();
        if let Ok(index) = key.parse::<usize>() {
            return Self::new(index);
        }

        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) if letter.is_ascii_alphabetic() => {
                let offset = letter.to_ascii_uppercase() as u32;
                offset
                    .checked_sub('A' as u32)
                    .and_then(|index| Self::new(index as usize))
            }
            _ => None,
        }
    }

    pub fn all() -> impl Iterator<Item = OptionIndex> {
        (0..OPTION_COUNT as u8).map(OptionIndex)
    }
}

impl TryFrom<u8> for OptionIndex {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value as usize)
            .ok_or_else(|| format!("option index {} out of range 0..{}", value, OPTION_COUNT))
    }
}

impl From<OptionIndex> for u8 {
    fn from(index: OptionIndex) -> Self {
        index.0
    }
}

impl fmt::Display for OptionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One question parsed from a question file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    /// Answer key exactly as written after `ANS:`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl QuestionRecord {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            a: None,
            b: None,
            c: None,
            d: None,
            answer: None,
        }
    }

    pub fn answer_index(&self) -> Option<OptionIndex> {
        self.answer.as_deref().and_then(OptionIndex::from_answer_key)
    }

    pub fn option(&self, index: OptionIndex) -> Option<&str> {
        match index.get() {
            0 => self.a.as_deref(),
            1 => self.b.as_deref(),
            2 => self.c.as_deref(),
            _ => self.d.as_deref(),
        }
    }

    pub fn option_mut(&mut self, index: OptionIndex) -> &mut Option<String> {
        match index.get() {
            0 => &mut self.a,
            1 => &mut self.b,
            2 => &mut self.c,
            _ => &mut self.d,
        }
    }

    /// All four options present and an answer key that normalizes
    pub fn is_complete(&self) -> bool {
        OptionIndex::all().all(|index| self.option(index).is_some()) && self.answer_index().is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizDefinition {
    pub id: Uuid,
    pub remote_id: Option<String>,
    pub test_name: String,
    pub category: String,
    pub description: String,
    pub questions: Vec<QuestionRecord>,
    pub total_questions: usize,
    pub latest_score: Option<ScoreReport>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of one completed attempt; at most one is retained per quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub correct: usize,
    pub wrong: usize,
    pub skipped: usize,
    pub total: usize,
    pub user_answers: Vec<Option<OptionIndex>>,
    /// Elapsed seconds for the attempt
    pub time_taken: Option<u64>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuiz {
    pub remote_id: Option<String>,
    pub test_name: String,
    pub category: String,
    pub description: String,
    pub questions: Vec<QuestionRecord>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuizRequest {
    pub test_name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    pub file_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPreviewRequest {
    pub file_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPreview {
    pub question_count: usize,
    pub questions: Vec<QuestionRecord>,
    /// Indices of questions missing an option or a usable answer key
    pub incomplete: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSectionRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceSectionsRequest {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

/// Quiz definition as returned by the admin sync endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteQuiz {
    #[serde(rename = "_id")]
    pub id: String,
    pub test_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_content: String,
    #[serde(default)]
    pub total_questions: Option<usize>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub quizzes_imported: usize,
    pub sections_added: usize,
}
