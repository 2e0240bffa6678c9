use anyhow::Result;
use std::collections::HashSet;
use std::time::Instant;
use uuid::Uuid;

use crate::database::Database;
use crate::errors::ApiError;
use crate::models::*;
use crate::parser;
use crate::review::{self, PracticeItem, QuizReview, ReviewFilter};
use crate::{log_service_start, log_service_success, log_service_warn, log_validation};

#[derive(Clone)]
pub struct QuizService {
    db: Database,
}

impl QuizService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // Quiz operations
    pub fn preview_upload(&self, file_content: &str) -> UploadPreview {
        parser::preview_upload(file_content)
    }

    pub async fn create_quiz(&self, request: CreateQuizRequest) -> Result<QuizDefinition> {
        let test_name = request.test_name.trim().to_string();
        let category = request.category.trim().to_string();

        if test_name.is_empty() {
            return Err(ApiError::ValidationError("Test name is required".to_string()).into());
        }
        if category.is_empty() {
            return Err(ApiError::ValidationError("Category is required".to_string()).into());
        }

        let questions = parser::parse_questions(&request.file_content);
        if questions.is_empty() {
            log_validation!(failure, "upload", error = "no questions found in file");
            return Err(ApiError::ValidationError(
                "Question file contains no questions".to_string(),
            )
            .into());
        }

        let quiz = self
            .db
            .create_quiz(NewQuiz {
                remote_id: None,
                test_name,
                category,
                description: request.description.unwrap_or_default().trim().to_string(),
                questions,
                created_at: None,
            })
            .await?;

        log_service_success!(
            "quiz_service",
            "create_quiz",
            quiz_id = quiz.id,
            question_count = quiz.total_questions
        );
        Ok(quiz)
    }

    pub async fn get_quiz(&self, id: Uuid) -> Result<Option<QuizDefinition>> {
        self.db.get_quiz(id).await
    }

    pub async fn get_all_quizzes(&self) -> Result<Vec<QuizDefinition>> {
        self.db.get_all_quizzes().await
    }

    pub async fn get_quizzes_by_category(&self, category: &str) -> Result<Vec<QuizDefinition>> {
        self.db.get_quizzes_by_category(category).await
    }

    pub async fn delete_quiz(&self, id: Uuid) -> Result<bool> {
        self.db.delete_quiz(id).await
    }

    /// Overwrite the quiz's latest score. `false` when the quiz is gone.
    pub async fn record_score(&self, id: Uuid, report: &ScoreReport) -> Result<bool> {
        self.db.update_latest_score(id, report).await
    }

    pub async fn review_latest(&self, id: Uuid, filter: ReviewFilter) -> Result<QuizReview> {
        let quiz = self.require_quiz(id).await?;
        let Some(report) = quiz.latest_score.as_ref() else {
            return Err(ApiError::NotFound(format!(
                "Quiz '{}' has not been attempted yet",
                quiz.test_name
            ))
            .into());
        };

        Ok(review::build_review(&quiz.test_name, &quiz.questions, report, filter))
    }

    pub async fn practice(&self, id: Uuid) -> Result<Vec<PracticeItem>> {
        let quiz = self.require_quiz(id).await?;
        Ok(review::practice_walkthrough(&quiz.questions))
    }

    async fn require_quiz(&self, id: Uuid) -> Result<QuizDefinition> {
        match self.db.get_quiz(id).await? {
            Some(quiz) => Ok(quiz),
            None => Err(ApiError::NotFound(format!("Quiz with id '{}' not found", id)).into()),
        }
    }

    // Section operations
    pub async fn create_section(&self, name: &str) -> Result<Section> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::ValidationError("Section name is required".to_string()).into());
        }

        let existing = self.db.get_all_sections().await?;
        if existing.iter().any(|section| section.name.eq_ignore_ascii_case(name)) {
            return Err(ApiError::DuplicateResource(format!("Section '{}' already exists", name)).into());
        }

        self.db.create_section(name.to_string()).await
    }

    /// All sections, or those whose name contains `query` ignoring case
    pub async fn list_sections(&self, query: Option<&str>) -> Result<Vec<Section>> {
        let sections = self.db.get_all_sections().await?;
        let query = query.map(str::trim).filter(|q| !q.is_empty());

        Ok(match query {
            Some(query) => {
                let needle = query.to_lowercase();
                sections
                    .into_iter()
                    .filter(|section| section.name.to_lowercase().contains(&needle))
                    .collect()
            }
            None => sections,
        })
    }

    pub async fn replace_sections(&self, names: Vec<String>) -> Result<Vec<Section>> {
        // first spelling of a name wins; later case variants are dropped
        let mut seen = HashSet::new();
        let names: Vec<String> = names
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty() && seen.insert(name.to_ascii_lowercase()))
            .collect();

        self.db.replace_all_sections(names).await
    }

    pub async fn rename_section(&self, id: Uuid, name: &str) -> Result<Option<Section>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::ValidationError("Section name is required".to_string()).into());
        }

        let existing = self.db.get_all_sections().await?;
        if existing
            .iter()
            .any(|section| section.id != id && section.name.eq_ignore_ascii_case(name))
        {
            return Err(ApiError::DuplicateResource(format!("Section '{}' already exists", name)).into());
        }

        self.db.rename_section(id, name.to_string()).await
    }

    pub async fn delete_section(&self, id: Uuid) -> Result<bool> {
        self.db.delete_section(id).await
    }

    /// Store quizzes pulled from the admin endpoint and register their categories.
    ///
    /// A quiz already imported under the same remote id is overwritten, score included.
    pub async fn import_remote_quizzes(&self, remote: Vec<RemoteQuiz>) -> Result<SyncSummary> {
        let start = Instant::now();
        log_service_start!("quiz_service", "import_remote_quizzes", quiz_count = remote.len());

        let mut known_sections: HashSet<String> = self
            .db
            .get_all_sections()
            .await?
            .into_iter()
            .map(|section| section.name.to_ascii_lowercase())
            .collect();

        let mut summary = SyncSummary::default();
        for quiz in remote {
            let questions = parser::parse_questions(&quiz.file_content);
            if let Some(reported) = quiz.total_questions {
                if reported != questions.len() {
                    log_service_warn!(
                        "quiz_service",
                        "import_remote_quizzes",
                        format!(
                            "remote quiz '{}' reports {} questions but {} were parsed",
                            quiz.id,
                            reported,
                            questions.len()
                        )
                    );
                }
            }

            let category = quiz.category.as_deref().map(str::trim).unwrap_or_default().to_string();

            self.db
                .upsert_remote_quiz(NewQuiz {
                    remote_id: Some(quiz.id),
                    test_name: quiz.test_name,
                    category: category.clone(),
                    description: quiz.description.unwrap_or_default(),
                    questions,
                    created_at: quiz.created_at,
                })
                .await?;
            summary.quizzes_imported += 1;

            if !category.is_empty() && known_sections.insert(category.to_ascii_lowercase()) {
                self.db.create_section(category).await?;
                summary.sections_added += 1;
            }
        }

        log_service_success!(
            "quiz_service",
            "import_remote_quizzes",
            quiz_count = summary.quizzes_imported,
            duration_ms = start.elapsed().as_millis() as u64
        );
        Ok(summary)
    }
}
