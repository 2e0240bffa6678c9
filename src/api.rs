use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    admin_sync::AdminSyncClient,
    attempt::QuizMode,
    attempt_service::{AnswerResult, AttemptService, AttemptView},
    errors::{classify_error, ApiError, ErrorContext},
    models::*,
    quiz_service::QuizService,
    review::{PracticeItem, QuizReview, ReviewFilter},
};

// Import logging macros
use crate::{api_error, log_api_error, log_api_start, log_api_success, log_api_warn};

#[derive(Clone)]
pub struct AppState {
    pub quiz_service: QuizService,
    pub attempt_service: AttemptService,
    pub sync_client: Option<AdminSyncClient>,
    /// Phrase a caller must echo back before anything is deleted
    pub delete_phrase: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct CategoryParams {
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct ReviewParams {
    pub filter: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteParams {
    pub confirm: Option<String>,
}

#[derive(Deserialize)]
pub struct StartAttemptRequest {
    pub mode: String,
}

#[derive(Deserialize)]
pub struct AnswerRequest {
    pub question_index: usize,
    /// Zero-based option, 0 for `A` through 3 for `D`
    pub option: u8,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ErrorResponse = (StatusCode, Json<ApiResponse<()>>);
type ApiResult<T> = Result<Json<ApiResponse<T>>, ErrorResponse>;

fn failure(error: anyhow::Error, context: ErrorContext) -> ErrorResponse {
    classify_error(error).to_response_with_context(context)
}

fn check_delete_phrase(state: &AppState, params: &DeleteParams) -> Result<(), ApiError> {
    let Some(expected) = state.delete_phrase.as_deref() else {
        return Ok(());
    };

    match params.confirm.as_deref() {
        Some(given) if given.trim().eq_ignore_ascii_case(expected) => Ok(()),
        _ => Err(ApiError::Forbidden(
            "Confirmation phrase does not match".to_string(),
        )),
    }
}

// Section endpoints
pub async fn create_section(
    State(state): State<AppState>,
    Json(request): Json<CreateSectionRequest>,
) -> ApiResult<Section> {
    info!(name = %request.name, "Creating section");

    match state.quiz_service.create_section(&request.name).await {
        Ok(section) => {
            log_api_success!("create_section", section_id = section.id, "section created");
            Ok(Json(ApiResponse::success(section)))
        }
        Err(e) => Err(failure(e, ErrorContext::new("create_section", "section"))),
    }
}

pub async fn list_sections(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<Section>> {
    debug!(query = ?params.q, "Listing sections");

    match state.quiz_service.list_sections(params.q.as_deref()).await {
        Ok(sections) => Ok(Json(ApiResponse::success(sections))),
        Err(e) => Err(failure(e, ErrorContext::new("list_sections", "section"))),
    }
}

pub async fn replace_sections(
    State(state): State<AppState>,
    Json(request): Json<ReplaceSectionsRequest>,
) -> ApiResult<Vec<Section>> {
    log_api_start!("replace_sections");

    match state.quiz_service.replace_sections(request.names).await {
        Ok(sections) => {
            log_api_success!("replace_sections", count = sections.len(), "sections replaced");
            Ok(Json(ApiResponse::success(sections)))
        }
        Err(e) => Err(failure(e, ErrorContext::new("replace_sections", "section"))),
    }
}

pub async fn rename_section(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateSectionRequest>,
) -> ApiResult<Section> {
    log_api_start!("rename_section", section_id = id);
    let context = || ErrorContext::new("rename_section", "section").with_id(&id.to_string());

    match state.quiz_service.rename_section(id, &request.name).await {
        Ok(Some(section)) => {
            log_api_success!("rename_section", section_id = id, "section renamed");
            Ok(Json(ApiResponse::success(section)))
        }
        Ok(None) => {
            let error = ApiError::NotFound(format!("Section with ID '{}' not found", id));
            Err(error.to_response_with_context(context()))
        }
        Err(e) => Err(failure(e, context())),
    }
}

pub async fn delete_section(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<bool> {
    log_api_start!("delete_section", section_id = id);
    let context = || ErrorContext::new("delete_section", "section").with_id(&id.to_string());

    check_delete_phrase(&state, &params).map_err(|e| e.to_response_with_context(context()))?;

    match state.quiz_service.delete_section(id).await {
        Ok(true) => {
            log_api_success!("delete_section", section_id = id, "section deleted");
            Ok(Json(ApiResponse::success(true)))
        }
        Ok(false) => {
            let error = ApiError::NotFound(format!("Section with ID '{}' not found", id));
            Err(error.to_response_with_context(context()))
        }
        Err(e) => Err(failure(e, context())),
    }
}

// Quiz endpoints
pub async fn preview_upload(
    State(state): State<AppState>,
    Json(request): Json<UploadPreviewRequest>,
) -> ApiResult<UploadPreview> {
    let preview = state.quiz_service.preview_upload(&request.file_content);
    debug!(
        question_count = preview.question_count,
        incomplete = preview.incomplete.len(),
        "Question file previewed"
    );
    Ok(Json(ApiResponse::success(preview)))
}

pub async fn create_quiz(
    State(state): State<AppState>,
    Json(request): Json<CreateQuizRequest>,
) -> ApiResult<QuizDefinition> {
    info!(
        test_name = %request.test_name,
        category = %request.category,
        "Creating new quiz"
    );

    match state.quiz_service.create_quiz(request).await {
        Ok(quiz) => {
            log_api_success!("create_quiz", quiz_id = quiz.id, "quiz created");
            Ok(Json(ApiResponse::success(quiz)))
        }
        Err(e) => Err(failure(e, ErrorContext::new("create_quiz", "quiz"))),
    }
}

pub async fn list_quizzes(
    State(state): State<AppState>,
    Query(params): Query<CategoryParams>,
) -> ApiResult<Vec<QuizDefinition>> {
    let result = match params.category.as_deref() {
        Some(category) => state.quiz_service.get_quizzes_by_category(category).await,
        None => state.quiz_service.get_all_quizzes().await,
    };

    match result {
        Ok(quizzes) => {
            debug!(quiz_count = quizzes.len(), category = ?params.category, "Quizzes listed");
            Ok(Json(ApiResponse::success(quizzes)))
        }
        Err(e) => Err(failure(e, ErrorContext::new("list_quizzes", "quiz"))),
    }
}

pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<QuizDefinition> {
    log_api_start!("get_quiz", quiz_id = id);

    match state.quiz_service.get_quiz(id).await {
        Ok(Some(quiz)) => {
            log_api_success!("get_quiz", quiz_id = id, "quiz retrieved successfully");
            Ok(Json(ApiResponse::success(quiz)))
        }
        Ok(None) => {
            log_api_warn!("get_quiz", quiz_id = id, "quiz not found");
            Err(api_error!(not_found, "get_quiz", "quiz", id))
        }
        Err(e) => {
            log_api_error!("get_quiz", quiz_id = id, error = e, "database error retrieving quiz");
            Err(api_error!(database, "get_quiz", "quiz", e))
        }
    }
}

pub async fn delete_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<bool> {
    info!(quiz_id = %id, "Deleting quiz");
    let context = || ErrorContext::new("delete_quiz", "quiz").with_id(&id.to_string());

    check_delete_phrase(&state, &params).map_err(|e| e.to_response_with_context(context()))?;

    match state.quiz_service.delete_quiz(id).await {
        Ok(true) => {
            info!(quiz_id = %id, "Quiz deleted successfully");
            Ok(Json(ApiResponse::success(true)))
        }
        Ok(false) => {
            let error = ApiError::NotFound(format!("Quiz with ID '{}' not found", id));
            Err(error.to_response_with_context(context()))
        }
        Err(e) => Err(failure(e, context())),
    }
}

pub async fn practice_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<PracticeItem>> {
    log_api_start!("practice_quiz", quiz_id = id);

    match state.quiz_service.practice(id).await {
        Ok(items) => Ok(Json(ApiResponse::success(items))),
        Err(e) => Err(failure(
            e,
            ErrorContext::new("practice_quiz", "quiz").with_id(&id.to_string()),
        )),
    }
}

pub async fn review_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ReviewParams>,
) -> ApiResult<QuizReview> {
    log_api_start!("review_quiz", quiz_id = id);
    let context = || ErrorContext::new("review_quiz", "quiz").with_id(&id.to_string());

    let filter = match params.filter.as_deref() {
        Some(raw) => raw
            .parse::<ReviewFilter>()
            .map_err(|e| api_error!(validation, "review_quiz", "quiz", e))?,
        None => ReviewFilter::All,
    };

    match state.quiz_service.review_latest(id, filter).await {
        Ok(review) => Ok(Json(ApiResponse::success(review))),
        Err(e) => Err(failure(e, context())),
    }
}

// Attempt endpoints
pub async fn start_attempt(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Json(request): Json<StartAttemptRequest>,
) -> ApiResult<AttemptView> {
    log_api_start!("start_attempt", quiz_id = quiz_id);
    let context = || ErrorContext::new("start_attempt", "quiz").with_id(&quiz_id.to_string());

    let mode = request
        .mode
        .parse::<QuizMode>()
        .map_err(|e| api_error!(validation, "start_attempt", "attempt", e))?;

    match state.attempt_service.start(quiz_id, mode, Utc::now()).await {
        Ok(view) => {
            log_api_success!("start_attempt", attempt_id = view.id, "attempt started");
            Ok(Json(ApiResponse::success(view)))
        }
        Err(e) => Err(failure(e, context())),
    }
}

pub async fn get_attempt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<AttemptView> {
    log_api_start!("get_attempt", attempt_id = id);

    match state.attempt_service.view(id, Utc::now()).await {
        Ok(view) => Ok(Json(ApiResponse::success(view))),
        Err(e) => Err(failure(
            e,
            ErrorContext::new("get_attempt", "attempt").with_id(&id.to_string()),
        )),
    }
}

pub async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AnswerRequest>,
) -> ApiResult<AnswerResult> {
    log_api_start!("submit_answer", attempt_id = id);
    let context = || ErrorContext::new("submit_answer", "attempt").with_id(&id.to_string());

    let Some(option) = OptionIndex::new(request.option as usize) else {
        let error = ApiError::ValidationError(format!(
            "Option {} is out of range 0..{}",
            request.option, OPTION_COUNT
        ));
        return Err(error.to_response_with_context(context()));
    };

    match state
        .attempt_service
        .select(id, request.question_index, option, Utc::now())
        .await
    {
        Ok(result) => {
            debug!(
                attempt_id = %id,
                question_index = request.question_index,
                is_correct = result.outcome.is_correct,
                "Answer recorded"
            );
            Ok(Json(ApiResponse::success(result)))
        }
        Err(e) => Err(failure(e, context())),
    }
}

pub async fn finish_attempt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ScoreReport> {
    log_api_start!("finish_attempt", attempt_id = id);

    match state.attempt_service.finish(id, Utc::now()).await {
        Ok(report) => {
            log_api_success!(
                "finish_attempt",
                attempt_id = id,
                format!("{}/{} correct", report.correct, report.total)
            );
            Ok(Json(ApiResponse::success(report)))
        }
        Err(e) => Err(failure(
            e,
            ErrorContext::new("finish_attempt", "attempt").with_id(&id.to_string()),
        )),
    }
}

pub async fn abandon_attempt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<bool> {
    let context = || ErrorContext::new("abandon_attempt", "attempt").with_id(&id.to_string());

    match state.attempt_service.abandon(id) {
        Ok(true) => {
            log_api_success!("abandon_attempt", attempt_id = id, "attempt discarded");
            Ok(Json(ApiResponse::success(true)))
        }
        Ok(false) => {
            let error = ApiError::NotFound(format!("Attempt with ID '{}' not found", id));
            Err(error.to_response_with_context(context()))
        }
        Err(e) => Err(failure(e, context())),
    }
}

// Admin endpoints
pub async fn admin_sync(
    State(state): State<AppState>,
    Json(credentials): Json<AdminCredentials>,
) -> ApiResult<SyncSummary> {
    log_api_start!("admin_sync");
    let context = || ErrorContext::new("admin_sync", "sync");

    let Some(client) = state.sync_client.as_ref() else {
        let error = ApiError::SyncError("no admin sync endpoint configured".to_string());
        return Err(error.to_response_with_context(
            context().with_user_message("Admin sync is not configured"),
        ));
    };

    let remote = client
        .fetch_quizzes(&credentials)
        .await
        .map_err(|e| failure(e, context()))?;

    match state.quiz_service.import_remote_quizzes(remote).await {
        Ok(summary) => {
            log_api_success!(
                "admin_sync",
                count = summary.quizzes_imported,
                "cloud data synchronized"
            );
            Ok(Json(ApiResponse::success(summary)))
        }
        Err(e) => Err(failure(e, context())),
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Section routes
        .route("/api/sections", post(create_section))
        .route("/api/sections", get(list_sections))
        .route("/api/sections", put(replace_sections))
        .route("/api/sections/:id", put(rename_section).delete(delete_section))

        // Quiz routes
        .route("/api/quizzes/preview", post(preview_upload))
        .route("/api/quizzes", post(create_quiz).get(list_quizzes))
        .route("/api/quizzes/:id", get(get_quiz).delete(delete_quiz))
        .route("/api/quizzes/:id/practice", get(practice_quiz))
        .route("/api/quizzes/:id/review", get(review_quiz))

        // Attempt routes
        .route("/api/quizzes/:id/attempts", post(start_attempt))
        .route("/api/attempts/:id", get(get_attempt).delete(abandon_attempt))
        .route("/api/attempts/:id/answers", post(submit_answer))
        .route("/api/attempts/:id/finish", post(finish_attempt))

        // Admin routes
        .route("/api/admin/sync", post(admin_sync))

        .with_state(state)
}
