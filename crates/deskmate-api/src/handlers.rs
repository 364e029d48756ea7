//! Route handler functions for all API endpoints.
//!
//! Each handler extracts the authenticated user, path/query parameters and
//! JSON bodies via axum extractors, calls into the storage, chat and insight
//! crates, and returns JSON responses.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use deskmate_core::types::{ConversationEntry, NewFeedback, Rating, Shortcut, Speaker, User};
use deskmate_insight::{
    FeedbackReportGenerator, InterestProfile, LearningAnalyzer, LearningReport,
    PersonalizationAnalyzer, ReportOutcome,
};
use deskmate_storage::{
    ConversationRepository, FeedbackRepository, KnowledgeRepository, ShortcutRepository,
};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: u32 = 50;
const MAX_HISTORY_LIMIT: u32 = 500;
const DEFAULT_LEARNING_DAYS: u32 = 7;

// =============================================================================
// Request / query types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ShortcutRequest {
    pub text: Option<String>,
}

/// Every field is optional so that missing ones surface as 400, not 422.
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub user_query: Option<String>,
    pub bot_response: Option<String>,
    pub rating: Option<i64>,
    pub correction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InterestRequest {
    pub interest: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LearningParams {
    pub days: Option<u32>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub text: String,
    /// Local wall-clock time, `HH:MM`.
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub entries: Vec<ConversationEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShortcutsResponse {
    pub shortcuts: Vec<Shortcut>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KnowledgeUpdateResponse {
    pub message: String,
    pub key: String,
    pub created: bool,
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("'{field}' is required")))
}

// =============================================================================
// Health
// =============================================================================

/// GET /health - liveness plus the number of live sessions.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.sessions.len(),
    })
}

// =============================================================================
// Sessions and questions
// =============================================================================

/// POST /session - login: replace the caller's session with a fresh one.
pub async fn start_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session_id = state.sessions.start(user.id)?;
    tracing::info!(user_id = user.id, %session_id, "Login");
    Ok(Json(SessionResponse { session_id }))
}

/// DELETE /session - logout.
pub async fn end_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Json<MessageResponse> {
    let message = if state.sessions.end(user.id) {
        "Sessão encerrada."
    } else {
        "Nenhuma sessão ativa."
    };
    Json(MessageResponse {
        message: message.to_string(),
    })
}

/// POST /ask - answer one message in the caller's session.
pub async fn ask(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(body): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let message = body.message.unwrap_or_default();
    let (text, session_id) = state.sessions.ask(user.id, &message).await?;

    // The reply is already computed; a failed log write must not lose it.
    let log = ConversationRepository::new(state.database.clone());
    let session_id = session_id.to_string();
    for (speaker, content) in [(Speaker::User, message.as_str()), (Speaker::Model, text.as_str())] {
        if let Err(e) = log.append(user.id, &session_id, speaker, content) {
            tracing::warn!(user_id = user.id, error = %e, "Failed to log conversation line");
        }
    }

    Ok(Json(AskResponse {
        text,
        timestamp: chrono::Local::now().format("%H:%M").to_string(),
    }))
}

/// GET /history?limit=N - caller's conversation log, newest first.
pub async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    let entries = ConversationRepository::new(state.database.clone()).recent(user.id, limit)?;
    Ok(Json(HistoryResponse { entries }))
}

// =============================================================================
// Shortcuts
// =============================================================================

/// GET /shortcuts
pub async fn list_shortcuts(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<ShortcutsResponse>, ApiError> {
    let shortcuts = ShortcutRepository::new(state.database.clone()).list(user.id)?;
    Ok(Json(ShortcutsResponse { shortcuts }))
}

/// POST /shortcuts
pub async fn add_shortcut(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(body): Json<ShortcutRequest>,
) -> Result<(StatusCode, Json<Shortcut>), ApiError> {
    let text = required(body.text, "text")?;
    let shortcut = ShortcutRepository::new(state.database.clone()).add(user.id, text.trim())?;
    Ok((StatusCode::CREATED, Json(shortcut)))
}

/// DELETE /shortcuts/{id} - only the owner's shortcuts are visible.
pub async fn delete_shortcut(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !ShortcutRepository::new(state.database.clone()).delete(user.id, id)? {
        return Err(ApiError::NotFound(format!("Shortcut {} not found", id)));
    }
    Ok(Json(MessageResponse {
        message: "Atalho removido.".to_string(),
    }))
}

// =============================================================================
// Feedback
// =============================================================================

/// POST /feedback
pub async fn submit_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(body): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<FeedbackResponse>), ApiError> {
    let user_query = required(body.user_query, "user_query")?;
    let bot_response = required(body.bot_response, "bot_response")?;
    let rating = body
        .rating
        .ok_or_else(|| ApiError::BadRequest("'rating' is required".to_string()))?;
    let rating = Rating::try_from(rating)?;

    let record = FeedbackRepository::new(state.database.clone()).insert(&NewFeedback {
        user_id: user.id,
        user_query,
        bot_response,
        rating,
        correction: body.correction.filter(|c| !c.trim().is_empty()),
    })?;
    tracing::debug!(user_id = user.id, feedback_id = record.id, "Feedback stored");

    Ok((
        StatusCode::CREATED,
        Json(FeedbackResponse {
            id: record.id,
            message: "Obrigado pelo seu feedback!".to_string(),
        }),
    ))
}

// =============================================================================
// Personalization
// =============================================================================

/// GET /personalization/profile
pub async fn interest_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<InterestProfile>, ApiError> {
    let profile = PersonalizationAnalyzer::new(state.database.clone()).analyze_user_interests(user.id)?;
    Ok(Json(profile))
}

/// GET /personalization/suggestions
pub async fn suggestions(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Json<SuggestionsResponse> {
    let suggestions =
        PersonalizationAnalyzer::new(state.database.clone()).generate_personalized_suggestions(user.id);
    Json(SuggestionsResponse { suggestions })
}

/// POST /personalization/interest
pub async fn record_interest(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(body): Json<InterestRequest>,
) -> Result<(StatusCode, Json<Shortcut>), ApiError> {
    let interest = required(body.interest, "interest")?;
    let shortcut =
        PersonalizationAnalyzer::new(state.database.clone()).update_user_profile(user.id, &interest)?;
    Ok((StatusCode::CREATED, Json(shortcut)))
}

// =============================================================================
// Administration
// =============================================================================

/// GET /knowledge/{key} - the stored JSON document.
pub async fn get_knowledge(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    KnowledgeRepository::new(state.database.clone())
        .get(&key)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Chave não encontrada".to_string()))
}

/// POST /knowledge/{key} - replace the document and drop every session.
pub async fn put_knowledge(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(key): Path<String>,
    Json(content): Json<Value>,
) -> Result<Json<KnowledgeUpdateResponse>, ApiError> {
    let created = KnowledgeRepository::new(state.database.clone())
        .upsert(&key, &content)
        .map_err(|e| {
            tracing::error!(key = %key, error = %e, "Knowledge write failed");
            ApiError::Internal(e.to_string())
        })?;

    let dropped = state.sessions.invalidate_all();
    tracing::info!(user_id = user.id, key = %key, created, dropped, "Knowledge updated");

    Ok(Json(KnowledgeUpdateResponse {
        message: format!("'{key}' atualizado com sucesso!"),
        key,
        created,
    }))
}

/// GET /admin/learning?days=N
pub async fn learning_analysis(
    State(state): State<AppState>,
    Query(params): Query<LearningParams>,
) -> Response {
    let days = params.days.unwrap_or(DEFAULT_LEARNING_DAYS);
    let report = LearningAnalyzer::new(state.database.clone()).analyze_negative_feedback(days);
    let status = match report {
        LearningReport::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };
    (status, Json(report)).into_response()
}

/// GET /admin/report
pub async fn weekly_report(State(state): State<AppState>) -> Response {
    let outcome = FeedbackReportGenerator::new(state.database.clone()).generate_weekly_report();
    let status = match outcome {
        ReportOutcome::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        ReportOutcome::Report(_) => StatusCode::OK,
    };
    (status, Json(outcome)).into_response()
}
