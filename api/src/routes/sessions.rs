use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use merlin_core::error::ApiError;

use crate::auth::{AuthenticatedUser, BearerToken};
use crate::error::AppError;
use crate::extract::AppJson;
use crate::records::log::{AppendWrite, append, latest_session_summary};
use crate::routes::SuccessResponse;
use crate::state::AppState;

/// Characters of a summary that make it into the request log.
const SUMMARY_LOG_PREVIEW: usize = 60;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/save-session", post(save_session))
        .route("/latest-session-summary", get(latest_summary))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SaveSessionRequest {
    pub summary: Option<String>,
    /// Ordered transcript entries, stored as-is
    #[schema(value_type = Option<Vec<Object>>)]
    pub full_log: Option<Vec<Value>>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SummaryResponse {
    pub summary: String,
}

fn preview(summary: &str) -> String {
    summary.chars().take(SUMMARY_LOG_PREVIEW).collect()
}

#[utoipa::path(
    post,
    path = "/save-session",
    request_body = SaveSessionRequest,
    responses(
        (status = 200, description = "Session stored", body = SuccessResponse),
        (status = 400, description = "Missing token, summary or full_log", body = ApiError),
        (status = 401, description = "Token rejected", body = ApiError),
        (status = 500, description = "Record store error", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "sessions"
)]
pub async fn save_session(
    State(state): State<AppState>,
    token: BearerToken,
    AppJson(req): AppJson<SaveSessionRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let write = AppendWrite::session_log(req.summary, req.full_log)?;
    let user = token.resolve(state.identity.as_ref()).await?;
    if let AppendWrite::SessionLog { summary, full_log } = &write {
        tracing::info!(
            user_id = %user.user_id,
            summary = %preview(summary),
            entries = full_log.len(),
            "saving session"
        );
    }
    append(state.store.as_ref(), &user.user_id, write).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Summary of the caller's most recently started session, `""` when none.
#[utoipa::path(
    get,
    path = "/latest-session-summary",
    responses(
        (status = 200, description = "Latest summary", body = SummaryResponse),
        (status = 400, description = "Missing token", body = ApiError),
        (status = 401, description = "Token rejected", body = ApiError),
        (status = 500, description = "Record store error", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "sessions"
)]
pub async fn latest_summary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<SummaryResponse>, AppError> {
    let summary = latest_session_summary(state.store.as_ref(), &user.user_id)
        .await?
        .unwrap_or_default();
    Ok(Json(SummaryResponse { summary }))
}
