use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use merlin_core::error::ApiError;
use merlin_core::records::CommitmentRecord;

use crate::auth::{AuthenticatedUser, BearerToken};
use crate::error::AppError;
use crate::extract::AppJson;
use crate::records::log::{AppendWrite, append, list_commitments};
use crate::routes::SuccessResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add-commitment", post(add_commitment))
        .route("/get-commitments", get(get_commitments))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AddCommitmentRequest {
    pub commitment_text: Option<String>,
    /// Calendar date, `YYYY-MM-DD`
    #[serde(default)]
    pub due_date: Option<String>,
}

#[utoipa::path(
    post,
    path = "/add-commitment",
    request_body = AddCommitmentRequest,
    responses(
        (status = 200, description = "Commitment appended", body = SuccessResponse),
        (status = 400, description = "Missing token, missing text or bad due_date", body = ApiError),
        (status = 401, description = "Token rejected", body = ApiError),
        (status = 500, description = "Record store error", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "commitments"
)]
pub async fn add_commitment(
    State(state): State<AppState>,
    token: BearerToken,
    AppJson(req): AppJson<AddCommitmentRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let write = AppendWrite::commitment(req.commitment_text, req.due_date)?;
    let user = token.resolve(state.identity.as_ref()).await?;
    append(state.store.as_ref(), &user.user_id, write).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Every commitment of the caller, earliest due date first; undated last.
#[utoipa::path(
    get,
    path = "/get-commitments",
    responses(
        (status = 200, description = "Commitments ordered by due date", body = Vec<CommitmentRecord>),
        (status = 400, description = "Missing token", body = ApiError),
        (status = 401, description = "Token rejected", body = ApiError),
        (status = 500, description = "Record store error", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "commitments"
)]
pub async fn get_commitments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<CommitmentRecord>>, AppError> {
    let commitments = list_commitments(state.store.as_ref(), &user.user_id).await?;
    Ok(Json(commitments))
}
