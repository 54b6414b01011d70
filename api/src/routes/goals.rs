use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use merlin_core::error::ApiError;

use crate::auth::{AuthenticatedUser, BearerToken};
use crate::error::AppError;
use crate::extract::AppJson;
use crate::records::single::{SingleRowWrite, fetch_goal_text, upsert_single};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/set-goal", post(set_goal))
        .route("/get-goal", get(get_goal))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SetGoalRequest {
    pub goal: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SetGoalResponse {
    pub success: bool,
    pub goal: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GoalResponse {
    pub goal: Option<String>,
}

#[utoipa::path(
    post,
    path = "/set-goal",
    request_body = SetGoalRequest,
    responses(
        (status = 200, description = "Goal stored", body = SetGoalResponse),
        (status = 400, description = "Missing token or goal", body = ApiError),
        (status = 401, description = "Token rejected", body = ApiError),
        (status = 500, description = "Record store error", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "goals"
)]
pub async fn set_goal(
    State(state): State<AppState>,
    token: BearerToken,
    AppJson(req): AppJson<SetGoalRequest>,
) -> Result<Json<SetGoalResponse>, AppError> {
    let write = SingleRowWrite::goal(req.goal)?;
    let goal = write.goal_text().unwrap_or_default().to_string();
    let user = token.resolve(state.identity.as_ref()).await?;
    upsert_single(state.store.as_ref(), &user.user_id, write).await?;
    Ok(Json(SetGoalResponse {
        success: true,
        goal,
    }))
}

#[utoipa::path(
    get,
    path = "/get-goal",
    responses(
        (status = 200, description = "Current goal text, null when unset", body = GoalResponse),
        (status = 400, description = "Missing token", body = ApiError),
        (status = 401, description = "Token rejected", body = ApiError),
        (status = 500, description = "Record store error", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "goals"
)]
pub async fn get_goal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<GoalResponse>, AppError> {
    let goal = fetch_goal_text(state.store.as_ref(), &user.user_id).await?;
    Ok(Json(GoalResponse { goal }))
}
