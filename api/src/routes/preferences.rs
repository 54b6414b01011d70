use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use merlin_core::error::ApiError;
use merlin_core::records::{PreferenceFields, PreferenceRecord};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::records::single::{SingleRowWrite, fetch_preferences, upsert_single};
use crate::routes::SuccessResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/set-preferences", post(set_preferences))
        .route("/get-preferences", get(get_preferences))
}

/// Replace the caller's preferences. Omitted fields are stored as null.
#[utoipa::path(
    post,
    path = "/set-preferences",
    request_body = PreferenceFields,
    responses(
        (status = 200, description = "Preferences stored", body = SuccessResponse),
        (status = 400, description = "Missing token or malformed body", body = ApiError),
        (status = 401, description = "Token rejected", body = ApiError),
        (status = 500, description = "Record store error", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "preferences"
)]
pub async fn set_preferences(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    AppJson(fields): AppJson<PreferenceFields>,
) -> Result<Json<SuccessResponse>, AppError> {
    upsert_single(
        state.store.as_ref(),
        &user.user_id,
        SingleRowWrite::Preferences(fields),
    )
    .await?;
    Ok(Json(SuccessResponse::ok()))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum PreferencesResponse {
    Found(PreferenceRecord),
    Empty { preferences: Option<PreferenceRecord> },
}

impl From<Option<PreferenceRecord>> for PreferencesResponse {
    fn from(record: Option<PreferenceRecord>) -> Self {
        match record {
            Some(record) => PreferencesResponse::Found(record),
            None => PreferencesResponse::Empty { preferences: None },
        }
    }
}

/// The caller's preference row, or `{"preferences": null}` when none exists.
#[utoipa::path(
    get,
    path = "/get-preferences",
    responses(
        (status = 200, description = "Preference row or null marker", body = PreferencesResponse),
        (status = 400, description = "Missing token", body = ApiError),
        (status = 401, description = "Token rejected", body = ApiError),
        (status = 500, description = "Record store error", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "preferences"
)]
pub async fn get_preferences(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<PreferencesResponse>, AppError> {
    let record = fetch_preferences(state.store.as_ref(), &user.user_id).await?;
    Ok(Json(record.into()))
}
