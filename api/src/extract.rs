//! JSON body extractor whose rejections use the API's error body.
//!
//! axum's own `Json` answers malformed bodies with a plain-text 4xx;
//! `AppJson` turns them into `AppError::Validation` naming the field serde
//! complained about.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;

pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(map_json_rejection(rejection)),
        }
    }
}

pub fn map_json_rejection(rejection: JsonRejection) -> AppError {
    let body_text = rejection.body_text();
    AppError::Validation {
        field: Some(field_from_serde_message(&body_text).unwrap_or_else(|| "body".to_string())),
        message: format!("Invalid request body: {body_text}"),
        docs_hint: Some(
            "Send a JSON object with 'Content-Type: application/json' (schema at /api-doc/openapi.json)."
                .to_string(),
        ),
    }
}

/// Field named by serde's "missing field `x`" / "unknown field `x`" errors.
fn field_from_serde_message(msg: &str) -> Option<String> {
    ["missing field `", "unknown field `"]
        .iter()
        .find_map(|marker| {
            let after = &msg[msg.find(marker)? + marker.len()..];
            after.find('`').map(|end| after[..end].to_string())
        })
}
