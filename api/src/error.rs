use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use merlin_core::error::{self, ApiError};

use crate::ids::IdsError;
use crate::middleware::request_id::current_request_id;
use crate::records::RecordError;
use crate::store::StoreError;

/// Every failure a route can produce. `status` and `code` form the single
/// table mapping kinds to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed client input (400)
    Validation {
        message: String,
        field: Option<String>,
        docs_hint: Option<String>,
    },
    /// No bearer token on an authenticated route (400)
    MissingToken,
    /// The identity service did not accept the bearer token (401)
    Unauthenticated { message: String },
    /// Login produced no user or no session (401)
    InvalidCredentials,
    /// The identity service rejected a signup, login, or reset (400)
    Provider { message: String },
    /// Record store failure (500)
    Persistence(StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::MissingToken | AppError::Provider { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthenticated { .. } | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => error::codes::VALIDATION_FAILED,
            AppError::MissingToken => error::codes::MISSING_TOKEN,
            AppError::Unauthenticated { .. } => error::codes::UNAUTHORIZED,
            AppError::InvalidCredentials => error::codes::INVALID_CREDENTIALS,
            AppError::Provider { .. } => error::codes::PROVIDER_ERROR,
            AppError::Persistence(_) => error::codes::PERSISTENCE_ERROR,
        }
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
            docs_hint: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let request_id = current_request_id();

        let (message, field, docs_hint) = match self {
            AppError::Validation {
                message,
                field,
                docs_hint,
            } => (message, field, docs_hint),
            AppError::MissingToken => (
                "Missing token".to_string(),
                None,
                Some(
                    "Send 'Authorization: Bearer <access_token>' from /login or /signup."
                        .to_string(),
                ),
            ),
            AppError::Unauthenticated { message } => (
                message,
                None,
                Some("Log in again to obtain a fresh access token.".to_string()),
            ),
            AppError::InvalidCredentials => ("Invalid email or password".to_string(), None, None),
            AppError::Provider { message } => (message, None, None),
            AppError::Persistence(err) => {
                tracing::error!(request_id = %request_id, "Persistence error: {err}");
                (err.to_string(), None, None)
            }
        };

        (
            status,
            Json(ApiError {
                error: code.to_string(),
                message,
                field,
                request_id,
                docs_hint,
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Persistence(err)
    }
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Validation { field, message } => AppError::validation(field, message),
            RecordError::Persistence(err) => AppError::Persistence(err),
        }
    }
}

/// Failures of signup, login, and password reset calls.
impl From<IdsError> for AppError {
    fn from(err: IdsError) -> Self {
        AppError::Provider {
            message: err.to_string(),
        }
    }
}
