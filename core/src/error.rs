use serde::Serialize;
use utoipa::ToSchema;

/// Error body returned by every failing route.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error kind (see [`codes`])
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// Request field that failed validation, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Correlates the response with server logs
    pub request_id: String,
    /// How the caller can fix the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const MISSING_TOKEN: &str = "missing_token";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const INVALID_CREDENTIALS: &str = "invalid_credentials";
    pub const PROVIDER_ERROR: &str = "provider_error";
    pub const PERSISTENCE_ERROR: &str = "persistence_error";
}
