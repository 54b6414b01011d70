use serde::Serialize;

pub mod auth;
pub mod commitments;
pub mod goals;
pub mod health;
pub mod preferences;
pub mod sessions;

/// `{"success": true}` acknowledgement for record writes.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
