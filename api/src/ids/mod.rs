//! Identity side of the identity & data service: signup, password login,
//! password recovery, and token-to-user resolution. Token validation itself
//! is always left to the service.

use async_trait::async_trait;
use merlin_core::identity::{AuthOutcome, IdsUser};

pub mod client;
pub mod gotrue;

#[derive(Debug, thiserror::Error)]
pub enum IdsError {
    #[error("identity service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected identity service response: {0}")]
    Decode(String),
    #[error("invalid identity service endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, request: &SignUp) -> Result<AuthOutcome, IdsError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome, IdsError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), IdsError>;

    /// Resolve an access token to the user it was issued to.
    async fn get_user(&self, access_token: &str) -> Result<IdsUser, IdsError>;
}
