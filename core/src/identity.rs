//! Identity shapes as the identity service returns them, and the stable
//! public shape the API hands back to callers.
//!
//! Callers never see the provider's native user object. `normalize` copies
//! the handful of fields clients depend on and refuses to produce a body
//! unless both a user and a session were issued.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Metadata key holding the display name chosen at signup.
pub const DISPLAY_NAME_KEY: &str = "display_name";

const BEARER_PREFIX: &str = "Bearer ";

/// User object as issued by the identity service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct IdsUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub aud: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub user_metadata: serde_json::Map<String, serde_json::Value>,
}

impl IdsUser {
    /// Display name stored in metadata at signup, or `""`.
    pub fn display_name(&self) -> String {
        self.user_metadata
            .get(DISPLAY_NAME_KEY)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }
}

/// Session tokens as issued by the identity service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct IdsSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// Result of a signup or password login. Either half may be missing:
/// signup with email confirmation enabled yields a user but no session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthOutcome {
    pub user: Option<IdsUser>,
    pub session: Option<IdsSession>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct PublicUser {
    pub id: String,
    pub email: Option<String>,
    pub created_at: String,
    /// Token audience
    pub aud: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct PublicSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
    pub token_type: String,
}

/// Body returned by `/signup` and `/login`.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct NormalizedAuth {
    pub user: PublicUser,
    pub session: PublicSession,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IncompleteAuth {
    #[error("identity service returned no user")]
    MissingUser,
    #[error("identity service returned no session")]
    MissingSession,
}

/// Map a provider auth result onto the public shape.
///
/// `display_name` overrides the metadata value when given (signup echoes the
/// name it just submitted).
pub fn normalize(
    outcome: AuthOutcome,
    display_name: Option<String>,
) -> Result<NormalizedAuth, IncompleteAuth> {
    let user = outcome.user.ok_or(IncompleteAuth::MissingUser)?;
    let session = outcome.session.ok_or(IncompleteAuth::MissingSession)?;
    let display_name = display_name.unwrap_or_else(|| user.display_name());

    Ok(NormalizedAuth {
        user: PublicUser {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
            aud: user.aud,
            role: user.role,
        },
        session: PublicSession {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_in: session.expires_in,
            token_type: session.token_type,
        },
        display_name,
    })
}

/// Pull the token out of an `Authorization` header value.
///
/// The `Bearer ` prefix is optional. Returns `None` when nothing is left.
pub fn parse_bearer(header: Option<&str>) -> Option<&str> {
    let raw = header?;
    let token = raw.strip_prefix(BEARER_PREFIX).unwrap_or(raw).trim();
    (!token.is_empty()).then_some(token)
}
