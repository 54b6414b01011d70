use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use merlin_core::identity::parse_bearer;

use crate::error::AppError;
use crate::ids::{IdentityProvider, IdsError};
use crate::state::AppState;

/// Caller identity resolved from `Authorization: Bearer <token>`.
///
/// Resolution always goes to the identity service; tokens are neither cached
/// nor verified locally. A request without a token is rejected before any
/// outbound call.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: Option<String>,
}

/// Exchange a bearer token for the user it belongs to.
pub async fn resolve_token(
    identity: &dyn IdentityProvider,
    header: Option<&str>,
) -> Result<AuthenticatedUser, AppError> {
    let token = parse_bearer(header).ok_or(AppError::MissingToken)?;
    lookup_user(identity, token).await
}

async fn lookup_user(
    identity: &dyn IdentityProvider,
    token: &str,
) -> Result<AuthenticatedUser, AppError> {
    let user = identity.get_user(token).await.map_err(|err| {
        tracing::info!(error = %err, "bearer token rejected by identity service");
        AppError::Unauthenticated {
            message: unauthenticated_message(&err).to_string(),
        }
    })?;

    if user.id.is_empty() {
        return Err(AppError::Unauthenticated {
            message: "Token is not bound to a user".to_string(),
        });
    }

    Ok(AuthenticatedUser {
        user_id: user.id,
        email: user.email,
    })
}

/// Caller-facing text for a failed token lookup. Provider detail stays in
/// the logs.
fn unauthenticated_message(err: &IdsError) -> &'static str {
    match err {
        IdsError::Rejected { .. } => "Invalid or expired token",
        IdsError::Transport(_) | IdsError::Endpoint(_) | IdsError::Decode(_) => {
            "Could not verify token"
        }
    }
}

/// Bearer token taken from the headers alone, not yet checked with the
/// identity service.
///
/// Handlers with a request body extract this instead of
/// [`AuthenticatedUser`] so malformed input is rejected before any
/// outbound call, then [`BearerToken::resolve`] once the body is valid.
#[derive(Debug, Clone)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn from_header(header: Option<&str>) -> Result<Self, AppError> {
        parse_bearer(header)
            .map(|token| BearerToken(token.to_string()))
            .ok_or(AppError::MissingToken)
    }

    pub async fn resolve(
        &self,
        identity: &dyn IdentityProvider,
    ) -> Result<AuthenticatedUser, AppError> {
        lookup_user(identity, &self.0).await
    }
}

fn authorization(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        BearerToken::from_header(authorization(parts))
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_token(state.identity.as_ref(), authorization(parts)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeIdentity;

    #[tokio::test]
    async fn missing_or_blank_token_never_calls_provider() {
        let identity = FakeIdentity::new();
        for header in [None, Some(""), Some("Bearer "), Some("Bearer    ")] {
            let err = resolve_token(&identity, header).await.unwrap_err();
            assert!(matches!(err, AppError::MissingToken), "{header:?}");
        }
        assert_eq!(identity.get_user_calls(), 0);
    }

    #[tokio::test]
    async fn known_token_resolves_user() {
        let identity = FakeIdentity::new().with_user("tok-ada", "user-ada", "ada@example.com");
        let user = resolve_token(&identity, Some("Bearer tok-ada")).await.unwrap();
        assert_eq!(user.user_id, "user-ada");
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn token_without_prefix_is_accepted() {
        let identity = FakeIdentity::new().with_user("tok-ada", "user-ada", "ada@example.com");
        let user = resolve_token(&identity, Some("tok-ada")).await.unwrap();
        assert_eq!(user.user_id, "user-ada");
    }

    #[tokio::test]
    async fn unknown_token_is_unauthenticated_without_provider_detail() {
        let identity = FakeIdentity::new();
        let err = resolve_token(&identity, Some("Bearer nope")).await.unwrap_err();
        match err {
            AppError::Unauthenticated { message } => {
                assert_eq!(message, "Invalid or expired token");
            }
            other => panic!("unexpected error variant: {:?}", other),
        }
        assert_eq!(identity.get_user_calls(), 1);
    }

    #[tokio::test]
    async fn bearer_token_is_checked_only_when_resolved() {
        let identity = FakeIdentity::new().with_user("tok-ada", "user-ada", "ada@example.com");
        assert!(matches!(
            BearerToken::from_header(Some("Bearer  ")),
            Err(AppError::MissingToken)
        ));

        let token = BearerToken::from_header(Some("Bearer tok-ada")).unwrap();
        assert_eq!(identity.get_user_calls(), 0);
        let user = token.resolve(&identity).await.unwrap();
        assert_eq!(user.user_id, "user-ada");
        assert_eq!(identity.get_user_calls(), 1);
    }
}
