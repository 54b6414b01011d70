use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use merlin_core::error::ApiError;
use merlin_core::identity::{IncompleteAuth, NormalizedAuth, normalize};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::ids::SignUp;
use crate::records::required_text;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/reset-password", post(reset_password))
}

fn required(value: Option<String>, field: &'static str, message: &str) -> Result<String, AppError> {
    Ok(required_text(value, field, message)?)
}

// ──────────────────────────────────────────────
// POST /signup
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    /// Stored as identity metadata; defaults to ""
    #[serde(default)]
    pub display_name: Option<String>,
}

#[utoipa::path(
    post,
    path = "/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "User created and signed in", body = NormalizedAuth),
        (status = 400, description = "Invalid input or identity service rejection", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(req): AppJson<SignupRequest>,
) -> Result<Json<NormalizedAuth>, AppError> {
    let email = required(req.email, "email", "Email is required")?;
    let password = required(req.password, "password", "Password is required")?;
    let display_name = req.display_name.unwrap_or_default();

    let outcome = state
        .identity
        .sign_up(&SignUp {
            email,
            password,
            display_name: display_name.clone(),
        })
        .await?;

    let body = normalize(outcome, Some(display_name)).map_err(|err| AppError::Provider {
        message: match err {
            IncompleteAuth::MissingSession => {
                "Account created but no session was issued; confirm the email address, then log in"
                    .to_string()
            }
            IncompleteAuth::MissingUser => err.to_string(),
        },
    })?;

    tracing::info!(user_id = %body.user.id, "user signed up");
    Ok(Json(body))
}

// ──────────────────────────────────────────────
// POST /login
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = NormalizedAuth),
        (status = 400, description = "Invalid input or identity service rejection", body = ApiError),
        (status = 401, description = "No user or session issued", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<NormalizedAuth>, AppError> {
    let email = required(req.email, "email", "Email is required")?;
    let password = required(req.password, "password", "Password is required")?;

    let outcome = state
        .identity
        .sign_in_with_password(&email, &password)
        .await?;

    let body = normalize(outcome, None).map_err(|err| {
        tracing::info!(reason = %err, "login returned an incomplete auth result");
        AppError::InvalidCredentials
    })?;

    tracing::info!(user_id = %body.user.id, "user logged in");
    Ok(Json(body))
}

// ──────────────────────────────────────────────
// POST /reset-password
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
}

#[utoipa::path(
    post,
    path = "/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 204, description = "Reset email requested"),
        (status = 400, description = "Missing email or identity service rejection", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(req): AppJson<ResetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    let email = required(req.email, "email", "Email is required")?;
    state.identity.send_password_reset(&email).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use merlin_core::identity::AuthOutcome;
    use serde_json::json;

    use crate::testing::{CountingStore, FakeIdentity, app, ids_user, send};

    #[tokio::test]
    async fn signup_echoes_display_name_and_issues_session() {
        let app = app(Arc::new(FakeIdentity::new()), Arc::new(CountingStore::new()));
        let (status, body) = send(
            &app,
            "POST",
            "/signup",
            None,
            Some(json!({ "email": "ada@example.com", "password": "pw123456", "display_name": "Ada" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(!body["user"]["id"].as_str().unwrap().is_empty());
        assert_eq!(body["user"]["email"], "ada@example.com");
        assert_eq!(body["user"]["aud"], "authenticated");
        assert_eq!(body["display_name"], "Ada");
        assert_eq!(body["session"]["token_type"], "bearer");
    }

    #[tokio::test]
    async fn signup_without_display_name_defaults_to_empty() {
        let app = app(Arc::new(FakeIdentity::new()), Arc::new(CountingStore::new()));
        let (status, body) = send(
            &app,
            "POST",
            "/signup",
            None,
            Some(json!({ "email": "grace@example.com", "password": "pw123456" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["display_name"], "");
    }

    #[tokio::test]
    async fn duplicate_signup_is_a_provider_error() {
        let app = app(Arc::new(FakeIdentity::new()), Arc::new(CountingStore::new()));
        let payload = json!({ "email": "ada@example.com", "password": "pw123456" });
        send(&app, "POST", "/signup", None, Some(payload.clone())).await;
        let (status, body) = send(&app, "POST", "/signup", None, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "provider_error");
        assert_eq!(body["message"], "User already registered");
    }

    #[tokio::test]
    async fn signup_pending_confirmation_is_rejected() {
        let identity = FakeIdentity::new().requiring_email_confirmation();
        let app = app(Arc::new(identity), Arc::new(CountingStore::new()));
        let (status, body) = send(
            &app,
            "POST",
            "/signup",
            None,
            Some(json!({ "email": "ada@example.com", "password": "pw123456" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("user").is_none());
    }

    #[tokio::test]
    async fn login_returns_metadata_display_name() {
        let identity = FakeIdentity::new().with_account(
            "ada@example.com",
            "pw123456",
            ids_user("user-ada", "ada@example.com", Some("Ada")),
        );
        let app = app(Arc::new(identity), Arc::new(CountingStore::new()));
        let (status, body) = send(
            &app,
            "POST",
            "/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "pw123456" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], "user-ada");
        assert_eq!(body["display_name"], "Ada");
        assert_eq!(body["session"]["access_token"], "token-user-ada");
    }

    #[tokio::test]
    async fn login_with_incomplete_outcome_is_401() {
        let cases = [
            AuthOutcome {
                user: Some(ids_user("user-ada", "ada@example.com", None)),
                session: None,
            },
            AuthOutcome::default(),
        ];
        for outcome in cases {
            let identity = FakeIdentity::new().with_login_outcome("ada@example.com", outcome);
            let app = app(Arc::new(identity), Arc::new(CountingStore::new()));
            let (status, body) = send(
                &app,
                "POST",
                "/login",
                None,
                Some(json!({ "email": "ada@example.com", "password": "pw" })),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"], "invalid_credentials");
            assert!(body.get("session").is_none());
        }
    }

    #[tokio::test]
    async fn login_rejected_by_provider_is_400() {
        let app = app(Arc::new(FakeIdentity::new()), Arc::new(CountingStore::new()));
        let (status, body) = send(
            &app,
            "POST",
            "/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid login credentials");
    }

    #[tokio::test]
    async fn reset_password_requires_email() {
        let identity = Arc::new(FakeIdentity::new());
        let app = app(identity.clone(), Arc::new(CountingStore::new()));

        let (status, body) = send(&app, "POST", "/reset-password", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "email");

        let (status, body) = send(
            &app,
            "POST",
            "/reset-password",
            None,
            Some(json!({ "email": "ada@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, serde_json::Value::Null);
        assert_eq!(identity.reset_requests(), vec!["ada@example.com".to_string()]);
    }
}
