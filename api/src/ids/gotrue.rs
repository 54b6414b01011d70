use async_trait::async_trait;
use merlin_core::identity::{AuthOutcome, DISPLAY_NAME_KEY, IdsSession, IdsUser};
use reqwest::{Method, Response};
use serde_json::{Value, json};

use super::client::{IdsClient, rejection};
use super::{IdentityProvider, IdsError, SignUp};

/// GoTrue-compatible auth API (`/auth/v1/...`).
#[derive(Clone)]
pub struct GoTrueProvider {
    client: IdsClient,
}

impl GoTrueProvider {
    pub fn new(client: IdsClient) -> Self {
        Self { client }
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Response, IdsError> {
        let url = self.client.endpoint(path)?;
        let response = self
            .client
            .request(Method::POST, url)
            .json(&body)
            .send()
            .await?;
        ensure_success(response).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, IdsError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let (status, message) = rejection(response).await;
    Err(IdsError::Rejected { status, message })
}

/// Split a signup/token response into user and session.
///
/// Token responses carry the session at the top level with the user nested
/// under `user`. Signups awaiting email confirmation return the bare user.
pub(crate) fn parse_auth_body(body: Value) -> Result<AuthOutcome, IdsError> {
    let session = if body.get("access_token").is_some() {
        Some(
            serde_json::from_value::<IdsSession>(body.clone())
                .map_err(|e| IdsError::Decode(format!("session: {e}")))?,
        )
    } else {
        None
    };

    let nested = body.get("user").filter(|u| u.is_object()).cloned();
    let user_value = match nested {
        Some(user) => Some(user),
        None if body.get("id").is_some() => Some(body),
        None => None,
    };
    let user = user_value
        .map(serde_json::from_value::<IdsUser>)
        .transpose()
        .map_err(|e| IdsError::Decode(format!("user: {e}")))?;

    Ok(AuthOutcome { user, session })
}

#[async_trait]
impl IdentityProvider for GoTrueProvider {
    async fn sign_up(&self, request: &SignUp) -> Result<AuthOutcome, IdsError> {
        let body = json!({
            "email": request.email,
            "password": request.password,
            "data": { DISPLAY_NAME_KEY: request.display_name },
        });
        let response = self.post_json("auth/v1/signup", body).await?;
        parse_auth_body(response.json().await?)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome, IdsError> {
        let body = json!({ "email": email, "password": password });
        let response = self
            .post_json("auth/v1/token?grant_type=password", body)
            .await?;
        parse_auth_body(response.json().await?)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdsError> {
        self.post_json("auth/v1/recover", json!({ "email": email }))
            .await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<IdsUser, IdsError> {
        let url = self.client.endpoint("auth/v1/user")?;
        let response = self
            .client
            .request_as(Method::GET, url, access_token)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<IdsUser>().await?)
    }
}
