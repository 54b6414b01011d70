use reqwest::{Method, RequestBuilder, Response};
use url::Url;

/// HTTP handle on the identity service, shared by the auth client and the
/// REST record store. Built once at startup.
#[derive(Clone)]
pub struct IdsClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl IdsClient {
    pub fn new(mut base_url: Url, api_key: String) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }

    /// Request authorized with the project key.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.request_as(method, url, &self.api_key)
    }

    /// Request authorized as a specific bearer (a user's access token).
    pub fn request_as(&self, method: Method, url: Url, bearer: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }
}

/// Status and human-readable message of a non-success response.
pub async fn rejection(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, error_message(&body))
}

const MESSAGE_KEYS: [&str; 5] = ["msg", "error_description", "message", "error", "hint"];
const MAX_RAW_MESSAGE: usize = 200;

/// Pick the readable part out of an identity service error body.
pub fn error_message(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in MESSAGE_KEYS {
            if let Some(text) = map.get(key).and_then(|v| v.as_str()) {
                if !text.trim().is_empty() {
                    return text.to_string();
                }
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "request failed".to_string()
    } else {
        trimmed.chars().take(MAX_RAW_MESSAGE).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = IdsClient::new(
            Url::parse("https://project.example.co/prefix").unwrap(),
            "key".to_string(),
        );
        assert_eq!(
            client.endpoint("auth/v1/user").unwrap().as_str(),
            "https://project.example.co/prefix/auth/v1/user"
        );
    }

    #[test]
    fn error_message_prefers_known_keys() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(
            error_message(r#"{"msg":"User already registered"}"#),
            "User already registered"
        );
        assert_eq!(
            error_message(r#"{"code":"23505","message":"duplicate key value"}"#),
            "duplicate key value"
        );
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message("   "), "request failed");
    }
}
