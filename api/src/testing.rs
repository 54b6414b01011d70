//! Test doubles for the identity service and record store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use merlin_core::identity::{AuthOutcome, DISPLAY_NAME_KEY, IdsSession, IdsUser};
use merlin_core::records::Table;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::ids::{IdentityProvider, IdsError, SignUp};
use crate::state::AppState;
use crate::store::memory::MemoryStore;
use crate::store::{ListQuery, RecordStore, Row, StoreError, Upsert};

pub fn ids_user(id: &str, email: &str, display_name: Option<&str>) -> IdsUser {
    let mut user_metadata = serde_json::Map::new();
    if let Some(name) = display_name {
        user_metadata.insert(DISPLAY_NAME_KEY.to_string(), json!(name));
    }
    IdsUser {
        id: id.to_string(),
        email: Some(email.to_string()),
        created_at: "2026-10-18T09:00:00Z".to_string(),
        aud: "authenticated".to_string(),
        role: "authenticated".to_string(),
        user_metadata,
    }
}

fn session_for(user: &IdsUser) -> IdsSession {
    IdsSession {
        access_token: format!("token-{}", user.id),
        refresh_token: format!("refresh-{}", user.id),
        expires_in: 3600,
        token_type: "bearer".to_string(),
    }
}

#[derive(Default)]
struct FakeIdentityInner {
    tokens: HashMap<String, IdsUser>,
    accounts: HashMap<String, (String, IdsUser)>,
    login_overrides: HashMap<String, AuthOutcome>,
    reset_requests: Vec<String>,
    next_user: usize,
}

/// In-memory identity service. Signups issue `token-<user id>` access tokens
/// that `get_user` then accepts.
#[derive(Default)]
pub struct FakeIdentity {
    inner: Mutex<FakeIdentityInner>,
    get_user_calls: AtomicUsize,
    confirm_email: bool,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, token: &str, user_id: &str, email: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .tokens
            .insert(token.to_string(), ids_user(user_id, email, None));
        self
    }

    pub fn with_account(self, email: &str, password: &str, user: IdsUser) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner
                .tokens
                .insert(session_for(&user).access_token, user.clone());
            inner
                .accounts
                .insert(email.to_string(), (password.to_string(), user));
        }
        self
    }

    /// Make the next logins for `email` return `outcome` verbatim.
    pub fn with_login_outcome(self, email: &str, outcome: AuthOutcome) -> Self {
        self.inner
            .lock()
            .unwrap()
            .login_overrides
            .insert(email.to_string(), outcome);
        self
    }

    /// Signups return a user but no session.
    pub fn requiring_email_confirmation(mut self) -> Self {
        self.confirm_email = true;
        self
    }

    pub fn get_user_calls(&self) -> usize {
        self.get_user_calls.load(Ordering::SeqCst)
    }

    pub fn reset_requests(&self) -> Vec<String> {
        self.inner.lock().unwrap().reset_requests.clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(&self, request: &SignUp) -> Result<AuthOutcome, IdsError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.accounts.contains_key(&request.email) {
            return Err(IdsError::Rejected {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        inner.next_user += 1;
        let user = ids_user(
            &format!("user-{}", inner.next_user),
            &request.email,
            Some(&request.display_name),
        );
        let session = session_for(&user);
        inner
            .tokens
            .insert(session.access_token.clone(), user.clone());
        inner.accounts.insert(
            request.email.clone(),
            (request.password.clone(), user.clone()),
        );

        Ok(AuthOutcome {
            user: Some(user),
            session: (!self.confirm_email).then_some(session),
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome, IdsError> {
        let inner = self.inner.lock().unwrap();
        if let Some(outcome) = inner.login_overrides.get(email) {
            return Ok(outcome.clone());
        }
        match inner.accounts.get(email) {
            Some((stored, user)) if stored == password => Ok(AuthOutcome {
                user: Some(user.clone()),
                session: Some(session_for(user)),
            }),
            _ => Err(IdsError::Rejected {
                status: 400,
                message: "Invalid login credentials".to_string(),
            }),
        }
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdsError> {
        self.inner
            .lock()
            .unwrap()
            .reset_requests
            .push(email.to_string());
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<IdsUser, IdsError> {
        self.get_user_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .lock()
            .unwrap()
            .tokens
            .get(access_token)
            .cloned()
            .ok_or_else(|| IdsError::Rejected {
                status: 401,
                message: "invalid JWT: token is expired".to_string(),
            })
    }
}

/// Memory store that counts calls, optionally failing every one of them.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
    fail: bool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn row_count(&self, table: Table) -> usize {
        self.inner.row_count(table).await
    }

    fn record_call(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError::Rejected {
                status: 503,
                message: "store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for CountingStore {
    async fn upsert(&self, op: Upsert) -> Result<(), StoreError> {
        self.record_call()?;
        self.inner.upsert(op).await
    }

    async fn insert(&self, table: Table, row: Row) -> Result<(), StoreError> {
        self.record_call()?;
        self.inner.insert(table, row).await
    }

    async fn select(&self, query: ListQuery) -> Result<Vec<Row>, StoreError> {
        self.record_call()?;
        self.inner.select(query).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.record_call()
    }
}

/// The full router over the given doubles.
pub fn app(identity: Arc<FakeIdentity>, store: Arc<CountingStore>) -> Router {
    crate::app::router().with_state(AppState::new(identity, store))
}

/// Send a request and return status plus parsed JSON body (`Null` when the
/// body is empty or not JSON).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should succeed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}
