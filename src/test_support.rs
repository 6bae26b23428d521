//! Shared fixtures for the HTTP tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::db::models::{Role, User};
use crate::db::{Document, MemoryStore};
use crate::notify::{MailError, Mailer, Notification, SmtpCredentials};
use crate::AppState;

pub const PASSWORD: &str = "password123";

/// Mailer that keeps what it was asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        _credentials: &SmtpCredentials,
        notification: &Notification,
    ) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Fresh state over an empty in-memory store and a temporary upload dir.
/// Keep the [`TempDir`] alive for the duration of the test.
pub fn test_state() -> (AppState, TempDir, Arc<RecordingMailer>) {
    let dir = tempfile::tempdir().unwrap();
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::new(
        AppConfig::for_tests(dir.path().to_path_buf()),
        Arc::new(MemoryStore::new()),
        mailer.clone(),
    );
    (state, dir, mailer)
}

pub async fn create_user(state: &AppState, email: &str, role: Role) -> Document<User> {
    state
        .repo::<User>()
        .create(json!({
            "name": "Test User",
            "email": email,
            "password": PASSWORD,
            "role": role,
        }))
        .await
        .unwrap()
}

pub fn token_for(state: &AppState, user: &Document<User>) -> String {
    state.tokens.issue(user.id, user.data.role).unwrap()
}

pub async fn admin_token(state: &AppState) -> String {
    let admin = create_user(state, "admin@example.com", Role::Admin).await;
    token_for(state, &admin)
}

pub async fn employee_token(state: &AppState) -> String {
    let employee = create_user(state, "staff@example.com", Role::Employee).await;
    token_for(state, &employee)
}

/// Drive one request through the router; the body is parsed as JSON, or
/// `Null` when empty or not JSON.
pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}
