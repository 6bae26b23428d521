/**
 * Health Routes
 * Liveness and store readiness
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Single dependency check result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadyChecks {
    pub store: ServiceCheck,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    pub checks: ReadyChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_ping))
        .route("/health/ready", get(health_ready))
}

/// GET /health
pub async fn health_ping() -> impl IntoResponse {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/ready - 503 when the store does not answer.
pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let (ready, store) = match state.store.ping().await {
        Ok(elapsed) => (
            true,
            ServiceCheck {
                status: "healthy".to_string(),
                response_time: Some(elapsed.as_millis() as u64),
                error: None,
            },
        ),
        Err(e) => {
            tracing::warn!(error = %e, "store ping failed");
            (
                false,
                ServiceCheck {
                    status: "unhealthy".to_string(),
                    response_time: None,
                    error: Some(e.to_string()),
                },
            )
        }
    };

    let response = ReadyResponse {
        status: if ready { "ready" } else { "not ready" }.to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs(),
        checks: ReadyChecks { store },
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::{Record, Store, StoreError};
    use crate::notify::LogMailer;
    use crate::test_support::{send, test_state};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    /// Store whose every call fails.
    struct DownStore;

    fn down() -> StoreError {
        StoreError::Sql(sqlx::Error::PoolTimedOut)
    }

    #[async_trait]
    impl Store for DownStore {
        async fn list(&self, _: &str) -> Result<Vec<Record>, StoreError> {
            Err(down())
        }
        async fn get(&self, _: &str, _: Uuid) -> Result<Option<Record>, StoreError> {
            Err(down())
        }
        async fn find_one(&self, _: &str, _: &str, _: &Value) -> Result<Option<Record>, StoreError> {
            Err(down())
        }
        async fn insert(&self, _: &str, _: Value) -> Result<Record, StoreError> {
            Err(down())
        }
        async fn replace(&self, _: &str, _: Uuid, _: Value) -> Result<Option<Record>, StoreError> {
            Err(down())
        }
        async fn delete(&self, _: &str, _: Uuid) -> Result<bool, StoreError> {
            Err(down())
        }
        async fn delete_all(&self, _: &str) -> Result<u64, StoreError> {
            Err(down())
        }
        async fn ping(&self) -> Result<Duration, StoreError> {
            Err(down())
        }
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_ping_returns_ok() {
        let (state, _dir, _mailer) = test_state();
        let (status, body) = send(crate::create_app(state), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_ready_with_working_store() {
        let (state, _dir, _mailer) = test_state();
        let (status, body) = send(crate::create_app(state), get("/health/ready")).await;
        assert_eq!(status, StatusCode::OK);
        let body: ReadyResponse = serde_json::from_value(body).unwrap();
        assert_eq!(body.status, "ready");
        assert_eq!(body.checks.store.status, "healthy");
    }

    #[tokio::test]
    async fn test_not_ready_when_store_is_down() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(
            AppConfig::for_tests(dir.path().to_path_buf()),
            Arc::new(DownStore),
            Arc::new(LogMailer),
        );
        let app = crate::create_app(state);

        let (status, body) = send(app.clone(), get("/health/ready")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "not ready");
        assert!(body["checks"]["store"]["error"].is_string());

        let (status, body) = send(app, get("/api/services")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }
}
