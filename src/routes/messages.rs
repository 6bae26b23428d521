/**
 * Message Routes
 * Public contact form, admin inbox
 */
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::resource::{fetch, list, parse_id, remove};
use crate::db::models::Message;
use crate::db::Resource;
use crate::error::{ApiError, Result};
use crate::notify::notify_new_message;
use crate::policy::guard;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadFlag {
    is_read: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteAllResponse {
    pub message: String,
    pub deleted: u64,
}

pub fn router(state: &AppState) -> Router<AppState> {
    let policy = Message::POLICY;
    Router::new()
        .route(
            "/",
            guard(policy.list, state, get(list::<Message>))
                .merge(guard(policy.create, state, post(create)))
                .merge(guard(policy.delete, state, delete(remove_all))),
        )
        .route(
            "/{id}",
            guard(policy.get, state, get(fetch::<Message>))
                .merge(guard(policy.update, state, put(mark_read)))
                .merge(guard(policy.delete, state, delete(remove::<Message>))),
        )
}

/// POST /api/messages - contact form submission.
pub async fn create(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let Json(payload) = body?;
    let repo = state.repo::<Message>();
    let doc = repo.create(payload).await?;
    tracing::info!(message_id = %doc.id, "contact message received");

    tokio::spawn(notify_new_message(state.clone(), doc.clone()));

    Ok((StatusCode::CREATED, Json(repo.present(doc).await?)))
}

/// PUT /api/messages/{id} - flips `isRead`, or sets it when the body says so.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>> {
    let id = parse_id::<Message>(&id)?;
    let flag: ReadFlag = if body.iter().all(u8::is_ascii_whitespace) {
        ReadFlag::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::validation(e.to_string()))?
    };

    let repo = state.repo::<Message>();
    let mut doc = repo.get(id).await?;
    doc.data.is_read = flag.is_read.unwrap_or(!doc.data.is_read);
    let doc = repo.replace(id, doc.data).await?;
    tracing::info!(message_id = %id, is_read = doc.data.is_read, "message read state changed");

    Ok(Json(repo.present(doc).await?))
}

/// DELETE /api/messages - clears the inbox.
pub async fn remove_all(State(state): State<AppState>) -> Result<Json<DeleteAllResponse>> {
    let deleted = state.repo::<Message>().delete_all().await?;
    tracing::info!(deleted, "inbox cleared");
    Ok(Json(DeleteAllResponse {
        message: "All messages removed".to_string(),
        deleted,
    }))
}
