/**
 * Settings Routes
 * Singleton SMTP / notification settings
 */
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::Value;

use crate::db::models::Settings;
use crate::db::{Document, Resource};
use crate::error::Result;
use crate::policy::guard;
use crate::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let policy = Settings::POLICY;
    Router::new().route(
        "/",
        guard(policy.get, state, get(get_settings))
            .merge(guard(policy.create, state, post(save_settings)))
            .merge(guard(policy.update, state, put(save_settings))),
    )
}

/// The stored settings, created empty on first access.
async fn current(state: &AppState) -> Result<Document<Settings>> {
    let repo = state.repo::<Settings>();
    match repo.first().await? {
        Some(doc) => Ok(doc),
        None => {
            tracing::info!("creating default settings");
            repo.insert(Settings::default()).await
        }
    }
}

/// GET /api/settings
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Value>> {
    let doc = current(&state).await?;
    Ok(Json(state.repo::<Settings>().present(doc).await?))
}

/// POST|PUT /api/settings - partial upsert.
pub async fn save_settings(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(patch) = body?;
    let repo = state.repo::<Settings>();
    let doc = match repo.first().await? {
        Some(existing) => repo.update(existing.id, patch).await?,
        None => repo.create(patch).await?,
    };
    tracing::info!(
        notifications = doc.data.notifications_enabled(),
        "settings saved"
    );
    Ok(Json(repo.present(doc).await?))
}
