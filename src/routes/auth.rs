/**
 * Authentication Routes
 * Login with email and password, current-user lookup
 */
use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{require_auth, verify_login, Identity};
use crate::db::models::User;
use crate::error::{ApiError, Result};
use crate::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().route("/login", post(login)).route(
        "/me",
        get(me).route_layer(middleware::from_fn_with_state(state.clone(), require_auth)),
    )
}

/// POST /api/auth/login
///
/// Unknown email and wrong password produce the same response.
pub async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(req) = body?;
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("Please provide email and password"));
    }

    let repo = state.repo::<User>();
    let user = repo.find_by("email", email.as_str()).await?;
    let stored = user.as_ref().map(|u| u.data.password.clone());
    let matches = verify_login(req.password, stored, state.config.auth.bcrypt_cost).await?;

    let user = match user {
        Some(user) if matches => user,
        Some(user) => {
            tracing::warn!(user_id = %user.id, "login failed: wrong password");
            return Err(ApiError::InvalidCredentials);
        }
        None => {
            tracing::warn!(email = %email, "login failed: unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !user.data.is_active {
        tracing::warn!(user_id = %user.id, "login refused: account disabled");
        return Err(ApiError::Forbidden("Account is disabled"));
    }

    let token = state.tokens.issue(user.id, user.data.role)?;
    tracing::info!(user_id = %user.id, role = user.data.role.as_str(), "user logged in");

    let mut body = repo.present(user).await?;
    if let Some(obj) = body.as_object_mut() {
        obj.insert("token".to_string(), Value::String(token));
    }
    Ok(Json(body))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>> {
    let repo = state.repo::<User>();
    let user = repo.get(identity.id).await?;
    Ok(Json(repo.present(user).await?))
}
