//! Credentials and bearer tokens: bcrypt hashing, HS256 JWTs and the
//! request guards built on them.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::db::models::{Role, User};
use crate::db::Document;
use crate::error::{ApiError, Result};
use crate::AppState;

const BEARER: &str = "Bearer ";

/// Hash compared against when the login email matches no account.
static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();

/// JWT claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated caller, attached to request extensions by the guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Clone)]
pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenManager {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl: Duration::days(config.token_ttl_days),
        }
    }

    pub fn issue(&self, id: Uuid, role: Role) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
    }

    /// Check signature and expiry.
    pub fn verify(&self, token: &str) -> std::result::Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding, &Validation::default()).map(|data| data.claims)
    }
}

/// bcrypt off the async executor.
pub async fn hash_password(plain: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(plain: String, hash: String) -> Result<bool> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("verification task failed: {e}")))?;
    Ok(outcome.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "stored password hash is unreadable");
        false
    }))
}

/// Check a login attempt. Without a stored hash the password is still run
/// through one bcrypt verification, so unknown accounts cost the same as
/// wrong passwords.
pub async fn verify_login(plain: String, stored: Option<String>, cost: u32) -> Result<bool> {
    match stored {
        Some(hash) => verify_password(plain, hash).await,
        None => {
            let dummy = DUMMY_HASH
                .get_or_try_init(|| hash_password(Uuid::new_v4().to_string(), cost))
                .await?
                .clone();
            verify_password(plain, dummy).await?;
            Ok(false)
        }
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the bearer token to a live, active user.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Document<User>> {
    let token =
        bearer_token(headers).ok_or(ApiError::Unauthorized("Not authorized, no token"))?;

    let claims = state.tokens.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        ApiError::Unauthorized("Not authorized, token failed")
    })?;
    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthorized("Not authorized, token failed"))?;

    let user = match state.repo::<User>().get(id).await {
        Ok(user) => user,
        Err(ApiError::NotFound(_)) => {
            return Err(ApiError::Unauthorized("Not authorized, user not found"))
        }
        Err(e) => return Err(e),
    };

    if !user.data.is_active {
        return Err(ApiError::Unauthorized("Account is disabled"));
    }
    Ok(user)
}

/// Middleware: any active user with a valid token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let user = authenticate(&state, req.headers()).await?;
    req.extensions_mut().insert(Identity {
        id: user.id,
        role: user.data.role,
    });
    Ok(next.run(req).await)
}

/// Middleware: like [`require_auth`], then admins only.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let user = authenticate(&state, req.headers()).await?;
    let identity = Identity {
        id: user.id,
        role: user.data.role,
    };
    if !identity.is_admin() {
        return Err(ApiError::Forbidden("Not authorized as an admin"));
    }
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
