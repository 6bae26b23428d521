//! Runtime configuration, read once from the environment at boot.

use std::path::PathBuf;
use std::str::FromStr;

use crate::db::DbConfig;

pub const DEFAULT_JWT_SECRET: &str = "default-jwt-secret-change-in-production";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_TOKEN_DAYS: i64 = 30;
const DEFAULT_MAX_UPLOAD_MB: usize = 50;
const DEFAULT_KEEP_ALIVE_SECS: u64 = 14 * 60;
const MIB: usize = 1024 * 1024;

/// Bounds accepted by bcrypt for its work factor.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    /// `None` runs the API on the in-memory store.
    pub database: Option<DbConfig>,
    pub auth: AuthConfig,
    pub allowed_origins: Vec<String>,
    pub uploads: UploadConfig,
    pub keep_alive: Option<KeepAliveConfig>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    pub url: String,
    pub interval_secs: u64,
}

/// Parse an env var, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn upload_limit_bytes(megabytes: usize) -> usize {
    megabytes.max(1).saturating_mul(MIB)
}

impl AppConfig {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Self {
        let database = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|_| DbConfig::default());

        let keep_alive = std::env::var("KEEP_ALIVE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| KeepAliveConfig {
                url,
                interval_secs: env_or("KEEP_ALIVE_INTERVAL_SECS", DEFAULT_KEEP_ALIVE_SECS).max(1),
            });

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", DEFAULT_PORT),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            database,
            auth: AuthConfig {
                jwt_secret: std::env::var("JWT_SECRET")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string()),
                token_ttl_days: env_or("JWT_EXPIRES_IN_DAYS", DEFAULT_TOKEN_DAYS).max(1),
                bcrypt_cost: env_or("BCRYPT_COST", bcrypt::DEFAULT_COST)
                    .clamp(MIN_BCRYPT_COST, MAX_BCRYPT_COST),
            },
            allowed_origins: allowed_origins(),
            uploads: UploadConfig {
                dir: PathBuf::from(
                    std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
                ),
                max_bytes: upload_limit_bytes(env_or("MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB)),
            },
            keep_alive,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Origins from ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN,
/// defaulting to the local Next.js dev server.
fn allowed_origins() -> Vec<String> {
    std::env::var("ALLOWED_ORIGINS")
        .ok()
        .map(|s| {
            s.split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty())
        .or_else(|| std::env::var("FRONTEND_ORIGIN").ok().map(|o| vec![o]))
        .unwrap_or_else(|| {
            vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ]
        })
}

#[cfg(test)]
impl AppConfig {
    /// Configuration used by the HTTP tests: in-memory store, cheap hashing.
    pub fn for_tests(upload_dir: PathBuf) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            database: None,
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
                token_ttl_days: 1,
                bcrypt_cost: MIN_BCRYPT_COST,
            },
            allowed_origins: vec!["http://localhost:3000".to_string()],
            uploads: UploadConfig {
                dir: upload_dir,
                max_bytes: 1024 * 1024,
            },
            keep_alive: None,
        }
    }
}
