//! Document storage: a collection/id keyed JSON store behind the [`Store`]
//! trait, backed by PostgreSQL (JSONB) or an in-memory map.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{Document, Repository, Resource, WriteContext};

/// `(collection, field)` pairs whose values must be unique within the
/// collection. Null or missing values never conflict.
pub const UNIQUE_FIELDS: &[(&str, &str)] = &[("users", "email")];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQL request failed: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("stored document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("duplicate value in `{0}`")]
    Duplicate(String),
}

/// One stored document.
#[derive(Debug, Clone, FromRow)]
pub struct Record {
    pub id: Uuid,
    pub body: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Flat document store. Every operation touches a single document (or a
/// whole collection for `delete_all`); there are no transactions.
#[async_trait]
pub trait Store: Send + Sync {
    /// All documents of a collection in insertion order.
    async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError>;

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Record>, StoreError>;

    /// First document whose top-level `field` equals `value`.
    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Record>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when a [`UNIQUE_FIELDS`] value
    /// is already taken.
    async fn insert(&self, collection: &str, body: Value) -> Result<Record, StoreError>;

    /// Overwrite the body of an existing document. `None` when the id is
    /// unknown. Enforces [`UNIQUE_FIELDS`] like `insert`.
    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        body: Value,
    ) -> Result<Option<Record>, StoreError>;

    /// `false` when nothing was deleted.
    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError>;

    async fn delete_all(&self, collection: &str) -> Result<u64, StoreError>;

    /// Round-trip time of a trivial request.
    async fn ping(&self) -> Result<Duration, StoreError>;
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/portfolio".to_string()),
            max_connections: std::env::var("DB_POOL_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            min_connections: std::env::var("DB_POOL_MIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            connect_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }
}

impl DbConfig {
    /// Connection URL with credentials masked, for logs.
    pub fn redacted_url(&self) -> String {
        match (self.url.find("://"), self.url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}://***{}", &self.url[..scheme_end], &self.url[at..])
            }
            _ => self.url.clone(),
        }
    }
}
