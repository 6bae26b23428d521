use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use super::{DbConfig, Record, Store, StoreError};

const UNIQUE_VIOLATION: &str = "23505";

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        seq BIGSERIAL,
        collection TEXT NOT NULL,
        id UUID NOT NULL,
        body JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (collection, id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_documents_collection_seq
        ON documents(collection, seq)
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_users_email
        ON documents ((body ->> 'email'))
        WHERE collection = 'users'
    "#,
];

/// [`Store`] over a single PostgreSQL `documents` table.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open the pool, check it with a trivial query and apply migrations.
    pub async fn connect(config: &DbConfig) -> Result<Self, StoreError> {
        tracing::info!("Initializing database connection pool...");
        tracing::debug!(url = %config.redacted_url(), "database target");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(&config.url)
            .await?;

        sqlx::query("SELECT 1").fetch_one(&pool).await?;
        tracing::info!("Database connection pool initialized successfully");

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        tracing::info!("Running database migrations...");
        for statement in MIGRATIONS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("Database migrations completed");
        Ok(())
    }
}

fn map_write_error(collection: &str, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Duplicate(collection.to_string())
        }
        _ => StoreError::Sql(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        let rows = sqlx::query_as::<_, Record>(
            r#"
            SELECT id, body, created_at, updated_at
            FROM documents
            WHERE collection = $1
            ORDER BY seq
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Record>, StoreError> {
        let row = sqlx::query_as::<_, Record>(
            r#"
            SELECT id, body, created_at, updated_at
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Record>, StoreError> {
        let row = sqlx::query_as::<_, Record>(
            r#"
            SELECT id, body, created_at, updated_at
            FROM documents
            WHERE collection = $1 AND body -> $2 = $3
            ORDER BY seq
            LIMIT 1
            "#,
        )
        .bind(collection)
        .bind(field)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert(&self, collection: &str, body: Value) -> Result<Record, StoreError> {
        sqlx::query_as::<_, Record>(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            RETURNING id, body, created_at, updated_at
            "#,
        )
        .bind(collection)
        .bind(Uuid::new_v4())
        .bind(body)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(collection, e))
    }

    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        body: Value,
    ) -> Result<Option<Record>, StoreError> {
        sqlx::query_as::<_, Record>(
            r#"
            UPDATE documents
            SET body = $3, updated_at = now()
            WHERE collection = $1 AND id = $2
            RETURNING id, body, created_at, updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(body)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(collection, e))
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, collection: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1")
            .bind(collection)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<Duration, StoreError> {
        let start = Instant::now();
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(start.elapsed())
    }
}
