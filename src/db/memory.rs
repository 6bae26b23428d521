use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Record, Store, StoreError, UNIQUE_FIELDS};

/// Process-local [`Store`]. Used when no database is configured and by the
/// test suite.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Checked under the write lock so that concurrent writers cannot both pass.
fn check_unique(
    docs: &[Record],
    collection: &str,
    body: &Value,
    except: Option<Uuid>,
) -> Result<(), StoreError> {
    for (_, field) in UNIQUE_FIELDS.iter().filter(|(c, _)| *c == collection) {
        let Some(value) = body.get(*field).filter(|v| !v.is_null()) else {
            continue;
        };
        let taken = docs
            .iter()
            .any(|d| Some(d.id) != except && d.body.get(*field) == Some(value));
        if taken {
            return Err(StoreError::Duplicate(collection.to_string()));
        }
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Record>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Record>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.body.get(field) == Some(value)))
            .cloned())
    }

    async fn insert(&self, collection: &str, body: Value) -> Result<Record, StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        check_unique(docs, collection, &body, None)?;

        let now = Utc::now();
        let record = Record {
            id: Uuid::new_v4(),
            body,
            created_at: now,
            updated_at: now,
        };
        docs.push(record.clone());
        Ok(record)
    }

    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        body: Value,
    ) -> Result<Option<Record>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        check_unique(docs, collection, &body, Some(id))?;
        let Some(record) = docs.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        record.body = body;
        record.updated_at = Utc::now().max(record.created_at);
        Ok(Some(record.clone()))
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() < before)
    }

    async fn delete_all(&self, collection: &str) -> Result<u64, StoreError> {
        let removed = self.collections.write().await.remove(collection);
        Ok(removed.map_or(0, |docs| docs.len() as u64))
    }

    async fn ping(&self) -> Result<Duration, StoreError> {
        let start = Instant::now();
        let _ = self.collections.read().await;
        Ok(start.elapsed())
    }
}
