//! Typed access to one collection of the [`Store`].
//!
//! A [`Resource`] ties an entity type to its collection, its display name
//! and its authorization policy. [`Repository`] does the rest: decoding,
//! partial-merge updates, validation and the per-entity hooks.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use super::{Record, Store, StoreError};
use crate::error::{ApiError, Result};
use crate::policy::Policy;

/// An entity together with its store metadata, as sent over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document<T> {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub data: T,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<T: DeserializeOwned> Document<T> {
    pub fn from_record(record: Record) -> Result<Self> {
        let data = serde_json::from_value(record.body).map_err(StoreError::from)?;
        Ok(Self {
            id: record.id,
            data,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// What a [`Resource::prepare`] hook gets to look at.
pub struct WriteContext<'a> {
    pub store: &'a dyn Store,
    /// Id of the document being updated; `None` on create.
    pub target: Option<Uuid>,
    pub password_cost: u32,
}

#[async_trait]
pub trait Resource: Serialize + DeserializeOwned + Validate + Send + Sync + 'static {
    const COLLECTION: &'static str;
    /// Used in messages such as "Service not found".
    const NAME: &'static str;
    const POLICY: Policy;

    /// Rewrites an incoming create/update payload before it is merged and
    /// validated.
    async fn prepare(_payload: &mut Map<String, Value>, _ctx: &WriteContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Response representation of a stored document.
    async fn present(doc: Document<Self>, _store: &dyn Store) -> Result<Value> {
        Ok(serde_json::to_value(doc).map_err(StoreError::from)?)
    }

    fn sort(_docs: &mut Vec<Document<Self>>) {}
}

pub struct Repository<R> {
    store: Arc<dyn Store>,
    password_cost: u32,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            password_cost: self.password_cost,
            _resource: PhantomData,
        }
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::validation("Request body must be a JSON object")),
    }
}

/// Decode and validate an entity from its merged JSON form.
fn parse<R: Resource>(fields: Map<String, Value>) -> Result<R> {
    let data: R = serde_json::from_value(Value::Object(fields))
        .map_err(|e| ApiError::validation(e.to_string()))?;
    data.validate()?;
    Ok(data)
}

/// Unique-value conflicts surface as "<Name> already exists".
fn write_error<R: Resource>(err: StoreError) -> ApiError {
    match err {
        StoreError::Duplicate(_) => ApiError::validation(format!("{} already exists", R::NAME)),
        other => other.into(),
    }
}

impl<R: Resource> Repository<R> {
    pub fn new(store: Arc<dyn Store>, password_cost: u32) -> Self {
        Self {
            store,
            password_cost,
            _resource: PhantomData,
        }
    }

    fn context(&self, target: Option<Uuid>) -> WriteContext<'_> {
        WriteContext {
            store: self.store.as_ref(),
            target,
            password_cost: self.password_cost,
        }
    }

    pub async fn list(&self) -> Result<Vec<Document<R>>> {
        let mut docs = self
            .store
            .list(R::COLLECTION)
            .await?
            .into_iter()
            .map(Document::from_record)
            .collect::<Result<Vec<_>>>()?;
        R::sort(&mut docs);
        Ok(docs)
    }

    pub async fn get(&self, id: Uuid) -> Result<Document<R>> {
        let record = self
            .store
            .get(R::COLLECTION, id)
            .await?
            .ok_or(ApiError::NotFound(R::NAME))?;
        Document::from_record(record)
    }

    pub async fn find_by(&self, field: &str, value: impl Into<Value>) -> Result<Option<Document<R>>> {
        self.store
            .find_one(R::COLLECTION, field, &value.into())
            .await?
            .map(Document::from_record)
            .transpose()
    }

    pub async fn first(&self) -> Result<Option<Document<R>>> {
        Ok(self.list().await?.into_iter().next())
    }

    /// Create from an untrusted JSON payload.
    pub async fn create(&self, payload: Value) -> Result<Document<R>> {
        let mut fields = into_object(payload)?;
        R::prepare(&mut fields, &self.context(None)).await?;
        self.insert(parse::<R>(fields)?).await
    }

    /// Store an already-built entity.
    pub async fn insert(&self, data: R) -> Result<Document<R>> {
        data.validate()?;
        let body = serde_json::to_value(&data).map_err(StoreError::from)?;
        let record = self
            .store
            .insert(R::COLLECTION, body)
            .await
            .map_err(write_error::<R>)?;
        Document::from_record(record)
    }

    /// Merge the supplied top-level fields over the stored document,
    /// re-validate and persist.
    pub async fn update(&self, id: Uuid, patch: Value) -> Result<Document<R>> {
        let current = self
            .store
            .get(R::COLLECTION, id)
            .await?
            .ok_or(ApiError::NotFound(R::NAME))?;

        let mut fields = into_object(patch)?;
        R::prepare(&mut fields, &self.context(Some(id))).await?;

        let mut merged = match current.body {
            Value::Object(map) => map,
            _ => return Err(ApiError::Internal(format!("{} {id} is not an object", R::NAME))),
        };
        merged.extend(fields);

        self.replace(id, parse::<R>(merged)?).await
    }

    pub async fn replace(&self, id: Uuid, data: R) -> Result<Document<R>> {
        data.validate()?;
        let body = serde_json::to_value(&data).map_err(StoreError::from)?;
        let record = self
            .store
            .replace(R::COLLECTION, id, body)
            .await
            .map_err(write_error::<R>)?
            .ok_or(ApiError::NotFound(R::NAME))?;
        Document::from_record(record)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if self.store.delete(R::COLLECTION, id).await? {
            Ok(())
        } else {
            Err(ApiError::NotFound(R::NAME))
        }
    }

    pub async fn delete_all(&self) -> Result<u64> {
        Ok(self.store.delete_all(R::COLLECTION).await?)
    }

    pub async fn present(&self, doc: Document<R>) -> Result<Value> {
        R::present(doc, self.store.as_ref()).await
    }

    pub async fn present_all(&self, docs: Vec<Document<R>>) -> Result<Vec<Value>> {
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            out.push(self.present(doc).await?);
        }
        Ok(out)
    }
}
