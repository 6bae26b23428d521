//! Entities stored in the document store, with their validation rules and
//! per-collection hooks.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError};

use super::repository::{Document, Resource, WriteContext};
use super::{Store, StoreError};
use crate::auth::hash_password;
use crate::error::{ApiError, Result};
use crate::policy::Policy;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const DEFAULT_CATEGORY_COLOR: &str = "#ff014f";

lazy_static! {
    static ref HEX_COLOR: Regex =
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid hex colour regex");
}

fn hex_color(value: &str) -> std::result::Result<(), ValidationError> {
    if HEX_COLOR.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("hex_color"))
    }
}

fn optional_email(value: &str) -> std::result::Result<(), ValidationError> {
    if value.is_empty() || value.validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email"))
    }
}

fn default_true() -> bool {
    true
}

fn default_color() -> String {
    DEFAULT_CATEGORY_COLOR.to_string()
}

/// Accepts a category id, an empty string, `null`, or a populated category
/// object carrying `_id`.
fn category_ref<'de, D>(deserializer: D) -> std::result::Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw = Option::<Value>::deserialize(deserializer)?;
    let id = match &raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.trim(),
        Some(Value::Object(obj)) => match obj.get("_id") {
            Some(Value::String(s)) => s.trim(),
            _ => return Err(D::Error::custom("category object has no `_id`")),
        },
        Some(_) => return Err(D::Error::custom("category must be an id")),
    };
    if id.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(id)
        .map(Some)
        .map_err(|_| D::Error::custom("category must be a valid id"))
}

fn to_value<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value).map_err(StoreError::from)?)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
    /// bcrypt hash; stripped from every response.
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[async_trait]
impl Resource for User {
    const COLLECTION: &'static str = "users";
    const NAME: &'static str = "User";
    const POLICY: Policy = Policy::ADMIN_ONLY;

    async fn prepare(payload: &mut Map<String, Value>, ctx: &WriteContext<'_>) -> Result<()> {
        if let Some(email) = payload.get("email").and_then(Value::as_str) {
            let email = email.trim().to_lowercase();
            let key = Value::String(email.clone());
            if let Some(existing) = ctx.store.find_one(Self::COLLECTION, "email", &key).await? {
                if Some(existing.id) != ctx.target {
                    return Err(ApiError::validation("User already exists"));
                }
            }
            payload.insert("email".to_string(), key);
        }

        match payload.get("password") {
            None => {}
            // An edit form leaves the password blank to keep the current one.
            Some(Value::String(plain)) if plain.is_empty() && ctx.target.is_some() => {
                payload.remove("password");
            }
            Some(Value::Null) if ctx.target.is_some() => {
                payload.remove("password");
            }
            Some(Value::String(plain)) => {
                if plain.chars().count() < MIN_PASSWORD_LEN {
                    return Err(ApiError::validation(format!(
                        "Password must be at least {MIN_PASSWORD_LEN} characters"
                    )));
                }
                let hash = hash_password(plain.clone(), ctx.password_cost).await?;
                payload.insert("password".to_string(), Value::String(hash));
            }
            Some(_) => return Err(ApiError::validation("Password must be a string")),
        }
        Ok(())
    }

    async fn present(doc: Document<Self>, _store: &dyn Store) -> Result<Value> {
        let mut value = to_value(doc)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("password");
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl Resource for Service {
    const COLLECTION: &'static str = "services";
    const NAME: &'static str = "Service";
    const POLICY: Policy = Policy::PUBLIC_READ;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    #[default]
    Image,
    Video,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    /// Loose reference to a [`Category`]; never checked or cascaded.
    #[serde(default, deserialize_with = "category_ref")]
    pub category: Option<Uuid>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Likes cannot be negative"))]
    pub likes: i64,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub project_type: ProjectType,
}

#[async_trait]
impl Resource for Project {
    const COLLECTION: &'static str = "projects";
    const NAME: &'static str = "Project";
    const POLICY: Policy = Policy::PUBLIC_READ;

    async fn present(doc: Document<Self>, store: &dyn Store) -> Result<Value> {
        let category = match doc.data.category {
            Some(id) => match store.get(Category::COLLECTION, id).await? {
                Some(record) => to_value(Document::<Category>::from_record(record)?)?,
                None => Value::Null,
            },
            None => Value::Null,
        };
        let mut value = to_value(doc)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("category".to_string(), category);
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default = "default_color")]
    #[validate(custom(
        function = "hex_color",
        message = "Color must be a hex value like #ff014f."
    ))]
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Resource for Category {
    const COLLECTION: &'static str = "categories";
    const NAME: &'static str = "Category";
    const POLICY: Policy = Policy::PUBLIC_READ;
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<u8>,
}

impl Resource for Testimonial {
    const COLLECTION: &'static str = "testimonials";
    const NAME: &'static str = "Testimonial";
    const POLICY: Policy = Policy::PUBLIC_READ;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeKind {
    Experience,
    Education,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResumeItem {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Organization is required"))]
    pub organization: String,
    #[validate(length(min = 1, message = "Duration is required"))]
    pub duration: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ResumeKind,
    #[serde(default)]
    pub order: i32,
}

impl Resource for ResumeItem {
    const COLLECTION: &'static str = "resume";
    const NAME: &'static str = "Resume item";
    const POLICY: Policy = Policy::PUBLIC_READ;

    fn sort(docs: &mut Vec<Document<Self>>) {
        docs.sort_by_key(|d| d.data.order);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
}

#[async_trait]
impl Resource for Message {
    const COLLECTION: &'static str = "messages";
    const NAME: &'static str = "Message";
    const POLICY: Policy = Policy::INBOX;

    async fn prepare(payload: &mut Map<String, Value>, ctx: &WriteContext<'_>) -> Result<()> {
        if ctx.target.is_none() {
            payload.insert("isRead".to_string(), Value::Bool(false));
        }
        Ok(())
    }

    /// Newest first.
    fn sort(docs: &mut Vec<Document<Self>>) {
        docs.reverse();
    }
}

/// SMTP and notification settings. A single document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub email_user: String,
    #[serde(default)]
    pub email_pass: String,
    #[serde(default)]
    #[validate(custom(function = "optional_email", message = "Please enter a valid email"))]
    pub notification_email: String,
}

impl Settings {
    /// Notifications go out only when every field is filled in.
    pub fn notifications_enabled(&self) -> bool {
        !self.email_user.is_empty()
            && !self.email_pass.is_empty()
            && !self.notification_email.is_empty()
    }
}

impl Resource for Settings {
    const COLLECTION: &'static str = "settings";
    const NAME: &'static str = "Settings";
    const POLICY: Policy = Policy::ADMIN_ONLY;
}
