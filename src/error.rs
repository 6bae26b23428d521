//! API error type and its JSON rendering.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::ValidationErrors;

use crate::db::StoreError;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Option<ValidationErrors>,
    },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("File too large. Maximum size is {0} MB.")]
    PayloadTooLarge(usize),

    #[error("File type not supported. Allowed: images, videos, audio, HTML, and PDF.")]
    UnsupportedMediaType,

    #[error(transparent)]
    Store(StoreError),

    #[error("internal server error, {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation {
            message: "There were validation errors with your request.".to_string(),
            errors: Some(errors),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => Self::validation(format!("Duplicate value for {field}")),
            other => Self::Store(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue.to_string(),
            })
        })
        .collect();
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            Self::Validation { message, errors } => ErrorResponse {
                message: message.clone(),
                errors: errors.as_ref().map(field_errors),
            },
            Self::Store(err) => {
                tracing::error!(error = %err, "store operation failed");
                ErrorResponse {
                    message: "Internal server error".to_string(),
                    errors: None,
                }
            }
            Self::Internal(details) => {
                tracing::error!(%details, "server returned 500 status");
                ErrorResponse {
                    message: "Internal server error".to_string(),
                    errors: None,
                }
            }
            other => ErrorResponse {
                message: other.to_string(),
                errors: None,
            },
        };

        (status, Json(body)).into_response()
    }
}
