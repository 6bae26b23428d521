/**
 * Upload Routes
 * Single-file multipart upload into the static uploads directory
 */
use std::path::Path;

use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::policy::{guard, Access};
use crate::AppState;

const FILE_FIELD: &str = "file";
const ALLOWED_EXTENSIONS: &[&str] = &[
    "jpeg", "jpg", "png", "gif", "webp", "svg", "pdf", "html", "htm", "mp4", "mov", "avi", "wmv",
    "mp3", "wav", "ogg", "mpeg",
];
const ALLOWED_MIME_PREFIXES: &[&str] = &["image/", "video/", "audio/"];
const ALLOWED_MIME_TYPES: &[&str] = &["application/pdf", "text/html"];
const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: usize,
    pub mime_type: String,
}

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().route("/", guard(Access::Authenticated, state, post(upload)))
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

fn mime_allowed(mime: &str) -> bool {
    let mime = mime.to_ascii_lowercase();
    ALLOWED_MIME_PREFIXES.iter().any(|p| mime.starts_with(p))
        || ALLOWED_MIME_TYPES.contains(&mime.as_str())
}

/// Accepted when either the extension or the declared MIME type is on the
/// allow list.
pub fn is_allowed(filename: &str, mime: &str) -> bool {
    extension_of(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        || mime_allowed(mime)
}

/// Extension for the stored copy: the original one when allow-listed,
/// otherwise derived from the MIME subtype (`image/svg+xml` -> `svg`).
fn stored_extension(filename: &str, mime: &str) -> String {
    if let Some(ext) = extension_of(filename) {
        if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return ext;
        }
    }
    let subtype: String = mime
        .split('/')
        .nth(1)
        .unwrap_or_default()
        .split(['+', ';'])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    if subtype.is_empty() {
        "bin".to_string()
    } else {
        subtype
    }
}

fn unique_filename(ext: &str) -> String {
    format!(
        "{}-{:08x}.{}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>(),
        ext
    )
}

fn max_mb(max_bytes: usize) -> usize {
    (max_bytes / (1024 * 1024)).max(1)
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(max_mb(max_bytes))
    } else {
        ApiError::validation(err.body_text())
    }
}

/// POST /api/upload
pub async fn upload(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let mut multipart = multipart.map_err(|e| ApiError::validation(e.body_text()))?;
    let max_bytes = state.config.uploads.max_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let response = store_file(&state, field).await?;
        return Ok((StatusCode::CREATED, Json(response)));
    }

    Err(ApiError::validation("No file uploaded"))
}

async fn store_file(state: &AppState, mut field: Field<'_>) -> Result<UploadResponse> {
    let max_bytes = state.config.uploads.max_bytes;
    let original = field.file_name().unwrap_or_default().to_string();
    let mime = field.content_type().unwrap_or(FALLBACK_MIME).to_string();

    if !is_allowed(&original, &mime) {
        tracing::warn!(filename = %original, %mime, "upload rejected: unsupported type");
        return Err(ApiError::UnsupportedMediaType);
    }

    let mut data = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if data.len() + chunk.len() > max_bytes {
            tracing::warn!(filename = %original, max_bytes, "upload rejected: too large");
            return Err(ApiError::PayloadTooLarge(max_mb(max_bytes)));
        }
        data.extend_from_slice(&chunk);
    }
    if data.is_empty() {
        return Err(ApiError::validation("Uploaded file is empty"));
    }

    let dir = &state.config.uploads.dir;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to create upload directory: {e}")))?;

    let filename = unique_filename(&stored_extension(&original, &mime));
    tokio::fs::write(dir.join(&filename), &data)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to save upload: {e}")))?;

    tracing::info!(%filename, original = %original, size = data.len(), %mime, "file uploaded");

    Ok(UploadResponse {
        url: format!("/uploads/{filename}"),
        filename,
        size: data.len(),
        mime_type: mime,
    })
}
