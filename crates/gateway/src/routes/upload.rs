//! Image upload route handler.
//!
//! Accepts one multipart `image` field, validates type and size before any
//! storage call, and writes the object under a collision-resistant name of
//! the form `events/{timestamp}-{random}.{ext}`.

use axum::{
    Json,
    extract::{Multipart, State},
};
use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Hard cap on accepted image payloads.
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Length of the random filename suffix.
const SUFFIX_LEN: usize = 8;

/// Accepted MIME types and the extension each maps to.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpeg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
];

/// Successful upload reply.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: usize,
    #[serde(rename = "type")]
    pub content_type: String,
}

/// POST /api/upload
///
/// Multipart upload of a single `image` field. Validation failures answer
/// 400 without ever touching the object store.
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(ToOwned::to_owned)
            .ok_or_else(|| AppError::BadRequest("image field has no content type".to_string()))?;

        let Some(extension) = extension_for(&content_type) else {
            return Err(AppError::BadRequest(format!(
                "unsupported image type: {content_type}"
            )));
        };

        // Reads up to the transport body limit; the real cap is checked below.
        let data = field
            .bytes()
            .await
            .map_err(|_| AppError::BadRequest("image exceeds the 5MB limit".to_string()))?;

        if data.is_empty() {
            return Err(AppError::BadRequest("image is empty".to_string()));
        }
        if data.len() > MAX_IMAGE_BYTES {
            return Err(AppError::BadRequest("image exceeds the 5MB limit".to_string()));
        }

        let filename = object_name(extension);
        let size = data.len();

        state.objects().put(&filename, data, &content_type).await?;
        let url = state.objects().public_url(&filename)?;

        tracing::info!(%filename, size, "image uploaded");

        return Ok(Json(UploadResponse {
            url,
            filename,
            size,
            content_type,
        }));
    }

    Err(AppError::BadRequest(
        "multipart field 'image' is required".to_string(),
    ))
}

/// Extension for an accepted MIME type, `None` for everything else.
fn extension_for(content_type: &str) -> Option<&'static str> {
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| content_type.eq_ignore_ascii_case(mime))
        .map(|(_, extension)| *extension)
}

/// Collision-resistant object name: `events/{timestamp}-{random}.{ext}`.
fn object_name(extension: &str) -> String {
    let timestamp = Utc::now().timestamp_millis();
    let mut rng = rand::rng();
    let suffix: String = (&mut rng)
        .sample_iter(Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("events/{timestamp}-{suffix}.{extension}")
}
