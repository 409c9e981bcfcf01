//! Meal image upload boundary.
//!
//! Mounted behind the bearer middleware, so the body is never read for an
//! unverified caller. Resizing is not done here: the thumbnail URL falls back
//! to the original.

use crate::auth::Claims;
use crate::errors::GateError;
use crate::models::UploadImageResponse;
use crate::routes::AppState;
use crate::services::StoredImage;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Bucket used when the form does not name one.
pub const DEFAULT_BUCKET: &str = "public";

const FILE_FIELD: &str = "image_file";
const BUCKET_FIELD: &str = "bucket";

/// Accepted image types and the extension stored for each.
const ACCEPTED_TYPES: [(&str, &str); 2] = [("image/png", "png"), ("image/jpeg", "jpg")];

struct UploadForm {
    bucket: String,
    file: Option<(String, axum::body::Bytes)>,
}

fn bad_request(reason: &str) -> GateError {
    tracing::debug!(target: "gate.handlers.upload_image", reason, "Rejected upload");
    GateError::BadRequest(reason.to_string())
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("multipart/form-data"))
}

/// Bucket names become a path segment of the object URL.
fn valid_bucket(bucket: &str) -> bool {
    !bucket.is_empty()
        && bucket
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && bucket != "."
        && bucket != ".."
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, GateError> {
    let mut form = UploadForm {
        bucket: DEFAULT_BUCKET.to_string(),
        file: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| bad_request("malformed multipart body"))?
    {
        let name = field.name().map(ToString::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let content_type = field
                    .content_type()
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_default();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| bad_request("malformed multipart body"))?;
                form.file = Some((content_type, bytes));
            }
            Some(BUCKET_FIELD) => {
                let bucket = field
                    .text()
                    .await
                    .map_err(|_| bad_request("malformed multipart body"))?;
                let bucket = bucket.trim();
                if !bucket.is_empty() {
                    form.bucket = bucket.to_string();
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Handler for POST /functions/v1/upload-image
///
/// Expects `multipart/form-data` with an `image_file` part (PNG or JPEG) and
/// an optional `bucket` part. The object is stored as
/// `<uuid>/original.<ext>` and owned by the verified subject.
#[instrument(skip_all, name = "gate.handlers.upload_image")]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadImageResponse>, GateError> {
    if !is_multipart(&headers) {
        return Err(bad_request("Content-Type must be multipart/form-data"));
    }
    let multipart =
        multipart.map_err(|_| bad_request("Content-Type must be multipart/form-data"))?;

    let form = read_form(multipart).await?;

    let (content_type, bytes) = match form.file {
        Some((content_type, bytes)) if !bytes.is_empty() => (content_type, bytes),
        _ => return Err(bad_request("image file not found")),
    };

    let extension = ACCEPTED_TYPES
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| bad_request("only PNG or JPEG images can be uploaded"))?;

    if !valid_bucket(&form.bucket) {
        return Err(bad_request("invalid bucket"));
    }

    let uuid = uuid::Uuid::new_v4().to_string();
    let original_path = format!("{uuid}/original.{extension}");
    let size = bytes.len();

    state
        .image_store
        .put(
            &form.bucket,
            &original_path,
            StoredImage {
                content_type,
                bytes,
                uploaded_by: claims.subject,
            },
        )
        .await?;

    tracing::info!(
        target: "gate.handlers.upload_image",
        bucket = %form.bucket,
        object = %original_path,
        size,
        "Stored uploaded image"
    );

    let original_url = format!(
        "{}/{}/{}",
        state.config.storage_public_url, form.bucket, original_path
    );

    Ok(Json(UploadImageResponse {
        success: true,
        uuid,
        thumbnail_url: original_url.clone(),
        original_url,
        bucket: form.bucket,
    }))
}
