//! Blob storage for listing images.

mod progress;
mod r2;

pub use progress::{ProgressReporter, UploadProgress};
pub use r2::{R2Config, R2Storage};

use uuid::Uuid;

use crate::models::{ImageUpload, UserId};
use crate::util::sanitize_token;
use crate::Result;

/// Key prefix for listing images.
pub const IMAGE_PREFIX: &str = "images";

/// Uploads a blob and returns its durable public URL.
///
/// Implementations must tolerate concurrent independent invocations.
#[allow(async_fn_in_trait)]
pub trait BlobUploader {
    async fn upload(
        &self,
        object_key: &str,
        image: &ImageUpload,
        progress: &ProgressReporter,
    ) -> Result<String>;
}

/// Build a collision-free object key: `images/{random id}-{owner}-{file name}`.
pub fn image_object_key(owner: &UserId, file_name: &str) -> String {
    let owner = sanitize_token(owner.as_str());
    let owner = if owner.is_empty() {
        "anonymous".to_string()
    } else {
        owner
    };
    format!(
        "{IMAGE_PREFIX}/{}-{owner}-{}",
        Uuid::now_v7(),
        sanitize_file_name(file_name)
    )
}

/// Content type for an upload: the picker's value, else sniffed from the bytes.
pub fn resolve_content_type(image: &ImageUpload) -> String {
    if let Some(content_type) = image
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return content_type.to_string();
    }

    image::guess_format(&image.bytes).map_or_else(
        |_| "application/octet-stream".to_string(),
        |format| format.to_mime_type().to_string(),
    )
}

fn sanitize_file_name(file_name: &str) -> String {
    let trimmed = file_name.trim().trim_matches('/');
    if trimmed.is_empty() {
        return "file".to_string();
    }

    let (stem, ext) = trimmed
        .rsplit_once('.')
        .map_or((trimmed, ""), |parts| parts);
    let stem = sanitize_token(stem);
    let stem = if stem.is_empty() {
        "file".to_string()
    } else {
        stem
    };
    let ext = sanitize_token(ext);

    if ext.is_empty() {
        stem
    } else {
        format!("{stem}.{ext}")
    }
}
