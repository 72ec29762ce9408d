//! Cloudflare R2 image uploads through the S3-compatible API.

use std::env;

use aws_credential_types::Credentials;
use aws_sdk_s3::{primitives::ByteStream, Client};
use aws_types::region::Region;

use crate::models::ImageUpload;
use crate::util::is_http_url;
use crate::{Error, Result};

use super::{resolve_content_type, BlobUploader, ProgressReporter};

const ENV_ACCOUNT_ID: &str = "R2_ACCOUNT_ID";
const ENV_BUCKET: &str = "R2_BUCKET";
const ENV_ACCESS_KEY_ID: &str = "R2_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "R2_SECRET_ACCESS_KEY";
const ENV_PUBLIC_BASE_URL: &str = "R2_PUBLIC_BASE_URL";

/// Cloudflare R2 configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct R2Config {
    /// Cloudflare account identifier.
    pub account_id: String,
    /// R2 bucket name.
    pub bucket: String,
    /// Access key id for S3-compatible auth.
    pub access_key_id: String,
    /// Secret access key for S3-compatible auth.
    pub secret_access_key: String,
    /// Public URL base images are served from.
    pub public_base_url: String,
}

impl std::fmt::Debug for R2Config {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("R2Config")
            .field("account_id", &self.account_id)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

impl R2Config {
    /// Load R2 configuration from environment variables.
    ///
    /// Returns `Ok(None)` when no R2 variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }

    /// Cloudflare R2 S3-compatible endpoint URL.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }
}

/// R2-backed image uploader.
#[derive(Clone, Debug)]
pub struct R2Storage {
    config: R2Config,
    client: Client,
}

impl R2Storage {
    #[must_use]
    pub fn new(config: R2Config) -> Self {
        let client = build_s3_client(&config);
        Self { config, client }
    }

    #[must_use]
    pub const fn config(&self) -> &R2Config {
        &self.config
    }

    /// Public URL an object key is served from.
    pub fn public_object_url(&self, object_key: &str) -> String {
        format!(
            "{}/{}",
            self.config.public_base_url,
            object_key.trim_matches('/')
        )
    }
}

impl BlobUploader for R2Storage {
    async fn upload(
        &self,
        object_key: &str,
        image: &ImageUpload,
        progress: &ProgressReporter,
    ) -> Result<String> {
        let object_key = normalize_object_key(object_key)?;
        let total_bytes = u64::try_from(image.size_bytes()).unwrap_or(u64::MAX);
        progress.report(0, total_bytes);

        tracing::debug!(
            bucket = %self.config.bucket,
            key = %object_key,
            bytes = total_bytes,
            "Uploading listing image"
        );

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .content_type(resolve_content_type(image))
            .body(ByteStream::from(image.bytes.clone()))
            .send()
            .await
            .map_err(|error| {
                storage_error("put_object", &self.config.bucket, Some(&object_key), error)
            })?;

        progress.report(total_bytes, total_bytes);
        Ok(self.public_object_url(&object_key))
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<R2Config>> {
    let account_id = lookup(ENV_ACCOUNT_ID).map(|value| value.trim().to_string());
    let bucket = lookup(ENV_BUCKET).map(|value| value.trim().to_string());
    let access_key_id = lookup(ENV_ACCESS_KEY_ID).map(|value| value.trim().to_string());
    let secret_access_key = lookup(ENV_SECRET_ACCESS_KEY).map(|value| value.trim().to_string());
    let public_base_url = lookup(ENV_PUBLIC_BASE_URL).map(|value| value.trim().to_string());

    let any_present = account_id.is_some()
        || bucket.is_some()
        || access_key_id.is_some()
        || secret_access_key.is_some()
        || public_base_url.is_some();

    if !any_present {
        return Ok(None);
    }

    let required = [
        (ENV_ACCOUNT_ID, account_id),
        (ENV_BUCKET, bucket),
        (ENV_ACCESS_KEY_ID, access_key_id),
        (ENV_SECRET_ACCESS_KEY, secret_access_key),
        (ENV_PUBLIC_BASE_URL, public_base_url),
    ];

    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.as_ref().map_or(true, String::is_empty))
        .map(|(key, _)| *key)
        .collect();

    if !missing.is_empty() {
        return Err(Error::InvalidInput(format!(
            "R2 configuration is incomplete. Missing: {}",
            missing.join(", ")
        )));
    }

    let [account_id, bucket, access_key_id, secret_access_key, public_base_url] =
        required.map(|(_, value)| value.unwrap_or_default());

    if !is_http_url(&public_base_url) {
        return Err(Error::InvalidInput(
            "R2_PUBLIC_BASE_URL must start with http:// or https://".to_string(),
        ));
    }

    Ok(Some(R2Config {
        account_id,
        bucket,
        access_key_id,
        secret_access_key,
        public_base_url: public_base_url.trim_end_matches('/').to_string(),
    }))
}

fn build_s3_client(config: &R2Config) -> Client {
    let credentials = Credentials::new(
        config.access_key_id.clone(),
        config.secret_access_key.clone(),
        None,
        None,
        "hearth-core-r2-storage",
    );

    let sdk_config = aws_sdk_s3::config::Builder::new()
        .region(Region::new("auto"))
        .credentials_provider(credentials)
        .endpoint_url(config.endpoint_url())
        .force_path_style(true)
        .build();

    Client::from_conf(sdk_config)
}

fn storage_error(
    operation: &str,
    bucket: &str,
    object_key: Option<&str>,
    error: impl std::fmt::Display,
) -> Error {
    let target = object_key.map_or_else(|| bucket.to_string(), |key| format!("{bucket}/{key}"));
    Error::Storage(format!("R2 {operation} failed for {target}: {error}"))
}

fn normalize_object_key(object_key: &str) -> Result<String> {
    let object_key = object_key.trim().trim_matches('/').to_string();
    if object_key.is_empty() {
        return Err(Error::InvalidInput(
            "Image object_key cannot be empty".to_string(),
        ));
    }
    Ok(object_key)
}
