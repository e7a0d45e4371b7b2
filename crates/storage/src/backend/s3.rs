//! S3-compatible storage backend.
//!
//! This module provides an upload target for S3-compatible services
//! including AWS S3, Backblaze B2, Tigris (Fly.io), Cloudflare R2 and others.
//! Objects are written with a `public-read` canned ACL.
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file. Each
//! target specifies its own `key_id` and `key_secret`.

use crate::backend::ProgressFn;
use crate::error::{ErrorKind, Result};
use crate::models::{Access, Receipt, UploadOptions};
use crate::path::to_key;
use crate::{StorageBackend, validate_path};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
};
use exn::OptionExt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Generous default for concurrent S3 requests.
const DEFAULT_CONCURRENT_REQUESTS: usize = 100;

/// S3-compatible storage backend.
///
/// Stores files in an S3 bucket, optionally under a key prefix. All paths are
/// relative to the configured prefix (if any).
///
/// # Examples
///
/// ```no_run
/// use hoist_storage::backend::S3Backend;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = S3Backend::new(
///     "my-storage",
///     "my-bucket",
///     Some("uploads/".to_string()),
///     "us-west-004",
///     Some("https://s3.us-west-004.backblazeb2.com".to_string()),
///     None,
///     "access_key_id",
///     "secret_access_key",
/// ).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
    /// Base URL objects are publicly served from.
    public_url: String,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Backend {
    /// Create a new S3 storage backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in display/logging)
    /// * `bucket` - S3 bucket name
    /// * `prefix` - Optional key prefix (acts as virtual directory)
    /// * `region` - AWS region or provider-specific region (e.g., "us-west-004" for Backblaze)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `public_url` - Base URL for receipts; defaults to `{endpoint}/{bucket}`
    /// * `key_id` - AWS/provider access key ID
    /// * `key_secret` - AWS/provider secret access key
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<String>,
        public_url: Option<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self> {
        let prefix = prefix
            .map(validate_path)
            .transpose()?
            .map(|p| p.to_str().map(|s| s.to_string()).ok_or_raise(|| ErrorKind::InvalidPath(p)))
            .transpose()?;
        let name = name.into();
        let bucket = bucket.into();
        let region = region.into();
        let public_url = match (public_url, &endpoint) {
            (Some(url), _) => url,
            (None, Some(endpoint)) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
            (None, None) => format!("https://{bucket}.s3.{region}.amazonaws.com"),
        };
        let credentials = Credentials::new(key_id, key_secret, None, None, "hoist-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region))
            // Configure retry policy with exponential backoff (1 initial + 3 retries)
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Use path-style addressing for better compatibility with
            // S3-compatible services (Backblaze, MinIO, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        let client = Client::from_conf(config_builder.build());
        let rate_limiter = Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS));
        Ok(Self {
            name,
            client,
            bucket,
            prefix,
            public_url,
            rate_limiter,
        })
    }

    /// Construct the full S3 key from a relative path.
    fn full_key(&self, path: &Path) -> Result<String> {
        let key = to_key(&validate_path(path)?);
        Ok(join_prefix(self.prefix.as_deref(), &key))
    }

    /// Acquire a rate limiter permit before making an S3 API call.
    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        self.rate_limiter
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| exn::Exn::from(ErrorKind::BackendError("S3 rate limiter closed".to_string())))
    }
}

fn join_prefix(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
        None => key.to_string(),
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload(
        &self,
        path: &Path,
        data: &[u8],
        options: &UploadOptions,
        on_progress: ProgressFn<'_>,
    ) -> Result<Receipt> {
        let key = self.full_key(path)?;
        let acl = match options.access {
            Access::Public => ObjectCannedAcl::PublicRead,
        };
        let _permit = self.acquire_permit().await?;
        on_progress(0.0);
        // The SDK has no byte-level progress hook for a single PutObject,
        // so progress jumps from 0 to 100 once the request completes.
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .acl(acl)
            .content_type(&options.content_type)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| ErrorKind::Network(DisplayErrorContext(&e).to_string()))?;
        on_progress(100.0);
        tracing::debug!(target = %self.name, key = %key, bytes = data.len(), "Uploaded object");
        let url = format!("{}/{}", self.public_url.trim_end_matches('/'), key);
        Ok(Receipt::new(validate_path(path)?, url, data, options))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let key = self.full_key(path)?;
        let _permit = self.acquire_permit().await?;
        match self.client.head_object().bucket(&self.bucket).key(&key).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_error = err.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    exn::bail!(ErrorKind::Network(DisplayErrorContext(&service_error).to_string()))
                }
            },
        }
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let key = self.full_key(path)?;
        let _permit = self.acquire_permit().await?;
        let output = match self.client.get_object().bucket(&self.bucket).key(&key).send().await {
            Ok(output) => output,
            Err(err) => {
                let service_error = err.into_service_error();
                if service_error.is_no_such_key() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                exn::bail!(ErrorKind::Network(DisplayErrorContext(&service_error).to_string()))
            },
        };
        let body = output.body.collect().await.map_err(|e| ErrorKind::Network(e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_key_without_prefix() {
        assert_eq!(join_prefix(None, "photos/beach.jpg"), "photos/beach.jpg");
    }

    #[test]
    fn test_full_key_with_prefix() {
        assert_eq!(join_prefix(Some("uploads"), "photos/beach.jpg"), "uploads/photos/beach.jpg");
    }

    #[test]
    fn test_full_key_with_trailing_slash_prefix() {
        assert_eq!(join_prefix(Some("uploads/"), "photos/beach.jpg"), "uploads/photos/beach.jpg");
    }
}
