//! S3-compatible storage backend.
//!
//! Works against AWS S3 and S3-compatible services (Backblaze B2, MinIO,
//! Tigris...). Credentials are always supplied explicitly by the caller;
//! the SDK's ambient credential chain is never consulted.

use crate::{
    FileInfo, StorageBackend,
    backend::{BoxSyncRead, FileInfoStream},
    error::{ErrorKind, Result},
    path::{to_slash, validate as validate_path, validate_prefix},
};
use async_stream::stream;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::{DisplayErrorContext, SdkError},
    primitives::DateTime,
};
use exn::ResultExt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// S3-compatible storage backend over one bucket.
///
/// Paths are object keys; a key prefix is expressed by listing with a
/// prefix, not by configuring the backend.
///
/// # Examples
///
/// ```no_run
/// use filecat_storage::backend::S3Backend;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = S3Backend::connect(
///     "samples",
///     "my-bucket",
///     "us-west-004",
///     Some("https://s3.us-west-004.backblazeb2.com"),
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
}

impl S3Backend {
    /// Build a client and check the bucket is reachable with the given
    /// credentials.
    ///
    /// # Errors
    ///
    /// [`Unavailable`](ErrorKind::Unavailable) if the bucket can't be
    /// reached or the credentials are rejected.
    pub async fn connect(
        name: impl Into<String>,
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let bucket = bucket.into();
        let credentials = Credentials::new(key_id, key_secret, None, None, "filecat");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // 1 initial attempt + 3 retries with exponential backoff
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Path-style addressing for S3-compatible services.
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        let client = Client::from_conf(config_builder.build());

        tracing::debug!(backend = %name, %bucket, "Checking bucket access");
        if let Err(err) = client.head_bucket().bucket(&bucket).send().await {
            exn::bail!(ErrorKind::Unavailable(format!(
                "bucket {bucket}: {}",
                DisplayErrorContext(&err)
            )));
        }
        Ok(Self { name, client, bucket })
    }

    fn key(path: &Path) -> Result<String> {
        to_slash(&validate_path(path)?)
    }

    fn sdk_error<E, R>(err: SdkError<E, R>) -> ErrorKind
    where
        E: std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        let message = DisplayErrorContext(&err).to_string();
        match err {
            SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => ErrorKind::Network(message),
            _ => ErrorKind::BackendError(message),
        }
    }

    /// Convert one listed object into file metadata. Directory markers
    /// (keys ending in `/`) and keys outside `prefix` component-wise yield
    /// `None`.
    fn object_info(
        key: &str,
        size: Option<i64>,
        modified: Option<&DateTime>,
        prefix: Option<&Path>,
    ) -> Option<Result<FileInfo>> {
        if key.ends_with('/') {
            return None;
        }
        let path = match validate_path(key) {
            Ok(path) => path,
            Err(err) => return Some(Err(err)),
        };
        if let Some(prefix) = prefix
            && !path.starts_with(prefix)
        {
            return None;
        }
        Some(Self::file_info(path, size, modified))
    }

    fn file_info(path: PathBuf, size: Option<i64>, modified: Option<&DateTime>) -> Result<FileInfo> {
        let size = u64::try_from(size.unwrap_or_default())
            .or_raise(|| ErrorKind::BackendError(format!("negative size for {}", path.display())))?;
        let modified = match modified {
            Some(dt) => Self::parse_datetime(dt)?,
            None => exn::bail!(ErrorKind::BackendError(format!("no modification time for {}", path.display()))),
        };
        Ok(FileInfo::new(path, size, modified))
    }

    fn parse_datetime(dt: &DateTime) -> Result<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(dt.as_nanos())
            .or_raise(|| ErrorKind::BackendError("S3 datetime out of range".to_string()))
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match validate_prefix(prefix) {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };
        let key_prefix = match validated_prefix.as_deref().map(to_slash).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            let mut continuation_token: Option<String> = None;
            loop {
                tracing::debug!(backend = %self.name, prefix = ?key_prefix, "Listing objects");
                let response = self
                    .client
                    .list_objects_v2()
                    .bucket(&self.bucket)
                    .set_prefix(key_prefix.clone())
                    .set_continuation_token(continuation_token.take())
                    .send()
                    .await;
                let response = match response {
                    Ok(response) => response,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::sdk_error(err)));
                        break;
                    }
                };
                for object in response.contents() {
                    let Some(key) = object.key() else { continue };
                    if let Some(info) = Self::object_info(key, object.size(), object.last_modified(), validated_prefix.as_deref()) {
                        yield info;
                    }
                }
                match response.next_continuation_token() {
                    Some(token) => continuation_token = Some(token.to_string()),
                    None => break,
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let key = Self::key(path)?;
        match self.client.head_object().bucket(&self.bucket).key(&key).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(exn::Exn::from(Self::sdk_error(err))),
        }
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let key = Self::key(path)?;
        let response = match self.client.get_object().bucket(&self.bucket).key(&key).send().await {
            Ok(response) => response,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()))
            },
            Err(err) => exn::bail!(Self::sdk_error(err)),
        };
        let body = response.body.collect().await.or_raise(|| ErrorKind::Network(format!("reading body of {key}")))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        Ok(Box::new(Cursor::new(self.read(path).await?)))
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let key = Self::key(path)?;
        let response = match self.client.head_object().bucket(&self.bucket).key(&key).send().await {
            Ok(response) => response,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()))
            },
            Err(err) => exn::bail!(Self::sdk_error(err)),
        };
        Self::file_info(validate_path(&key)?, response.content_length(), response.last_modified())
    }
}
