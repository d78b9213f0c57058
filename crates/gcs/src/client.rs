//! Cloud Storage client implementation
//!
//! Wraps aws-sdk-s3 pointed at the Cloud Storage XML API and implements the
//! ObjectStore trait from gscp-core.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_smithy_types::retry::RetryConfig;
use aws_smithy_types::timeout::TimeoutConfig;

use gscp_core::{
    Error, ListOptions, ListResult, ObjectInfo, ObjectSink, ObjectStore, RemotePath, Result,
    SourceStream, StorageConfig,
};

use crate::multipart::GcsObjectWriter;

/// Cloud Storage client wrapper
pub struct GcsClient {
    inner: aws_sdk_s3::Client,
    part_size: u64,
}

impl GcsClient {
    /// Create a new client from storage settings
    pub async fn new(storage: &StorageConfig) -> Result<Self> {
        storage.validate()?;

        let timeouts = storage.timeout_config();
        let retry = storage.retry_config();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(storage.region.clone()))
            .endpoint_url(&storage.endpoint)
            .timeout_config(
                TimeoutConfig::builder()
                    .connect_timeout(Duration::from_millis(timeouts.connect_ms))
                    .build(),
            )
            .retry_config(RetryConfig::standard().with_max_attempts(retry.max_attempts.max(1)));

        // Without HMAC keys the SDK's default chain (AWS_* variables, profiles) applies
        if let Some((access_key, secret_key)) = storage.credentials()? {
            let credentials = aws_credential_types::Credentials::new(
                access_key,
                secret_key,
                None, // session token
                None, // expiry
                "gscp-static-credentials",
            );
            loader = loader.credentials_provider(credentials);
        }

        let config = loader.load().await;

        // Path-style addressing keeps dotted bucket names working over TLS
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(true)
            .build();

        tracing::debug!(endpoint = %storage.endpoint, region = %storage.region, "Created storage client");

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            part_size: storage.part_size,
        })
    }
}

/// Classify a service error code
fn classify(code: Option<&str>, target: &str, message: String) -> Error {
    match code {
        Some("NoSuchKey" | "NoSuchBucket" | "NotFound") => Error::NotFound(target.to_string()),
        Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "Forbidden") => {
            Error::Auth(format!("{target}: {message}"))
        }
        _ => Error::Network(message),
    }
}

/// Map an SDK error to the gscp-core error taxonomy
pub(crate) fn map_sdk_error<E>(err: SdkError<E>, target: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    if let SdkError::TimeoutError(_) = err {
        return Error::Network(format!("{target}: request timed out"));
    }

    let message = DisplayErrorContext(&err).to_string();
    classify(err.code(), target, message)
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn open_read(&self, path: &RemotePath) -> Result<SourceStream> {
        let response = self
            .inner
            .get_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;

        let size = response
            .content_length()
            .and_then(|len| u64::try_from(len).ok());
        tracing::debug!(source = %path, ?size, "Opened object for reading");

        Ok(SourceStream::new(
            Box::new(Box::pin(response.body.into_async_read())),
            size,
        ))
    }

    async fn open_write(&self, path: &RemotePath) -> Result<Box<dyn ObjectSink>> {
        Ok(Box::new(GcsObjectWriter::new(
            self.inner.clone(),
            path.clone(),
            self.part_size,
        )))
    }

    async fn list_objects(&self, prefix: &RemotePath, options: ListOptions) -> Result<ListResult> {
        let mut request = self.inner.list_objects_v2().bucket(&prefix.bucket);

        if !prefix.key.is_empty() {
            request = request.prefix(&prefix.key);
        }

        if let Some(max) = options.max_keys {
            request = request.max_keys(max);
        }

        if let Some(token) = &options.continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| match map_sdk_error(e, &prefix.to_string()) {
                Error::Network(msg) => Error::Listing(msg),
                other => other,
            })?;

        let items = response
            .contents()
            .iter()
            .map(|object| {
                let size = object
                    .size()
                    .and_then(|s| u64::try_from(s).ok())
                    .unwrap_or(0);
                let mut info = ObjectInfo::new(object.key().unwrap_or_default(), size);

                if let Some(modified) = object.last_modified() {
                    info.last_modified = jiff::Timestamp::from_second(modified.secs()).ok();
                }

                if let Some(etag) = object.e_tag() {
                    info.etag = Some(etag.trim_matches('"').to_string());
                }

                info
            })
            .collect();

        Ok(ListResult {
            items,
            truncated: response.is_truncated().unwrap_or(false),
            continuation_token: response.next_continuation_token().map(|s| s.to_string()),
        })
    }
}
