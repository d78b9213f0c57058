//! Streaming multipart upload
//!
//! Uploads of unknown length are buffered one part at a time. Small objects
//! never leave the buffer and are sent with a single PutObject on commit;
//! once a part fills, a multipart upload is started and parts are sent as
//! they complete.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use gscp_core::{Error, ObjectSink, RemotePath, Result};

use crate::client::map_sdk_error;

/// Minimum part size: 5 MiB (all parts but the last)
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum part size: 5 GiB
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum number of parts in one upload
pub const MAX_PARTS: usize = 10_000;

/// Clamp a configured part size to what the service accepts
pub fn clamp_part_size(size: u64) -> usize {
    size.clamp(MIN_PART_SIZE, MAX_PART_SIZE) as usize
}

/// Accumulates written bytes and hands out full parts
#[derive(Debug)]
pub struct PartBuffer {
    part_size: usize,
    pending: Vec<u8>,
}

impl PartBuffer {
    pub fn new(part_size: usize) -> Self {
        Self {
            part_size: part_size.max(1),
            pending: Vec::new(),
        }
    }

    /// Append `data`, returning every part that is now full
    pub fn push(&mut self, mut data: &[u8]) -> Vec<Vec<u8>> {
        let mut parts = Vec::new();

        while !data.is_empty() {
            let room = self.part_size - self.pending.len();
            let take = room.min(data.len());
            self.pending.extend_from_slice(&data[..take]);
            data = &data[take..];

            if self.pending.len() == self.part_size {
                parts.push(std::mem::take(&mut self.pending));
            }
        }

        parts
    }

    /// Bytes not yet handed out as a part
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Take the trailing partial part, leaving the buffer empty
    pub fn take_pending(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending)
    }
}

/// Upload requests the writer sends to the service
#[async_trait]
pub trait UploadApi: Send + Sync {
    /// Store `data` as the whole object
    async fn send_whole(&self, path: &RemotePath, content_type: &str, data: Vec<u8>)
    -> Result<()>;

    /// Start a multipart upload, returning its id
    async fn create_upload(&self, path: &RemotePath, content_type: &str) -> Result<String>;

    /// Send one part, returning its ETag
    async fn send_part(
        &self,
        path: &RemotePath,
        upload_id: &str,
        part_number: i32,
        data: Vec<u8>,
    ) -> Result<Option<String>>;

    /// Assemble the uploaded parts into the object
    async fn complete_upload(
        &self,
        path: &RemotePath,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<()>;

    /// Discard an unfinished upload and its parts
    async fn abort_upload(&self, path: &RemotePath, upload_id: &str) -> Result<()>;
}

#[async_trait]
impl UploadApi for aws_sdk_s3::Client {
    async fn send_whole(
        &self,
        path: &RemotePath,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<()> {
        self.put_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| Error::Commit(format!("{path}: {}", DisplayErrorContext(&e))))?;
        Ok(())
    }

    async fn create_upload(&self, path: &RemotePath, content_type: &str) -> Result<String> {
        let response = self
            .create_multipart_upload()
            .bucket(&path.bucket)
            .key(&path.key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;

        response
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| Error::Network("Service returned no upload id".into()))
    }

    async fn send_part(
        &self,
        path: &RemotePath,
        upload_id: &str,
        part_number: i32,
        data: Vec<u8>,
    ) -> Result<Option<String>> {
        let response = self
            .upload_part()
            .bucket(&path.bucket)
            .key(&path.key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;

        Ok(response.e_tag().map(str::to_string))
    }

    async fn complete_upload(
        &self,
        path: &RemotePath,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<()> {
        let multipart = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        self.complete_multipart_upload()
            .bucket(&path.bucket)
            .key(&path.key)
            .upload_id(upload_id)
            .multipart_upload(multipart)
            .send()
            .await
            .map_err(|e| Error::Commit(format!("{path}: {}", DisplayErrorContext(&e))))?;
        Ok(())
    }

    async fn abort_upload(&self, path: &RemotePath, upload_id: &str) -> Result<()> {
        self.abort_multipart_upload()
            .bucket(&path.bucket)
            .key(&path.key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;
        Ok(())
    }
}

/// Multipart upload that has been started on the service
#[derive(Debug)]
struct UploadState {
    upload_id: String,
    parts: Vec<CompletedPart>,
}

impl UploadState {
    fn next_part_number(&self) -> i32 {
        self.parts.len() as i32 + 1
    }
}

/// ObjectSink writing one Cloud Storage object
///
/// While a multipart upload is open its id is kept until the upload is
/// completed or aborted, so a failed or cancelled commit can still be
/// aborted afterwards.
pub struct GcsObjectWriter<A = aws_sdk_s3::Client> {
    api: A,
    path: RemotePath,
    content_type: String,
    buffer: PartBuffer,
    upload: Option<UploadState>,
}

impl GcsObjectWriter {
    pub(crate) fn new(client: aws_sdk_s3::Client, path: RemotePath, part_size: u64) -> Self {
        Self::with_api(client, path, clamp_part_size(part_size))
    }
}

impl<A: UploadApi> GcsObjectWriter<A> {
    fn with_api(api: A, path: RemotePath, part_size: usize) -> Self {
        let content_type = mime_guess::from_path(&path.key)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Self {
            api,
            path,
            content_type,
            buffer: PartBuffer::new(part_size),
            upload: None,
        }
    }

    async fn upload_part(&mut self, data: Vec<u8>) -> Result<()> {
        if self.upload.is_none() {
            let upload_id = self
                .api
                .create_upload(&self.path, &self.content_type)
                .await?;
            tracing::debug!(object = %self.path, %upload_id, "Started multipart upload");
            self.upload = Some(UploadState {
                upload_id,
                parts: Vec::new(),
            });
        }
        let Some(upload) = self.upload.as_mut() else {
            return Err(Error::General("Multipart upload was not started".into()));
        };

        if upload.parts.len() >= MAX_PARTS {
            return Err(Error::Transfer(format!(
                "{} exceeds {MAX_PARTS} parts; raise storage.part_size",
                self.path
            )));
        }

        let part_number = upload.next_part_number();
        let size = data.len();
        let e_tag = self
            .api
            .send_part(&self.path, &upload.upload_id, part_number, data)
            .await?;

        upload.parts.push(
            CompletedPart::builder()
                .set_e_tag(e_tag)
                .part_number(part_number)
                .build(),
        );
        tracing::debug!(object = %self.path, part_number, size, "Uploaded part");
        Ok(())
    }

    async fn finish_upload(&mut self, tail: Vec<u8>) -> Result<()> {
        if !tail.is_empty() {
            self.upload_part(tail).await?;
        }

        let Some(upload) = &self.upload else {
            return Err(Error::Commit(format!("{}: upload state lost", self.path)));
        };
        self.api
            .complete_upload(&self.path, &upload.upload_id, upload.parts.clone())
            .await?;

        self.upload = None;
        Ok(())
    }

    /// Abort the open multipart upload, if any
    async fn abort_upload(&mut self) -> Result<()> {
        let Some(upload) = self.upload.take() else {
            return Ok(());
        };

        tracing::warn!(object = %self.path, upload_id = %upload.upload_id, "Aborting multipart upload");
        self.api.abort_upload(&self.path, &upload.upload_id).await
    }
}

#[async_trait]
impl<A: UploadApi + 'static> ObjectSink for GcsObjectWriter<A> {
    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        for part in self.buffer.push(buf) {
            self.upload_part(part).await?;
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tail = self.buffer.take_pending();

        if self.upload.is_none() {
            return self
                .api
                .send_whole(&self.path, &self.content_type, tail)
                .await;
        }

        let err = match self.finish_upload(tail).await {
            Ok(()) => return Ok(()),
            Err(Error::Commit(msg)) => Error::Commit(msg),
            Err(other) => Error::Commit(format!("{}: {other}", self.path)),
        };

        if let Err(abort_err) = self.abort_upload().await {
            tracing::warn!(object = %self.path, "Failed to abort upload: {abort_err}");
        }
        Err(err)
    }

    async fn abort(mut self: Box<Self>) -> Result<()> {
        self.abort_upload().await
    }
}
