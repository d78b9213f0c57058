//! ObjectStore and ObjectSink trait definitions
//!
//! These traits define the interface for Cloud Storage operations.
//! They allow the copier and lister to be decoupled from the storage SDK.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::error::Result;
use crate::path::RemotePath;
use crate::size::human_size;

/// Boxed byte stream used for every kind of source
pub type ByteReader = Box<dyn AsyncRead + Send + Unpin>;

/// An opened source
pub struct SourceStream {
    /// Bytes of the source, in order
    pub reader: ByteReader,

    /// Total size when the source knows it up front
    pub size: Option<u64>,
}

impl SourceStream {
    pub fn new(reader: ByteReader, size: Option<u64>) -> Self {
        Self { reader, size }
    }
}

impl std::fmt::Debug for SourceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceStream")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Metadata for a listed object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,

    /// Size in bytes
    pub size_bytes: u64,

    /// Human-readable size
    pub size_human: String,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<jiff::Timestamp>,

    /// ETag reported by the service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl ObjectInfo {
    /// Create a new ObjectInfo for an object
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size_bytes: size,
            size_human: human_size(size),
            last_modified: None,
            etag: None,
        }
    }
}

/// One page of a list operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResult {
    /// Listed objects
    pub items: Vec<ObjectInfo>,

    /// Whether the result is truncated (more items available)
    pub truncated: bool,

    /// Continuation token for the next page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

/// Options for list operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Maximum number of keys to return per request
    pub max_keys: Option<i32>,

    /// Continuation token for pagination
    pub continuation_token: Option<String>,
}

/// Writable destination that must be released exactly once
///
/// `commit` makes the written bytes durable (for remote objects this is the
/// point where the object becomes visible). `abort` releases the handle
/// without finalizing and consumes the sink. A sink whose commit failed or
/// was cancelled is still held and must be aborted.
#[async_trait]
pub trait ObjectSink: Send {
    /// Append bytes
    async fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Flush and finalize the destination
    async fn commit(&mut self) -> Result<()>;

    /// Release the destination without finalizing it
    async fn abort(self: Box<Self>) -> Result<()>;
}

/// Trait for Cloud Storage operations
///
/// This trait is implemented by the storage adapter and can be mocked for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Open a streaming reader for an object
    async fn open_read(&self, path: &RemotePath) -> Result<SourceStream>;

    /// Open a streaming writer for an object
    async fn open_write(&self, path: &RemotePath) -> Result<Box<dyn ObjectSink>>;

    /// List one page of objects whose key starts with `prefix.key`
    async fn list_objects(&self, prefix: &RemotePath, options: ListOptions) -> Result<ListResult>;
}
