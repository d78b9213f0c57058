//! gscp-core: Core library for the gscp Cloud Storage copy tool
//!
//! This crate provides the core functionality for gscp, including:
//! - Path classification (`gs://bucket/key`, `-`, local paths)
//! - The stream copier and prefix lister
//! - Human-readable size formatting
//! - Configuration management
//! - ObjectStore/ObjectSink traits for storage operations
//!
//! This crate is independent of any storage SDK, so the copier can be
//! tested against in-memory stores.

pub mod config;
pub mod error;
pub mod list;
pub mod path;
pub mod size;
pub mod storage;
pub mod traits;
pub mod transfer;

pub use config::{Config, ConfigManager};
pub use error::{Error, Result};
pub use list::{format_entry, list_prefix};
pub use path::{Location, RemotePath};
pub use size::human_size;
pub use storage::StorageConfig;
pub use traits::{
    ByteReader, ListOptions, ListResult, ObjectInfo, ObjectSink, ObjectStore, SourceStream,
};
pub use transfer::{Copier, TransferObserver, TransferOptions, TransferSummary};
