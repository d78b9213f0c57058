//! Path parsing and classification
//!
//! A path argument is one of three things: a Cloud Storage object
//! (`gs://bucket/key`), the literal `-` for standard input/output, or a local
//! filesystem path.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// URL scheme prefix for Cloud Storage references
pub const REMOTE_SCHEME: &str = "gs://";

/// Literal selecting standard input (as a source) or standard output (as a destination)
pub const STDIO_LITERAL: &str = "-";

/// Destination literal that takes its file name from the source
pub const BASENAME_LITERAL: &str = ".";

/// A parsed remote path pointing to a Cloud Storage object or prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    /// Bucket name
    pub bucket: String,
    /// Object key, or key prefix for listings
    pub key: String,
}

impl RemotePath {
    /// Create a new RemotePath
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse `gs://bucket/key` where both bucket and key are required
    pub fn parse(path: &str) -> Result<Self> {
        let rest = strip_scheme(path)?;
        let (bucket, key) = rest.split_once('/').ok_or_else(|| {
            Error::InvalidPath(format!(
                "'{path}' has no object key. Use format: gs://bucket/key"
            ))
        })?;

        if bucket.is_empty() {
            return Err(Error::InvalidPath(format!(
                "'{path}' has an empty bucket name"
            )));
        }
        if key.is_empty() {
            return Err(Error::InvalidPath(format!(
                "'{path}' has an empty object key"
            )));
        }

        Ok(Self::new(bucket, key))
    }

    /// Parse `gs://bucket[/prefix]` for listing; a missing prefix lists the whole bucket
    pub fn parse_prefix(path: &str) -> Result<Self> {
        let rest = strip_scheme(path)?;
        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));

        if bucket.is_empty() {
            return Err(Error::InvalidPath(format!(
                "'{path}' has an empty bucket name"
            )));
        }

        Ok(Self::new(bucket, prefix))
    }

    /// Final `/`-delimited segment of the key
    pub fn basename(&self) -> &str {
        basename(&self.key)
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{REMOTE_SCHEME}{}/{}", self.bucket, self.key)
    }
}

fn strip_scheme(path: &str) -> Result<&str> {
    path.strip_prefix(REMOTE_SCHEME).ok_or_else(|| {
        Error::InvalidPath(format!("'{path}' is not a {REMOTE_SCHEME} reference"))
    })
}

/// Final `/`-delimited segment of a path string
fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Where bytes come from or go to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Cloud Storage object
    Remote(RemotePath),
    /// Standard input or standard output
    Stdio,
    /// Local filesystem path
    Local(PathBuf),
}

impl Location {
    /// Classify a path argument
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::InvalidPath("Path cannot be empty".into()));
        }

        if path.starts_with(REMOTE_SCHEME) {
            return RemotePath::parse(path).map(Location::Remote);
        }

        if path == STDIO_LITERAL {
            return Ok(Location::Stdio);
        }

        Ok(Location::Local(PathBuf::from(path)))
    }

    /// Classify a destination argument, expanding `.` to the source's basename
    ///
    /// `source` is the raw source argument; for `gs://bucket/a/b/report.txt`
    /// or `a/b/report.txt` the destination `.` becomes the local file
    /// `report.txt` in the current directory.
    pub fn resolve_destination(source: &str, destination: &str) -> Result<Self> {
        if destination != BASENAME_LITERAL {
            return Self::parse(destination);
        }

        if source == STDIO_LITERAL {
            return Err(Error::InvalidPath(
                "Cannot derive a file name from standard input".into(),
            ));
        }

        let name = basename(source);
        if name.is_empty() || name == "." || name == ".." {
            return Err(Error::InvalidPath(format!(
                "Cannot derive a file name from '{source}'"
            )));
        }

        Ok(Location::Local(PathBuf::from(name)))
    }

    /// Check if this is a remote path
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Remote(_))
    }

    /// Check if this is standard input/output
    pub fn is_stdio(&self) -> bool {
        matches!(self, Location::Stdio)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Remote(p) => write!(f, "{p}"),
            Location::Stdio => f.write_str(STDIO_LITERAL),
            Location::Local(p) => write!(f, "{}", p.display()),
        }
    }
}
