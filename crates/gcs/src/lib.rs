//! gscp-gcs: Cloud Storage adapter for gscp
//!
//! This crate provides the implementation of the ObjectStore trait using the
//! aws-sdk-s3 crate against the Cloud Storage XML API
//! (`https://storage.googleapis.com`) with HMAC credentials. It is the only
//! crate that directly depends on the AWS SDK.

pub mod client;
pub mod multipart;

pub use client::GcsClient;
