//! Narrow seams over the managed services the pipeline talks to.
//!
//! Each service is a trait so handlers can run against the AWS
//! implementations in [`aws`] or the in-process ones in [`memory`]:
//!
//! - [`ObjectStore`]: source images, inference documents, reports.
//! - [`TrackingTable`]: job submissions and their status history.
//! - [`WorkflowEngine`]: starts one execution per job.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod aws;
pub mod convert;
pub mod error;
pub mod memory;

pub use error::CloudError;

/// A time-limited, read-only link to one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read a whole object into memory.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, CloudError>;

    /// Write `body` to `key`, replacing any existing object.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), CloudError>;

    /// Stream an object into a local file. Returns the number of bytes written.
    async fn download_file(&self, bucket: &str, key: &str, dest: &Path)
        -> Result<u64, CloudError>;

    /// Upload a local file to `key`.
    async fn upload_file(&self, bucket: &str, key: &str, src: &Path) -> Result<(), CloudError>;

    /// Issue a GET link for `key` valid for `expires_in`.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<PresignedUrl, CloudError>;
}

#[async_trait]
pub trait TrackingTable: Send + Sync {
    /// All entries whose partition key equals `id`, as plain JSON objects,
    /// in index order.
    async fn query_by_id(&self, id: &str) -> Result<Vec<serde_json::Value>, CloudError>;
}

#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Start one execution with `input` (a JSON document). Returns the
    /// execution identifier.
    async fn start_execution(&self, input: &str) -> Result<String, CloudError>;
}
