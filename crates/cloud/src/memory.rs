//! In-process implementations of the service traits.
//!
//! Used by the handler test suites and for running the pipeline locally
//! without AWS credentials. Each one can be switched into an "unavailable"
//! mode to exercise the external-service failure path.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{CloudError, ObjectStore, PresignedUrl, TrackingTable, WorkflowEngine};

// ---------------------------------------------------------------------------
// Object store
// ---------------------------------------------------------------------------

/// A stored object and the content type it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    unavailable: Option<String>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails with `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            objects: Mutex::default(),
            unavailable: Some(reason.into()),
        }
    }

    /// Seed an object.
    pub async fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.objects.lock().await.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.into(),
                content_type: None,
            },
        );
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// All keys in `bucket`, sorted.
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    fn check_available(&self) -> Result<(), CloudError> {
        match &self.unavailable {
            Some(reason) => Err(CloudError::Storage(reason.clone())),
            None => Ok(()),
        }
    }

    async fn store(&self, bucket: &str, key: &str, object: StoredObject) {
        self.objects
            .lock()
            .await
            .insert((bucket.to_string(), key.to_string()), object);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, CloudError> {
        self.check_available()?;
        self.get(bucket, key)
            .await
            .map(|object| object.body)
            .ok_or_else(|| CloudError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), CloudError> {
        self.check_available()?;
        self.store(
            bucket,
            key,
            StoredObject {
                body,
                content_type: Some(content_type.to_string()),
            },
        )
        .await;
        Ok(())
    }

    async fn download_file(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
    ) -> Result<u64, CloudError> {
        let body = self.get_object(bucket, key).await?;
        tokio::fs::write(dest, &body).await?;
        Ok(body.len() as u64)
    }

    async fn upload_file(&self, bucket: &str, key: &str, src: &Path) -> Result<(), CloudError> {
        self.check_available()?;
        let body = tokio::fs::read(src).await?;
        self.store(
            bucket,
            key,
            StoredObject {
                body,
                content_type: None,
            },
        )
        .await;
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<PresignedUrl, CloudError> {
        self.check_available()?;
        let lifetime = chrono::TimeDelta::from_std(expires_in)
            .map_err(|e| CloudError::Presign(e.to_string()))?;
        Ok(PresignedUrl {
            url: format!(
                "memory://{bucket}/{key}?expires_in={}",
                expires_in.as_secs()
            ),
            expires_at: Utc::now() + lifetime,
        })
    }
}

// ---------------------------------------------------------------------------
// Tracking table
// ---------------------------------------------------------------------------

/// Rows are plain JSON objects keyed by their `Id` field.
#[derive(Default)]
pub struct MemoryTrackingTable {
    rows: Mutex<Vec<serde_json::Value>>,
    unavailable: Option<String>,
}

impl MemoryTrackingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            rows: Mutex::default(),
            unavailable: Some(reason.into()),
        }
    }

    pub async fn push(&self, row: serde_json::Value) {
        self.rows.lock().await.push(row);
    }
}

#[async_trait]
impl TrackingTable for MemoryTrackingTable {
    async fn query_by_id(&self, id: &str) -> Result<Vec<serde_json::Value>, CloudError> {
        if let Some(reason) = &self.unavailable {
            return Err(CloudError::Table(reason.clone()));
        }
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| row.get("Id").and_then(|v| v.as_str()) == Some(id))
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Workflow engine
// ---------------------------------------------------------------------------

/// Records every execution input instead of running anything.
#[derive(Default)]
pub struct RecordingWorkflowEngine {
    started: Mutex<Vec<String>>,
    unavailable: Option<String>,
}

impl RecordingWorkflowEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            started: Mutex::default(),
            unavailable: Some(reason.into()),
        }
    }

    /// Inputs of all started executions, oldest first.
    pub async fn started(&self) -> Vec<String> {
        self.started.lock().await.clone()
    }
}

#[async_trait]
impl WorkflowEngine for RecordingWorkflowEngine {
    async fn start_execution(&self, input: &str) -> Result<String, CloudError> {
        if let Some(reason) = &self.unavailable {
            return Err(CloudError::Workflow(reason.clone()));
        }
        let mut started = self.started.lock().await;
        started.push(input.to_string());
        Ok(format!("memory:execution:{}", started.len()))
    }
}
