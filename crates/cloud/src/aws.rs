//! AWS-backed implementations of the service traits.
//!
//! SDK clients are built once per process from the default credential
//! chain and shared read-only by every invocation the runtime routes to
//! that process.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;

use crate::convert::item_to_json;
use crate::{CloudError, ObjectStore, PresignedUrl, TrackingTable, WorkflowEngine};

// ---------------------------------------------------------------------------
// Shared clients
// ---------------------------------------------------------------------------

/// SDK clients for every service the pipeline uses.
#[derive(Debug, Clone)]
pub struct AwsClients {
    pub s3: aws_sdk_s3::Client,
    pub dynamodb: aws_sdk_dynamodb::Client,
    pub sfn: aws_sdk_sfn::Client,
}

static SHARED: OnceCell<AwsClients> = OnceCell::const_new();

impl AwsClients {
    /// Process-wide clients, created on first use.
    pub async fn shared() -> &'static AwsClients {
        SHARED
            .get_or_init(|| async {
                let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
                tracing::debug!(region = ?config.region(), "AWS clients initialised");
                AwsClients {
                    s3: aws_sdk_s3::Client::new(&config),
                    dynamodb: aws_sdk_dynamodb::Client::new(&config),
                    sfn: aws_sdk_sfn::Client::new(&config),
                }
            })
            .await
    }
}

// ---------------------------------------------------------------------------
// S3
// ---------------------------------------------------------------------------

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    async fn open(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<aws_sdk_s3::operation::get_object::GetObjectOutput, CloudError> {
        self.client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                get_object_error(e.as_service_error(), bucket, key, || {
                    aws_sdk_s3::error::DisplayErrorContext(&e).to_string()
                })
            })
    }
}

/// `NoSuchKey` becomes [`CloudError::NotFound`]; anything else is a storage
/// failure described by `detail`.
fn get_object_error(
    service: Option<&GetObjectError>,
    bucket: &str,
    key: &str,
    detail: impl FnOnce() -> String,
) -> CloudError {
    if service.is_some_and(GetObjectError::is_no_such_key) {
        CloudError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    } else {
        CloudError::Storage(detail())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, CloudError> {
        let output = self.open(bucket, key).await?;
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| CloudError::Storage(format!("reading s3://{bucket}/{key}: {e}")))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), CloudError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| CloudError::Storage(aws_sdk_s3::error::DisplayErrorContext(e).to_string()))?;
        tracing::debug!(bucket, key, "Object written");
        Ok(())
    }

    async fn download_file(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
    ) -> Result<u64, CloudError> {
        let output = self.open(bucket, key).await?;
        let mut reader = output.body.into_async_read();
        let mut file = tokio::fs::File::create(dest).await?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        Ok(written)
    }

    async fn upload_file(&self, bucket: &str, key: &str, src: &Path) -> Result<(), CloudError> {
        let body = ByteStream::from_path(src)
            .await
            .map_err(|e| CloudError::Storage(format!("reading {}: {e}", src.display())))?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| CloudError::Storage(aws_sdk_s3::error::DisplayErrorContext(e).to_string()))?;
        tracing::debug!(bucket, key, "File uploaded");
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<PresignedUrl, CloudError> {
        let lifetime = chrono::TimeDelta::from_std(expires_in)
            .map_err(|e| CloudError::Presign(e.to_string()))?;
        let config =
            PresigningConfig::expires_in(expires_in).map_err(|e| CloudError::Presign(e.to_string()))?;
        let issued_at = Utc::now();
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| CloudError::Presign(aws_sdk_s3::error::DisplayErrorContext(e).to_string()))?;
        Ok(PresignedUrl {
            url: request.uri().to_string(),
            expires_at: issued_at + lifetime,
        })
    }
}

// ---------------------------------------------------------------------------
// DynamoDB
// ---------------------------------------------------------------------------

pub struct DynamoTrackingTable {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoTrackingTable {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl TrackingTable for DynamoTrackingTable {
    async fn query_by_id(&self, id: &str) -> Result<Vec<serde_json::Value>, CloudError> {
        let (items, pages) = collect_pages(|start_key| {
            let request = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("Id = :id")
                .expression_attribute_values(":id", AttributeValue::S(id.to_string()))
                .set_exclusive_start_key(start_key);
            async move {
                let output = request.send().await.map_err(|e| {
                    CloudError::Table(aws_sdk_dynamodb::error::DisplayErrorContext(e).to_string())
                })?;
                Ok(QueryPage {
                    items: output.items().to_vec(),
                    last_evaluated_key: output.last_evaluated_key().cloned(),
                })
            }
        })
        .await?;

        tracing::debug!(table = %self.table_name, id, pages, count = items.len(), "Queried tracking table");
        Ok(items)
    }
}

type DynamoItem = HashMap<String, AttributeValue>;

/// One page of a table query.
struct QueryPage {
    items: Vec<DynamoItem>,
    last_evaluated_key: Option<DynamoItem>,
}

/// Fetch pages until one comes back without a (non-empty) continuation
/// key. `fetch` receives the previous page's key. Returns the converted
/// items in page order and the number of pages read.
async fn collect_pages<F, Fut>(mut fetch: F) -> Result<(Vec<serde_json::Value>, u32), CloudError>
where
    F: FnMut(Option<DynamoItem>) -> Fut,
    Fut: Future<Output = Result<QueryPage, CloudError>>,
{
    let mut items = Vec::new();
    let mut start_key = None;
    let mut pages = 0u32;

    loop {
        let page = fetch(start_key.take()).await?;
        pages += 1;
        items.extend(page.items.iter().map(item_to_json));

        match page.last_evaluated_key {
            Some(key) if !key.is_empty() => start_key = Some(key),
            _ => break,
        }
    }

    Ok((items, pages))
}

// ---------------------------------------------------------------------------
// Step Functions
// ---------------------------------------------------------------------------

pub struct StepFunctionsEngine {
    client: aws_sdk_sfn::Client,
    state_machine_arn: String,
}

impl StepFunctionsEngine {
    pub fn new(client: aws_sdk_sfn::Client, state_machine_arn: impl Into<String>) -> Self {
        Self {
            client,
            state_machine_arn: state_machine_arn.into(),
        }
    }
}

#[async_trait]
impl WorkflowEngine for StepFunctionsEngine {
    async fn start_execution(&self, input: &str) -> Result<String, CloudError> {
        let output = self
            .client
            .start_execution()
            .state_machine_arn(&self.state_machine_arn)
            .input(input)
            .send()
            .await
            .map_err(|e| CloudError::Workflow(aws_sdk_sfn::error::DisplayErrorContext(e).to_string()))?;
        Ok(output.execution_arn().to_string())
    }
}
