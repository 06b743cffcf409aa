//! On-demand status report for one job.

use std::time::Duration;

use outpaint_cloud::{ObjectStore, PresignedUrl, TrackingTable};
use outpaint_core::keys;
use serde::{Deserialize, Serialize};

use crate::{PipelineError, JSON_CONTENT_TYPE};

/// HTTP-style code returned with a successful report.
pub const STATUS_OK: u16 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusReportRequest {
    pub id: String,
    pub s3_bucket: String,
    pub status_s3_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterSettings {
    /// Lifetime of the retrieval link.
    pub url_expiration: Duration,
}

/// A stored report and the link to it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusReport {
    pub status_code: u16,
    pub url: String,
    #[serde(skip)]
    pub key: String,
    #[serde(skip)]
    pub entries: usize,
    #[serde(skip)]
    pub link: PresignedUrl,
}

/// Collect every tracking-table entry for the job, store them as
/// `{StatusS3Prefix}/status_report_{Id}.json` and return a time-limited
/// link to that object.
///
/// A job with no entries still produces a report (`[]`).
pub async fn generate_report(
    request: &StatusReportRequest,
    settings: &ReporterSettings,
    table: &dyn TrackingTable,
    store: &dyn ObjectStore,
) -> Result<StatusReport, PipelineError> {
    let entries = table.query_by_id(&request.id).await?;
    let body = serde_json::to_vec_pretty(&entries)?;

    let key = keys::status_report_key(&request.status_s3_prefix, &request.id);
    store
        .put_object(&request.s3_bucket, &key, body, JSON_CONTENT_TYPE)
        .await?;

    let link = store
        .presign_get(&request.s3_bucket, &key, settings.url_expiration)
        .await?;

    tracing::info!(
        job_id = %request.id,
        key = %key,
        entries = entries.len(),
        expires_at = %link.expires_at,
        "Status report generated",
    );

    Ok(StatusReport {
        status_code: STATUS_OK,
        url: link.url.clone(),
        key,
        entries: entries.len(),
        link,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeDelta, Utc};
    use outpaint_cloud::memory::{MemoryObjectStore, MemoryTrackingTable};
    use outpaint_cloud::CloudError;
    use serde_json::json;

    fn request(id: &str) -> StatusReportRequest {
        StatusReportRequest {
            id: id.into(),
            s3_bucket: "jobs".into(),
            status_s3_prefix: "reports/2024/01/01/00:00:00".into(),
        }
    }

    fn settings() -> ReporterSettings {
        ReporterSettings {
            url_expiration: Duration::from_secs(900),
        }
    }

    #[tokio::test]
    async fn report_contains_only_matching_entries() {
        let table = MemoryTrackingTable::new();
        table
            .push(json!({ "Id": "abc", "ImageName": "a.png", "Status": "SUCCEEDED" }))
            .await;
        table.push(json!({ "Id": "zzz", "Status": "FAILED" })).await;
        let store = MemoryObjectStore::new();

        let report = generate_report(&request("abc"), &settings(), &table, &store)
            .await
            .unwrap();
        assert_eq!(report.status_code, 200);
        assert_eq!(report.entries, 1);
        assert_eq!(
            report.key,
            "reports/2024/01/01/00:00:00/status_report_abc.json"
        );

        let stored = store.get("jobs", &report.key).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&stored.body).unwrap();
        assert_eq!(body, json!([{ "Id": "abc", "ImageName": "a.png", "Status": "SUCCEEDED" }]));
        // Pretty-printed with two-space indentation.
        assert!(String::from_utf8(stored.body).unwrap().contains("\n  {"));
    }

    #[tokio::test]
    async fn empty_job_still_gets_report_and_live_link() {
        let table = MemoryTrackingTable::new();
        let store = MemoryObjectStore::new();
        let before = Utc::now();

        let report = generate_report(&request("nobody"), &settings(), &table, &store)
            .await
            .unwrap();

        let stored = store.get("jobs", &report.key).await.unwrap();
        assert_eq!(stored.body, b"[]");
        assert!(!report.url.is_empty());
        assert!(report.link.expires_at > Utc::now());
        assert!(report.link.expires_at <= before + TimeDelta::seconds(900) + TimeDelta::seconds(1));
    }

    #[tokio::test]
    async fn response_shape() {
        let report = generate_report(
            &request("abc"),
            &settings(),
            &MemoryTrackingTable::new(),
            &MemoryObjectStore::new(),
        )
        .await
        .unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["StatusCode"], 200);
        assert_eq!(value["Url"], report.url.as_str());
        assert_eq!(value.as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn query_failure_writes_nothing() {
        let table = MemoryTrackingTable::unavailable("table missing");
        let store = MemoryObjectStore::new();
        let err = generate_report(&request("abc"), &settings(), &table, &store)
            .await
            .unwrap_err();
        assert_matches!(err, PipelineError::Cloud(CloudError::Table(_)));
        assert!(store.keys("jobs").await.is_empty());
    }
}
