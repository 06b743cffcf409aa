//! Turns a newly inserted job record into a workflow execution.

use outpaint_cloud::WorkflowEngine;
use outpaint_core::attribute::StreamEvent;
use outpaint_core::error::CoreError;
use outpaint_core::job::{JobDescriptor, JobRecord, StorageLayout};
use outpaint_core::stage::ImageStage;

use crate::PipelineError;

/// Result of a successful start.
#[derive(Debug, Clone)]
pub struct StartedWorkflow {
    pub execution_id: String,
    pub descriptor: JobDescriptor,
}

/// Decode the job record carried by a change event.
///
/// Only the first record of the batch is used; any others are logged and
/// ignored.
pub fn decode_change_event(event: &serde_json::Value) -> Result<JobRecord, PipelineError> {
    let stream = StreamEvent::from_value(event)?;
    let batch_size = stream.records.len();

    let record = stream
        .records
        .into_iter()
        .next()
        .ok_or_else(|| CoreError::MissingField("Records[0]".into()))?;
    if batch_size > 1 {
        tracing::warn!(
            ignored = batch_size - 1,
            "Change event carries several records; only the first is processed",
        );
    }

    let new_image = record
        .dynamodb
        .new_image
        .ok_or_else(|| CoreError::MissingField("Records[0].dynamodb.NewImage".into()))?;

    Ok(JobRecord::from_item(&new_image)?)
}

/// Decode `event`, build the job descriptor and start exactly one
/// execution with it.
pub async fn start_workflow(
    event: &serde_json::Value,
    layout: &StorageLayout,
    engine: &dyn WorkflowEngine,
) -> Result<StartedWorkflow, PipelineError> {
    let record = decode_change_event(event)?;
    let descriptor = JobDescriptor::from_record(record, layout);
    let input = serde_json::to_string(&descriptor)?;

    let execution_id = engine.start_execution(&input).await?;

    tracing::info!(
        job_id = %descriptor.id,
        execution_id = %execution_id,
        images = descriptor.images.len(),
        input_prefix = %descriptor.input_s3_prefix,
        stage = %ImageStage::Pending,
        "Image processing workflow started",
    );

    Ok(StartedWorkflow {
        execution_id,
        descriptor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use outpaint_cloud::memory::RecordingWorkflowEngine;
    use outpaint_cloud::CloudError;
    use outpaint_core::job::{ImageEntry, OutpaintingMode};
    use serde_json::json;

    fn layout() -> StorageLayout {
        StorageLayout {
            bucket: "jobs".into(),
            image_prefix: "images".into(),
            generated_image_prefix: "generated".into(),
            status_report_prefix: "reports".into(),
        }
    }

    fn record(images: usize) -> JobRecord {
        JobRecord {
            id: "abc".into(),
            image_s3_prefix: "/2024/01/01/00:00:00".into(),
            prompt: "sunset".into(),
            negative_prompt: "people".into(),
            mode: OutpaintingMode::Default,
            images: (0..images)
                .map(|i| ImageEntry::new(format!("img{i}.png"), "tree, sky"))
                .collect(),
        }
    }

    fn insert_event(record: &JobRecord) -> serde_json::Value {
        json!({
            "Records": [{
                "eventName": "INSERT",
                "dynamodb": { "NewImage": serde_json::to_value(record.to_item()).unwrap() }
            }]
        })
    }

    #[tokio::test]
    async fn starts_one_execution_with_every_image() {
        for count in [1, 3, 7] {
            let engine = RecordingWorkflowEngine::new();
            let started = start_workflow(&insert_event(&record(count)), &layout(), &engine)
                .await
                .unwrap();

            let inputs = engine.started().await;
            assert_eq!(inputs.len(), 1);
            let sent: JobDescriptor = serde_json::from_str(&inputs[0]).unwrap();
            assert_eq!(sent.images.len(), count);
            assert_eq!(sent, started.descriptor);
        }
    }

    #[tokio::test]
    async fn descriptor_carries_computed_prefixes() {
        let engine = RecordingWorkflowEngine::new();
        let started = start_workflow(&insert_event(&record(1)), &layout(), &engine)
            .await
            .unwrap();

        let input: serde_json::Value =
            serde_json::from_str(&engine.started().await[0]).unwrap();
        assert_eq!(input["Id"], "abc");
        assert_eq!(input["S3Bucket"], "jobs");
        assert_eq!(input["InputS3Prefix"], "images/2024/01/01/00:00:00");
        assert_eq!(input["OutputS3Prefix"], "generated/2024/01/01/00:00:00");
        assert_eq!(input["StatusS3Prefix"], "reports/2024/01/01/00:00:00");
        assert_eq!(started.execution_id, "memory:execution:1");
    }

    #[tokio::test]
    async fn missing_field_starts_nothing() {
        let mut event = insert_event(&record(1));
        event["Records"][0]["dynamodb"]["NewImage"]
            .as_object_mut()
            .unwrap()
            .remove("Prompt");

        let engine = RecordingWorkflowEngine::new();
        let err = start_workflow(&event, &layout(), &engine).await.unwrap_err();
        assert_matches!(err, PipelineError::Core(CoreError::MissingField(f)) if f == "Prompt");
        assert!(engine.started().await.is_empty());
    }

    #[tokio::test]
    async fn empty_image_list_starts_nothing() {
        let engine = RecordingWorkflowEngine::new();
        let err = start_workflow(&insert_event(&record(0)), &layout(), &engine)
            .await
            .unwrap_err();
        assert_matches!(err, PipelineError::Core(CoreError::Validation(_)));
        assert!(engine.started().await.is_empty());
    }

    #[test]
    fn empty_batch_and_missing_new_image() {
        assert_matches!(
            decode_change_event(&json!({ "Records": [] })),
            Err(PipelineError::Core(CoreError::MissingField(f))) if f == "Records[0]"
        );
        assert_matches!(
            decode_change_event(&json!({ "Records": [{ "dynamodb": {} }] })),
            Err(PipelineError::Core(CoreError::MissingField(f))) if f.ends_with("NewImage")
        );
    }

    #[test]
    fn only_first_record_of_batch_is_used() {
        let first = insert_event(&record(1));
        let mut second = record(2);
        second.id = "other".into();
        let mut event = first.clone();
        event["Records"]
            .as_array_mut()
            .unwrap()
            .push(insert_event(&second)["Records"][0].clone());

        let decoded = decode_change_event(&event).unwrap();
        assert_eq!(decoded.id, "abc");
    }

    #[tokio::test]
    async fn engine_failure_surfaces_as_service_error() {
        let engine = RecordingWorkflowEngine::unavailable("throttled");
        let err = start_workflow(&insert_event(&record(1)), &layout(), &engine)
            .await
            .unwrap_err();
        assert_matches!(err, PipelineError::Cloud(CloudError::Workflow(_)));
        assert_eq!(err.kind(), crate::ErrorKind::Service);
    }
}
