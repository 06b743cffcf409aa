//! End-to-end flow of one job through every entry point, with in-memory
//! services standing in for storage, the tracking table and the workflow
//! engine. The inference step is simulated by echoing the source image.

use std::io::Cursor;
use std::time::Duration;

use serde_json::{json, Value};

use outpaint_cloud::memory::{MemoryObjectStore, MemoryTrackingTable, RecordingWorkflowEngine};
use outpaint_core::inference::{RequestDocument, ResponseDocument};
use outpaint_core::job::{ImageEntry, JobDescriptor, JobRecord, OutpaintingMode, StorageLayout};
use outpaint_functions::config::ListenerConfig;
use outpaint_functions::dispatch;
use outpaint_pipeline::status_reporter::ReporterSettings;

const BUCKET: &str = "outpaint-jobs";

fn listener_config() -> ListenerConfig {
    ListenerConfig {
        layout: StorageLayout {
            bucket: BUCKET.into(),
            image_prefix: "images".into(),
            generated_image_prefix: "generated".into(),
            status_report_prefix: "reports".into(),
        },
        state_machine_arn: "arn:aws:states:eu-west-1:123:stateMachine:outpaint".into(),
    }
}

fn job_record() -> JobRecord {
    JobRecord {
        id: "abc".into(),
        image_s3_prefix: "/2024/01/01/00:00:00".into(),
        prompt: "sunset".into(),
        negative_prompt: "people".into(),
        mode: OutpaintingMode::Default,
        images: vec![ImageEntry::new("a.png", "tree, sky")],
    }
}

fn insert_event(record: &JobRecord) -> Value {
    json!({
        "Records": [{
            "eventName": "INSERT",
            "dynamodb": { "NewImage": serde_json::to_value(record.to_item()).unwrap() }
        }]
    })
}

fn source_png() -> Vec<u8> {
    let img = image::RgbImage::from_fn(8, 8, |x, y| image::Rgb([x as u8 * 30, y as u8 * 30, 90]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Stand-in for the inference service: answer a request document with a
/// response whose only image is the request's source image.
async fn simulate_inference(store: &MemoryObjectStore, request_key: &str, response_key: &str) {
    let request = store.get(BUCKET, request_key).await.unwrap();
    let request: RequestDocument = serde_json::from_slice(&request.body).unwrap();
    let response = ResponseDocument {
        images: vec![request.out_painting_params.image],
        error: None,
    };
    store
        .insert(BUCKET, response_key, serde_json::to_vec(&response).unwrap())
        .await;
}

#[tokio::test]
async fn job_flows_from_table_insert_to_generated_image() {
    let config = listener_config();
    let engine = RecordingWorkflowEngine::new();
    let store = MemoryObjectStore::new();
    let png = source_png();
    store
        .insert(BUCKET, "images/2024/01/01/00:00:00/a.png", png.clone())
        .await;

    // Table insert -> workflow execution.
    let started = dispatch::on_change_event(insert_event(&job_record()), &config, &engine).await;
    assert_eq!(started, Value::Bool(true));
    let inputs = engine.started().await;
    assert_eq!(inputs.len(), 1);
    let descriptor: JobDescriptor = serde_json::from_str(&inputs[0]).unwrap();
    assert_eq!(descriptor.images.len(), 1);

    // Fan-out per image.
    for image in &descriptor.images {
        let build_event = serde_json::to_value(descriptor.build_task(image)).unwrap();
        assert_eq!(dispatch::on_build_request(build_event, &store).await, Value::Null);
    }

    let request_key = "images/2024/01/01/00:00:00/a.json";
    let request = store.get(BUCKET, request_key).await.unwrap();
    let request: Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(request["taskType"], "OUTPAINTING");
    assert_eq!(request["outPaintingParams"]["maskPrompt"], "tree, sky");
    assert_eq!(request["outPaintingParams"]["text"], "sunset");
    assert_eq!(request["outPaintingParams"]["negativeText"], "people");

    simulate_inference(&store, request_key, "generated/2024/01/01/00:00:00/a.json").await;

    for image in &descriptor.images {
        let parse_event = serde_json::to_value(descriptor.parse_task(image)).unwrap();
        assert_eq!(dispatch::on_parse_response(parse_event, &store).await, Value::Null);
    }

    let generated = store
        .get(BUCKET, "generated/2024/01/01/00:00:00/a.png")
        .await
        .expect("generated image stored under the original name");
    assert_eq!(generated.body, png);

    // On-demand status report.
    let table = MemoryTrackingTable::new();
    table
        .push(json!({ "Id": "abc", "ImageName": "a.png", "Status": "SUCCEEDED" }))
        .await;
    let settings = ReporterSettings {
        url_expiration: Duration::from_secs(600),
    };
    let status_event = json!({
        "Id": descriptor.id,
        "S3Bucket": descriptor.s3_bucket,
        "StatusS3Prefix": descriptor.status_s3_prefix,
    });
    let response = dispatch::on_status_report(status_event, &settings, &table, &store).await;
    assert_eq!(response["StatusCode"], 200);
    assert!(response["Url"]
        .as_str()
        .unwrap()
        .contains("reports/2024/01/01/00:00:00/status_report_abc.json"));
}

#[tokio::test]
async fn missing_source_image_is_logged_and_dropped() {
    let store = MemoryObjectStore::new();
    let descriptor = JobDescriptor::from_record(job_record(), &listener_config().layout);
    let event = serde_json::to_value(descriptor.build_task(&descriptor.images[0])).unwrap();

    assert_eq!(dispatch::on_build_request(event, &store).await, Value::Null);
    assert!(store.keys(BUCKET).await.is_empty());
}

#[tokio::test]
async fn malformed_events_never_propagate() {
    let store = MemoryObjectStore::new();
    let engine = RecordingWorkflowEngine::new();

    let garbage = json!({ "unexpected": true });
    assert_eq!(
        dispatch::on_change_event(garbage.clone(), &listener_config(), &engine).await,
        Value::Null
    );
    assert_eq!(dispatch::on_build_request(garbage.clone(), &store).await, Value::Null);
    assert_eq!(dispatch::on_parse_response(garbage, &store).await, Value::Null);
    assert!(engine.started().await.is_empty());
    assert!(store.keys(BUCKET).await.is_empty());
}

#[tokio::test]
async fn workflow_engine_outage_returns_null() {
    let engine = RecordingWorkflowEngine::unavailable("throttled");
    let result =
        dispatch::on_change_event(insert_event(&job_record()), &listener_config(), &engine).await;
    assert_eq!(result, Value::Null);
}

#[tokio::test]
async fn status_report_failure_is_explicit() {
    let table = MemoryTrackingTable::unavailable("table missing");
    let store = MemoryObjectStore::new();
    let settings = ReporterSettings {
        url_expiration: Duration::from_secs(60),
    };
    let event = json!({ "Id": "abc", "S3Bucket": BUCKET, "StatusS3Prefix": "reports/x" });

    let response = dispatch::on_status_report(event, &settings, &table, &store).await;
    assert_eq!(response["StatusCode"], 500);
    assert!(response["Url"].is_null());
    assert!(response["Error"].as_str().unwrap().contains("table missing"));
}

#[tokio::test]
async fn status_report_for_unknown_job_is_empty() {
    let store = MemoryObjectStore::new();
    let settings = ReporterSettings {
        url_expiration: Duration::from_secs(60),
    };
    let event = json!({ "Id": "nobody", "S3Bucket": BUCKET, "StatusS3Prefix": "reports/x" });

    let response =
        dispatch::on_status_report(event, &settings, &MemoryTrackingTable::new(), &store).await;
    assert_eq!(response["StatusCode"], 200);
    let report = store
        .get(BUCKET, "reports/x/status_report_nobody.json")
        .await
        .unwrap();
    assert_eq!(report.body, b"[]");
}
