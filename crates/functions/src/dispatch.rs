//! Invocation-level failure policy.
//!
//! Handlers report failures as [`PipelineError`]s. At this boundary every
//! failure is logged with its class and dropped: the invocation completes,
//! nothing is rolled back and nothing is retried here. Retries, if any, are
//! configured on the workflow engine or the event source.
//!
//! The status reporter is the one handler with a caller waiting for an
//! answer; it gets an explicit failure body instead of silence.

use outpaint_cloud::{ObjectStore, TrackingTable, WorkflowEngine};
use outpaint_core::error::CoreError;
use outpaint_pipeline::status_reporter::ReporterSettings;
use outpaint_pipeline::{
    change_listener, request_builder, response_parser, status_reporter, PipelineError,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::config::ListenerConfig;

/// Code returned by the status reporter when the report could not be built.
pub const STATUS_FAILED: u16 = 500;

fn decode_event<T: DeserializeOwned>(event: Value) -> Result<T, PipelineError> {
    serde_json::from_value(event)
        .map_err(|e| CoreError::Validation(format!("Malformed event: {e}")).into())
}

fn log_dropped(handler: &'static str, subject: &str, err: &PipelineError) {
    tracing::error!(
        handler,
        subject,
        kind = %err.kind(),
        error = %err,
        "Invocation failed; error dropped, not retried",
    );
}

/// Change listener: `true` once an execution was started, `null` otherwise.
pub async fn on_change_event(
    event: Value,
    config: &ListenerConfig,
    engine: &dyn WorkflowEngine,
) -> Value {
    tracing::info!("Starting image processing workflow");
    match change_listener::start_workflow(&event, &config.layout, engine).await {
        Ok(_) => Value::Bool(true),
        Err(err) => {
            log_dropped("change_listener", "change event", &err);
            Value::Null
        }
    }
}

/// Request builder: always completes with `null`.
pub async fn on_build_request(event: Value, store: &dyn ObjectStore) -> Value {
    let result = async {
        let task = decode_event(event)?;
        request_builder::build_request(&task, store).await.map(|_| ())
    }
    .await;

    if let Err(err) = result {
        tracing::warn!(
            from = %request_builder::ENTRY_STAGE,
            stage = %request_builder::ENTRY_STAGE.failed(),
            "Request not built",
        );
        log_dropped("request_builder", "image task", &err);
    }
    Value::Null
}

/// Response parser: always completes with `null`.
pub async fn on_parse_response(event: Value, store: &dyn ObjectStore) -> Value {
    let result = async {
        let task = decode_event(event)?;
        response_parser::parse_response(&task, store).await.map(|_| ())
    }
    .await;

    if let Err(err) = result {
        tracing::warn!(
            from = %response_parser::ENTRY_STAGE,
            stage = %response_parser::ENTRY_STAGE.failed(),
            "Response not parsed",
        );
        log_dropped("response_parser", "image task", &err);
    }
    Value::Null
}

/// Status reporter: `{StatusCode: 200, Url}` or
/// `{StatusCode: 500, Url: null, Error}`.
pub async fn on_status_report(
    event: Value,
    settings: &ReporterSettings,
    table: &dyn TrackingTable,
    store: &dyn ObjectStore,
) -> Value {
    let result = async {
        let request: status_reporter::StatusReportRequest = decode_event(event)?;
        status_reporter::generate_report(&request, settings, table, store).await
    }
    .await;

    match result.and_then(|report| Ok(serde_json::to_value(report)?)) {
        Ok(body) => body,
        Err(err) => {
            log_dropped("status_reporter", "status request", &err);
            json!({
                "StatusCode": STATUS_FAILED,
                "Url": null,
                "Error": err.to_string(),
            })
        }
    }
}
