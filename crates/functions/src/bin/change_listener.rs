//! `change-listener` -- starts one workflow execution per new job record.
//!
//! Triggered by the tracking table's change stream. See
//! [`outpaint_functions::config`] for the environment it expects.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use outpaint_cloud::aws::{AwsClients, StepFunctionsEngine};
use outpaint_functions::config::ListenerConfig;
use outpaint_functions::{dispatch, telemetry};

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    telemetry::init("change_listener=info,outpaint_functions=info,outpaint_pipeline=info");

    let config = ListenerConfig::from_env()?;
    let clients = AwsClients::shared().await;
    let engine = StepFunctionsEngine::new(clients.sfn.clone(), config.state_machine_arn.clone());

    tracing::info!(
        bucket = %config.layout.bucket,
        state_machine = %config.state_machine_arn,
        "Change listener ready",
    );

    let config = &config;
    let engine = &engine;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        Ok::<Value, Error>(dispatch::on_change_event(event.payload, config, engine).await)
    }))
    .await
}
