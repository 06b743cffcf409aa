//! `status-reporter` -- stores a job's status entries and returns a link.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use outpaint_cloud::aws::{AwsClients, DynamoTrackingTable, S3ObjectStore};
use outpaint_functions::config::ReporterConfig;
use outpaint_functions::{dispatch, telemetry};

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    telemetry::init("status_reporter=info,outpaint_functions=info,outpaint_pipeline=info");

    let config = ReporterConfig::from_env()?;
    let clients = AwsClients::shared().await;
    let table = DynamoTrackingTable::new(clients.dynamodb.clone(), config.table_name.clone());
    let store = S3ObjectStore::new(clients.s3.clone());

    tracing::info!(
        table = %config.table_name,
        url_expiration_secs = config.settings.url_expiration.as_secs(),
        "Status reporter ready",
    );

    let settings = &config.settings;
    let table = &table;
    let store = &store;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        Ok::<Value, Error>(dispatch::on_status_report(event.payload, settings, table, store).await)
    }))
    .await
}
