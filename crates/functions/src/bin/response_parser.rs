//! `response-parser` -- stores the generated image for one inference result.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use outpaint_cloud::aws::{AwsClients, S3ObjectStore};
use outpaint_functions::{dispatch, telemetry};

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    telemetry::init("response_parser=info,outpaint_functions=info,outpaint_pipeline=info");

    let store = S3ObjectStore::new(AwsClients::shared().await.s3.clone());
    tracing::info!("Response parser ready");

    let store = &store;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        Ok::<Value, Error>(dispatch::on_parse_response(event.payload, store).await)
    }))
    .await
}
