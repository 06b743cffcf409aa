//! Builds the inference request document for one image.

use outpaint_cloud::ObjectStore;
use outpaint_core::inference::{draw_seed, encode_image, RequestDocument};
use outpaint_core::job::BuildRequestTask;
use outpaint_core::keys;
use outpaint_core::stage::ImageStage;

use crate::scratch::Scratch;
use crate::{PipelineError, JSON_CONTENT_TYPE};

/// Stage an image is in when this handler picks it up.
pub const ENTRY_STAGE: ImageStage = ImageStage::Pending;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltRequest {
    /// Key the request document was written to.
    pub key: String,
    pub seed: u32,
}

/// Download the source image, encode it and write the request document to
/// `{InputS3Prefix}/{basename}.json`.
///
/// Nothing is written when any step before the upload fails.
pub async fn build_request(
    task: &BuildRequestTask,
    store: &dyn ObjectStore,
) -> Result<BuiltRequest, PipelineError> {
    let image_name = &task.image.image_name;
    let scratch = Scratch::new()?;
    let local_path = scratch.file(image_name)?;

    let source_key = keys::image_key(&task.input_s3_prefix, image_name);
    let size = store
        .download_file(&task.s3_bucket, &source_key, &local_path)
        .await?;
    let bytes = tokio::fs::read(&local_path).await?;

    let seed = draw_seed();
    let document = RequestDocument::outpainting(task, encode_image(&bytes), seed);
    let body = serde_json::to_vec(&document)?;

    let key = keys::document_key(&task.input_s3_prefix, image_name);
    store
        .put_object(&task.s3_bucket, &key, body, JSON_CONTENT_TYPE)
        .await?;

    tracing::info!(
        bucket = %task.s3_bucket,
        image = %image_name,
        key = %key,
        source_bytes = size,
        seed,
        from = %ENTRY_STAGE,
        stage = %ENTRY_STAGE.advanced(),
        "Inference request written",
    );

    Ok(BuiltRequest { key, seed })
}
