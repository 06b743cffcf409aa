//! Extracts the generated image from an inference response document.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use outpaint_cloud::ObjectStore;
use outpaint_core::inference::{decode_image, ResponseDocument};
use outpaint_core::job::ParseResponseTask;
use outpaint_core::keys;
use outpaint_core::stage::ImageStage;

use crate::scratch::Scratch;
use crate::PipelineError;

/// Stage an image is in when this handler picks it up.
pub const ENTRY_STAGE: ImageStage = ImageStage::Inferred;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Key the generated image was uploaded to.
    pub key: String,
    /// Generated images beyond the first that were not stored.
    pub discarded: usize,
    /// Whether the image had to be re-encoded to match the file extension.
    pub transcoded: bool,
}

/// Read `{OutputS3Prefix}/{basename}.json`, decode its first image and
/// upload it to `{OutputS3Prefix}/{ImageName}`.
///
/// Only `images[0]` is stored. The request always asks for a single image,
/// so extra entries are unexpected; they are counted and logged, not kept.
pub async fn parse_response(
    task: &ParseResponseTask,
    store: &dyn ObjectStore,
) -> Result<ParsedResponse, PipelineError> {
    let image_name = &task.image.image_name;
    let document_key = keys::document_key(&task.output_s3_prefix, image_name);

    let raw = store.get_object(&task.s3_bucket, &document_key).await?;
    let document: ResponseDocument = serde_json::from_slice(&raw)?;

    let payload = document
        .first_image()
        .ok_or_else(|| PipelineError::NoGeneratedImage {
            key: document_key.clone(),
            service_error: document.error.clone(),
        })?;
    let discarded = document.discarded_count();
    if discarded > 0 {
        tracing::warn!(
            key = %document_key,
            discarded,
            "Response holds more than one generated image; keeping the first",
        );
    }

    let bytes = decode_image(payload)?;

    let scratch = Scratch::new()?;
    let local_path = scratch.file(image_name)?;
    let transcoded = write_in_target_format(bytes, local_path.clone()).await?;

    let key = keys::image_key(&task.output_s3_prefix, image_name);
    store
        .upload_file(&task.s3_bucket, &key, &local_path)
        .await?;

    tracing::info!(
        bucket = %task.s3_bucket,
        image = %image_name,
        key = %key,
        transcoded,
        from = %ENTRY_STAGE,
        stage = %ENTRY_STAGE.advanced(),
        "Generated image stored",
    );

    Ok(ParsedResponse {
        key,
        discarded,
        transcoded,
    })
}

/// Write `bytes` to `dest` in the format named by its extension.
///
/// When the decoded payload already is in that format the bytes are written
/// untouched; otherwise the image is decoded and re-encoded. Returns whether
/// re-encoding happened.
async fn write_in_target_format(bytes: Vec<u8>, dest: PathBuf) -> Result<bool, PipelineError> {
    tokio::task::spawn_blocking(move || write_blocking(&bytes, &dest))
        .await
        .map_err(|e| PipelineError::Io(std::io::Error::other(e)))?
}

fn write_blocking(bytes: &[u8], dest: &Path) -> Result<bool, PipelineError> {
    let target = ImageFormat::from_path(dest)?;
    let source = image::guess_format(bytes)?;

    if source == target {
        std::fs::write(dest, bytes)?;
        return Ok(false);
    }

    let decoded = image::load_from_memory_with_format(bytes, source)?;
    // JPEG has no alpha channel.
    let decoded = match target {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(decoded.to_rgb8()),
        _ => decoded,
    };
    decoded.save_with_format(dest, target)?;
    Ok(true)
}
