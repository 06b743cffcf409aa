//! Shaping rules applied to a user submission before it becomes a
//! [`JobRecord`].
//!
//! The submission front-end uploads every image under a shared date-time
//! prefix, offers the labels detected in each image (only those with at
//! least one located instance) and writes one record per submission.

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::CoreError;
use crate::job::{ImageEntry, JobRecord, OutpaintingMode};
use crate::keys;

/// Upload extensions the front-end accepts.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg"];

/// Separator used when joining selected labels into a mask prompt.
pub const LABEL_SEPARATOR: &str = ", ";

// ---------------------------------------------------------------------------
// Label detection
// ---------------------------------------------------------------------------

/// Response of the label-detection capability.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabelDetection {
    #[serde(default)]
    pub labels: Vec<DetectedLabel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectedLabel {
    pub name: String,
    /// Bounding boxes of located objects. Scene-level labels have none.
    #[serde(default)]
    pub instances: Vec<serde_json::Value>,
}

impl LabelDetection {
    /// Names of labels that were located as at least one object instance,
    /// in detection order. Only these can guide a mask.
    pub fn maskable_labels(&self) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|label| !label.instances.is_empty())
            .map(|label| label.name.as_str())
            .collect()
    }
}

/// Join the selected labels into the comma-separated mask prompt.
pub fn join_labels<S: AsRef<str>>(labels: &[S]) -> String {
    labels
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(LABEL_SEPARATOR)
}

// ---------------------------------------------------------------------------
// Upload layout
// ---------------------------------------------------------------------------

/// Date-time prefix shared by all images of one submission,
/// e.g. `2024/01/01/00:00:00`.
pub fn datetime_prefix(at: NaiveDateTime) -> String {
    at.format("%Y/%m/%d/%H:%M:%S").to_string()
}

/// Key the front-end uploads a source image to.
pub fn upload_key(image_prefix: &str, datetime_prefix: &str, image_name: &str) -> String {
    keys::image_key(&format!("{image_prefix}/{datetime_prefix}"), image_name)
}

/// Reject names whose extension the front-end would not offer.
pub fn validate_upload_name(image_name: &str) -> Result<(), CoreError> {
    let extension = image_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension {
        Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(CoreError::Validation(format!(
            "Unsupported image '{image_name}'. Accepted extensions: {ACCEPTED_EXTENSIONS:?}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Record creation
// ---------------------------------------------------------------------------

/// Build the tracking-table record for a submission.
///
/// Image names must be unique within the job and carry an accepted
/// extension.
pub fn new_job_record(
    datetime_prefix: &str,
    prompt: &str,
    negative_prompt: &str,
    mode: OutpaintingMode,
    images: Vec<ImageEntry>,
) -> Result<JobRecord, CoreError> {
    if images.is_empty() {
        return Err(CoreError::Validation(
            "A submission needs at least one image".into(),
        ));
    }
    for (i, image) in images.iter().enumerate() {
        validate_upload_name(&image.image_name)?;
        if images[..i].iter().any(|e| e.image_name == image.image_name) {
            return Err(CoreError::Validation(format!(
                "Duplicate image name '{}'",
                image.image_name
            )));
        }
    }

    Ok(JobRecord {
        id: uuid::Uuid::new_v4().to_string(),
        image_s3_prefix: format!("/{datetime_prefix}"),
        prompt: prompt.to_string(),
        negative_prompt: negative_prompt.to_string(),
        mode,
        images,
    })
}
