//! Job records, job descriptors and the per-image task payloads.
//!
//! A [`JobRecord`] is what the front-end writes to the tracking table. The
//! change listener turns it into a [`JobDescriptor`], which is the input of a
//! workflow execution. The workflow fans the descriptor out into one
//! [`BuildRequestTask`] and one [`ParseResponseTask`] per image.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::attribute::{expect_map, require_list, require_string, AttributeValue, Item};
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Outpainting mode
// ---------------------------------------------------------------------------

/// How the inference service treats the masked region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutpaintingMode {
    /// Allow modification inside the mask to keep it consistent with the
    /// reconstructed background.
    Default,
    /// Prevent modification inside the mask.
    Precise,
}

impl OutpaintingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::Precise => "PRECISE",
        }
    }
}

impl fmt::Display for OutpaintingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutpaintingMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEFAULT" => Ok(Self::Default),
            "PRECISE" => Ok(Self::Precise),
            other => Err(CoreError::Validation(format!(
                "Unknown outpainting mode '{other}'. Must be one of: DEFAULT, PRECISE"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Image entry
// ---------------------------------------------------------------------------

/// One image of a job together with its mask-guidance labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageEntry {
    pub image_name: String,
    /// Comma-joined labels, used verbatim as the mask prompt.
    pub labels: String,
}

impl ImageEntry {
    pub fn new(image_name: impl Into<String>, labels: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
            labels: labels.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Job record
// ---------------------------------------------------------------------------

/// A job submission as stored in the tracking table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobRecord {
    pub id: String,
    /// Date-time prefix of the uploaded image set, e.g. `/2024/01/01/00:00:00`.
    pub image_s3_prefix: String,
    pub prompt: String,
    pub negative_prompt: String,
    pub mode: OutpaintingMode,
    pub images: Vec<ImageEntry>,
}

impl JobRecord {
    /// Decode a record from its typed attribute map.
    ///
    /// All scalar fields are required, `Mode` must be a known mode and
    /// `Images` must be a non-empty list of `{ImageName, Labels}` maps.
    pub fn from_item(item: &Item) -> Result<Self, CoreError> {
        let id = require_string(item, "Id", "Id")?;
        let image_s3_prefix = require_string(item, "ImageS3Prefix", "ImageS3Prefix")?;
        let prompt = require_string(item, "Prompt", "Prompt")?;
        let negative_prompt = require_string(item, "NegativePrompt", "NegativePrompt")?;
        let mode: OutpaintingMode = require_string(item, "Mode", "Mode")?.parse()?;

        let raw_images = require_list(item, "Images", "Images")?;
        if raw_images.is_empty() {
            return Err(CoreError::Validation("'Images' must not be empty".into()));
        }

        let images = raw_images
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let path = format!("Images[{i}]");
                let entry = expect_map(value, &path)?;
                Ok(ImageEntry {
                    image_name: require_string(entry, "ImageName", &format!("{path}.ImageName"))?
                        .to_string(),
                    labels: require_string(entry, "Labels", &format!("{path}.Labels"))?
                        .to_string(),
                })
            })
            .collect::<Result<Vec<_>, CoreError>>()?;

        Ok(Self {
            id: id.to_string(),
            image_s3_prefix: image_s3_prefix.to_string(),
            prompt: prompt.to_string(),
            negative_prompt: negative_prompt.to_string(),
            mode,
            images,
        })
    }

    /// Encode the record as a typed attribute map (the inverse of
    /// [`from_item`](Self::from_item)).
    pub fn to_item(&self) -> Item {
        let s = |v: &str| AttributeValue::S(v.to_string());
        let images = self
            .images
            .iter()
            .map(|image| {
                AttributeValue::M(Item::from([
                    ("ImageName".to_string(), s(&image.image_name)),
                    ("Labels".to_string(), s(&image.labels)),
                ]))
            })
            .collect();

        Item::from([
            ("Id".to_string(), s(&self.id)),
            ("ImageS3Prefix".to_string(), s(&self.image_s3_prefix)),
            ("Prompt".to_string(), s(&self.prompt)),
            ("NegativePrompt".to_string(), s(&self.negative_prompt)),
            ("Mode".to_string(), s(self.mode.as_str())),
            ("Images".to_string(), AttributeValue::L(images)),
        ])
    }
}

// ---------------------------------------------------------------------------
// Job descriptor
// ---------------------------------------------------------------------------

/// Bucket and prefix roots the change listener combines with a record's
/// `ImageS3Prefix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub bucket: String,
    pub image_prefix: String,
    pub generated_image_prefix: String,
    pub status_report_prefix: String,
}

/// Input of one workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobDescriptor {
    pub id: String,
    pub s3_bucket: String,
    pub input_s3_prefix: String,
    pub output_s3_prefix: String,
    pub status_s3_prefix: String,
    pub prompt: String,
    pub negative_prompt: String,
    pub mode: OutpaintingMode,
    pub images: Vec<ImageEntry>,
}

impl JobDescriptor {
    /// Build a descriptor from a record.
    ///
    /// Prefixes are plain concatenations: the record's `ImageS3Prefix`
    /// already starts with `/`.
    pub fn from_record(record: JobRecord, layout: &StorageLayout) -> Self {
        Self {
            s3_bucket: layout.bucket.clone(),
            input_s3_prefix: format!("{}{}", layout.image_prefix, record.image_s3_prefix),
            output_s3_prefix: format!(
                "{}{}",
                layout.generated_image_prefix, record.image_s3_prefix
            ),
            status_s3_prefix: format!(
                "{}{}",
                layout.status_report_prefix, record.image_s3_prefix
            ),
            id: record.id,
            prompt: record.prompt,
            negative_prompt: record.negative_prompt,
            mode: record.mode,
            images: record.images,
        }
    }

    /// The request-builder payload for one of this job's images.
    pub fn build_task(&self, image: &ImageEntry) -> BuildRequestTask {
        BuildRequestTask {
            s3_bucket: self.s3_bucket.clone(),
            input_s3_prefix: self.input_s3_prefix.clone(),
            prompt: self.prompt.clone(),
            negative_prompt: self.negative_prompt.clone(),
            mode: self.mode,
            image: image.clone(),
        }
    }

    /// The response-parser payload for one of this job's images.
    pub fn parse_task(&self, image: &ImageEntry) -> ParseResponseTask {
        ParseResponseTask {
            s3_bucket: self.s3_bucket.clone(),
            output_s3_prefix: self.output_s3_prefix.clone(),
            image: image.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-image task payloads
// ---------------------------------------------------------------------------

/// Input of the request builder for one image.
///
/// Unknown descriptor fields (`Id`, `OutputS3Prefix`, ...) are ignored so the
/// workflow can pass the whole iteration context through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BuildRequestTask {
    pub s3_bucket: String,
    pub input_s3_prefix: String,
    pub prompt: String,
    pub negative_prompt: String,
    pub mode: OutpaintingMode,
    pub image: ImageEntry,
}

/// Input of the response parser for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParseResponseTask {
    pub s3_bucket: String,
    pub output_s3_prefix: String,
    pub image: ImageEntry,
}
