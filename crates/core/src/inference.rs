//! Request and response documents exchanged with the image-generation
//! service.
//!
//! The request builder writes a [`RequestDocument`] to object storage; the
//! workflow engine hands it to the inference service, which writes a
//! [`ResponseDocument`] back. Both use the service's camelCase wire format.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::job::{BuildRequestTask, OutpaintingMode};

// ---------------------------------------------------------------------------
// Generation constants
// ---------------------------------------------------------------------------

/// Images requested per invocation. The response parser relies on this
/// being 1.
pub const NUMBER_OF_IMAGES: u32 = 1;
/// Output height in pixels.
pub const IMAGE_HEIGHT: u32 = 1024;
/// Output width in pixels.
pub const IMAGE_WIDTH: u32 = 1024;
/// Prompt adherence.
pub const CFG_SCALE: f32 = 8.0;
/// Inclusive upper bound of the random seed.
pub const MAX_SEED: u32 = 100_000;

// ---------------------------------------------------------------------------
// Request document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Outpainting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Standard,
    Premium,
}

/// A ready-to-submit outpainting request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDocument {
    pub task_type: TaskType,
    pub out_painting_params: OutPaintingParams,
    pub image_generation_config: ImageGenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutPaintingParams {
    /// Base64-encoded source image.
    pub image: String,
    pub text: String,
    pub negative_text: String,
    pub mask_prompt: String,
    pub out_painting_mode: OutpaintingMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerationConfig {
    pub number_of_images: u32,
    pub quality: Quality,
    pub height: u32,
    pub width: u32,
    pub cfg_scale: f32,
    pub seed: u32,
}

impl ImageGenerationConfig {
    /// The fixed generation settings with the given seed.
    pub fn with_seed(seed: u32) -> Self {
        Self {
            number_of_images: NUMBER_OF_IMAGES,
            quality: Quality::Premium,
            height: IMAGE_HEIGHT,
            width: IMAGE_WIDTH,
            cfg_scale: CFG_SCALE,
            seed,
        }
    }
}

impl RequestDocument {
    /// Assemble the request for one image from its already-encoded bytes.
    pub fn outpainting(task: &BuildRequestTask, image_base64: String, seed: u32) -> Self {
        Self {
            task_type: TaskType::Outpainting,
            out_painting_params: OutPaintingParams {
                image: image_base64,
                text: task.prompt.clone(),
                negative_text: task.negative_prompt.clone(),
                mask_prompt: task.image.labels.clone(),
                out_painting_mode: task.mode,
            },
            image_generation_config: ImageGenerationConfig::with_seed(seed),
        }
    }
}

/// Draw a fresh seed, uniform over `[0, MAX_SEED]`.
pub fn draw_seed() -> u32 {
    rand::rng().random_range(0..=MAX_SEED)
}

// ---------------------------------------------------------------------------
// Response document
// ---------------------------------------------------------------------------

/// What the inference service writes back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDocument {
    /// Base64-encoded generated images.
    #[serde(default)]
    pub images: Vec<String>,
    /// Error text reported by the service, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseDocument {
    /// The image the pipeline keeps. Any further images are ignored.
    pub fn first_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Number of generated images beyond the first.
    pub fn discarded_count(&self) -> usize {
        self.images.len().saturating_sub(1)
    }
}

// ---------------------------------------------------------------------------
// Base64 payloads
// ---------------------------------------------------------------------------

/// Encode raw image bytes for a request document.
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode an image payload from a response document.
pub fn decode_image(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(payload)
}
