use std::fmt;

use outpaint_cloud::CloudError;
use outpaint_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Scratch storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "No generated image in {key}: {}",
        .service_error.as_deref().unwrap_or("empty image list")
    )]
    NoGeneratedImage {
        key: String,
        service_error: Option<String>,
    },

    #[error("Invalid image name '{0}'")]
    InvalidImageName(String),
}

/// Coarse failure classes used to tag error logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input field.
    Input,
    /// A storage, table or workflow call failed.
    Service,
    /// Reading or writing the invocation's scratch disk failed.
    Local,
    /// Base64, JSON or image encoding/decoding failed.
    Codec,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(CoreError::MissingField(_) | CoreError::Validation(_)) => ErrorKind::Input,
            Self::Core(CoreError::Json(_)) => ErrorKind::Codec,
            Self::Io(_) | Self::Cloud(CloudError::Io(_)) => ErrorKind::Local,
            Self::Cloud(_) => ErrorKind::Service,
            Self::Base64(_) | Self::Image(_) | Self::Json(_) => ErrorKind::Codec,
            Self::NoGeneratedImage { .. } | Self::InvalidImageName(_) => ErrorKind::Input,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Service => "service",
            Self::Local => "local",
            Self::Codec => "codec",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_error_source() {
        let missing = PipelineError::from(CoreError::MissingField("Id".into()));
        assert_eq!(missing.kind(), ErrorKind::Input);

        let storage = PipelineError::from(CloudError::Storage("boom".into()));
        assert_eq!(storage.kind(), ErrorKind::Service);

        let not_found = PipelineError::from(CloudError::NotFound {
            bucket: "jobs".into(),
            key: "a.png".into(),
        });
        assert_eq!(not_found.kind(), ErrorKind::Service);

        let json = PipelineError::from(serde_json::from_str::<u8>("x").unwrap_err());
        assert_eq!(json.kind(), ErrorKind::Codec);
    }

    #[test]
    fn scratch_disk_failures_are_local() {
        let disk = || std::io::Error::other("no space left");

        assert_eq!(PipelineError::from(disk()).kind(), ErrorKind::Local);
        assert_eq!(
            PipelineError::from(CloudError::from(disk())).kind(),
            ErrorKind::Local
        );
        assert_eq!(ErrorKind::Local.to_string(), "local");
    }

    #[test]
    fn no_generated_image_message_includes_service_error() {
        let err = PipelineError::NoGeneratedImage {
            key: "p/a.json".into(),
            service_error: Some("content filtered".into()),
        };
        assert_eq!(err.to_string(), "No generated image in p/a.json: content filtered");

        let err = PipelineError::NoGeneratedImage {
            key: "p/a.json".into(),
            service_error: None,
        };
        assert_eq!(err.to_string(), "No generated image in p/a.json: empty image list");
    }
}
