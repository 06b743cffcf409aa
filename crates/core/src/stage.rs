//! Lifecycle stages of one image as it moves through the pipeline.
//!
//! Sequencing, retries and persistence belong to the workflow engine. The
//! handlers only use [`ImageStage`] to tag what transition they performed,
//! so log lines from independently deployed functions line up.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageStage {
    /// Job accepted, execution started.
    Pending,
    /// Request document written.
    RequestBuilt,
    /// Inference service wrote a response document.
    Inferred,
    /// Generated image decoded and stored.
    Parsed,
    Done,
    Failed,
}

impl ImageStage {
    /// The stage that follows a successful step, or `None` from a terminal
    /// stage.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::RequestBuilt),
            Self::RequestBuilt => Some(Self::Inferred),
            Self::Inferred => Some(Self::Parsed),
            Self::Parsed => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Failing is possible from every non-terminal stage.
    pub fn fail(self) -> Option<Self> {
        if self.is_terminal() {
            None
        } else {
            Some(Self::Failed)
        }
    }

    /// Where a successful step from `self` lands. Terminal stages stay put.
    pub fn advanced(self) -> Self {
        self.next().unwrap_or(self)
    }

    /// Where a failed step from `self` lands. Terminal stages stay put.
    pub fn failed(self) -> Self {
        self.fail().unwrap_or(self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::RequestBuilt => "REQUEST_BUILT",
            Self::Inferred => "INFERRED",
            Self::Parsed => "PARSED",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ImageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
