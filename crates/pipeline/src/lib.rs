//! Per-stage handlers of the outpainting pipeline.
//!
//! Each handler is one short adapter between services:
//!
//! - [`change_listener`]: tracking-table insert → workflow execution.
//! - [`request_builder`]: source image → inference request document.
//! - [`response_parser`]: inference response document → generated image.
//! - [`status_reporter`]: tracking-table entries → stored report + link.
//!
//! Handlers return typed errors; deciding what to do with them (log, drop,
//! answer with a status code) is left to the function entry points.

pub mod change_listener;
pub mod error;
pub mod request_builder;
pub mod response_parser;
pub mod scratch;
pub mod status_reporter;

pub use error::{ErrorKind, PipelineError};

/// Content type of every JSON document the pipeline writes.
pub const JSON_CONTENT_TYPE: &str = "application/json";
