//! Domain types and codecs for the outpainting image pipeline.
//!
//! Everything in this crate is pure: no service clients, no I/O. The
//! handler crates build on these types to move jobs between the tracking
//! table, object storage and the workflow engine.

pub mod attribute;
pub mod error;
pub mod inference;
pub mod job;
pub mod keys;
pub mod stage;
pub mod submission;
