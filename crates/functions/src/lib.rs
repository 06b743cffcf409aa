//! Serverless entry points for the outpainting pipeline.
//!
//! One binary per handler lives under `src/bin/`. They share the
//! environment configuration in [`config`], the subscriber setup in
//! [`telemetry`] and the failure policy in [`dispatch`]: every error is
//! logged and the invocation still completes, so the event source never
//! retries on our account.

pub mod config;
pub mod dispatch;
pub mod telemetry;
