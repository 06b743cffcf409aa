//! Environment configuration, read once per cold start.
//!
//! | Variable                       | Used by          | Default | Description                           |
//! |--------------------------------|------------------|---------|---------------------------------------|
//! | `INPUT_BUCKET`                 | change-listener  | --      | Bucket placed into job descriptors    |
//! | `IMAGE_PREFIX`                 | change-listener  | --      | Root of source images / request docs  |
//! | `GENERATED_IMAGE_PREFIX`       | change-listener  | --      | Root of response docs / outputs       |
//! | `STATUS_REPORT_PREFIX`         | change-listener  | --      | Root of status reports                |
//! | `STATE_MACHINE_ARN`            | change-listener  | --      | Workflow to start                     |
//! | `STATUS_TABLE`                 | status-reporter  | --      | Tracking table name                   |
//! | `STATUS_REPORT_URL_EXPIRATION` | status-reporter  | `3600`  | Report link lifetime, 1..=604800 secs |

use std::time::Duration;

use outpaint_core::job::StorageLayout;
use outpaint_pipeline::status_reporter::ReporterSettings;

/// Default report link lifetime.
pub const DEFAULT_URL_EXPIRATION_SECS: u64 = 3600;

/// Longest lifetime object storage accepts for a presigned link (one week).
pub const MAX_URL_EXPIRATION_SECS: u64 = 604_800;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

// ---------------------------------------------------------------------------
// Change listener
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    pub layout: StorageLayout,
    pub state_machine_arn: String,
}

impl ListenerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            layout: StorageLayout {
                bucket: required(&lookup, "INPUT_BUCKET")?,
                image_prefix: required(&lookup, "IMAGE_PREFIX")?,
                generated_image_prefix: required(&lookup, "GENERATED_IMAGE_PREFIX")?,
                status_report_prefix: required(&lookup, "STATUS_REPORT_PREFIX")?,
            },
            state_machine_arn: required(&lookup, "STATE_MACHINE_ARN")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Status reporter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterConfig {
    pub table_name: String,
    pub settings: ReporterSettings,
}

impl ReporterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let table_name = required(&lookup, "STATUS_TABLE")?;
        let secs = match lookup("STATUS_REPORT_URL_EXPIRATION") {
            None => DEFAULT_URL_EXPIRATION_SECS,
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| (1..=MAX_URL_EXPIRATION_SECS).contains(secs))
                .ok_or(ConfigError::Invalid {
                    name: "STATUS_REPORT_URL_EXPIRATION",
                    expected: "a number of seconds between 1 and 604800",
                    value: raw,
                })?,
        };
        Ok(Self {
            table_name,
            settings: ReporterSettings {
                url_expiration: Duration::from_secs(secs),
            },
        })
    }
}
