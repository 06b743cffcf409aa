//! Tracing subscriber setup shared by all entry points.
//!
//! Inside the serverless runtime, lines go out as JSON without ANSI colour
//! so the log service can index the structured fields. Locally the default
//! is the human-readable formatter. `LOG_FORMAT` overrides either choice and
//! `RUST_LOG` overrides the per-binary default filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// `LOG_FORMAT` if set to `json` or `pretty`, otherwise JSON when
    /// running inside the function runtime.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            Some(v) if v.eq_ignore_ascii_case("pretty") => Self::Pretty,
            _ if lookup("AWS_LAMBDA_FUNCTION_NAME").is_some() => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Install the global subscriber. `default_filter` applies when `RUST_LOG`
/// is unset.
pub fn init(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match LogFormat::from_lookup(|name| std::env::var(name).ok()) {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_current_span(false),
            )
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn explicit_format_wins() {
        assert_eq!(LogFormat::from_lookup(with(&[("LOG_FORMAT", "JSON")])), LogFormat::Json);
        assert_eq!(
            LogFormat::from_lookup(with(&[
                ("LOG_FORMAT", "pretty"),
                ("AWS_LAMBDA_FUNCTION_NAME", "request-builder"),
            ])),
            LogFormat::Pretty
        );
    }

    #[test]
    fn function_runtime_defaults_to_json() {
        assert_eq!(
            LogFormat::from_lookup(with(&[("AWS_LAMBDA_FUNCTION_NAME", "status-reporter")])),
            LogFormat::Json
        );
        assert_eq!(LogFormat::from_lookup(with(&[])), LogFormat::Pretty);
    }
}
