//! Logging setup.
//!
//! Installs a `tracing-subscriber` formatter filtered by `RUST_LOG` plus a
//! default `zerodte_engine=<level>` directive from configuration. Output is
//! JSON lines or human-readable per `observability.logging.format`.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Logging setup error.
#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    /// Unknown log level.
    #[error("invalid log level '{0}'")]
    InvalidLevel(String),

    /// Unknown output format.
    #[error("invalid log format '{0}', expected json or pretty")]
    InvalidFormat(String),

    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {0}")]
    SubscriberError(String),
}

/// Build the filter: `RUST_LOG` directives plus `zerodte_engine=<level>`.
pub fn build_filter(level: &str) -> Result<EnvFilter, ObservabilityError> {
    let level = level.trim().to_ascii_lowercase();
    if !LEVELS.contains(&level.as_str()) {
        return Err(ObservabilityError::InvalidLevel(level));
    }
    let directive = format!("zerodte_engine={level}")
        .parse()
        .map_err(|_| ObservabilityError::InvalidLevel(level.clone()))?;
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    Ok(base.add_directive(directive))
}

/// Install the global subscriber.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ObservabilityError> {
    let filter = build_filter(&config.level)?;

    let result = match config.format.to_ascii_lowercase().as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_current_span(config.include_spans)
            .with_span_list(config.include_spans)
            .with_env_filter(filter)
            .try_init(),
        "pretty" => tracing_subscriber::fmt().pretty().with_env_filter(filter).try_init(),
        other => return Err(ObservabilityError::InvalidFormat(other.to_string())),
    };
    result.map_err(|e| ObservabilityError::SubscriberError(e.to_string()))
}
