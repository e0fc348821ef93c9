//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber
//! - Pick pretty or JSON output from configuration
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level when set
//! - Initialization is idempotent so tests and binaries can both call it

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Build the filter: `RUST_LOG` if present, otherwise the configured level
/// for this crate plus tower-http.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "api_gateway={level},tower_http={level}",
            level = config.log_level
        ))
    })
}

/// Install the global subscriber. Returns false if one was already set.
pub fn init_logging(config: &ObservabilityConfig) -> bool {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let result = match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
    };

    result.is_ok()
}
