//! # Structured Logging
//!
//! Subscriber setup and startup configuration logging.

use crate::config::ObservabilityConfig;
use crate::errors::{CampusError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| CampusError::config(format!("Invalid log level '{}': {}", config.log_level, e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_logging {
        registry.with(fmt::layer().json().with_current_span(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| CampusError::config(format!("Failed to install log subscriber: {}", e)))
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        server_address = %config.server.bind_address(),
        database_url = %crate::storage::pool::sanitize_url(&config.database.url),
        auto_migrate = config.database.auto_migrate,
        access_ttl_seconds = config.auth.access_ttl_seconds,
        refresh_ttl_seconds = config.auth.refresh_ttl_seconds,
        cookie_secure = config.auth.cookie_secure,
        metrics_port = config.observability.metrics_port,
        "Campus auth service configuration"
    );
}
