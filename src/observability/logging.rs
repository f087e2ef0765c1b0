//! Structured logging.
//!
//! JSON output in production, human-readable output in development.
//! `RUST_LOG` overrides the configured level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ServerConfig;

/// Default filter directives for a log level.
pub fn default_directives(level: &str) -> String {
    format!("ssr_dispatcher={level},tower_http={level}")
}

/// Install the global subscriber.
pub fn init(config: &ServerConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(&config.observability.log_level).into());

    let json = config.mode.is_production();
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives("warn"), "ssr_dispatcher=warn,tower_http=warn");
        assert!(EnvFilter::try_new(default_directives("debug")).is_ok());
    }
}
