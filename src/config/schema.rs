//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dispatcher.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Process-wide rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fresh templates, live module loading, polling watcher.
    #[default]
    Development,
    /// Boot-time templates, manifest and server entry.
    Production,
}

impl Mode {
    /// Production iff the environment value is exactly `"production"`.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("production") => Mode::Production,
            _ => Mode::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Mode::Production
    }

    /// Value handed to the render runtime as `NODE_ENV`.
    pub fn as_env_value(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_env_value())
    }
}

/// Root configuration for the dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Project root; site directories and build output resolve against it.
    pub root: PathBuf,

    /// Rendering mode.
    pub mode: Mode,

    /// Build the app without binding a listener.
    pub test_build: bool,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// The two front-end applications, in dispatch order.
    pub sites: Vec<SiteConfig>,

    /// Development-mode settings.
    pub dev: DevConfig,

    /// Production build artifacts.
    pub production: ProductionConfig,

    /// Render runtime.
    pub runtime: RuntimeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            mode: Mode::default(),
            test_build: false,
            listener: ListenerConfig::default(),
            sites: vec![
                SiteConfig::new("test", "/test/", "test"),
                SiteConfig::new("test2", "/test2/", "test2"),
            ],
            dev: DevConfig::default(),
            production: ProductionConfig::default(),
            runtime: RuntimeConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:6173").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:6173".to_string(),
        }
    }
}

/// One front-end application served under a URL prefix.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Site identifier for logging/metrics.
    pub name: String,

    /// URL prefix, with leading and trailing slash (e.g. "/test/").
    pub prefix: String,

    /// Application root, relative to the project root.
    pub dir: PathBuf,
}

impl SiteConfig {
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            dir: dir.into(),
        }
    }
}

/// Development-mode configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DevConfig {
    /// File-watch polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Live-reload notification port of the first site; the second site uses
    /// the next port. 0 binds ephemeral ports.
    pub hmr_port: u16,

    /// Server entry module, relative to the site root.
    pub entry: String,

    /// Source template, relative to the site root.
    pub template: String,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            hmr_port: 24678,
            entry: "/src/entry-server.js".to_string(),
            template: "index.html".to_string(),
        }
    }
}

/// Production build artifact locations, relative to the project root.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProductionConfig {
    /// Client build output; also the static file root.
    pub client_dir: PathBuf,

    /// Precompiled server entry module.
    pub server_entry: PathBuf,

    /// Preload manifest, inside `client_dir`.
    pub manifest: String,

    /// Compiled shell template, inside `client_dir`.
    pub template: String,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            client_dir: PathBuf::from("dist/client"),
            server_entry: PathBuf::from("dist/server/entry-server.js"),
            manifest: "ssr-manifest.json".to_string(),
            template: "index.html".to_string(),
        }
    }
}

/// JavaScript runtime used to execute server entry modules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Program name or path.
    pub program: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            program: "node".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_env() {
        assert_eq!(Mode::from_env_value(Some("production")), Mode::Production);
        assert_eq!(Mode::from_env_value(Some("Production")), Mode::Development);
        assert_eq!(Mode::from_env_value(Some("test")), Mode::Development);
        assert_eq!(Mode::from_env_value(None), Mode::Development);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            mode = "production"

            [dev]
            hmr_port = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, Mode::Production);
        assert_eq!(config.dev.hmr_port, 0);
        assert_eq!(config.dev.poll_interval_ms, 100);
        assert_eq!(config.listener.bind_address, "0.0.0.0:6173");
        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.sites[0].prefix, "/test/");
        assert_eq!(config.sites[1].prefix, "/test2/");
    }
}
