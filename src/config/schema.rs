//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the core.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default port this service listens on.
pub const DEFAULT_PORT: u16 = 3567;

/// Root configuration for the request-handling core.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Bind host. `0.0.0.0` binds all interfaces.
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Worker budget: requests executing handler logic concurrently.
    pub max_server_pool_size: usize,

    /// Upper bound on a buffered request body.
    pub max_request_body_bytes: usize,

    /// Protocol versions this instance accepts, as `major.minor`.
    pub supported_versions: Vec<String>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Multi-tenant storage bindings created at startup.
    pub apps: Vec<AppConfig>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            max_server_pool_size: 10,
            max_request_body_bytes: 1024 * 1024,
            supported_versions: default_versions(),
            observability: ObservabilityConfig::default(),
            apps: Vec::new(),
        }
    }
}

fn default_versions() -> Vec<String> {
    ["2.21", "3.0", "3.1", "4.0", "5.0", "5.1"]
        .iter()
        .map(|v| v.to_string())
        .collect()
}

/// One application and the tenants it hosts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Domain the app is reached through. Empty means the default domain.
    #[serde(default)]
    pub connection_uri_domain: String,

    /// Application id.
    pub app_id: String,

    /// Tenant ids inside the app. The `public` tenant is always added.
    #[serde(default)]
    pub tenants: Vec<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
