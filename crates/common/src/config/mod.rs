//! Configuration management for PaperDesk
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Object storage configuration
    pub storage: StorageConfig,

    /// Import pipeline configuration
    pub import: ImportConfig,

    /// Search configuration
    pub search: SearchConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// S3-compatible endpoint URL
    #[serde(default = "default_storage_endpoint")]
    pub endpoint: String,

    /// Region (MinIO accepts any value)
    #[serde(default = "default_storage_region")]
    pub region: String,

    /// Bucket holding paper PDFs
    #[serde(default = "default_storage_bucket")]
    pub bucket: String,

    /// Access key
    #[serde(default = "default_storage_access_key")]
    pub access_key: String,

    /// Secret key
    #[serde(default = "default_storage_secret_key")]
    pub secret_key: String,

    /// Presigned URL expiry in seconds
    #[serde(default = "default_presign_expiry")]
    pub presign_expiry_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportConfig {
    /// How long an uploaded file stays previewable before commit
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Number of rows returned by file preview
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Default page size when the client does not pass a limit
    #[serde(default = "default_search_limit")]
    pub default_limit: u64,

    /// Hard cap on page size
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_storage_endpoint() -> String { "http://localhost:9000".to_string() }
fn default_storage_region() -> String { "us-east-1".to_string() }
fn default_storage_bucket() -> String { "research-papers".to_string() }
fn default_storage_access_key() -> String { "minioadmin".to_string() }
fn default_storage_secret_key() -> String { "minioadmin123".to_string() }
fn default_presign_expiry() -> u64 { 3600 }
fn default_session_ttl() -> u64 { 900 }
fn default_preview_rows() -> usize { 5 }
fn default_search_limit() -> u64 { 100 }
fn default_max_limit() -> u64 { 500 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "paperdesk".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8001
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get upload session TTL as Duration
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.import.session_ttl_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }

    /// Clamp a client-supplied limit into the configured window
    pub fn clamp_limit(&self, limit: Option<u64>) -> u64 {
        limit
            .unwrap_or(self.search.default_limit)
            .min(self.search.max_limit)
            .max(1)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/paperdesk".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            storage: StorageConfig {
                endpoint: default_storage_endpoint(),
                region: default_storage_region(),
                bucket: default_storage_bucket(),
                access_key: default_storage_access_key(),
                secret_key: default_storage_secret_key(),
                presign_expiry_secs: default_presign_expiry(),
            },
            import: ImportConfig {
                session_ttl_secs: default_session_ttl(),
                preview_rows: default_preview_rows(),
            },
            search: SearchConfig {
                default_limit: default_search_limit(),
                max_limit: default_max_limit(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.storage.bucket, "research-papers");
        assert_eq!(config.import.session_ttl_secs, 900);
    }

    #[test]
    fn test_read_database_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.read_database_url(), "postgres://localhost/paperdesk");
    }

    #[test]
    fn test_clamp_limit() {
        let config = AppConfig::default();
        assert_eq!(config.clamp_limit(None), 100);
        assert_eq!(config.clamp_limit(Some(0)), 1);
        assert_eq!(config.clamp_limit(Some(10_000)), 500);
    }
}
