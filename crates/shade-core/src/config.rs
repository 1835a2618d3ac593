//! Application configuration with layered loading.
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by the `SHADE_CONFIG` env var
//! 3. **Environment variables**: `SHADE__*` vars override specific fields
//!
//! Sections:
//!
//! - [`ServerConfig`]: bind address, request timeout, body size limit
//! - [`OriginConfig`]: the single origin RPC endpoint
//! - [`CacheConfig`]: TTL and sizing
//! - [`CorsConfig`]: extra allowed origins beyond the built-in patterns
//! - [`LoggingConfig`]: log level and format
//!
//! Configuration is validated at load time; invalid values (zero TTL,
//! malformed origin URL) return errors rather than failing silently.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// HTTP server configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind the server to. Defaults to `127.0.0.1`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port number to listen on. Must be greater than 0. Defaults to `3030`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Maximum inbound body size in bytes. Defaults to `1 MiB`.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    3030
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// The single origin RPC endpoint the proxy fronts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Base URL of the origin (e.g. `https://rpc.example.com`). The
    /// inbound path is appended to it when forwarding.
    pub base_url: String,

    /// Request timeout in seconds for origin calls. Defaults to `30`.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

/// Cache sizing and TTL settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache entry time-to-live in seconds. Must be greater than 0.
    /// Defaults to `1`: RPC state moves block by block, so entries only
    /// need to absorb request bursts, not persist.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Maximum number of cached entries. Defaults to `10_000`.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

fn default_ttl_seconds() -> u64 {
    1
}

fn default_max_entries() -> u64 {
    10_000
}

/// CORS configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Exact origins allowed in addition to the built-in patterns.
    #[serde(default)]
    pub extra_allowed_origins: Vec<String>,
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g. "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 3030,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: "https://rpc.cosmos.directory/juno".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 1, max_entries: 10_000 }
    }
}

/// Root application configuration containing all subsystem settings.
///
/// Environment overrides use the `SHADE` prefix with `__` as a nested
/// field separator (e.g. `SHADE__SERVER__BIND_PORT=8080`).
///
/// # Example
///
/// ```toml
/// [server]
/// bind_port = 8080
///
/// [origin]
/// base_url = "https://rpc.example.com"
/// timeout_seconds = 10
///
/// [cache]
/// ttl_seconds = 1
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Origin endpoint configuration.
    #[serde(default)]
    pub origin: OriginConfig,

    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_builder = Config::builder()
            .set_default("server.bind_address", "127.0.0.1")?
            .set_default("server.bind_port", 3030)?
            .set_default("server.max_body_bytes", 1024 * 1024)?
            .set_default("origin.base_url", OriginConfig::default().base_url)?
            .set_default("origin.timeout_seconds", 30)?
            .set_default("cache.ttl_seconds", 1)?
            .set_default("cache.max_entries", 10_000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("SHADE").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/config.toml` with fallback to defaults.
    ///
    /// The config file path can be overridden using the `SHADE_CONFIG`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("SHADE_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Returns the parsed socket address for the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns an error string if the address cannot be parsed into a
    /// valid [`SocketAddr`](std::net::SocketAddr).
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.bind_port)
            .parse()
            .map_err(|_| {
                format!(
                    "Invalid socket address: {}:{}",
                    self.server.bind_address, self.server.bind_port
                )
            })
    }

    /// Returns the origin request timeout as a [`Duration`].
    #[must_use]
    pub fn origin_timeout(&self) -> Duration {
        Duration::from_secs(self.origin.timeout_seconds)
    }

    /// Returns the cache TTL as a [`Duration`].
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.origin.base_url.is_empty() {
            return Err("Origin base URL must not be empty".to_string());
        }
        if !self.origin.base_url.starts_with("http") {
            return Err(format!("Invalid origin base URL: {}", self.origin.base_url));
        }
        if self.origin.timeout_seconds == 0 {
            return Err("Origin timeout must be greater than 0".to_string());
        }
        if self.cache.ttl_seconds == 0 {
            return Err("Cache TTL must be greater than 0".to_string());
        }
        if self.cache.max_entries == 0 {
            return Err("Cache capacity must be greater than 0".to_string());
        }
        if self.server.bind_port == 0 {
            return Err("Bind port must be greater than 0".to_string());
        }
        if self.server.max_body_bytes == 0 {
            return Err("Max body size must be greater than 0".to_string());
        }
        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }
        Ok(())
    }
}
