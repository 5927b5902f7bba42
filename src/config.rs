//! Application configuration
//!
//! Layered configuration: coded defaults, an optional `docserve.toml` file,
//! and `DOCSERVE`-prefixed environment variables, highest last.

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Directory that local file paths are resolved under.
    pub root: String,
    pub host: String,
    /// Port 0 requests a random port; the bound port is read back from the
    /// listener.
    pub port: u16,
    /// `Expires` header TTL in seconds; 0 omits the header.
    pub cache_expiration_seconds: u64,
    /// When set, Range headers are ignored and files are served whole.
    pub disable_range_requests: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub verbose: bool,
}

/// Object-storage backend configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Base URL of the storage service, e.g. `https://project.supabase.co`.
    pub base_url: String,
    pub api_key: String,
    pub bucket: String,
}

impl Config {
    /// Load configuration from `docserve.toml` plus the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("docserve")
    }

    /// Load configuration from the specified file path (without extension).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("DOCSERVE"))
            .set_default("server.root", ".")?
            .set_default("server.host", "localhost")?
            .set_default("server.port", 0)?
            .set_default("server.cache_expiration_seconds", 0)?
            .set_default("server.disable_range_requests", false)?
            .set_default("logging.verbose", false)?
            .set_default("storage.base_url", "http://127.0.0.1:54321")?
            .set_default("storage.api_key", "")?
            .set_default("storage.bucket", "pdfs")?
            .build()?;

        settings.try_deserialize()
    }
}
