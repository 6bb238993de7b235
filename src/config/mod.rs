//! Configuration module for the Vibe gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use vibe_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::core::cache::{CacheConfig, DEFAULT_MAX_ENTRIES};
use crate::core::generator::{GEMINI_BASE_URL, GEMINI_MODEL, GeminiConfig};
use crate::core::relay::RelaySettings;
use crate::core::synthesis::{MURF_GENERATE_URL, MURF_STREAM_URL, MurfConfig};

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

/// Default catalog file, relative to the working directory.
pub const DEFAULT_VOICE_CATALOG_PATH: &str = "voices.json";

/// Server configuration
///
/// Contains all configuration needed to run the gateway: the listen address,
/// provider credentials and endpoints, the voice catalog source, the response
/// cache and security settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    // Provider credentials
    pub murf_api_key: Option<String>,
    pub gemini_api_key: Option<String>,

    // Synthesis endpoints
    pub murf_stream_url: String,
    pub murf_generate_url: String,
    /// Bound on opening and configuring an upstream synthesis stream
    /// Default: 15
    pub upstream_connect_timeout_seconds: u64,

    // Text generation
    pub gemini_base_url: String,
    pub gemini_model: String,
    /// Bound on a single generation call
    /// Default: 60
    pub generation_timeout_seconds: u64,

    // Voice catalog
    pub voice_catalog_path: PathBuf,
    /// Inline catalog JSON; takes precedence over `voice_catalog_path`
    pub voice_catalog_inline: Option<String>,

    // Response cache
    /// Directory for the persistent cache tier; memory only when unset
    pub cache_path: Option<PathBuf>,
    pub cache_ttl_seconds: Option<u64>,
    pub cache_max_entries: u64,
    /// Store streamed audio in cache entries so hits can replay it
    pub cache_stream_audio: bool,

    // Security
    /// Comma-separated list of allowed origins, or "*"
    /// Default: None (any origin)
    pub cors_allowed_origins: Option<String>,
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Default: 10
    pub rate_limit_burst_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            murf_api_key: None,
            gemini_api_key: None,
            murf_stream_url: MURF_STREAM_URL.to_string(),
            murf_generate_url: MURF_GENERATE_URL.to_string(),
            upstream_connect_timeout_seconds: 15,
            gemini_base_url: GEMINI_BASE_URL.to_string(),
            gemini_model: GEMINI_MODEL.to_string(),
            generation_timeout_seconds: 60,
            voice_catalog_path: PathBuf::from(DEFAULT_VOICE_CATALOG_PATH),
            voice_catalog_inline: None,
            cache_path: None,
            cache_ttl_seconds: None,
            cache_max_entries: DEFAULT_MAX_ENTRIES,
            cache_stream_audio: false,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
        }
    }
}

/// Zeroize provider credentials when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.murf_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.gemini_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// The .env file is loaded by `main` before this is called, so values
    /// from it appear here as ordinary environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation fails
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            generation_timeout: Duration::from_secs(self.generation_timeout_seconds),
            connect_timeout: Duration::from_secs(self.upstream_connect_timeout_seconds),
            accumulate_audio: self.cache_stream_audio,
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            path: self.cache_path.clone(),
            ttl: self.cache_ttl_seconds.map(Duration::from_secs),
            max_entries: self.cache_max_entries,
        }
    }

    pub fn murf_config(&self) -> MurfConfig {
        MurfConfig {
            api_key: self.murf_api_key.clone(),
            stream_url: self.murf_stream_url.clone(),
            generate_url: self.murf_generate_url.clone(),
            connect_timeout: Duration::from_secs(self.upstream_connect_timeout_seconds),
            ..MurfConfig::default()
        }
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.gemini_api_key.clone(),
            base_url: self.gemini_base_url.clone(),
            model: self.gemini_model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    // Helper to clean up environment variables
    fn cleanup_env_vars() {
        unsafe {
            env::remove_var("HOST");
            env::remove_var("PORT");
            env::remove_var("MURF_API_KEY");
            env::remove_var("GEMINI_API_KEY");
            env::remove_var("MURF_STREAM_URL");
            env::remove_var("MURF_GENERATE_URL");
            env::remove_var("UPSTREAM_CONNECT_TIMEOUT_SECONDS");
            env::remove_var("GEMINI_BASE_URL");
            env::remove_var("GEMINI_MODEL");
            env::remove_var("GENERATION_TIMEOUT_SECONDS");
            env::remove_var("VOICE_CATALOG_PATH");
            env::remove_var("VIBE_VOICE_CATALOG");
            env::remove_var("MURF_VOICE_CATALOG");
            env::remove_var("CACHE_PATH");
            env::remove_var("CACHE_TTL_SECONDS");
            env::remove_var("CACHE_MAX_ENTRIES");
            env::remove_var("CACHE_STREAM_AUDIO");
            env::remove_var("CORS_ALLOWED_ORIGINS");
            env::remove_var("RATE_LIMIT_REQUESTS_PER_SECOND");
            env::remove_var("RATE_LIMIT_BURST_SIZE");
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3001);
        assert!(config.murf_api_key.is_none());
        assert_eq!(config.murf_stream_url, MURF_STREAM_URL);
        assert_eq!(config.gemini_model, GEMINI_MODEL);
        assert_eq!(
            config.voice_catalog_path,
            PathBuf::from(DEFAULT_VOICE_CATALOG_PATH)
        );
        assert!(config.cache_path.is_none());
        assert!(!config.cache_stream_audio);
        assert_eq!(config.address(), "0.0.0.0:3001");
    }

    #[test]
    #[serial]
    fn test_from_env_values() {
        cleanup_env_vars();
        unsafe {
            env::set_var("HOST", "127.0.0.1");
            env::set_var("PORT", "8000");
            env::set_var("MURF_API_KEY", "env-murf");
            env::set_var("GEMINI_API_KEY", "env-gemini");
            env::set_var("MURF_VOICE_CATALOG", r#"{"en-US": [{"id": "v1"}]}"#);
            env::set_var("CACHE_PATH", "/tmp/vibe-cache");
            env::set_var("CACHE_TTL_SECONDS", "120");
            env::set_var("CACHE_STREAM_AUDIO", "true");
            env::set_var("GENERATION_TIMEOUT_SECONDS", "5");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.address(), "127.0.0.1:8000");
        assert_eq!(config.murf_api_key.as_deref(), Some("env-murf"));
        assert_eq!(config.gemini_api_key.as_deref(), Some("env-gemini"));
        assert!(config.voice_catalog_inline.is_some());
        assert_eq!(config.cache_path, Some(PathBuf::from("/tmp/vibe-cache")));

        let cache = config.cache_config();
        assert_eq!(cache.ttl, Some(Duration::from_secs(120)));

        let relay = config.relay_settings();
        assert_eq!(relay.generation_timeout, Duration::from_secs(5));
        assert!(relay.accumulate_audio);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_port() {
        cleanup_env_vars();
        unsafe {
            env::set_var("PORT", "not-a-port");
        }

        let err = ServerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("PORT"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_only() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8080

providers:
  murf_api_key: "yaml-murf-key"

synthesis:
  stream_url: "ws://127.0.0.1:9000/stream"
  connect_timeout_seconds: 3

cache:
  path: "/tmp/yaml-cache"
  ttl_seconds: 7200
"#;
        fs::write(&config_path, yaml_content).unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.murf_api_key.as_deref(), Some("yaml-murf-key"));
        assert_eq!(config.cache_ttl_seconds, Some(7200));

        let murf = config.murf_config();
        assert_eq!(murf.stream_url, "ws://127.0.0.1:9000/stream");
        assert_eq!(murf.connect_timeout, Duration::from_secs(3));
        assert_eq!(murf.generate_url, MURF_GENERATE_URL);
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();
        unsafe {
            env::set_var("PORT", "4000");
            env::set_var("GEMINI_API_KEY", "env-gemini");
            env::set_var("GEMINI_MODEL", "env-model");
        }

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(
            &config_path,
            "server:\n  port: 5000\ngenerator:\n  model: \"yaml-model\"\n",
        )
        .unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();
        assert_eq!(config.port, 5000);
        // Values absent from the YAML keep their environment value
        assert_eq!(config.gemini_api_key.as_deref(), Some("env-gemini"));
        assert_eq!(config.gemini_config().model, "yaml-model");

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_validation_failure() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(
            &config_path,
            "synthesis:\n  stream_url: \"http://not-a-websocket\"\n",
        )
        .unwrap();

        let err = ServerConfig::from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("stream_url"));
    }
}
