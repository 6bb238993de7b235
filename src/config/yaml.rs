use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8000
///
/// providers:
///   murf_api_key: "your-murf-key"
///   gemini_api_key: "your-gemini-key"
///
/// synthesis:
///   stream_url: "wss://api.murf.ai/v1/speech/stream-input"
///   generate_url: "https://api.murf.ai/v1/speech/generate"
///   connect_timeout_seconds: 15
///
/// generator:
///   base_url: "https://generativelanguage.googleapis.com"
///   model: "gemini-1.5-flash"
///   timeout_seconds: 60
///
/// voices:
///   path: "voices.json"
///   inline: '{"en-US": [{"id": "en-US-natalie"}]}'
///
/// cache:
///   path: "/var/cache/vibe-gateway"
///   ttl_seconds: 2592000
///   max_entries: 1024
///   stream_audio: false
///
/// security:
///   cors_allowed_origins: "https://app.example.com"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub providers: Option<ProvidersYaml>,
    pub synthesis: Option<SynthesisYaml>,
    pub generator: Option<GeneratorYaml>,
    pub voices: Option<VoicesYaml>,
    pub cache: Option<CacheYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Provider API keys from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    /// Murf API key for streaming and one-shot synthesis
    pub murf_api_key: Option<String>,
    /// Gemini API key for text generation
    pub gemini_api_key: Option<String>,
}

/// Synthesis backend endpoints from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SynthesisYaml {
    pub stream_url: Option<String>,
    pub generate_url: Option<String>,
    pub connect_timeout_seconds: Option<u64>,
}

/// Text generator settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneratorYaml {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Voice catalog source from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VoicesYaml {
    pub path: Option<String>,
    /// Catalog JSON embedded in the config file; wins over `path`
    pub inline: Option<String>,
}

/// Response cache configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CacheYaml {
    pub path: Option<String>,
    pub ttl_seconds: Option<u64>,
    pub max_entries: Option<u64>,
    /// Keep streamed audio in cache entries
    pub stream_audio: Option<bool>,
}

/// Security settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid YAML
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080

providers:
  murf_api_key: "murf-key"
  gemini_api_key: "gemini-key"

synthesis:
  stream_url: "ws://localhost:9000/stream"
  connect_timeout_seconds: 5

generator:
  model: "gemini-1.5-pro"
  timeout_seconds: 30

voices:
  path: "/etc/vibe/voices.json"

cache:
  path: "/tmp/cache"
  ttl_seconds: 3600
  max_entries: 10
  stream_audio: true

security:
  rate_limit_requests_per_second: 5
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(
            config.server.as_ref().unwrap().host,
            Some("127.0.0.1".to_string())
        );
        assert_eq!(config.server.as_ref().unwrap().port, Some(8080));
        assert_eq!(
            config.providers.as_ref().unwrap().murf_api_key,
            Some("murf-key".to_string())
        );
        assert_eq!(
            config.synthesis.as_ref().unwrap().stream_url,
            Some("ws://localhost:9000/stream".to_string())
        );
        assert_eq!(config.generator.as_ref().unwrap().timeout_seconds, Some(30));
        assert_eq!(
            config.voices.as_ref().unwrap().path,
            Some("/etc/vibe/voices.json".to_string())
        );
        let cache = config.cache.as_ref().unwrap();
        assert_eq!(cache.path, Some("/tmp/cache".to_string()));
        assert_eq!(cache.max_entries, Some(10));
        assert_eq!(cache.stream_audio, Some(true));
        assert_eq!(
            config
                .security
                .as_ref()
                .unwrap()
                .rate_limit_requests_per_second,
            Some(5)
        );
    }

    #[test]
    fn test_yaml_config_partial() {
        let yaml = r#"
server:
  port: 9000
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.as_ref().unwrap().port, Some(9000));
        assert!(config.server.as_ref().unwrap().host.is_none());
        assert!(config.providers.is_none());
        assert!(config.cache.is_none());
    }

    #[test]
    fn test_yaml_config_inline_catalog() {
        let yaml = r#"
voices:
  inline: '{"en-US": [{"id": "v1"}]}'
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.voices.unwrap().inline.as_deref(),
            Some(r#"{"en-US": [{"id": "v1"}]}"#)
        );
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "server:\n  host: \"localhost\"\n").unwrap();

        let config = YamlConfig::from_file(&path).unwrap();
        assert_eq!(config.server.unwrap().host, Some("localhost".to_string()));
    }

    #[test]
    fn test_from_file_not_found() {
        let result = YamlConfig::from_file(&PathBuf::from("/nonexistent/config.yaml"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "server: [unclosed").unwrap();

        let result = YamlConfig::from_file(&path);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }
}
