//! Merge environment configuration with YAML overrides.

use std::path::PathBuf;

use super::ServerConfig;
use super::env::load_from_env;
use super::yaml::YamlConfig;

/// Load the environment configuration and apply YAML values on top of it.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = load_from_env()?;

    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
    }

    if let Some(providers) = yaml.providers {
        if providers.murf_api_key.is_some() {
            config.murf_api_key = providers.murf_api_key;
        }
        if providers.gemini_api_key.is_some() {
            config.gemini_api_key = providers.gemini_api_key;
        }
    }

    if let Some(synthesis) = yaml.synthesis {
        if let Some(url) = synthesis.stream_url {
            config.murf_stream_url = url;
        }
        if let Some(url) = synthesis.generate_url {
            config.murf_generate_url = url;
        }
        if let Some(secs) = synthesis.connect_timeout_seconds {
            config.upstream_connect_timeout_seconds = secs;
        }
    }

    if let Some(generator) = yaml.generator {
        if let Some(url) = generator.base_url {
            config.gemini_base_url = url;
        }
        if let Some(model) = generator.model {
            config.gemini_model = model;
        }
        if let Some(secs) = generator.timeout_seconds {
            config.generation_timeout_seconds = secs;
        }
    }

    if let Some(voices) = yaml.voices {
        if let Some(path) = voices.path {
            config.voice_catalog_path = PathBuf::from(path);
        }
        if voices.inline.is_some() {
            config.voice_catalog_inline = voices.inline;
        }
    }

    if let Some(cache) = yaml.cache {
        if let Some(path) = cache.path {
            config.cache_path = Some(PathBuf::from(path));
        }
        if cache.ttl_seconds.is_some() {
            config.cache_ttl_seconds = cache.ttl_seconds;
        }
        if let Some(max) = cache.max_entries {
            config.cache_max_entries = max;
        }
        if let Some(flag) = cache.stream_audio {
            config.cache_stream_audio = flag;
        }
    }

    if let Some(security) = yaml.security {
        if security.cors_allowed_origins.is_some() {
            config.cors_allowed_origins = security.cors_allowed_origins;
        }
        if let Some(rps) = security.rate_limit_requests_per_second {
            config.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = security.rate_limit_burst_size {
            config.rate_limit_burst_size = burst;
        }
    }

    Ok(config)
}
