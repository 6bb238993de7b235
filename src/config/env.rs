//! Environment variable loading.

use std::path::PathBuf;
use std::str::FromStr;

use super::ServerConfig;

/// Non-empty, trimmed value of an environment variable.
pub(super) fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an environment variable, naming it in the error.
pub(super) fn env_parse<T>(name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(name)
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| format!("Invalid value for {name}: '{v}' ({e})"))
        })
        .transpose()
}

/// Parse a boolean flag: `true/false`, `1/0`, `yes/no`, `on/off`.
pub(super) fn env_bool(name: &str) -> Result<Option<bool>, String> {
    env_string(name)
        .map(|v| match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(format!("Invalid value for {name}: '{v}' (expected a boolean)")),
        })
        .transpose()
}

/// Build a configuration from environment variables over defaults.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = ServerConfig::default();

    if let Some(host) = env_string("HOST") {
        config.host = host;
    }
    if let Some(port) = env_parse("PORT")? {
        config.port = port;
    }

    config.murf_api_key = env_string("MURF_API_KEY");
    config.gemini_api_key = env_string("GEMINI_API_KEY");

    if let Some(url) = env_string("MURF_STREAM_URL") {
        config.murf_stream_url = url;
    }
    if let Some(url) = env_string("MURF_GENERATE_URL") {
        config.murf_generate_url = url;
    }
    if let Some(secs) = env_parse("UPSTREAM_CONNECT_TIMEOUT_SECONDS")? {
        config.upstream_connect_timeout_seconds = secs;
    }

    if let Some(url) = env_string("GEMINI_BASE_URL") {
        config.gemini_base_url = url;
    }
    if let Some(model) = env_string("GEMINI_MODEL") {
        config.gemini_model = model;
    }
    if let Some(secs) = env_parse("GENERATION_TIMEOUT_SECONDS")? {
        config.generation_timeout_seconds = secs;
    }

    if let Some(path) = env_string("VOICE_CATALOG_PATH") {
        config.voice_catalog_path = PathBuf::from(path);
    }
    config.voice_catalog_inline =
        env_string("VIBE_VOICE_CATALOG").or_else(|| env_string("MURF_VOICE_CATALOG"));

    config.cache_path = env_string("CACHE_PATH").map(PathBuf::from);
    if let Some(ttl) = env_parse("CACHE_TTL_SECONDS")? {
        config.cache_ttl_seconds = Some(ttl);
    }
    if let Some(max) = env_parse("CACHE_MAX_ENTRIES")? {
        config.cache_max_entries = max;
    }
    if let Some(flag) = env_bool("CACHE_STREAM_AUDIO")? {
        config.cache_stream_audio = flag;
    }

    config.cors_allowed_origins = env_string("CORS_ALLOWED_ORIGINS");
    if let Some(rps) = env_parse("RATE_LIMIT_REQUESTS_PER_SECOND")? {
        config.rate_limit_requests_per_second = rps;
    }
    if let Some(burst) = env_parse("RATE_LIMIT_BURST_SIZE")? {
        config.rate_limit_burst_size = burst;
    }

    Ok(config)
}
