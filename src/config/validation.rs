//! Configuration validation.

use url::Url;

use super::ServerConfig;

/// Check that `value` parses as a URL with one of `schemes`.
pub(super) fn validate_url(field: &str, value: &str, schemes: &[&str]) -> Result<(), String> {
    let url = Url::parse(value).map_err(|e| format!("{field} is not a valid URL: {e}"))?;
    if !schemes.contains(&url.scheme()) {
        return Err(format!(
            "{field} must use one of [{}], got '{}'",
            schemes.join(", "),
            url.scheme()
        ));
    }
    Ok(())
}

/// Validate the merged configuration.
pub(super) fn validate_config(config: &ServerConfig) -> Result<(), String> {
    if config.port == 0 {
        return Err("port must be non-zero".to_string());
    }
    if config.generation_timeout_seconds == 0 {
        return Err("generation timeout must be non-zero".to_string());
    }
    if config.upstream_connect_timeout_seconds == 0 {
        return Err("upstream connect timeout must be non-zero".to_string());
    }
    if config.cache_max_entries == 0 {
        return Err("cache max_entries must be non-zero".to_string());
    }
    if config.cache_ttl_seconds == Some(0) {
        return Err("cache ttl_seconds must be non-zero when set".to_string());
    }
    if config.rate_limit_requests_per_second == 0 || config.rate_limit_burst_size == 0 {
        return Err("rate limit values must be non-zero".to_string());
    }

    validate_url("synthesis stream_url", &config.murf_stream_url, &["ws", "wss"])?;
    validate_url(
        "synthesis generate_url",
        &config.murf_generate_url,
        &["http", "https"],
    )?;
    validate_url(
        "generator base_url",
        &config.gemini_base_url,
        &["http", "https"],
    )?;

    Ok(())
}
