use thiserror::Error;
use url::Url;

use super::models::Config;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    #[error("tmdb.base_url is not a valid URL: {value}")]
    InvalidBaseUrl { value: String },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    non_empty("extractor.program", &config.extractor.program)?;
    non_empty("extractor.marker", &config.extractor.marker)?;
    non_empty("pipeline.list_host", &config.pipeline.list_host)?;
    if config.tmdb.regions.is_empty() {
        return Err(ConfigGuardRailError::Empty {
            field: "tmdb.regions",
        });
    }
    for (field, value) in [
        ("pipeline.run_deadline", config.pipeline.run_deadline),
        ("pipeline.lookup_deadline", config.pipeline.lookup_deadline),
        ("pipeline.cache_ttl", config.pipeline.cache_ttl),
        ("pipeline.error_cache_ttl", config.pipeline.error_cache_ttl),
        ("tmdb.request_timeout", config.tmdb.request_timeout),
    ] {
        if value.is_zero() {
            return Err(ConfigGuardRailError::ZeroDuration { field });
        }
    }
    if Url::parse(&config.tmdb.base_url).is_err() {
        return Err(ConfigGuardRailError::InvalidBaseUrl {
            value: config.tmdb.base_url.clone(),
        });
    }

    if config.tmdb.api_key.is_none() {
        warnings.push_with_hint(
            "No TMDB API key configured; list and lookup requests will be rejected",
            "Set TMDB_API_KEY or tmdb.api_key",
        );
    }
    if config.redis.is_none() {
        warnings.push_with_hint(
            "No Redis configured; resolved movies are cached in memory only",
            "Set REDIS_URL to share the cache across restarts",
        );
    }
    if config.pipeline.inter_item_delay.is_zero() {
        warnings.push(
            "pipeline.inter_item_delay is zero; metadata requests are not rate limited",
        );
    }
    if config.pipeline.error_cache_ttl > config.pipeline.cache_ttl {
        warnings.push(
            "pipeline.error_cache_ttl exceeds pipeline.cache_ttl; failed lookups will outlive successful ones",
        );
    }

    Ok(warnings)
}

fn non_empty(
    field: &'static str,
    value: &str,
) -> Result<(), ConfigGuardRailError> {
    if value.trim().is_empty() {
        Err(ConfigGuardRailError::Empty { field })
    } else {
        Ok(())
    }
}
