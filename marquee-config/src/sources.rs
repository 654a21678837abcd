use serde::Deserialize;
use std::path::PathBuf;

/// Raw configuration as defined in a TOML file.
///
/// Durations are humantime strings such as `"3m"` or `"200ms"`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    pub redis: Option<FileRedisConfig>,
    #[serde(default)]
    pub tmdb: FileTmdbConfig,
    #[serde(default)]
    pub extractor: FileExtractorConfig,
    #[serde(default)]
    pub pipeline: FilePipelineConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileRedisConfig {
    pub url: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileTmdbConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub language: Option<String>,
    pub regions: Option<Vec<String>>,
    pub request_timeout: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileExtractorConfig {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    pub marker: Option<String>,
    pub termination_grace: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilePipelineConfig {
    pub run_deadline: Option<String>,
    pub lookup_deadline: Option<String>,
    pub inter_item_delay: Option<String>,
    pub cache_ttl: Option<String>,
    pub error_cache_ttl: Option<String>,
    pub cache_namespace: Option<String>,
    pub list_host: Option<String>,
}

/// Environment-derived configuration values, kept raw so that malformed
/// numbers and durations can be reported instead of silently dropped.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<String>,
    pub redis_url: Option<String>,
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: Option<String>,
    pub tmdb_language: Option<String>,
    pub tmdb_regions: Option<Vec<String>>,
    pub tmdb_request_timeout: Option<String>,
    pub extractor_program: Option<String>,
    pub extractor_args: Option<Vec<String>>,
    pub extractor_marker: Option<String>,
    pub extractor_termination_grace: Option<String>,
    pub run_deadline: Option<String>,
    pub lookup_deadline: Option<String>,
    pub inter_item_delay: Option<String>,
    pub cache_ttl: Option<String>,
    pub error_cache_ttl: Option<String>,
    pub cache_namespace: Option<String>,
    pub list_host: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let csv = |name: &str| var(name).map(|raw| split_csv(&raw));

        Self {
            config_path: var("MARQUEE_CONFIG").map(PathBuf::from),
            server_host: var("SERVER_HOST"),
            server_port: var("SERVER_PORT"),
            redis_url: var("REDIS_URL"),
            tmdb_api_key: var("TMDB_API_KEY"),
            tmdb_base_url: var("TMDB_BASE_URL"),
            tmdb_language: var("TMDB_LANGUAGE"),
            tmdb_regions: csv("TMDB_REGIONS"),
            tmdb_request_timeout: var("TMDB_REQUEST_TIMEOUT"),
            extractor_program: var("EXTRACTOR_PROGRAM"),
            extractor_args: csv("EXTRACTOR_ARGS"),
            // Trailing whitespace is significant in the marker.
            extractor_marker: lookup("EXTRACTOR_MARKER").filter(|v| !v.is_empty()),
            extractor_termination_grace: var("EXTRACTOR_TERMINATION_GRACE"),
            run_deadline: var("PIPELINE_RUN_DEADLINE"),
            lookup_deadline: var("PIPELINE_LOOKUP_DEADLINE"),
            inter_item_delay: var("PIPELINE_INTER_ITEM_DELAY"),
            cache_ttl: var("PIPELINE_CACHE_TTL"),
            error_cache_ttl: var("PIPELINE_ERROR_CACHE_TTL"),
            cache_namespace: var("PIPELINE_CACHE_NAMESPACE"),
            list_host: var("PIPELINE_LIST_HOST"),
        }
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}
