use std::path::PathBuf;
use std::time::Duration;

use marquee_core::cache::TtlPolicy;
use marquee_core::extractor::ProcessExtractorConfig;
use marquee_core::pipeline::{LookupSettings, PipelineSettings};
use marquee_core::providers::TmdbSettings;

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: Option<RedisConfig>,
    pub tmdb: TmdbConfig,
    pub extractor: ExtractorConfig,
    pub pipeline: PipelineConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Clone)]
pub struct TmdbConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub language: String,
    pub regions: Vec<String>,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for TmdbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .field("regions", &self.regions)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl TmdbConfig {
    /// Resolver settings, or `None` when no API key is configured.
    pub fn resolver_settings(&self) -> Option<TmdbSettings> {
        let api_key = self.api_key.clone()?;
        Some(TmdbSettings {
            api_key,
            base_url: self.base_url.clone(),
            language: self.language.clone(),
            regions: self.regions.clone(),
            request_timeout: self.request_timeout,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub program: String,
    pub args: Vec<String>,
    pub marker: String,
    pub termination_grace: Duration,
}

impl ExtractorConfig {
    pub fn process_config(&self) -> ProcessExtractorConfig {
        ProcessExtractorConfig {
            program: self.program.clone(),
            args: self.args.clone(),
            marker: self.marker.clone(),
            termination_grace: self.termination_grace,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub run_deadline: Duration,
    pub lookup_deadline: Duration,
    pub inter_item_delay: Duration,
    pub cache_ttl: Duration,
    pub error_cache_ttl: Duration,
    pub cache_namespace: String,
    /// Host a list URL must belong to (subdomains allowed).
    pub list_host: String,
}

impl PipelineConfig {
    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy {
            ttl: self.cache_ttl,
            error_ttl: self.error_cache_ttl,
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            run_deadline: self.run_deadline,
            inter_item_delay: self.inter_item_delay,
            ttl: self.ttl_policy(),
        }
    }

    pub fn lookup_settings(&self) -> LookupSettings {
        LookupSettings {
            deadline: self.lookup_deadline,
            ttl: self.ttl_policy(),
        }
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
