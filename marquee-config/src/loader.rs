use once_cell::sync::Lazy;
use std::{fs, path::PathBuf, time::Duration};
use thiserror::Error;

use marquee_core::providers::{DEFAULT_REGIONS, tmdb::TMDB_API_BASE};

use super::{
    models::{
        Config, ConfigMetadata, ExtractorConfig, PipelineConfig, RedisConfig,
        ServerConfig, TmdbConfig,
    },
    sources::{EnvConfig, FileConfig},
    validation::{self, ConfigGuardRailError, ConfigWarnings},
};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("marquee.toml"),
        PathBuf::from("config/marquee.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
struct ConfigLoaderOptions {
    config_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Loads `.env`, then composes the process environment over the TOML
    /// file over defaults.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_from_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Same as [`ConfigLoader::load`] with an explicit environment and no
    /// `.env` handling.
    pub fn load_from_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) = compose_config(file_config, env, config_path)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let requested = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match requested {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
            {
                Some(path) => path.clone(),
                None => return Ok((None, None)),
            },
        };

        let contents = fs::read_to_string(&path).map_err(|source| {
            ConfigLoadError::Io {
                path: path.clone(),
                source,
            }
        })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| {
                ConfigLoadError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if config_path.is_none() {
        warnings.push_with_hint(
            "No marquee.toml detected; using environment variables and defaults",
            "Create marquee.toml or point MARQUEE_CONFIG at a configuration file",
        );
    }

    let FileConfig {
        server: file_server,
        redis: file_redis,
        tmdb: file_tmdb,
        extractor: file_extractor,
        pipeline: file_pipeline,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| "0.0.0.0".to_string()),
        port: match env.server_port {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ConfigLoadError::InvalidNumber {
                    field: "SERVER_PORT",
                    value: raw.clone(),
                }
            })?,
            None => file_server.port.unwrap_or(3000),
        },
    };

    let redis = env
        .redis_url
        .or(file_redis.map(|r| r.url))
        .filter(|url| !url.trim().is_empty())
        .map(|url| RedisConfig { url });

    let tmdb = TmdbConfig {
        api_key: env
            .tmdb_api_key
            .or(file_tmdb.api_key)
            .filter(|key| !key.trim().is_empty()),
        base_url: env
            .tmdb_base_url
            .or(file_tmdb.base_url)
            .unwrap_or_else(|| TMDB_API_BASE.to_string()),
        language: env
            .tmdb_language
            .or(file_tmdb.language)
            .unwrap_or_else(|| "en-US".to_string()),
        regions: env
            .tmdb_regions
            .or(file_tmdb.regions)
            .unwrap_or_else(|| {
                DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect()
            })
            .into_iter()
            .map(|region| region.trim().to_ascii_uppercase())
            .filter(|region| !region.is_empty())
            .collect(),
        request_timeout: duration(
            "tmdb.request_timeout",
            env.tmdb_request_timeout.or(file_tmdb.request_timeout),
            Duration::from_secs(10),
        )?,
    };

    let extractor = ExtractorConfig {
        program: env
            .extractor_program
            .or(file_extractor.program)
            .unwrap_or_else(|| "python3".to_string()),
        args: env
            .extractor_args
            .or(file_extractor.args)
            .unwrap_or_else(|| vec!["scripts/letterboxd.py".to_string()]),
        marker: env
            .extractor_marker
            .or(file_extractor.marker)
            .unwrap_or_else(|| "MOVIE_NAME: ".to_string()),
        termination_grace: duration(
            "extractor.termination_grace",
            env.extractor_termination_grace
                .or(file_extractor.termination_grace),
            Duration::from_secs(5),
        )?,
    };

    let pipeline = PipelineConfig {
        run_deadline: duration(
            "pipeline.run_deadline",
            env.run_deadline.or(file_pipeline.run_deadline),
            Duration::from_secs(180),
        )?,
        lookup_deadline: duration(
            "pipeline.lookup_deadline",
            env.lookup_deadline.or(file_pipeline.lookup_deadline),
            Duration::from_secs(30),
        )?,
        inter_item_delay: duration(
            "pipeline.inter_item_delay",
            env.inter_item_delay.or(file_pipeline.inter_item_delay),
            Duration::from_millis(200),
        )?,
        cache_ttl: duration(
            "pipeline.cache_ttl",
            env.cache_ttl.or(file_pipeline.cache_ttl),
            Duration::from_secs(24 * 60 * 60),
        )?,
        error_cache_ttl: duration(
            "pipeline.error_cache_ttl",
            env.error_cache_ttl.or(file_pipeline.error_cache_ttl),
            Duration::from_secs(60 * 60),
        )?,
        cache_namespace: env
            .cache_namespace
            .or(file_pipeline.cache_namespace)
            .unwrap_or_else(|| "streaming:".to_string()),
        list_host: env
            .list_host
            .or(file_pipeline.list_host)
            .unwrap_or_else(|| "letterboxd.com".to_string()),
    };

    let config = Config {
        server,
        redis,
        tmdb,
        extractor,
        pipeline,
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded: false,
        },
    };

    warnings.extend(validation::apply_guard_rails(&config)?);
    Ok((config, warnings))
}

fn duration(
    field: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigLoadError> {
    match raw {
        Some(value) => humantime::parse_duration(value.trim()).map_err(
            |source| ConfigLoadError::InvalidDuration {
                field,
                value,
                source,
            },
        ),
        None => Ok(default),
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid duration '{value}' for {field}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("invalid number '{value}' for {field}")]
    InvalidNumber { field: &'static str, value: String },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}
