use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marquee_config::{ConfigLoad, ConfigLoader};
use marquee_server::{create_app, infra::startup};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "marquee-server")]
#[command(about = "Streams streaming-availability data for movie lists")]
struct Cli {
    /// Path to a marquee.toml configuration file
    #[arg(short, long, env = "MARQUEE_CONFIG")]
    config: Option<PathBuf>,

    /// Environment file to load instead of `./.env`
    #[arg(long, env = "MARQUEE_ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config.clone() {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = cli.env_file.clone() {
        loader = loader.with_env_file(path);
    }
    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Override via RUST_LOG.
                "info,marquee_core=info,tower_http=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = config.metadata.config_path.as_ref() {
        info!(path = %path.display(), "configuration file loaded");
    }

    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }

    let cache = startup::connect_cache(&config).await;
    let state = startup::build_state(&config, cache)?;
    info!(cache.backend = state.cache_backend(), "cache ready");
    let app = create_app(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Marquee listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
