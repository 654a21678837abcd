use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use marquee_config::Config;
use marquee_core::{
    cache::{CacheStore, MemoryCache, RedisCache},
    extractor::{CandidateSource, ProcessExtractor},
    pipeline::{ListPipeline, TitleLookup},
    providers::{MetadataResolver, TmdbResolver},
};

use super::app_state::{AppState, Enrichment};

/// Connects the configured cache. An unreachable Redis degrades to the
/// in-memory cache instead of failing startup.
pub async fn connect_cache(config: &Config) -> Arc<dyn CacheStore> {
    let Some(redis) = config.redis.as_ref() else {
        return Arc::new(MemoryCache::new());
    };

    match RedisCache::connect(&redis.url, config.pipeline.cache_namespace.clone()).await {
        Ok(cache) => Arc::new(cache),
        Err(err) => {
            warn!(
                error = %err,
                "Redis unavailable; falling back to in-memory cache"
            );
            Arc::new(MemoryCache::new())
        }
    }
}

pub fn build_state(config: &Config, cache: Arc<dyn CacheStore>) -> Result<AppState> {
    let state = AppState::new(config.pipeline.list_host.as_str(), cache.backend_name());

    let Some(settings) = config.tmdb.resolver_settings() else {
        warn!("Starting without a TMDB API key; list and lookup requests will fail");
        return Ok(state);
    };

    let resolver: Arc<dyn MetadataResolver> =
        Arc::new(TmdbResolver::new(settings).context("failed to build TMDB client")?);
    let source: Arc<dyn CandidateSource> =
        Arc::new(ProcessExtractor::new(config.extractor.process_config()));

    let enrichment = Enrichment {
        pipeline: ListPipeline::new(
            source,
            Arc::clone(&resolver),
            Arc::clone(&cache),
            config.pipeline.pipeline_settings(),
        ),
        lookup: TitleLookup::new(resolver, cache, config.pipeline.lookup_settings()),
    };

    info!(
        extractor.program = %config.extractor.program,
        pipeline.run_deadline = ?config.pipeline.run_deadline,
        pipeline.inter_item_delay = ?config.pipeline.inter_item_delay,
        "enrichment services ready"
    );

    Ok(state.with_enrichment(enrichment))
}
