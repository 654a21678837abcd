use std::{fmt, sync::Arc};

use marquee_core::pipeline::{ListPipeline, TitleLookup};

use super::errors::AppError;

/// Services that need a metadata resolver. Absent when no TMDB API key is
/// configured.
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub pipeline: ListPipeline,
    pub lookup: TitleLookup,
}

#[derive(Clone)]
pub struct AppState {
    enrichment: Option<Arc<Enrichment>>,
    cache_backend: &'static str,
    list_host: Arc<str>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("enrichment", &self.enrichment.is_some())
            .field("cache_backend", &self.cache_backend)
            .field("list_host", &self.list_host)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(list_host: impl Into<Arc<str>>, cache_backend: &'static str) -> Self {
        Self {
            enrichment: None,
            cache_backend,
            list_host: list_host.into(),
        }
    }

    pub fn with_enrichment(mut self, enrichment: Enrichment) -> Self {
        self.enrichment = Some(Arc::new(enrichment));
        self
    }

    /// The enrichment services, or a 500 when the server runs without a
    /// TMDB API key.
    pub fn enrichment(&self) -> Result<&Enrichment, AppError> {
        self.enrichment
            .as_deref()
            .ok_or_else(|| AppError::internal("TMDB API key not configured"))
    }

    pub fn cache_backend(&self) -> &'static str {
        self.cache_backend
    }

    pub fn list_host(&self) -> &str {
        &self.list_host
    }
}
