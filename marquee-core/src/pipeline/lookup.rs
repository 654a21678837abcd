use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::cache::{CacheStore, TtlPolicy};
use crate::error::LookupError;
use crate::providers::{MetadataResolver, TitleQuery};
use crate::types::{NormalizedKey, ResolvedMovie};

#[derive(Debug, Clone)]
pub struct LookupSettings {
    pub deadline: Duration,
    pub ttl: TtlPolicy,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(30),
            ttl: TtlPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    pub movie: ResolvedMovie,
    pub cached: bool,
}

/// Resolves a single title outside of a list run, sharing the run's cache.
#[derive(Clone)]
pub struct TitleLookup {
    resolver: Arc<dyn MetadataResolver>,
    cache: Arc<dyn CacheStore>,
    settings: LookupSettings,
}

impl fmt::Debug for TitleLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TitleLookup")
            .field("cache", &self.cache.backend_name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TitleLookup {
    pub fn new(
        resolver: Arc<dyn MetadataResolver>,
        cache: Arc<dyn CacheStore>,
        settings: LookupSettings,
    ) -> Self {
        Self {
            resolver,
            cache,
            settings,
        }
    }

    /// Cache, then resolver, all under the lookup deadline. A year, when
    /// given, is appended as `Title (YYYY)`, the form list extractors emit,
    /// so lookups and list runs share cache entries.
    pub async fn lookup(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Result<LookupResult, LookupError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(LookupError::InvalidTitle);
        }

        let query = match year {
            Some(year) if TitleQuery::parse(title).year.is_none() => {
                format!("{title} ({year})")
            }
            _ => title.to_string(),
        };
        let key = NormalizedKey::from_title(&query);

        timeout(self.settings.deadline, self.lookup_keyed(&query, &key))
            .await
            .map_err(|_| {
                warn!("Lookup for {:?} exceeded {:?}", query, self.settings.deadline);
                LookupError::Timeout(self.settings.deadline)
            })
    }

    async fn lookup_keyed(&self, query: &str, key: &NormalizedKey) -> LookupResult {
        match self.cache.get(key).await {
            Ok(Some(movie)) => {
                debug!(key = key.short(), "Lookup cache hit for {:?}", query);
                return LookupResult {
                    movie,
                    cached: true,
                };
            }
            Ok(None) => {}
            Err(e) => warn!("Cache read failed for {:?}: {}", query, e),
        }

        let movie = self.resolver.resolve(query).await;
        if let Err(e) = self
            .cache
            .put(key, &movie, self.settings.ttl.ttl_for(&movie))
            .await
        {
            warn!("Cache write failed for {:?}: {}", query, e);
        }

        LookupResult {
            movie,
            cached: false,
        }
    }
}
