use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::CacheStore;
use crate::error::CacheError;
use crate::types::{NormalizedKey, ResolvedMovie};

/// Expired entries are swept from the map once per this many writes.
const SWEEP_EVERY: usize = 256;

#[derive(Debug, Clone)]
struct Entry {
    movie: ResolvedMovie,
    expires_at: Instant,
}

/// Process-local cache used when no Redis is configured or reachable.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<NormalizedKey, Entry>,
    writes: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remaining lifetime of an entry, if present and unexpired.
    pub fn ttl_of(&self, key: &NormalizedKey) -> Option<Duration> {
        let entry = self.entries.get(key)?;
        entry.expires_at.checked_duration_since(Instant::now())
    }

    fn sweep_expired(&self, now: Instant) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            debug!(evicted, remaining = self.entries.len(), "Swept expired cache entries");
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(
        &self,
        key: &NormalizedKey,
    ) -> Result<Option<ResolvedMovie>, CacheError> {
        let now = Instant::now();
        let hit = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.movie.clone()),
            Some(_) => None,
            None => return Ok(None),
        };

        if hit.is_none() {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        Ok(hit)
    }

    async fn put(
        &self,
        key: &NormalizedKey,
        movie: &ResolvedMovie,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let now = Instant::now();
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            self.sweep_expired(now);
        }

        self.entries.insert(
            key.clone(),
            Entry {
                movie: movie.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
