//! Key/value store for resolved movies with per-entry expiry.
//!
//! Callers treat every failure as non-fatal: a failed read is a miss, a
//! failed write is skipped.

mod memory;
mod redis_cache;

pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CacheError;
use crate::types::{NormalizedKey, ResolvedMovie};

/// Expiry applied to resolved movies on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub ttl: Duration,
    /// Shorter lifetime for `error` results so they are retried sooner.
    pub error_ttl: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            error_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl TtlPolicy {
    pub fn ttl_for(&self, movie: &ResolvedMovie) -> Duration {
        if movie.status.is_transient() {
            self.error_ttl
        } else {
            self.ttl
        }
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(
        &self,
        key: &NormalizedKey,
    ) -> Result<Option<ResolvedMovie>, CacheError>;

    async fn put(
        &self,
        key: &NormalizedKey,
        movie: &ResolvedMovie,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Short backend label for health output and logs.
    fn backend_name(&self) -> &'static str;
}
