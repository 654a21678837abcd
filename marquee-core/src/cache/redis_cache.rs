use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use super::CacheStore;
use crate::error::CacheError;
use crate::types::{NormalizedKey, ResolvedMovie};

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    namespace: String,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("connection", &"ConnectionManager")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl RedisCache {
    pub async fn connect(
        redis_url: &str,
        namespace: impl Into<String>,
    ) -> Result<Self, CacheError> {
        info!("Connecting to Redis cache at {}", redis_url);

        let client = redis::Client::open(redis_url).map_err(|e| {
            CacheError::Backend(format!("Failed to create Redis client: {e}"))
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::Backend(format!("Failed to connect to Redis: {e}"))
        })?;

        info!("Successfully connected to Redis cache");

        Ok(Self {
            conn,
            namespace: namespace.into(),
        })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(
        &self,
        key: &NormalizedKey,
    ) -> Result<Option<ResolvedMovie>, CacheError> {
        let full_key = key.cache_key(&self.namespace);
        debug!("Cache GET: {}", full_key);

        let mut conn = self.conn.clone();
        let data: Option<String> = conn.get(&full_key).await?;

        match data {
            Some(json) => {
                let movie = serde_json::from_str(&json)?;
                debug!("Cache HIT: {}", full_key);
                Ok(Some(movie))
            }
            None => {
                debug!("Cache MISS: {}", full_key);
                Ok(None)
            }
        }
    }

    async fn put(
        &self,
        key: &NormalizedKey,
        movie: &ResolvedMovie,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let full_key = key.cache_key(&self.namespace);
        debug!("Cache SET: {} (TTL: {:?})", full_key, ttl);

        let json = serde_json::to_string(movie)?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(full_key, json, ttl.as_secs().max(1))
            .await?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
