//! Listing cache: a narrow key-value layer in front of the full-listing query
//!
//! The cache stores opaque byte payloads under string keys. Two backends
//! implement the same contract: a pooled Redis client for deployments and an
//! in-memory map for tests and cache-less local runs. The backend is chosen
//! once at startup from configuration and injected into the application
//! state; nothing re-initializes it mid-process.

mod memory;
mod redis;

pub use memory::InMemoryCache;
pub use redis::RedisCache;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::CacheConfig;

/// Cache key holding the serialized full listing
pub const ALL_WEATHERS_KEY: &str = "all_weathers";

/// Errors reported by cache backends
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] bb8_redis::redis::RedisError),

    #[error("cache pool error: {0}")]
    Pool(String),
}

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Key-value contract shared by all cache backends.
///
/// Entries never expire on their own; invalidation is always an explicit
/// `delete`, and deleting an absent key succeeds as a no-op.
#[async_trait]
pub trait ListingCache: Send + Sync {
    /// Fetch the payload stored under `key`, if any.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store `payload` under `key`, replacing any previous value.
    async fn set(&self, key: &str, payload: &[u8]) -> CacheResult<()>;

    /// Remove the payload stored under `key`.
    async fn delete(&self, key: &str) -> CacheResult<()>;
}

/// Build the cache backend selected by configuration.
///
/// A Redis backend that cannot be reached at startup is kept anyway: the
/// handlers degrade to plain store reads while it is down.
pub async fn from_config(config: &CacheConfig) -> anyhow::Result<Arc<dyn ListingCache>> {
    match config.backend.as_str() {
        "memory" => {
            tracing::info!("Using in-memory listing cache");
            Ok(Arc::new(InMemoryCache::new()))
        }
        "redis" => {
            let cache = RedisCache::connect(&config.url).await?;
            match cache.ping().await {
                Ok(()) => tracing::info!("Connected to redis"),
                Err(err) => tracing::error!("Error connecting to redis: {}", err),
            }
            Ok(Arc::new(cache))
        }
        other => anyhow::bail!("unsupported cache backend: {}", other),
    }
}
