//! Caching utilities for rysig

use crate::cipher::{ResolvedCipher, ScriptVersion};
use crate::error::RysigError;
use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// High-performance async cache using moka
pub type AsyncCache<K, V> = Cache<K, V>;

/// Create a new async cache with TTL and max capacity
pub fn new_async_cache_with_capacity<K, V>(ttl: Duration, max_capacity: u64) -> AsyncCache<K, V>
where
    K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .time_to_live(ttl)
        .max_capacity(max_capacity)
        .build()
}

/// Resolved ciphers keyed by script version
///
/// Values are shared read-only; an entry lives until its script version
/// expires or is explicitly invalidated.
#[derive(Clone)]
pub struct CipherCache {
    ciphers: AsyncCache<ScriptVersion, Arc<ResolvedCipher>>,
}

impl CipherCache {
    /// Default time to live (10 minutes)
    pub const DEFAULT_TTL: Duration = Duration::from_secs(600);
    /// Default number of script versions kept
    pub const DEFAULT_CAPACITY: u64 = 64;

    pub fn new() -> Self {
        Self::with_settings(Self::DEFAULT_TTL, Self::DEFAULT_CAPACITY)
    }

    pub fn with_settings(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            ciphers: new_async_cache_with_capacity(ttl, max_capacity),
        }
    }

    pub async fn get(&self, version: &ScriptVersion) -> Option<Arc<ResolvedCipher>> {
        self.ciphers.get(version).await
    }

    pub async fn insert(&self, cipher: Arc<ResolvedCipher>) {
        self.ciphers.insert(cipher.version().clone(), cipher).await;
    }

    pub async fn invalidate(&self, version: &ScriptVersion) {
        self.ciphers.invalidate(version).await;
    }

    pub fn clear(&self) {
        self.ciphers.invalidate_all();
    }

    /// Cached cipher for `version`, or the result of `resolve`
    ///
    /// Concurrent misses on one version wait for a single `resolve`. Errors
    /// are handed to every waiter and nothing is cached for them.
    pub async fn get_or_try_resolve<F>(
        &self,
        version: ScriptVersion,
        resolve: F,
    ) -> Result<Arc<ResolvedCipher>, RysigError>
    where
        F: Future<Output = Result<Arc<ResolvedCipher>, RysigError>>,
    {
        self.ciphers
            .try_get_with(version, resolve)
            .await
            .map_err(|shared| Arc::try_unwrap(shared).unwrap_or_else(RysigError::Shared))
    }
}

impl Default for CipherCache {
    fn default() -> Self {
        Self::new()
    }
}
