//! Resolved metadata cache.

use std::sync::Arc;
use std::time::Duration;

use eidas_cache::{Cache, CacheResult, ExpiryPolicy, LocalCache};

use crate::parameters::EidasMetadataParameters;

/// Cache of resolved partner metadata keyed by metadata URL.
///
/// Entries use access expiry so frequently used partners stay resident; the
/// resolver still checks `validUntil` on every hit.
#[derive(Clone)]
pub struct MetadataCache {
    inner: Arc<dyn Cache<EidasMetadataParameters>>,
}

impl MetadataCache {
    /// Wraps an existing backing.
    #[must_use]
    pub fn new(inner: Arc<dyn Cache<EidasMetadataParameters>>) -> Self {
        Self { inner }
    }

    /// Creates a cache over a fresh single-process backing.
    #[must_use]
    pub fn local(max_entries: u64) -> Self {
        Self::new(Arc::new(LocalCache::new(max_entries, ExpiryPolicy::AfterAccess)))
    }

    /// Returns the cached parameters for `url`.
    ///
    /// # Errors
    ///
    /// Propagates backing failures.
    pub async fn get(&self, url: &str) -> CacheResult<Option<EidasMetadataParameters>> {
        self.inner.get(url).await
    }

    /// Stores parameters for `url`.
    ///
    /// # Errors
    ///
    /// Propagates backing failures.
    pub async fn put(
        &self,
        url: &str,
        params: EidasMetadataParameters,
        ttl: Duration,
    ) -> CacheResult<()> {
        self.inner.put(url, params, ttl).await
    }

    /// Drops the entry for `url`.
    ///
    /// # Errors
    ///
    /// Propagates backing failures.
    pub async fn evict(&self, url: &str) -> CacheResult<Option<EidasMetadataParameters>> {
        self.inner.remove(url).await
    }

    /// Drops every entry.
    ///
    /// # Errors
    ///
    /// Propagates backing failures.
    pub async fn clear(&self) -> CacheResult<()> {
        self.inner.clear().await
    }
}

impl std::fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCache")
            .field("policy", &self.inner.expiry_policy())
            .finish()
    }
}
