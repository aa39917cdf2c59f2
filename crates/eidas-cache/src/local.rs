//! Single-process cache backing.
//!
//! Entries live in a bounded `moka` cache. Each entry carries its own TTL and
//! the [`ExpiryPolicy`] decides whether reads extend it.

use std::fmt;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::Expiry;

use crate::error::CacheResult;
use crate::provider::{Cache, ExpiryPolicy};

#[derive(Clone)]
struct Entry<V> {
    value: V,
    ttl: Duration,
}

struct PerEntryExpiry<V> {
    policy: ExpiryPolicy,
    _value: PhantomData<fn() -> V>,
}

impl<V> Expiry<String, Entry<V>> for PerEntryExpiry<V> {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_read(
        &self,
        _key: &String,
        value: &Entry<V>,
        _read_at: Instant,
        duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        match self.policy {
            ExpiryPolicy::AfterAccess => Some(value.ttl),
            ExpiryPolicy::AfterWrite => duration_until_expiry,
        }
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded in-process cache.
///
/// Suitable for a single engine instance. Several instances sharing
/// correlation state need a distributed backing instead.
pub struct LocalCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    inner: MokaCache<String, Entry<V>>,
    policy: ExpiryPolicy,
}

impl<V> LocalCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache holding at most `max_entries` entries.
    #[must_use]
    pub fn new(max_entries: u64, policy: ExpiryPolicy) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryExpiry {
                policy,
                _value: PhantomData,
            })
            .build();
        Self { inner, policy }
    }

    /// Returns the approximate number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl<V> fmt::Debug for LocalCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCache")
            .field("policy", &self.policy)
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[async_trait]
impl<V> Cache<V> for LocalCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> CacheResult<Option<V>> {
        Ok(self.inner.get(key).await.map(|entry| entry.value))
    }

    async fn put(&self, key: &str, value: V, ttl: Duration) -> CacheResult<()> {
        self.inner
            .insert(key.to_string(), Entry { value, ttl })
            .await;
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: V, ttl: Duration) -> CacheResult<bool> {
        let entry = self
            .inner
            .entry(key.to_string())
            .or_insert_with(async move { Entry { value, ttl } })
            .await;
        Ok(entry.is_fresh())
    }

    async fn remove(&self, key: &str) -> CacheResult<Option<V>> {
        Ok(self.inner.remove(key).await.map(|entry| entry.value))
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self
            .inner
            .iter()
            .map(|(key, _)| key.as_ref().clone())
            .collect())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
        Ok(())
    }

    fn expiry_policy(&self) -> ExpiryPolicy {
        self.policy
    }
}
