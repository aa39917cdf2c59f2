//! Cache provider trait.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CacheResult;

/// How an entry's remaining lifetime evolves after it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// The TTL runs from the last write; reads do not extend it.
    #[default]
    AfterWrite,
    /// Every read restarts the TTL.
    AfterAccess,
}

/// Typed key-value cache with per-entry TTL.
///
/// Implementations must be thread-safe and support concurrent access.
/// Operations on a single key are atomic: in particular [`Cache::remove`] and
/// [`Cache::put_if_absent`] never let two callers both observe success for
/// the same entry.
///
/// The trait is object safe so callers can hold an `Arc<dyn Cache<V>>` and
/// pick the backing at construction time.
#[async_trait]
pub trait Cache<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Gets a value from the cache.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get(&self, key: &str) -> CacheResult<Option<V>>;

    /// Stores a value, replacing any previous entry under the key.
    async fn put(&self, key: &str, value: V, ttl: Duration) -> CacheResult<()>;

    /// Stores a value only if the key is absent.
    ///
    /// Returns `true` if the value was stored, `false` if the key already
    /// held a live entry.
    async fn put_if_absent(&self, key: &str, value: V, ttl: Duration) -> CacheResult<bool>;

    /// Atomically removes an entry and returns its value.
    async fn remove(&self, key: &str) -> CacheResult<Option<V>>;

    /// Lists the keys currently held.
    ///
    /// The listing is a snapshot; entries may expire or be removed
    /// concurrently.
    async fn keys(&self) -> CacheResult<Vec<String>>;

    /// Removes every entry.
    async fn clear(&self) -> CacheResult<()>;

    /// Returns the expiry policy chosen at construction.
    fn expiry_policy(&self) -> ExpiryPolicy;

    /// Returns whether a shared server expires entries on its own.
    ///
    /// Callers skip client-side sweeps of such backings; listing their keys
    /// walks the whole server keyspace.
    fn expires_server_side(&self) -> bool {
        false
    }
}
