//! Single-acceptance guard for inbound message ids.
//!
//! A Proxy-Service records the id of every authentication request it accepts.
//! The same id presented again within the retention period is a replay.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::CacheResult;
use crate::local::LocalCache;
use crate::provider::{Cache, ExpiryPolicy};

/// Remembers accepted message ids for a fixed period.
pub struct ReplayGuard {
    cache: Arc<dyn Cache<()>>,
    ttl: Duration,
}

impl ReplayGuard {
    /// Creates a guard over an existing backing.
    #[must_use]
    pub fn new(cache: Arc<dyn Cache<()>>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Creates a guard over a fresh single-process backing.
    #[must_use]
    pub fn local(max_entries: u64, ttl: Duration) -> Self {
        Self::new(
            Arc::new(LocalCache::new(max_entries, ExpiryPolicy::AfterWrite)),
            ttl,
        )
    }

    /// Returns how long an id is remembered.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Records `id` and returns `true` if it was not seen before.
    ///
    /// Of several concurrent callers for one id, at most one gets `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing cache fails.
    pub async fn first_use(&self, id: &str) -> CacheResult<bool> {
        let fresh = self.cache.put_if_absent(id, (), self.ttl).await?;
        if !fresh {
            tracing::warn!(message_id = %id, "message id presented again");
        }
        Ok(fresh)
    }
}

impl fmt::Debug for ReplayGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayGuard")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
