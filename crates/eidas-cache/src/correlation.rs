//! Request/response correlation.
//!
//! Every authentication request sent to a partner is recorded under its
//! message id. The matching response must name that id in `InResponseTo`;
//! taking the entry consumes it, so a response can be accepted at most once.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use eidas_core::TimeSource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CacheError;
use crate::local::LocalCache;
use crate::provider::{Cache, ExpiryPolicy};

/// A pending request awaiting its response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRequest<R> {
    /// Issuer of the request (this node).
    pub issuer: String,
    /// Metadata URL of the partner the request was sent to.
    pub destination: String,
    /// When the request was stored.
    pub created_at: DateTime<Utc>,
    /// The request as sent.
    pub request: R,
}

impl<R> StoredRequest<R> {
    /// Creates a stored request.
    pub fn new(
        issuer: impl Into<String>,
        destination: impl Into<String>,
        created_at: DateTime<Utc>,
        request: R,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            destination: destination.into(),
            created_at,
            request,
        }
    }

    /// Returns whether the entry outlived `ttl` at `now`.
    #[must_use]
    pub fn is_expired(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.created_at + ttl < now
    }
}

/// Correlation store errors.
#[derive(Debug, Error)]
pub enum CorrelationError {
    /// An entry already exists under this id.
    #[error("a pending request already exists with id {0}")]
    DuplicateId(String),

    /// No live entry under this id: never stored, expired or already taken.
    #[error("no pending request with id {0}")]
    NotFound(String),

    /// The backing cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Single-use store of pending requests.
///
/// Entries older than the TTL, as measured by the injected [`TimeSource`],
/// are treated as absent even if the backing has not evicted them yet.
pub struct CorrelationStore<R>
where
    R: Clone + Send + Sync + 'static,
{
    cache: Arc<dyn Cache<StoredRequest<R>>>,
    ttl: Duration,
    clock: Arc<dyn TimeSource>,
}

impl<R> CorrelationStore<R>
where
    R: Clone + Send + Sync + 'static,
{
    /// Creates a store over an existing backing.
    #[must_use]
    pub fn new(
        cache: Arc<dyn Cache<StoredRequest<R>>>,
        ttl: Duration,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self { cache, ttl, clock }
    }

    /// Creates a store over a fresh single-process backing.
    #[must_use]
    pub fn local(max_entries: u64, ttl: Duration, clock: Arc<dyn TimeSource>) -> Self {
        let cache: Arc<dyn Cache<StoredRequest<R>>> =
            Arc::new(LocalCache::new(max_entries, ExpiryPolicy::AfterWrite));
        Self::new(cache, ttl, clock)
    }

    /// Returns the retention period of pending requests.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn chrono_ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::days(36_500))
    }

    /// Records a pending request.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationError::DuplicateId`] if a request is already
    /// pending under `id`.
    pub async fn put(&self, id: &str, request: StoredRequest<R>) -> Result<(), CorrelationError> {
        let inserted = self.cache.put_if_absent(id, request, self.ttl).await?;
        if inserted {
            tracing::debug!(request_id = %id, "stored pending request");
            Ok(())
        } else {
            tracing::warn!(request_id = %id, "pending request id collision");
            Err(CorrelationError::DuplicateId(id.to_string()))
        }
    }

    /// Removes and returns the pending request stored under `id`.
    ///
    /// Of several concurrent callers for one id, at most one succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationError::NotFound`] if nothing live is stored under
    /// `id`.
    pub async fn take_once(&self, id: &str) -> Result<StoredRequest<R>, CorrelationError> {
        let Some(stored) = self.cache.remove(id).await? else {
            tracing::debug!(request_id = %id, "no pending request");
            return Err(CorrelationError::NotFound(id.to_string()));
        };

        if stored.is_expired(self.chrono_ttl(), self.clock.now()) {
            tracing::debug!(request_id = %id, created_at = %stored.created_at, "pending request expired");
            return Err(CorrelationError::NotFound(id.to_string()));
        }

        Ok(stored)
    }

    /// Removes every entry that expired before `now`.
    ///
    /// Returns the number of entries removed. Backings that expire entries
    /// server-side are left alone and report zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing cache fails.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, CorrelationError> {
        if self.cache.expires_server_side() {
            return Ok(0);
        }

        let ttl = self.chrono_ttl();
        let mut removed = 0;

        for key in self.cache.keys().await? {
            let expired = matches!(
                self.cache.get(&key).await?,
                Some(stored) if stored.is_expired(ttl, now)
            );
            if expired && self.cache.remove(&key).await?.is_some() {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::debug!(removed, "swept expired pending requests");
        }
        Ok(removed)
    }
}

impl<R> fmt::Debug for CorrelationStore<R>
where
    R: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationStore")
            .field("ttl", &self.ttl)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
