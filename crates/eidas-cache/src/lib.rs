//! # eidas-cache
//!
//! Cache abstraction for the eIDAS node.
//!
//! The node keeps shared state: pending authentication requests awaiting
//! their response, ids of accepted inbound requests, and resolved partner
//! metadata. All of it lives behind the [`Cache`] trait so a deployment can
//! choose between the single-process [`LocalCache`] and a distributed backing
//! (see `eidas-cache-redis`).
//!
//! ## Components
//!
//! - [`Cache`] - Typed key-value operations with per-entry TTL
//! - [`LocalCache`] - Bounded in-process backing
//! - [`CorrelationStore`] - Single-use request/response pairing
//! - [`ReplayGuard`] - Single acceptance of inbound message ids
//!
//! ## Example
//!
//! ```ignore
//! use eidas_cache::{Cache, ExpiryPolicy, LocalCache};
//! use std::time::Duration;
//!
//! let cache: LocalCache<String> = LocalCache::new(1_000, ExpiryPolicy::AfterWrite);
//! cache.put("_id1", "pending".to_string(), Duration::from_secs(60)).await?;
//! assert_eq!(cache.remove("_id1").await?, Some("pending".to_string()));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod correlation;
pub mod error;
pub mod local;
pub mod provider;
pub mod replay;

pub use correlation::{CorrelationError, CorrelationStore, StoredRequest};
pub use error::{CacheError, CacheResult};
pub use local::LocalCache;
pub use provider::{Cache, ExpiryPolicy};
pub use replay::ReplayGuard;
