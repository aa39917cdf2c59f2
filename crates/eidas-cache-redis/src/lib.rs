//! # eidas-cache-redis
//!
//! Redis backing for the eIDAS node caches.
//!
//! [`RedisCache`] implements [`eidas_cache::Cache`] on top of the `fred`
//! client so several engine instances can share pending requests and
//! resolved metadata. Single-use semantics rely on Redis primitives:
//! `GETDEL` for removal and `SET NX` for insert-if-absent.
//!
//! ## Example
//!
//! ```ignore
//! use eidas_cache::ExpiryPolicy;
//! use eidas_cache_redis::{RedisCache, RedisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedisConfig::default().host("localhost").port(6379);
//!     let client = eidas_cache_redis::connect(&config).await?;
//!
//!     let pending: RedisCache<String> =
//!         RedisCache::new(client, &config, "correlation", ExpiryPolicy::AfterWrite);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod provider;

pub use config::RedisConfig;
pub use provider::{connect, RedisCache};
