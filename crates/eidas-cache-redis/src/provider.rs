//! Redis cache implementation.

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use eidas_cache::{Cache, CacheError, CacheResult, ExpiryPolicy};
use fred::prelude::*;
use fred::types::scan::Scanner;
use futures::TryStreamExt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::RedisConfig;
use crate::error::{from_redis_error, from_serde_error};

/// Opens a Redis client with automatic reconnection.
///
/// The client is cheap to clone and can back several [`RedisCache`]s.
///
/// ## Errors
///
/// Returns an error if the URL is invalid or the connection cannot be
/// established.
pub async fn connect(config: &RedisConfig) -> CacheResult<Client> {
    let redis_config = Config::from_url(&config.connection_url())
        .map_err(|e| CacheError::Configuration(e.to_string()))?;

    let client = Client::new(
        redis_config,
        None,
        None,
        Some(ReconnectPolicy::new_exponential(0, 1000, 30_000, 2)),
    );

    client.init().await.map_err(from_redis_error)?;
    tracing::info!(host = %config.host, port = config.port, "connected to redis");

    Ok(client)
}

/// Stored form of an entry; the TTL travels with the value so reads can
/// restart it under [`ExpiryPolicy::AfterAccess`].
#[derive(Serialize, Deserialize)]
struct Envelope<V> {
    value: V,
    ttl_secs: u64,
}

/// Redis-backed typed cache.
///
/// All keys live under `<prefix>:<namespace>:`, so several caches can share
/// one database.
pub struct RedisCache<V> {
    client: Client,
    namespace: String,
    policy: ExpiryPolicy,
    _value: PhantomData<fn() -> V>,
}

impl<V> RedisCache<V> {
    /// Creates a cache over an initialized client.
    pub fn new(client: Client, config: &RedisConfig, namespace: &str, policy: ExpiryPolicy) -> Self {
        Self {
            client,
            namespace: config.prefixed_key(namespace),
            policy,
            _value: PhantomData,
        }
    }

    /// Returns the underlying Redis client.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// Formats a key with the cache namespace.
    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Collects keys from a scan pattern.
    async fn scan_keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let mut scanner = self.client.scan(pattern, None, None);
        let mut keys = Vec::new();

        while let Some(result) = scanner.try_next().await.map_err(from_redis_error)? {
            if let Some(page) = result.results() {
                for value in page {
                    if let Some(s) = value.as_str() {
                        keys.push(s.to_string());
                    }
                }
            }
        }

        Ok(keys)
    }
}

impl<V> fmt::Debug for RedisCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("namespace", &self.namespace)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Safely convert seconds to i64 for Redis expiration.
#[allow(clippy::cast_possible_wrap)]
const fn seconds_to_i64(seconds: u64) -> i64 {
    seconds as i64
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn encode<V: Serialize>(value: V, ttl: Duration) -> CacheResult<String> {
    let envelope = Envelope {
        value,
        ttl_secs: ttl_secs(ttl),
    };
    serde_json::to_string(&envelope).map_err(from_serde_error)
}

fn decode<V: DeserializeOwned>(raw: &str) -> CacheResult<Envelope<V>> {
    serde_json::from_str(raw).map_err(from_serde_error)
}

#[async_trait]
impl<V> Cache<V> for RedisCache<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> CacheResult<Option<V>> {
        let key = self.key(key);
        let raw: Option<String> = self.client.get(&key).await.map_err(from_redis_error)?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        let envelope: Envelope<V> = decode(&raw)?;

        if self.policy == ExpiryPolicy::AfterAccess {
            let _: bool = self
                .client
                .expire(&key, seconds_to_i64(envelope.ttl_secs), None)
                .await
                .map_err(from_redis_error)?;
        }

        Ok(Some(envelope.value))
    }

    async fn put(&self, key: &str, value: V, ttl: Duration) -> CacheResult<()> {
        let key = self.key(key);
        let serialized = encode(value, ttl)?;

        self.client
            .set::<(), _, _>(
                &key,
                serialized,
                Some(Expiration::EX(seconds_to_i64(ttl_secs(ttl)))),
                None,
                false,
            )
            .await
            .map_err(from_redis_error)
    }

    async fn put_if_absent(&self, key: &str, value: V, ttl: Duration) -> CacheResult<bool> {
        let key = self.key(key);
        let serialized = encode(value, ttl)?;

        let result: Option<String> = self
            .client
            .set(
                &key,
                serialized,
                Some(Expiration::EX(seconds_to_i64(ttl_secs(ttl)))),
                Some(SetOptions::NX),
                false,
            )
            .await
            .map_err(from_redis_error)?;

        Ok(result.is_some())
    }

    async fn remove(&self, key: &str) -> CacheResult<Option<V>> {
        let key = self.key(key);
        let raw: Option<String> = self.client.getdel(&key).await.map_err(from_redis_error)?;

        match raw {
            Some(raw) => Ok(Some(decode::<V>(&raw)?.value)),
            None => Ok(None),
        }
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        let prefix = self.key("");
        let keys = self.scan_keys(&format!("{prefix}*")).await?;

        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    async fn clear(&self) -> CacheResult<()> {
        let keys = self.scan_keys(&format!("{}*", self.key(""))).await?;
        if keys.is_empty() {
            return Ok(());
        }

        tracing::debug!(namespace = %self.namespace, count = keys.len(), "clearing redis cache");
        self.client
            .del::<(), _>(keys)
            .await
            .map_err(from_redis_error)
    }

    fn expiry_policy(&self) -> ExpiryPolicy {
        self.policy
    }

    fn expires_server_side(&self) -> bool {
        true
    }
}
