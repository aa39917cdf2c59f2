//! Partner metadata resolution.
//!
//! Resolving a metadata URL yields the partner's [`EidasMetadataParameters`].
//! Fresh cache hits are served directly; otherwise the document is fetched,
//! parsed with the hardened parser, signature-checked against the node's
//! metadata trust anchors and cached until the earlier of the configured TTL
//! and the document's `validUntil`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use eidas_core::config::MetadataConfig;
use eidas_core::{Event, EventListener, EventType};

use crate::cache::MetadataCache;
use crate::error::{MetadataError, MetadataResult};
use crate::loader::MetadataLoader;
use crate::parameters::EidasMetadataParameters;
use crate::parser::{find_entity, parse_entity};
use crate::policy::UrlPolicy;
use crate::signature::Signer;
use crate::xml;

/// Fetches, verifies and caches partner metadata.
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    policy: UrlPolicy,
    ttl: Duration,
    max_document_size: usize,
    loader: Arc<dyn MetadataLoader>,
    signer: Arc<dyn Signer>,
    cache: MetadataCache,
    listener: Arc<dyn EventListener>,
}

impl MetadataResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(
        config: &MetadataConfig,
        loader: Arc<dyn MetadataLoader>,
        signer: Arc<dyn Signer>,
        cache: MetadataCache,
        listener: Arc<dyn EventListener>,
    ) -> Self {
        Self {
            policy: UrlPolicy::from_config(config),
            ttl: Duration::from_secs(config.ttl_secs),
            max_document_size: config.max_document_size,
            loader,
            signer,
            cache,
            listener,
        }
    }

    /// Returns the metadata cache.
    #[must_use]
    pub const fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Resolves the metadata published at `url` as of `now`.
    ///
    /// The entity id of the partner is its metadata URL.
    ///
    /// # Errors
    ///
    /// Returns a [`MetadataError`] if the URL is refused, the document cannot
    /// be fetched, is malformed, is not trusted, does not describe the entity
    /// or has expired. Nothing is cached on failure.
    pub async fn resolve(
        &self,
        url: &str,
        now: DateTime<Utc>,
    ) -> MetadataResult<Arc<EidasMetadataParameters>> {
        match self.resolve_inner(url, now).await {
            Ok((params, fetched)) => {
                if fetched {
                    self.listener.on_event(
                        &Event::builder(EventType::MetadataResolved)
                            .issuer(url)
                            .detail("valid_until", describe(params.valid_until))
                            .build_at(now),
                    );
                }
                Ok(params)
            }
            Err(err) => {
                match &err {
                    MetadataError::Unavailable { .. } | MetadataError::Cache(_) => {
                        tracing::error!(url = %url, error = %err, "metadata resolution failed");
                    }
                    _ => tracing::warn!(url = %url, error = %err, "metadata rejected"),
                }
                self.listener.on_event(
                    &Event::builder(EventType::MetadataRejected)
                        .failure(err.to_string())
                        .issuer(url)
                        .build_at(now),
                );
                Err(err)
            }
        }
    }

    async fn resolve_inner(
        &self,
        url: &str,
        now: DateTime<Utc>,
    ) -> MetadataResult<(Arc<EidasMetadataParameters>, bool)> {
        self.policy.check(url)?;

        if let Some(cached) = self.cache.get(url).await? {
            if cached.is_valid_at(now) {
                tracing::trace!(url = %url, "metadata cache hit");
                return Ok((Arc::new(cached), false));
            }
            tracing::debug!(url = %url, "cached metadata no longer valid");
            self.cache.evict(url).await?;
        }

        let document = self
            .loader
            .fetch(url)
            .await
            .map_err(|e| MetadataError::Unavailable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let root = xml::parse(&document, self.max_document_size)?;
        let text = std::str::from_utf8(&document)
            .map_err(|_| MetadataError::MalformedMetadata("document is not UTF-8".into()))?;
        self.signer
            .verify(text, None)
            .map_err(MetadataError::SignatureInvalid)?;

        let (entity, inherited) = find_entity(&root, url)?
            .ok_or_else(|| MetadataError::NoMetadataForUrl(url.to_string()))?;
        let params = parse_entity(entity, inherited)?;

        let ttl = match params.valid_until {
            Some(valid_until) if valid_until <= now => {
                return Err(MetadataError::Expired {
                    url: url.to_string(),
                    valid_until,
                });
            }
            Some(valid_until) => (valid_until - now)
                .to_std()
                .map_or(self.ttl, |remaining| remaining.min(self.ttl)),
            None => self.ttl,
        };

        self.cache.put(url, params.clone(), ttl).await?;
        tracing::info!(
            url = %url,
            versions = ?params.protocol_versions,
            ttl_secs = ttl.as_secs(),
            "metadata resolved"
        );

        Ok((Arc::new(params), true))
    }
}

fn describe(instant: Option<DateTime<Utc>>) -> String {
    instant.map_or_else(|| "unbounded".to_string(), xml::format_instant)
}
