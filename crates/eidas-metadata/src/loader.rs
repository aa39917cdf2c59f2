//! Metadata retrieval.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

/// Metadata retrieval errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoaderError {
    /// Nothing is published at the URL.
    #[error("no metadata published at {0}")]
    NotFound(String),

    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Fetches raw metadata documents.
///
/// Transport (HTTP client, TLS, proxies, retries) belongs to the
/// implementation.
#[async_trait]
pub trait MetadataLoader: Send + Sync + fmt::Debug {
    /// Returns the document published at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, LoaderError>;
}

/// Loader serving documents from memory.
///
/// Used for static metadata repositories and in tests.
#[derive(Debug, Default)]
pub struct StaticMetadataLoader {
    documents: RwLock<HashMap<String, Vec<u8>>>,
    fetches: AtomicUsize,
}

impl StaticMetadataLoader {
    /// Creates an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document.
    #[must_use]
    pub fn with_document(self, url: impl Into<String>, document: impl Into<Vec<u8>>) -> Self {
        self.insert(url, document);
        self
    }

    /// Publishes (or replaces) the document at `url`.
    pub fn insert(&self, url: impl Into<String>, document: impl Into<Vec<u8>>) {
        self.documents.write().insert(url.into(), document.into());
    }

    /// Withdraws the document at `url`.
    pub fn remove(&self, url: &str) {
        self.documents.write().remove(url);
    }

    /// Returns how many times [`MetadataLoader::fetch`] was called.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataLoader for StaticMetadataLoader {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, LoaderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.documents
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| LoaderError::NotFound(url.to_string()))
    }
}
