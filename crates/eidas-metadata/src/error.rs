//! Metadata resolution errors.

use chrono::{DateTime, Utc};
use eidas_cache::CacheError;
use eidas_core::ErrorKind;
use thiserror::Error;

use crate::signature::SignatureError;
use crate::xml::XmlError;

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Metadata resolution errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The URL is malformed or not allowed by the URL policy.
    #[error("metadata source not allowed: {0}")]
    InvalidSource(String),

    /// The document could not be fetched.
    #[error("metadata unavailable at {url}: {reason}")]
    Unavailable {
        /// Metadata URL.
        url: String,
        /// Loader failure.
        reason: String,
    },

    /// The document is not acceptable XML or not valid SAML metadata.
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    /// The document signature is missing or does not verify.
    #[error("metadata signature rejected: {0}")]
    SignatureInvalid(#[source] SignatureError),

    /// The document holds no entity for the URL.
    #[error("no entity descriptor for {0}")]
    NoMetadataForUrl(String),

    /// The document's validity period has ended.
    #[error("metadata for {url} expired at {valid_until}")]
    Expired {
        /// Metadata URL.
        url: String,
        /// End of validity.
        valid_until: DateTime<Utc>,
    },

    /// The metadata cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl MetadataError {
    /// Returns the failure class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSource(_)
            | Self::MalformedMetadata(_)
            | Self::SignatureInvalid(_)
            | Self::NoMetadataForUrl(_)
            | Self::Expired { .. } => ErrorKind::Trust,
            Self::Unavailable { .. } => ErrorKind::Transient,
            Self::Cache(err) => {
                if err.is_transient() {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Internal
                }
            }
        }
    }
}

impl From<XmlError> for MetadataError {
    fn from(err: XmlError) -> Self {
        Self::MalformedMetadata(err.to_string())
    }
}
