//! Engine configuration.
//!
//! Configuration is a plain serde structure with defaults. It can be built in
//! code, deserialized, or loaded from `EIDAS_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::version::ProtocolVersion;

/// Default limit on SAML message size, in bytes.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 131_072;

/// Default limit on metadata document size, in bytes.
pub const DEFAULT_MAX_METADATA_SIZE: usize = 1_048_576;

/// Signature algorithms offered by default, most preferred first.
pub const DEFAULT_SIGNATURE_ALGORITHMS: &[&str] = &[
    "http://www.w3.org/2007/05/xmldsig-more#sha512-rsa-MGF1",
    "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha512",
    "http://www.w3.org/2007/05/xmldsig-more#sha256-rsa-MGF1",
    "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256",
];

/// Longest accepted assertion lifetime, in seconds (one day).
pub const MAX_ASSERTION_VALIDITY_SECS: i64 = 86_400;

/// Default assertion encryption algorithm.
pub const DEFAULT_ENCRYPTION_ALGORITHM: &str = "http://www.w3.org/2009/xmlenc11#aes256-gcm";

/// Top-level configuration for a protocol engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum accepted size of an inbound SAML message, in bytes.
    pub max_message_size: usize,
    /// Message generation and validation settings.
    pub protocol: ProtocolConfig,
    /// Metadata fetching and caching settings.
    pub metadata: MetadataConfig,
    /// Request/response correlation settings.
    pub correlation: CorrelationConfig,
}

/// Message generation and validation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Metadata URL of this node, used as the issuer of generated responses.
    pub entity_id: String,
    /// Protocol versions this node speaks.
    pub supported_versions: Vec<ProtocolVersion>,
    /// Signature algorithm URIs in order of preference.
    pub signature_algorithms: Vec<String>,
    /// Algorithm URI used to encrypt assertions.
    pub encryption_algorithm: String,
    /// Encrypt assertions in generated responses.
    pub encrypt_assertions: bool,
    /// Refuse responses carrying a plain assertion.
    pub require_encrypted_assertions: bool,
    /// Compare the bearer confirmation address with the responder address.
    pub check_bearer_ip: bool,
    /// Lifetime of generated assertions, in seconds, at most
    /// [`MAX_ASSERTION_VALIDITY_SECS`].
    pub assertion_validity_secs: i64,
}

/// Metadata fetching and caching settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Upper bound on how long resolved metadata is cached, in seconds.
    pub ttl_secs: u64,
    /// Maximum number of partners held in the local cache.
    pub max_entries: u64,
    /// Only accept `https` metadata URLs.
    pub require_https: bool,
    /// When non-empty, only these metadata URLs are accepted.
    pub whitelist: Vec<String>,
    /// Maximum accepted size of a metadata document, in bytes.
    pub max_document_size: usize,
}

/// Request/response correlation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// How long an outgoing request waits for its response, in seconds.
    pub ttl_secs: u64,
    /// Maximum number of pending requests held in the local cache.
    pub max_entries: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            protocol: ProtocolConfig::default(),
            metadata: MetadataConfig::default(),
            correlation: CorrelationConfig::default(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            entity_id: String::new(),
            supported_versions: vec![ProtocolVersion::V1_2, ProtocolVersion::V1_1],
            signature_algorithms: DEFAULT_SIGNATURE_ALGORITHMS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            encryption_algorithm: DEFAULT_ENCRYPTION_ALGORITHM.to_string(),
            encrypt_assertions: true,
            require_encrypted_assertions: false,
            check_bearer_ip: true,
            assertion_validity_secs: 300,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 86_400,
            max_entries: 1_000,
            require_https: true,
            whitelist: Vec::new(),
            max_document_size: DEFAULT_MAX_METADATA_SIZE,
        }
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 1_800,
            max_entries: 100_000,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from `EIDAS_*` environment variables.
    ///
    /// A `.env` file is read first when present. Unset variables keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is set to an unparseable value
    /// or the resulting configuration is inconsistent.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        let config = Self {
            max_message_size: env_or("EIDAS_MAX_MESSAGE_SIZE", defaults.max_message_size)?,
            protocol: ProtocolConfig {
                entity_id: std::env::var("EIDAS_ENTITY_ID").unwrap_or(defaults.protocol.entity_id),
                supported_versions: match std::env::var("EIDAS_PROTOCOL_VERSIONS") {
                    Ok(raw) => parse_list(&raw)?,
                    Err(_) => defaults.protocol.supported_versions,
                },
                signature_algorithms: match std::env::var("EIDAS_SIGNATURE_ALGORITHMS") {
                    Ok(raw) => parse_list(&raw)?,
                    Err(_) => defaults.protocol.signature_algorithms,
                },
                encryption_algorithm: std::env::var("EIDAS_ENCRYPTION_ALGORITHM")
                    .unwrap_or(defaults.protocol.encryption_algorithm),
                encrypt_assertions: env_or(
                    "EIDAS_ENCRYPT_ASSERTIONS",
                    defaults.protocol.encrypt_assertions,
                )?,
                require_encrypted_assertions: env_or(
                    "EIDAS_REQUIRE_ENCRYPTED_ASSERTIONS",
                    defaults.protocol.require_encrypted_assertions,
                )?,
                check_bearer_ip: env_or("EIDAS_CHECK_BEARER_IP", defaults.protocol.check_bearer_ip)?,
                assertion_validity_secs: env_or(
                    "EIDAS_ASSERTION_VALIDITY_SECS",
                    defaults.protocol.assertion_validity_secs,
                )?,
            },
            metadata: MetadataConfig {
                ttl_secs: env_or("EIDAS_METADATA_TTL_SECS", defaults.metadata.ttl_secs)?,
                max_entries: env_or("EIDAS_METADATA_MAX_ENTRIES", defaults.metadata.max_entries)?,
                require_https: env_or(
                    "EIDAS_METADATA_REQUIRE_HTTPS",
                    defaults.metadata.require_https,
                )?,
                whitelist: match std::env::var("EIDAS_METADATA_WHITELIST") {
                    Ok(raw) => parse_list(&raw)?,
                    Err(_) => defaults.metadata.whitelist,
                },
                max_document_size: env_or(
                    "EIDAS_METADATA_MAX_SIZE",
                    defaults.metadata.max_document_size,
                )?,
            },
            correlation: CorrelationConfig {
                ttl_secs: env_or("EIDAS_CORRELATION_TTL_SECS", defaults.correlation.ttl_secs)?,
                max_entries: env_or(
                    "EIDAS_CORRELATION_MAX_ENTRIES",
                    defaults.correlation.max_entries,
                )?,
            },
        };

        config.validate()?;
        tracing::debug!(
            max_message_size = config.max_message_size,
            metadata_ttl_secs = config.metadata.ttl_secs,
            correlation_ttl_secs = config.correlation.ttl_secs,
            "loaded engine configuration"
        );
        Ok(config)
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.max_message_size == 0 {
            return Err(Error::Config("max_message_size must be positive".into()));
        }
        if self.protocol.supported_versions.is_empty() {
            return Err(Error::Config("at least one protocol version is required".into()));
        }
        if self.protocol.signature_algorithms.is_empty() {
            return Err(Error::Config("at least one signature algorithm is required".into()));
        }
        let validity = self.protocol.assertion_validity_secs;
        if validity <= 0 {
            return Err(Error::Config("assertion_validity_secs must be positive".into()));
        }
        if validity > MAX_ASSERTION_VALIDITY_SECS {
            return Err(Error::Config(format!(
                "assertion_validity_secs must not exceed {MAX_ASSERTION_VALIDITY_SECS}, got {validity}"
            )));
        }
        if self.metadata.ttl_secs == 0 || self.correlation.ttl_secs == 0 {
            return Err(Error::Config("cache TTLs must be positive".into()));
        }
        Ok(())
    }

    /// Sets the maximum inbound message size.
    #[must_use]
    pub const fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    /// Sets the metadata URL of this node.
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.protocol.entity_id = entity_id.into();
        self
    }

    /// Sets the supported protocol versions.
    #[must_use]
    pub fn with_protocol_versions(mut self, versions: Vec<ProtocolVersion>) -> Self {
        self.protocol.supported_versions = versions;
        self
    }

    /// Enables or disables the bearer address check.
    #[must_use]
    pub const fn with_check_bearer_ip(mut self, check: bool) -> Self {
        self.protocol.check_bearer_ip = check;
        self
    }

    /// Enables or disables encryption of generated assertions.
    #[must_use]
    pub const fn with_encrypt_assertions(mut self, encrypt: bool) -> Self {
        self.protocol.encrypt_assertions = encrypt;
        self
    }

    /// Requires inbound assertions to be encrypted.
    #[must_use]
    pub const fn with_require_encrypted_assertions(mut self, require: bool) -> Self {
        self.protocol.require_encrypted_assertions = require;
        self
    }

    /// Sets whether metadata URLs must use `https`.
    #[must_use]
    pub const fn with_metadata_require_https(mut self, require: bool) -> Self {
        self.metadata.require_https = require;
        self
    }

    /// Sets the metadata URL whitelist.
    #[must_use]
    pub fn with_metadata_whitelist(mut self, urls: Vec<String>) -> Self {
        self.metadata.whitelist = urls;
        self
    }

    /// Sets the correlation TTL in seconds.
    #[must_use]
    pub const fn with_correlation_ttl_secs(mut self, secs: u64) -> Self {
        self.correlation.ttl_secs = secs;
        self
    }

    /// Returns the metadata cache TTL.
    #[must_use]
    pub const fn metadata_ttl(&self) -> Duration {
        Duration::from_secs(self.metadata.ttl_secs)
    }

    /// Returns the correlation TTL.
    #[must_use]
    pub const fn correlation_ttl(&self) -> Duration {
        Duration::from_secs(self.correlation.ttl_secs)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw:?}"))),
        Err(_) => Ok(default),
    }
}

fn parse_list<T: FromStr>(raw: &str) -> Result<Vec<T>> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse()
                .map_err(|_| Error::Config(format!("invalid list item: {item:?}")))
        })
        .collect()
}
