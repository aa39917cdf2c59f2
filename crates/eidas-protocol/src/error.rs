//! Protocol engine errors.
//!
//! Every error carries the detailed reason in its `Display` output for the
//! audit log. Peers only ever see [`ProtocolError::public_message`].

use eidas_cache::{CacheError, CorrelationError};
use eidas_core::{ErrorKind, ProtocolVersion};
use eidas_metadata::{MetadataError, SignatureError, XmlError};
use thiserror::Error;

use crate::attribute::AttributeError;
use crate::cipher::CipherError;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Protocol engine errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The message exceeds the size limit.
    #[error("message of {size} bytes exceeds the {limit} byte limit")]
    MessageTooLarge {
        /// Size of the message.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The message is not acceptable XML.
    #[error("malformed message: {0}")]
    Malformed(#[source] XmlError),

    /// The message violates a profile rule.
    #[error("profile violation: {0}")]
    Validation(String),

    /// The partners share no protocol version.
    #[error("no common protocol version (local {local:?}, partner {remote:?})")]
    IncompatibleProtocolVersion {
        /// Versions supported locally.
        local: Vec<ProtocolVersion>,
        /// Versions advertised by the partner.
        remote: Vec<ProtocolVersion>,
    },

    /// The partner whitelists none of the local signature algorithms.
    #[error("no signature algorithm acceptable to {0}")]
    NoCommonSignatureAlgorithm(String),

    /// Partner metadata could not be resolved.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// The message signature is missing or does not verify.
    #[error("signature rejected: {0}")]
    SignatureInvalid(#[source] SignatureError),

    /// The message could not be signed.
    #[error("signing failed: {0}")]
    Signing(#[source] SignatureError),

    /// The assertion could not be decrypted.
    #[error("assertion decryption failed: {0}")]
    Decryption(#[source] CipherError),

    /// The assertion could not be encrypted.
    #[error("assertion encryption failed: {0}")]
    Encryption(#[source] CipherError),

    /// A plain assertion was received while encryption is required.
    #[error("unencrypted assertion refused")]
    UnencryptedAssertion,

    /// The assertion is outside its validity window.
    #[error("assertion not valid at {now}: {reason}")]
    AssertionTime {
        /// Evaluation instant.
        now: String,
        /// Which bound was violated.
        reason: String,
    },

    /// The audience restriction does not name this node.
    #[error("audience mismatch: expected {expected}, got {actual}")]
    AudienceMismatch {
        /// Expected audience.
        expected: String,
        /// Audience in the assertion.
        actual: String,
    },

    /// The bearer confirmation address differs from the responder address.
    #[error("bearer address mismatch: expected {expected}, got {actual}")]
    BearerIpMismatch {
        /// Address of the responder.
        expected: String,
        /// Address in the assertion.
        actual: String,
    },

    /// The response comes from another entity than the one asked.
    #[error("issuer mismatch: expected {expected}, got {actual}")]
    IssuerMismatch {
        /// Entity the request was sent to.
        expected: String,
        /// Issuer of the response.
        actual: String,
    },

    /// An attribute could not be resolved or converted.
    #[error(transparent)]
    Attribute(#[from] AttributeError),

    /// A request with this identifier is already pending.
    #[error("request id {0} is already in use")]
    IdCollision(String),

    /// The response answers no pending request, or one already answered.
    #[error("response to unknown or already answered request {0}")]
    UnknownOrReplayedResponse(String),

    /// A request with this identifier was already accepted.
    #[error("request {0} was already accepted")]
    ReplayedRequest(String),

    /// The correlation store failed.
    #[error("correlation store failure: {0}")]
    Correlation(#[source] CacheError),
}

impl ProtocolError {
    /// Returns the failure class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MessageTooLarge { .. }
            | Self::Malformed(_)
            | Self::Validation(_)
            | Self::IncompatibleProtocolVersion { .. }
            | Self::NoCommonSignatureAlgorithm(_)
            | Self::Attribute(_) => ErrorKind::Profile,
            Self::SignatureInvalid(_)
            | Self::Decryption(_)
            | Self::UnencryptedAssertion
            | Self::AssertionTime { .. }
            | Self::AudienceMismatch { .. }
            | Self::BearerIpMismatch { .. }
            | Self::IssuerMismatch { .. } => ErrorKind::Trust,
            Self::IdCollision(_)
            | Self::UnknownOrReplayedResponse(_)
            | Self::ReplayedRequest(_) => ErrorKind::Replay,
            Self::Metadata(err) => err.kind(),
            Self::Correlation(err) => {
                if err.is_transient() {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Internal
                }
            }
            Self::Signing(_) | Self::Encryption(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to hand to an untrusted peer.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        self.kind().public_message()
    }

    /// SAML top-level status code reported for this error.
    #[must_use]
    pub fn status_code(&self) -> &'static str {
        self.kind().status_code()
    }

    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}

impl From<XmlError> for ProtocolError {
    fn from(err: XmlError) -> Self {
        match err {
            XmlError::TooLarge { size, limit } => Self::MessageTooLarge { size, limit },
            other => Self::Malformed(other),
        }
    }
}

impl From<CorrelationError> for ProtocolError {
    fn from(err: CorrelationError) -> Self {
        match err {
            CorrelationError::DuplicateId(id) => Self::IdCollision(id),
            CorrelationError::NotFound(id) => Self::UnknownOrReplayedResponse(id),
            CorrelationError::Cache(err) => Self::Correlation(err),
        }
    }
}
