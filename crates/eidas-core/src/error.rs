//! Error handling for the eIDAS node.
//!
//! Every protocol failure carries a detailed reason for the audit log and an
//! [`ErrorKind`] that decides how it is reported to the peer. Peers only ever
//! see the coarse message of the kind, never the detailed reason.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using the core error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while assembling the node's shared infrastructure.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal error.
    #[error("internal error")]
    Internal,
}

impl Error {
    /// Returns the failure class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Profile,
            Self::Config(_) | Self::Internal => ErrorKind::Internal,
        }
    }
}

/// Classification of a protocol failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// The message violates the eIDAS profile (missing field, bad value).
    Profile,
    /// Signature, certificate, audience or metadata trust failure.
    Trust,
    /// Unknown, expired or already consumed correlation.
    Replay,
    /// A collaborator was unavailable; the caller may try again later.
    Transient,
    /// Bug or misconfiguration on this side.
    Internal,
}

/// SAML 2.0 top-level status code for requester-side failures.
pub const STATUS_REQUESTER: &str = "urn:oasis:names:tc:SAML:2.0:status:Requester";

/// SAML 2.0 top-level status code for responder-side failures.
pub const STATUS_RESPONDER: &str = "urn:oasis:names:tc:SAML:2.0:status:Responder";

impl ErrorKind {
    /// Message safe to hand to an untrusted peer.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::Profile => "message does not conform to the eIDAS profile",
            Self::Trust => "message could not be trusted",
            Self::Replay => "message is unknown or was already processed",
            Self::Transient => "service temporarily unavailable",
            Self::Internal => "internal error",
        }
    }

    /// SAML top-level status code reported for this kind of failure.
    #[must_use]
    pub const fn status_code(&self) -> &'static str {
        match self {
            Self::Profile | Self::Trust | Self::Replay => STATUS_REQUESTER,
            Self::Transient | Self::Internal => STATUS_RESPONDER,
        }
    }

    /// Returns whether failures of this kind are security relevant.
    #[must_use]
    pub const fn is_security_relevant(&self) -> bool {
        matches!(self, Self::Trust | Self::Replay)
    }

    /// Returns whether this failure should be logged at error level.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Transient | Self::Internal)
    }
}
