//! SAML status.

use serde::{Deserialize, Serialize};

use crate::constants::status_codes;

/// Top-level SAML status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    /// The request succeeded.
    Success,
    /// The request could not be performed due to an error on the requester side.
    Requester,
    /// The request could not be performed due to an error on the responder side.
    Responder,
    /// The SAML version of the request was not supported.
    VersionMismatch,
}

impl StatusCode {
    /// Returns the URI for this status code.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Success => status_codes::SUCCESS,
            Self::Requester => status_codes::REQUESTER,
            Self::Responder => status_codes::RESPONDER,
            Self::VersionMismatch => status_codes::VERSION_MISMATCH,
        }
    }

    /// Parses a top-level status code from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            status_codes::SUCCESS => Some(Self::Success),
            status_codes::REQUESTER => Some(Self::Requester),
            status_codes::RESPONDER => Some(Self::Responder),
            status_codes::VERSION_MISMATCH => Some(Self::VersionMismatch),
            _ => None,
        }
    }
}

/// SAML protocol status of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Top-level code.
    pub code: StatusCode,

    /// Optional second-level code URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_code: Option<String>,

    /// Optional status message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Status {
    /// Creates a success status.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            code: StatusCode::Success,
            sub_code: None,
            message: None,
        }
    }

    /// Creates a requester error status.
    #[must_use]
    pub fn requester_error(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Requester,
            sub_code: None,
            message: Some(message.into()),
        }
    }

    /// Creates a responder error status.
    #[must_use]
    pub fn responder_error(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Responder,
            sub_code: None,
            message: Some(message.into()),
        }
    }

    /// Creates an authentication failed status.
    #[must_use]
    pub fn authn_failed(message: impl Into<String>) -> Self {
        Self::requester_error(message).with_sub_code(status_codes::AUTHN_FAILED)
    }

    /// Sets the second-level code.
    #[must_use]
    pub fn with_sub_code(mut self, sub_code: impl Into<String>) -> Self {
        self.sub_code = Some(sub_code.into());
        self
    }

    /// Returns true if this status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == StatusCode::Success
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::success()
    }
}
