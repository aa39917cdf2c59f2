//! Signed outbound message.

use eidas_core::ProtocolVersion;
use eidas_metadata::SignatureAlgorithm;

/// A signed SAML message ready for the transport binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    /// Message identifier.
    pub id: String,
    /// Serialized, signed document.
    pub bytes: Vec<u8>,
    /// Protocol version negotiated with the partner, if any.
    pub protocol_version: Option<ProtocolVersion>,
    /// Algorithm the message was signed with.
    pub signature_algorithm: SignatureAlgorithm,
}

impl SignedMessage {
    /// Returns the document as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes).unwrap_or_default()
    }
}
