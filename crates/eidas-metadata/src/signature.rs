//! XML signature algorithms and the signing seam.
//!
//! Canonicalization and the signature primitives are provided by the
//! deployment through the [`Signer`] trait. This module fixes the algorithm
//! vocabulary used by metadata whitelists and message generation.

use std::fmt;

use thiserror::Error;

use crate::certificate::Certificate;

/// Signature algorithm URIs.
pub mod signature_algorithms {
    /// RSASSA-PSS with SHA-256.
    pub const RSA_SHA256_MGF1: &str = "http://www.w3.org/2007/05/xmldsig-more#sha256-rsa-MGF1";

    /// RSASSA-PSS with SHA-384.
    pub const RSA_SHA384_MGF1: &str = "http://www.w3.org/2007/05/xmldsig-more#sha384-rsa-MGF1";

    /// RSASSA-PSS with SHA-512.
    pub const RSA_SHA512_MGF1: &str = "http://www.w3.org/2007/05/xmldsig-more#sha512-rsa-MGF1";

    /// ECDSA with SHA-256.
    pub const ECDSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256";

    /// ECDSA with SHA-384.
    pub const ECDSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha384";

    /// ECDSA with SHA-512.
    pub const ECDSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha512";
}

/// Digest algorithm URIs.
pub mod digest_algorithms {
    /// SHA-256.
    pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

    /// SHA-384.
    pub const SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";

    /// SHA-512.
    pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";
}

/// Signature algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// RSASSA-PSS with SHA-256.
    RsaSha256Mgf1,
    /// RSASSA-PSS with SHA-384.
    RsaSha384Mgf1,
    /// RSASSA-PSS with SHA-512.
    RsaSha512Mgf1,
    /// ECDSA with SHA-256.
    EcdsaSha256,
    /// ECDSA with SHA-384.
    EcdsaSha384,
    /// ECDSA with SHA-512.
    EcdsaSha512,
}

impl SignatureAlgorithm {
    /// Returns the URI for this signature algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha256Mgf1 => signature_algorithms::RSA_SHA256_MGF1,
            Self::RsaSha384Mgf1 => signature_algorithms::RSA_SHA384_MGF1,
            Self::RsaSha512Mgf1 => signature_algorithms::RSA_SHA512_MGF1,
            Self::EcdsaSha256 => signature_algorithms::ECDSA_SHA256,
            Self::EcdsaSha384 => signature_algorithms::ECDSA_SHA384,
            Self::EcdsaSha512 => signature_algorithms::ECDSA_SHA512,
        }
    }

    /// Returns the corresponding digest algorithm URI.
    #[must_use]
    pub const fn digest_uri(&self) -> &'static str {
        match self {
            Self::RsaSha256Mgf1 | Self::EcdsaSha256 => digest_algorithms::SHA256,
            Self::RsaSha384Mgf1 | Self::EcdsaSha384 => digest_algorithms::SHA384,
            Self::RsaSha512Mgf1 | Self::EcdsaSha512 => digest_algorithms::SHA512,
        }
    }

    /// Parses a signature algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri.trim() {
            signature_algorithms::RSA_SHA256_MGF1 => Some(Self::RsaSha256Mgf1),
            signature_algorithms::RSA_SHA384_MGF1 => Some(Self::RsaSha384Mgf1),
            signature_algorithms::RSA_SHA512_MGF1 => Some(Self::RsaSha512Mgf1),
            signature_algorithms::ECDSA_SHA256 => Some(Self::EcdsaSha256),
            signature_algorithms::ECDSA_SHA384 => Some(Self::EcdsaSha384),
            signature_algorithms::ECDSA_SHA512 => Some(Self::EcdsaSha512),
            _ => None,
        }
    }

    /// Returns true if this algorithm uses RSA.
    #[must_use]
    pub const fn is_rsa(&self) -> bool {
        matches!(
            self,
            Self::RsaSha256Mgf1 | Self::RsaSha384Mgf1 | Self::RsaSha512Mgf1
        )
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

/// Signature creation and verification errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The document carries no signature.
    #[error("document is not signed")]
    Missing,

    /// The signature does not verify.
    #[error("invalid signature: {0}")]
    Invalid(String),

    /// The signing certificate is not among the trusted ones.
    #[error("signing certificate is not trusted")]
    UntrustedCertificate,

    /// The algorithm is not supported or not allowed.
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The document could not be signed.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// XML signature seam.
///
/// Implementations own canonicalization, key material and trust anchors.
pub trait Signer: Send + Sync + fmt::Debug {
    /// Signs the element whose `ID` is `reference_id` and returns the signed
    /// document.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Signing`] or
    /// [`SignatureError::UnsupportedAlgorithm`] when signing fails.
    fn sign(
        &self,
        xml: &str,
        reference_id: &str,
        algorithm: SignatureAlgorithm,
    ) -> Result<String, SignatureError>;

    /// Verifies the enveloped signature of `xml`.
    ///
    /// With `Some(certificates)`, the signer must be one of them. With
    /// `None`, the implementation's own trust anchors apply (used for
    /// metadata).
    ///
    /// # Errors
    ///
    /// Returns a [`SignatureError`] describing why the document is not
    /// trusted.
    fn verify(&self, xml: &str, certificates: Option<&[Certificate]>)
        -> Result<(), SignatureError>;
}
