//! Assertion encryption seam.

use std::fmt;

use eidas_metadata::Certificate;
use thiserror::Error;

/// Encryption and decryption errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    /// The assertion could not be encrypted.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// The encrypted assertion could not be decrypted.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The algorithm is not supported.
    #[error("unsupported encryption algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// XML encryption of assertions.
///
/// Implementations hold the node's private key material; the engine only
/// passes documents through.
pub trait Cipher: Send + Sync + fmt::Debug {
    /// Encrypts `assertion_xml` for the holder of `certificate` and returns an
    /// `EncryptedAssertion` element.
    ///
    /// # Errors
    ///
    /// Returns a [`CipherError`] if encryption fails.
    fn encrypt(
        &self,
        assertion_xml: &str,
        certificate: &Certificate,
        algorithm: &str,
    ) -> Result<String, CipherError>;

    /// Decrypts an `EncryptedAssertion` element and returns the `Assertion`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Decryption`] if the content cannot be
    /// decrypted with the local keys.
    fn decrypt(&self, encrypted_xml: &str) -> Result<String, CipherError>;
}
