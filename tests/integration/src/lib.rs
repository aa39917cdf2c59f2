//! Test support for the eIDAS node crates.
//!
//! The fakes stand in for the deployment's XML signature and encryption
//! implementations. Documents keep their real structure, so every engine
//! check runs, but signatures are SHA-256 digests keyed by the certificate
//! and encryption is base64.

#![forbid(unsafe_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use eidas_metadata::parser::PROTOCOL_VERSION_ATTRIBUTE;
use eidas_metadata::xml::{self, format_instant, Element};
use eidas_metadata::{Certificate, Role};
use eidas_protocol::{Cipher, CipherError, SignatureAlgorithm, SignatureError, Signer};
use sha2::{Digest, Sha256};

/// Creates a certificate whose DER bytes are `label`.
#[must_use]
pub fn certificate(label: &str) -> Certificate {
    Certificate::from_der(label.as_bytes().to_vec())
}

fn digest(certificate: &Certificate, canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(certificate.as_der());
    hasher.update(canonical.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Signs with a keyed hash over the re-serialized document.
#[derive(Debug, Clone)]
pub struct HashSigner {
    certificate: Certificate,
    anchors: Vec<Certificate>,
}

impl HashSigner {
    /// Creates a signer holding `certificate`.
    #[must_use]
    pub fn new(certificate: Certificate) -> Self {
        Self {
            certificate,
            anchors: Vec::new(),
        }
    }

    /// Trusts `anchor` for documents verified without explicit certificates.
    #[must_use]
    pub fn with_anchor(mut self, anchor: Certificate) -> Self {
        self.anchors.push(anchor);
        self
    }

    /// Returns the signing certificate.
    #[must_use]
    pub const fn certificate(&self) -> &Certificate {
        &self.certificate
    }
}

impl Signer for HashSigner {
    fn sign(
        &self,
        xml: &str,
        reference_id: &str,
        algorithm: SignatureAlgorithm,
    ) -> Result<String, SignatureError> {
        let mut root = xml::parse(xml.as_bytes(), usize::MAX)
            .map_err(|e| SignatureError::Signing(e.to_string()))?;
        if root.attr("ID") != Some(reference_id) {
            return Err(SignatureError::Signing(format!(
                "root element is not {reference_id}"
            )));
        }

        let value = digest(&self.certificate, &root.to_xml());
        root.push_child(
            Element::new("ds:Signature")
                .with_child(
                    Element::new("ds:SignedInfo")
                        .with_child(
                            Element::new("ds:SignatureMethod").with_attr("Algorithm", algorithm.uri()),
                        )
                        .with_child(
                            Element::new("ds:Reference").with_attr("URI", format!("#{reference_id}")),
                        ),
                )
                .with_child(Element::new("ds:SignatureValue").with_text(value))
                .with_child(
                    Element::new("ds:KeyInfo").with_child(
                        Element::new("ds:X509Data").with_child(
                            Element::new("ds:X509Certificate")
                                .with_text(self.certificate.to_base64()),
                        ),
                    ),
                ),
        );
        Ok(root.to_xml())
    }

    fn verify(
        &self,
        xml: &str,
        certificates: Option<&[Certificate]>,
    ) -> Result<(), SignatureError> {
        let mut root = xml::parse(xml.as_bytes(), usize::MAX)
            .map_err(|e| SignatureError::Invalid(e.to_string()))?;
        let signature = root.child("Signature").cloned().ok_or(SignatureError::Missing)?;

        if let Some(uri) = signature
            .find(&["SignedInfo", "SignatureMethod"])
            .and_then(|method| method.attr("Algorithm"))
        {
            if SignatureAlgorithm::from_uri(uri).is_none() {
                return Err(SignatureError::UnsupportedAlgorithm(uri.to_string()));
            }
        }

        let signer = signature
            .find(&["KeyInfo", "X509Data", "X509Certificate"])
            .map(Element::text)
            .ok_or_else(|| SignatureError::Invalid("no signing certificate".into()))?;
        let signer =
            Certificate::from_base64(&signer).map_err(|e| SignatureError::Invalid(e.to_string()))?;

        root.remove_children("Signature");
        let expected = digest(&signer, &root.to_xml());
        if signature.child_text("SignatureValue").as_deref() != Some(expected.as_str()) {
            return Err(SignatureError::Invalid("digest mismatch".into()));
        }

        let trusted = certificates.unwrap_or(self.anchors.as_slice());
        if trusted.contains(&signer) {
            Ok(())
        } else {
            Err(SignatureError::UntrustedCertificate)
        }
    }
}

/// "Encrypts" assertions by base64-encoding them for a certificate.
#[derive(Debug, Clone)]
pub struct Base64Cipher {
    certificate: Certificate,
}

impl Base64Cipher {
    /// Creates a cipher that decrypts content addressed to `certificate`.
    #[must_use]
    pub const fn new(certificate: Certificate) -> Self {
        Self { certificate }
    }
}

impl Cipher for Base64Cipher {
    fn encrypt(
        &self,
        assertion_xml: &str,
        certificate: &Certificate,
        algorithm: &str,
    ) -> Result<String, CipherError> {
        let element = Element::new("saml2:EncryptedAssertion").with_child(
            Element::new("xenc:EncryptedData")
                .with_child(Element::new("xenc:EncryptionMethod").with_attr("Algorithm", algorithm))
                .with_child(
                    Element::new("ds:KeyInfo").with_child(
                        Element::new("ds:X509Data").with_child(
                            Element::new("ds:X509Certificate").with_text(certificate.to_base64()),
                        ),
                    ),
                )
                .with_child(
                    Element::new("xenc:CipherData").with_child(
                        Element::new("xenc:CipherValue").with_text(STANDARD.encode(assertion_xml)),
                    ),
                ),
        );
        Ok(element.to_xml())
    }

    fn decrypt(&self, encrypted_xml: &str) -> Result<String, CipherError> {
        let root = xml::parse(encrypted_xml.as_bytes(), usize::MAX)
            .map_err(|e| CipherError::Decryption(e.to_string()))?;
        let data = root
            .child("EncryptedData")
            .ok_or_else(|| CipherError::Decryption("no EncryptedData".into()))?;

        let recipient = data
            .find(&["KeyInfo", "X509Data", "X509Certificate"])
            .map(Element::text)
            .and_then(|text| Certificate::from_base64(&text).ok());
        if recipient.as_ref() != Some(&self.certificate) {
            return Err(CipherError::Decryption("not encrypted for this node".into()));
        }

        let value = data
            .find(&["CipherData", "CipherValue"])
            .map(Element::text)
            .ok_or_else(|| CipherError::Decryption("no CipherValue".into()))?;
        let plain = STANDARD
            .decode(value)
            .map_err(|e| CipherError::Decryption(e.to_string()))?;
        String::from_utf8(plain).map_err(|e| CipherError::Decryption(e.to_string()))
    }
}

/// An unsigned partner metadata document.
#[derive(Debug, Clone)]
pub struct MetadataDocument {
    /// Entity id, also the URL the document is published at.
    pub entity_id: String,
    /// Role the partner plays.
    pub role: Role,
    /// End of validity.
    pub valid_until: DateTime<Utc>,
    /// Advertised protocol versions.
    pub protocol_versions: Vec<String>,
    /// Accepted signature algorithms; empty accepts all.
    pub signing_methods: Vec<String>,
    /// Signing certificate of the role.
    pub signing_certificate: Certificate,
    /// Encryption certificate of the role.
    pub encryption_certificate: Option<Certificate>,
    /// Single sign-on or assertion consumer service location.
    pub endpoint: String,
}

impl MetadataDocument {
    /// `ID` of the document root, the signature reference.
    pub const ID: &'static str = "_metadata";

    /// Serializes the document.
    #[must_use]
    pub fn render(&self) -> String {
        let mut extensions = Element::new("md:Extensions");
        if !self.protocol_versions.is_empty() {
            let attribute = Element::new("saml2:Attribute")
                .with_attr("Name", PROTOCOL_VERSION_ATTRIBUTE)
                .with_children(
                    self.protocol_versions
                        .iter()
                        .map(|v| Element::new("saml2:AttributeValue").with_text(v.clone())),
                );
            extensions.push_child(Element::new("mdattr:EntityAttributes").with_child(attribute));
        }
        for method in &self.signing_methods {
            extensions.push_child(Element::new("alg:SigningMethod").with_attr("Algorithm", method.clone()));
        }

        let key = |usage: &str, certificate: &Certificate| {
            Element::new("md:KeyDescriptor").with_attr("use", usage).with_child(
                Element::new("ds:KeyInfo").with_child(
                    Element::new("ds:X509Data").with_child(
                        Element::new("ds:X509Certificate").with_text(certificate.to_base64()),
                    ),
                ),
            )
        };

        let (descriptor, service) = match self.role {
            Role::Idp => ("md:IDPSSODescriptor", "md:SingleSignOnService"),
            Role::Sp => ("md:SPSSODescriptor", "md:AssertionConsumerService"),
        };
        let mut role = Element::new(descriptor)
            .with_attr("protocolSupportEnumeration", "urn:oasis:names:tc:SAML:2.0:protocol")
            .with_child(key("signing", &self.signing_certificate));
        if let Some(certificate) = &self.encryption_certificate {
            role.push_child(key("encryption", certificate));
        }
        role.push_child(
            Element::new(service)
                .with_attr("Binding", "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST")
                .with_attr("Location", self.endpoint.clone()),
        );

        Element::new("md:EntityDescriptor")
            .with_attr("xmlns:md", "urn:oasis:names:tc:SAML:2.0:metadata")
            .with_attr("xmlns:ds", "http://www.w3.org/2000/09/xmldsig#")
            .with_attr("xmlns:saml2", "urn:oasis:names:tc:SAML:2.0:assertion")
            .with_attr("xmlns:mdattr", "urn:oasis:names:tc:SAML:metadata:attribute")
            .with_attr("xmlns:alg", "urn:oasis:names:tc:SAML:metadata:algsupport")
            .with_attr("ID", Self::ID)
            .with_attr("entityID", self.entity_id.clone())
            .with_attr("validUntil", format_instant(self.valid_until))
            .with_child(extensions)
            .with_child(role)
            .to_xml()
    }

    /// Serializes and signs the document.
    ///
    /// # Errors
    ///
    /// Returns the signer's error.
    pub fn sign_with(&self, signer: &dyn Signer) -> Result<String, SignatureError> {
        signer.sign(&self.render(), Self::ID, SignatureAlgorithm::RsaSha256Mgf1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_verifies_and_detects_tampering() {
        let signer = HashSigner::new(certificate("node"));
        let signed = signer
            .sign(r#"<m ID="_1"><v>1</v></m>"#, "_1", SignatureAlgorithm::EcdsaSha256)
            .unwrap();

        let trusted = vec![certificate("node")];
        let other = vec![certificate("other")];
        assert!(signer.verify(&signed, Some(trusted.as_slice())).is_ok());
        assert_eq!(
            signer.verify(&signed, Some(other.as_slice())),
            Err(SignatureError::UntrustedCertificate)
        );
        assert!(matches!(
            signer.verify(&signed.replace(">1<", ">2<"), Some(trusted.as_slice())),
            Err(SignatureError::Invalid(_))
        ));
        assert_eq!(
            signer.verify(r#"<m ID="_1"/>"#, Some(trusted.as_slice())),
            Err(SignatureError::Missing)
        );
    }

    #[test]
    fn signature_value_is_a_sha256_digest() {
        let signer = HashSigner::new(certificate("node"));
        let signed = signer
            .sign(r#"<m ID="_1"/>"#, "_1", SignatureAlgorithm::RsaSha256Mgf1)
            .unwrap();

        let root = xml::parse(signed.as_bytes(), usize::MAX).unwrap();
        let value = root
            .find(&["Signature", "SignatureValue"])
            .map(Element::text)
            .unwrap();
        assert_eq!(STANDARD.decode(&value).unwrap().len(), 32);
        let unsigned = xml::parse(br#"<m ID="_1"/>"#, usize::MAX).unwrap().to_xml();
        assert_eq!(value, digest(&certificate("node"), &unsigned));
    }

    #[test]
    fn cipher_only_opens_own_content() {
        let mine = Base64Cipher::new(certificate("me"));
        let theirs = Base64Cipher::new(certificate("them"));

        let sealed = mine
            .encrypt("<saml2:Assertion/>", &certificate("me"), "urn:alg")
            .unwrap();
        assert_eq!(mine.decrypt(&sealed).unwrap(), "<saml2:Assertion/>");
        assert!(theirs.decrypt(&sealed).is_err());
    }
}
