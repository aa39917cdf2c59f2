//! Resolved partner metadata.
//!
//! [`EidasMetadataParameters`] is the immutable view of one partner's
//! `EntityDescriptor`: its keys, endpoints, role flags and eIDAS extensions.
//! A refetch produces a new value; existing holders keep the old one.

use chrono::{DateTime, Utc};
use eidas_core::ProtocolVersion;
use serde::{Deserialize, Serialize};

use crate::certificate::Certificate;

/// SAML role of a partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Service provider (`SPSSODescriptor`), the Connector side.
    Sp,
    /// Identity provider (`IDPSSODescriptor`), the Proxy-Service side.
    Idp,
}

/// Protocol endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Binding URI.
    pub binding: String,
    /// Endpoint URL.
    pub location: String,
}

/// Keys, endpoints and flags of one role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDescriptor {
    /// Certificates that sign messages of this role.
    pub signing_certificates: Vec<Certificate>,
    /// Certificates to encrypt for.
    pub encryption_certificates: Vec<Certificate>,
    /// Accepted encryption algorithm URIs.
    pub encryption_algorithms: Vec<String>,
    /// Single sign-on endpoints (identity provider).
    pub single_sign_on_services: Vec<Endpoint>,
    /// Assertion consumer endpoints (service provider).
    pub assertion_consumer_services: Vec<Endpoint>,
    /// Supported name identifier formats.
    pub name_id_formats: Vec<String>,
    /// Attribute names the identity provider can release.
    pub supported_attributes: Vec<String>,
    /// `WantAuthnRequestsSigned` (identity provider).
    pub want_authn_requests_signed: bool,
    /// `AuthnRequestsSigned` (service provider).
    pub authn_requests_signed: bool,
    /// `WantAssertionsSigned` (service provider).
    pub want_assertions_signed: bool,
}

/// Parameters extracted from a partner's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EidasMetadataParameters {
    /// Entity id, equal to the metadata URL.
    pub entity_id: String,
    /// End of validity, if the document declares one.
    pub valid_until: Option<DateTime<Utc>>,
    /// Service provider role, if present.
    pub sp: Option<RoleDescriptor>,
    /// Identity provider role, if present.
    pub idp: Option<RoleDescriptor>,
    /// eIDAS protocol versions the partner speaks.
    pub protocol_versions: Vec<ProtocolVersion>,
    /// eIDAS application identifiers.
    pub application_identifiers: Vec<String>,
    /// Signature algorithms the partner accepts; empty means no restriction.
    pub signing_methods: Vec<String>,
    /// Digest algorithms the partner accepts; empty means no restriction.
    pub digest_methods: Vec<String>,
    /// `public` or `private`, for service providers.
    pub sp_type: Option<String>,
    /// Country the node serves.
    pub node_country: Option<String>,
    /// Levels of assurance the partner is certified for.
    pub assurance_levels: Vec<String>,
}

impl EidasMetadataParameters {
    /// Creates parameters with only an entity id.
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            valid_until: None,
            sp: None,
            idp: None,
            protocol_versions: Vec::new(),
            application_identifiers: Vec::new(),
            signing_methods: Vec::new(),
            digest_methods: Vec::new(),
            sp_type: None,
            node_country: None,
            assurance_levels: Vec::new(),
        }
    }

    /// Returns the descriptor of `role`.
    #[must_use]
    pub const fn role(&self, role: Role) -> Option<&RoleDescriptor> {
        match role {
            Role::Sp => self.sp.as_ref(),
            Role::Idp => self.idp.as_ref(),
        }
    }

    /// Returns the signing certificates of `role` (empty if the role is
    /// absent).
    #[must_use]
    pub fn signing_certificates(&self, role: Role) -> &[Certificate] {
        self.role(role)
            .map_or(&[][..], |d| d.signing_certificates.as_slice())
    }

    /// Returns the first encryption certificate of `role`.
    #[must_use]
    pub fn encryption_certificate(&self, role: Role) -> Option<&Certificate> {
        self.role(role)
            .and_then(|d| d.encryption_certificates.first())
    }

    /// Returns the protocol versions the partner advertises.
    #[must_use]
    pub fn protocol_versions(&self) -> &[ProtocolVersion] {
        &self.protocol_versions
    }

    /// Returns whether the partner accepts signatures made with `uri`.
    ///
    /// A partner without a whitelist accepts any algorithm.
    #[must_use]
    pub fn supports_signing_algorithm(&self, uri: &str) -> bool {
        self.signing_methods.is_empty() || self.signing_methods.iter().any(|m| m == uri)
    }

    /// Returns whether the document is still valid at `now`.
    ///
    /// Documents without `validUntil` never expire on their own.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.map_or(true, |until| until > now)
    }
}
