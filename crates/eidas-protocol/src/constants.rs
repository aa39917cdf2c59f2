//! SAML 2.0 and eIDAS constants and URIs.

/// SAML 2.0 assertion namespace URI.
pub const SAML_NS: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

/// SAML 2.0 protocol namespace URI.
pub const SAMLP_NS: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

/// XML Digital Signature namespace URI.
pub const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

/// XSI namespace URI.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// eIDAS SAML extensions namespace URI.
pub const EIDAS_NS: &str = "http://eidas.europa.eu/saml-extensions";

/// eIDAS natural person attribute types namespace URI.
pub const EIDAS_NATURAL_NS: &str = "http://eidas.europa.eu/attributes/naturalperson";

/// eIDAS legal person attribute types namespace URI.
pub const EIDAS_LEGAL_NS: &str = "http://eidas.europa.eu/attributes/legalperson";

/// The only SAML version accepted.
pub const SAML_VERSION: &str = "2.0";

/// Attribute name format used for every eIDAS attribute.
pub const ATTRNAME_FORMAT_URI: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:uri";

/// Format of `Issuer` elements.
pub const ENTITY_FORMAT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:entity";

/// Bearer subject confirmation method.
pub const BEARER_METHOD: &str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";

/// SAML status code URIs.
pub mod status_codes {
    /// Success.
    pub const SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";

    /// Error on the requester side.
    pub const REQUESTER: &str = "urn:oasis:names:tc:SAML:2.0:status:Requester";

    /// Error on the responder side.
    pub const RESPONDER: &str = "urn:oasis:names:tc:SAML:2.0:status:Responder";

    /// SAML version mismatch.
    pub const VERSION_MISMATCH: &str = "urn:oasis:names:tc:SAML:2.0:status:VersionMismatch";

    /// Authentication failed (second level).
    pub const AUTHN_FAILED: &str = "urn:oasis:names:tc:SAML:2.0:status:AuthnFailed";

    /// Request denied (second level).
    pub const REQUEST_DENIED: &str = "urn:oasis:names:tc:SAML:2.0:status:RequestDenied";

    /// Invalid attribute name or value (second level).
    pub const INVALID_ATTR_NAME_OR_VALUE: &str =
        "urn:oasis:names:tc:SAML:2.0:status:InvalidAttrNameOrValue";
}

/// Consent URIs allowed in requests and responses.
pub mod consent {
    /// Consent was obtained.
    pub const OBTAINED: &str = "urn:oasis:names:tc:SAML:2.0:consent:obtained";

    /// Consent was obtained before the message was initiated.
    pub const PRIOR: &str = "urn:oasis:names:tc:SAML:2.0:consent:prior";

    /// Consent is implicit.
    pub const CURRENT_IMPLICIT: &str = "urn:oasis:names:tc:SAML:2.0:consent:current-implicit";

    /// Consent is explicit.
    pub const CURRENT_EXPLICIT: &str = "urn:oasis:names:tc:SAML:2.0:consent:current-explicit";

    /// No claim as to consent is made.
    pub const UNSPECIFIED: &str = "urn:oasis:names:tc:SAML:2.0:consent:unspecified";

    /// Consent could not be obtained.
    pub const UNAVAILABLE: &str = "urn:oasis:names:tc:SAML:2.0:consent:unavailable";

    /// Consent is not relevant.
    pub const INAPPLICABLE: &str = "urn:oasis:names:tc:SAML:2.0:consent:inapplicable";

    /// Every allowed consent URI.
    pub const ALL: [&str; 7] = [
        OBTAINED,
        PRIOR,
        CURRENT_IMPLICIT,
        CURRENT_EXPLICIT,
        UNSPECIFIED,
        UNAVAILABLE,
        INAPPLICABLE,
    ];

    /// Returns whether `uri` is an allowed consent value.
    #[must_use]
    pub fn is_allowed(uri: &str) -> bool {
        ALL.contains(&uri)
    }
}

/// eIDAS levels of assurance.
pub mod loa {
    /// Low.
    pub const LOW: &str = "http://eidas.europa.eu/LoA/low";

    /// Substantial.
    pub const SUBSTANTIAL: &str = "http://eidas.europa.eu/LoA/substantial";

    /// High.
    pub const HIGH: &str = "http://eidas.europa.eu/LoA/high";

    /// Notified levels, weakest first.
    pub const NOTIFIED: [&str; 3] = [LOW, SUBSTANTIAL, HIGH];

    /// Returns the rank of a notified level, `None` for other values.
    #[must_use]
    pub fn rank(uri: &str) -> Option<usize> {
        NOTIFIED.iter().position(|level| *level == uri)
    }
}

/// Name ID format URIs.
pub mod name_id_formats {
    /// Persistent identifier.
    pub const PERSISTENT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent";

    /// Transient identifier.
    pub const TRANSIENT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:transient";

    /// Unspecified.
    pub const UNSPECIFIED: &str = "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified";

    /// Returns whether `uri` is a format allowed by the eIDAS profile.
    #[must_use]
    pub fn is_allowed(uri: &str) -> bool {
        matches!(uri, PERSISTENT | TRANSIENT | UNSPECIFIED)
    }
}
