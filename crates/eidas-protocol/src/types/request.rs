//! eIDAS authentication request.

use chrono::{DateTime, Utc};
use eidas_core::ProtocolVersion;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sector of the requesting service provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpType {
    /// Public sector.
    Public,
    /// Private sector.
    Private,
}

impl SpType {
    /// Returns the wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    /// Parses a wire value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// How the requested level of assurance is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaComparison {
    /// The asserted level must be at least the requested one.
    #[default]
    Minimum,
    /// The asserted level must be exactly the requested one.
    Exact,
}

impl LoaComparison {
    /// Returns the wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minimum => "minimum",
            Self::Exact => "exact",
        }
    }

    /// Parses a wire value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "minimum" => Some(Self::Minimum),
            "exact" => Some(Self::Exact),
            _ => None,
        }
    }
}

/// One requested attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedAttribute {
    /// Attribute name URI.
    pub name: String,
    /// Whether the attribute is mandatory for the service provider.
    pub required: bool,
    /// Requested values, usually empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// eIDAS authentication request.
///
/// Built through [`AuthenticationRequest::builder`] and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationRequest {
    id: String,
    issuer: String,
    destination: String,
    citizen_country_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin_country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sp_type: Option<SpType>,
    requested_attributes: Vec<RequestedAttribute>,
    level_of_assurance: String,
    loa_comparison: LoaComparison,
    #[serde(skip_serializing_if = "Option::is_none")]
    name_id_format: Option<String>,
    force_authn: bool,
    is_passive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    assertion_consumer_service_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    protocol_version: Option<ProtocolVersion>,
    issue_instant: DateTime<Utc>,
}

impl AuthenticationRequest {
    /// Starts building a request.
    #[must_use]
    pub fn builder() -> AuthenticationRequestBuilder {
        AuthenticationRequestBuilder::default()
    }

    /// Generates a fresh message identifier.
    ///
    /// Identifiers start with `_` so they are valid XML IDs.
    #[must_use]
    pub fn generate_id() -> String {
        format!("_{}", Uuid::new_v4().simple())
    }

    /// Message identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Entity id (metadata URL) of the requester.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Endpoint the request is sent to.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Country of the citizen to authenticate.
    #[must_use]
    pub fn citizen_country_code(&self) -> &str {
        &self.citizen_country_code
    }

    /// Country of the requesting service provider.
    #[must_use]
    pub fn origin_country_code(&self) -> Option<&str> {
        self.origin_country_code.as_deref()
    }

    /// Human-readable name of the requester.
    #[must_use]
    pub fn provider_name(&self) -> Option<&str> {
        self.provider_name.as_deref()
    }

    /// Sector of the requesting service provider.
    #[must_use]
    pub const fn sp_type(&self) -> Option<SpType> {
        self.sp_type
    }

    /// Requested attributes, in request order.
    #[must_use]
    pub fn requested_attributes(&self) -> &[RequestedAttribute] {
        &self.requested_attributes
    }

    /// Requested level of assurance.
    #[must_use]
    pub fn level_of_assurance(&self) -> &str {
        &self.level_of_assurance
    }

    /// Comparison applied to the level of assurance.
    #[must_use]
    pub const fn loa_comparison(&self) -> LoaComparison {
        self.loa_comparison
    }

    /// Requested name identifier format.
    #[must_use]
    pub fn name_id_format(&self) -> Option<&str> {
        self.name_id_format.as_deref()
    }

    /// Whether re-authentication is forced.
    #[must_use]
    pub const fn force_authn(&self) -> bool {
        self.force_authn
    }

    /// Whether user interaction is forbidden.
    #[must_use]
    pub const fn is_passive(&self) -> bool {
        self.is_passive
    }

    /// Where the response must be delivered.
    #[must_use]
    pub fn assertion_consumer_service_url(&self) -> Option<&str> {
        self.assertion_consumer_service_url.as_deref()
    }

    /// Protocol version negotiated with the destination.
    #[must_use]
    pub const fn protocol_version(&self) -> Option<ProtocolVersion> {
        self.protocol_version
    }

    /// When the request was issued.
    #[must_use]
    pub const fn issue_instant(&self) -> DateTime<Utc> {
        self.issue_instant
    }

    pub(crate) fn with_protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.protocol_version = Some(version);
        self
    }
}

/// Builder for [`AuthenticationRequest`].
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct AuthenticationRequestBuilder {
    id: Option<String>,
    issuer: String,
    destination: String,
    citizen_country_code: String,
    origin_country_code: Option<String>,
    provider_name: Option<String>,
    sp_type: Option<SpType>,
    requested_attributes: Vec<RequestedAttribute>,
    level_of_assurance: Option<String>,
    loa_comparison: LoaComparison,
    name_id_format: Option<String>,
    force_authn: bool,
    is_passive: bool,
    assertion_consumer_service_url: Option<String>,
    protocol_version: Option<ProtocolVersion>,
    issue_instant: Option<DateTime<Utc>>,
}

impl AuthenticationRequestBuilder {
    /// Sets the message identifier. A random one is generated otherwise.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the requester entity id.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Sets the destination endpoint.
    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Sets the citizen country code.
    pub fn citizen_country_code(mut self, code: impl Into<String>) -> Self {
        self.citizen_country_code = code.into();
        self
    }

    /// Sets the service provider country code.
    pub fn origin_country_code(mut self, code: impl Into<String>) -> Self {
        self.origin_country_code = Some(code.into());
        self
    }

    /// Sets the provider name.
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Sets the service provider sector.
    pub const fn sp_type(mut self, sp_type: SpType) -> Self {
        self.sp_type = Some(sp_type);
        self
    }

    /// Requests an attribute.
    pub fn requested_attribute(mut self, name: impl Into<String>, required: bool) -> Self {
        self.requested_attributes.push(RequestedAttribute {
            name: name.into(),
            required,
            values: Vec::new(),
        });
        self
    }

    /// Requests an attribute with values.
    pub fn requested_attribute_with_values(
        mut self,
        name: impl Into<String>,
        required: bool,
        values: Vec<String>,
    ) -> Self {
        self.requested_attributes.push(RequestedAttribute {
            name: name.into(),
            required,
            values,
        });
        self
    }

    /// Sets the requested level of assurance. Defaults to `low`.
    pub fn level_of_assurance(mut self, loa: impl Into<String>) -> Self {
        self.level_of_assurance = Some(loa.into());
        self
    }

    /// Sets the level of assurance comparison.
    pub const fn loa_comparison(mut self, comparison: LoaComparison) -> Self {
        self.loa_comparison = comparison;
        self
    }

    /// Sets the name identifier format.
    pub fn name_id_format(mut self, format: impl Into<String>) -> Self {
        self.name_id_format = Some(format.into());
        self
    }

    /// Forces re-authentication.
    pub const fn force_authn(mut self, force: bool) -> Self {
        self.force_authn = force;
        self
    }

    /// Forbids user interaction.
    pub const fn is_passive(mut self, passive: bool) -> Self {
        self.is_passive = passive;
        self
    }

    /// Sets the assertion consumer service URL.
    pub fn assertion_consumer_service_url(mut self, url: impl Into<String>) -> Self {
        self.assertion_consumer_service_url = Some(url.into());
        self
    }

    /// Sets the protocol version.
    pub const fn protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.protocol_version = Some(version);
        self
    }

    /// Sets the issue instant. The current time is used otherwise.
    pub const fn issue_instant(mut self, instant: DateTime<Utc>) -> Self {
        self.issue_instant = Some(instant);
        self
    }

    /// Builds the request.
    ///
    /// The result is not yet checked against the eIDAS profile; the engine
    /// does that before sending.
    #[must_use]
    pub fn build(self) -> AuthenticationRequest {
        AuthenticationRequest {
            id: self.id.unwrap_or_else(AuthenticationRequest::generate_id),
            issuer: self.issuer,
            destination: self.destination,
            citizen_country_code: self.citizen_country_code,
            origin_country_code: self.origin_country_code,
            provider_name: self.provider_name,
            sp_type: self.sp_type,
            requested_attributes: self.requested_attributes,
            level_of_assurance: self
                .level_of_assurance
                .unwrap_or_else(|| crate::constants::loa::LOW.to_string()),
            loa_comparison: self.loa_comparison,
            name_id_format: self.name_id_format,
            force_authn: self.force_authn,
            is_passive: self.is_passive,
            assertion_consumer_service_url: self.assertion_consumer_service_url,
            protocol_version: self.protocol_version,
            issue_instant: self.issue_instant.unwrap_or_else(Utc::now),
        }
    }
}
