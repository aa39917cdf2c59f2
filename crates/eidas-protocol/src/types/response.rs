//! eIDAS authentication response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::Status;
use crate::attribute::AttributeValue;

/// An asserted attribute with its typed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseAttribute {
    /// Attribute name URI.
    pub name: String,
    /// Values, in document order.
    pub values: Vec<AttributeValue>,
}

impl ResponseAttribute {
    /// Creates an attribute with a single value.
    #[must_use]
    pub fn single(name: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            name: name.into(),
            values: vec![value],
        }
    }
}

/// eIDAS authentication response.
///
/// A failure response never carries a subject, a level of assurance or
/// attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationResponse {
    /// Message identifier.
    pub id: String,
    /// Identifier of the request this answers.
    pub in_response_to: String,
    /// Entity id (metadata URL) of the responder.
    pub issuer: String,
    /// Endpoint the response is delivered to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Outcome.
    pub status: Status,
    /// Subject name identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Format of the subject name identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_name_id_format: Option<String>,
    /// Level of assurance of the authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_of_assurance: Option<String>,
    /// Asserted attributes.
    #[serde(default)]
    pub attributes: Vec<ResponseAttribute>,
    /// Start of the assertion validity window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    /// End (exclusive) of the assertion validity window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,
    /// Audience the assertion is restricted to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    /// Address of the authenticated user agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Consent URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent: Option<String>,
    /// When the response was issued.
    pub issue_instant: DateTime<Utc>,
}

impl AuthenticationResponse {
    /// Starts a successful response from `issuer`.
    #[must_use]
    pub fn success(issuer: impl Into<String>) -> AuthenticationResponseBuilder {
        AuthenticationResponseBuilder::new(issuer.into(), Status::success())
    }

    /// Starts a failure response from `issuer`.
    #[must_use]
    pub fn failure(issuer: impl Into<String>, status: Status) -> AuthenticationResponseBuilder {
        AuthenticationResponseBuilder::new(issuer.into(), status)
    }

    /// Returns true if the response reports a successful authentication.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the attribute named `name`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&ResponseAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Builder for [`AuthenticationResponse`].
///
/// Message identifiers, correlation, timing and audience are filled in by
/// the engine when the response is generated.
#[derive(Debug, Clone)]
#[must_use]
pub struct AuthenticationResponseBuilder {
    response: AuthenticationResponse,
}

impl AuthenticationResponseBuilder {
    fn new(issuer: String, status: Status) -> Self {
        Self {
            response: AuthenticationResponse {
                id: crate::types::AuthenticationRequest::generate_id(),
                in_response_to: String::new(),
                issuer,
                destination: None,
                status,
                subject: None,
                subject_name_id_format: None,
                level_of_assurance: None,
                attributes: Vec::new(),
                not_before: None,
                not_on_or_after: None,
                audience: None,
                ip_address: None,
                consent: None,
                issue_instant: Utc::now(),
            },
        }
    }

    /// Sets the subject name identifier and its format.
    pub fn subject(mut self, subject: impl Into<String>, format: impl Into<String>) -> Self {
        self.response.subject = Some(subject.into());
        self.response.subject_name_id_format = Some(format.into());
        self
    }

    /// Sets the level of assurance.
    pub fn level_of_assurance(mut self, loa: impl Into<String>) -> Self {
        self.response.level_of_assurance = Some(loa.into());
        self
    }

    /// Adds an attribute.
    pub fn attribute(mut self, attribute: ResponseAttribute) -> Self {
        self.response.attributes.push(attribute);
        self
    }

    /// Sets the consent URI.
    pub fn consent(mut self, consent: impl Into<String>) -> Self {
        self.response.consent = Some(consent.into());
        self
    }

    /// Builds the response.
    ///
    /// Failure responses are stripped of subject, level of assurance and
    /// attributes.
    #[must_use]
    pub fn build(mut self) -> AuthenticationResponse {
        if !self.response.status.is_success() {
            self.response.subject = None;
            self.response.subject_name_id_format = None;
            self.response.level_of_assurance = None;
            self.response.attributes.clear();
        }
        self.response
    }
}
