//! `Response` and `Assertion` serialization and parsing.

use chrono::{DateTime, Utc};
use eidas_metadata::xml::{format_instant, Element};

use super::{issuer, optional_instant, required_attr, required_instant};
use crate::attribute::AttributeRegistry;
use crate::constants::{
    ATTRNAME_FORMAT_URI, BEARER_METHOD, EIDAS_LEGAL_NS, EIDAS_NATURAL_NS, ENTITY_FORMAT,
    SAMLP_NS, SAML_NS, SAML_VERSION, XMLDSIG_NS, XSI_NS,
};
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::{AuthenticationResponse, ResponseAttribute, Status, StatusCode};

/// Header of a received `Response`, read before anything is trusted.
#[derive(Debug, Clone)]
pub(crate) struct ResponseHeader {
    pub id: String,
    pub in_response_to: String,
    pub issuer: String,
    pub destination: String,
    pub issue_instant: DateTime<Utc>,
    pub consent: Option<String>,
    pub status: Status,
}

/// Content of a received assertion.
#[derive(Debug, Clone, Default)]
pub(crate) struct AssertionContent {
    pub issuer: Option<String>,
    pub in_response_to: Option<String>,
    pub subject: Option<String>,
    pub subject_name_id_format: Option<String>,
    pub level_of_assurance: Option<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_on_or_after: Option<DateTime<Utc>>,
    pub audience: Option<String>,
    pub ip_address: Option<String>,
}

fn status_element(status: &Status) -> Element {
    let mut code = Element::new("saml2p:StatusCode").with_attr("Value", status.code.uri());
    if let Some(sub_code) = &status.sub_code {
        code.push_child(Element::new("saml2p:StatusCode").with_attr("Value", sub_code.clone()));
    }

    let mut element = Element::new("saml2p:Status").with_child(code);
    if let Some(message) = &status.message {
        element.push_child(Element::new("saml2p:StatusMessage").with_text(message.clone()));
    }
    element
}

/// Builds the unsigned `Response` element without its assertion.
pub(crate) fn to_element(response: &AuthenticationResponse) -> Element {
    Element::new("saml2p:Response")
        .with_attr("xmlns:saml2p", SAMLP_NS)
        .with_attr("xmlns:saml2", SAML_NS)
        .with_attr("xmlns:ds", XMLDSIG_NS)
        .with_attr("ID", response.id.clone())
        .with_attr("InResponseTo", response.in_response_to.clone())
        .with_attr("Version", SAML_VERSION)
        .with_attr("IssueInstant", format_instant(response.issue_instant))
        .with_opt_attr("Destination", response.destination.clone())
        .with_opt_attr("Consent", response.consent.clone())
        .with_child(
            Element::new("saml2:Issuer")
                .with_attr("Format", ENTITY_FORMAT)
                .with_text(response.issuer.clone()),
        )
        .with_child(status_element(&response.status))
}

/// Builds the unsigned `Assertion` element of a successful response.
pub(crate) fn assertion_element(
    response: &AuthenticationResponse,
    assertion_id: &str,
    registry: &AttributeRegistry,
) -> ProtocolResult<Element> {
    let mut confirmation_data = Element::new("saml2:SubjectConfirmationData")
        .with_opt_attr("Address", response.ip_address.clone())
        .with_attr("InResponseTo", response.in_response_to.clone())
        .with_opt_attr("Recipient", response.destination.clone());
    if let Some(not_on_or_after) = response.not_on_or_after {
        confirmation_data.set_attr("NotOnOrAfter", format_instant(not_on_or_after));
    }

    let subject = Element::new("saml2:Subject")
        .with_child(
            Element::new("saml2:NameID")
                .with_opt_attr("Format", response.subject_name_id_format.clone())
                .with_text(response.subject.clone().unwrap_or_default()),
        )
        .with_child(
            Element::new("saml2:SubjectConfirmation")
                .with_attr("Method", BEARER_METHOD)
                .with_child(confirmation_data),
        );

    let mut conditions = Element::new("saml2:Conditions");
    if let Some(not_before) = response.not_before {
        conditions.set_attr("NotBefore", format_instant(not_before));
    }
    if let Some(not_on_or_after) = response.not_on_or_after {
        conditions.set_attr("NotOnOrAfter", format_instant(not_on_or_after));
    }
    if let Some(audience) = &response.audience {
        conditions.push_child(
            Element::new("saml2:AudienceRestriction")
                .with_child(Element::new("saml2:Audience").with_text(audience.clone())),
        );
    }

    let authn_statement = Element::new("saml2:AuthnStatement")
        .with_attr("AuthnInstant", format_instant(response.issue_instant))
        .with_child(
            Element::new("saml2:SubjectLocality").with_opt_attr("Address", response.ip_address.clone()),
        )
        .with_child(
            Element::new("saml2:AuthnContext").with_child(
                Element::new("saml2:AuthnContextClassRef")
                    .with_text(response.level_of_assurance.clone().unwrap_or_default()),
            ),
        );

    let mut attribute_statement = Element::new("saml2:AttributeStatement");
    for attribute in &response.attributes {
        let definition = registry.require(&attribute.name)?;
        let mut element = Element::new("saml2:Attribute")
            .with_attr("FriendlyName", definition.friendly_name())
            .with_attr("Name", definition.name_uri())
            .with_attr("NameFormat", ATTRNAME_FORMAT_URI);
        for value in &attribute.values {
            element.push_child(
                Element::new("saml2:AttributeValue")
                    .with_attr("xsi:type", definition.xml_type())
                    .with_text(definition.marshal(value)?),
            );
        }
        attribute_statement.push_child(element);
    }

    Ok(Element::new("saml2:Assertion")
        .with_attr("xmlns:saml2", SAML_NS)
        .with_attr("xmlns:ds", XMLDSIG_NS)
        .with_attr("xmlns:xsi", XSI_NS)
        .with_attr("xmlns:eidas-natural", EIDAS_NATURAL_NS)
        .with_attr("xmlns:eidas-legal", EIDAS_LEGAL_NS)
        .with_attr("ID", assertion_id)
        .with_attr("Version", SAML_VERSION)
        .with_attr("IssueInstant", format_instant(response.issue_instant))
        .with_child(
            Element::new("saml2:Issuer")
                .with_attr("Format", ENTITY_FORMAT)
                .with_text(response.issuer.clone()),
        )
        .with_child(subject)
        .with_child(conditions)
        .with_child(authn_statement)
        .with_child(attribute_statement))
}

fn read_status(root: &Element) -> ProtocolResult<Status> {
    let status = root
        .child("Status")
        .ok_or_else(|| ProtocolError::validation("Response without Status"))?;
    let code = status
        .child("StatusCode")
        .ok_or_else(|| ProtocolError::validation("Status without StatusCode"))?;
    let value = required_attr(code, "Value")?;
    let top = StatusCode::from_uri(value)
        .ok_or_else(|| ProtocolError::validation(format!("unknown top-level status {value}")))?;

    Ok(Status {
        code: top,
        sub_code: code
            .child("StatusCode")
            .and_then(|sub| sub.attr("Value"))
            .map(str::to_string),
        message: status.child_text("StatusMessage").filter(|m| !m.is_empty()),
    })
}

/// Reads the header of a `Response`.
///
/// Fails on the first missing mandatory part.
pub(crate) fn read_header(root: &Element) -> ProtocolResult<ResponseHeader> {
    if !root.is("Response") {
        return Err(ProtocolError::validation(format!(
            "expected Response, found {}",
            root.local_name()
        )));
    }

    Ok(ResponseHeader {
        id: required_attr(root, "ID")?.to_string(),
        in_response_to: required_attr(root, "InResponseTo")?.to_string(),
        issue_instant: required_instant(root, "IssueInstant")?,
        destination: required_attr(root, "Destination")?.to_string(),
        consent: root.attr("Consent").map(str::to_string),
        issuer: issuer(root)?,
        status: read_status(root)?,
    })
}

/// Reads subject, conditions and authentication context of a decrypted
/// `Assertion`.
pub(crate) fn read_assertion(assertion: &Element) -> ProtocolResult<AssertionContent> {
    let mut content = AssertionContent {
        issuer: assertion.child_text("Issuer").filter(|issuer| !issuer.is_empty()),
        ..AssertionContent::default()
    };

    if let Some(name_id) = assertion.find(&["Subject", "NameID"]) {
        content.subject = Some(name_id.text()).filter(|s| !s.is_empty());
        content.subject_name_id_format = name_id.attr("Format").map(str::to_string);
    }
    if let Some(data) =
        assertion.find(&["Subject", "SubjectConfirmation", "SubjectConfirmationData"])
    {
        content.ip_address = data.attr("Address").map(str::to_string);
        content.in_response_to = data.attr("InResponseTo").map(str::to_string);
    }

    if let Some(conditions) = assertion.child("Conditions") {
        content.not_before = optional_instant(conditions, "NotBefore")?;
        content.not_on_or_after = optional_instant(conditions, "NotOnOrAfter")?;
        content.audience = conditions
            .find(&["AudienceRestriction", "Audience"])
            .map(Element::text);
    }

    content.level_of_assurance = assertion
        .find(&["AuthnStatement", "AuthnContext", "AuthnContextClassRef"])
        .map(Element::text)
        .filter(|loa| !loa.is_empty());

    Ok(content)
}

/// Converts the attribute values of an `Assertion` through the registry.
pub(crate) fn read_attributes(
    assertion: &Element,
    registry: &AttributeRegistry,
) -> ProtocolResult<Vec<ResponseAttribute>> {
    let Some(statement) = assertion.child("AttributeStatement") else {
        return Ok(Vec::new());
    };

    let mut attributes = Vec::new();
    for attribute in statement.children_named("Attribute") {
        let definition = registry.require(required_attr(attribute, "Name")?)?;
        let values = attribute
            .children_named("AttributeValue")
            .map(|value| definition.unmarshal(&value.text()))
            .collect::<Result<Vec<_>, _>>()?;
        attributes.push(ResponseAttribute {
            name: definition.name_uri().to_string(),
            values,
        });
    }
    Ok(attributes)
}
