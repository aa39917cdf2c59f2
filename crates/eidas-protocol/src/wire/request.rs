//! `AuthnRequest` serialization and parsing.

use eidas_metadata::xml::{format_instant, Element};

use super::{flag, issuer, required_attr, required_instant};
use crate::attribute::AttributeRegistry;
use crate::constants::{
    consent, ATTRNAME_FORMAT_URI, EIDAS_NS, ENTITY_FORMAT, SAMLP_NS, SAML_NS, SAML_VERSION,
    XMLDSIG_NS,
};
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::{AuthenticationRequest, LoaComparison, SpType};

/// Builds the unsigned `AuthnRequest` element.
pub(crate) fn to_element(
    request: &AuthenticationRequest,
    registry: &AttributeRegistry,
) -> ProtocolResult<Element> {
    let mut extensions = Element::new("saml2p:Extensions");
    if let Some(sp_type) = request.sp_type() {
        extensions.push_child(Element::new("eidas:SPType").with_text(sp_type.as_str()));
    }
    extensions.push_child(
        Element::new("eidas:CitizenCountryCode").with_text(request.citizen_country_code()),
    );
    if let Some(origin) = request.origin_country_code() {
        extensions.push_child(Element::new("eidas:OriginCountryCode").with_text(origin));
    }

    let mut requested = Element::new("eidas:RequestedAttributes");
    for attribute in request.requested_attributes() {
        let definition = registry.require(&attribute.name)?;
        requested.push_child(
            Element::new("eidas:RequestedAttribute")
                .with_attr("FriendlyName", definition.friendly_name())
                .with_attr("Name", definition.name_uri())
                .with_attr("NameFormat", ATTRNAME_FORMAT_URI)
                .with_attr("isRequired", attribute.required.to_string())
                .with_children(
                    attribute
                        .values
                        .iter()
                        .map(|value| Element::new("eidas:AttributeValue").with_text(value.clone())),
                ),
        );
    }
    extensions.push_child(requested);

    let mut root = Element::new("saml2p:AuthnRequest")
        .with_attr("xmlns:saml2p", SAMLP_NS)
        .with_attr("xmlns:saml2", SAML_NS)
        .with_attr("xmlns:ds", XMLDSIG_NS)
        .with_attr("xmlns:eidas", EIDAS_NS)
        .with_attr("ID", request.id())
        .with_attr("Version", SAML_VERSION)
        .with_attr("IssueInstant", format_instant(request.issue_instant()))
        .with_attr("Destination", request.destination())
        .with_attr("Consent", consent::UNSPECIFIED)
        .with_attr("ForceAuthn", request.force_authn().to_string())
        .with_attr("IsPassive", request.is_passive().to_string())
        .with_opt_attr("ProviderName", request.provider_name())
        .with_opt_attr(
            "AssertionConsumerServiceURL",
            request.assertion_consumer_service_url(),
        )
        .with_child(
            Element::new("saml2:Issuer")
                .with_attr("Format", ENTITY_FORMAT)
                .with_text(request.issuer()),
        )
        .with_child(extensions);

    if let Some(format) = request.name_id_format() {
        root.push_child(
            Element::new("saml2p:NameIDPolicy")
                .with_attr("AllowCreate", "true")
                .with_attr("Format", format),
        );
    }
    root.push_child(
        Element::new("saml2p:RequestedAuthnContext")
            .with_attr("Comparison", request.loa_comparison().as_str())
            .with_child(
                Element::new("saml2:AuthnContextClassRef").with_text(request.level_of_assurance()),
            ),
    );

    Ok(root)
}

/// Reads an `AuthnRequest` element.
///
/// Mandatory header attributes, the issuer and the requested level of
/// assurance must be present; value rules are checked by the profile.
pub(crate) fn from_element(root: &Element) -> ProtocolResult<AuthenticationRequest> {
    if !root.is("AuthnRequest") {
        return Err(ProtocolError::validation(format!(
            "expected AuthnRequest, found {}",
            root.local_name()
        )));
    }

    let mut builder = AuthenticationRequest::builder()
        .id(required_attr(root, "ID")?)
        .issue_instant(required_instant(root, "IssueInstant")?)
        .destination(required_attr(root, "Destination")?)
        .issuer(issuer(root)?)
        .force_authn(flag(root, "ForceAuthn"))
        .is_passive(flag(root, "IsPassive"));

    if let Some(name) = root.attr("ProviderName") {
        builder = builder.provider_name(name);
    }
    if let Some(url) = root.attr("AssertionConsumerServiceURL") {
        builder = builder.assertion_consumer_service_url(url);
    }

    if let Some(extensions) = root.child("Extensions") {
        if let Some(raw) = extensions.child_text("SPType") {
            let sp_type = SpType::parse(&raw)
                .ok_or_else(|| ProtocolError::validation(format!("SPType {raw:?} is not allowed")))?;
            builder = builder.sp_type(sp_type);
        }
        if let Some(code) = extensions.child_text("CitizenCountryCode") {
            builder = builder.citizen_country_code(code);
        }
        if let Some(code) = extensions.child_text("OriginCountryCode") {
            builder = builder.origin_country_code(code);
        }
        if let Some(requested) = extensions.child("RequestedAttributes") {
            for attribute in requested.children_named("RequestedAttribute") {
                let name = required_attr(attribute, "Name")?;
                let values = attribute
                    .children_named("AttributeValue")
                    .map(Element::text)
                    .collect();
                builder = builder.requested_attribute_with_values(
                    name,
                    flag(attribute, "isRequired"),
                    values,
                );
            }
        }
    }

    if let Some(format) = root.find(&["NameIDPolicy"]).and_then(|p| p.attr("Format")) {
        builder = builder.name_id_format(format);
    }

    let context = root
        .child("RequestedAuthnContext")
        .ok_or_else(|| ProtocolError::validation("AuthnRequest without RequestedAuthnContext"))?;
    if let Some(raw) = context.attr("Comparison") {
        let comparison = LoaComparison::parse(raw)
            .ok_or_else(|| ProtocolError::validation(format!("comparison {raw:?} is not allowed")))?;
        builder = builder.loa_comparison(comparison);
    }
    let loa = context
        .child_text("AuthnContextClassRef")
        .filter(|loa| !loa.is_empty())
        .ok_or_else(|| ProtocolError::validation("RequestedAuthnContext without a level"))?;

    Ok(builder.level_of_assurance(loa).build())
}
