//! SAML metadata to [`EidasMetadataParameters`].

use chrono::{DateTime, Utc};
use eidas_core::ProtocolVersion;

use crate::certificate::Certificate;
use crate::error::{MetadataError, MetadataResult};
use crate::parameters::{EidasMetadataParameters, Endpoint, RoleDescriptor};
use crate::xml::{parse_instant, Element};

/// Entity attribute listing supported eIDAS protocol versions.
pub const PROTOCOL_VERSION_ATTRIBUTE: &str =
    "http://eidas.europa.eu/entity-attributes/protocol-version";

/// Entity attribute listing eIDAS application identifiers.
pub const APPLICATION_IDENTIFIER_ATTRIBUTE: &str =
    "http://eidas.europa.eu/entity-attributes/application-identifier";

/// Entity attribute listing certified levels of assurance.
pub const ASSURANCE_CERTIFICATION_ATTRIBUTE: &str =
    "urn:oasis:names:tc:SAML:attribute:assurance-certification";

fn earliest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn valid_until(element: &Element) -> MetadataResult<Option<DateTime<Utc>>> {
    element
        .attr("validUntil")
        .map(|raw| {
            parse_instant(raw)
                .ok_or_else(|| MetadataError::MalformedMetadata(format!("invalid validUntil {raw:?}")))
        })
        .transpose()
}

fn flag(element: &Element, name: &str) -> bool {
    matches!(element.attr(name), Some("true" | "1"))
}

/// Locates the `EntityDescriptor` whose `entityID` is `entity_id`.
///
/// The root may be the descriptor itself or an `EntitiesDescriptor`, possibly
/// nested. The returned instant is the earliest `validUntil` declared by the
/// enclosing `EntitiesDescriptor`s.
///
/// # Errors
///
/// Returns [`MetadataError::MalformedMetadata`] if an enclosing
/// `validUntil` cannot be parsed.
pub fn find_entity<'a>(
    root: &'a Element,
    entity_id: &str,
) -> MetadataResult<Option<(&'a Element, Option<DateTime<Utc>>)>> {
    if root.is("EntityDescriptor") {
        return Ok((root.attr("entityID") == Some(entity_id)).then_some((root, None)));
    }
    if !root.is("EntitiesDescriptor") {
        return Ok(None);
    }

    let bound = valid_until(root)?;
    for child in root.children() {
        if let Some((entity, inner)) = find_entity(child, entity_id)? {
            return Ok(Some((entity, earliest(bound, inner))));
        }
    }
    Ok(None)
}

fn certificates(key_descriptor: &Element) -> MetadataResult<Vec<Certificate>> {
    key_descriptor
        .descendants_named("X509Certificate")
        .into_iter()
        .map(|element| {
            Certificate::from_base64(&element.text())
                .map_err(|e| MetadataError::MalformedMetadata(format!("bad X509Certificate: {e}")))
        })
        .collect()
}

fn endpoints(descriptor: &Element, local: &str) -> MetadataResult<Vec<Endpoint>> {
    descriptor
        .children_named(local)
        .map(|element| {
            let location = element.attr("Location").ok_or_else(|| {
                MetadataError::MalformedMetadata(format!("{local} without Location"))
            })?;
            Ok(Endpoint {
                binding: element.attr("Binding").unwrap_or_default().to_string(),
                location: location.to_string(),
            })
        })
        .collect()
}

fn parse_role(descriptor: &Element) -> MetadataResult<RoleDescriptor> {
    let mut role = RoleDescriptor {
        want_authn_requests_signed: flag(descriptor, "WantAuthnRequestsSigned"),
        authn_requests_signed: flag(descriptor, "AuthnRequestsSigned"),
        want_assertions_signed: flag(descriptor, "WantAssertionsSigned"),
        single_sign_on_services: endpoints(descriptor, "SingleSignOnService")?,
        assertion_consumer_services: endpoints(descriptor, "AssertionConsumerService")?,
        ..RoleDescriptor::default()
    };

    for key_descriptor in descriptor.children_named("KeyDescriptor") {
        let certs = certificates(key_descriptor)?;
        match key_descriptor.attr("use") {
            Some("signing") => role.signing_certificates.extend(certs),
            Some("encryption") => role.encryption_certificates.extend(certs),
            // a key without `use` serves both purposes
            None => {
                role.signing_certificates.extend(certs.iter().cloned());
                role.encryption_certificates.extend(certs);
            }
            Some(other) => {
                return Err(MetadataError::MalformedMetadata(format!(
                    "unknown KeyDescriptor use {other:?}"
                )));
            }
        }
        role.encryption_algorithms.extend(
            key_descriptor
                .children_named("EncryptionMethod")
                .filter_map(|m| m.attr("Algorithm"))
                .map(str::to_string),
        );
    }

    role.name_id_formats = descriptor
        .children_named("NameIDFormat")
        .map(Element::text)
        .filter(|f| !f.is_empty())
        .collect();
    role.supported_attributes = descriptor
        .children_named("Attribute")
        .filter_map(|a| a.attr("Name"))
        .map(str::to_string)
        .collect();

    Ok(role)
}

fn entity_attribute_values<'a>(extensions: &'a Element, name: &'a str) -> Vec<String> {
    extensions
        .children_named("EntityAttributes")
        .flat_map(|attrs| attrs.children_named("Attribute"))
        .filter(|attr| attr.attr("Name") == Some(name))
        .flat_map(|attr| attr.children_named("AttributeValue"))
        .map(Element::text)
        .filter(|value| !value.is_empty())
        .collect()
}

fn parse_extensions(extensions: &Element, params: &mut EidasMetadataParameters) {
    params.protocol_versions = entity_attribute_values(extensions, PROTOCOL_VERSION_ATTRIBUTE)
        .iter()
        .filter_map(|raw| match raw.parse::<ProtocolVersion>() {
            Ok(version) => Some(version),
            Err(_) => {
                tracing::warn!(
                    entity_id = %params.entity_id,
                    version = %raw,
                    "ignoring unknown protocol version"
                );
                None
            }
        })
        .collect();
    params.application_identifiers =
        entity_attribute_values(extensions, APPLICATION_IDENTIFIER_ATTRIBUTE);
    params.assurance_levels =
        entity_attribute_values(extensions, ASSURANCE_CERTIFICATION_ATTRIBUTE);

    params.signing_methods = extensions
        .children_named("SigningMethod")
        .filter_map(|m| m.attr("Algorithm"))
        .map(str::to_string)
        .collect();
    params.digest_methods = extensions
        .children_named("DigestMethod")
        .filter_map(|m| m.attr("Algorithm"))
        .map(str::to_string)
        .collect();

    if let Some(sp_type) = extensions.child_text("SPType") {
        params.sp_type = Some(sp_type);
    }
    if let Some(country) = extensions.child_text("NodeCountry") {
        params.node_country = Some(country);
    }
}

/// Extracts parameters from an `EntityDescriptor`.
///
/// `inherited_valid_until` is the bound imposed by enclosing
/// `EntitiesDescriptor`s; the result keeps the earlier of it and the
/// descriptor's own `validUntil`.
///
/// # Errors
///
/// Returns [`MetadataError::MalformedMetadata`] if required attributes are
/// missing or values cannot be decoded.
pub fn parse_entity(
    entity: &Element,
    inherited_valid_until: Option<DateTime<Utc>>,
) -> MetadataResult<EidasMetadataParameters> {
    if !entity.is("EntityDescriptor") {
        return Err(MetadataError::MalformedMetadata(format!(
            "expected EntityDescriptor, found {}",
            entity.name()
        )));
    }
    let entity_id = entity
        .attr("entityID")
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| MetadataError::MalformedMetadata("EntityDescriptor without entityID".into()))?;

    let mut params = EidasMetadataParameters::new(entity_id);
    params.valid_until = earliest(valid_until(entity)?, inherited_valid_until);

    if let Some(extensions) = entity.child("Extensions") {
        parse_extensions(extensions, &mut params);
    }
    if let Some(descriptor) = entity.child("IDPSSODescriptor") {
        params.idp = Some(parse_role(descriptor)?);
    }
    if let Some(descriptor) = entity.child("SPSSODescriptor") {
        if params.sp_type.is_none() {
            params.sp_type = descriptor.find(&["Extensions", "SPType"]).map(Element::text);
        }
        params.sp = Some(parse_role(descriptor)?);
    }

    if params.idp.is_none() && params.sp.is_none() {
        return Err(MetadataError::MalformedMetadata(format!(
            "{entity_id} declares neither an SP nor an IdP role"
        )));
    }

    tracing::debug!(
        entity_id = %params.entity_id,
        protocol_versions = ?params.protocol_versions,
        has_idp = params.idp.is_some(),
        has_sp = params.sp.is_some(),
        "parsed entity descriptor"
    );
    Ok(params)
}
