//! eIDAS profile rules.
//!
//! Each check names the rule it enforces in the returned error so the audit
//! log records the exact violation.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use eidas_metadata::Element;

use crate::attribute::AttributeRegistry;
use crate::constants::{consent, loa, name_id_formats, SAML_VERSION};
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::{AuthenticationRequest, LoaComparison, Status};

/// Checks the SAML `Version` attribute of a message.
pub(crate) fn check_version(root: &Element) -> ProtocolResult<()> {
    match root.attr("Version") {
        Some(SAML_VERSION) => Ok(()),
        Some(other) => Err(ProtocolError::validation(format!(
            "{} has Version {other}, expected {SAML_VERSION}",
            root.local_name()
        ))),
        None => Err(ProtocolError::validation(format!(
            "{} without Version",
            root.local_name()
        ))),
    }
}

/// Checks an optional `Consent` value against the allowed URIs.
pub(crate) fn check_consent(value: Option<&str>) -> ProtocolResult<()> {
    match value {
        Some(uri) if !consent::is_allowed(uri) => {
            Err(ProtocolError::validation(format!("consent {uri} is not allowed")))
        }
        _ => Ok(()),
    }
}

/// Requires an enveloped `ds:Signature` on the message root.
pub(crate) fn check_signature_present(root: &Element) -> ProtocolResult<()> {
    if root.child("Signature").is_some() {
        Ok(())
    } else {
        Err(ProtocolError::validation(format!(
            "{} is not signed",
            root.local_name()
        )))
    }
}

/// A success response carries exactly one assertion, a failure none.
pub(crate) fn check_assertion_count(status: &Status, count: usize) -> ProtocolResult<()> {
    match (status.is_success(), count) {
        (true, 1) | (false, 0) => Ok(()),
        (true, n) => Err(ProtocolError::validation(format!(
            "success response must carry exactly one assertion, found {n}"
        ))),
        (false, n) => Err(ProtocolError::validation(format!(
            "failure response must carry no assertion, found {n}"
        ))),
    }
}

/// An assertion carries exactly one authentication statement and exactly
/// one attribute statement.
pub(crate) fn check_assertion_shape(assertion: &Element) -> ProtocolResult<()> {
    if !assertion.is("Assertion") {
        return Err(ProtocolError::validation(format!(
            "expected Assertion, found {}",
            assertion.local_name()
        )));
    }
    for statement in ["AuthnStatement", "AttributeStatement"] {
        let count = assertion.children_named(statement).count();
        if count != 1 {
            return Err(ProtocolError::validation(format!(
                "assertion must carry exactly one {statement}, found {count}"
            )));
        }
    }
    Ok(())
}

/// Checks that the assertion was issued by the response issuer for the same
/// request. The assertion `Issuer` is mandatory, `InResponseTo` on the bearer
/// confirmation is compared when present.
pub(crate) fn check_assertion_binding(
    assertion_issuer: Option<&str>,
    assertion_in_response_to: Option<&str>,
    response_issuer: &str,
    response_in_response_to: &str,
) -> ProtocolResult<()> {
    let issuer =
        assertion_issuer.ok_or_else(|| ProtocolError::validation("assertion without Issuer"))?;
    if issuer != response_issuer {
        return Err(ProtocolError::IssuerMismatch {
            expected: response_issuer.to_string(),
            actual: issuer.to_string(),
        });
    }

    match assertion_in_response_to {
        Some(id) if id != response_in_response_to => Err(ProtocolError::validation(format!(
            "assertion answers {id}, response answers {response_in_response_to}"
        ))),
        _ => Ok(()),
    }
}

/// Checks `not_before - skew_before <= now < not_on_or_after + skew_after`.
pub(crate) fn check_time_window(
    not_before: Option<DateTime<Utc>>,
    not_on_or_after: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    skew_before: Duration,
    skew_after: Duration,
) -> ProtocolResult<()> {
    let violation = |reason: String| ProtocolError::AssertionTime {
        now: now.to_rfc3339(),
        reason,
    };

    let not_on_or_after =
        not_on_or_after.ok_or_else(|| violation("assertion has no NotOnOrAfter".into()))?;
    if let Some(not_before) = not_before {
        if now < not_before - skew_before {
            return Err(violation(format!("not valid before {not_before}")));
        }
    }
    if now >= not_on_or_after + skew_after {
        return Err(violation(format!("expired at {not_on_or_after}")));
    }
    Ok(())
}

/// Checks the audience restriction when an audience is expected.
pub(crate) fn check_audience(actual: Option<&str>, expected: Option<&str>) -> ProtocolResult<()> {
    match (expected, actual) {
        (None, _) => Ok(()),
        (Some(expected), Some(actual)) if expected == actual => Ok(()),
        (Some(expected), actual) => Err(ProtocolError::AudienceMismatch {
            expected: expected.to_string(),
            actual: actual.unwrap_or("<none>").to_string(),
        }),
    }
}

/// Checks that the bearer confirmation address equals the responder address.
pub(crate) fn check_bearer_ip(actual: Option<&str>, responder_ip: &str) -> ProtocolResult<()> {
    match actual {
        Some(address) if address == responder_ip => Ok(()),
        other => Err(ProtocolError::BearerIpMismatch {
            expected: responder_ip.to_string(),
            actual: other.unwrap_or("<none>").to_string(),
        }),
    }
}

/// Checks the asserted level of assurance against the requested one.
///
/// Non-notified levels must match exactly.
pub(crate) fn check_level_of_assurance(
    requested: &str,
    comparison: LoaComparison,
    asserted: Option<&str>,
) -> ProtocolResult<()> {
    let asserted = asserted
        .ok_or_else(|| ProtocolError::validation("success response without level of assurance"))?;

    let satisfied = match (comparison, loa::rank(requested), loa::rank(asserted)) {
        (LoaComparison::Minimum, Some(wanted), Some(got)) => got >= wanted,
        _ => requested == asserted,
    };
    if satisfied {
        Ok(())
    } else {
        Err(ProtocolError::validation(format!(
            "level of assurance {asserted} does not satisfy {} {requested}",
            comparison.as_str()
        )))
    }
}

fn is_country_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase())
}

/// Validates a request against the eIDAS profile.
pub(crate) fn validate_request(
    request: &AuthenticationRequest,
    registry: &AttributeRegistry,
) -> ProtocolResult<()> {
    for (field, value) in [
        ("id", request.id()),
        ("issuer", request.issuer()),
        ("destination", request.destination()),
    ] {
        if value.trim().is_empty() {
            return Err(ProtocolError::validation(format!("request {field} is empty")));
        }
    }

    if !is_country_code(request.citizen_country_code()) {
        return Err(ProtocolError::validation(format!(
            "citizen country code {:?} is not two upper-case letters",
            request.citizen_country_code()
        )));
    }
    if let Some(origin) = request.origin_country_code() {
        if !is_country_code(origin) {
            return Err(ProtocolError::validation(format!(
                "origin country code {origin:?} is not two upper-case letters"
            )));
        }
    }

    let level = request.level_of_assurance();
    if loa::rank(level).is_none() && !level.contains(':') {
        return Err(ProtocolError::validation(format!(
            "level of assurance {level:?} is neither notified nor a URI"
        )));
    }

    if let Some(format) = request.name_id_format() {
        if !name_id_formats::is_allowed(format) {
            return Err(ProtocolError::validation(format!(
                "name id format {format} is not allowed"
            )));
        }
    }

    if request.requested_attributes().is_empty() {
        return Err(ProtocolError::validation("request asks for no attributes"));
    }
    let mut seen = HashSet::new();
    for attribute in request.requested_attributes() {
        if !seen.insert(attribute.name.as_str()) {
            return Err(ProtocolError::validation(format!(
                "attribute {} is requested twice",
                attribute.name
            )));
        }
        registry.require(&attribute.name)?;
    }

    Ok(())
}
