//! SAML wire form of eIDAS messages.
//!
//! Serialization builds [`Element`](eidas_metadata::Element) trees; parsing
//! reads trees produced by the hardened parser and fails on missing
//! mandatory content. Value rules live in [`crate::profile`].

pub(crate) mod request;
pub(crate) mod response;

use chrono::{DateTime, Utc};
use eidas_metadata::xml::{self, Element};

use crate::error::{ProtocolError, ProtocolResult};

fn required_attr<'a>(element: &'a Element, name: &str) -> ProtocolResult<&'a str> {
    element
        .attr(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ProtocolError::validation(format!("{} without {name}", element.local_name())))
}

fn required_instant(element: &Element, name: &str) -> ProtocolResult<DateTime<Utc>> {
    let raw = required_attr(element, name)?;
    xml::parse_instant(raw).ok_or_else(|| {
        ProtocolError::validation(format!("{}/@{name} is not a dateTime: {raw}", element.local_name()))
    })
}

fn optional_instant(element: &Element, name: &str) -> ProtocolResult<Option<DateTime<Utc>>> {
    element
        .attr(name)
        .map(|raw| {
            xml::parse_instant(raw).ok_or_else(|| {
                ProtocolError::validation(format!(
                    "{}/@{name} is not a dateTime: {raw}",
                    element.local_name()
                ))
            })
        })
        .transpose()
}

fn issuer(element: &Element) -> ProtocolResult<String> {
    element
        .child_text("Issuer")
        .filter(|issuer| !issuer.is_empty())
        .ok_or_else(|| ProtocolError::validation(format!("{} without Issuer", element.local_name())))
}

fn flag(element: &Element, name: &str) -> bool {
    matches!(element.attr(name), Some("true" | "1"))
}
