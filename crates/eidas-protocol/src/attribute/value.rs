//! Typed attribute values and their wire form.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::NaiveDate;
use eidas_metadata::xml::{self, Element};
use serde::{Deserialize, Serialize};

use crate::constants::EIDAS_NATURAL_NS;

/// Wire date format of date attributes.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Upper bound on a decoded postal address fragment.
const MAX_ADDRESS_SIZE: usize = 16 * 1024;

/// The closed set of value kinds an attribute can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Free text (identifiers, names, country codes).
    Text,
    /// Calendar date, `YYYY-MM-DD` on the wire.
    Date,
    /// Signed integer.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// eIDAS gender code.
    Gender,
    /// Structured postal address, base64-encoded XML on the wire.
    PostalAddress,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Date => "date",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Gender => "gender",
            Self::PostalAddress => "postal address",
        };
        f.write_str(name)
    }
}

/// eIDAS gender code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Not specified.
    Unspecified,
}

impl Gender {
    /// Returns the wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Unspecified => "Unspecified",
        }
    }

    /// Parses a wire value. The pre-2.0 spelling `Not Specified` is accepted.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Male" => Some(Self::Male),
            "Female" => Some(Self::Female),
            "Unspecified" | "Not Specified" => Some(Self::Unspecified),
            _ => None,
        }
    }
}

/// Postal address as defined by the eIDAS `CurrentAddressType`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct PostalAddress {
    pub po_box: Option<String>,
    pub locator_designator: Option<String>,
    pub locator_name: Option<String>,
    pub cv_address_area: Option<String>,
    pub thoroughfare: Option<String>,
    pub post_name: Option<String>,
    pub admin_unit_first_line: Option<String>,
    pub admin_unit_second_line: Option<String>,
    pub post_code: Option<String>,
    pub full_cv_address: Option<String>,
}

impl PostalAddress {
    fn fields(&self) -> [(&'static str, &Option<String>); 10] {
        [
            ("PoBox", &self.po_box),
            ("LocatorDesignator", &self.locator_designator),
            ("LocatorName", &self.locator_name),
            ("CvaddressArea", &self.cv_address_area),
            ("Thoroughfare", &self.thoroughfare),
            ("PostName", &self.post_name),
            ("AdminunitFirstline", &self.admin_unit_first_line),
            ("AdminunitSecondline", &self.admin_unit_second_line),
            ("PostCode", &self.post_code),
            ("FullCvaddress", &self.full_cv_address),
        ]
    }

    fn field_mut(&mut self, local: &str) -> Option<&mut Option<String>> {
        Some(match local {
            "PoBox" => &mut self.po_box,
            "LocatorDesignator" => &mut self.locator_designator,
            "LocatorName" => &mut self.locator_name,
            "CvaddressArea" => &mut self.cv_address_area,
            "Thoroughfare" => &mut self.thoroughfare,
            "PostName" => &mut self.post_name,
            "AdminunitFirstline" => &mut self.admin_unit_first_line,
            "AdminunitSecondline" => &mut self.admin_unit_second_line,
            "PostCode" => &mut self.post_code,
            "FullCvaddress" => &mut self.full_cv_address,
            _ => return None,
        })
    }

    /// Encodes the address as base64 of its XML fragment.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let fragment: String = self
            .fields()
            .iter()
            .filter_map(|(local, value)| {
                value
                    .as_ref()
                    .map(|v| Element::new(format!("eidas-natural:{local}")).with_text(v.clone()).to_xml())
            })
            .collect();
        STANDARD.encode(fragment)
    }

    /// Decodes the wire form produced by [`PostalAddress::to_wire`].
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the value is not base64 or
    /// does not hold a well-formed fragment.
    pub fn from_wire(wire: &str) -> Result<Self, String> {
        let compact: String = wire.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = STANDARD
            .decode(compact)
            .map_err(|e| format!("not base64: {e}"))?;
        let fragment =
            String::from_utf8(decoded).map_err(|_| "address is not UTF-8".to_string())?;

        let wrapped = format!(
            r#"<eidas-natural:CurrentAddress xmlns:eidas-natural="{EIDAS_NATURAL_NS}">{fragment}</eidas-natural:CurrentAddress>"#
        );
        let root = xml::parse(wrapped.as_bytes(), MAX_ADDRESS_SIZE).map_err(|e| e.to_string())?;

        let mut address = Self::default();
        for child in root.children() {
            if let Some(field) = address.field_mut(child.local_name()) {
                *field = Some(child.text());
            }
        }
        Ok(address)
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    /// Free text.
    Text(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Signed integer.
    Integer(i64),
    /// Boolean.
    Boolean(bool),
    /// Gender code.
    Gender(Gender),
    /// Postal address.
    PostalAddress(PostalAddress),
}

impl AttributeValue {
    /// Returns the kind of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Date(_) => ValueKind::Date,
            Self::Integer(_) => ValueKind::Integer,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Gender(_) => ValueKind::Gender,
            Self::PostalAddress(_) => ValueKind::PostalAddress,
        }
    }

    /// Returns the text if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl ValueKind {
    /// Produces the canonical wire string of `value`.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch if `value` is not of this kind.
    pub fn marshal(self, value: &AttributeValue) -> Result<String, String> {
        match (self, value) {
            (Self::Text, AttributeValue::Text(text)) => Ok(text.clone()),
            (Self::Date, AttributeValue::Date(date)) => Ok(date.format(DATE_FORMAT).to_string()),
            (Self::Integer, AttributeValue::Integer(n)) => Ok(n.to_string()),
            (Self::Boolean, AttributeValue::Boolean(b)) => Ok(b.to_string()),
            (Self::Gender, AttributeValue::Gender(g)) => Ok(g.as_str().to_string()),
            (Self::PostalAddress, AttributeValue::PostalAddress(a)) => Ok(a.to_wire()),
            (expected, other) => Err(format!("expected a {expected} value, got a {}", other.kind())),
        }
    }

    /// Parses a wire string as a value of this kind.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if `wire` is not a valid value.
    pub fn unmarshal(self, wire: &str) -> Result<AttributeValue, String> {
        let trimmed = wire.trim();
        match self {
            Self::Text => Ok(AttributeValue::Text(wire.to_string())),
            Self::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(AttributeValue::Date)
                .map_err(|e| format!("{trimmed:?} is not a YYYY-MM-DD date: {e}")),
            Self::Integer => trimmed
                .parse()
                .map(AttributeValue::Integer)
                .map_err(|e| format!("{trimmed:?} is not an integer: {e}")),
            Self::Boolean => match trimmed {
                "true" | "1" => Ok(AttributeValue::Boolean(true)),
                "false" | "0" => Ok(AttributeValue::Boolean(false)),
                _ => Err(format!("{trimmed:?} is not a boolean")),
            },
            Self::Gender => Gender::parse(trimmed)
                .map(AttributeValue::Gender)
                .ok_or_else(|| format!("{trimmed:?} is not a gender code")),
            Self::PostalAddress => PostalAddress::from_wire(trimmed).map(AttributeValue::PostalAddress),
        }
    }
}
