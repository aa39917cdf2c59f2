//! Attribute definitions.

use serde::{Deserialize, Serialize};

use super::value::{AttributeValue, ValueKind};
use super::{AttributeError, AttributeResult};

/// Subject category an attribute describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonType {
    /// Natural person.
    NaturalPerson,
    /// Legal person.
    LegalPerson,
    /// Natural person acting on behalf of another.
    Representative,
}

/// Definition of one attribute: its name, its XML type and its value kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    name_uri: String,
    friendly_name: String,
    person_type: PersonType,
    required: bool,
    unique_identifier: bool,
    xml_type: String,
    value_kind: ValueKind,
}

impl AttributeDefinition {
    /// Starts a definition.
    #[must_use]
    pub fn builder(
        name_uri: impl Into<String>,
        friendly_name: impl Into<String>,
    ) -> AttributeDefinitionBuilder {
        AttributeDefinitionBuilder {
            name_uri: name_uri.into(),
            friendly_name: friendly_name.into(),
            person_type: PersonType::NaturalPerson,
            required: false,
            unique_identifier: false,
            xml_type: None,
            value_kind: ValueKind::Text,
        }
    }

    /// Attribute name URI.
    #[must_use]
    pub fn name_uri(&self) -> &str {
        &self.name_uri
    }

    /// Short name.
    #[must_use]
    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    /// Subject category.
    #[must_use]
    pub const fn person_type(&self) -> PersonType {
        self.person_type
    }

    /// Whether the attribute belongs to the minimum data set.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the attribute uniquely identifies the subject.
    #[must_use]
    pub const fn is_unique_identifier(&self) -> bool {
        self.unique_identifier
    }

    /// Qualified `xsi:type` of the attribute values.
    #[must_use]
    pub fn xml_type(&self) -> &str {
        &self.xml_type
    }

    /// Value kind carried by the attribute.
    #[must_use]
    pub const fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    /// Converts a typed value to its wire string.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Marshalling`] if the value is not of the
    /// definition's kind.
    pub fn marshal(&self, value: &AttributeValue) -> AttributeResult<String> {
        self.value_kind
            .marshal(value)
            .map_err(|reason| AttributeError::Marshalling {
                name: self.name_uri.clone(),
                reason,
            })
    }

    /// Parses a wire string into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Unmarshalling`] if the string is not a valid
    /// value of the definition's kind.
    pub fn unmarshal(&self, wire: &str) -> AttributeResult<AttributeValue> {
        self.value_kind
            .unmarshal(wire)
            .map_err(|reason| AttributeError::Unmarshalling {
                name: self.name_uri.clone(),
                reason,
            })
    }
}

/// Builder for [`AttributeDefinition`].
#[derive(Debug, Clone)]
pub struct AttributeDefinitionBuilder {
    name_uri: String,
    friendly_name: String,
    person_type: PersonType,
    required: bool,
    unique_identifier: bool,
    xml_type: Option<String>,
    value_kind: ValueKind,
}

impl AttributeDefinitionBuilder {
    /// Sets the subject category.
    #[must_use]
    pub const fn person_type(mut self, person_type: PersonType) -> Self {
        self.person_type = person_type;
        self
    }

    /// Marks the attribute as part of the minimum data set.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Marks the attribute as a unique identifier.
    #[must_use]
    pub const fn unique_identifier(mut self, unique: bool) -> Self {
        self.unique_identifier = unique;
        self
    }

    /// Sets the qualified `xsi:type`.
    #[must_use]
    pub fn xml_type(mut self, xml_type: impl Into<String>) -> Self {
        self.xml_type = Some(xml_type.into());
        self
    }

    /// Sets the value kind.
    #[must_use]
    pub const fn value_kind(mut self, kind: ValueKind) -> Self {
        self.value_kind = kind;
        self
    }

    /// Builds the definition.
    ///
    /// Without an explicit XML type, `xs:string` is used.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::InvalidDefinition`] if the name URI or the
    /// friendly name is blank.
    pub fn build(self) -> AttributeResult<AttributeDefinition> {
        if self.name_uri.trim().is_empty() {
            return Err(AttributeError::InvalidDefinition("blank name URI".into()));
        }
        if self.friendly_name.trim().is_empty() {
            return Err(AttributeError::InvalidDefinition(format!(
                "{} has a blank friendly name",
                self.name_uri
            )));
        }

        Ok(AttributeDefinition {
            name_uri: self.name_uri,
            friendly_name: self.friendly_name,
            person_type: self.person_type,
            required: self.required,
            unique_identifier: self.unique_identifier,
            xml_type: self.xml_type.unwrap_or_else(|| "xs:string".to_string()),
            value_kind: self.value_kind,
        })
    }
}
