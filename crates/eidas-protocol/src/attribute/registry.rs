//! Attribute registry.

use std::collections::HashMap;

use super::definition::{AttributeDefinition, PersonType};
use super::value::ValueKind;
use super::{AttributeError, AttributeResult};
use crate::constants::{EIDAS_LEGAL_NS, EIDAS_NATURAL_NS};

/// Immutable set of attribute definitions keyed by name URI.
///
/// Names are unique, and friendly names are unique within a person type.
#[derive(Debug, Clone, Default)]
pub struct AttributeRegistry {
    definitions: Vec<AttributeDefinition>,
    by_name: HashMap<String, usize>,
}

impl AttributeRegistry {
    /// Builds a registry.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::DuplicateName`] or
    /// [`AttributeError::DuplicateFriendlyName`] on conflicting definitions.
    pub fn new(definitions: impl IntoIterator<Item = AttributeDefinition>) -> AttributeResult<Self> {
        let mut registry = Self::default();
        for definition in definitions {
            registry.insert(definition)?;
        }
        Ok(registry)
    }

    fn insert(&mut self, definition: AttributeDefinition) -> AttributeResult<()> {
        if self.by_name.contains_key(definition.name_uri()) {
            return Err(AttributeError::DuplicateName(definition.name_uri().to_string()));
        }
        if self
            .by_friendly_name(definition.person_type(), definition.friendly_name())
            .is_some()
        {
            return Err(AttributeError::DuplicateFriendlyName {
                person_type: definition.person_type(),
                friendly_name: definition.friendly_name().to_string(),
            });
        }

        self.by_name
            .insert(definition.name_uri().to_string(), self.definitions.len());
        self.definitions.push(definition);
        Ok(())
    }

    /// Builds the eIDAS minimum data sets for natural and legal persons and
    /// their representatives.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in set; the result type is shared with
    /// [`AttributeRegistry::new`].
    pub fn eidas() -> AttributeResult<Self> {
        let natural = |local: &str, friendly: &str, kind: ValueKind| {
            AttributeDefinition::builder(format!("{EIDAS_NATURAL_NS}/{local}"), friendly)
                .person_type(PersonType::NaturalPerson)
                .xml_type(format!("eidas-natural:{local}Type"))
                .value_kind(kind)
        };
        let legal = |local: &str, friendly: &str, kind: ValueKind| {
            AttributeDefinition::builder(format!("{EIDAS_LEGAL_NS}/{local}"), friendly)
                .person_type(PersonType::LegalPerson)
                .xml_type(format!("eidas-legal:{local}Type"))
                .value_kind(kind)
        };
        let representative = |local: &str, friendly: &str, kind: ValueKind| {
            AttributeDefinition::builder(
                format!("{EIDAS_NATURAL_NS}/representative/{local}"),
                friendly,
            )
            .person_type(PersonType::Representative)
            .xml_type(format!("eidas-natural:{local}Type"))
            .value_kind(kind)
        };

        let builders = [
            natural("PersonIdentifier", "PersonIdentifier", ValueKind::Text)
                .required(true)
                .unique_identifier(true),
            natural("CurrentFamilyName", "FamilyName", ValueKind::Text).required(true),
            natural("CurrentGivenName", "FirstName", ValueKind::Text).required(true),
            natural("DateOfBirth", "DateOfBirth", ValueKind::Date).required(true),
            natural("BirthName", "BirthName", ValueKind::Text),
            natural("PlaceOfBirth", "PlaceOfBirth", ValueKind::Text),
            natural("CurrentAddress", "CurrentAddress", ValueKind::PostalAddress),
            natural("Gender", "Gender", ValueKind::Gender),
            legal("LegalPersonIdentifier", "LegalPersonIdentifier", ValueKind::Text)
                .required(true)
                .unique_identifier(true),
            legal("LegalName", "LegalName", ValueKind::Text).required(true),
            legal("LegalPersonAddress", "LegalAddress", ValueKind::PostalAddress),
            legal("VATRegistrationNumber", "VATRegistration", ValueKind::Text),
            legal("TaxReference", "TaxReference", ValueKind::Text),
            legal("LEI", "LEI", ValueKind::Text),
            legal("EORI", "EORI", ValueKind::Text),
            legal("SEED", "SEED", ValueKind::Text),
            legal("SIC", "SIC", ValueKind::Text),
            representative("PersonIdentifier", "PersonIdentifier", ValueKind::Text)
                .unique_identifier(true),
            representative("CurrentFamilyName", "FamilyName", ValueKind::Text),
            representative("CurrentGivenName", "FirstName", ValueKind::Text),
            representative("DateOfBirth", "DateOfBirth", ValueKind::Date),
        ];

        let definitions = builders
            .into_iter()
            .map(|builder| builder.build())
            .collect::<AttributeResult<Vec<_>>>()?;
        Self::new(definitions)
    }

    /// Looks up a definition by name URI.
    #[must_use]
    pub fn get(&self, name_uri: &str) -> Option<&AttributeDefinition> {
        self.by_name.get(name_uri).map(|&i| &self.definitions[i])
    }

    /// Looks up a definition by name URI.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Unknown`] if the name is not registered.
    pub fn require(&self, name_uri: &str) -> AttributeResult<&AttributeDefinition> {
        self.get(name_uri)
            .ok_or_else(|| AttributeError::Unknown(name_uri.to_string()))
    }

    /// Looks up a definition by friendly name within a person type.
    #[must_use]
    pub fn by_friendly_name(
        &self,
        person_type: PersonType,
        friendly_name: &str,
    ) -> Option<&AttributeDefinition> {
        self.definitions
            .iter()
            .find(|d| d.person_type() == person_type && d.friendly_name() == friendly_name)
    }

    /// Iterates over the definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.definitions.iter()
    }

    /// Returns the number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
