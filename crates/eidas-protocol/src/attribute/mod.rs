//! eIDAS attributes.
//!
//! Every attribute exchanged with a partner is described by an
//! [`AttributeDefinition`] held in an [`AttributeRegistry`]. The definition
//! names the [`ValueKind`] of its values, which drives conversion between the
//! wire string and the typed [`AttributeValue`].

mod definition;
mod registry;
mod value;

pub use definition::{AttributeDefinition, AttributeDefinitionBuilder, PersonType};
pub use registry::AttributeRegistry;
pub use value::{AttributeValue, Gender, PostalAddress, ValueKind};

use thiserror::Error;

/// Result type for attribute operations.
pub type AttributeResult<T> = Result<T, AttributeError>;

/// Attribute definition and codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    /// A typed value could not be converted to its wire form.
    #[error("cannot marshal {name}: {reason}")]
    Marshalling {
        /// Attribute name URI.
        name: String,
        /// What went wrong.
        reason: String,
    },

    /// A wire value could not be converted to its typed form.
    #[error("cannot unmarshal {name}: {reason}")]
    Unmarshalling {
        /// Attribute name URI.
        name: String,
        /// What went wrong.
        reason: String,
    },

    /// Two definitions share a name URI.
    #[error("attribute {0} is defined twice")]
    DuplicateName(String),

    /// Two definitions of one person type share a friendly name.
    #[error("friendly name {friendly_name} is defined twice for {person_type:?}")]
    DuplicateFriendlyName {
        /// Person type of both definitions.
        person_type: PersonType,
        /// Conflicting friendly name.
        friendly_name: String,
    },

    /// The attribute is not registered.
    #[error("unknown attribute {0}")]
    Unknown(String),

    /// A definition is incomplete.
    #[error("invalid attribute definition: {0}")]
    InvalidDefinition(String),
}
