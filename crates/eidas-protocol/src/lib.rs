//! eIDAS SAML protocol engine.
//!
//! This crate implements the message layer of an eIDAS node:
//!
//! - **Request generation and validation** - `AuthnRequest` with the eIDAS
//!   extensions, signed and recorded for correlation
//! - **Response generation and validation** - signed responses with one
//!   optionally encrypted assertion, checked in a fixed order before the
//!   pending request is consumed
//! - **Attribute codec** - typed attribute values and the registry of eIDAS
//!   attribute definitions
//!
//! # Architecture
//!
//! - [`engine`] - the [`ProtocolEngine`] and its builder
//! - [`types`] - request, response and status model
//! - [`attribute`] - attribute definitions, values and registry
//! - [`cipher`] - the assertion encryption seam
//! - [`constants`] - namespaces and profile vocabularies
//! - [`error`] - error types for protocol operations
//!
//! XML signatures are delegated to a [`Signer`], shared with metadata
//! verification.
//!
//! # Example
//!
//! ```rust,ignore
//! use eidas_protocol::{AuthenticationRequest, ProtocolEngine};
//!
//! let engine = ProtocolEngine::builder(config)
//!     .signer(signer)
//!     .cipher(cipher)
//!     .metadata(resolver)
//!     .build()?;
//!
//! let request = AuthenticationRequest::builder()
//!     .issuer("https://connector.example.eu/metadata")
//!     .destination("https://proxy.example.eu/sso")
//!     .citizen_country_code("BE")
//!     .requested_attribute(PERSON_IDENTIFIER, true)
//!     .build();
//! let message = engine
//!     .generate_request(request, "https://proxy.example.eu/metadata")
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attribute;
pub mod cipher;
pub mod constants;
pub mod engine;
pub mod error;
mod profile;
pub mod types;
mod wire;

pub use attribute::{
    AttributeDefinition, AttributeError, AttributeRegistry, AttributeValue, PersonType, ValueKind,
};
pub use cipher::{Cipher, CipherError};
pub use engine::{ProtocolEngine, ProtocolEngineBuilder};
pub use error::{ProtocolError, ProtocolResult};
pub use types::*;

pub use eidas_metadata::{Certificate, SignatureAlgorithm, SignatureError, Signer};
