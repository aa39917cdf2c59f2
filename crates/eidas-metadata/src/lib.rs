//! # eidas-metadata
//!
//! Partner metadata handling for the eIDAS node.
//!
//! This crate provides:
//!
//! - A hardened XML element tree used for every partner document
//! - Extraction of eIDAS parameters from SAML metadata
//! - The [`MetadataResolver`], which fetches, verifies and caches metadata
//! - The [`Signer`] seam for XML signature creation and verification

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod certificate;
pub mod error;
pub mod loader;
pub mod parameters;
pub mod parser;
pub mod policy;
pub mod resolver;
pub mod signature;
pub mod xml;

pub use cache::MetadataCache;
pub use certificate::Certificate;
pub use error::{MetadataError, MetadataResult};
pub use loader::{LoaderError, MetadataLoader, StaticMetadataLoader};
pub use parameters::{EidasMetadataParameters, Endpoint, Role, RoleDescriptor};
pub use policy::UrlPolicy;
pub use resolver::MetadataResolver;
pub use signature::{SignatureAlgorithm, SignatureError, Signer};
pub use xml::{Element, XmlError};
