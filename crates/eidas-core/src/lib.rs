//! # eidas-core
//!
//! Foundational types shared by the eIDAS node crates.
//!
//! This crate provides the engine configuration, the error taxonomy used to
//! classify protocol failures, structured audit events, the protocol version
//! type and the injectable clock.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod time;
pub mod version;

pub use config::EngineConfig;
pub use error::{Error, ErrorKind, Result};
pub use event::{Event, EventListener, EventOutcome, EventType};
pub use time::{FixedTimeSource, SystemTimeSource, TimeSource};
pub use version::ProtocolVersion;
