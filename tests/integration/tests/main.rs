//! End-to-end tests of the eIDAS node.
//!
//! A Connector and a Proxy-Service engine exchange real messages through
//! fake signature and encryption implementations.

mod common;
mod connector_flow;
mod metadata_trust;
mod proxy_flow;
mod response_rejection;
