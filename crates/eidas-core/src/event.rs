//! Audit events for protocol operations.
//!
//! Every request generated, every message validated or rejected, and every
//! metadata resolution produces an [`Event`]. Events carry the message
//! identifiers, the partner involved, the outcome and, for failures, the
//! detailed reason that is withheld from the peer.

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // Connector side
    /// Authentication request generated and signed.
    RequestGenerated,
    /// Authentication request could not be generated.
    RequestGenerationError,
    /// Authentication response accepted.
    ResponseValidated,
    /// Authentication response rejected.
    ResponseRejected,
    /// Response referenced an unknown or already consumed request.
    ReplayDetected,

    // Proxy-Service side
    /// Authentication request accepted.
    RequestValidated,
    /// Authentication request rejected.
    RequestRejected,
    /// Authentication response generated and signed.
    ResponseGenerated,

    // Metadata
    /// Partner metadata fetched, verified and cached.
    MetadataResolved,
    /// Partner metadata could not be resolved.
    MetadataRejected,
}

/// Outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// A protocol event for audit logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Type of event.
    pub event_type: EventType,

    /// Outcome of the event.
    pub outcome: EventOutcome,

    /// Identifier of the SAML message concerned.
    pub message_id: Option<String>,

    /// `InResponseTo` of the message, for responses.
    pub in_response_to: Option<String>,

    /// Issuer of the message or the partner entity id.
    pub issuer: Option<String>,

    /// Destination of the message.
    pub destination: Option<String>,

    /// Peer IP address.
    pub ip_address: Option<String>,

    /// Detailed failure reason (for failure events).
    pub error: Option<String>,

    /// Additional details as key-value pairs.
    pub details: Vec<(String, String)>,
}

impl Event {
    /// Creates a new event builder.
    #[must_use]
    pub const fn builder(event_type: EventType) -> EventBuilder {
        EventBuilder::new(event_type)
    }

    /// Returns the value of a detail, if present.
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Builder for creating events.
#[derive(Debug)]
pub struct EventBuilder {
    event_type: EventType,
    outcome: EventOutcome,
    message_id: Option<String>,
    in_response_to: Option<String>,
    issuer: Option<String>,
    destination: Option<String>,
    ip_address: Option<String>,
    error: Option<String>,
    details: Vec<(String, String)>,
}

impl EventBuilder {
    /// Creates a new event builder.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            outcome: EventOutcome::Success,
            message_id: None,
            in_response_to: None,
            issuer: None,
            destination: None,
            ip_address: None,
            error: None,
            details: Vec::new(),
        }
    }

    /// Sets the outcome to success.
    #[must_use]
    pub const fn success(mut self) -> Self {
        self.outcome = EventOutcome::Success;
        self
    }

    /// Sets the outcome to failure with an error message.
    #[must_use]
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.outcome = EventOutcome::Failure;
        self.error = Some(error.into());
        self
    }

    /// Sets the message identifier.
    #[must_use]
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Sets the identifier of the request being answered.
    #[must_use]
    pub fn in_response_to(mut self, id: impl Into<String>) -> Self {
        self.in_response_to = Some(id.into());
        self
    }

    /// Sets the issuer.
    #[must_use]
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sets the destination.
    #[must_use]
    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Sets the IP address.
    #[must_use]
    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Adds a detail key-value pair.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    /// Builds the event stamped with the current wall time.
    #[must_use]
    pub fn build(self) -> Event {
        self.build_at(Utc::now())
    }

    /// Builds the event stamped with `timestamp`.
    #[must_use]
    pub fn build_at(self, timestamp: DateTime<Utc>) -> Event {
        Event {
            id: Uuid::now_v7(),
            timestamp,
            event_type: self.event_type,
            outcome: self.outcome,
            message_id: self.message_id,
            in_response_to: self.in_response_to,
            issuer: self.issuer,
            destination: self.destination,
            ip_address: self.ip_address,
            error: self.error,
            details: self.details,
        }
    }
}

// ============================================================================
// Event Listener Trait
// ============================================================================

/// Receiver of audit events.
///
/// Delivery is synchronous and must not fail the protocol operation; a
/// listener that forwards events elsewhere is responsible for its own
/// buffering.
pub trait EventListener: Send + Sync + fmt::Debug {
    /// Handles one event.
    fn on_event(&self, event: &Event);
}

/// Event listener that writes to the tracing framework at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventListener;

impl TracingEventListener {
    /// Creates a new tracing listener.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EventListener for TracingEventListener {
    fn on_event(&self, event: &Event) {
        tracing::info!(
            event_id = %event.id,
            event_type = ?event.event_type,
            outcome = ?event.outcome,
            message_id = ?event.message_id,
            in_response_to = ?event.in_response_to,
            issuer = ?event.issuer,
            destination = ?event.destination,
            ip_address = ?event.ip_address,
            error = ?event.error,
            "protocol_event"
        );
    }
}

/// In-memory event listener for testing.
#[derive(Debug, Default)]
pub struct InMemoryEventListener {
    events: RwLock<Vec<Event>>,
}

impl InMemoryEventListener {
    /// Creates a new in-memory listener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Returns recorded events of one type.
    #[must_use]
    pub fn events_of(&self, event_type: EventType) -> Vec<Event> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Clears all recorded events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl EventListener for InMemoryEventListener {
    fn on_event(&self, event: &Event) {
        self.events.write().push(event.clone());
    }
}
