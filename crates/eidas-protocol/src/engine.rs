//! The eIDAS protocol engine.
//!
//! [`ProtocolEngine`] generates and validates the four message flows of an
//! eIDAS node:
//!
//! - the Connector generates requests and validates the responses to them;
//! - the Proxy-Service validates requests and generates success or error
//!   responses.
//!
//! Every operation resolves the partner's metadata first and emits exactly one
//! audit [`Event`] describing its outcome.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use eidas_cache::{CorrelationStore, ReplayGuard, StoredRequest};
use eidas_core::event::TracingEventListener;
use eidas_core::{
    EngineConfig, Error, Event, EventListener, EventType, ProtocolVersion, SystemTimeSource,
    TimeSource,
};
use eidas_metadata::parameters::Role;
use eidas_metadata::xml::{self, Element};
use eidas_metadata::{EidasMetadataParameters, MetadataResolver, SignatureAlgorithm, Signer};

use crate::attribute::AttributeRegistry;
use crate::cipher::Cipher;
use crate::error::{ProtocolError, ProtocolResult};
use crate::profile;
use crate::types::{AuthenticationRequest, AuthenticationResponse, SignedMessage, Status};
use crate::wire;

/// Identifiers seen while processing an inbound message, for the audit trail.
#[derive(Debug, Default)]
struct Seen {
    message_id: Option<String>,
    in_response_to: Option<String>,
    issuer: Option<String>,
}

impl Seen {
    fn apply(&self, mut builder: eidas_core::event::EventBuilder) -> eidas_core::event::EventBuilder {
        if let Some(id) = &self.message_id {
            builder = builder.message_id(id.clone());
        }
        if let Some(id) = &self.in_response_to {
            builder = builder.in_response_to(id.clone());
        }
        if let Some(issuer) = &self.issuer {
            builder = builder.issuer(issuer.clone());
        }
        builder
    }
}

/// Generates and validates eIDAS SAML messages.
///
/// The engine is cheap to share behind an [`Arc`]; all state lives in the
/// metadata cache, the correlation store and the replay guard.
#[derive(Debug)]
pub struct ProtocolEngine {
    config: EngineConfig,
    signature_algorithms: Vec<SignatureAlgorithm>,
    signer: Arc<dyn Signer>,
    cipher: Arc<dyn Cipher>,
    metadata: Arc<MetadataResolver>,
    correlation: Arc<CorrelationStore<AuthenticationRequest>>,
    replay: Arc<ReplayGuard>,
    registry: Arc<AttributeRegistry>,
    clock: Arc<dyn TimeSource>,
    listener: Arc<dyn EventListener>,
}

impl ProtocolEngine {
    /// Starts building an engine.
    pub fn builder(config: EngineConfig) -> ProtocolEngineBuilder {
        ProtocolEngineBuilder::new(config)
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the attribute registry.
    #[must_use]
    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    /// Returns the correlation store.
    #[must_use]
    pub fn correlation(&self) -> &CorrelationStore<AuthenticationRequest> {
        &self.correlation
    }

    // ------------------------------------------------------------------
    // Connector side
    // ------------------------------------------------------------------

    /// Builds, signs and records an authentication request for the
    /// Proxy-Service whose metadata is published at `destination_url`.
    ///
    /// Expired pending requests are swept first. The signed request is only
    /// returned once it is recorded for correlation.
    ///
    /// # Errors
    ///
    /// - metadata failures ([`ProtocolError::Metadata`])
    /// - no shared protocol version or signature algorithm
    /// - profile violations in the request
    /// - [`ProtocolError::IdCollision`] if the id is already pending
    pub async fn generate_request(
        &self,
        request: AuthenticationRequest,
        destination_url: &str,
    ) -> ProtocolResult<SignedMessage> {
        let now = self.clock.now();

        if let Err(err) = self.correlation.sweep_expired(now).await {
            tracing::warn!(error = %err, "failed to sweep expired pending requests");
        }

        let request_id = request.id().to_string();
        let issuer = request.issuer().to_string();
        let result = self.generate_request_inner(request, destination_url, now).await;

        let event = Event::builder(EventType::RequestGenerated)
            .message_id(request_id.clone())
            .issuer(issuer)
            .destination(destination_url);
        match &result {
            Ok(message) => {
                tracing::info!(
                    request_id = %request_id,
                    destination = %destination_url,
                    version = ?message.protocol_version,
                    algorithm = %message.signature_algorithm,
                    "authentication request generated"
                );
                self.listener.on_event(
                    &event
                        .detail("signature_algorithm", message.signature_algorithm.uri())
                        .build_at(now),
                );
            }
            Err(err) => {
                log_failure("request generation", &request_id, err);
                self.listener.on_event(
                    &Event::builder(EventType::RequestGenerationError)
                        .failure(err.to_string())
                        .message_id(request_id)
                        .destination(destination_url)
                        .detail("kind", format!("{:?}", err.kind()))
                        .build_at(now),
                );
            }
        }
        result
    }

    async fn generate_request_inner(
        &self,
        request: AuthenticationRequest,
        destination_url: &str,
        now: DateTime<Utc>,
    ) -> ProtocolResult<SignedMessage> {
        let params = self.metadata.resolve(destination_url, now).await?;
        if params.role(Role::Idp).is_none() {
            return Err(ProtocolError::validation(format!(
                "{destination_url} does not publish a Proxy-Service role"
            )));
        }

        let version = negotiate_version(&self.config.protocol.supported_versions, &params)?;
        profile::validate_request(&request, &self.registry)?;
        let algorithm = select_signature_algorithm(&self.signature_algorithms, &params)?;
        let request = request.with_protocol_version(version);

        let unsigned = wire::request::to_element(&request, &self.registry)?.to_xml();
        let signed = self
            .signer
            .sign(&unsigned, request.id(), algorithm)
            .map_err(ProtocolError::Signing)?;

        let id = request.id().to_string();
        let issuer = request.issuer().to_string();
        let stored = StoredRequest::new(issuer, destination_url, now, request);
        self.correlation.put(&id, stored).await?;

        Ok(SignedMessage {
            id,
            bytes: signed.into_bytes(),
            protocol_version: Some(version),
            signature_algorithm: algorithm,
        })
    }

    /// Validates a response received from a Proxy-Service.
    ///
    /// Checks run in a fixed order: size and well-formedness, profile
    /// structure, signature against the issuer's metadata, decryption,
    /// assertion issuer and `InResponseTo` against the response, validity
    /// window, audience and bearer address, then correlation. The
    /// pending request is consumed only once every earlier check passed, so
    /// a response is accepted at most once.
    ///
    /// `skew_before` and `skew_after` widen the assertion validity window.
    /// With `expected_audience`, the audience restriction must name it.
    ///
    /// # Errors
    ///
    /// Returns the first failed check. Use [`ProtocolError::kind`] to decide
    /// how to report it.
    pub async fn validate_response(
        &self,
        bytes: &[u8],
        responder_ip: &str,
        skew_before: Duration,
        skew_after: Duration,
        expected_audience: Option<&str>,
    ) -> ProtocolResult<AuthenticationResponse> {
        let now = self.clock.now();
        let mut seen = Seen::default();
        let result = self
            .validate_response_inner(
                bytes,
                responder_ip,
                (to_chrono(skew_before), to_chrono(skew_after)),
                expected_audience,
                now,
                &mut seen,
            )
            .await;

        match &result {
            Ok(response) => {
                tracing::info!(
                    response_id = %response.id,
                    in_response_to = %response.in_response_to,
                    issuer = %response.issuer,
                    success = response.is_success(),
                    "authentication response accepted"
                );
                self.listener.on_event(
                    &seen
                        .apply(Event::builder(EventType::ResponseValidated))
                        .ip_address(responder_ip)
                        .detail("status", response.status.code.uri())
                        .build_at(now),
                );
            }
            Err(err) => {
                let id = seen.message_id.clone().unwrap_or_default();
                log_failure("response validation", &id, err);
                let event_type = if matches!(err, ProtocolError::UnknownOrReplayedResponse(_)) {
                    EventType::ReplayDetected
                } else {
                    EventType::ResponseRejected
                };
                self.listener.on_event(
                    &seen
                        .apply(Event::builder(event_type))
                        .failure(err.to_string())
                        .ip_address(responder_ip)
                        .detail("kind", format!("{:?}", err.kind()))
                        .build_at(now),
                );
            }
        }
        result
    }

    async fn validate_response_inner(
        &self,
        bytes: &[u8],
        responder_ip: &str,
        (skew_before, skew_after): (chrono::Duration, chrono::Duration),
        expected_audience: Option<&str>,
        now: DateTime<Utc>,
        seen: &mut Seen,
    ) -> ProtocolResult<AuthenticationResponse> {
        let root = self.parse_message(bytes)?;
        tracing::trace!(state = "parsed", "validating response");

        profile::check_version(&root)?;
        let header = wire::response::read_header(&root)?;
        seen.message_id = Some(header.id.clone());
        seen.in_response_to = Some(header.in_response_to.clone());
        seen.issuer = Some(header.issuer.clone());
        profile::check_consent(header.consent.as_deref())?;
        profile::check_signature_present(&root)?;

        let plain: Vec<&Element> = root.children_named("Assertion").collect();
        let encrypted: Vec<&Element> = root.children_named("EncryptedAssertion").collect();
        profile::check_assertion_count(&header.status, plain.len() + encrypted.len())?;
        tracing::trace!(state = "structurally_valid", response_id = %header.id, "validating response");

        let params = self.metadata.resolve(&header.issuer, now).await?;
        let certificates = params.signing_certificates(Role::Idp);
        if certificates.is_empty() {
            return Err(ProtocolError::validation(format!(
                "{} publishes no Proxy-Service signing certificate",
                header.issuer
            )));
        }
        self.signer
            .verify(as_text(bytes)?, Some(certificates))
            .map_err(ProtocolError::SignatureInvalid)?;
        tracing::trace!(state = "signature_verified", response_id = %header.id, "validating response");

        let assertion = match (encrypted.first(), plain.first()) {
            (Some(encrypted), _) => {
                let decrypted = self
                    .cipher
                    .decrypt(&encrypted.to_xml())
                    .map_err(ProtocolError::Decryption)?;
                let assertion = self.parse_message(decrypted.as_bytes())?;
                if assertion.child("Signature").is_some() {
                    self.signer
                        .verify(&decrypted, Some(certificates))
                        .map_err(ProtocolError::SignatureInvalid)?;
                }
                Some(assertion)
            }
            (None, Some(_)) if self.config.protocol.require_encrypted_assertions => {
                return Err(ProtocolError::UnencryptedAssertion);
            }
            (None, Some(plain)) => Some((*plain).clone()),
            (None, None) => None,
        };
        tracing::trace!(state = "decrypted", response_id = %header.id, "validating response");

        let content = match &assertion {
            Some(assertion) => {
                profile::check_assertion_shape(assertion)?;
                let content = wire::response::read_assertion(assertion)?;
                profile::check_assertion_binding(
                    content.issuer.as_deref(),
                    content.in_response_to.as_deref(),
                    &header.issuer,
                    &header.in_response_to,
                )?;
                profile::check_time_window(
                    content.not_before,
                    content.not_on_or_after,
                    now,
                    skew_before,
                    skew_after,
                )?;
                profile::check_audience(content.audience.as_deref(), expected_audience)?;
                if self.config.protocol.check_bearer_ip {
                    profile::check_bearer_ip(content.ip_address.as_deref(), responder_ip)?;
                }
                Some(content)
            }
            None => None,
        };
        tracing::trace!(state = "time_valid", response_id = %header.id, "validating response");

        let stored = self.correlation.take_once(&header.in_response_to).await?;
        if stored.destination != header.issuer {
            return Err(ProtocolError::IssuerMismatch {
                expected: stored.destination,
                actual: header.issuer,
            });
        }
        tracing::trace!(state = "correlated", response_id = %header.id, "validating response");

        let mut response = AuthenticationResponse::failure(header.issuer, header.status).build();
        response.id = header.id;
        response.in_response_to = header.in_response_to;
        response.destination = Some(header.destination);
        response.consent = header.consent;
        response.issue_instant = header.issue_instant;

        if let (Some(assertion), Some(content)) = (assertion, content) {
            profile::check_level_of_assurance(
                stored.request.level_of_assurance(),
                stored.request.loa_comparison(),
                content.level_of_assurance.as_deref(),
            )?;
            response.attributes = wire::response::read_attributes(&assertion, &self.registry)?;
            response.subject = content.subject;
            response.subject_name_id_format = content.subject_name_id_format;
            response.level_of_assurance = content.level_of_assurance;
            response.not_before = content.not_before;
            response.not_on_or_after = content.not_on_or_after;
            response.audience = content.audience;
            response.ip_address = content.ip_address;
        }

        Ok(response)
    }

    // ------------------------------------------------------------------
    // Proxy-Service side
    // ------------------------------------------------------------------

    /// Validates an authentication request received from a Connector.
    ///
    /// The request is checked against the profile, its signature against the
    /// signing certificates in the issuer's metadata, and every requested
    /// attribute must be registered. A request id is accepted once per
    /// correlation TTL. The returned request carries the protocol version
    /// negotiated with the issuer.
    ///
    /// # Errors
    ///
    /// Returns the first failed check, [`ProtocolError::ReplayedRequest`] for
    /// an id already accepted.
    pub async fn validate_request(&self, bytes: &[u8]) -> ProtocolResult<AuthenticationRequest> {
        let now = self.clock.now();
        let mut seen = Seen::default();
        let result = self.validate_request_inner(bytes, now, &mut seen).await;

        match &result {
            Ok(request) => {
                tracing::info!(
                    request_id = %request.id(),
                    issuer = %request.issuer(),
                    citizen_country = %request.citizen_country_code(),
                    "authentication request accepted"
                );
                self.listener.on_event(
                    &seen
                        .apply(Event::builder(EventType::RequestValidated))
                        .destination(request.destination())
                        .detail("level_of_assurance", request.level_of_assurance())
                        .build_at(now),
                );
            }
            Err(err) => {
                let id = seen.message_id.clone().unwrap_or_default();
                log_failure("request validation", &id, err);
                let event_type = if matches!(err, ProtocolError::ReplayedRequest(_)) {
                    EventType::ReplayDetected
                } else {
                    EventType::RequestRejected
                };
                self.listener.on_event(
                    &seen
                        .apply(Event::builder(event_type))
                        .failure(err.to_string())
                        .detail("kind", format!("{:?}", err.kind()))
                        .build_at(now),
                );
            }
        }
        result
    }

    async fn validate_request_inner(
        &self,
        bytes: &[u8],
        now: DateTime<Utc>,
        seen: &mut Seen,
    ) -> ProtocolResult<AuthenticationRequest> {
        let root = self.parse_message(bytes)?;
        if !root.is("AuthnRequest") {
            return Err(ProtocolError::validation(format!(
                "expected AuthnRequest, found {}",
                root.local_name()
            )));
        }

        profile::check_version(&root)?;
        profile::check_consent(root.attr("Consent"))?;
        profile::check_signature_present(&root)?;
        let request = wire::request::from_element(&root)?;
        seen.message_id = Some(request.id().to_string());
        seen.issuer = Some(request.issuer().to_string());

        let params = self.metadata.resolve(request.issuer(), now).await?;
        let certificates = params.signing_certificates(Role::Sp);
        if certificates.is_empty() {
            return Err(ProtocolError::validation(format!(
                "{} publishes no Connector signing certificate",
                request.issuer()
            )));
        }
        self.signer
            .verify(as_text(bytes)?, Some(certificates))
            .map_err(ProtocolError::SignatureInvalid)?;

        profile::validate_request(&request, &self.registry)?;
        let version = negotiate_version(&self.config.protocol.supported_versions, &params)?;

        let fresh = self
            .replay
            .first_use(request.id())
            .await
            .map_err(ProtocolError::Correlation)?;
        if !fresh {
            return Err(ProtocolError::ReplayedRequest(request.id().to_string()));
        }

        Ok(request.with_protocol_version(version))
    }

    /// Builds and signs the response to `request`.
    ///
    /// The engine fills in correlation, audience, bearer address and the
    /// validity window. A successful response carries one assertion, signed
    /// and, when configured, encrypted for the requester. A failure status is
    /// handled as by [`Self::generate_error_response`].
    ///
    /// # Errors
    ///
    /// - metadata failures for the requester
    /// - the asserted level of assurance does not satisfy the request
    /// - an attribute value cannot be marshalled
    /// - signing or encryption failures
    pub async fn generate_response(
        &self,
        request: &AuthenticationRequest,
        response: AuthenticationResponse,
        ip_address: &str,
    ) -> ProtocolResult<SignedMessage> {
        if !response.is_success() {
            return self
                .generate_error_response(request, response.status, ip_address)
                .await;
        }
        self.respond(request, response, ip_address).await
    }

    /// Builds and signs a failure response to `request`.
    ///
    /// The response carries the status and no assertion.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Validation`] if `status` is a success status,
    /// otherwise as [`Self::generate_response`].
    pub async fn generate_error_response(
        &self,
        request: &AuthenticationRequest,
        status: Status,
        ip_address: &str,
    ) -> ProtocolResult<SignedMessage> {
        if status.is_success() {
            return Err(ProtocolError::validation(
                "an error response needs a failure status",
            ));
        }
        let response =
            AuthenticationResponse::failure(self.config.protocol.entity_id.clone(), status).build();
        self.respond(request, response, ip_address).await
    }

    async fn respond(
        &self,
        request: &AuthenticationRequest,
        response: AuthenticationResponse,
        ip_address: &str,
    ) -> ProtocolResult<SignedMessage> {
        let now = self.clock.now();
        let response_id = response.id.clone();
        let result = self.respond_inner(request, response, ip_address, now).await;

        match &result {
            Ok(message) => {
                tracing::info!(
                    response_id = %message.id,
                    in_response_to = %request.id(),
                    destination = %request.issuer(),
                    "authentication response generated"
                );
                self.listener.on_event(
                    &Event::builder(EventType::ResponseGenerated)
                        .message_id(message.id.clone())
                        .in_response_to(request.id())
                        .issuer(self.config.protocol.entity_id.clone())
                        .destination(request.issuer())
                        .ip_address(ip_address)
                        .build_at(now),
                );
            }
            Err(err) => {
                log_failure("response generation", &response_id, err);
                self.listener.on_event(
                    &Event::builder(EventType::ResponseGenerated)
                        .failure(err.to_string())
                        .message_id(response_id)
                        .in_response_to(request.id())
                        .destination(request.issuer())
                        .detail("kind", format!("{:?}", err.kind()))
                        .build_at(now),
                );
            }
        }
        result
    }

    async fn respond_inner(
        &self,
        request: &AuthenticationRequest,
        mut response: AuthenticationResponse,
        ip_address: &str,
        now: DateTime<Utc>,
    ) -> ProtocolResult<SignedMessage> {
        let params = self.metadata.resolve(request.issuer(), now).await?;
        let version = negotiate_version(&self.config.protocol.supported_versions, &params)?;
        let algorithm = select_signature_algorithm(&self.signature_algorithms, &params)?;

        response.issuer = self.config.protocol.entity_id.clone();
        response.in_response_to = request.id().to_string();
        response.destination = Some(assertion_consumer_service(request, &params)?);
        response.issue_instant = now;

        let mut root = wire::response::to_element(&response);

        if response.is_success() {
            profile::check_level_of_assurance(
                request.level_of_assurance(),
                request.loa_comparison(),
                response.level_of_assurance.as_deref(),
            )?;
            response.audience = Some(request.issuer().to_string());
            response.ip_address = Some(ip_address.to_string());
            response.not_before = Some(now);
            response.not_on_or_after =
                Some(now + chrono::Duration::seconds(self.config.protocol.assertion_validity_secs));

            let assertion_id = AuthenticationRequest::generate_id();
            let assertion =
                wire::response::assertion_element(&response, &assertion_id, &self.registry)?;
            let signed_assertion = self
                .signer
                .sign(&assertion.to_xml(), &assertion_id, algorithm)
                .map_err(ProtocolError::Signing)?;

            let assertion_xml = if self.config.protocol.encrypt_assertions {
                self.encrypt_for(&params, &signed_assertion)?
            } else {
                signed_assertion
            };
            root.push_child(xml::parse(assertion_xml.as_bytes(), self.config.max_message_size)?);
        }

        let signed = self
            .signer
            .sign(&root.to_xml(), &response.id, algorithm)
            .map_err(ProtocolError::Signing)?;
        if signed.len() > self.config.max_message_size {
            return Err(ProtocolError::MessageTooLarge {
                size: signed.len(),
                limit: self.config.max_message_size,
            });
        }

        Ok(SignedMessage {
            id: response.id,
            bytes: signed.into_bytes(),
            protocol_version: Some(version),
            signature_algorithm: algorithm,
        })
    }

    fn encrypt_for(
        &self,
        params: &EidasMetadataParameters,
        assertion_xml: &str,
    ) -> ProtocolResult<String> {
        let certificate = params.encryption_certificate(Role::Sp).ok_or_else(|| {
            ProtocolError::validation(format!(
                "{} publishes no encryption certificate",
                params.entity_id
            ))
        })?;

        let algorithm = &self.config.protocol.encryption_algorithm;
        let accepted = params
            .role(Role::Sp)
            .map_or(&[][..], |descriptor| descriptor.encryption_algorithms.as_slice());
        if !accepted.is_empty() && !accepted.contains(algorithm) {
            return Err(ProtocolError::validation(format!(
                "{} does not accept encryption algorithm {algorithm}",
                params.entity_id
            )));
        }

        self.cipher
            .encrypt(assertion_xml, certificate, algorithm)
            .map_err(ProtocolError::Encryption)
    }

    fn parse_message(&self, bytes: &[u8]) -> ProtocolResult<Element> {
        let limit = self.config.max_message_size;
        if bytes.len() > limit {
            return Err(ProtocolError::MessageTooLarge {
                size: bytes.len(),
                limit,
            });
        }
        Ok(xml::parse(bytes, limit)?)
    }
}

fn log_failure(operation: &str, message_id: &str, err: &ProtocolError) {
    let kind = err.kind();
    if kind.is_server_error() {
        tracing::error!(operation, message_id = %message_id, kind = ?kind, error = %err, "operation failed");
    } else if kind.is_security_relevant() {
        tracing::warn!(operation, message_id = %message_id, kind = ?kind, error = %err, "message refused");
    } else {
        tracing::info!(operation, message_id = %message_id, kind = ?kind, error = %err, "message refused");
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(36_500))
}

fn as_text(bytes: &[u8]) -> ProtocolResult<&str> {
    std::str::from_utf8(bytes).map_err(|_| ProtocolError::validation("message is not UTF-8"))
}

/// Picks the highest protocol version both sides speak.
///
/// A partner advertising no version is treated as speaking only the lowest
/// local one.
fn negotiate_version(
    local: &[ProtocolVersion],
    params: &EidasMetadataParameters,
) -> ProtocolResult<ProtocolVersion> {
    let remote = params.protocol_versions();
    let negotiated = if remote.is_empty() {
        local.iter().min().copied()
    } else {
        ProtocolVersion::highest_common(local, remote)
    };
    negotiated.ok_or_else(|| ProtocolError::IncompatibleProtocolVersion {
        local: local.to_vec(),
        remote: remote.to_vec(),
    })
}

/// Picks the first local signature algorithm the partner accepts.
fn select_signature_algorithm(
    local: &[SignatureAlgorithm],
    params: &EidasMetadataParameters,
) -> ProtocolResult<SignatureAlgorithm> {
    local
        .iter()
        .copied()
        .find(|algorithm| params.supports_signing_algorithm(algorithm.uri()))
        .ok_or_else(|| ProtocolError::NoCommonSignatureAlgorithm(params.entity_id.clone()))
}

/// Where the response to `request` goes: the requested consumer URL if the
/// requester's metadata lists it, else the first listed one.
fn assertion_consumer_service(
    request: &AuthenticationRequest,
    params: &EidasMetadataParameters,
) -> ProtocolResult<String> {
    let listed: Vec<&str> = params
        .role(Role::Sp)
        .map(|sp| {
            sp.assertion_consumer_services
                .iter()
                .map(|endpoint| endpoint.location.as_str())
                .collect()
        })
        .unwrap_or_default();

    match request.assertion_consumer_service_url() {
        Some(url) if listed.is_empty() || listed.contains(&url) => Ok(url.to_string()),
        Some(url) => Err(ProtocolError::validation(format!(
            "assertion consumer service {url} is not listed in {} metadata",
            request.issuer()
        ))),
        None => listed.first().map(|url| (*url).to_string()).ok_or_else(|| {
            ProtocolError::validation(format!(
                "{} publishes no assertion consumer service",
                request.issuer()
            ))
        }),
    }
}

/// Builder for [`ProtocolEngine`].
///
/// Signer, cipher and metadata resolver are required. The clock defaults to
/// the system clock, audit events go to `tracing`, the registry holds the
/// eIDAS attribute set, and pending requests and accepted request ids are
/// kept in process.
#[must_use]
pub struct ProtocolEngineBuilder {
    config: EngineConfig,
    signer: Option<Arc<dyn Signer>>,
    cipher: Option<Arc<dyn Cipher>>,
    metadata: Option<Arc<MetadataResolver>>,
    correlation: Option<Arc<CorrelationStore<AuthenticationRequest>>>,
    replay: Option<Arc<ReplayGuard>>,
    registry: Option<Arc<AttributeRegistry>>,
    clock: Option<Arc<dyn TimeSource>>,
    listener: Option<Arc<dyn EventListener>>,
}

impl ProtocolEngineBuilder {
    fn new(config: EngineConfig) -> Self {
        Self {
            config,
            signer: None,
            cipher: None,
            metadata: None,
            correlation: None,
            replay: None,
            registry: None,
            clock: None,
            listener: None,
        }
    }

    /// Sets the XML signature implementation.
    pub fn signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Sets the XML encryption implementation.
    pub fn cipher(mut self, cipher: Arc<dyn Cipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Sets the metadata resolver.
    pub fn metadata(mut self, resolver: Arc<MetadataResolver>) -> Self {
        self.metadata = Some(resolver);
        self
    }

    /// Sets the correlation store, e.g. one backed by Redis.
    pub fn correlation(mut self, store: Arc<CorrelationStore<AuthenticationRequest>>) -> Self {
        self.correlation = Some(store);
        self
    }

    /// Sets the guard against replayed requests, e.g. one backed by Redis.
    pub fn request_replay(mut self, guard: Arc<ReplayGuard>) -> Self {
        self.replay = Some(guard);
        self
    }

    /// Sets the attribute registry.
    pub fn registry(mut self, registry: Arc<AttributeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the clock.
    pub fn clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the audit event listener.
    pub fn listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required collaborator is missing, the
    /// configuration is invalid, no entity id is configured or a configured
    /// signature algorithm is unknown.
    pub fn build(self) -> eidas_core::Result<ProtocolEngine> {
        self.config.validate()?;
        if self.config.protocol.entity_id.trim().is_empty() {
            return Err(Error::Config("protocol.entity_id must be set".into()));
        }

        let signature_algorithms = self
            .config
            .protocol
            .signature_algorithms
            .iter()
            .map(|uri| {
                SignatureAlgorithm::from_uri(uri)
                    .ok_or_else(|| Error::Config(format!("unsupported signature algorithm {uri}")))
            })
            .collect::<eidas_core::Result<Vec<_>>>()?;

        let signer = self
            .signer
            .ok_or_else(|| Error::Config("a signer is required".into()))?;
        let cipher = self
            .cipher
            .ok_or_else(|| Error::Config("a cipher is required".into()))?;
        let metadata = self
            .metadata
            .ok_or_else(|| Error::Config("a metadata resolver is required".into()))?;

        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(
                AttributeRegistry::eidas().map_err(|e| Error::Config(e.to_string()))?,
            ),
        };
        let clock: Arc<dyn TimeSource> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemTimeSource),
        };
        let correlation = self.correlation.unwrap_or_else(|| {
            Arc::new(CorrelationStore::local(
                self.config.correlation.max_entries,
                self.config.correlation_ttl(),
                Arc::clone(&clock),
            ))
        });
        let replay = self.replay.unwrap_or_else(|| {
            Arc::new(ReplayGuard::local(
                self.config.correlation.max_entries,
                self.config.correlation_ttl(),
            ))
        });
        let listener: Arc<dyn EventListener> = match self.listener {
            Some(listener) => listener,
            None => Arc::new(TracingEventListener),
        };

        tracing::debug!(
            entity_id = %self.config.protocol.entity_id,
            versions = ?self.config.protocol.supported_versions,
            attributes = registry.len(),
            "protocol engine ready"
        );

        Ok(ProtocolEngine {
            config: self.config,
            signature_algorithms,
            signer,
            cipher,
            metadata,
            correlation,
            replay,
            registry,
            clock,
            listener,
        })
    }
}
