//! Request acceptance and response generation on the Proxy-Service side.

use eidas_core::{ErrorKind, EventType, ProtocolVersion};
use eidas_integration_tests::{certificate, HashSigner};
use eidas_metadata::{xml, SignatureError};
use eidas_protocol::constants::loa;
use eidas_protocol::{
    AttributeError, AttributeValue, AuthenticationRequest, AuthenticationResponse, ProtocolError,
    ResponseAttribute, Signer, Status,
};

use crate::common::*;

fn request_for_high() -> AuthenticationRequest {
    AuthenticationRequest::builder()
        .issuer(CONNECTOR_METADATA)
        .destination(PROXY_SSO)
        .citizen_country_code("BE")
        .requested_attribute(PERSON_IDENTIFIER, true)
        .level_of_assurance(loa::HIGH)
        .build()
}

#[tokio::test]
async fn accepted_request_carries_negotiated_version() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let sent = env.connector.generate_request(request(), PROXY_METADATA).await?;

    let received = env.proxy.validate_request(&sent.bytes).await?;
    assert_eq!(received.id(), sent.id);
    assert_eq!(received.issuer(), CONNECTOR_METADATA);
    assert_eq!(received.citizen_country_code(), "BE");
    assert_eq!(received.origin_country_code(), Some("DE"));
    assert_eq!(received.level_of_assurance(), loa::SUBSTANTIAL);
    assert_eq!(received.requested_attributes().len(), 3);
    assert_eq!(received.protocol_version(), Some(ProtocolVersion::V1_2));
    assert_eq!(env.proxy_events.events_of(EventType::RequestValidated).len(), 1);
    Ok(())
}

#[tokio::test]
async fn older_connector_gets_older_version() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut older = connector_metadata();
    older.protocol_versions = vec!["1.1".into()];
    env.publish(&older)?;

    let sent = env.connector.generate_request(request(), PROXY_METADATA).await?;
    let received = env.proxy.validate_request(&sent.bytes).await?;
    assert_eq!(received.protocol_version(), Some(ProtocolVersion::V1_1));
    Ok(())
}

#[tokio::test]
async fn request_is_accepted_only_once() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let sent = env.connector.generate_request(request(), PROXY_METADATA).await?;

    env.proxy.validate_request(&sent.bytes).await?;
    let err = env.proxy.validate_request(&sent.bytes).await.unwrap_err();

    assert!(matches!(&err, ProtocolError::ReplayedRequest(id) if *id == sent.id));
    assert_eq!(err.kind(), ErrorKind::Replay);
    assert_eq!(env.proxy_events.events_of(EventType::RequestValidated).len(), 1);
    assert_eq!(env.proxy_events.events_of(EventType::ReplayDetected).len(), 1);
    Ok(())
}

#[tokio::test]
async fn refused_request_does_not_burn_its_id() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let sent = env.connector.generate_request(request(), PROXY_METADATA).await?;

    let tampered = sent.as_str().replace("Example Service", "Other Service");
    assert!(env.proxy.validate_request(tampered.as_bytes()).await.is_err());
    env.proxy.validate_request(&sent.bytes).await?;
    Ok(())
}

#[tokio::test]
async fn request_without_attributes_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let sent = env.connector.generate_request(request(), PROXY_METADATA).await?;

    let mut root = xml::parse(&sent.bytes, usize::MAX)?;
    root.remove_children("Signature");
    root.remove_children("Extensions");
    let connector = HashSigner::new(certificate("connector-signing"));
    let bare = connector.sign(&root.to_xml(), &sent.id, sent.signature_algorithm)?;

    let err = env.proxy.validate_request(bare.as_bytes()).await.unwrap_err();
    assert!(matches!(&err, ProtocolError::Validation(reason) if reason.contains("no attributes")));
    assert_eq!(env.proxy_events.events_of(EventType::RequestRejected).len(), 1);

    let unsendable = AuthenticationRequest::builder()
        .issuer(CONNECTOR_METADATA)
        .destination(PROXY_SSO)
        .citizen_country_code("BE")
        .build();
    let err = env
        .connector
        .generate_request(unsendable, PROXY_METADATA)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn tampered_request_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let sent = env.connector.generate_request(request(), PROXY_METADATA).await?;

    let tampered = sent.as_str().replace("Example Service", "Other Service");
    let err = env
        .proxy
        .validate_request(tampered.as_bytes())
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::SignatureInvalid(SignatureError::Invalid(_))));
    assert_eq!(env.proxy_events.events_of(EventType::RequestRejected).len(), 1);
    Ok(())
}

#[tokio::test]
async fn stripped_signature_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let sent = env.connector.generate_request(request(), PROXY_METADATA).await?;

    let mut root = xml::parse(&sent.bytes, usize::MAX)?;
    root.remove_children("Signature");
    let err = env
        .proxy
        .validate_request(root.to_xml().as_bytes())
        .await
        .unwrap_err();
    assert!(matches!(&err, ProtocolError::Validation(reason) if reason.contains("not signed")));
    Ok(())
}

#[tokio::test]
async fn request_from_unlisted_key_is_untrusted() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut rotated = connector_metadata();
    rotated.signing_certificate = certificate("impostor");
    env.publish(&rotated)?;

    let sent = env.connector.generate_request(request(), PROXY_METADATA).await?;
    let err = env.proxy.validate_request(&sent.bytes).await.unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::SignatureInvalid(SignatureError::UntrustedCertificate)
    ));
    Ok(())
}

#[tokio::test]
async fn unknown_attribute_is_not_requested() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = AuthenticationRequest::builder()
        .issuer(CONNECTOR_METADATA)
        .destination(PROXY_SSO)
        .citizen_country_code("BE")
        .requested_attribute("http://example.eu/attributes/ShoeSize", false)
        .build();

    let err = env
        .connector
        .generate_request(request, PROXY_METADATA)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Attribute(AttributeError::Unknown(_))));
    Ok(())
}

#[tokio::test]
async fn response_below_requested_assurance_is_not_issued() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let sent = env
        .connector
        .generate_request(request_for_high(), PROXY_METADATA)
        .await?;
    let received = env.proxy.validate_request(&sent.bytes).await?;

    let substantial = AuthenticationResponse::success(PROXY_METADATA)
        .subject("BE/DE/0123456789", eidas_protocol::constants::name_id_formats::PERSISTENT)
        .level_of_assurance(loa::SUBSTANTIAL)
        .attribute(ResponseAttribute::single(
            PERSON_IDENTIFIER,
            AttributeValue::Text("BE/DE/0123456789".into()),
        ))
        .build();
    let err = env
        .proxy
        .generate_response(&received, substantial, CITIZEN_IP)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn success_status_is_not_an_error_response() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let sent = env.connector.generate_request(request(), PROXY_METADATA).await?;
    let received = env.proxy.validate_request(&sent.bytes).await?;

    let err = env
        .proxy
        .generate_error_response(&received, Status::success(), CITIZEN_IP)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn consumer_service_must_be_published() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = AuthenticationRequest::builder()
        .issuer(CONNECTOR_METADATA)
        .destination(PROXY_SSO)
        .citizen_country_code("BE")
        .requested_attribute(PERSON_IDENTIFIER, true)
        .level_of_assurance(loa::SUBSTANTIAL)
        .assertion_consumer_service_url("https://attacker.example/acs")
        .build();

    let err = env
        .proxy
        .generate_response(&request, citizen(), CITIZEN_IP)
        .await
        .unwrap_err();
    assert!(matches!(&err, ProtocolError::Validation(reason) if reason.contains("attacker")));
    Ok(())
}

#[tokio::test]
async fn response_is_addressed_and_sealed() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let (_, bytes) = exchange(&env).await?;
    let text = String::from_utf8(bytes)?;

    assert!(text.contains(&format!("Destination=\"{CONNECTOR_ACS}\"")));
    assert!(text.contains("EncryptedAssertion"));
    assert!(!text.contains("Peeters"));
    Ok(())
}
