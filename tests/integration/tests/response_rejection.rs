//! Responses the Connector must refuse.

use eidas_core::{ErrorKind, EventType};
use eidas_integration_tests::{certificate, HashSigner};
use eidas_metadata::{xml, SignatureAlgorithm, SignatureError, XmlError};
use eidas_protocol::{ProtocolError, Signer};

use crate::common::*;

async fn validate(env: &TestEnv, bytes: &[u8]) -> ProtocolError {
    env.connector
        .validate_response(bytes, CITIZEN_IP, NO_SKEW, NO_SKEW, Some(CONNECTOR_METADATA))
        .await
        .unwrap_err()
}

/// Rewrites the plain assertion of a response and signs it again as the
/// Proxy-Service, so only the rewritten content can fail.
fn resign_with_assertion_edit(
    bytes: &[u8],
    edit: impl Fn(&str) -> String,
) -> anyhow::Result<Vec<u8>> {
    let mut root = xml::parse(bytes, usize::MAX)?;
    let id = root.attr("ID").unwrap_or_default().to_string();
    root.remove_children("Signature");

    let unsigned = root.to_xml();
    let (head, assertion) = unsigned
        .split_once("<saml2:Assertion")
        .ok_or_else(|| anyhow::anyhow!("response carries no plain assertion"))?;
    let edited = format!("{head}<saml2:Assertion{}", edit(assertion));

    let proxy = HashSigner::new(certificate("proxy-signing"));
    Ok(proxy
        .sign(&edited, &id, SignatureAlgorithm::RsaSha512Mgf1)?
        .into_bytes())
}

#[tokio::test]
async fn oversize_message_is_refused_before_parsing() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let limit = env.connector.config().max_message_size;

    let err = validate(&env, &vec![b'<'; limit + 1]).await;
    assert!(matches!(err, ProtocolError::MessageTooLarge { size, .. } if size == limit + 1));
    assert_eq!(err.kind(), ErrorKind::Profile);
    Ok(())
}

#[tokio::test]
async fn doctype_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let hostile = br#"<?xml version="1.0"?>
<!DOCTYPE r [<!ENTITY x SYSTEM "file:///etc/passwd">]>
<saml2p:Response ID="_r" Version="2.0">&x;</saml2p:Response>"#;

    let err = validate(&env, hostile).await;
    assert!(matches!(err, ProtocolError::Malformed(XmlError::DoctypeForbidden)));
    assert_eq!(
        env.connector_events.events_of(EventType::ResponseRejected).len(),
        1
    );
    Ok(())
}

#[tokio::test]
async fn deeply_nested_message_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let nested = format!(
        "<saml2p:Response>{}{}</saml2p:Response>",
        "<x>".repeat(1_000),
        "</x>".repeat(1_000)
    );

    let err = validate(&env, nested.as_bytes()).await;
    assert!(matches!(err, ProtocolError::Malformed(XmlError::TooDeep { .. })));
    assert_eq!(err.kind(), ErrorKind::Profile);
    Ok(())
}

#[tokio::test]
async fn unsigned_response_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let unsigned = format!(
        r#"<saml2p:Response ID="_r" InResponseTo="_q" Version="2.0" IssueInstant="2025-06-01T12:00:00Z"
            Destination="{CONNECTOR_ACS}">
            <saml2:Issuer>{PROXY_METADATA}</saml2:Issuer>
            <saml2p:Status><saml2p:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Requester"/></saml2p:Status>
        </saml2p:Response>"#
    );

    let err = validate(&env, unsigned.as_bytes()).await;
    assert!(matches!(&err, ProtocolError::Validation(reason) if reason.contains("not signed")));
    Ok(())
}

#[tokio::test]
async fn response_to_unknown_request_is_a_replay() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let never_sent = request();
    let response = env
        .proxy
        .generate_response(&never_sent, citizen(), CITIZEN_IP)
        .await?;

    let err = validate(&env, &response.bytes).await;
    assert!(matches!(&err, ProtocolError::UnknownOrReplayedResponse(id) if id == never_sent.id()));
    assert_eq!(env.connector_events.events_of(EventType::ReplayDetected).len(), 1);
    Ok(())
}

#[tokio::test]
async fn plain_assertion_is_refused_when_encryption_is_required() -> anyhow::Result<()> {
    let env = TestEnv::with_configs(
        connector_config().with_require_encrypted_assertions(true),
        proxy_config().with_encrypt_assertions(false),
    )?;
    let (request_id, bytes) = exchange(&env).await?;

    let err = validate(&env, &bytes).await;
    assert!(matches!(err, ProtocolError::UnencryptedAssertion));
    assert_eq!(err.kind(), ErrorKind::Trust);

    // the pending request survives a refused response
    assert!(env.connector.correlation().take_once(&request_id).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn pending_request_expires() -> anyhow::Result<()> {
    let env = TestEnv::with_configs(connector_config().with_correlation_ttl_secs(60), proxy_config())?;
    let sent = env.connector.generate_request(request(), PROXY_METADATA).await?;
    let received = env.proxy.validate_request(&sent.bytes).await?;

    env.advance(std::time::Duration::from_secs(120));
    let response = env
        .proxy
        .generate_response(&received, citizen(), CITIZEN_IP)
        .await?;

    let err = validate(&env, &response.bytes).await;
    assert!(matches!(&err, ProtocolError::UnknownOrReplayedResponse(id) if *id == sent.id));
    Ok(())
}

#[tokio::test]
async fn audience_must_name_this_node() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let (_, bytes) = exchange(&env).await?;

    let err = env
        .connector
        .validate_response(
            &bytes,
            CITIZEN_IP,
            NO_SKEW,
            NO_SKEW,
            Some("https://other-connector.example.eu/metadata"),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        &err,
        ProtocolError::AudienceMismatch { actual, .. } if actual == CONNECTOR_METADATA
    ));
    Ok(())
}

#[tokio::test]
async fn bearer_address_must_match_responder() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let (_, bytes) = exchange(&env).await?;

    let err = env
        .connector
        .validate_response(&bytes, "198.51.100.7", NO_SKEW, NO_SKEW, None)
        .await
        .unwrap_err();
    assert!(matches!(
        &err,
        ProtocolError::BearerIpMismatch { expected, actual }
            if expected == "198.51.100.7" && actual == CITIZEN_IP
    ));
    Ok(())
}

#[tokio::test]
async fn bearer_check_can_be_disabled() -> anyhow::Result<()> {
    let env = TestEnv::with_configs(connector_config().with_check_bearer_ip(false), proxy_config())?;
    let (_, bytes) = exchange(&env).await?;

    let response = env
        .connector
        .validate_response(&bytes, "198.51.100.7", NO_SKEW, NO_SKEW, None)
        .await?;
    assert!(response.is_success());
    Ok(())
}

#[tokio::test]
async fn tampered_attribute_breaks_the_signature() -> anyhow::Result<()> {
    let env = TestEnv::with_configs(connector_config(), proxy_config().with_encrypt_assertions(false))?;
    let (_, bytes) = exchange(&env).await?;

    let tampered = String::from_utf8(bytes)?.replace("Peeters", "Janssens");
    let err = validate(&env, tampered.as_bytes()).await;
    assert!(matches!(err, ProtocolError::SignatureInvalid(SignatureError::Invalid(_))));
    Ok(())
}

#[tokio::test]
async fn assertion_from_another_issuer_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::with_configs(connector_config(), proxy_config().with_encrypt_assertions(false))?;
    let (request_id, bytes) = exchange(&env).await?;

    let forged = resign_with_assertion_edit(&bytes, |assertion| {
        assertion.replace(PROXY_METADATA, "https://other-proxy.example.eu/metadata")
    })?;
    let err = validate(&env, &forged).await;
    assert!(matches!(
        &err,
        ProtocolError::IssuerMismatch { expected, actual }
            if expected == PROXY_METADATA && actual == "https://other-proxy.example.eu/metadata"
    ));
    assert_eq!(err.kind(), ErrorKind::Trust);
    assert!(env.connector.correlation().take_once(&request_id).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn assertion_for_another_request_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::with_configs(connector_config(), proxy_config().with_encrypt_assertions(false))?;
    let (request_id, bytes) = exchange(&env).await?;

    let forged = resign_with_assertion_edit(&bytes, |assertion| {
        assertion.replace(
            &format!(r#"InResponseTo="{request_id}""#),
            r#"InResponseTo="_someone-else""#,
        )
    })?;
    let err = validate(&env, &forged).await;
    assert!(matches!(&err, ProtocolError::Validation(reason) if reason.contains("_someone-else")));
    Ok(())
}

#[tokio::test]
async fn resigned_response_without_edits_is_accepted() -> anyhow::Result<()> {
    let env = TestEnv::with_configs(connector_config(), proxy_config().with_encrypt_assertions(false))?;
    let (_, bytes) = exchange(&env).await?;

    let resigned = resign_with_assertion_edit(&bytes, |assertion| assertion.to_string())?;
    let response = env
        .connector
        .validate_response(&resigned, CITIZEN_IP, NO_SKEW, NO_SKEW, Some(CONNECTOR_METADATA))
        .await?;
    assert!(response.is_success());
    Ok(())
}

#[tokio::test]
async fn signer_outside_metadata_is_untrusted() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut rotated = proxy_metadata();
    rotated.signing_certificate = certificate("someone-else");
    env.publish(&rotated)?;

    let (_, bytes) = exchange(&env).await?;
    let err = validate(&env, &bytes).await;
    assert!(matches!(
        err,
        ProtocolError::SignatureInvalid(SignatureError::UntrustedCertificate)
    ));
    Ok(())
}

#[tokio::test]
async fn assertion_for_another_key_cannot_be_decrypted() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut misconfigured = connector_metadata();
    misconfigured.encryption_certificate = Some(certificate("stale-encryption"));
    env.publish(&misconfigured)?;

    let (_, bytes) = exchange(&env).await?;
    let err = validate(&env, &bytes).await;
    assert!(matches!(err, ProtocolError::Decryption(_)));
    Ok(())
}
