//! Request generation and response acceptance on the Connector side.

use std::sync::Arc;

use eidas_core::{ErrorKind, EventType, ProtocolVersion};
use eidas_protocol::constants::status_codes;
use eidas_protocol::{AttributeValue, ProtocolError, Status};

use crate::common::*;

#[tokio::test]
async fn full_exchange_yields_typed_attributes() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let (request_id, bytes) = exchange(&env).await?;
    let response = env
        .connector
        .validate_response(&bytes, CITIZEN_IP, NO_SKEW, NO_SKEW, Some(CONNECTOR_METADATA))
        .await?;

    assert!(response.is_success());
    assert_eq!(response.in_response_to, request_id);
    assert_eq!(response.issuer, PROXY_METADATA);
    assert_eq!(response.subject.as_deref(), Some("BE/DE/0123456789"));
    assert_eq!(
        response.attribute(DATE_OF_BIRTH).map(|a| a.values.clone()),
        Some(vec![AttributeValue::Date(
            chrono::NaiveDate::from_ymd_opt(1985, 3, 14).unwrap()
        )])
    );
    assert_eq!(
        response
            .attribute(FAMILY_NAME)
            .and_then(|a| a.values.first())
            .and_then(AttributeValue::as_text),
        Some("Peeters")
    );

    assert_eq!(env.connector_events.events_of(EventType::RequestGenerated).len(), 1);
    assert_eq!(env.connector_events.events_of(EventType::ResponseValidated).len(), 1);
    assert_eq!(env.proxy_events.events_of(EventType::RequestValidated).len(), 1);
    assert_eq!(env.proxy_events.events_of(EventType::ResponseGenerated).len(), 1);
    Ok(())
}

#[tokio::test]
async fn response_is_accepted_only_once() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let (_, bytes) = exchange(&env).await?;

    env.connector
        .validate_response(&bytes, CITIZEN_IP, NO_SKEW, NO_SKEW, None)
        .await?;
    let replay = env
        .connector
        .validate_response(&bytes, CITIZEN_IP, NO_SKEW, NO_SKEW, None)
        .await
        .unwrap_err();

    assert!(matches!(replay, ProtocolError::UnknownOrReplayedResponse(_)));
    assert_eq!(replay.kind(), ErrorKind::Replay);
    assert_eq!(env.connector_events.events_of(EventType::ReplayDetected).len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deliveries_accept_exactly_one() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let (_, bytes) = exchange(&env).await?;
    let bytes = Arc::new(bytes);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let connector = Arc::clone(&env.connector);
        let bytes = Arc::clone(&bytes);
        handles.push(tokio::spawn(async move {
            connector
                .validate_response(&bytes, CITIZEN_IP, NO_SKEW, NO_SKEW, None)
                .await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => accepted += 1,
            Err(err) => assert!(matches!(err, ProtocolError::UnknownOrReplayedResponse(_))),
        }
    }
    assert_eq!(accepted, 1);
    Ok(())
}

#[tokio::test]
async fn negotiates_highest_shared_version() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let sent = env.connector.generate_request(request(), PROXY_METADATA).await?;
    assert_eq!(sent.protocol_version, Some(ProtocolVersion::V1_2));

    let env = TestEnv::new()?;
    let mut older = proxy_metadata();
    older.protocol_versions = vec!["1.1".into()];
    env.publish(&older)?;
    let sent = env.connector.generate_request(request(), PROXY_METADATA).await?;
    assert_eq!(sent.protocol_version, Some(ProtocolVersion::V1_1));
    Ok(())
}

#[tokio::test]
async fn disjoint_versions_fail_without_recording() -> anyhow::Result<()> {
    let config = connector_config().with_protocol_versions(vec![ProtocolVersion::V1_2]);
    let env = TestEnv::with_configs(config, proxy_config())?;
    let mut older = proxy_metadata();
    older.protocol_versions = vec!["1.1".into()];
    env.publish(&older)?;

    let request = request();
    let id = request.id().to_string();
    let err = env
        .connector
        .generate_request(request, PROXY_METADATA)
        .await
        .unwrap_err();

    assert!(matches!(err, ProtocolError::IncompatibleProtocolVersion { .. }));
    assert!(env.connector.correlation().take_once(&id).await.is_err());
    assert_eq!(
        env.connector_events
            .events_of(EventType::RequestGenerationError)
            .len(),
        1
    );
    Ok(())
}

#[tokio::test]
async fn signature_algorithm_follows_partner_whitelist() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut restricted = proxy_metadata();
    restricted.signing_methods =
        vec!["http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256".into()];
    env.publish(&restricted)?;

    let sent = env.connector.generate_request(request(), PROXY_METADATA).await?;
    assert_eq!(sent.signature_algorithm.uri(), restricted.signing_methods[0]);
    assert!(sent.as_str().contains(&restricted.signing_methods[0]));
    Ok(())
}

#[tokio::test]
async fn pending_request_is_recorded_as_sent() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let original = request();
    let sent = env
        .connector
        .generate_request(original.clone(), PROXY_METADATA)
        .await?;

    let stored = env.connector.correlation().take_once(&sent.id).await?;
    assert_eq!(stored.issuer, CONNECTOR_METADATA);
    assert_eq!(stored.destination, PROXY_METADATA);
    assert_eq!(stored.created_at, start());

    let recorded = stored.request;
    assert_eq!(recorded.protocol_version(), Some(ProtocolVersion::V1_2));
    assert_eq!(recorded.id(), original.id());
    assert_eq!(recorded.issuer(), original.issuer());
    assert_eq!(recorded.destination(), original.destination());
    assert_eq!(recorded.citizen_country_code(), original.citizen_country_code());
    assert_eq!(recorded.origin_country_code(), original.origin_country_code());
    assert_eq!(recorded.provider_name(), original.provider_name());
    assert_eq!(recorded.requested_attributes(), original.requested_attributes());
    assert_eq!(recorded.level_of_assurance(), original.level_of_assurance());
    assert_eq!(recorded.loa_comparison(), original.loa_comparison());
    assert_eq!(recorded.name_id_format(), original.name_id_format());
    assert_eq!(recorded.issue_instant(), original.issue_instant());
    Ok(())
}

#[tokio::test]
async fn reused_request_id_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = request();

    env.connector
        .generate_request(request.clone(), PROXY_METADATA)
        .await?;
    let err = env
        .connector
        .generate_request(request, PROXY_METADATA)
        .await
        .unwrap_err();

    assert!(matches!(err, ProtocolError::IdCollision(_)));
    Ok(())
}

#[tokio::test]
async fn error_response_carries_status_only() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let sent = env.connector.generate_request(request(), PROXY_METADATA).await?;
    let received = env.proxy.validate_request(&sent.bytes).await?;

    let failure = env
        .proxy
        .generate_error_response(&received, Status::authn_failed("citizen cancelled"), CITIZEN_IP)
        .await?;
    let response = env
        .connector
        .validate_response(&failure.bytes, CITIZEN_IP, NO_SKEW, NO_SKEW, Some(CONNECTOR_METADATA))
        .await?;

    assert!(!response.is_success());
    assert_eq!(response.status.sub_code.as_deref(), Some(status_codes::AUTHN_FAILED));
    assert_eq!(response.status.message.as_deref(), Some("citizen cancelled"));
    assert!(response.subject.is_none());
    assert!(response.attributes.is_empty());
    Ok(())
}

#[tokio::test]
async fn clock_skew_widens_validity_window() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let (_, bytes) = exchange(&env).await?;
    env.advance(std::time::Duration::from_secs(320));

    let err = env
        .connector
        .validate_response(&bytes, CITIZEN_IP, NO_SKEW, NO_SKEW, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::AssertionTime { .. }));
    assert_eq!(err.kind(), ErrorKind::Trust);

    let skew = std::time::Duration::from_secs(60);
    let response = env
        .connector
        .validate_response(&bytes, CITIZEN_IP, NO_SKEW, skew, None)
        .await?;
    assert!(response.is_success());
    Ok(())
}
