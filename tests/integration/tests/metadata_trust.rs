//! Partner metadata trust decisions as seen through the engine.

use std::time::Duration;

use eidas_core::{ErrorKind, EventType};
use eidas_integration_tests::{certificate, HashSigner};
use eidas_metadata::{MetadataError, SignatureError};
use eidas_protocol::ProtocolError;

use crate::common::*;

fn metadata_error(err: ProtocolError) -> MetadataError {
    match err {
        ProtocolError::Metadata(inner) => inner,
        other => panic!("expected a metadata error, got {other}"),
    }
}

#[tokio::test]
async fn expired_metadata_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut stale = proxy_metadata();
    stale.valid_until = start() - chrono::Duration::seconds(1);
    env.publish(&stale)?;

    let request = request();
    let id = request.id().to_string();
    let err = env
        .connector
        .generate_request(request, PROXY_METADATA)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Trust);
    assert!(matches!(metadata_error(err), MetadataError::Expired { .. }));
    assert_eq!(env.connector_events.events_of(EventType::MetadataRejected).len(), 1);
    assert!(env.connector.correlation().take_once(&id).await.is_err());
    Ok(())
}

#[tokio::test]
async fn metadata_signed_outside_the_federation_is_untrusted() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let rogue = HashSigner::new(certificate("rogue-federation"));
    env.loader.insert(PROXY_METADATA, proxy_metadata().sign_with(&rogue)?);

    let err = env
        .connector
        .generate_request(request(), PROXY_METADATA)
        .await
        .unwrap_err();
    assert!(matches!(
        metadata_error(err),
        MetadataError::SignatureInvalid(SignatureError::UntrustedCertificate)
    ));
    Ok(())
}

#[tokio::test]
async fn unsigned_metadata_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    env.loader.insert(PROXY_METADATA, proxy_metadata().render());

    let err = env
        .connector
        .generate_request(request(), PROXY_METADATA)
        .await
        .unwrap_err();
    assert!(matches!(
        metadata_error(err),
        MetadataError::SignatureInvalid(SignatureError::Missing)
    ));
    Ok(())
}

#[tokio::test]
async fn unpublished_metadata_is_transient() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let err = env
        .connector
        .generate_request(request(), "https://unknown.example.eu/metadata")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert!(matches!(metadata_error(err), MetadataError::Unavailable { .. }));
    Ok(())
}

#[tokio::test]
async fn plain_http_source_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let err = env
        .connector
        .generate_request(request(), "http://proxy.example.eu/metadata")
        .await
        .unwrap_err();
    assert!(matches!(metadata_error(err), MetadataError::InvalidSource(_)));
    assert_eq!(env.loader.fetch_count(), 0);
    Ok(())
}

#[tokio::test]
async fn whitelist_limits_partners() -> anyhow::Result<()> {
    let config = connector_config()
        .with_metadata_whitelist(vec!["https://other-proxy.example.eu/metadata".into()]);
    let env = TestEnv::with_configs(config, proxy_config())?;

    let err = env
        .connector
        .generate_request(request(), PROXY_METADATA)
        .await
        .unwrap_err();
    assert!(matches!(metadata_error(err), MetadataError::InvalidSource(_)));
    Ok(())
}

#[tokio::test]
async fn partner_without_idp_role_cannot_be_asked() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let err = env
        .connector
        .generate_request(request(), CONNECTOR_METADATA)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn resolved_metadata_is_reused_until_it_expires() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut short_lived = proxy_metadata();
    short_lived.valid_until = start() + chrono::Duration::minutes(10);
    env.publish(&short_lived)?;

    env.connector.generate_request(request(), PROXY_METADATA).await?;
    env.connector.generate_request(request(), PROXY_METADATA).await?;
    assert_eq!(env.loader.fetch_count(), 1);
    assert_eq!(env.connector_events.events_of(EventType::MetadataResolved).len(), 1);

    env.advance(Duration::from_secs(11 * 60));
    let mut renewed = proxy_metadata();
    renewed.valid_until = start() + chrono::Duration::days(2);
    env.publish(&renewed)?;

    env.connector.generate_request(request(), PROXY_METADATA).await?;
    assert_eq!(env.loader.fetch_count(), 2);
    Ok(())
}
