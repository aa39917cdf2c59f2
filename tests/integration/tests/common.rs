//! Common test utilities and fixtures.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use eidas_core::config::EngineConfig;
use eidas_core::event::InMemoryEventListener;
use eidas_core::FixedTimeSource;
use eidas_integration_tests::{certificate, Base64Cipher, HashSigner, MetadataDocument};
use eidas_metadata::{MetadataCache, MetadataResolver, Role, StaticMetadataLoader};
use eidas_protocol::constants::{loa, name_id_formats};
use eidas_protocol::{
    AttributeValue, AuthenticationRequest, AuthenticationResponse, ProtocolEngine,
    ResponseAttribute,
};

pub const CONNECTOR_METADATA: &str = "https://connector.example.eu/metadata";
pub const CONNECTOR_ACS: &str = "https://connector.example.eu/acs";
pub const PROXY_METADATA: &str = "https://proxy.example.eu/metadata";
pub const PROXY_SSO: &str = "https://proxy.example.eu/sso";
pub const CITIZEN_IP: &str = "192.0.2.10";

pub const PERSON_IDENTIFIER: &str =
    "http://eidas.europa.eu/attributes/naturalperson/PersonIdentifier";
pub const FAMILY_NAME: &str = "http://eidas.europa.eu/attributes/naturalperson/CurrentFamilyName";
pub const DATE_OF_BIRTH: &str = "http://eidas.europa.eu/attributes/naturalperson/DateOfBirth";

pub const NO_SKEW: Duration = Duration::ZERO;

/// Start of every test, in engine time.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn connector_config() -> EngineConfig {
    EngineConfig::default().with_entity_id(CONNECTOR_METADATA)
}

pub fn proxy_config() -> EngineConfig {
    EngineConfig::default().with_entity_id(PROXY_METADATA)
}

/// Metadata the Proxy-Service publishes.
pub fn proxy_metadata() -> MetadataDocument {
    MetadataDocument {
        entity_id: PROXY_METADATA.into(),
        role: Role::Idp,
        valid_until: start() + chrono::Duration::days(1),
        protocol_versions: vec!["1.2".into(), "1.1".into()],
        signing_methods: Vec::new(),
        signing_certificate: certificate("proxy-signing"),
        encryption_certificate: Some(certificate("proxy-encryption")),
        endpoint: PROXY_SSO.into(),
    }
}

/// Metadata the Connector publishes.
pub fn connector_metadata() -> MetadataDocument {
    MetadataDocument {
        entity_id: CONNECTOR_METADATA.into(),
        role: Role::Sp,
        valid_until: start() + chrono::Duration::days(1),
        protocol_versions: vec!["1.2".into(), "1.1".into()],
        signing_methods: Vec::new(),
        signing_certificate: certificate("connector-signing"),
        encryption_certificate: Some(certificate("connector-encryption")),
        endpoint: CONNECTOR_ACS.into(),
    }
}

/// A Connector and a Proxy-Service sharing one clock and one metadata
/// publication point.
pub struct TestEnv {
    pub clock: Arc<FixedTimeSource>,
    pub loader: Arc<StaticMetadataLoader>,
    pub connector: Arc<ProtocolEngine>,
    pub proxy: Arc<ProtocolEngine>,
    pub connector_events: Arc<InMemoryEventListener>,
    pub proxy_events: Arc<InMemoryEventListener>,
    federation: HashSigner,
}

impl TestEnv {
    /// Creates an environment with default configurations and metadata.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_configs(connector_config(), proxy_config())
    }

    /// Creates an environment with the given node configurations.
    pub fn with_configs(connector: EngineConfig, proxy: EngineConfig) -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("eidas_protocol=debug,eidas_metadata=debug")
            .with_test_writer()
            .try_init();

        let clock = Arc::new(FixedTimeSource::new(start()));
        let loader = Arc::new(StaticMetadataLoader::new());
        let federation = HashSigner::new(certificate("federation"));

        let connector_events = Arc::new(InMemoryEventListener::new());
        let proxy_events = Arc::new(InMemoryEventListener::new());

        let connector = Self::engine(
            connector,
            "connector",
            &clock,
            &loader,
            &connector_events,
        )?;
        let proxy = Self::engine(proxy, "proxy", &clock, &loader, &proxy_events)?;

        let env = Self {
            clock,
            loader,
            connector: Arc::new(connector),
            proxy: Arc::new(proxy),
            connector_events,
            proxy_events,
            federation,
        };
        env.publish(&proxy_metadata())?;
        env.publish(&connector_metadata())?;
        Ok(env)
    }

    fn engine(
        config: EngineConfig,
        node: &str,
        clock: &Arc<FixedTimeSource>,
        loader: &Arc<StaticMetadataLoader>,
        listener: &Arc<InMemoryEventListener>,
    ) -> anyhow::Result<ProtocolEngine> {
        let signer = Arc::new(
            HashSigner::new(certificate(&format!("{node}-signing")))
                .with_anchor(certificate("federation")),
        );
        let resolver = MetadataResolver::new(
            &config.metadata,
            loader.clone(),
            signer.clone(),
            MetadataCache::local(config.metadata.max_entries),
            listener.clone(),
        );

        Ok(ProtocolEngine::builder(config)
            .signer(signer)
            .cipher(Arc::new(Base64Cipher::new(certificate(&format!(
                "{node}-encryption"
            )))))
            .metadata(Arc::new(resolver))
            .clock(clock.clone())
            .listener(listener.clone())
            .build()?)
    }

    /// Signs and publishes a metadata document at its entity id.
    pub fn publish(&self, document: &MetadataDocument) -> anyhow::Result<()> {
        let signed = document.sign_with(&self.federation)?;
        self.loader.insert(document.entity_id.clone(), signed.into_bytes());
        Ok(())
    }

    /// Advances engine time.
    pub fn advance(&self, by: Duration) {
        self.clock
            .advance(chrono::Duration::from_std(by).unwrap());
    }
}

/// A request from the Connector for the Proxy-Service.
pub fn request() -> AuthenticationRequest {
    AuthenticationRequest::builder()
        .issuer(CONNECTOR_METADATA)
        .destination(PROXY_SSO)
        .citizen_country_code("BE")
        .origin_country_code("DE")
        .provider_name("Example Service")
        .requested_attribute(PERSON_IDENTIFIER, true)
        .requested_attribute(FAMILY_NAME, true)
        .requested_attribute(DATE_OF_BIRTH, false)
        .level_of_assurance(loa::SUBSTANTIAL)
        .name_id_format(name_id_formats::PERSISTENT)
        .build()
}

/// A successful authentication of one citizen.
pub fn citizen() -> AuthenticationResponse {
    AuthenticationResponse::success(PROXY_METADATA)
        .subject("BE/DE/0123456789", name_id_formats::PERSISTENT)
        .level_of_assurance(loa::HIGH)
        .attribute(ResponseAttribute::single(
            PERSON_IDENTIFIER,
            AttributeValue::Text("BE/DE/0123456789".into()),
        ))
        .attribute(ResponseAttribute::single(
            FAMILY_NAME,
            AttributeValue::Text("Peeters".into()),
        ))
        .attribute(ResponseAttribute::single(
            DATE_OF_BIRTH,
            AttributeValue::Date(chrono::NaiveDate::from_ymd_opt(1985, 3, 14).unwrap()),
        ))
        .build()
}

/// Runs a request through both nodes and returns the signed response with
/// the request id it answers.
pub async fn exchange(env: &TestEnv) -> anyhow::Result<(String, Vec<u8>)> {
    let sent = env.connector.generate_request(request(), PROXY_METADATA).await?;
    let received = env.proxy.validate_request(&sent.bytes).await?;
    let response = env
        .proxy
        .generate_response(&received, citizen(), CITIZEN_IP)
        .await?;
    Ok((sent.id, response.bytes))
}
