//! Integration tests for the Segundo Lote gateway.
//!
//! Each test spawns the real application (full router and middleware) on an
//! ephemeral port, with the remote Data Service and the object store both
//! played by `mockito` servers. Tests then drive the gateway over HTTP with
//! `reqwest`, exactly as the frontend would.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p segundo-lote-integration-tests
//! ```

use std::time::Duration;

use mockito::ServerGuard;
use secrecy::SecretString;

use segundo_lote_gateway::config::{BackendConfig, GatewayConfig, StorageConfig};
use segundo_lote_gateway::routes;
use segundo_lote_gateway::state::AppState;

/// Service token the gateway authenticates catalog reads with.
pub const SERVICE_TOKEN: &str = "test-service-token";

/// Bearer token the mock object store expects.
pub const STORAGE_TOKEN: &str = "test-storage-token";

/// A running gateway wired to mock upstreams.
pub struct TestContext {
    /// Base URL of the spawned gateway.
    pub gateway_url: String,
    /// Mock Data Service; set expectations here before calling the gateway.
    pub upstream: ServerGuard,
    /// Mock object store.
    pub storage: ServerGuard,
    /// Plain HTTP client pointed at the gateway.
    pub client: reqwest::Client,
}

impl TestContext {
    /// Spawn a gateway against fresh mock upstreams.
    ///
    /// # Panics
    ///
    /// Panics if the gateway cannot be built or bound; tests cannot
    /// proceed without it.
    pub async fn new() -> Self {
        Self::with_staleness(Duration::from_secs(300)).await
    }

    /// Spawn a gateway with a custom snapshot staleness window.
    ///
    /// # Panics
    ///
    /// Panics if the gateway cannot be built or bound.
    pub async fn with_staleness(staleness: Duration) -> Self {
        let upstream = mockito::Server::new_async().await;
        let storage = mockito::Server::new_async().await;

        let config = GatewayConfig {
            host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            port: 0,
            backend: BackendConfig {
                api_url: upstream.url(),
                service_token: SecretString::from(SERVICE_TOKEN),
            },
            storage: StorageConfig {
                endpoint: storage.url(),
                bucket: "event-images".to_string(),
                access_token: SecretString::from(STORAGE_TOKEN),
                public_url: format!("{}/public/event-images", storage.url()),
            },
            store_staleness: staleness,
            sentry_dsn: None,
            sentry_environment: None,
        };

        let state = AppState::new(config).expect("application state builds");
        let app = routes::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral port binds");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("gateway serves");
        });

        Self {
            gateway_url: format!("http://{addr}"),
            upstream,
            storage,
            client: reqwest::Client::new(),
        }
    }

    /// Absolute URL for a gateway path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.gateway_url)
    }
}

/// A small valid events envelope for seeding the snapshot store.
#[must_use]
pub fn events_body(ticket_count: u32) -> String {
    format!(
        r#"{{"events":[{{
            "id":"evt_1","title":"Segundo Lote - Virada Cultural",
            "date":"2026-09-12T21:00:00Z","location":"Vale do Anhangabaú",
            "price":"180.00","category":"shows","city":"São Paulo",
            "ticket_count":{ticket_count}
        }}]}}"#
    )
}
