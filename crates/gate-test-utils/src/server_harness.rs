//! Test server harness for E2E testing
//!
//! Provides `TestGateServer` for spawning real gate instances in tests, wired
//! to a [`MockIdentityService`].

use crate::mock_identity::{MockIdentityService, TEST_API_KEY};
use gate_service::config::Config;
use gate_service::routes::{self, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Webhook secret the test gate is configured with.
pub const TEST_HOOK_SECRET: &str = "test-hook-secret";

/// Test harness for spawning the gate in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> Result<()> {
///     let identity = MockIdentityService::start().await;
///     let server = TestGateServer::spawn(&identity).await?;
///
///     let response = server.client().get(server.url_for("/health")).send().await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGateServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestGateServer {
    /// Spawn a gate against `identity` with default test configuration.
    pub async fn spawn(identity: &MockIdentityService) -> Result<Self, anyhow::Error> {
        Self::spawn_with(identity, HashMap::new()).await
    }

    /// Spawn a gate against `identity`, overriding configuration variables.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Use a private Prometheus recorder (no global install)
    /// - Start the HTTP server in the background
    pub async fn spawn_with(
        identity: &MockIdentityService,
        overrides: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("IDENTITY_URL".to_string(), identity.url()),
            ("IDENTITY_API_KEY".to_string(), TEST_API_KEY.to_string()),
            ("AUTH_HOOK_SECRET".to_string(), TEST_HOOK_SECRET.to_string()),
            ("GATE_DRAIN_SECONDS".to_string(), "0".to_string()),
        ]);
        vars.extend(overrides);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(
            AppState::from_config(config)
                .map_err(|e| anyhow::anyhow!("Failed to build state: {}", e))?,
        );

        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let app = routes::build_routes(state.clone(), metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Absolute URL of `path` on the test server.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.url(), path)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Application state, for inspecting stores after requests.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// HTTP client that does not follow redirects, so gate decisions are
    /// visible to the test.
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build test HTTP client")
    }
}

impl Drop for TestGateServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
