//! HTTP routes for the gate service.
//!
//! Defines the Axum router and application state.

use crate::auth::{KeyProvider, TokenVerifier};
use crate::config::Config;
use crate::errors::GateError;
use crate::gate::Gate;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_bearer, session_gate, AuthState};
use crate::services::{
    ImageStore, InMemoryImageStore, InMemoryRecordStore, InMemoryUserDirectory, RecordStore,
    UserDirectory,
};
use crate::session::{HttpIdentityClient, SessionAccessor};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Bearer-path verifier, shared with the auth middleware.
    pub token_verifier: Arc<TokenVerifier>,

    /// Cookie-path gate for page navigations.
    pub gate: Arc<Gate>,

    /// Records behind the records endpoint.
    pub record_store: Arc<dyn RecordStore>,

    /// Users registered by the user-created webhook.
    pub user_directory: Arc<dyn UserDirectory>,

    /// Objects behind the image upload endpoint.
    pub image_store: Arc<dyn ImageStore>,
}

impl AppState {
    /// Wire the production collaborators from configuration: HTTP key source,
    /// HTTP identity client, in-memory stores.
    pub fn from_config(config: Config) -> Result<Self, GateError> {
        let key_provider = Arc::new(KeyProvider::http());
        let token_verifier = Arc::new(TokenVerifier::new(
            key_provider,
            config.jwt_issuer.clone(),
            config.jwt_audience.clone(),
            config.jwt_clock_skew,
        ));

        let identity = HttpIdentityClient::new(
            config.identity_claims_url.clone(),
            config.identity_api_key.clone(),
        )?;
        let gate = Arc::new(Gate::new(
            SessionAccessor::new(Arc::new(identity)),
            config.landing_policy,
        ));

        Ok(Self {
            config,
            token_verifier,
            gate,
            record_store: Arc::new(InMemoryRecordStore::new()),
            user_directory: Arc::new(InMemoryUserDirectory::new()),
            image_store: Arc::new(InMemoryImageStore::new()),
        })
    }
}

/// CORS for function endpoints: the request origin is echoed back.
fn functions_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("apikey"),
            HeaderName::from_static("x-client-info"),
            header::CONTENT_TYPE,
        ])
        .max_age(Duration::from_secs(86400))
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health`, `/ready` - probes, public
/// - `/metrics` - Prometheus metrics endpoint, public
/// - `/functions/v1/me`, `/functions/v1/records`, `/functions/v1/upload-image`
///   - bearer authenticated
/// - `/functions/v1/auth-user-created` - webhook, signature authenticated
/// - everything else - page navigations through the session gate
/// - TraceLayer, 30 second timeout and HTTP metrics around all of it
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        token_verifier: state.token_verifier.clone(),
    });

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Bearer-protected routes first so the webhook added after `route_layer`
    // is not covered by it.
    let function_routes = Router::new()
        .route("/functions/v1/me", get(handlers::get_me))
        .route(
            "/functions/v1/records",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route(
            "/functions/v1/upload-image",
            post(handlers::upload_image)
                .layer(DefaultBodyLimit::max(handlers::MAX_UPLOAD_BYTES)),
        )
        .route_layer(middleware::from_fn_with_state(auth_state, require_bearer))
        .route(
            "/functions/v1/auth-user-created",
            post(handlers::auth_user_created),
        )
        .layer(functions_cors())
        .with_state(state.clone());

    let page_routes = Router::new()
        .fallback(handlers::render_page)
        .layer(middleware::from_fn_with_state(
            state.gate.clone(),
            session_gate,
        ));

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(function_routes)
        .fallback_service(page_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
