//! HTTP server wiring for shortpaste (API, handlers, and shared state).

/// HTTP error mapping for API handlers.
pub mod error;
/// HTTP handlers for document endpoints.
pub mod handlers;

pub use shortpaste_core::{
    config, models, storage, AppError, Config, DocumentStore, RateLimiter, DEFAULT_PORT,
};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

/// How often elapsed rate-limit windows are dropped.
const WINDOW_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Room for JSON framing and escaping on top of the document limit.
const BODY_LIMIT_OVERHEAD: usize = 64 * 1024;

/// Shared state passed to HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Construct shared application state.
    ///
    /// # Arguments
    /// - `config`: Loaded configuration.
    /// - `store`: Document store built from that configuration.
    ///
    /// # Returns
    /// A new [`AppState`].
    pub fn new(config: Config, store: DocumentStore) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }

    /// Open the configured backend and build state around it.
    ///
    /// # Errors
    /// Returns an error if the storage backend cannot be opened.
    pub fn open(config: Config) -> Result<Self, AppError> {
        let backend = storage::open_backend(config.storage.kind, &config.storage.path)?;
        let store = DocumentStore::new(&config, backend);
        Ok(Self::new(config, store))
    }
}

/// Create the application router with all routes and middleware.
///
/// # Arguments
/// - `state`: Shared application state.
///
/// # Returns
/// Configured `axum::Router`.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    let body_limit = state
        .config
        .max_document_length
        .saturating_mul(2)
        .saturating_add(BODY_LIMIT_OVERHEAD);

    Router::new()
        .route("/documents", post(handlers::document::create_document))
        .route("/documents/:key", get(handlers::document::get_document))
        .route("/raw/:key", get(handlers::document::get_raw_document))
        .route("/:key", get(handlers::document::resolve_document))
        .with_state(state)
        .layer(
            tower::ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors)
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                )),
        )
}

/// Resolve the listener address from the configured host and port.
///
/// # Returns
/// The first address `host:port` resolves to, or loopback when it does not
/// resolve.
pub fn resolve_bind_address(config: &Config) -> SocketAddr {
    let fallback = SocketAddr::from(([127, 0, 0, 1], config.port));
    match (config.host.as_str(), config.port).to_socket_addrs() {
        Ok(mut addrs) => addrs.next().unwrap_or(fallback),
        Err(err) => {
            tracing::warn!(
                "Invalid host '{}': {}. Falling back to {}",
                config.host,
                err,
                fallback
            );
            fallback
        }
    }
}

/// Periodically drop elapsed rate-limit windows.
///
/// # Returns
/// Handle of the background task; abort it on shutdown.
pub fn spawn_window_pruner(
    limiter: Arc<RateLimiter>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = limiter.prune_expired(Instant::now());
            if removed > 0 {
                tracing::debug!("Pruned {} rate-limit window(s)", removed);
            }
        }
    })
}

/// Run the Axum server with graceful shutdown support.
///
/// # Arguments
/// - `listener`: Bound TCP listener for the server.
/// - `state`: Shared application state.
/// - `shutdown_signal`: Future that resolves when shutdown should start.
///
/// # Returns
/// `Ok(())` when the server exits cleanly.
///
/// # Errors
/// Returns any I/O error produced by `axum::serve`.
pub async fn serve_router(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let pruner = spawn_window_pruner(state.store.limiter(), WINDOW_PRUNE_INTERVAL);
    let app = create_app(state);
    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await;
    pruner.abort();
    result
}
