//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatcher as its only handler
//! - Wire up middleware (host filter, timeouts, tracing, request ID)
//! - Bind the plaintext listener and, when configured, the TLS listener
//! - Dispatch requests to the route table or the content fallback
//!
//! # Design Decisions
//! - One router per listener, tagged with its `Transport`
//! - All shared state is read-only after construction
//! - The first listener error stops the server

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::Response,
    Extension, Router,
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::{RequestBodyTimeoutLayer, TimeoutLayer},
    trace::TraceLayer,
};

use crate::backends::ProxyTargetError;
use crate::config::validation::normalize_listen_address;
use crate::config::SiteConfig;
use crate::content::{ContentPages, ContentResolver};
use crate::http::middleware::{host_filter_middleware, HostFilter};
use crate::http::request::{Transport, UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::Shutdown;
use crate::net::tls::load_tls_config;
use crate::routing::{site_routes, Router as SiteRouter};
use crate::template::Templates;

/// Grace period for in-flight TLS connections after shutdown.
const TLS_DRAIN_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid listen address {0:?}")]
    Address(String),

    #[error("HTTPS listener configured without TLS certificate and key")]
    MissingTls,

    #[error("loading TLS certificate: {0}")]
    Tls(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Application state injected into the dispatcher.
#[derive(Clone)]
pub struct SiteState {
    pub router: Arc<SiteRouter>,
    pub pages: Arc<ContentPages>,
}

/// HTTP server for the site.
pub struct HttpServer {
    config: Arc<SiteConfig>,
    state: SiteState,
    filter: Arc<HostFilter>,
}

impl HttpServer {
    /// Compile the route table and content fallback from `config`.
    pub fn new(config: Arc<SiteConfig>, templates: Templates) -> Result<Self, ProxyTargetError> {
        let router = Arc::new(site_routes(&config)?);
        let pages = Arc::new(ContentPages::new(
            ContentResolver::new(config.content_root()),
            Arc::new(templates),
            &config.site.canonical_host,
            &config.site.gitweb_repo,
        ));
        let filter = Arc::new(HostFilter::new(&config));

        for route in router.routes() {
            tracing::debug!(route = %route.name, backend = route.backend.kind(), "Route registered");
        }

        Ok(Self {
            config,
            state: SiteState { router, pages },
            filter,
        })
    }

    /// Build the Axum router for one listener.
    #[allow(deprecated)]
    pub fn app(&self, transport: Transport) -> Router {
        let listener = &self.config.listener;
        Router::new()
            .fallback(dispatch)
            .with_state(self.state.clone())
            .layer(middleware::from_fn_with_state(
                self.filter.clone(),
                host_filter_middleware,
            ))
            .layer(RequestBodyTimeoutLayer::new(Duration::from_secs(
                listener.read_timeout_secs,
            )))
            .layer(TimeoutLayer::new(Duration::from_secs(
                listener.write_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                    let request_id = req
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        method = %req.method(),
                        uri = %req.uri(),
                        request_id = %request_id,
                    )
                }),
            )
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(Extension(transport))
    }

    /// Serve plaintext HTTP on an already bound listener until shutdown.
    pub async fn serve_plain(
        &self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .app(Transport::Plain)
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!(address = %addr, "HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until shutdown.
    pub async fn serve_tls(
        &self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = Handle::new();
        let signal = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            signal.graceful_shutdown(Some(Duration::from_secs(TLS_DRAIN_SECS)));
        });

        let app = self
            .app(Transport::Tls)
            .into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!(address = %addr, "HTTPS server stopped");
        Ok(())
    }

    /// Bind the configured listeners and serve until shutdown.
    pub async fn run(self, shutdown: &Shutdown) -> Result<(), ServerError> {
        let listener_config = &self.config.listener;
        let http_address = normalize_listen_address(&listener_config.http_address);
        let listener = TcpListener::bind(&http_address)
            .await
            .map_err(|source| ServerError::Bind {
                address: http_address.clone(),
                source,
            })?;

        let Some(https_address) = &listener_config.https_address else {
            self.serve_plain(listener, shutdown.subscribe()).await?;
            return Ok(());
        };

        let tls = listener_config.tls.as_ref().ok_or(ServerError::MissingTls)?;
        let rustls = load_tls_config(&tls.cert_path, &tls.key_path)
            .await
            .map_err(ServerError::Tls)?;
        let https_address = normalize_listen_address(https_address);
        let addr: SocketAddr = https_address
            .parse()
            .map_err(|_| ServerError::Address(https_address.clone()))?;

        tokio::try_join!(
            self.serve_plain(listener, shutdown.subscribe()),
            self.serve_tls(addr, rustls, shutdown.subscribe()),
        )?;
        Ok(())
    }
}

/// Route the request to its backend, or to the content pages when no
/// route matches.
async fn dispatch(State(state): State<SiteState>, req: Request<Body>) -> Response {
    match state.router.match_request(&req) {
        Some(route) => {
            tracing::debug!(
                route = %route.name,
                backend = route.backend.kind(),
                path = %req.uri().path(),
                "Dispatching"
            );
            route.backend.serve(req).await
        }
        None => state.pages.serve(req).await,
    }
}
