//! Axum HTTP server for the storefront.

use std::io;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use axum_extra::extract::CookieJar;
use metrics_exporter_prometheus::PrometheusHandle;
use storefront_settings::ServerSettings;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::bootstrap::Bootstrap;
use crate::extract::{PageRequest, cleared_cookie};
use crate::health::HealthResponse;
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Per-request bootstrap.
    pub bootstrap: Arc<Bootstrap>,
    /// Name of the session cookie.
    pub cookie_name: Arc<str>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus renderer, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The storefront HTTP server.
pub struct StorefrontServer {
    config: ServerSettings,
    state: AppState,
    shutdown: ShutdownCoordinator,
}

impl StorefrontServer {
    /// Create a new server.
    pub fn new(config: ServerSettings, bootstrap: Arc<Bootstrap>, cookie_name: &str) -> Self {
        Self {
            config,
            state: AppState {
                bootstrap,
                cookie_name: Arc::from(cookie_name),
                start_time: Instant::now(),
                metrics: None,
            },
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route("/logout", post(logout_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind the configured host and port (`0` picks a free port).
    pub async fn bind(&self) -> io::Result<TcpListener> {
        TcpListener::bind((self.config.host.as_str(), self.config.port)).await
    }

    /// Serve on `listener` until the shutdown coordinator fires, then drain
    /// in-flight requests.
    pub async fn serve(&self, listener: TcpListener) -> io::Result<()> {
        let addr = listener.local_addr()?;
        info!(%addr, "storefront listening");
        let token = self.shutdown.token();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await?;
        info!("storefront stopped accepting requests");
        Ok(())
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }


    /// Get the request bootstrap.
    pub fn bootstrap(&self) -> &Arc<Bootstrap> {
        &self.state.bootstrap
    }
}

/// GET /, the storefront landing page.
///
/// Catalog content is supplied by page logic outside this crate; the
/// landing page is the bare header and footer.
async fn index_handler(page: PageRequest) -> Response {
    page.respond("").await
}

/// POST /logout
async fn logout_handler(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let token = jar.get(&state.cookie_name).map(|c| c.value().to_string());
    let _ = state.bootstrap.end_session(token.as_deref()).await;
    let jar = jar.remove(cleared_cookie(&state.cookie_name));
    (jar, Redirect::to("/"))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let sessions = state.bootstrap.active_sessions().await;
    Json(HealthResponse::new(state.start_time.elapsed(), sessions))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
