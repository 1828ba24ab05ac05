//! HTTP Server configuration and startup.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{self, AppState};
use crate::RateService;
use crate::openapi::ApiDoc;

/// HTTP Server for the Rates API.
pub struct HttpServer {
    state: Arc<AppState>,
}

impl HttpServer {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: RateService) -> Self {
        Self {
            state: Arc::new(AppState { service }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/currencies", get(handlers::list_currencies))
            .route(
                "/api/currencies/{code}",
                get(handlers::get_currency)
                    .put(handlers::set_currency_rate)
                    .delete(handlers::delete_currency),
            )
            .route("/api/currencies/convert", post(handlers::convert))
            .route("/api/currencies/cache/evict", post(handlers::evict_all))
            .route(
                "/api/currencies/{code}/cache/evict",
                post(handlers::evict_currency),
            )
            .route("/api/currencies/refresh", post(handlers::refresh))
            .route(
                "/api/currencies/auto-update/status",
                get(handlers::auto_update_status),
            )
            .route(
                "/api/currencies/auto-update/enable",
                post(handlers::enable_auto_update),
            )
            .route(
                "/api/currencies/auto-update/disable",
                post(handlers::disable_auto_update),
            )
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(metrics)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address until Ctrl+C or SIGTERM.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        self.run_until(addr, shutdown_signal()).await
    }

    /// Runs the server on the given address until `shutdown` resolves.
    pub async fn run_until(
        self,
        addr: &str,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
