//! Application startup and lifecycle management.

use crate::config::BenefitsConfig;
use crate::handlers;
use crate::services::{AiWebhookClient, BenefitCatalog, BenefitStore, Database, SheetsClient};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use reqwest::Client;
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state. Everything here is built once at startup and
/// cloned cheaply into each request.
#[derive(Clone)]
pub struct AppState {
    pub catalog: BenefitCatalog,
    pub webhook: AiWebhookClient,
}

impl AppState {
    pub fn new(catalog: BenefitCatalog, webhook: AiWebhookClient) -> Self {
        Self { catalog, webhook }
    }

    /// Wire the production collaborators from configuration.
    pub fn from_config(config: &BenefitsConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("benefits-service/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                AppError::InternalError(anyhow::anyhow!("Failed to build HTTP client: {}", e))
            })?;

        let store: Arc<dyn BenefitStore> = Arc::new(Database::new(&config.database)?);

        // A sheet that cannot even be set up behaves like one that fails on
        // every fetch: the database serves all requests.
        let sheets = match &config.sheets.url {
            Some(_) => match SheetsClient::from_config(client.clone(), &config.sheets) {
                Ok(sheets) => {
                    tracing::info!(
                        authenticated = sheets.is_authenticated(),
                        "Google Sheets source enabled"
                    );
                    Some(sheets)
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        "Google Sheets source misconfigured, using database only"
                    );
                    None
                }
            },
            None => {
                tracing::info!("GOOGLE_SHEETS_URL not set, using database only");
                None
            }
        };

        let webhook = AiWebhookClient::new(client, config.webhook.url.clone());
        if !webhook.is_configured() {
            tracing::warn!("N8N_WEBHOOK_URL not set - search requests will fail");
        }

        Ok(Self::new(BenefitCatalog::new(sheets, store), webhook))
    }
}

/// Routes plus the request-id and tracing layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route(
            "/benefits",
            get(handlers::benefits::list_benefits).fallback(handlers::method_not_allowed),
        )
        .route(
            "/search",
            post(handlers::search::search).fallback(handlers::method_not_allowed),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        // Must wrap TraceLayer: the span reads the id set here.
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: BenefitsConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(&config)?;
        Self::with_state(config.common.port, state).await
    }

    /// Bind a listener for already-assembled state (port 0 = random port).
    pub async fn with_state(port: u16, state: AppState) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Benefits service: HTTP on port {}", port);

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT/SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}
