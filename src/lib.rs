//! Portfolio CMS backend - library for app logic and testing

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod notify;
pub mod policy;
pub mod routes;
pub mod seed;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware, Router,
};
use tokio::net::TcpListener;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    sensitive_headers::SetSensitiveRequestHeadersLayer, services::ServeDir, trace::TraceLayer,
};

use crate::auth::TokenManager;
use crate::config::{AppConfig, DEFAULT_JWT_SECRET};
use crate::db::{MemoryStore, PgStore, Repository, Resource, Store};
use crate::notify::{LogMailer, Mailer};

/// Multipart framing allowance on top of the largest accepted file.
const BODY_OVERHEAD: usize = 1024 * 1024;

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub tokens: TokenManager,
    pub mailer: Arc<dyn Mailer>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            tokens: TokenManager::new(&config.auth),
            config: Arc::new(config),
            store,
            mailer,
            started_at: Instant::now(),
        }
    }

    pub fn repo<R: Resource>(&self) -> Repository<R> {
        Repository::new(self.store.clone(), self.config.auth.bcrypt_cost)
    }
}

/// CORS for the configured frontend origins.
pub fn configure_cors(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors(&state.config);
    let body_limit = state.config.uploads.max_bytes.saturating_add(BODY_OVERHEAD);

    Router::new()
        .nest("/api", routes::api_router(&state))
        .merge(routes::health::router())
        .nest_service("/uploads", ServeDir::new(&state.config.uploads.dir))
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(SetSensitiveRequestHeadersLayer::new([header::AUTHORIZATION]))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .with_state(state)
}

async fn connect_store(config: &AppConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    match &config.database {
        Some(db) => Ok(Arc::new(PgStore::connect(db).await?)),
        None => {
            tracing::warn!("DATABASE_URL not set. Using the in-memory store; data is lost on restart.");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Run the server (used by main).
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Guards must outlive the server or buffered log lines are lost.
    let _log_guards = logging::init(&logging::LogSettings::from_env());

    let config = AppConfig::from_env();
    if config.is_production() && config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        return Err("JWT_SECRET must be set to a secure, unique value in production".into());
    }
    if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        tracing::warn!("JWT_SECRET not set. Using the development default.");
    }

    let store = connect_store(&config).await?;
    tokio::fs::create_dir_all(&config.uploads.dir).await?;

    if let Some(keep_alive) = config.keep_alive.clone() {
        jobs::KeepAlive::new(keep_alive)?.spawn();
    }

    let addr = config.bind_address();
    let state = AppState::new(config, store, Arc::new(LogMailer));
    let app = create_app(state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Starting server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
}
