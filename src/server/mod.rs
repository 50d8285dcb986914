//! HTTP prediction server
//!
//! Serves `GET /` and `POST /predict` on top of a single [`InferenceService`]
//! that is loaded once at start-up and shared read-only by all handlers.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::PredictResponse;
pub use state::AppState;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::inference::InferenceService;

/// Default artifact location when `MODEL_PATH` is unset
pub const DEFAULT_MODEL_PATH: &str = "model.bin";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH)),
            cors_origin: std::env::var("CORS_ORIGIN").ok().filter(|o| !o.is_empty()),
        }
    }
}

impl ServerConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = Some(origin.into());
        self
    }
}

/// Load the model, then serve until ctrl+c
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(
        model_path = %config.model_path.display(),
        started_at = %start_time.to_rfc3339(),
        "Loading model artifact"
    );

    let service = Arc::new(InferenceService::new(&config.model_path));
    let loader = Arc::clone(&service);
    tokio::task::spawn_blocking(move || loader.load()).await??;

    if let Ok(metadata) = service.metadata() {
        info!(
            candidate = %metadata.candidate.name,
            labels = metadata.labels.len(),
            trained_at = %metadata.trained_at,
            "Model ready"
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = Arc::new(AppState::new(config.clone(), service));
    let app = create_router(state);

    info!(
        host = %config.host,
        port = config.port,
        address = %addr,
        cors_origin = %config.cors_origin.as_deref().unwrap_or("*"),
        "Obesity prediction server starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install ctrl+c handler");
            return;
        }
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let config = ServerConfig::default()
            .with_host("127.0.0.1")
            .with_port(9000)
            .with_model_path("artifacts/model.bin")
            .with_cors_origin("http://localhost:3000");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.model_path, PathBuf::from("artifacts/model.bin"));
        assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:3000"));
    }
}
