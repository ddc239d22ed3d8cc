//! Query server for the published graph and dashboard documents.
//!
//! # Module Structure
//!
//! - `handlers` - HTTP route handlers
//! - `models` - API response types

mod handlers;
mod models;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use hubgraph_core::{PublicationReader, ServerConfig};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state for the server.
pub struct AppState {
    /// Read-only view of the latest publication.
    pub publications: PublicationReader,
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the query server.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// Address to bind.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Whether to open the browser automatically.
    pub open_browser: bool,
    /// Static front-end files served at `/`.
    pub public_dir: Option<PathBuf>,
}

impl ServeConfig {
    pub fn from_server_config(config: &ServerConfig, open_browser: bool) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            open_browser,
            public_dir: config.public_dir.as_ref().map(PathBuf::from),
        }
    }

    /// URL a local browser should open.
    pub fn local_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

// =============================================================================
// Router
// =============================================================================

/// Build the router over a publication reader.
pub fn router(publications: PublicationReader, public_dir: Option<PathBuf>) -> Router {
    let state = Arc::new(AppState { publications });

    let app = Router::new()
        .route("/graphdata.json", get(handlers::graph_data))
        .route("/dashboarddata.json", get(handlers::dashboard_data))
        .route("/api/status", get(handlers::status))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state);

    match public_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    }
}

// =============================================================================
// Server Entry Point
// =============================================================================

/// Bind the listener. Fails fast so a port clash surfaces before polling.
pub async fn bind(config: &ServeConfig) -> std::io::Result<TcpListener> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    TcpListener::bind(addr).await
}

/// Serve the published documents until the process exits.
pub async fn start_server(
    listener: TcpListener,
    config: ServeConfig,
    publications: PublicationReader,
) -> std::io::Result<()> {
    let app = router(publications, config.public_dir.clone());
    let url = config.local_url();

    tracing::info!(url = %url, "Serving graph data");

    if config.open_browser {
        if let Err(e) = open::that(&url) {
            tracing::warn!(error = %e, "Could not open browser");
        }
    }

    axum::serve(listener, app).await
}
