//! Statistics HTTP endpoint.
//!
//! A single pull-based route: `GET /statistics` drains the store and
//! returns the measurements as JSON. Each call is destructive, so only
//! one collector should poll it.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::State, response::Json, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::stats::{StatisticsStore, StatsDump};

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<StatisticsStore>,
}

/// Build the router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/statistics", get(handle_statistics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_statistics(State(state): State<AppState>) -> Json<StatsDump> {
    Json(state.store.dump())
}

/// Statistics API server.
pub struct Server {
    port: u16,
    state: AppState,
}

impl Server {
    pub fn new(port: u16, store: Arc<StatisticsStore>) -> Self {
        Self {
            port,
            state: AppState { store },
        }
    }

    /// Bind and serve until the process terminates. A bind failure is
    /// fatal to startup.
    pub async fn start(&self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind statistics endpoint on {addr}"))?;

        tracing::info!("statistics endpoint listening on {addr}");
        axum::serve(listener, router(self.state.clone()))
            .await
            .context("statistics endpoint terminated")?;
        Ok(())
    }
}
