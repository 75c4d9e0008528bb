use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::api;
use crate::config::ServerConfig;
use crate::planner::EtaPlanner;

pub fn app(planner: Arc<EtaPlanner>, static_dir: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api::router(planner))
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
}

pub async fn run(planner: Arc<EtaPlanner>, server: &ServerConfig) -> Result<()> {
    let app = app(planner, &server.static_dir);

    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Cannot bind to {addr}"))?;
    tracing::info!("Web server running at http://localhost:{}", server.port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
