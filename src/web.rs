mod handler;

use crate::service::SpecService;
use crate::web::handler::{defs_handler, spec_handler, try_handler};
use axum::routing::{any, get};
use axum::Router;
use axum_macros::FromRef;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone, FromRef)]
struct AppState {
    service: Arc<SpecService>,
}

pub fn router(service: Arc<SpecService>) -> Router {
    Router::new()
        .route("/:branch/files/:filename/json/", get(spec_handler))
        .route("/:branch/files/:filename/json/*defs", get(defs_handler))
        .route("/:branch/try/:filename/*path", any(try_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

pub async fn serve_with_config(addr: SocketAddr, service: Arc<SpecService>) -> hyper::Result<()> {
    let app = router(service);

    tracing::info!("spear listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Serves on an already bound listener.
pub async fn serve_listener(listener: TcpListener, service: Arc<SpecService>) -> hyper::Result<()> {
    let app = router(service);

    axum::Server::from_tcp(listener)?
        .serve(app.into_make_service())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
