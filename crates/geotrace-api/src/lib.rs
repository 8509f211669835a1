pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

/// Subscribers connect at `/` (or `/ws`); JSON status lives under `/api`.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/status", get(handlers::handle_status))
        .route("/cache", get(handlers::handle_cache))
        .route("/cache/clear", post(handlers::handle_cache_clear))
        .with_state(state.clone());

    Router::new()
        .route("/", get(handlers::handle_subscribe))
        .route("/ws", get(handlers::handle_subscribe))
        .with_state(state)
        .nest("/api", api_routes)
        .layer(cors)
}

pub async fn serve(state: ApiState, bind_addr: &str, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind((bind_addr, port)).await?;
    tracing::info!(bind_addr, port, "subscriber endpoint listening");
    serve_on(listener, state).await
}

/// Serve on an already bound listener.
pub async fn serve_on(listener: TcpListener, state: ApiState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}
