//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Unknown routes answer with a JSON 404
async fn fallback_handler() -> impl IntoResponse {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"error":"Not Found"}"#))
        .unwrap_or_else(|_| StatusCode::NOT_FOUND.into_response())
}

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Transactions
        .route("/transactions/new", post(handlers::new_transaction))
        .route("/transactions/pending", get(handlers::pending_transactions))
        // Mining
        .route("/mine", get(handlers::mine))
        // Chain
        .route("/chain", get(handlers::full_chain))
        .route("/chain/blocks/{index}", get(handlers::get_block))
        .route("/chain/validate", get(handlers::validate_chain))
        // Peers and consensus
        .route("/nodes", get(handlers::list_nodes))
        .route("/nodes/register", post(handlers::register_nodes))
        .route("/nodes/resolve", get(handlers::resolve))
        .fallback(fallback_handler)
        // Add state and middleware
        .with_state(state)
        .layer(cors)
}
