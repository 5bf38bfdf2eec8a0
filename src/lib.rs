//! Chest Numbers server
//!
//! Turns a set of jersey numbers into a printable multi-page PDF, two
//! records per page, each with a large zero-padded label and a scannable QR
//! code. Generation streams the document while reporting progress to an
//! SSE channel polled by the browser.
//!
//! # Modules
//!
//! - `numbers`: request validation and number-set expansion
//! - `qr`: content-addressed on-disk QR image cache
//! - `progress`: process-wide progress tracking with SSE subscription
//! - `pdf`: streaming document writer and the render pipeline
//! - `routes`: HTTP surface

pub mod config;
pub mod error;
pub mod numbers;
pub mod pdf;
pub mod progress;
pub mod qr;
pub mod routes;
pub mod state;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router with CORS and request tracing layers.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest(
            "/api",
            routes::generate::router().merge(routes::progress::router()),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
