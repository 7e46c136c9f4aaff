//! Clinic Server - clinic records HTTP API
//!
//! Patients, appointments, prescriptions, consultations and medical records
//! over PostgreSQL, with optional Google Calendar synchronization.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use server::AppState;

use axum::{middleware::from_fn, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the main application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let enable_swagger = state.config.enable_swagger;
    let cors = middleware::create_cors_layer(state.config.allowed_origins());

    routes::create_routes(enable_swagger)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(from_fn(middleware::request_timing_middleware)),
        )
        .with_state(state)
}
