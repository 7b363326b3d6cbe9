//! HTTP route handlers for the gateway.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (probes backend)
//!
//! # Catalog (served from the snapshot store)
//! GET  /api/events                      - Event listing (?refresh=true forces)
//! GET  /api/categories                  - Category listing
//! GET  /api/locations                   - Location listing
//! GET  /api/orders                      - Order listing
//! GET  /api/balance                     - Caller's balance (requires auth)
//!
//! # Proxies (relay upstream status/body)
//! DELETE /api/events/delete-image       - Remove an event image
//! POST   /api/payment/create            - Create a payment (requires auth)
//! GET    /api/payment/installments      - Installment plans for an amount
//! GET    /api/payment/methods           - Available payment methods
//! GET    /api/payment/status/{payment_id} - Payment status (requires auth)
//!
//! # Uploads
//! POST /api/upload                      - Multipart image upload to storage
//! ```

pub mod catalog;
pub mod proxy;
pub mod upload;

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    mutation_rate_limiter, request_id_middleware, security_headers_middleware,
    upload_rate_limiter,
};
use crate::state::AppState;

/// Multipart bodies may exceed the 5 MiB image limit by a little framing
/// overhead; the route itself enforces the real limit.
const UPLOAD_BODY_LIMIT: usize = 6 * 1024 * 1024;

/// Build the gateway's API router (no middleware applied).
pub fn routes() -> Router<AppState> {
    let payments = Router::new()
        .route("/api/payment/create", post(proxy::payment_create))
        .layer(mutation_rate_limiter());

    let uploads = Router::new()
        .route("/api/upload", post(upload::upload_image))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(upload_rate_limiter());

    Router::new()
        .route("/api/events", get(catalog::list_events))
        .route("/api/categories", get(catalog::list_categories))
        .route("/api/locations", get(catalog::list_locations))
        .route("/api/orders", get(catalog::list_orders))
        .route("/api/balance", get(catalog::get_balance))
        .route("/api/events/delete-image", delete(proxy::delete_event_image))
        .route("/api/payment/installments", get(proxy::payment_installments))
        .route("/api/payment/methods", get(proxy::payment_methods))
        .route(
            "/api/payment/status/{payment_id}",
            get(proxy::payment_status),
        )
        .merge(payments)
        .merge(uploads)
}

/// Build the complete application: routes, health checks, and the
/// middleware stack. The binary adds the Sentry layers on top.
pub fn app(state: AppState) -> Router {
    // The frontend is served from another origin; catalog data is public.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the Data Service is reachable before returning OK.
/// Returns 503 Service Unavailable if it is not.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.backend().health().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
