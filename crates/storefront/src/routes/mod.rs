//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Redirect to the first launch product
//! GET  /health                 - Health check
//! GET  /product/{id}           - Product detail (or loading placeholder)
//! POST /api/checkout           - Create a Stripe checkout session (rate limited)
//! ```

pub mod checkout;
pub mod product;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::checkout_rate_limiter;
use crate::state::AppState;

/// Create the checkout API router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/api/checkout", post(checkout::create))
        .layer(checkout_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(product::home))
        .route("/health", get(health))
        .route("/product/{id}", get(product::show))
        .merge(checkout_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check Stripe.
async fn health() -> &'static str {
    "ok"
}
