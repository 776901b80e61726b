//! Checkout API handler.
//!
//! Creates a hosted Stripe checkout session for one unit of a price and
//! hands its URL back to the browser, which navigates there.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ignite_shop_core::{CheckoutResponse, PriceId};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::state::AppState;

/// Error body returned when the request names no price.
pub const PRICE_NOT_FOUND: &str = "Price not found";

/// Request body for `POST /api/checkout`.
///
/// `priceId` is optional here so a missing field gets the same answer as
/// an empty one.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    pub price_id: Option<String>,
}

/// Create a checkout session.
pub async fn create(
    State(state): State<AppState>,
    body: std::result::Result<Json<CheckoutBody>, JsonRejection>,
) -> Result<Response> {
    let Some(price_id) = requested_price(body) else {
        return Ok(price_not_found());
    };

    add_breadcrumb(
        "checkout",
        "Creating checkout session",
        &[("price_id", price_id.as_str())],
    );

    let session = state
        .stripe()
        .create_checkout_session(&price_id, &state.config().checkout)
        .await?;

    let checkout_url = session.url.ok_or_else(|| {
        AppError::Internal(format!("checkout session {} has no url", session.id))
    })?;

    tracing::info!(
        price_id = %price_id,
        session_id = %session.id,
        "Checkout session created"
    );

    Ok((StatusCode::CREATED, Json(CheckoutResponse { checkout_url })).into_response())
}

/// The trimmed, non-empty price id from a request body.
fn requested_price(
    body: std::result::Result<Json<CheckoutBody>, JsonRejection>,
) -> Option<PriceId> {
    let Json(body) = body.ok()?;
    let price_id = body.price_id?;
    let price_id = price_id.trim();

    (!price_id.is_empty()).then(|| PriceId::new(price_id))
}

fn price_not_found() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": PRICE_NOT_FOUND })),
    )
        .into_response()
}
