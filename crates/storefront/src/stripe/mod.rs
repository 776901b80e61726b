//! Stripe REST API client.
//!
//! # Architecture
//!
//! - Plain `reqwest` over the form-encoded Stripe REST API
//! - Stripe is source of truth for products and prices - no local sync
//! - Generated pages are cached by [`crate::pages`], not here
//!
//! # Endpoints used
//!
//! - `GET  /v1/products/{id}?expand[]=default_price` - catalog lookup
//! - `POST /v1/checkout/sessions` - hosted checkout for one price

mod types;

use std::sync::Arc;

use ignite_shop_core::{PriceId, ProductId};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::{CheckoutConfig, StripeConfig};

pub use types::{Expandable, StripeCheckoutSession, StripePrice, StripeProduct};
use types::ErrorEnvelope;

/// Stripe API version pinned for every request.
const API_VERSION: &str = "2024-06-20";

/// Errors that can occur when interacting with the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Stripe.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Client could not be built from configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Client for the Stripe REST API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be used as a header value or the
    /// HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let mut headers = HeaderMap::new();

        let mut auth_value =
            HeaderValue::from_str(&format!("Bearer {}", config.secret_key.expose_secret()))
                .map_err(|e| StripeError::Config(format!("Invalid API key format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        headers.insert("Stripe-Version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: config.api_base.clone(),
            }),
        })
    }

    /// Retrieve a product with its default price expanded.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::NotFound` for an unknown id, or another variant
    /// if the request or response parsing fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn retrieve_product(&self, id: &ProductId) -> Result<StripeProduct, StripeError> {
        let url = format!(
            "{}/products/{}?expand%5B%5D=default_price",
            self.inner.api_base,
            urlencoding::encode(id.as_str())
        );

        let response = self.inner.client.get(&url).send().await?;
        let product: StripeProduct = parse_response(response, id.as_str()).await?;

        debug!(images = product.images.len(), "Retrieved product");
        Ok(product)
    }

    /// Create a hosted checkout session for one unit of `price_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if Stripe rejects the price or the request fails.
    #[instrument(skip(self, urls), fields(price_id = %price_id))]
    pub async fn create_checkout_session(
        &self,
        price_id: &PriceId,
        urls: &CheckoutConfig,
    ) -> Result<StripeCheckoutSession, StripeError> {
        let url = format!("{}/checkout/sessions", self.inner.api_base);
        let params = checkout_session_params(price_id, urls);

        let response = self.inner.client.post(&url).form(&params).send().await?;
        let session: StripeCheckoutSession = parse_response(response, price_id.as_str()).await?;

        debug!(session_id = %session.id, "Created checkout session");
        Ok(session)
    }
}

/// Form body for `POST /v1/checkout/sessions`.
fn checkout_session_params<'a>(
    price_id: &'a PriceId,
    urls: &'a CheckoutConfig,
) -> Vec<(&'static str, &'a str)> {
    vec![
        ("mode", "payment"),
        ("line_items[0][price]", price_id.as_str()),
        ("line_items[0][quantity]", "1"),
        ("success_url", urls.success_url.as_str()),
        ("cancel_url", urls.cancel_url.as_str()),
    ]
}

/// Map a Stripe response to `T` or a typed error.
async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
    resource: &str,
) -> Result<T, StripeError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(StripeError::RateLimited(retry_after));
    }

    let body = response.text().await?;

    if status == StatusCode::NOT_FOUND {
        return Err(StripeError::NotFound(resource.to_string()));
    }

    if !status.is_success() {
        tracing::error!(
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "Stripe API returned non-success status"
        );
        return Err(StripeError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse Stripe response"
        );
        StripeError::Parse(e)
    })
}

/// Pull `error.message` out of a Stripe error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match (envelope.error.message, envelope.error.code) {
            (Some(message), Some(code)) => format!("{message} ({code})"),
            (Some(message), None) => message,
            (None, Some(code)) => code,
            (None, None) => "(no error details provided)".to_string(),
        },
        Err(_) => body.chars().take(200).collect(),
    }
}
