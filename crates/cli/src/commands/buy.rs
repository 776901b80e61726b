//! Checkout smoke test against a running storefront.
//!
//! # Usage
//!
//! ```bash
//! ignite-cli buy price_1 --base-url http://127.0.0.1:3000 --timeout-secs 10
//! ```
//!
//! Goes through the same idle/pending control the product page uses. The
//! "navigation" prints the checkout URL on stdout; the failure notification
//! is logged.

use std::time::Duration;

use ignite_shop_core::{
    Browser, CheckoutApi, CheckoutFailure, CheckoutRequest, CheckoutResponse, PriceId,
    PurchaseInitiator, PurchaseOutcome,
};
use thiserror::Error;
use url::Url;

/// Path of the storefront checkout endpoint.
const CHECKOUT_PATH: &str = "/api/checkout";

/// Errors that can occur during the buy command.
#[derive(Debug, Error)]
pub enum BuyError {
    /// The base URL is not a valid absolute URL.
    #[error("Invalid base URL {0}: {1}")]
    InvalidBaseUrl(String, url::ParseError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Checkout did not produce a session.
    #[error("Checkout failed: {0}")]
    Checkout(#[from] CheckoutFailure),
}

/// `CheckoutApi` that posts to a storefront's `/api/checkout`.
pub struct HttpCheckoutApi {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpCheckoutApi {
    /// Create a client for the storefront at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BuyError> {
        let endpoint = checkout_endpoint(base_url)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

impl CheckoutApi for HttpCheckoutApi {
    async fn create_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse, CheckoutFailure> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| CheckoutFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckoutFailure::Status(status.as_u16()));
        }

        response
            .json::<CheckoutResponse>()
            .await
            .map_err(|e| CheckoutFailure::Malformed(e.to_string()))
    }
}

/// `Browser` for a terminal: navigation prints, notification logs.
pub struct TerminalBrowser;

impl Browser for TerminalBrowser {
    #[allow(clippy::print_stdout)]
    fn navigate(&self, url: &str) {
        println!("{url}");
    }

    fn notify(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// Start a checkout for `price_id` through the storefront at `base_url`.
///
/// # Errors
///
/// Returns an error if the storefront could not create a session.
pub async fn buy(price_id: &str, base_url: &str, timeout_secs: u64) -> Result<(), BuyError> {
    let api = HttpCheckoutApi::new(base_url, Duration::from_secs(timeout_secs))?;
    let initiator = PurchaseInitiator::new(api, TerminalBrowser);

    tracing::info!(price_id, base_url, "Starting checkout");

    match initiator.initiate(&PriceId::new(price_id)).await {
        PurchaseOutcome::Redirected(url) => {
            tracing::info!(checkout_url = %url, "Checkout session ready");
            Ok(())
        }
        PurchaseOutcome::Failed(failure) => Err(failure.into()),
        // A fresh initiator is never pending
        PurchaseOutcome::Ignored => Ok(()),
    }
}

fn checkout_endpoint(base_url: &str) -> Result<Url, BuyError> {
    Url::parse(base_url)
        .and_then(|base| base.join(CHECKOUT_PATH))
        .map_err(|e| BuyError::InvalidBaseUrl(base_url.to_string(), e))
}
