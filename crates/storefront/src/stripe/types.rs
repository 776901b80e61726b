//! Wire types for the Stripe REST API.
//!
//! Only the fields the storefront reads are modelled; Stripe adds fields
//! freely and unknown keys are ignored.

use ignite_shop_core::CheckoutSessionId;
use serde::Deserialize;

/// A field Stripe returns either as a bare id or, when requested with
/// `expand[]`, as the full object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    /// The full object.
    Object(Box<T>),
    /// Only the id; the object was not expanded.
    Id(String),
}

/// A catalog product (`object: "product"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StripeProduct {
    /// Product id (`prod_...`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Image URLs, first one is the primary image.
    #[serde(default)]
    pub images: Vec<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Default price, expanded when requested.
    #[serde(default)]
    pub default_price: Option<Expandable<StripePrice>>,
}

/// A price (`object: "price"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StripePrice {
    /// Price id (`price_...`).
    pub id: String,
    /// Amount in minor currency units; absent for custom or tiered prices.
    #[serde(default)]
    pub unit_amount: Option<i64>,
    /// Lowercase ISO 4217 code.
    #[serde(default)]
    pub currency: String,
}

/// A hosted checkout session (`object: "checkout.session"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StripeCheckoutSession {
    /// Session id (`cs_...`).
    pub id: CheckoutSessionId,
    /// Hosted page URL; null once the session is complete or expired.
    #[serde(default)]
    pub url: Option<String>,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

/// Body of [`ErrorEnvelope`].
#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}
