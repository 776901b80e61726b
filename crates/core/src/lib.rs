//! Ignite Shop Core - Shared domain types.
//!
//! This crate provides the types used by every Ignite Shop component:
//! - `storefront` - Server-rendered product page and checkout endpoint
//! - `cli` - Command-line tools for inspecting the catalog and testing checkout
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure logic - no HTTP
//! clients, no runtime. Anything that talks to the network is supplied by
//! the binaries through the traits in [`checkout`].
//!
//! # Modules
//!
//! - [`types`] - Newtype ids and locale-aware prices
//! - [`product`] - The view model rendered on the product page
//! - [`checkout`] - Checkout request/response bodies and the purchase initiator

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod product;
pub mod types;

pub use checkout::{
    Browser, CHECKOUT_FAILED_MESSAGE, CheckoutApi, CheckoutFailure, CheckoutRequest,
    CheckoutResponse, PurchaseInitiator, PurchaseOutcome, PurchaseState,
};
pub use product::ProductView;
pub use types::*;
