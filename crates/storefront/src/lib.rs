//! Ignite Shop Storefront library.
//!
//! The storefront binary and `ignite-cli` share this code: configuration,
//! the Stripe client, the catalog resolver and the page store.
//!
//! # Security
//!
//! This crate holds the Stripe secret key. Nothing in it hands the key,
//! or any raw Stripe error, to a browser.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod pages;
pub mod routes;
pub mod state;
pub mod stripe;
