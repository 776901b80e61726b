//! Catalog commands.
//!
//! # Usage
//!
//! ```bash
//! ignite-cli paths
//! ignite-cli resolve prod_NdSKKrvk4LDcXT
//! ```
//!
//! # Environment Variables
//!
//! Same as the storefront: `STRIPE_SECRET_KEY`, `IGNITE_BASE_URL`, and
//! optionally `IGNITE_PRERENDER_IDS`, `STRIPE_API_BASE`.

use ignite_shop_core::ProductId;
use ignite_shop_storefront::catalog::ResolutionFailure;
use ignite_shop_storefront::config::{ConfigError, StorefrontConfig};
use ignite_shop_storefront::state::AppState;
use ignite_shop_storefront::stripe::StripeError;
use thiserror::Error;

/// Errors that can occur during catalog commands.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Storefront configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Stripe client could not be built.
    #[error("Stripe error: {0}")]
    Stripe(#[from] StripeError),

    /// The product did not resolve.
    #[error("Resolution failed: {0}")]
    Resolution(#[from] ResolutionFailure),

    /// The view could not be printed.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

fn load_state() -> Result<AppState, CatalogError> {
    let config = StorefrontConfig::from_env()?;
    Ok(AppState::new(config)?)
}

/// Print the ids generated at startup, one per line.
#[allow(clippy::print_stdout)]
pub fn paths() -> Result<(), CatalogError> {
    let state = load_state()?;
    let paths = state.pages().list_prerender_ids();

    for id in &paths.ids {
        println!("{id}");
    }
    tracing::info!(
        count = paths.ids.len(),
        allow_on_demand = paths.allow_on_demand,
        "Listed pre-render ids"
    );
    Ok(())
}

/// Resolve one product and print the view as JSON.
#[allow(clippy::print_stdout)]
pub async fn resolve(product_id: &str) -> Result<(), CatalogError> {
    let state = load_state()?;
    let page = state
        .pages()
        .resolve_for_id(&ProductId::new(product_id))
        .await?;

    println!("{}", serde_json::to_string_pretty(page.view.as_ref())?);
    tracing::info!(
        revalidate_secs = page.revalidate_after.as_secs(),
        "Resolved product"
    );
    Ok(())
}
