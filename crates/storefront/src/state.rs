//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::CatalogResolver;
use crate::config::StorefrontConfig;
use crate::pages::ProductPages;
use crate::stripe::{StripeClient, StripeError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the Stripe client, the generated pages and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    stripe: StripeClient,
    pages: ProductPages<StripeClient>,
}

impl AppState {
    /// Create a new application state. No pages are generated yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the Stripe client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StripeError> {
        let stripe = StripeClient::new(&config.stripe)?;
        let resolver = CatalogResolver::new(stripe.clone(), config.catalog.prerender_ids.clone());
        let pages = ProductPages::new(resolver, config.catalog.revalidate);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                stripe,
                pages,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the Stripe API client.
    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    /// Get a reference to the generated product pages.
    #[must_use]
    pub fn pages(&self) -> &ProductPages<StripeClient> {
        &self.inner.pages
    }
}
