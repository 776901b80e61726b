//! Catalog resolver: turns a Stripe product into a [`ProductView`].
//!
//! Resolution is a single read with the default price expanded. Nothing is
//! retried and nothing is validated locally; the id is passed straight to
//! Stripe and any failure goes back to the caller.

use std::future::Future;

use ignite_shop_core::{CurrencyCode, Price, PriceId, ProductId, ProductView};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::stripe::{Expandable, StripeClient, StripeError, StripeProduct};

/// Every price on the page is shown in reais.
const STORE_CURRENCY: CurrencyCode = CurrencyCode::BRL;

/// Why a product could not be turned into a page.
#[derive(Debug, Error)]
pub enum ResolutionFailure {
    /// The catalog lookup itself failed (unknown id, network, API error).
    #[error("catalog lookup failed for {id}: {source}")]
    Catalog {
        id: ProductId,
        #[source]
        source: StripeError,
    },

    /// The product has no default price to sell.
    #[error("product {0} has no default price")]
    MissingDefaultPrice(ProductId),

    /// The default price came back as a bare id instead of an object.
    #[error("product {0} default price was not expanded")]
    UnexpandedDefaultPrice(ProductId),
}

impl ResolutionFailure {
    /// Whether the catalog does not know this id at all.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Catalog {
                source: StripeError::NotFound(_),
                ..
            }
        )
    }
}

/// Source of product records.
pub trait ProductCatalog: Send + Sync + 'static {
    /// Fetch a product with its default price expanded.
    fn retrieve_product(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = Result<StripeProduct, StripeError>> + Send;
}

impl ProductCatalog for StripeClient {
    fn retrieve_product(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = Result<StripeProduct, StripeError>> + Send {
        Self::retrieve_product(self, id)
    }
}

/// Ids to generate eagerly, and whether others may be generated on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrerenderPaths {
    /// Product ids generated before the server accepts traffic.
    pub ids: Vec<ProductId>,
    /// Ids outside `ids` are resolved on first request rather than rejected.
    pub allow_on_demand: bool,
}

/// Resolves product ids against a [`ProductCatalog`].
pub struct CatalogResolver<C> {
    catalog: C,
    prerender_ids: Vec<ProductId>,
}

impl<C: ProductCatalog> CatalogResolver<C> {
    /// Create a resolver that pre-renders `prerender_ids`.
    pub const fn new(catalog: C, prerender_ids: Vec<ProductId>) -> Self {
        Self {
            catalog,
            prerender_ids,
        }
    }

    /// The fixed set of ids to build eagerly. Any other id is still
    /// resolved when first requested.
    #[must_use]
    pub fn prerender_paths(&self) -> PrerenderPaths {
        PrerenderPaths {
            ids: self.prerender_ids.clone(),
            allow_on_demand: true,
        }
    }

    /// Look up `id` and build its view.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionFailure` if the lookup fails or the record has no
    /// usable default price.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn resolve(&self, id: &ProductId) -> Result<ProductView, ResolutionFailure> {
        let product = self
            .catalog
            .retrieve_product(id)
            .await
            .map_err(|source| ResolutionFailure::Catalog {
                id: id.clone(),
                source,
            })?;

        let view = product_view(product)?;
        debug!(price = %view.formatted_price, "Resolved product");
        Ok(view)
    }
}

/// Map a Stripe product record onto the page's view model.
///
/// # Errors
///
/// Returns `ResolutionFailure` if the default price is missing or was not
/// expanded.
pub fn product_view(product: StripeProduct) -> Result<ProductView, ResolutionFailure> {
    let id = ProductId::new(product.id);

    let price = match product.default_price {
        Some(Expandable::Object(price)) => price,
        Some(Expandable::Id(_)) => return Err(ResolutionFailure::UnexpandedDefaultPrice(id)),
        None => return Err(ResolutionFailure::MissingDefaultPrice(id)),
    };

    if !price.currency.eq_ignore_ascii_case(STORE_CURRENCY.code()) {
        warn!(
            product_id = %id,
            currency = %price.currency,
            "Default price is not in the store currency; formatting as {}",
            STORE_CURRENCY.code()
        );
    }

    let formatted_price = price.unit_amount.map_or_else(
        || Price::zero(STORE_CURRENCY),
        |minor| Price::from_minor_units(minor, STORE_CURRENCY),
    );

    Ok(ProductView {
        id,
        name: product.name,
        image_url: product.images.into_iter().next(),
        formatted_price: formatted_price.format(),
        description: product.description,
        default_price_id: PriceId::new(price.id),
    })
}
