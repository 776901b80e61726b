//! Product view model.

use serde::{Deserialize, Serialize};

use crate::types::{PriceId, ProductId};

/// Store name appended to every page title.
pub const STORE_NAME: &str = "Ignite Shop";

/// A product resolved from the catalog, ready to render.
///
/// Built once per page generation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    /// Catalog identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// First catalog image, if the record has any.
    pub image_url: Option<String>,
    /// Locale-formatted price, e.g. `R$ 99,90`.
    pub formatted_price: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Default price object, the input to checkout.
    pub default_price_id: PriceId,
}

impl ProductView {
    /// Title for the product page, e.g. `Camiseta | Ignite Shop`.
    #[must_use]
    pub fn page_title(&self) -> String {
        format!("{} | {STORE_NAME}", self.name)
    }
}
