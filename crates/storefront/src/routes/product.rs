//! Product page route handlers.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::header::CACHE_CONTROL,
    response::{IntoResponse, Redirect, Response},
};
use ignite_shop_core::{CHECKOUT_FAILED_MESSAGE, ProductId, ProductView};

use crate::error::{AppError, Result};
use crate::filters;
use crate::pages::{GeneratedPage, PageLookup};
use crate::state::AppState;

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "product/show.html")]
pub struct ProductShowTemplate {
    pub product: Arc<ProductView>,
    pub checkout_failed_message: &'static str,
}

/// Placeholder shown while an on-demand page is being generated.
#[derive(Template, WebTemplate)]
#[template(path = "product/loading.html")]
pub struct LoadingTemplate {
    pub product_id: ProductId,
}

/// Send visitors to the first launch product.
pub async fn home(State(state): State<AppState>) -> Result<Redirect> {
    let paths = state.pages().list_prerender_ids();
    let first = paths
        .ids
        .first()
        .ok_or_else(|| AppError::NotFound("no products configured".to_string()))?;

    Ok(Redirect::temporary(&format!(
        "/product/{}",
        urlencoding::encode(first.as_str())
    )))
}

/// Display product detail page.
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let id = ProductId::new(id);

    match state.pages().lookup(&id).await {
        PageLookup::Ready(page) => Ok((
            [(CACHE_CONTROL, page_cache_control(&page))],
            ProductShowTemplate {
                product: page.view,
                checkout_failed_message: CHECKOUT_FAILED_MESSAGE,
            },
        )
            .into_response()),
        PageLookup::Fallback => Ok((
            [(CACHE_CONTROL, "no-store")],
            LoadingTemplate { product_id: id },
        )
            .into_response()),
        PageLookup::NotFound => Err(AppError::NotFound(format!("product {id}"))),
        PageLookup::Unavailable => Err(AppError::Unavailable(format!("product {id}"))),
    }
}

/// Shared caches may keep the page until it goes stale, then serve it for
/// one more window while they refetch.
fn page_cache_control(page: &GeneratedPage) -> String {
    format!(
        "public, s-maxage={}, stale-while-revalidate={}",
        page.remaining_freshness().as_secs(),
        page.revalidate_after.as_secs()
    )
}
