//! Product page generation with timed revalidation.
//!
//! Pages for the configured ids are generated before the server starts.
//! Any other id is generated on its first request: that request gets a
//! loading placeholder while generation runs in the background. A page
//! older than the revalidation window is still served, and triggers one
//! background regeneration; if that fails the old page stays up.
//!
//! At most one generation per id is in flight at any time.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ignite_shop_core::{ProductId, ProductView};
use moka::future::Cache;
use tracing::{error, info, warn};

use crate::catalog::{CatalogResolver, PrerenderPaths, ProductCatalog, ResolutionFailure};

/// Maximum number of remembered generation failures.
const MAX_FAILURES: u64 = 1_000;

/// How long a failed on-demand generation is remembered before retrying.
const FAILURE_TTL: Duration = Duration::from_secs(60);

/// A generated page and when it stops being fresh.
#[derive(Debug, Clone)]
pub struct GeneratedPage {
    /// The resolved product.
    pub view: Arc<ProductView>,
    /// Age after which the page is eligible for regeneration.
    pub revalidate_after: Duration,
    generated_at: Instant,
}

impl GeneratedPage {
    pub(crate) fn new(view: ProductView, revalidate_after: Duration) -> Self {
        Self {
            view: Arc::new(view),
            revalidate_after,
            generated_at: Instant::now(),
        }
    }

    /// Whether the revalidation window has passed.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.generated_at.elapsed() >= self.revalidate_after
    }

    /// Time left before the page goes stale; zero once it has.
    #[must_use]
    pub fn remaining_freshness(&self) -> Duration {
        self.revalidate_after.saturating_sub(self.generated_at.elapsed())
    }
}

/// What to serve for a product request.
#[derive(Debug, Clone)]
pub enum PageLookup {
    /// A generated page (possibly stale, with a refresh under way).
    Ready(GeneratedPage),
    /// Generation just started; show the loading placeholder.
    Fallback,
    /// The catalog has no such product.
    NotFound,
    /// Generation failed for another reason.
    Unavailable,
}

/// Why a background generation was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    OnDemand,
    Revalidate,
}

/// In-memory store of generated product pages.
///
/// Cheaply cloneable; clones share the same store.
pub struct ProductPages<C> {
    inner: Arc<ProductPagesInner<C>>,
}

impl<C> Clone for ProductPages<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ProductPagesInner<C> {
    resolver: CatalogResolver<C>,
    revalidate: Duration,
    /// Every page generated so far. Unbounded: only ids the catalog
    /// resolved land here, and a page is only ever replaced by its refresh.
    pages: Cache<ProductId, GeneratedPage>,
    /// Failed on-demand ids, `true` when the catalog reported not found.
    failures: Cache<ProductId, bool>,
    in_flight: Mutex<HashSet<ProductId>>,
}

impl<C: ProductCatalog> ProductPages<C> {
    /// Create an empty page store.
    #[must_use]
    pub fn new(resolver: CatalogResolver<C>, revalidate: Duration) -> Self {
        Self {
            inner: Arc::new(ProductPagesInner {
                resolver,
                revalidate,
                pages: Cache::builder().build(),
                failures: Cache::builder()
                    .max_capacity(MAX_FAILURES)
                    .time_to_live(FAILURE_TTL)
                    .build(),
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Ids to generate eagerly; others are generated on demand.
    #[must_use]
    pub fn list_prerender_ids(&self) -> PrerenderPaths {
        self.inner.resolver.prerender_paths()
    }

    /// Resolve `id` into a page carrying the revalidation window.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionFailure` if the product cannot be resolved.
    pub async fn resolve_for_id(&self, id: &ProductId) -> Result<GeneratedPage, ResolutionFailure> {
        let view = self.inner.resolver.resolve(id).await?;
        Ok(GeneratedPage::new(view, self.inner.revalidate))
    }

    /// Generate every prerender id. Stops at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first `ResolutionFailure`; the server must not start
    /// without its eager pages.
    pub async fn prerender(&self) -> Result<usize, ResolutionFailure> {
        let paths = self.list_prerender_ids();
        for id in &paths.ids {
            let page = self.resolve_for_id(id).await?;
            info!(product_id = %id, price = %page.view.formatted_price, "Pre-rendered product page");
            self.inner.pages.insert(id.clone(), page).await;
        }
        Ok(paths.ids.len())
    }

    /// Find the page for `id`, starting generation when needed.
    pub async fn lookup(&self, id: &ProductId) -> PageLookup {
        if let Some(page) = self.inner.pages.get(id).await {
            if page.is_stale() {
                self.spawn_generation(id.clone(), Trigger::Revalidate);
            }
            return PageLookup::Ready(page);
        }

        if let Some(not_found) = self.inner.failures.get(id).await {
            return if not_found {
                PageLookup::NotFound
            } else {
                PageLookup::Unavailable
            };
        }

        self.spawn_generation(id.clone(), Trigger::OnDemand);
        PageLookup::Fallback
    }

    /// Whether a generation for `id` is currently running.
    #[must_use]
    pub fn is_generating(&self, id: &ProductId) -> bool {
        self.in_flight().contains(id)
    }

    fn in_flight(&self) -> std::sync::MutexGuard<'_, HashSet<ProductId>> {
        // A panic while holding the lock cannot leave the set inconsistent.
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn spawn_generation(&self, id: ProductId, trigger: Trigger) {
        if !self.in_flight().insert(id.clone()) {
            return;
        }

        let pages = self.clone();
        tokio::spawn(async move {
            pages.generate(&id, trigger).await;
            pages.in_flight().remove(&id);
        });
    }

    async fn generate(&self, id: &ProductId, trigger: Trigger) {
        match self.resolve_for_id(id).await {
            Ok(page) => {
                info!(product_id = %id, ?trigger, "Generated product page");
                self.inner.failures.invalidate(id).await;
                self.inner.pages.insert(id.clone(), page).await;
            }
            Err(e) if trigger == Trigger::Revalidate => {
                warn!(product_id = %id, error = %e, "Revalidation failed, keeping stale page");
            }
            Err(e) => {
                error!(product_id = %id, error = %e, "On-demand page generation failed");
                self.inner.failures.insert(id.clone(), e.is_not_found()).await;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::tests::{FakeCatalog, camiseta};
    use crate::stripe::StripeProduct;

    const LAUNCH_ID: &str = "prod_NdSKKrvk4LDcXT";

    fn pages_with(
        catalog: &Arc<FakeCatalog>,
        revalidate: Duration,
    ) -> ProductPages<Arc<FakeCatalog>> {
        let resolver = CatalogResolver::new(Arc::clone(catalog), vec![ProductId::new(LAUNCH_ID)]);
        ProductPages::new(resolver, revalidate)
    }

    async fn settle(pages: &ProductPages<Arc<FakeCatalog>>, id: &ProductId) {
        while pages.is_generating(id) {
            tokio::task::yield_now().await;
        }
    }

    fn ready_name(lookup: PageLookup) -> String {
        match lookup {
            PageLookup::Ready(page) => page.view.name.clone(),
            other => panic!("expected a ready page, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_for_id_carries_one_hour_window() {
        let catalog = Arc::new(FakeCatalog::with([camiseta()]));
        let pages = pages_with(&catalog, Duration::from_secs(3600));

        let page = pages.resolve_for_id(&ProductId::new(LAUNCH_ID)).await.unwrap();

        assert_eq!(page.revalidate_after, Duration::from_secs(3600));
        assert_eq!(page.view.formatted_price, "R$\u{a0}99,90");
        assert!(!page.is_stale());
    }

    #[tokio::test]
    async fn test_prerendered_page_is_served_without_refetch() {
        let catalog = Arc::new(FakeCatalog::with([camiseta()]));
        let pages = pages_with(&catalog, Duration::from_secs(3600));

        assert_eq!(pages.prerender().await.unwrap(), 1);
        let lookup = pages.lookup(&ProductId::new(LAUNCH_ID)).await;

        assert_eq!(ready_name(lookup), "Camiseta");
        assert_eq!(catalog.calls(), 1);
    }

    #[tokio::test]
    async fn test_prerender_failure_is_fatal() {
        let catalog = Arc::new(FakeCatalog::default());
        let pages = pages_with(&catalog, Duration::from_secs(3600));

        let err = pages.prerender().await.unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_id_gets_fallback_then_page() {
        let catalog = Arc::new(FakeCatalog::with([StripeProduct {
            id: "prod_caneca".to_string(),
            name: "Caneca".to_string(),
            ..camiseta()
        }]));
        let pages = pages_with(&catalog, Duration::from_secs(3600));
        let id = ProductId::new("prod_caneca");

        assert!(matches!(pages.lookup(&id).await, PageLookup::Fallback));
        settle(&pages, &id).await;

        assert_eq!(ready_name(pages.lookup(&id).await), "Caneca");
        assert_eq!(catalog.calls(), 1);
    }

    #[tokio::test]
    async fn test_one_generation_in_flight_per_id() {
        let catalog = Arc::new(FakeCatalog::with([camiseta()]));
        let pages = pages_with(&catalog, Duration::from_secs(3600));
        let id = ProductId::new(LAUNCH_ID);

        pages.spawn_generation(id.clone(), Trigger::OnDemand);
        pages.spawn_generation(id.clone(), Trigger::OnDemand);
        assert!(pages.is_generating(&id));
        settle(&pages, &id).await;

        assert_eq!(catalog.calls(), 1);
        assert!(matches!(pages.lookup(&id).await, PageLookup::Ready(_)));
    }

    #[tokio::test]
    async fn test_failed_on_demand_generation_is_remembered() {
        let catalog = Arc::new(FakeCatalog::default());
        let pages = pages_with(&catalog, Duration::from_secs(3600));
        let id = ProductId::new("prod_missing");

        assert!(matches!(pages.lookup(&id).await, PageLookup::Fallback));
        settle(&pages, &id).await;

        assert!(matches!(pages.lookup(&id).await, PageLookup::NotFound));
        assert_eq!(catalog.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_price_is_unavailable_not_not_found() {
        let catalog = Arc::new(FakeCatalog::with([StripeProduct {
            default_price: None,
            ..camiseta()
        }]));
        let pages = pages_with(&catalog, Duration::from_secs(3600));
        let id = ProductId::new(LAUNCH_ID);

        pages.lookup(&id).await;
        settle(&pages, &id).await;

        assert!(matches!(pages.lookup(&id).await, PageLookup::Unavailable));
    }

    #[tokio::test]
    async fn test_stale_page_is_served_and_regenerated() {
        let catalog = Arc::new(FakeCatalog::with([camiseta()]));
        let pages = pages_with(&catalog, Duration::ZERO);
        let id = ProductId::new(LAUNCH_ID);
        pages.prerender().await.unwrap();

        catalog.put(StripeProduct {
            name: "Camiseta Nova".to_string(),
            ..camiseta()
        });

        // Stale content first, fresh content once the refresh lands.
        assert_eq!(ready_name(pages.lookup(&id).await), "Camiseta");
        settle(&pages, &id).await;
        assert_eq!(ready_name(pages.lookup(&id).await), "Camiseta Nova");
    }

    #[tokio::test]
    async fn test_failed_revalidation_keeps_stale_page() {
        let catalog = Arc::new(FakeCatalog::with([camiseta()]));
        let pages = pages_with(&catalog, Duration::ZERO);
        let id = ProductId::new(LAUNCH_ID);
        pages.prerender().await.unwrap();

        catalog.remove(LAUNCH_ID);

        assert_eq!(ready_name(pages.lookup(&id).await), "Camiseta");
        settle(&pages, &id).await;
        assert_eq!(ready_name(pages.lookup(&id).await), "Camiseta");
    }

    #[tokio::test]
    async fn test_pages_survive_a_catalog_larger_than_the_failure_memory() {
        let others: Vec<StripeProduct> = (1..1_300)
            .map(|n| StripeProduct {
                id: format!("prod_{n}"),
                name: format!("Produto {n}"),
                ..camiseta()
            })
            .collect();
        let catalog = Arc::new(FakeCatalog::with(others.iter().cloned()));
        catalog.put(camiseta());
        let pages = pages_with(&catalog, Duration::from_secs(3600));
        let launch = ProductId::new(LAUNCH_ID);

        pages.prerender().await.unwrap();
        for _ in 0..20 {
            assert!(matches!(pages.lookup(&launch).await, PageLookup::Ready(_)));
        }
        for product in &others {
            pages
                .generate(&ProductId::new(product.id.clone()), Trigger::OnDemand)
                .await;
        }
        pages.inner.pages.run_pending_tasks().await;

        assert_eq!(ready_name(pages.lookup(&launch).await), "Camiseta");
        for product in &others {
            let lookup = pages.lookup(&ProductId::new(product.id.clone())).await;
            assert_eq!(ready_name(lookup), product.name);
        }
        assert_eq!(catalog.calls(), 1_300);
    }

    #[tokio::test]
    async fn test_remaining_freshness() {
        let catalog = Arc::new(FakeCatalog::with([camiseta()]));
        let id = ProductId::new(LAUNCH_ID);

        let fresh = pages_with(&catalog, Duration::from_secs(3600))
            .resolve_for_id(&id)
            .await
            .unwrap();
        let stale = pages_with(&catalog, Duration::ZERO)
            .resolve_for_id(&id)
            .await
            .unwrap();

        assert!(fresh.remaining_freshness() > Duration::from_secs(3590));
        assert!(fresh.remaining_freshness() <= Duration::from_secs(3600));
        assert_eq!(stale.remaining_freshness(), Duration::ZERO);
    }

    #[test]
    fn test_list_prerender_ids() {
        let catalog = Arc::new(FakeCatalog::default());
        let pages = pages_with(&catalog, Duration::from_secs(3600));

        let paths = pages.list_prerender_ids();

        assert_eq!(paths.ids, vec![ProductId::new(LAUNCH_ID)]);
        assert!(paths.allow_on_demand);
    }
}
