//! Integration tests for Ignite Shop.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ignite-shop-integration-tests
//! ```
//!
//! Every test boots a real storefront on an ephemeral port, wired to an
//! in-process fake of the Stripe endpoints it uses. No network access or
//! Stripe credentials are needed.
//!
//! # Test Categories
//!
//! - `storefront_pages` - Product page generation and serving
//! - `storefront_checkout` - Checkout API and the purchase control

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Form, Json, Router,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use ignite_shop_core::ProductId;
use ignite_shop_storefront::config::{
    CatalogConfig, CheckoutConfig, StorefrontConfig, StripeConfig,
};
use ignite_shop_storefront::middleware::{request_id_middleware, security_headers_middleware};
use ignite_shop_storefront::routes;
use ignite_shop_storefront::state::AppState;
use secrecy::SecretString;
use serde_json::{Value, json};

/// Launch product configured as the only pre-render id.
pub const LAUNCH_PRODUCT_ID: &str = "prod_NdSKKrvk4LDcXT";

/// Checkout URL every fake session points at.
pub const FAKE_CHECKOUT_URL: &str = "https://checkout.example/session123";

/// Test key; the fake only checks that one is sent.
const TEST_SECRET_KEY: &str = "sk_test_51NdSKrIntegrationTestKey";

/// A Stripe product record as the API returns it with `default_price` expanded.
#[must_use]
pub fn stripe_product(id: &str, name: &str, price_id: &str, unit_amount: i64) -> Value {
    json!({
        "id": id,
        "object": "product",
        "active": true,
        "name": name,
        "description": format!("{name} de algodão orgânico"),
        "images": [format!("https://files.stripe.com/links/{id}")],
        "default_price": {
            "id": price_id,
            "object": "price",
            "currency": "brl",
            "unit_amount": unit_amount,
        },
    })
}

/// The launch product: R$ 99,90 on `price_1`.
#[must_use]
pub fn launch_product() -> Value {
    stripe_product(LAUNCH_PRODUCT_ID, "Camiseta Beyond the Limits", "price_1", 9990)
}

/// One request the fake Stripe received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Path after the host, e.g. `/v1/products/prod_1`.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// Decoded form body (empty for GETs).
    pub form: HashMap<String, String>,
    /// Whether a bearer token was sent.
    pub authorized: bool,
}

#[derive(Default)]
struct FakeStripeInner {
    products: Mutex<HashMap<String, Value>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// In-process stand-in for the Stripe product and checkout endpoints.
#[derive(Clone, Default)]
pub struct FakeStripe {
    inner: Arc<FakeStripeInner>,
}

impl FakeStripe {
    /// Start a fake on an ephemeral port serving `products`.
    pub async fn start(products: impl IntoIterator<Item = Value>) -> (Self, String) {
        let fake = Self::default();
        for product in products {
            fake.put(product);
        }

        let app = Router::new()
            .route("/v1/products/{id}", get(retrieve_product))
            .route("/v1/checkout/sessions", post(create_session))
            .with_state(fake.clone());

        let addr = serve(app).await;
        (fake, format!("http://{addr}/v1"))
    }

    /// Add or replace a product.
    ///
    /// # Panics
    ///
    /// Panics if the record has no string `id`.
    pub fn put(&self, product: Value) {
        let id = product["id"]
            .as_str()
            .expect("product fixture must have an id")
            .to_string();
        lock(&self.inner.products).insert(id, product);
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.inner.requests).clone()
    }

    /// Requests received for one path.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    fn record(&self, request: RecordedRequest) {
        lock(&self.inner.requests).push(request);
    }

    fn known_prices(&self) -> HashSet<String> {
        lock(&self.inner.products)
            .values()
            .filter_map(|p| p["default_price"]["id"].as_str().map(String::from))
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer sk_"))
}

fn stripe_error(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(json!({
            "error": {
                "type": "invalid_request_error",
                "code": "resource_missing",
                "message": message,
            }
        })),
    )
        .into_response()
}

async fn retrieve_product(
    State(fake): State<FakeStripe>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    fake.record(RecordedRequest {
        path: format!("/v1/products/{id}"),
        query,
        form: HashMap::new(),
        authorized: is_authorized(&headers),
    });

    let product = lock(&fake.inner.products).get(&id).cloned();
    match product {
        Some(product) => Json(product).into_response(),
        None => stripe_error(StatusCode::NOT_FOUND, format!("No such product: '{id}'")),
    }
}

async fn create_session(
    State(fake): State<FakeStripe>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let price = form.get("line_items[0][price]").cloned().unwrap_or_default();
    fake.record(RecordedRequest {
        path: "/v1/checkout/sessions".to_string(),
        query: None,
        form,
        authorized: is_authorized(&headers),
    });

    if !fake.known_prices().contains(&price) {
        return stripe_error(StatusCode::BAD_REQUEST, format!("No such price: '{price}'"));
    }

    Json(json!({
        "id": "cs_test_a1b2c3",
        "object": "checkout.session",
        "mode": "payment",
        "url": FAKE_CHECKOUT_URL,
    }))
    .into_response()
}

/// Storefront state pointed at a fake Stripe, with only the launch product
/// pre-rendered.
///
/// # Panics
///
/// Panics if the Stripe client cannot be built.
#[must_use]
pub fn storefront_state(api_base: &str) -> AppState {
    let base_url = "http://127.0.0.1:3000".to_string();
    let config = StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        checkout: CheckoutConfig::for_base_url(&base_url),
        base_url,
        stripe: StripeConfig {
            secret_key: SecretString::from(TEST_SECRET_KEY),
            api_base: api_base.to_string(),
        },
        catalog: CatalogConfig {
            prerender_ids: vec![ProductId::new(LAUNCH_PRODUCT_ID)],
            ..CatalogConfig::default()
        },
        sentry_dsn: None,
        sentry_environment: None,
    };
    AppState::new(config).expect("Failed to build storefront state")
}

/// A running storefront and a client for it.
pub struct TestStorefront {
    /// Root URL, e.g. `http://127.0.0.1:41234`.
    pub base_url: String,
    /// Client that does not follow redirects and sends a client IP header.
    pub client: reqwest::Client,
}

impl TestStorefront {
    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET `path`, retrying while the loading placeholder is served.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or the page is still loading after
    /// a few seconds.
    pub async fn get_generated(&self, path: &str) -> reqwest::Response {
        for _ in 0..100 {
            let response = self
                .client
                .get(self.url(path))
                .send()
                .await
                .expect("Failed to request page");
            let loading = response.status() == StatusCode::OK
                && response
                    .headers()
                    .get("cache-control")
                    .is_some_and(|v| v == "no-store");
            if !loading {
                return response;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        panic!("{path} never finished generating");
    }
}

/// Pre-render the launch product and serve the storefront.
///
/// # Panics
///
/// Panics if pre-rendering fails, as the storefront binary would refuse
/// to start.
pub async fn start_storefront(api_base: &str) -> TestStorefront {
    let state = storefront_state(api_base);
    state
        .pages()
        .prerender()
        .await
        .expect("Failed to pre-render product pages");

    let app = routes::routes()
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .with_state(state);

    let addr = serve(app).await;

    let mut headers = HeaderMap::new();
    headers.insert("x-real-ip", "203.0.113.10".parse().expect("valid header"));
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client");

    TestStorefront {
        base_url: format!("http://{addr}"),
        client,
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server error");
    });

    addr
}
