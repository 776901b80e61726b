//! Checkout session bodies and the purchase initiator.
//!
//! The purchase flow has exactly two states. A [`PurchaseInitiator`] owns
//! that state for the single control it backs, so two buttons on two pages
//! never share a flag.
//!
//! ```text
//!   Idle ──initiate──▶ Pending ──ok──▶ (navigated away)
//!    ▲                   │
//!    └──────error────────┘
//! ```
//!
//! Network access and the browser are supplied through [`CheckoutApi`] and
//! [`Browser`], so the same state machine drives the storefront's CLI and
//! the tests.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PriceId;

/// The single message shown for any checkout failure.
pub const CHECKOUT_FAILED_MESSAGE: &str =
    "Ocorreu um erro ao realizar a compra, tente novamente mais tarde.";

/// Body sent to `POST /api/checkout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Price to purchase, one unit.
    pub price_id: PriceId,
}

/// Body returned by `POST /api/checkout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    /// Fully-qualified URL of the hosted checkout session.
    pub checkout_url: String,
}

/// Why a checkout session could not be created.
///
/// The user never sees these details; every variant collapses into
/// [`CHECKOUT_FAILED_MESSAGE`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutFailure {
    /// The request never produced a response (connection, DNS, timeout).
    #[error("checkout request failed: {0}")]
    Transport(String),

    /// The endpoint answered with a non-2xx status.
    #[error("checkout endpoint returned HTTP {0}")]
    Status(u16),

    /// The body could not be read as a [`CheckoutResponse`].
    #[error("malformed checkout response: {0}")]
    Malformed(String),
}

/// Creates hosted checkout sessions.
pub trait CheckoutApi {
    /// Create a session for one unit of `request.price_id`.
    fn create_session(
        &self,
        request: &CheckoutRequest,
    ) -> impl Future<Output = Result<CheckoutResponse, CheckoutFailure>> + Send;
}

/// The page hosting the buy control.
pub trait Browser {
    /// Full-page navigation to an external URL.
    fn navigate(&self, url: &str);

    /// Show a blocking, user-visible notification.
    fn notify(&self, message: &str);
}

impl<B: Browser + ?Sized> Browser for &B {
    fn navigate(&self, url: &str) {
        (**self).navigate(url);
    }

    fn notify(&self, message: &str) {
        (**self).notify(message);
    }
}

/// State of a buy control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PurchaseState {
    /// Control enabled, no request in flight.
    #[default]
    Idle,
    /// A checkout session is being created; control disabled.
    Pending,
}

/// Result of one call to [`PurchaseInitiator::initiate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// The browser was sent to this checkout URL.
    Redirected(String),
    /// Checkout failed; the user was notified and the control re-enabled.
    Failed(CheckoutFailure),
    /// A purchase was already pending; nothing was sent.
    Ignored,
}

/// Drives a buy control through `Idle` and `Pending`.
#[derive(Debug)]
pub struct PurchaseInitiator<A, B> {
    api: A,
    browser: B,
    pending: AtomicBool,
}

impl<A, B> PurchaseInitiator<A, B>
where
    A: CheckoutApi + Sync,
    B: Browser + Sync,
{
    /// Create an idle initiator.
    #[must_use]
    pub const fn new(api: A, browser: B) -> Self {
        Self {
            api,
            browser,
            pending: AtomicBool::new(false),
        }
    }

    /// Current state of the control.
    #[must_use]
    pub fn state(&self) -> PurchaseState {
        if self.pending.load(Ordering::Acquire) {
            PurchaseState::Pending
        } else {
            PurchaseState::Idle
        }
    }

    /// Whether the buy control should accept clicks.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state() == PurchaseState::Idle
    }

    /// Start a purchase of `price_id`.
    ///
    /// The state flips to `Pending` before the request is issued. On success
    /// it stays `Pending`, because the page is about to be replaced.
    pub async fn initiate(&self, price_id: &PriceId) -> PurchaseOutcome {
        if self
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return PurchaseOutcome::Ignored;
        }

        let request = CheckoutRequest {
            price_id: price_id.clone(),
        };

        let result = self.api.create_session(&request).await.and_then(|response| {
            if response.checkout_url.is_empty() {
                Err(CheckoutFailure::Malformed("empty checkoutUrl".to_string()))
            } else {
                Ok(response)
            }
        });

        match result {
            Ok(response) => {
                self.browser.navigate(&response.checkout_url);
                PurchaseOutcome::Redirected(response.checkout_url)
            }
            Err(failure) => {
                self.pending.store(false, Ordering::Release);
                self.browser.notify(CHECKOUT_FAILED_MESSAGE);
                PurchaseOutcome::Failed(failure)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use tokio::sync::Notify;

    use super::*;

    /// Checkout API that replays a fixed result and counts calls.
    struct FakeApi {
        result: Result<CheckoutResponse, CheckoutFailure>,
        calls: AtomicUsize,
        last_request: Mutex<Option<CheckoutRequest>>,
        gate: Option<Notify>,
    }

    impl FakeApi {
        fn ok(url: &str) -> Self {
            Self {
                result: Ok(CheckoutResponse {
                    checkout_url: url.to_string(),
                }),
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
                gate: None,
            }
        }

        fn failing(failure: CheckoutFailure) -> Self {
            Self {
                result: Err(failure),
                ..Self::ok("")
            }
        }

        fn gated(url: &str) -> Self {
            Self {
                gate: Some(Notify::new()),
                ..Self::ok(url)
            }
        }
    }

    impl CheckoutApi for FakeApi {
        async fn create_session(
            &self,
            request: &CheckoutRequest,
        ) -> Result<CheckoutResponse, CheckoutFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.result.clone()
        }
    }

    #[derive(Default)]
    struct FakeBrowser {
        navigations: Mutex<Vec<String>>,
        notifications: Mutex<Vec<String>>,
    }

    impl Browser for FakeBrowser {
        fn navigate(&self, url: &str) {
            self.navigations.lock().unwrap().push(url.to_string());
        }

        fn notify(&self, message: &str) {
            self.notifications.lock().unwrap().push(message.to_string());
        }
    }

    #[tokio::test]
    async fn test_success_navigates_once_to_verbatim_url() {
        let initiator = PurchaseInitiator::new(
            FakeApi::ok("https://checkout.example/session123"),
            FakeBrowser::default(),
        );

        let outcome = initiator.initiate(&PriceId::new("price_1")).await;

        assert_eq!(
            outcome,
            PurchaseOutcome::Redirected("https://checkout.example/session123".to_string())
        );
        assert_eq!(
            *initiator.browser.navigations.lock().unwrap(),
            vec!["https://checkout.example/session123".to_string()]
        );
        assert!(initiator.browser.notifications.lock().unwrap().is_empty());
        assert_eq!(
            initiator.api.last_request.lock().unwrap().clone(),
            Some(CheckoutRequest {
                price_id: PriceId::new("price_1"),
            })
        );
        // The page is being replaced; the control never comes back.
        assert_eq!(initiator.state(), PurchaseState::Pending);
    }

    #[tokio::test]
    async fn test_failure_notifies_once_and_returns_to_idle() {
        let initiator = PurchaseInitiator::new(
            FakeApi::failing(CheckoutFailure::Transport("connection refused".to_string())),
            FakeBrowser::default(),
        );

        let outcome = initiator.initiate(&PriceId::new("price_1")).await;

        assert!(matches!(outcome, PurchaseOutcome::Failed(_)));
        assert_eq!(initiator.state(), PurchaseState::Idle);
        assert!(initiator.is_enabled());
        assert!(initiator.browser.navigations.lock().unwrap().is_empty());
        assert_eq!(
            *initiator.browser.notifications.lock().unwrap(),
            vec![CHECKOUT_FAILED_MESSAGE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_every_failure_kind_shows_the_same_message() {
        for failure in [
            CheckoutFailure::Transport("dns".to_string()),
            CheckoutFailure::Status(500),
            CheckoutFailure::Malformed("missing field".to_string()),
        ] {
            let initiator = PurchaseInitiator::new(FakeApi::failing(failure), FakeBrowser::default());
            initiator.initiate(&PriceId::new("price_1")).await;
            assert_eq!(
                *initiator.browser.notifications.lock().unwrap(),
                vec![CHECKOUT_FAILED_MESSAGE.to_string()]
            );
        }
    }

    #[tokio::test]
    async fn test_empty_checkout_url_is_a_failure() {
        let initiator = PurchaseInitiator::new(FakeApi::ok(""), FakeBrowser::default());

        let outcome = initiator.initiate(&PriceId::new("price_1")).await;

        assert!(matches!(
            outcome,
            PurchaseOutcome::Failed(CheckoutFailure::Malformed(_))
        ));
        assert!(initiator.browser.navigations.lock().unwrap().is_empty());
        assert!(initiator.is_enabled());
    }

    #[tokio::test]
    async fn test_retry_after_failure_is_allowed() {
        let initiator = PurchaseInitiator::new(
            FakeApi::failing(CheckoutFailure::Status(502)),
            FakeBrowser::default(),
        );

        initiator.initiate(&PriceId::new("price_1")).await;
        initiator.initiate(&PriceId::new("price_1")).await;

        assert_eq!(initiator.api.calls.load(Ordering::SeqCst), 2);
        assert_eq!(initiator.browser.notifications.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_initiate_while_pending_is_a_no_op() {
        let initiator = PurchaseInitiator::new(
            FakeApi::gated("https://checkout.example/session123"),
            FakeBrowser::default(),
        );
        let price = PriceId::new("price_1");

        let (first, second) = tokio::join!(initiator.initiate(&price), async {
            // The first branch is polled first and is parked on the gate.
            assert_eq!(initiator.state(), PurchaseState::Pending);
            assert!(!initiator.is_enabled());
            let outcome = initiator.initiate(&price).await;
            if let Some(gate) = &initiator.api.gate {
                gate.notify_one();
            }
            outcome
        });

        assert!(matches!(first, PurchaseOutcome::Redirected(_)));
        assert_eq!(second, PurchaseOutcome::Ignored);
        assert_eq!(initiator.api.calls.load(Ordering::SeqCst), 1);
        assert_eq!(initiator.browser.navigations.lock().unwrap().len(), 1);
    }
}
