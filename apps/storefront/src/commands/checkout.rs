//! # Checkout Commands
//!
//! Turns the session cart into a payment-gateway checkout session.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    submit_checkout                                      │
//! │                                                                         │
//! │  1. Snapshot cart (CartState)                                          │
//! │  2. Reprice with the loyalty record for THIS email (else new customer) │
//! │  3. build_checkout_session ─► line items + rewards discount + metadata │
//! │       └── empty cart / rights unconfirmed / bad email / total mismatch │
//! │  4. PaymentGateway::create_session ─► { session_id, url }              │
//! │       └── gateway failure ─► retryable PAYMENT_ERROR                    │
//! │                                                                         │
//! │  Nothing is persisted here. The order is created by the confirmation   │
//! │  webhook, so an abandoned checkout leaves nothing to clean up.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{CartState, LoyaltyState};
use hatshop_core::checkout::{build_checkout_session, CheckoutSessionRequest};
use hatshop_core::validation::validate_email;
use hatshop_core::{Money, OrderTotals, PricingEngine};

// =============================================================================
// Payment Gateway Seam
// =============================================================================

/// A session the gateway opened for the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub session_id: String,
    /// Hosted payment page.
    pub url: String,
}

/// Gateway call failures.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),

    #[error("Payment gateway rejected the session: {0}")]
    Rejected(String),
}

/// Opens checkout sessions on the payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError>;
}

// =============================================================================
// Commands
// =============================================================================

/// What the shopper is about to pay, as sent to the gateway.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPreview {
    pub request: CheckoutSessionRequest,
    pub totals: OrderTotals,
    pub amount_total: Money,
}

/// Builds the gateway request for the current cart without calling the
/// gateway.
pub fn preview_checkout(
    cart: &CartState,
    loyalty: &LoyaltyState,
    engine: &PricingEngine,
    customer_email: &str,
) -> Result<CheckoutPreview, ApiError> {
    let email = validate_email(customer_email).map_err(|e| ApiError::validation(e.to_string()))?;
    let cart = cart.snapshot();
    let record = loyalty.current_for(&email);
    let totals = engine.price_cart(&cart, record.as_ref());

    let request = build_checkout_session(&cart, &totals, &email)?;
    let amount_total = request.amount_total();

    debug!(
        email = %email,
        lines = request.line_items.len(),
        amount_total_cents = amount_total.cents(),
        "Checkout session request built"
    );

    Ok(CheckoutPreview {
        request,
        totals,
        amount_total,
    })
}

/// Response of a successful submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session: CheckoutSession,
    pub totals: OrderTotals,
    pub amount_total: Money,
}

/// Submits the cart to the payment gateway.
///
/// ## Errors
/// - `CART_ERROR`: empty cart
/// - `BUSINESS_LOGIC`: artwork rights not confirmed
/// - `VALIDATION_ERROR`: malformed email
/// - `PAYMENT_ERROR` (retryable): the gateway call failed
pub async fn submit_checkout(
    cart: &CartState,
    loyalty: &LoyaltyState,
    engine: &PricingEngine,
    gateway: &dyn PaymentGateway,
    customer_email: &str,
) -> Result<CheckoutResponse, ApiError> {
    let preview = preview_checkout(cart, loyalty, engine, customer_email)?;

    let session = gateway.create_session(&preview.request).await?;

    info!(
        session_id = %session.session_id,
        amount_total_cents = preview.amount_total.cents(),
        "Checkout session created"
    );

    Ok(CheckoutResponse {
        session,
        totals: preview.totals,
        amount_total: preview.amount_total,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::state::loyalty::tests::FakeDirectory;
    use hatshop_core::cart::CartAction;
    use hatshop_core::checkout::ORDER_PARTS_KEY;
    use hatshop_core::{ExtraLocation, RewardTier};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Records requests; fails every call when `down` is set.
    #[derive(Default)]
    pub(crate) struct MockGateway {
        pub down: bool,
        pub calls: AtomicUsize,
        pub last_request: Mutex<Option<CheckoutSessionRequest>>,
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_session(
            &self,
            request: &CheckoutSessionRequest,
        ) -> Result<CheckoutSession, GatewayError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.down {
                return Err(GatewayError::Unavailable("503 Service Unavailable".to_string()));
            }
            *self.last_request.lock().unwrap() = Some(request.clone());
            Ok(CheckoutSession {
                session_id: format!("cs_test_{n}"),
                url: format!("https://pay.example.com/cs_test_{n}"),
            })
        }
    }

    fn ready_cart(hats: i64) -> CartState {
        let cart = CartState::new();
        cart.dispatch(CartAction::AddItem {
            id: "trucker-01".to_string(),
            name: "Trucker Cap".to_string(),
            unit_price: Money::from_major(25),
            quantity: hats,
            model: None,
            color: None,
        })
        .unwrap();
        cart.dispatch(CartAction::ToggleExtraLocation(ExtraLocation::Back))
            .unwrap();
        cart.dispatch(CartAction::ConfirmArtworkRights(true)).unwrap();
        cart
    }

    fn loyalty(directory: FakeDirectory) -> LoyaltyState {
        LoyaltyState::new(Arc::new(directory), Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_submit_matches_order_total() {
        let cart = ready_cart(48);
        let loyalty = loyalty(FakeDirectory::default().with("gold@example.com", RewardTier::Gold, 60_000));
        let engine = PricingEngine::standard();
        let gateway = MockGateway::default();
        loyalty.lookup("gold@example.com").await;

        let response = submit_checkout(&cart, &loyalty, &engine, &gateway, "gold@example.com")
            .await
            .unwrap();

        assert_eq!(response.session.session_id, "cs_test_1");
        assert_eq!(response.totals.rewards_discount_percent, 10);
        let diff = (response.amount_total - response.totals.order_total).abs();
        assert!(diff.cents() <= 1);

        let sent = gateway.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(sent.customer_email, "gold@example.com");
        assert!(sent.metadata.contains_key(ORDER_PARTS_KEY));
    }

    #[tokio::test]
    async fn test_other_email_priced_as_new_customer() {
        let cart = ready_cart(12);
        let loyalty = loyalty(FakeDirectory::default().with("gold@example.com", RewardTier::Gold, 60_000));
        let engine = PricingEngine::standard();
        loyalty.lookup("gold@example.com").await;

        let preview = preview_checkout(&cart, &loyalty, &engine, "someone@example.com").unwrap();
        assert_eq!(preview.totals.rewards_discount_percent, 0);
        // 12 × $25 + 12 × $5 back
        assert_eq!(preview.amount_total, Money::from_major(360));
    }

    #[tokio::test]
    async fn test_gateway_failure_is_retryable() {
        let cart = ready_cart(12);
        let loyalty = loyalty(FakeDirectory::default());
        let engine = PricingEngine::standard();
        let gateway = MockGateway {
            down: true,
            ..Default::default()
        };

        let err = submit_checkout(&cart, &loyalty, &engine, &gateway, "jo@example.com")
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::PaymentError);
        assert!(err.retryable);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
        // cart survives for the retry
        assert_eq!(cart.snapshot().total_hats(), 12);
    }

    #[tokio::test]
    async fn test_rights_must_be_confirmed() {
        let cart = ready_cart(12);
        cart.dispatch(CartAction::ConfirmArtworkRights(false)).unwrap();
        let loyalty = loyalty(FakeDirectory::default());
        let gateway = MockGateway::default();

        let err = submit_checkout(&cart, &loyalty, &PricingEngine::standard(), &gateway, "jo@example.com")
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::BusinessLogic);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let cart = CartState::new();
        let loyalty = loyalty(FakeDirectory::default());
        let gateway = MockGateway::default();

        let err = submit_checkout(&cart, &loyalty, &PricingEngine::standard(), &gateway, "jo@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
    }
}
