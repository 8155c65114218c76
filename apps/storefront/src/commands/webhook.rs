//! # Payment Confirmation Webhook
//!
//! Persists the order once the gateway reports the session as paid.
//!
//! ## Delivery Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    handle_payment_confirmed                             │
//! │                                                                         │
//! │  PaymentConfirmedEvent                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  OrderMetadata::from_metadata ── missing/corrupt ─► VALIDATION_ERROR    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  amount_total vs order_total ── off by > 1 cent ─► warn!, continue      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  reprice snapshot items ─────── differs from totals ─► warn!, continue  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  record_confirmed_order (one transaction)                              │
//! │       ├── Created          ─► ack { duplicate: false, order_number }    │
//! │       └── AlreadyProcessed ─► ack { duplicate: true }                   │
//! │                                                                         │
//! │  Gateways redeliver until they get a 2xx, so a duplicate is a success. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::{DbState, StoreConfig};
use hatshop_core::checkout::{CheckoutLineItem, OrderMetadata, TOTAL_TOLERANCE_CENTS};
use hatshop_core::validation::{validate_email, validate_session_id};
use hatshop_core::{Money, OrderTotals, PricingEngine, ShippingAddress};
use hatshop_db::{generate_order_number, ConfirmedOrder, PersistOutcome};

/// The gateway's "checkout session completed" event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmedEvent {
    pub session_id: String,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
    pub customer_email: Option<String>,
    /// Lines as the gateway echoes them. Informational only.
    #[serde(default)]
    pub line_items: Vec<CheckoutLineItem>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// What the gateway charged, in minor units.
    pub amount_total: Money,
    #[serde(default)]
    pub shipping_name: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
}

/// Webhook acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    /// The session had already been recorded; nothing changed.
    pub duplicate: bool,
    pub order_number: Option<String>,
}

/// Records a confirmed payment. Safe to call any number of times for the
/// same session.
pub async fn handle_payment_confirmed(
    db: &DbState,
    config: &StoreConfig,
    engine: &PricingEngine,
    event: PaymentConfirmedEvent,
) -> Result<WebhookAck, ApiError> {
    validate_session_id(&event.session_id).map_err(|e| ApiError::validation(e.to_string()))?;
    let session_id = event.session_id;
    let email = event
        .customer_email
        .as_deref()
        .ok_or_else(|| ApiError::validation("customer email is required"))
        .and_then(|raw| validate_email(raw).map_err(|e| ApiError::validation(e.to_string())))?;

    debug!(
        session_id = %session_id,
        line_items = event.line_items.len(),
        "Payment confirmation received"
    );

    let metadata = OrderMetadata::from_metadata(&event.metadata)?;

    let drift = (event.amount_total - metadata.totals.order_total).abs();
    if drift.cents() > TOTAL_TOLERANCE_CENTS {
        warn!(
            session_id = %session_id,
            amount_total_cents = event.amount_total.cents(),
            order_total_cents = metadata.totals.order_total.cents(),
            "Charged amount differs from order total"
        );
    }

    if let Some(repriced) = repriced_mismatch(&metadata, engine) {
        warn!(
            session_id = %session_id,
            recorded_total_cents = metadata.totals.order_total.cents(),
            repriced_total_cents = repriced.order_total.cents(),
            recorded_hats = metadata.totals.total_hats,
            repriced_hats = repriced.total_hats,
            "Order snapshot does not reprice to its recorded totals"
        );
    }

    let confirmed = ConfirmedOrder {
        order_number: generate_order_number(&config.store.order_number_prefix),
        email,
        payment_session_id: session_id,
        payment_intent_id: event.payment_intent_id,
        metadata,
        amount_paid: event.amount_total,
        shipping_name: event.shipping_name,
        shipping_address: event.shipping_address,
    };

    let outcome = db
        .inner()
        .orders()
        .record_confirmed_order(confirmed, engine.loyalty())
        .await?;

    let ack = match outcome {
        PersistOutcome::Created { order, customer } => {
            info!(
                order_number = %order.order_number,
                tier = %customer.reward_tier,
                "Order created from payment confirmation"
            );
            WebhookAck {
                received: true,
                duplicate: false,
                order_number: Some(order.order_number),
            }
        }
        PersistOutcome::AlreadyProcessed { payment_session_id } => {
            info!(session_id = %payment_session_id, "Duplicate payment confirmation ignored");
            WebhookAck {
                received: true,
                duplicate: true,
                order_number: None,
            }
        }
    };

    Ok(ack)
}

/// The engine's totals for the snapshot items, when they differ from the
/// totals the snapshot carries.
fn repriced_mismatch(metadata: &OrderMetadata, engine: &PricingEngine) -> Option<OrderTotals> {
    let repriced = metadata.reprice(engine);
    (repriced != metadata.totals).then_some(repriced)
}
