//! # Customer Commands
//!
//! Loyalty lookup for the order builder and the rewards summary shown on
//! the "my orders" page, including the artwork saved from earlier orders.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::state::{DbState, LookupOutcome, LoyaltyState};
use hatshop_core::loyalty::{TierBenefits, TierProgress};
use hatshop_core::validation::validate_email;
use hatshop_core::{Logo, Money, OrderStatus, PersistedOrder, PricingEngine, RewardTier};

/// Default number of recent orders in the rewards summary.
pub const RECENT_ORDERS_LIMIT: i64 = 10;

/// Looks up the shopper's loyalty record as they type their email.
///
/// The email is validated before a lookup is started; a malformed one is
/// a validation error rather than a "new customer".
pub async fn lookup_customer(loyalty: &LoyaltyState, email: &str) -> Result<LookupOutcome, ApiError> {
    let email = validate_email(email).map_err(|e| ApiError::validation(e.to_string()))?;
    debug!(email = %email, "lookup_customer command");
    Ok(loyalty.lookup(&email).await)
}

/// One row of the order history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_number: String,
    pub status: OrderStatus,
    pub total_hats: i64,
    pub order_total: Money,
    pub created_at: DateTime<Utc>,
}

impl From<&PersistedOrder> for OrderSummary {
    fn from(order: &PersistedOrder) -> Self {
        OrderSummary {
            order_number: order.order_number.clone(),
            status: order.status,
            total_hats: order.total_hats,
            order_total: order.order_total(),
            created_at: order.created_at,
        }
    }
}

/// Tier, progress bar and order history for one email.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardsSummary {
    pub email: String,
    /// No completed orders yet.
    pub is_new_customer: bool,
    pub tier: RewardTier,
    pub total_lifetime_spend: Money,
    pub total_hats_ordered: i64,
    pub has_setup_fee_paid: bool,
    pub benefits: TierBenefits,
    pub progress: TierProgress,
    pub recent_orders: Vec<OrderSummary>,
    /// Artwork on file, newest first.
    pub saved_logos: Vec<Logo>,
}

/// Builds the rewards summary for `email`.
///
/// Unknown emails get a Bronze summary with an empty history.
pub async fn rewards_summary(
    db: &DbState,
    engine: &PricingEngine,
    email: &str,
    recent_limit: i64,
) -> Result<RewardsSummary, ApiError> {
    let email = validate_email(email).map_err(|e| ApiError::validation(e.to_string()))?;
    debug!(email = %email, "rewards_summary command");

    let customer = db.inner().customers().find_by_email(&email).await?;
    let orders = db.inner().orders().list_for_email(&email, recent_limit).await?;
    let saved_logos = db.inner().logos().list_for_email(&email).await?;
    let program = engine.loyalty();

    let (tier, spend, hats, fee_paid) = match &customer {
        Some(c) => (
            c.reward_tier,
            c.total_lifetime_spend(),
            c.total_hats_ordered,
            c.has_setup_fee_paid,
        ),
        None => (RewardTier::Bronze, Money::zero(), 0, false),
    };

    Ok(RewardsSummary {
        email,
        is_new_customer: customer.is_none(),
        tier,
        total_lifetime_spend: spend,
        total_hats_ordered: hats,
        has_setup_fee_paid: fee_paid,
        benefits: program.benefits(tier),
        progress: program.progress(tier, spend),
        recent_orders: orders.iter().map(OrderSummary::from).collect(),
        saved_logos,
    })
}
