//! # Domain Types
//!
//! Core domain types used throughout the Hat Shop storefront.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────┐     │
//! │  │  CartLineItem   │   │ EmbroideryOptions│   │ CustomerLoyalty  │     │
//! │  │  ─────────────  │   │  ──────────────  │   │     Record       │     │
//! │  │  id (SKU key)   │   │  embroidery_type │   │  ──────────────  │     │
//! │  │  name           │   │  front_location  │   │  email           │     │
//! │  │  unit_price     │   │  extra_locations │   │  reward_tier     │     │
//! │  │  quantity ≥ 1   │   │  rights_confirmed│   │  lifetime_spend  │     │
//! │  └─────────────────┘   └──────────────────┘   │  setup_fee_paid  │     │
//! │                                               └──────────────────┘     │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────┐     │
//! │  │    Customer     │   │  PersistedOrder  │   │   OrderStatus    │     │
//! │  │  ─────────────  │   │  ──────────────  │   │  ──────────────  │     │
//! │  │  id (UUID)      │   │  id (UUID)       │   │  Pending         │     │
//! │  │  email (unique) │   │  order_number    │   │  Paid            │     │
//! │  │  loyalty fields │   │  session id (UQ) │   │  Processing      │     │
//! │  │  hats ordered   │   │  totals snapshot │   │  Shipped ...     │     │
//! │  └─────────────────┘   └──────────────────┘   └──────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Logo`, `HatSale`, `Revenue` and `SiteStats` are written or computed by
//! the db crate after a payment clears; the engine never reads them.
//!
//! ## Dual-Key Identity Pattern
//! Persisted entities have:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (email, order_number, payment_session_id) - human-readable

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Cart Line Item
// =============================================================================

/// One hat variant in the shopper's cart.
///
/// `quantity` is always ≥ 1. Setting it to zero removes the line through the
/// cart store instead of storing a zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLineItem {
    /// Opaque SKU/variant key from the product catalog.
    pub id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    /// Catalog style, e.g. "Richardson 112".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CartLineItem {
    /// Returns unit_price × quantity (undiscounted).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Embroidery Options
// =============================================================================

/// Embroidery technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EmbroideryType {
    /// Flat embroidery, included in the hat price.
    #[default]
    Standard,
    /// 3D puff embroidery, surcharged per hat.
    Puff,
}

/// Where the main design goes. Always priced as part of the hat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "kebab-case"))]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum FrontLocation {
    #[default]
    FrontCenter,
    FrontLeft,
    FrontRight,
}

/// Additional embroidery placement, surcharged per hat.
///
/// Front placements are deliberately not representable here; the front slot
/// lives in [`FrontLocation`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum ExtraLocation {
    LeftSide,
    RightSide,
    Back,
}

impl ExtraLocation {
    /// All extra placements, in display order.
    pub const ALL: [ExtraLocation; 3] = [
        ExtraLocation::LeftSide,
        ExtraLocation::RightSide,
        ExtraLocation::Back,
    ];

    /// Human-readable label used on checkout lines.
    pub fn label(&self) -> &'static str {
        match self {
            ExtraLocation::LeftSide => "Left Side",
            ExtraLocation::RightSide => "Right Side",
            ExtraLocation::Back => "Back",
        }
    }
}

/// The shopper's embroidery configuration for the whole order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EmbroideryOptions {
    pub embroidery_type: EmbroideryType,
    pub front_location: FrontLocation,
    /// Set semantics: a placement can be chosen at most once.
    pub extra_locations: BTreeSet<ExtraLocation>,
    pub artwork_rights_confirmed: bool,
}

impl EmbroideryOptions {
    /// Number of extra placements (drives the extra-location surcharge).
    #[inline]
    pub fn extra_location_count(&self) -> i64 {
        self.extra_locations.len() as i64
    }
}

// =============================================================================
// Reward Tier
// =============================================================================

/// Loyalty tier, ordered from lowest to highest.
///
/// ## Ordering
/// ```text
/// Bronze < Silver < Gold < VIP < Elite < Diamond < Platinum
/// ```
/// Stored and serialized with the names customers see ("VIP", not "Vip").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum RewardTier {
    #[default]
    Bronze,
    Silver,
    Gold,
    #[serde(rename = "VIP")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "VIP"))]
    Vip,
    Elite,
    Diamond,
    Platinum,
}

impl RewardTier {
    /// All tiers, lowest first.
    pub const ALL: [RewardTier; 7] = [
        RewardTier::Bronze,
        RewardTier::Silver,
        RewardTier::Gold,
        RewardTier::Vip,
        RewardTier::Elite,
        RewardTier::Diamond,
        RewardTier::Platinum,
    ];

    /// Customer-facing name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardTier::Bronze => "Bronze",
            RewardTier::Silver => "Silver",
            RewardTier::Gold => "Gold",
            RewardTier::Vip => "VIP",
            RewardTier::Elite => "Elite",
            RewardTier::Diamond => "Diamond",
            RewardTier::Platinum => "Platinum",
        }
    }
}

impl fmt::Display for RewardTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Customer Loyalty Record
// =============================================================================

/// What the pricing engine needs to know about a customer.
///
/// ## Default Rule
/// When no record exists (first order, lookup failed or timed out) the engine
/// is called with `None`, which behaves exactly like
/// [`CustomerLoyaltyRecord::new_customer`]: Bronze, zero spend, no setup fee
/// paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerLoyaltyRecord {
    pub email: String,
    pub reward_tier: RewardTier,
    pub total_lifetime_spend: Money,
    pub has_setup_fee_paid: bool,
}

impl CustomerLoyaltyRecord {
    /// A first-time customer.
    pub fn new_customer(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            reward_tier: RewardTier::Bronze,
            total_lifetime_spend: Money::zero(),
            has_setup_fee_paid: false,
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A persisted customer. Created on the first completed order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    /// Unique, stored lowercase.
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub reward_tier: RewardTier,
    pub total_lifetime_spend_cents: i64,
    pub total_hats_ordered: i64,
    pub has_setup_fee_paid: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Returns the lifetime spend as Money.
    #[inline]
    pub fn total_lifetime_spend(&self) -> Money {
        Money::from_cents(self.total_lifetime_spend_cents)
    }

    /// Projects the persisted customer onto the engine's input record.
    pub fn loyalty_record(&self) -> CustomerLoyaltyRecord {
        CustomerLoyaltyRecord {
            email: self.email.clone(),
            reward_tier: self.reward_tier,
            total_lifetime_spend: self.total_lifetime_spend(),
            has_setup_fee_paid: self.has_setup_fee_paid,
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Fulfilment status of a persisted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Recorded but payment not yet settled.
    #[default]
    Pending,
    /// Payment confirmed by the gateway.
    Paid,
    /// In production (digitizing / embroidering).
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether an order may move from `self` to `next`.
    ///
    /// ```text
    /// Pending ──► Paid ──► Processing ──► Shipped ──► Delivered
    ///    │          │           │
    ///    └──────────┴───────────┴──► Cancelled
    /// ```
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Paid, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Paid, Cancelled)
                | (Processing, Cancelled)
        )
    }
}

// =============================================================================
// Order Snapshot Types
// =============================================================================

/// Why the artwork setup fee was not charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum WaiverReason {
    /// Order has enough hats to waive digitizing.
    Volume,
    /// Returning customer re-using artwork already on file.
    ExistingLogo,
}

/// A line item frozen at time of order.
/// Uses snapshot pattern so later catalog changes never alter history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl From<&CartLineItem> for OrderItem {
    fn from(item: &CartLineItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            unit_price_cents: item.unit_price.cents(),
            quantity: item.quantity,
            model: item.model.clone(),
            color: item.color.clone(),
        }
    }
}

impl From<&OrderItem> for CartLineItem {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            unit_price: Money::from_cents(item.unit_price_cents),
            quantity: item.quantity,
            model: item.model.clone(),
            color: item.color.clone(),
        }
    }
}

/// Shipping address as collected by the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingAddress {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

// =============================================================================
// Persisted Order
// =============================================================================

/// A completed order. Created only after the payment gateway confirms the
/// session; the totals are the engine's numbers at checkout time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PersistedOrder {
    pub id: String,
    /// Human-facing number, e.g. `CBH-4F2A91C0`.
    pub order_number: String,
    pub customer_id: Option<String>,
    pub email: String,
    /// Idempotency key for confirmation deliveries.
    pub payment_session_id: String,
    pub payment_intent_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub embroidery_type: EmbroideryType,
    pub front_location: FrontLocation,
    pub extra_locations: Vec<ExtraLocation>,
    pub artwork_file_name: Option<String>,
    pub special_instructions: Option<String>,
    pub hat_subtotal_cents: i64,
    pub volume_discount_cents: i64,
    pub discount_per_hat_cents: i64,
    pub extra_embroidery_total_cents: i64,
    pub puff_embroidery_total_cents: i64,
    pub artwork_setup_fee_cents: i64,
    pub rewards_discount_cents: i64,
    pub rewards_discount_percent: u32,
    pub order_total_cents: i64,
    pub total_hats: i64,
    /// What the gateway actually charged.
    pub amount_paid_cents: i64,
    pub shipping_name: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub status: OrderStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl PersistedOrder {
    /// Returns the order total as Money.
    #[inline]
    pub fn order_total(&self) -> Money {
        Money::from_cents(self.order_total_cents)
    }

    /// Returns the paid amount as Money.
    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }
}

// =============================================================================
// Saved Artwork
// =============================================================================

/// Artwork a customer uploaded with a confirmed order. Listed on the
/// customer's order history so the file can be reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Logo {
    pub id: String,
    pub customer_id: Option<String>,
    pub email: String,
    pub file_name: String,
    /// Order the file first arrived with.
    pub order_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sales Analytics
// =============================================================================

/// Storefront counters for the landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SiteStats {
    /// Hats on orders that were not cancelled.
    pub total_hats_produced: i64,
    pub total_orders: i64,
    pub total_customers: i64,
}

/// Whether a revenue row adds or removes money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RevenueType {
    Sale,
    Refund,
}

/// One hat line of a confirmed order, kept for per-style sales reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct HatSale {
    pub id: String,
    pub order_id: Option<String>,
    /// Catalog style, or the line name when the style was not given.
    pub hat_model: String,
    pub hat_color: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
}

/// A sale or refund against an order. Refund amounts are stored positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Revenue {
    pub id: String,
    pub order_id: Option<String>,
    pub amount_cents: i64,
    pub revenue_type: RevenueType,
    #[ts(as = "String")]
    pub revenue_date: DateTime<Utc>,
}

/// Hats sold per style, best sellers first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ModelSales {
    pub hat_model: String,
    pub hats_sold: i64,
    pub revenue_cents: i64,
}

/// Sales less refunds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RevenueSummary {
    pub sales_cents: i64,
    pub refunds_cents: i64,
}

impl RevenueSummary {
    #[inline]
    pub fn net(&self) -> Money {
        Money::from_cents(self.sales_cents - self.refunds_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embroidery_defaults() {
        let options = EmbroideryOptions::default();
        assert_eq!(options.embroidery_type, EmbroideryType::Standard);
        assert_eq!(options.front_location, FrontLocation::FrontCenter);
        assert!(options.extra_locations.is_empty());
        assert!(!options.artwork_rights_confirmed);
    }

    #[test]
    fn test_extra_locations_are_a_set() {
        let mut options = EmbroideryOptions::default();
        options.extra_locations.insert(ExtraLocation::Back);
        options.extra_locations.insert(ExtraLocation::Back);
        assert_eq!(options.extra_location_count(), 1);
    }

    #[test]
    fn test_location_serde_names() {
        assert_eq!(
            serde_json::to_string(&FrontLocation::FrontCenter).unwrap(),
            "\"front-center\""
        );
        assert_eq!(
            serde_json::to_string(&ExtraLocation::LeftSide).unwrap(),
            "\"left-side\""
        );
        assert_eq!(
            serde_json::to_string(&EmbroideryType::Puff).unwrap(),
            "\"puff\""
        );
    }

    #[test]
    fn test_reward_tier_order() {
        assert!(RewardTier::Bronze < RewardTier::Silver);
        assert!(RewardTier::Gold < RewardTier::Vip);
        assert!(RewardTier::Vip < RewardTier::Elite);
        assert!(RewardTier::Diamond < RewardTier::Platinum);
        assert_eq!(RewardTier::default(), RewardTier::Bronze);

        let mut sorted = RewardTier::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, RewardTier::ALL.to_vec());
    }

    #[test]
    fn test_reward_tier_serializes_vip_uppercase() {
        assert_eq!(serde_json::to_string(&RewardTier::Vip).unwrap(), "\"VIP\"");
        assert_eq!(
            serde_json::from_str::<RewardTier>("\"Gold\"").unwrap(),
            RewardTier::Gold
        );
        assert_eq!(RewardTier::Vip.to_string(), "VIP");
    }

    #[test]
    fn test_waiver_reason_names() {
        assert_eq!(
            serde_json::to_string(&WaiverReason::ExistingLogo).unwrap(),
            "\"existing_logo\""
        );
        assert_eq!(
            serde_json::to_string(&WaiverReason::Volume).unwrap(),
            "\"volume\""
        );
    }

    #[test]
    fn test_new_customer_record() {
        let record = CustomerLoyaltyRecord::new_customer("a@b.co");
        assert_eq!(record.reward_tier, RewardTier::Bronze);
        assert!(record.total_lifetime_spend.is_zero());
        assert!(!record.has_setup_fee_paid);
    }

    #[test]
    fn test_order_status_transitions() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_revenue_summary_net() {
        let summary = RevenueSummary {
            sales_cents: 36_000,
            refunds_cents: 6_000,
        };
        assert_eq!(summary.net(), Money::from_major(300));
        assert_eq!(
            serde_json::to_string(&RevenueType::Refund).unwrap(),
            "\"refund\""
        );
    }

    #[test]
    fn test_order_item_snapshot_round_trip() {
        let line = CartLineItem {
            id: "RICH-112".to_string(),
            name: "Richardson 112".to_string(),
            unit_price: Money::from_cents(1599),
            quantity: 3,
            model: Some("112".to_string()),
            color: Some("Black/White".to_string()),
        };
        let snapshot = OrderItem::from(&line);
        assert_eq!(snapshot.unit_price_cents, 1599);
        assert_eq!(snapshot.color.as_deref(), Some("Black/White"));
        assert_eq!(CartLineItem::from(&snapshot), line);
        assert_eq!(line.line_total().cents(), 4797);
    }
}
