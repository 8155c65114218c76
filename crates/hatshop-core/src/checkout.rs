//! # Checkout Module
//!
//! Turns a priced cart into the payload of a payment-gateway session, and
//! turns the session metadata back into an order snapshot when the gateway
//! confirms payment.
//!
//! ## Line-Item Decomposition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderTotals                         Gateway session                    │
//! │  ───────────                         ───────────────                    │
//! │  per SKU: unit − discount_per_hat ─► "Richardson 112"  $17 × 100        │
//! │  puff_embroidery_total ────────────► "3D Puff Embroidery" $3 × 100      │
//! │  extra_embroidery_total ───────────► "Extra Locations"  $5 × 100        │
//! │  artwork_setup_fee (if charged) ───► "Artwork Setup Fee" $40 × 1        │
//! │  rewards_discount ─────────────────► session discount  −$250            │
//! │                                                                         │
//! │  Σ lines − discount  must equal  order_total  (± 1 cent)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine caps the per-hat discount at each line's unit price, so a
//! line's unit amount bottoms out at $0 and the gateway never sees a
//! negative one. An order that prices to $0 or less has no session at all.
//!
//! ## Metadata Encoding
//! ```text
//! gateway metadata: ≤ 50 keys, each value ≤ 500 characters
//!
//!   order_parts = "3"
//!   order_0     = '{"items":[{"id":"RICH-112-BLK",...'     ≤ 500 chars
//!   order_1     = '...,"totals":{"totalHats":100,...'       ≤ 500 chars
//!   order_2     = '..."orderTotal":225000}}'
//!   total_hats, order_total_cents, artwork_file_name   (dashboard only)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{OrderTotals, PricingEngine};
use crate::types::{
    CartLineItem, CustomerLoyaltyRecord, EmbroideryOptions, EmbroideryType, ExtraLocation,
    FrontLocation, OrderItem, RewardTier, WaiverReason,
};
use crate::validation::validate_email;

/// Key prefix of the JSON order snapshot parts (`order_0`, `order_1`, ...).
pub const ORDER_METADATA_KEY: &str = "order";

/// Key holding the number of snapshot parts.
pub const ORDER_PARTS_KEY: &str = "order_parts";

/// Longest value the gateway accepts for one metadata key.
pub const METADATA_VALUE_MAX_CHARS: usize = 500;

/// Most keys the gateway accepts on one session.
pub const METADATA_MAX_KEYS: usize = 50;

/// Flat keys written alongside the snapshot parts.
const DASHBOARD_KEYS: usize = 3;

/// Allowed difference between the session amount and the order total.
pub const TOTAL_TOLERANCE_CENTS: i64 = 1;

// =============================================================================
// Session Types
// =============================================================================

/// One line on the gateway's checkout page. Amounts in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutLineItem {
    pub name: String,
    pub description: Option<String>,
    pub unit_amount: Money,
    pub quantity: i64,
}

impl CheckoutLineItem {
    #[inline]
    pub fn amount(&self) -> Money {
        self.unit_amount * self.quantity
    }
}

/// Session-level discount (rewards cash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionDiscount {
    pub label: String,
    pub amount: Money,
}

/// Everything the gateway needs to open a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutSessionRequest {
    pub customer_email: String,
    pub line_items: Vec<CheckoutLineItem>,
    pub discount: Option<SessionDiscount>,
    pub metadata: BTreeMap<String, String>,
}

impl CheckoutSessionRequest {
    /// Σ line amounts, before the session discount.
    pub fn line_items_total(&self) -> Money {
        self.line_items.iter().map(CheckoutLineItem::amount).sum()
    }

    /// What the gateway will charge.
    pub fn amount_total(&self) -> Money {
        let discount = self
            .discount
            .as_ref()
            .map(|d| d.amount)
            .unwrap_or_default();
        self.line_items_total() - discount
    }
}

// =============================================================================
// Order Metadata
// =============================================================================

/// The order snapshot carried through the gateway and back.
///
/// The confirmation webhook rebuilds the persisted order from this, so it
/// holds everything the order row needs that the gateway does not echo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderMetadata {
    pub items: Vec<OrderItem>,
    pub embroidery_type: EmbroideryType,
    pub front_location: FrontLocation,
    pub extra_locations: Vec<ExtraLocation>,
    pub artwork_file_name: Option<String>,
    pub special_instructions: Option<String>,
    pub totals: OrderTotals,
}

impl OrderMetadata {
    /// Snapshot of the cart and its totals.
    pub fn from_cart(cart: &Cart, totals: &OrderTotals) -> Self {
        let embroidery = cart.embroidery();
        let instructions = cart.special_instructions().trim();
        Self {
            items: cart.items().iter().map(OrderItem::from).collect(),
            embroidery_type: embroidery.embroidery_type,
            front_location: embroidery.front_location,
            extra_locations: embroidery.extra_locations.iter().copied().collect(),
            artwork_file_name: cart.artwork_file_name().map(str::to_string),
            special_instructions: (!instructions.is_empty()).then(|| instructions.to_string()),
            totals: totals.clone(),
        }
    }

    /// Encodes into gateway string metadata.
    ///
    /// The JSON snapshot is split into `order_N` parts that each fit the
    /// gateway's value limit. Besides the snapshot a few flat keys are
    /// written for people reading the session in the gateway dashboard.
    ///
    /// ## Errors
    /// [`CoreError::InvalidMetadata`] when the snapshot needs more parts than
    /// the gateway's key limit leaves room for.
    pub fn to_metadata(&self) -> CoreResult<BTreeMap<String, String>> {
        let json = serde_json::to_string(self).map_err(|e| CoreError::InvalidMetadata {
            reason: e.to_string(),
        })?;

        let chars: Vec<char> = json.chars().collect();
        let parts: Vec<String> = chars
            .chunks(METADATA_VALUE_MAX_CHARS)
            .map(|chunk| chunk.iter().collect())
            .collect();

        let max_parts = METADATA_MAX_KEYS - DASHBOARD_KEYS - 1;
        if parts.len() > max_parts {
            return Err(CoreError::InvalidMetadata {
                reason: format!(
                    "order snapshot needs {} parts, the gateway allows {}",
                    parts.len(),
                    max_parts
                ),
            });
        }

        let mut metadata = BTreeMap::new();
        metadata.insert(ORDER_PARTS_KEY.to_string(), parts.len().to_string());
        for (i, part) in parts.into_iter().enumerate() {
            metadata.insert(format!("{ORDER_METADATA_KEY}_{i}"), part);
        }
        metadata.insert(
            "total_hats".to_string(),
            self.totals.total_hats.to_string(),
        );
        metadata.insert(
            "order_total_cents".to_string(),
            self.totals.order_total.cents().to_string(),
        );
        metadata.insert(
            "artwork_file_name".to_string(),
            self.artwork_file_name
                .as_deref()
                .unwrap_or_default()
                .chars()
                .take(METADATA_VALUE_MAX_CHARS)
                .collect(),
        );
        Ok(metadata)
    }

    /// Decodes the snapshot written by [`OrderMetadata::to_metadata`].
    pub fn from_metadata(metadata: &BTreeMap<String, String>) -> CoreResult<Self> {
        let count: usize = metadata
            .get(ORDER_PARTS_KEY)
            .ok_or_else(|| CoreError::InvalidMetadata {
                reason: format!("missing '{ORDER_PARTS_KEY}' key"),
            })?
            .parse()
            .map_err(|_| CoreError::InvalidMetadata {
                reason: format!("'{ORDER_PARTS_KEY}' is not a count"),
            })?;

        let mut json = String::new();
        for i in 0..count {
            let key = format!("{ORDER_METADATA_KEY}_{i}");
            let part = metadata
                .get(&key)
                .ok_or_else(|| CoreError::InvalidMetadata {
                    reason: format!("missing '{key}' key"),
                })?;
            json.push_str(part);
        }

        serde_json::from_str(&json).map_err(|e| CoreError::InvalidMetadata {
            reason: e.to_string(),
        })
    }

    /// Prices the snapshot's items again with `engine`.
    ///
    /// The customer's tier is recovered from the rewards percent and the
    /// existing-logo waiver from the recorded waiver reason, so on unchanged
    /// tables the result equals `self.totals`.
    pub fn reprice(&self, engine: &PricingEngine) -> OrderTotals {
        let items: Vec<CartLineItem> = self.items.iter().map(CartLineItem::from).collect();
        let options = EmbroideryOptions {
            embroidery_type: self.embroidery_type,
            front_location: self.front_location,
            extra_locations: self.extra_locations.iter().copied().collect(),
            artwork_rights_confirmed: true,
        };
        let reward_tier = engine
            .loyalty()
            .tiers()
            .iter()
            .find(|t| t.rewards_percent == self.totals.rewards_discount_percent)
            .map(|t| t.tier)
            .unwrap_or(RewardTier::Bronze);
        let loyalty = CustomerLoyaltyRecord {
            has_setup_fee_paid: self.totals.artwork_setup_waived_reason
                == Some(WaiverReason::ExistingLogo),
            reward_tier,
            ..CustomerLoyaltyRecord::new_customer("")
        };

        engine.calculate(
            &items,
            &options,
            Some(&loyalty),
            self.artwork_file_name.is_some(),
        )
    }
}

// =============================================================================
// Session Builder
// =============================================================================

/// Builds the gateway session for a priced cart.
///
/// ## Errors
/// - [`CoreError::EmptyCart`]: nothing to buy
/// - [`CoreError::ArtworkRightsNotConfirmed`]: rights checkbox unticked
/// - [`CoreError::Validation`]: malformed email
/// - [`CoreError::TotalMismatch`]: `totals` were not computed from `cart`
/// - [`CoreError::NothingToCharge`]: the session would charge $0 or less
/// - [`CoreError::InvalidMetadata`]: the order snapshot is too large
pub fn build_checkout_session(
    cart: &Cart,
    totals: &OrderTotals,
    customer_email: &str,
) -> CoreResult<CheckoutSessionRequest> {
    if cart.is_empty() {
        return Err(CoreError::EmptyCart);
    }
    if !cart.embroidery().artwork_rights_confirmed {
        return Err(CoreError::ArtworkRightsNotConfirmed);
    }
    let customer_email = validate_email(customer_email)?;

    let mut line_items = Vec::with_capacity(cart.item_count() + 3);

    for item in cart.items() {
        let unit_amount = (item.unit_price - totals.discount_per_hat).non_negative();

        let description = totals
            .discount_per_hat
            .is_positive()
            .then(|| format!("Volume discount {} per hat applied", totals.discount_per_hat));

        line_items.push(CheckoutLineItem {
            name: item.name.clone(),
            description,
            unit_amount,
            quantity: item.quantity,
        });
    }

    if totals.puff_embroidery_total.is_positive() {
        line_items.push(CheckoutLineItem {
            name: "3D Puff Embroidery".to_string(),
            description: Some(format!("{} per hat", totals.puff_price_per_hat)),
            unit_amount: totals.puff_price_per_hat,
            quantity: totals.total_hats,
        });
    }

    let extras = &cart.embroidery().extra_locations;
    if totals.extra_embroidery_total.is_positive() && totals.total_hats > 0 {
        let labels: Vec<&str> = extras.iter().map(ExtraLocation::label).collect();
        line_items.push(CheckoutLineItem {
            name: "Extra Embroidery Locations".to_string(),
            description: Some(labels.join(", ")),
            unit_amount: Money::from_cents(
                totals.extra_embroidery_total.cents() / totals.total_hats,
            ),
            quantity: totals.total_hats,
        });
    }

    if totals.artwork_setup_fee.is_positive() {
        line_items.push(CheckoutLineItem {
            name: "Artwork Setup Fee".to_string(),
            description: Some("One-time digitizing of your logo".to_string()),
            unit_amount: totals.artwork_setup_fee,
            quantity: 1,
        });
    }

    let discount = totals.rewards_discount.is_positive().then(|| SessionDiscount {
        label: format!("Rewards Cash ({}%)", totals.rewards_discount_percent),
        amount: totals.rewards_discount,
    });

    let metadata = OrderMetadata::from_cart(cart, totals).to_metadata()?;

    let request = CheckoutSessionRequest {
        customer_email,
        line_items,
        discount,
        metadata,
    };

    if !request.amount_total().is_positive() {
        return Err(CoreError::NothingToCharge {
            amount_total: request.amount_total().cents(),
        });
    }

    let diff = (request.amount_total() - totals.order_total).abs();
    if diff.cents() > TOTAL_TOLERANCE_CENTS {
        return Err(CoreError::TotalMismatch {
            line_items_total: request.amount_total().cents(),
            order_total: totals.order_total.cents(),
        });
    }

    Ok(request)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartAction;
    use crate::pricing::PricingEngine;
    use crate::types::{CustomerLoyaltyRecord, RewardTier};

    fn cart_with(items: &[(&str, i64, i64)]) -> Cart {
        let mut cart = Cart::new()
            .apply(CartAction::ConfirmArtworkRights(true))
            .unwrap();
        for (id, cents, qty) in items {
            cart = cart
                .apply(CartAction::AddItem {
                    id: id.to_string(),
                    name: format!("Hat {id}"),
                    unit_price: Money::from_cents(*cents),
                    quantity: *qty,
                    model: None,
                    color: None,
                })
                .unwrap();
        }
        cart
    }

    fn gold() -> CustomerLoyaltyRecord {
        CustomerLoyaltyRecord {
            email: "gold@example.com".to_string(),
            reward_tier: RewardTier::Gold,
            total_lifetime_spend: Money::from_major(800),
            has_setup_fee_paid: true,
        }
    }

    #[test]
    fn test_session_reproduces_order_total() {
        let cart = cart_with(&[("A", 2000, 100)])
            .apply(CartAction::SetEmbroideryType(EmbroideryType::Puff))
            .unwrap()
            .apply(CartAction::ToggleExtraLocation(ExtraLocation::Back))
            .unwrap();
        let loyalty = gold();
        let totals = PricingEngine::standard().price_cart(&cart, Some(&loyalty));

        let session = build_checkout_session(&cart, &totals, "gold@example.com").unwrap();

        assert_eq!(session.line_items.len(), 3);
        assert_eq!(session.line_items[0].unit_amount, Money::from_major(17));
        assert_eq!(session.line_items[1].amount(), Money::from_major(300));
        assert_eq!(session.line_items[2].amount(), Money::from_major(500));
        assert_eq!(session.line_items_total(), Money::from_major(2500));

        let discount = session.discount.as_ref().unwrap();
        assert_eq!(discount.amount, Money::from_major(250));
        assert_eq!(discount.label, "Rewards Cash (10%)");
        assert_eq!(session.amount_total(), Money::from_major(2250));
    }

    #[test]
    fn test_setup_fee_line_when_charged() {
        let cart = cart_with(&[("A", 1500, 5)]);
        let totals = PricingEngine::standard().price_cart(&cart, None);
        let session = build_checkout_session(&cart, &totals, "new@example.com").unwrap();

        let fee = session.line_items.last().unwrap();
        assert_eq!(fee.name, "Artwork Setup Fee");
        assert_eq!(fee.amount(), Money::from_major(40));
        assert!(session.discount.is_none());
        assert_eq!(session.amount_total(), totals.order_total);
    }

    #[test]
    fn test_cheap_hat_line_bottoms_out_at_zero() {
        // $0.50 hat with a $1/hat volume discount at 24+
        let cart = cart_with(&[("CHEAP", 50, 10), ("A", 1500, 20)]);
        let totals = PricingEngine::standard().price_cart(&cart, None);
        assert_eq!(totals.discount_per_hat, Money::from_major(1));

        let session = build_checkout_session(&cart, &totals, "a@example.com").unwrap();
        assert!(session.line_items.iter().all(|l| !l.unit_amount.is_negative()));
        assert_eq!(session.line_items[0].unit_amount, Money::zero());
        assert_eq!(session.line_items[1].unit_amount, Money::from_major(14));
        assert!(session.discount.is_none());
        assert_eq!(session.amount_total(), Money::from_major(280));
        assert_eq!(session.amount_total(), totals.order_total);
    }

    #[test]
    fn test_rejects_free_order() {
        let cart = cart_with(&[("FREE", 0, 24)]);
        let totals = PricingEngine::standard().price_cart(&cart, None);
        assert_eq!(totals.order_total, Money::zero());

        let result = build_checkout_session(&cart, &totals, "a@example.com");
        assert!(matches!(
            result,
            Err(CoreError::NothingToCharge { amount_total: 0 })
        ));
    }

    #[test]
    fn test_rejects_empty_cart_and_unconfirmed_rights() {
        let empty = Cart::new();
        let totals = PricingEngine::standard().price_cart(&empty, None);
        assert!(matches!(
            build_checkout_session(&empty, &totals, "a@example.com"),
            Err(CoreError::EmptyCart)
        ));

        let unconfirmed = Cart::new()
            .apply(CartAction::AddItem {
                id: "A".to_string(),
                name: "Hat".to_string(),
                unit_price: Money::from_major(15),
                quantity: 12,
                model: None,
                color: None,
            })
            .unwrap();
        let totals = PricingEngine::standard().price_cart(&unconfirmed, None);
        assert!(matches!(
            build_checkout_session(&unconfirmed, &totals, "a@example.com"),
            Err(CoreError::ArtworkRightsNotConfirmed)
        ));
    }

    #[test]
    fn test_rejects_invalid_email() {
        let cart = cart_with(&[("A", 1500, 12)]);
        let totals = PricingEngine::standard().price_cart(&cart, None);
        assert!(matches!(
            build_checkout_session(&cart, &totals, "not-an-email"),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_stale_totals() {
        let cart = cart_with(&[("A", 1500, 12)]);
        let stale = PricingEngine::standard().price_cart(&cart_with(&[("A", 1500, 13)]), None);
        assert!(matches!(
            build_checkout_session(&cart, &stale, "a@example.com"),
            Err(CoreError::TotalMismatch { .. })
        ));
    }

    #[test]
    fn test_metadata_rebuilds_order() {
        let cart = cart_with(&[("A", 1500, 20)])
            .apply(CartAction::AttachArtwork(Some("logo.ai".to_string())))
            .unwrap()
            .apply(CartAction::SetSpecialInstructions("Navy thread".to_string()))
            .unwrap();
        let totals = PricingEngine::standard().price_cart(&cart, None);
        let session = build_checkout_session(&cart, &totals, "a@example.com").unwrap();

        let rebuilt = OrderMetadata::from_metadata(&session.metadata).unwrap();
        assert_eq!(rebuilt.totals, totals);
        assert_eq!(rebuilt.items.len(), 1);
        assert_eq!(rebuilt.artwork_file_name.as_deref(), Some("logo.ai"));
        assert_eq!(rebuilt.special_instructions.as_deref(), Some("Navy thread"));
        assert_eq!(session.metadata["order_total_cents"], "30000");
    }

    #[test]
    fn test_metadata_missing_or_garbled() {
        let mut metadata = BTreeMap::new();
        assert!(matches!(
            OrderMetadata::from_metadata(&metadata),
            Err(CoreError::InvalidMetadata { .. })
        ));

        metadata.insert(ORDER_PARTS_KEY.to_string(), "2".to_string());
        metadata.insert("order_0".to_string(), "{not json".to_string());
        assert!(matches!(
            OrderMetadata::from_metadata(&metadata),
            Err(CoreError::InvalidMetadata { reason }) if reason.contains("order_1")
        ));

        metadata.insert("order_1".to_string(), "}".to_string());
        assert!(OrderMetadata::from_metadata(&metadata).is_err());

        metadata.insert(ORDER_PARTS_KEY.to_string(), "many".to_string());
        assert!(OrderMetadata::from_metadata(&metadata).is_err());
    }

    #[test]
    fn test_metadata_fits_gateway_limits() {
        let mut cart = Cart::new()
            .apply(CartAction::ConfirmArtworkRights(true))
            .unwrap();
        for i in 0..40 {
            cart = cart
                .apply(CartAction::AddItem {
                    id: format!("RICH-112-{i:03}"),
                    name: format!("Richardson 112 Trucker Snapback, colorway {i}"),
                    unit_price: Money::from_cents(1599),
                    quantity: 3,
                    model: Some("Richardson 112".to_string()),
                    color: Some("Heather Grey/Black".to_string()),
                })
                .unwrap();
        }
        let totals = PricingEngine::standard().price_cart(&cart, Some(&gold()));
        let session = build_checkout_session(&cart, &totals, "gold@example.com").unwrap();

        let parts: usize = session.metadata[ORDER_PARTS_KEY].parse().unwrap();
        assert!(parts > 1);
        assert!(session.metadata.len() <= METADATA_MAX_KEYS);
        assert!(session
            .metadata
            .values()
            .all(|v| v.chars().count() <= METADATA_VALUE_MAX_CHARS));

        let rebuilt = OrderMetadata::from_metadata(&session.metadata).unwrap();
        assert_eq!(rebuilt.items.len(), 40);
        assert_eq!(rebuilt.totals, totals);
        assert_eq!(rebuilt.items[7].color.as_deref(), Some("Heather Grey/Black"));
    }

    #[test]
    fn test_oversized_snapshot_is_rejected() {
        let cart = cart_with(&[("A", 1500, 12)]);
        let totals = PricingEngine::standard().price_cart(&cart, None);
        let mut snapshot = OrderMetadata::from_cart(&cart, &totals);
        snapshot.special_instructions =
            Some("x".repeat(METADATA_VALUE_MAX_CHARS * METADATA_MAX_KEYS));
        assert!(matches!(
            snapshot.to_metadata(),
            Err(CoreError::InvalidMetadata { .. })
        ));
    }

    #[test]
    fn test_reprice_matches_recorded_totals() {
        let engine = PricingEngine::standard();
        let cart = cart_with(&[("A", 2000, 30), ("B", 1800, 20)])
            .apply(CartAction::SetEmbroideryType(EmbroideryType::Puff))
            .unwrap()
            .apply(CartAction::ToggleExtraLocation(ExtraLocation::LeftSide))
            .unwrap();
        let loyalty = gold();
        let totals = engine.price_cart(&cart, Some(&loyalty));
        let snapshot = OrderMetadata::from_cart(&cart, &totals);
        assert_eq!(snapshot.reprice(&engine), totals);

        // returning customer re-using artwork on file
        let small = cart_with(&[("A", 1500, 5)]);
        let small_totals = engine.price_cart(&small, Some(&loyalty));
        assert_eq!(
            small_totals.artwork_setup_waived_reason,
            Some(WaiverReason::ExistingLogo)
        );
        let small_snapshot = OrderMetadata::from_cart(&small, &small_totals);
        assert_eq!(small_snapshot.reprice(&engine), small_totals);
    }

    #[test]
    fn test_reprice_exposes_edited_price() {
        let engine = PricingEngine::standard();
        let cart = cart_with(&[("A", 2000, 30)]);
        let totals = engine.price_cart(&cart, None);
        let mut snapshot = OrderMetadata::from_cart(&cart, &totals);
        snapshot.items[0].unit_price_cents = 100;

        let repriced = snapshot.reprice(&engine);
        assert_ne!(repriced.order_total, snapshot.totals.order_total);
    }
}
