//! # Pricing Module
//!
//! The order pricing engine: cart + embroidery options + loyalty record in,
//! fully itemized [`OrderTotals`] out.
//!
//! ## Computation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cart items ──► total_hats, hat_subtotal                                │
//! │                     │                                                   │
//! │                     ├──► discount_per_hat (volume table)                │
//! │                     │        └──► volume_discount                       │
//! │                     │              └──► discounted_hat_subtotal         │
//! │                     ├──► extra_embroidery_total ($5 × hats × extras)    │
//! │                     ├──► puff_price_per_hat (puff table)                │
//! │                     │        └──► puff_embroidery_total (puff only)     │
//! │                     └──► artwork setup fee                              │
//! │                              volume (≥12) → existing logo → charged     │
//! │                                                                         │
//! │  Σ above ──► subtotal_before_rewards                                    │
//! │                 └──► rewards_discount (tier %, half-up to the cent)     │
//! │                          └──► order_total                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purity
//! [`PricingEngine::calculate`] has no I/O, no hidden state and cannot fail.
//! It is cheap enough to call on every quantity change. Configuration
//! problems are caught once, when the engine is built.
//!
//! ## Pricing Tables
//! ```text
//! Volume discount per hat          Puff surcharge per hat
//! ┌────────────┬──────────┐        ┌────────────┬──────────┐
//! │ 0 - 23     │ $0       │        │ 0 - 11     │ $7       │
//! │ 24 - 47    │ $1       │        │ 12 - 23    │ $6       │
//! │ 48 - 95    │ $2       │        │ 24 - 47    │ $5       │
//! │ 96 - 187   │ $3       │        │ 48 - 95    │ $4       │
//! │ 188+       │ $4       │        │ 96 - 187   │ $3       │
//! └────────────┴──────────┘        │ 188+       │ $2       │
//!                                  └────────────┴──────────┘
//! Extra location: $5 per hat per placement
//! Artwork setup:  $40, waived at 12+ hats
//! ```
//!
//! The per-hat discount is capped at each line's unit price, so a $0.50
//! promotional blank at 24+ hats gets $0.50 off, not $1, and
//! `discounted_hat_subtotal` never drops below zero.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::loyalty::LoyaltyProgram;
use crate::money::Money;
use crate::MAX_UNIT_PRICE_CENTS;
use crate::types::{
    CartLineItem, CustomerLoyaltyRecord, EmbroideryOptions, EmbroideryType, WaiverReason,
};

// =============================================================================
// Price Steps
// =============================================================================

/// One row of a quantity step table. Applies from `min_hats` (inclusive)
/// until the next row's `min_hats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceStep {
    pub min_hats: i64,
    pub amount: Money,
}

impl PriceStep {
    const fn new(min_hats: i64, major: i64) -> Self {
        Self {
            min_hats,
            amount: Money::from_major(major),
        }
    }
}

/// Looks up the step that applies to `total_hats`.
fn step_amount(steps: &[PriceStep], total_hats: i64) -> Money {
    steps
        .iter()
        .rev()
        .find(|s| s.min_hats <= total_hats)
        .map(|s| s.amount)
        .unwrap_or_default()
}

fn validate_steps(name: &str, steps: &[PriceStep]) -> CoreResult<()> {
    let invalid = |reason: String| Err(CoreError::InvalidConfig { reason });

    let Some(first) = steps.first() else {
        return invalid(format!("{name} table is empty"));
    };
    if first.min_hats != 0 {
        return invalid(format!("{name} table must start at 0 hats, got {}", first.min_hats));
    }
    if let Some(s) = steps.iter().find(|s| s.amount.is_negative()) {
        return invalid(format!("{name} amount at {} hats is negative", s.min_hats));
    }
    if let Some(s) = steps.iter().find(|s| s.amount.cents() > MAX_UNIT_PRICE_CENTS) {
        return invalid(format!("{name} amount at {} hats is too large", s.min_hats));
    }
    if let Some(pair) = steps.windows(2).find(|p| p[1].min_hats <= p[0].min_hats) {
        return invalid(format!(
            "{name} table is not sorted: {} hats listed after {} hats",
            pair[1].min_hats, pair[0].min_hats
        ));
    }
    Ok(())
}

// =============================================================================
// Pricing Config
// =============================================================================

/// All pricing constants, loadable from the `[pricing]` section of the store
/// config. `Default` is the production price list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Per-hat discount by total hats. Non-decreasing.
    pub volume_discounts: Vec<PriceStep>,
    /// Per-hat puff surcharge by total hats. Non-increasing.
    pub puff_prices: Vec<PriceStep>,
    /// Per hat, per extra placement.
    pub extra_location_price: Money,
    /// One-time artwork digitizing fee.
    pub artwork_setup_fee: Money,
    /// Total hats at which the setup fee is waived.
    pub free_artwork_threshold: i64,
    pub reward_tiers: LoyaltyProgram,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            volume_discounts: vec![
                PriceStep::new(0, 0),
                PriceStep::new(24, 1),
                PriceStep::new(48, 2),
                PriceStep::new(96, 3),
                PriceStep::new(188, 4),
            ],
            puff_prices: vec![
                PriceStep::new(0, 7),
                PriceStep::new(12, 6),
                PriceStep::new(24, 5),
                PriceStep::new(48, 4),
                PriceStep::new(96, 3),
                PriceStep::new(188, 2),
            ],
            extra_location_price: Money::from_major(5),
            artwork_setup_fee: Money::from_major(40),
            free_artwork_threshold: 12,
            reward_tiers: LoyaltyProgram::standard(),
        }
    }
}

impl PricingConfig {
    /// Rejects configurations the engine must never price with.
    pub fn validate(&self) -> CoreResult<()> {
        validate_steps("volume_discounts", &self.volume_discounts)?;
        validate_steps("puff_prices", &self.puff_prices)?;

        if self
            .volume_discounts
            .windows(2)
            .any(|p| p[1].amount < p[0].amount)
        {
            return Err(CoreError::InvalidConfig {
                reason: "volume_discounts must not shrink as hats increase".to_string(),
            });
        }
        if self.puff_prices.windows(2).any(|p| p[1].amount > p[0].amount) {
            return Err(CoreError::InvalidConfig {
                reason: "puff_prices must not grow as hats increase".to_string(),
            });
        }
        if self.extra_location_price.is_negative() || self.artwork_setup_fee.is_negative() {
            return Err(CoreError::InvalidConfig {
                reason: "extra_location_price and artwork_setup_fee cannot be negative"
                    .to_string(),
            });
        }
        if self.extra_location_price.cents() > MAX_UNIT_PRICE_CENTS
            || self.artwork_setup_fee.cents() > MAX_UNIT_PRICE_CENTS
        {
            return Err(CoreError::InvalidConfig {
                reason: format!(
                    "extra_location_price and artwork_setup_fee cannot exceed {MAX_UNIT_PRICE_CENTS} cents"
                ),
            });
        }
        if self.free_artwork_threshold < 1 {
            return Err(CoreError::InvalidConfig {
                reason: format!(
                    "free_artwork_threshold must be at least 1, got {}",
                    self.free_artwork_threshold
                ),
            });
        }

        self.reward_tiers.validate()
    }
}

// =============================================================================
// Order Totals
// =============================================================================

/// Every monetary component of an order, in computation order.
///
/// Never persisted as-is; the confirmed numbers are copied into a
/// `PersistedOrder` when the payment clears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub total_hats: i64,
    pub hat_subtotal: Money,
    pub discount_per_hat: Money,
    pub volume_discount: Money,
    pub discounted_hat_subtotal: Money,
    pub extra_embroidery_total: Money,
    pub puff_price_per_hat: Money,
    pub puff_embroidery_total: Money,
    pub artwork_setup_fee: Money,
    pub artwork_setup_waived: bool,
    pub artwork_setup_waived_reason: Option<WaiverReason>,
    /// Fee that would have been charged had it not been waived.
    pub artwork_setup_fee_waived_amount: Money,
    pub subtotal_before_rewards: Money,
    pub rewards_discount_percent: u32,
    pub rewards_discount: Money,
    pub order_total: Money,
}

impl OrderTotals {
    /// Everything the shopper did not pay: volume discount, waived setup fee
    /// and rewards cash.
    pub fn total_savings(&self) -> Money {
        self.volume_discount + self.artwork_setup_fee_waived_amount + self.rewards_discount
    }

    /// Whether the order is empty (no hats).
    pub fn is_empty(&self) -> bool {
        self.total_hats == 0
    }
}

// =============================================================================
// Volume Breaks
// =============================================================================

/// What the next quantity threshold unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VolumePerk {
    FreeArtworkSetup,
    DiscountPerHat { amount: Money },
}

/// The next quantity threshold above the current cart, for the perks bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct VolumeBreak {
    pub at_hats: i64,
    pub hats_needed: i64,
    pub perk: VolumePerk,
}

// =============================================================================
// Pricing Engine
// =============================================================================

/// Prices orders against a validated [`PricingConfig`].
#[derive(Debug, Clone)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    /// Builds an engine, refusing invalid configuration.
    pub fn new(config: PricingConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Engine over the built-in price list.
    pub fn standard() -> Self {
        Self {
            config: PricingConfig::default(),
        }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn loyalty(&self) -> &LoyaltyProgram {
        &self.config.reward_tiers
    }

    /// Volume discount per hat for `total_hats`.
    ///
    /// ## Example
    /// ```rust
    /// use hatshop_core::{Money, PricingEngine};
    ///
    /// let engine = PricingEngine::standard();
    /// assert_eq!(engine.discount_per_hat(23), Money::zero());
    /// assert_eq!(engine.discount_per_hat(24), Money::from_major(1));
    /// ```
    pub fn discount_per_hat(&self, total_hats: i64) -> Money {
        step_amount(&self.config.volume_discounts, total_hats)
    }

    /// Puff surcharge per hat for `total_hats`.
    pub fn puff_price_per_hat(&self, total_hats: i64) -> Money {
        step_amount(&self.config.puff_prices, total_hats)
    }

    /// Computes the full breakdown.
    ///
    /// ## Arguments
    /// - `items`: may be empty; an empty cart prices to all-zero totals
    /// - `loyalty`: `None` means a new Bronze customer with no setup fee on
    ///   file
    /// - `has_new_artwork_upload`: a fresh file was attached this session,
    ///   which re-triggers the setup fee for returning customers
    pub fn calculate(
        &self,
        items: &[CartLineItem],
        options: &EmbroideryOptions,
        loyalty: Option<&CustomerLoyaltyRecord>,
        has_new_artwork_upload: bool,
    ) -> OrderTotals {
        let cfg = &self.config;

        let total_hats: i64 = items.iter().map(|i| i.quantity).sum();
        let hat_subtotal: Money = items.iter().map(CartLineItem::line_total).sum();

        let discount_per_hat = self.discount_per_hat(total_hats);
        // A line never gets more off per hat than its own unit price.
        let volume_discount: Money = items
            .iter()
            .map(|i| discount_per_hat.min(i.unit_price.non_negative()) * i.quantity)
            .sum();
        let discounted_hat_subtotal = hat_subtotal - volume_discount;

        let extra_embroidery_total =
            cfg.extra_location_price * total_hats * options.extra_location_count();

        let puff_price_per_hat = self.puff_price_per_hat(total_hats);
        let puff_embroidery_total = match options.embroidery_type {
            EmbroideryType::Puff => puff_price_per_hat * total_hats,
            EmbroideryType::Standard => Money::zero(),
        };

        let has_setup_fee_paid = loyalty.is_some_and(|l| l.has_setup_fee_paid);
        let waiver = if total_hats == 0 {
            None
        } else if total_hats >= cfg.free_artwork_threshold {
            Some(WaiverReason::Volume)
        } else if has_setup_fee_paid && !has_new_artwork_upload {
            Some(WaiverReason::ExistingLogo)
        } else {
            None
        };
        let (artwork_setup_fee, waived_amount) = match (total_hats, waiver) {
            (0, _) => (Money::zero(), Money::zero()),
            (_, Some(_)) => (Money::zero(), cfg.artwork_setup_fee),
            (_, None) => (cfg.artwork_setup_fee, Money::zero()),
        };

        let subtotal_before_rewards = discounted_hat_subtotal
            + extra_embroidery_total
            + puff_embroidery_total
            + artwork_setup_fee;

        let rewards_discount_percent = loyalty
            .map(|l| cfg.reward_tiers.rewards_percent(l.reward_tier))
            .unwrap_or(0);
        let rewards_discount = subtotal_before_rewards.percentage(rewards_discount_percent);
        let order_total = subtotal_before_rewards - rewards_discount;

        OrderTotals {
            total_hats,
            hat_subtotal,
            discount_per_hat,
            volume_discount,
            discounted_hat_subtotal,
            extra_embroidery_total,
            puff_price_per_hat,
            puff_embroidery_total,
            artwork_setup_fee,
            artwork_setup_waived: waiver.is_some(),
            artwork_setup_waived_reason: waiver,
            artwork_setup_fee_waived_amount: waived_amount,
            subtotal_before_rewards,
            rewards_discount_percent,
            rewards_discount,
            order_total,
        }
    }

    /// Prices the cart store's current state.
    pub fn price_cart(&self, cart: &Cart, loyalty: Option<&CustomerLoyaltyRecord>) -> OrderTotals {
        self.calculate(
            cart.items(),
            cart.embroidery(),
            loyalty,
            cart.has_new_artwork_upload(),
        )
    }

    /// The next threshold above `total_hats`, or `None` once every perk is
    /// unlocked.
    ///
    /// ```text
    /// 8 hats  → 12 (free artwork setup), 4 more
    /// 30 hats → 48 ($2/hat), 18 more
    /// 188+    → None
    /// ```
    pub fn next_volume_break(&self, total_hats: i64) -> Option<VolumeBreak> {
        let cfg = &self.config;

        let artwork = std::iter::once((cfg.free_artwork_threshold, VolumePerk::FreeArtworkSetup));
        let discounts = cfg
            .volume_discounts
            .iter()
            .filter(|s| s.amount.is_positive())
            .map(|s| (s.min_hats, VolumePerk::DiscountPerHat { amount: s.amount }));

        artwork
            .chain(discounts)
            .filter(|(at, _)| *at > total_hats)
            .min_by_key(|(at, _)| *at)
            .map(|(at_hats, perk)| VolumeBreak {
                at_hats,
                hats_needed: at_hats - total_hats,
                perk,
            })
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::standard()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
