//! # Loyalty Module
//!
//! The reward tier table and everything derived from it.
//!
//! ## Tier Table
//! ```text
//! ┌──────────┬─────────────────────┬──────────────────┐
//! │ Tier     │ Min lifetime spend  │ Rewards cash     │
//! ├──────────┼─────────────────────┼──────────────────┤
//! │ Bronze   │ $0                  │ 0%               │
//! │ Silver   │ $250                │ 5%               │
//! │ Gold     │ $500                │ 10%              │
//! │ VIP      │ $1,000              │ 15%              │
//! │ Elite    │ $2,500              │ 20%              │
//! │ Diamond  │ $5,000              │ 25%              │
//! │ Platinum │ $10,000             │ 30%              │
//! └──────────┴─────────────────────┴──────────────────┘
//! ```
//!
//! ## Who Uses What
//! - Pricing engine: [`LoyaltyProgram::rewards_percent`] (reads the tier)
//! - Order persistence: [`LoyaltyProgram::resolve`] (recomputes the tier
//!   from the new cumulative spend after each completed order)
//! - "My orders" page: [`LoyaltyProgram::progress`]

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::RewardTier;

// =============================================================================
// Tier Threshold
// =============================================================================

/// One row of the tier table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TierThreshold {
    pub tier: RewardTier,
    /// Inclusive lower bound of lifetime spend.
    pub min_lifetime_spend: Money,
    /// Percentage of the pre-rewards subtotal returned as rewards cash.
    pub rewards_percent: u32,
}

impl TierThreshold {
    const fn new(tier: RewardTier, min_major: i64, rewards_percent: u32) -> Self {
        Self {
            tier,
            min_lifetime_spend: Money::from_major(min_major),
            rewards_percent,
        }
    }
}

/// The built-in tier table.
pub const STANDARD_TIERS: [TierThreshold; 7] = [
    TierThreshold::new(RewardTier::Bronze, 0, 0),
    TierThreshold::new(RewardTier::Silver, 250, 5),
    TierThreshold::new(RewardTier::Gold, 500, 10),
    TierThreshold::new(RewardTier::Vip, 1_000, 15),
    TierThreshold::new(RewardTier::Elite, 2_500, 20),
    TierThreshold::new(RewardTier::Diamond, 5_000, 25),
    TierThreshold::new(RewardTier::Platinum, 10_000, 30),
];

// =============================================================================
// Progress / Benefits DTOs
// =============================================================================

/// Progress toward the next tier, for the "my orders" progress bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TierProgress {
    pub current: RewardTier,
    /// `None` at the top tier.
    pub next: Option<RewardTier>,
    /// Never negative.
    pub amount_needed: Money,
    /// 0-100, 100 at the top tier.
    pub percent_complete: u8,
}

/// What a tier gives the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TierBenefits {
    pub tier: RewardTier,
    pub rewards_cash_percent: u32,
    pub min_lifetime_spend: Money,
}

// =============================================================================
// Loyalty Program
// =============================================================================

/// An ordered tier table, lowest tier first.
///
/// Serializes as a plain array so it can sit under `[[pricing.reward_tiers]]`
/// in the store config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoyaltyProgram {
    tiers: Vec<TierThreshold>,
}

impl Default for LoyaltyProgram {
    fn default() -> Self {
        Self::standard()
    }
}

impl LoyaltyProgram {
    /// The built-in tier table.
    pub fn standard() -> Self {
        Self {
            tiers: STANDARD_TIERS.to_vec(),
        }
    }

    /// Builds a program from a custom table, validating it.
    pub fn new(tiers: Vec<TierThreshold>) -> CoreResult<Self> {
        let program = Self { tiers };
        program.validate()?;
        Ok(program)
    }

    /// Table rows, lowest tier first.
    pub fn tiers(&self) -> &[TierThreshold] {
        &self.tiers
    }

    /// Maps a lifetime spend to a tier.
    ///
    /// Highest tier whose minimum does not exceed `spend`. Spend below every
    /// minimum (only possible with a negative figure) resolves to the first
    /// row.
    ///
    /// ## Example
    /// ```rust
    /// use hatshop_core::loyalty::LoyaltyProgram;
    /// use hatshop_core::{Money, RewardTier};
    ///
    /// let program = LoyaltyProgram::standard();
    /// assert_eq!(program.resolve(Money::from_cents(24_999)), RewardTier::Bronze);
    /// assert_eq!(program.resolve(Money::from_major(250)), RewardTier::Silver);
    /// ```
    pub fn resolve(&self, spend: Money) -> RewardTier {
        self.tiers
            .iter()
            .rev()
            .find(|t| t.min_lifetime_spend <= spend)
            .or_else(|| self.tiers.first())
            .map(|t| t.tier)
            .unwrap_or_default()
    }

    /// The row for `tier`, if the table has one.
    pub fn threshold(&self, tier: RewardTier) -> Option<&TierThreshold> {
        self.tiers.iter().find(|t| t.tier == tier)
    }

    /// The row immediately after `tier`, or `None` at the top.
    pub fn next_tier(&self, tier: RewardTier) -> Option<&TierThreshold> {
        let idx = self.tiers.iter().position(|t| t.tier == tier)?;
        self.tiers.get(idx + 1)
    }

    /// How much more spend unlocks the tier after `tier`.
    ///
    /// Clamped at zero: a stored tier can lag behind the spend when two
    /// orders complete close together.
    pub fn amount_needed(&self, tier: RewardTier, spend: Money) -> Option<Money> {
        self.next_tier(tier)
            .map(|next| (next.min_lifetime_spend - spend).non_negative())
    }

    /// Rewards-cash percentage for `tier` (0 for tiers missing from the table).
    pub fn rewards_percent(&self, tier: RewardTier) -> u32 {
        self.threshold(tier).map(|t| t.rewards_percent).unwrap_or(0)
    }

    /// Benefits summary for `tier`.
    pub fn benefits(&self, tier: RewardTier) -> TierBenefits {
        TierBenefits {
            tier,
            rewards_cash_percent: self.rewards_percent(tier),
            min_lifetime_spend: self
                .threshold(tier)
                .map(|t| t.min_lifetime_spend)
                .unwrap_or_default(),
        }
    }

    /// Progress from `tier` toward the next one.
    ///
    /// ```text
    /// Silver ($250) ─────●──────────── Gold ($500)
    ///               spend $300 → 20%
    /// ```
    pub fn progress(&self, tier: RewardTier, spend: Money) -> TierProgress {
        let Some(next) = self.next_tier(tier) else {
            return TierProgress {
                current: tier,
                next: None,
                amount_needed: Money::zero(),
                percent_complete: 100,
            };
        };

        let floor = self
            .threshold(tier)
            .map(|t| t.min_lifetime_spend)
            .unwrap_or_default();
        let span = (next.min_lifetime_spend - floor).cents();
        let done = (spend - floor).cents().clamp(0, span.max(0));
        let percent = if span <= 0 { 100 } else { done * 100 / span };

        TierProgress {
            current: tier,
            next: Some(next.tier),
            amount_needed: (next.min_lifetime_spend - spend).non_negative(),
            percent_complete: percent.min(100) as u8,
        }
    }

    /// Checks the table is usable.
    ///
    /// ## Rules
    /// - Not empty, first row starts at $0
    /// - Tiers strictly increasing, minimums strictly increasing
    /// - Percentages at most 100
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |reason: String| Err(CoreError::InvalidConfig { reason });

        let Some(first) = self.tiers.first() else {
            return invalid("reward tier table is empty".to_string());
        };
        if !first.min_lifetime_spend.is_zero() {
            return invalid(format!(
                "first reward tier {} must start at 0, got {}",
                first.tier, first.min_lifetime_spend
            ));
        }

        for pair in self.tiers.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            if hi.tier <= lo.tier {
                return invalid(format!("reward tier {} listed after {}", hi.tier, lo.tier));
            }
            if hi.min_lifetime_spend <= lo.min_lifetime_spend {
                return invalid(format!(
                    "reward tier {} minimum {} is not above {}",
                    hi.tier, hi.min_lifetime_spend, lo.min_lifetime_spend
                ));
            }
        }

        if let Some(t) = self.tiers.iter().find(|t| t.rewards_percent > 100) {
            return invalid(format!(
                "reward tier {} percent {} exceeds 100",
                t.tier, t.rewards_percent
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
