//! # hatshop-core: Pure Business Logic for the Hat Shop storefront
//!
//! This crate is the **heart** of the storefront. It prices embroidered-hat
//! orders, resolves loyalty tiers and models the order-builder session as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Hat Shop Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Storefront (web frontend)                    │   │
//! │  │    Hats ──► Artwork ──► Review ──► Checkout ──► Success        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 Storefront commands (apps/storefront)           │   │
//! │  │    add_to_cart, lookup_customer, submit_checkout, webhook      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ hatshop-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │ pricing │ │ loyalty │ │  cart   │ │checkout │ │  money  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 hatshop-db (Database Layer)                     │   │
//! │  │        customers, orders, idempotent confirmation inserts       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (cart lines, embroidery options, customers, orders)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - The order pricing engine and its pricing tables
//! - [`loyalty`] - Reward tier table, tier resolution and progress
//! - [`cart`] - Immutable-update cart store (reducer)
//! - [`checkout`] - Payment-session line items and order metadata
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use hatshop_core::cart::{Cart, CartAction};
//! use hatshop_core::money::Money;
//! use hatshop_core::pricing::PricingEngine;
//!
//! let cart = Cart::new()
//!     .apply(CartAction::AddItem {
//!         id: "RICH-112-BLK".to_string(),
//!         name: "Richardson 112".to_string(),
//!         unit_price: Money::from_major(15),
//!         quantity: 20,
//!         model: Some("Richardson 112".to_string()),
//!         color: Some("Black".to_string()),
//!     })
//!     .unwrap();
//!
//! let totals = PricingEngine::standard().price_cart(&cart, None);
//!
//! // 20 hats: setup fee waived for volume, no per-hat discount yet
//! assert_eq!(totals.order_total, Money::from_major(300));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod loyalty;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{OrderTotals, PricingConfig, PricingEngine};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct hat variants allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single hat variant in the cart.
///
/// ## Business Reason
/// Catches typos (5000 instead of 500) while leaving room for the largest
/// volume tier (188+ hats) many times over.
pub const MAX_ITEM_QUANTITY: i64 = 5000;

/// Maximum unit price of a hat, in cents ($100,000).
///
/// A full cart (`MAX_CART_ITEMS` lines of `MAX_ITEM_QUANTITY` hats at this
/// price) sums to 5 × 10^12 cents, far inside i64.
pub const MAX_UNIT_PRICE_CENTS: i64 = 10_000_000;

/// Prefix of human-facing order numbers (`CBH-4F2A91C0`).
pub const ORDER_NUMBER_PREFIX: &str = "CBH";
