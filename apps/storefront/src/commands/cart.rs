//! # Cart Commands
//!
//! Every cart command returns the cart together with freshly computed
//! totals, so the order builder never shows a stale price.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Order Builder                                        │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Select  │────►│ Artwork  │────►│  Review  │────►│ Checkout │       │
//! │  │   Hats   │     │  Upload  │     │          │     │ (gateway)│       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │       │                │                 │                              │
//! │  add_to_cart     apply_cart_action   get_cart       submit_checkout    │
//! │  update_cart_item  (AttachArtwork,                  (checkout.rs)      │
//! │  remove_from_cart   ConfirmArtworkRights)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  clear_cart ───────────────────────────────────────► (back to empty)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::state::{CartState, LoyaltyState};
use hatshop_core::cart::{Cart, CartAction};
use hatshop_core::pricing::VolumeBreak;
use hatshop_core::{CustomerLoyaltyRecord, Money, OrderTotals, PricingEngine};

/// Cart response including the engine's totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub cart: Cart,
    pub totals: OrderTotals,
    /// Next quantity perk, for the perks bar. `None` at the top break.
    pub next_volume_break: Option<VolumeBreak>,
    /// Loyalty record the totals were priced with, if a lookup applied.
    pub customer: Option<CustomerLoyaltyRecord>,
}

/// Prices `cart` with the current loyalty record.
pub fn price_cart(cart: Cart, loyalty: &LoyaltyState, engine: &PricingEngine) -> CartResponse {
    let customer = loyalty.current();
    let totals = engine.price_cart(&cart, customer.as_ref());
    let next_volume_break = engine.next_volume_break(totals.total_hats);

    CartResponse {
        cart,
        totals,
        next_volume_break,
        customer,
    }
}

/// Gets the current cart with totals.
pub fn get_cart(cart: &CartState, loyalty: &LoyaltyState, engine: &PricingEngine) -> CartResponse {
    debug!("get_cart command");
    price_cart(cart.snapshot(), loyalty, engine)
}

/// Applies any cart action and reprices.
///
/// ## Returns
/// Updated cart and totals, or the rule the action broke (cart unchanged).
pub fn apply_cart_action(
    cart: &CartState,
    loyalty: &LoyaltyState,
    engine: &PricingEngine,
    action: CartAction,
) -> Result<CartResponse, ApiError> {
    debug!(?action, "apply_cart_action command");
    let updated = cart.dispatch(action)?;
    Ok(price_cart(updated, loyalty, engine))
}

/// Adds hats to the cart. Adding an id already in the cart increases its
/// quantity.
///
/// ## Arguments
/// * `id` - Hat style id
/// * `name` - Display name
/// * `unit_price_cents` - Price per hat
/// * `quantity` - Hats to add (≥ 1)
pub fn add_to_cart(
    cart: &CartState,
    loyalty: &LoyaltyState,
    engine: &PricingEngine,
    id: String,
    name: String,
    unit_price_cents: i64,
    quantity: i64,
) -> Result<CartResponse, ApiError> {
    apply_cart_action(
        cart,
        loyalty,
        engine,
        CartAction::AddItem {
            id,
            name,
            unit_price: Money::from_cents(unit_price_cents),
            quantity,
            model: None,
            color: None,
        },
    )
}

/// Sets a line's quantity. Zero removes the line.
pub fn update_cart_item(
    cart: &CartState,
    loyalty: &LoyaltyState,
    engine: &PricingEngine,
    id: String,
    quantity: i64,
) -> Result<CartResponse, ApiError> {
    apply_cart_action(cart, loyalty, engine, CartAction::UpdateQuantity { id, quantity })
}

/// Removes a line from the cart.
pub fn remove_from_cart(
    cart: &CartState,
    loyalty: &LoyaltyState,
    engine: &PricingEngine,
    id: String,
) -> Result<CartResponse, ApiError> {
    apply_cart_action(cart, loyalty, engine, CartAction::RemoveItem { id })
}

/// Empties the cart and forgets the artwork and instructions.
pub fn clear_cart(cart: &CartState, loyalty: &LoyaltyState, engine: &PricingEngine) -> CartResponse {
    debug!("clear_cart command");
    cart.clear();
    price_cart(cart.snapshot(), loyalty, engine)
}
