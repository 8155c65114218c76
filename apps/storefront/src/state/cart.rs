//! # Cart State
//!
//! Holds the shopper's current cart for the session.
//!
//! ## Thread Safety
//! The cart is wrapped in `Arc<Mutex<T>>`: several commands may touch it
//! concurrently, and a dispatch must see the cart it replaces.
//!
//! ## Dispatch Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart State Dispatch                                  │
//! │                                                                         │
//! │  Shopper Action           Command                 State Change          │
//! │  ──────────────           ───────                 ────────────          │
//! │                                                                         │
//! │  Pick hat + qty ────────► apply_cart_action ────► cart = cart.apply(a) │
//! │  Toggle "Back" ─────────► apply_cart_action ────► cart = cart.apply(a) │
//! │  Upload artwork ────────► apply_cart_action ────► cart = cart.apply(a) │
//! │  Empty cart ────────────► clear_cart ───────────► cart = Cart::new()   │
//! │                                                                         │
//! │  A rejected action leaves the stored cart untouched.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hatshop_core::cart::{Cart, CartAction};
use hatshop_core::CoreResult;

/// Session cart, shared between commands.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    /// Creates a new empty cart state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the reducer and stores its result.
    ///
    /// ## Returns
    /// The new cart, or the reducer's error with the old cart kept.
    pub fn dispatch(&self, action: CartAction) -> CoreResult<Cart> {
        let mut cart = self.lock();
        let next = cart.apply(action)?;
        *cart = next.clone();
        Ok(next)
    }

    /// Copy of the current cart.
    pub fn snapshot(&self) -> Cart {
        self.lock().clone()
    }

    /// Executes a function with read access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let hats = cart_state.with_cart(|cart| cart.total_hats());
    /// ```
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.lock();
        f(&cart)
    }

    /// Empties the cart. Returns what it held.
    pub fn clear(&self) -> Cart {
        std::mem::take(&mut *self.lock())
    }

    // The cart is replaced wholesale, never left half-written, so a
    // poisoned lock still guards a consistent value.
    fn lock(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
