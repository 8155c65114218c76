//! # Commands Module
//!
//! Storefront command functions. Each takes the state it needs and returns
//! `Result<T, ApiError>`.
//!
//! ## Command Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Storefront Commands                                  │
//! │                                                                         │
//! │  cart.rs       get_cart, apply_cart_action, add_to_cart,               │
//! │                update_cart_item, remove_from_cart, clear_cart          │
//! │                                                                         │
//! │  customer.rs   lookup_customer, rewards_summary                        │
//! │                                                                         │
//! │  checkout.rs   preview_checkout, submit_checkout (PaymentGateway)      │
//! │                                                                         │
//! │  webhook.rs    handle_payment_confirmed                                │
//! │                                                                         │
//! │  order.rs      get_order_by_session, update_order_status               │
//! │                                                                         │
//! │  stats.rs      store_stats                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cart;
pub mod checkout;
pub mod customer;
pub mod order;
pub mod stats;
pub mod webhook;
