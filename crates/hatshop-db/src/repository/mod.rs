//! # Repository Module
//!
//! Database repository implementations for the storefront.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront command                                                     │
//! │       │                                                                 │
//! │       │  db.orders().record_confirmed_order(order, &tiers)             │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── record_confirmed_order (one transaction)                          │
//! │  ├── get_by_session_id / get_by_id                                     │
//! │  ├── list_for_email                                                    │
//! │  └── update_status                                                     │
//! │                                                                         │
//! │  LogoRepository   list_for_email                                       │
//! │  StatsRepository  site_stats, best_sellers, revenue_summary            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`customer::CustomerRepository`] - Customer lookup by email / id
//! - [`order::OrderRepository`] - Confirmed orders and loyalty crediting
//! - [`logo::LogoRepository`] - Saved customer artwork
//! - [`stats::StatsRepository`] - Site counters, best sellers, revenue

pub mod customer;
pub mod logo;
pub mod order;
pub mod stats;
