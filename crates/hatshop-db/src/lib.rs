//! # hatshop-db: Database Layer for the Hat Shop storefront
//!
//! SQLite persistence for the two records the pricing engine reads and
//! writes, customers (loyalty state) and confirmed orders, plus the saved
//! artwork and sales rows each confirmed order leaves behind.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Hat Shop Data Flow                               │
//! │                                                                         │
//! │  lookup_customer(email)          payment confirmation webhook          │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     hatshop-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ CustomerRepo   │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo      │    │   _schema    │  │   │
//! │  │   │               │    │ LogoRepo       │    │ 002_logos_   │  │   │
//! │  │   │               │    │ StatsRepo      │    │   analytics  │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (path from storefront.toml)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hatshop_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("hatshop.db")).await?;
//! let record = db.customers().loyalty_record("jo@example.com").await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::customer::CustomerRepository;
pub use repository::logo::LogoRepository;
pub use repository::order::{generate_order_number, ConfirmedOrder, OrderRepository, PersistOutcome};
pub use repository::stats::StatsRepository;
