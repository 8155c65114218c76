//! # State Module
//!
//! Session and process state for the storefront.
//!
//! Separate state types rather than one `AppState`: each command names
//! exactly what it touches.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌────────────┐  │
//! │  │   DbState    │  │  CartState   │  │ LoyaltyState │  │ StoreConfig│  │
//! │  │              │  │              │  │              │  │            │  │
//! │  │  Database    │  │  Arc<Mutex<  │  │  ticketed    │  │  [store]   │  │
//! │  │  (SQLite     │  │    Cart      │  │  customer    │  │  [pricing] │  │
//! │  │   pool)      │  │  >>          │  │  lookups     │  │  ...       │  │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └────────────┘  │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: Database has an internal connection pool                   │
//! │  • CartState: Arc<Mutex<Cart>>, reducer result swapped in              │
//! │  • LoyaltyState: atomic ticket + Mutex for the current record          │
//! │  • StoreConfig: read-only after startup                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;
mod config;
mod db;
pub(crate) mod loyalty;

pub use cart::CartState;
pub use config::{
    ConfigError, DatabaseSection, LoyaltyLookupSection, StoreConfig, StoreSection,
    CONFIG_FILE_NAME,
};
pub use db::DbState;
pub use loyalty::{CustomerDirectory, LookupOutcome, LoyaltyState};
