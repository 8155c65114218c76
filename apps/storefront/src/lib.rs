//! # Hat Shop Storefront Library
//!
//! Orchestration layer around the pricing engine: configuration, session
//! state and the commands the storefront pages and the payment webhook call.
//!
//! ## Module Organization
//! ```text
//! hatshop_storefront/
//! ├── lib.rs          ◄─── You are here (startup & tracing)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── config.rs   ◄─── StoreConfig (storefront.toml + HATSHOP_* env)
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── cart.rs     ◄─── Session cart (Arc<Mutex<Cart>>)
//! │   └── loyalty.rs  ◄─── Ticketed customer lookups
//! ├── commands/
//! │   ├── cart.rs     ◄─── Cart actions + live totals
//! │   ├── customer.rs ◄─── Loyalty lookup, rewards summary
//! │   ├── checkout.rs ◄─── Gateway session submission
//! │   ├── webhook.rs  ◄─── Payment confirmation → order
//! │   └── order.rs    ◄─── Order lookup, status changes
//! └── error.rs        ◄─── API error type for commands
//! ```

pub mod commands;
pub mod error;
pub mod state;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use error::ApiError;
use hatshop_core::PricingEngine;
use hatshop_db::{Database, DbConfig};
use state::{CartState, DbState, LoyaltyState, StoreConfig};

/// Everything a storefront process holds.
#[derive(Debug)]
pub struct Storefront {
    pub config: StoreConfig,
    pub engine: PricingEngine,
    pub db: DbState,
    pub cart: CartState,
    pub loyalty: LoyaltyState,
}

impl Storefront {
    /// Starts the storefront.
    ///
    /// ## Startup Sequence
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────────┐
    /// │                       Storefront Startup                                │
    /// │                                                                         │
    /// │  1. Validate config ──► invalid pricing tables halt here               │
    /// │  2. Build PricingEngine from [pricing]                                 │
    /// │  3. Resolve database path ([database].path or platform data dir)       │
    /// │  4. Connect (WAL) + run migrations                                     │
    /// │  5. Initialize state: DbState, CartState, LoyaltyState                 │
    /// └─────────────────────────────────────────────────────────────────────────┘
    /// ```
    pub async fn start(config: StoreConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let db_path = config.database_path()?;
        info!(db_path = %db_path.display(), "Database path determined");

        let db = Database::new(
            DbConfig::new(db_path).max_connections(config.database.max_connections),
        )
        .await?;

        Self::with_database(config, db)
    }

    /// Builds the state around an already-open database.
    pub fn with_database(config: StoreConfig, db: Database) -> Result<Self, ApiError> {
        let engine = config.pricing_engine()?;
        let loyalty = LoyaltyState::new(Arc::new(db.customers()), config.lookup_timeout());

        info!(store = %config.store.name, "Storefront state initialized");

        Ok(Storefront {
            config,
            engine,
            db: DbState::new(db),
            cart: CartState::new(),
            loyalty,
        })
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=hatshop=trace` - Show trace for hatshop crates only
/// - Default: `info,hatshop=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hatshop=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{cart, checkout, customer};
    use crate::state::LookupOutcome;
    use hatshop_core::cart::CartAction;
    use hatshop_core::{ExtraLocation, Money, RewardTier};

    async fn storefront() -> Storefront {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Storefront::with_database(StoreConfig::default(), db).unwrap()
    }

    #[tokio::test]
    async fn test_order_builder_flow() {
        let app = storefront().await;

        cart::add_to_cart(
            &app.cart,
            &app.loyalty,
            &app.engine,
            "rope-01".to_string(),
            "Rope Cap".to_string(),
            3000,
            60,
        )
        .unwrap();
        cart::apply_cart_action(
            &app.cart,
            &app.loyalty,
            &app.engine,
            CartAction::ToggleExtraLocation(ExtraLocation::LeftSide),
        )
        .unwrap();
        cart::apply_cart_action(
            &app.cart,
            &app.loyalty,
            &app.engine,
            CartAction::ConfirmArtworkRights(true),
        )
        .unwrap();

        let outcome = customer::lookup_customer(&app.loyalty, "first@example.com")
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            LookupOutcome::Applied(ref r) if r.reward_tier == RewardTier::Bronze
        ));

        // 60 × $30 − 60 × $2 + 60 × $5 = $1980
        let response = cart::get_cart(&app.cart, &app.loyalty, &app.engine);
        assert_eq!(response.totals.order_total, Money::from_major(1980));

        let preview =
            checkout::preview_checkout(&app.cart, &app.loyalty, &app.engine, "first@example.com")
                .unwrap();
        assert_eq!(preview.amount_total, response.totals.order_total);
    }

    #[tokio::test]
    async fn test_invalid_pricing_refuses_to_start() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut config = StoreConfig::default();
        config.pricing.volume_discounts.clear();

        let err = Storefront::with_database(config, db).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigError);
    }
}
