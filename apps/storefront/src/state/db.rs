//! # Database State
//!
//! Wraps the `Database` connection for use in commands.
//!
//! ## Thread Safety
//! The `Database` struct from `hatshop-db` contains a `SqlitePool`, which
//! is thread-safe. Commands run queries concurrently without extra locking.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn rewards_summary(db: &DbState, email: &str) -> Result<RewardsSummary, ApiError> {
//!     let customer = db.inner().customers().find_by_email(email).await?;
//!     // ...
//! }
//! ```

use hatshop_db::Database;

/// Shared handle to the storefront database.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    /// Creates a new DbState wrapping the database connection.
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
