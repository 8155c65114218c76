//! # Logo Repository
//!
//! Artwork customers have uploaded with confirmed orders. Rows are written
//! inside the order transaction (see [`super::order::OrderRepository`]); this
//! repository only reads them back.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use hatshop_core::validation::validate_email;
use hatshop_core::Logo;

const LOGO_COLUMNS: &str = "id, customer_id, email, file_name, order_id, created_at";

/// Repository for saved artwork.
#[derive(Debug, Clone)]
pub struct LogoRepository {
    pool: SqlitePool,
}

impl LogoRepository {
    /// Creates a new LogoRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LogoRepository { pool }
    }

    /// A customer's saved artwork, newest first.
    ///
    /// Malformed emails can't match a stored row, so they list nothing.
    pub async fn list_for_email(&self, email: &str) -> DbResult<Vec<Logo>> {
        let Ok(email) = validate_email(email) else {
            return Ok(Vec::new());
        };

        let logos = sqlx::query_as::<_, Logo>(&format!(
            "SELECT {LOGO_COLUMNS} FROM logos WHERE email = ?1 \
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(&email)
        .fetch_all(&self.pool)
        .await?;

        debug!(email = %email, count = logos.len(), "Saved logos listed");
        Ok(logos)
    }

    /// Number of saved logos (diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM logos")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_unknown_or_malformed_email_lists_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.logos().list_for_email("nobody@example.com").await.unwrap().is_empty());
        assert!(db.logos().list_for_email("not an email").await.unwrap().is_empty());
    }
}
