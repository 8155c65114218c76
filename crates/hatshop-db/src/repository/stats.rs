//! # Stats Repository
//!
//! Read-side aggregates over orders, customers and the analytics tables
//! the order transaction fills.
//!
//! ```text
//! site_stats       SUM(orders.total_hats), COUNT(orders), COUNT(customers)
//!                  cancelled orders excluded
//! best_sellers     hat_sales grouped by hat_model, most hats first
//! *_for_order      hat_sales / revenue rows of one order
//! revenue_summary  revenue grouped by revenue_type
//! ```

use sqlx::SqlitePool;

use crate::error::DbResult;
use hatshop_core::{
    HatSale, ModelSales, OrderStatus, Revenue, RevenueSummary, RevenueType, SiteStats,
};

/// Repository for storefront analytics.
#[derive(Debug, Clone)]
pub struct StatsRepository {
    pool: SqlitePool,
}

impl StatsRepository {
    /// Creates a new StatsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StatsRepository { pool }
    }

    /// Landing-page counters.
    pub async fn site_stats(&self) -> DbResult<SiteStats> {
        let stats = sqlx::query_as::<_, SiteStats>(
            r#"
            SELECT
                (SELECT COALESCE(SUM(total_hats), 0) FROM orders WHERE status != ?1)
                    AS total_hats_produced,
                (SELECT COUNT(*) FROM orders WHERE status != ?1) AS total_orders,
                (SELECT COUNT(*) FROM customers) AS total_customers
            "#,
        )
        .bind(OrderStatus::Cancelled)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    /// Hats sold per style, best sellers first.
    pub async fn best_sellers(&self, limit: i64) -> DbResult<Vec<ModelSales>> {
        let rows = sqlx::query_as::<_, ModelSales>(
            r#"
            SELECT hat_model,
                   SUM(quantity) AS hats_sold,
                   SUM(total_price_cents) AS revenue_cents
            FROM hat_sales
            GROUP BY hat_model
            ORDER BY hats_sold DESC, hat_model ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// The hat lines recorded for one order.
    pub async fn hat_sales_for_order(&self, order_id: &str) -> DbResult<Vec<HatSale>> {
        let rows = sqlx::query_as::<_, HatSale>(
            r#"
            SELECT id, order_id, hat_model, hat_color, quantity,
                   unit_price_cents, total_price_cents, sale_date
            FROM hat_sales
            WHERE order_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Sale and refund rows for one order, oldest first.
    pub async fn revenue_for_order(&self, order_id: &str) -> DbResult<Vec<Revenue>> {
        let rows = sqlx::query_as::<_, Revenue>(
            r#"
            SELECT id, order_id, amount_cents, revenue_type, revenue_date
            FROM revenue
            WHERE order_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Sales and refunds across all orders.
    pub async fn revenue_summary(&self) -> DbResult<RevenueSummary> {
        let (sales_cents, refunds_cents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN revenue_type = ?1 THEN amount_cents END), 0),
                COALESCE(SUM(CASE WHEN revenue_type = ?2 THEN amount_cents END), 0)
            FROM revenue
            "#,
        )
        .bind(RevenueType::Sale)
        .bind(RevenueType::Refund)
        .fetch_one(&self.pool)
        .await?;

        Ok(RevenueSummary {
            sales_cents,
            refunds_cents,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use crate::repository::order::tests::{confirmed, metadata_for};
    use crate::repository::order::PersistOutcome;
    use hatshop_core::loyalty::LoyaltyProgram;
    use hatshop_core::{OrderStatus, SiteStats};

    #[tokio::test]
    async fn test_empty_store_stats() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert_eq!(db.stats().site_stats().await.unwrap(), SiteStats::default());
        assert!(db.stats().best_sellers(5).await.unwrap().is_empty());
        assert_eq!(db.stats().revenue_summary().await.unwrap().sales_cents, 0);
    }

    #[tokio::test]
    async fn test_site_stats_skip_cancelled_orders() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tiers = LoyaltyProgram::standard();

        for (session, email, hats) in [
            ("cs_1", "jo@example.com", 12),
            ("cs_2", "jo@example.com", 30),
            ("cs_3", "sam@example.com", 5),
        ] {
            db.orders()
                .record_confirmed_order(confirmed(session, email, metadata_for(hats, 20, false)), &tiers)
                .await
                .unwrap();
        }

        let stats = db.stats().site_stats().await.unwrap();
        assert_eq!(stats.total_hats_produced, 47);
        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.total_customers, 2);

        let order = db.orders().get_by_session_id("cs_2").await.unwrap().unwrap();
        db.orders()
            .update_status(&order.id, OrderStatus::Cancelled)
            .await
            .unwrap();

        let stats = db.stats().site_stats().await.unwrap();
        assert_eq!(stats.total_hats_produced, 17);
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.total_customers, 2);
    }

    #[tokio::test]
    async fn test_best_sellers_grouped_by_model() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tiers = LoyaltyProgram::standard();

        let outcome = db
            .orders()
            .record_confirmed_order(confirmed("cs_a", "jo@example.com", metadata_for(12, 25, false)), &tiers)
            .await
            .unwrap();
        assert!(matches!(outcome, PersistOutcome::Created { .. }));
        db.orders()
            .record_confirmed_order(confirmed("cs_b", "sam@example.com", metadata_for(24, 25, false)), &tiers)
            .await
            .unwrap();

        let best = db.stats().best_sellers(10).await.unwrap();
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].hat_model, "Richardson 112");
        assert_eq!(best[0].hats_sold, 36);
        assert_eq!(best[0].revenue_cents, 90_000);
    }
}
