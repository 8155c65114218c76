//! # Stats Commands
//!
//! Landing-page counters and the operator's sales report.

use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::state::DbState;
use hatshop_core::{Money, ModelSales, SiteStats};

/// Default number of styles in the best-seller list.
pub const BEST_SELLERS_LIMIT: i64 = 5;

/// Counters plus sales by style and net revenue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    #[serde(flatten)]
    pub site: SiteStats,
    pub best_sellers: Vec<ModelSales>,
    pub gross_sales: Money,
    pub refunds: Money,
    pub net_revenue: Money,
}

/// Builds the store statistics.
pub async fn store_stats(db: &DbState, best_sellers_limit: i64) -> Result<StoreStats, ApiError> {
    let stats = db.inner().stats();
    let site = stats.site_stats().await?;
    let best_sellers = stats.best_sellers(best_sellers_limit.max(0)).await?;
    let revenue = stats.revenue_summary().await?;

    debug!(
        total_orders = site.total_orders,
        total_hats = site.total_hats_produced,
        "store_stats command"
    );

    Ok(StoreStats {
        site,
        best_sellers,
        gross_sales: Money::from_cents(revenue.sales_cents),
        refunds: Money::from_cents(revenue.refunds_cents),
        net_revenue: revenue.net(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hatshop_db::{Database, DbConfig};

    #[tokio::test]
    async fn test_empty_store() {
        let db = DbState::new(Database::new(DbConfig::in_memory()).await.unwrap());

        let stats = store_stats(&db, BEST_SELLERS_LIMIT).await.unwrap();
        assert_eq!(stats.site.total_orders, 0);
        assert!(stats.best_sellers.is_empty());
        assert_eq!(stats.net_revenue, Money::zero());

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalHatsProduced"], 0);
        assert_eq!(json["netRevenue"], 0);
    }
}
