//! # Order Repository
//!
//! Persistence for confirmed orders and the loyalty credit they earn.
//!
//! ## Confirmation Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │               record_confirmed_order (single transaction)               │
//! │                                                                         │
//! │  1. INSERT order ... ON CONFLICT(payment_session_id) DO NOTHING        │
//! │     └── 0 rows? → duplicate delivery, return AlreadyProcessed          │
//! │                                                                         │
//! │  2. UPSERT customer by email                                           │
//! │     └── spend += order_total, hats += total_hats,                      │
//! │         has_setup_fee_paid |= setup fee charged                        │
//! │                                                                         │
//! │  3. UPDATE customer tier = resolve(new lifetime spend)                 │
//! │                                                                         │
//! │  4. UPDATE order.customer_id                                           │
//! │                                                                         │
//! │  5. INSERT logo (new upload only, once per email + file name)          │
//! │     INSERT hat_sales (one row per line)                                │
//! │     INSERT revenue ('sale', amount paid)                               │
//! │                                                                         │
//! │  6. COMMIT                                                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancelling a paid order writes a matching `'refund'` revenue row in the
//! same transaction as the status change.
//!
//! The UNIQUE constraint on `payment_session_id` is the idempotency guard.
//! There is no read-before-write, so two concurrent deliveries of the same
//! event credit the customer exactly once.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use hatshop_core::checkout::OrderMetadata;
use hatshop_core::loyalty::LoyaltyProgram;
use hatshop_core::{
    Customer, EmbroideryType, FrontLocation, Money, OrderStatus, PersistedOrder, RevenueType,
    ShippingAddress,
};

const ORDER_COLUMNS: &str = r#"
    id, order_number, customer_id, email, payment_session_id, payment_intent_id,
    items, embroidery_type, front_location, extra_locations,
    artwork_file_name, special_instructions,
    hat_subtotal_cents, volume_discount_cents, discount_per_hat_cents,
    extra_embroidery_total_cents, puff_embroidery_total_cents,
    artwork_setup_fee_cents, rewards_discount_cents, rewards_discount_percent,
    order_total_cents, total_hats, amount_paid_cents,
    shipping_name, shipping_address, status, created_at, updated_at
"#;

const CUSTOMER_COLUMNS: &str = r#"
    id, email, name, phone, reward_tier,
    total_lifetime_spend_cents, total_hats_ordered, has_setup_fee_paid,
    created_at, updated_at
"#;

// =============================================================================
// Inputs and Outcomes
// =============================================================================

/// A payment the gateway has confirmed, ready to be persisted.
#[derive(Debug, Clone)]
pub struct ConfirmedOrder {
    pub order_number: String,
    pub email: String,
    pub payment_session_id: String,
    pub payment_intent_id: Option<String>,
    /// Cart snapshot and totals carried through the checkout session.
    pub metadata: OrderMetadata,
    /// What the gateway reports as charged.
    pub amount_paid: Money,
    pub shipping_name: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
}

/// Result of recording a confirmation.
#[derive(Debug, Clone)]
pub enum PersistOutcome {
    /// First delivery: the order exists and the customer was credited.
    Created {
        order: PersistedOrder,
        customer: Customer,
    },
    /// The session was already recorded. Nothing was written.
    AlreadyProcessed { payment_session_id: String },
}

impl PersistOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, PersistOutcome::AlreadyProcessed { .. })
    }
}

/// Generates a human-facing order number, e.g. `CBH-4F2A91C0`.
pub fn generate_order_number(prefix: &str) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect();
    format!("{}-{}", prefix, suffix.to_uppercase())
}

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    order_number: String,
    customer_id: Option<String>,
    email: String,
    payment_session_id: String,
    payment_intent_id: Option<String>,
    items: String,
    embroidery_type: EmbroideryType,
    front_location: FrontLocation,
    extra_locations: String,
    artwork_file_name: Option<String>,
    special_instructions: Option<String>,
    hat_subtotal_cents: i64,
    volume_discount_cents: i64,
    discount_per_hat_cents: i64,
    extra_embroidery_total_cents: i64,
    puff_embroidery_total_cents: i64,
    artwork_setup_fee_cents: i64,
    rewards_discount_cents: i64,
    rewards_discount_percent: i64,
    order_total_cents: i64,
    total_hats: i64,
    amount_paid_cents: i64,
    shipping_name: Option<String>,
    shipping_address: Option<String>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for PersistedOrder {
    type Error = DbError;

    fn try_from(row: OrderRow) -> DbResult<Self> {
        let shipping_address = row
            .shipping_address
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let rewards_discount_percent = u32::try_from(row.rewards_discount_percent)
            .map_err(|_| {
                DbError::Serialization(format!(
                    "rewards_discount_percent out of range: {}",
                    row.rewards_discount_percent
                ))
            })?;

        Ok(PersistedOrder {
            id: row.id,
            order_number: row.order_number,
            customer_id: row.customer_id,
            email: row.email,
            payment_session_id: row.payment_session_id,
            payment_intent_id: row.payment_intent_id,
            items: serde_json::from_str(&row.items)?,
            embroidery_type: row.embroidery_type,
            front_location: row.front_location,
            extra_locations: serde_json::from_str(&row.extra_locations)?,
            artwork_file_name: row.artwork_file_name,
            special_instructions: row.special_instructions,
            hat_subtotal_cents: row.hat_subtotal_cents,
            volume_discount_cents: row.volume_discount_cents,
            discount_per_hat_cents: row.discount_per_hat_cents,
            extra_embroidery_total_cents: row.extra_embroidery_total_cents,
            puff_embroidery_total_cents: row.puff_embroidery_total_cents,
            artwork_setup_fee_cents: row.artwork_setup_fee_cents,
            rewards_discount_cents: row.rewards_discount_cents,
            rewards_discount_percent,
            order_total_cents: row.order_total_cents,
            total_hats: row.total_hats,
            amount_paid_cents: row.amount_paid_cents,
            shipping_name: row.shipping_name,
            shipping_address,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Records a confirmed payment and credits the customer's loyalty.
    ///
    /// ## Idempotency
    /// Keyed on `payment_session_id`. A repeated delivery returns
    /// [`PersistOutcome::AlreadyProcessed`] and writes nothing, so lifetime
    /// spend is never counted twice.
    ///
    /// ## Arguments
    /// * `confirmed` - The confirmed payment and its order snapshot
    /// * `tiers` - Tier table used to re-resolve the customer's tier
    pub async fn record_confirmed_order(
        &self,
        confirmed: ConfirmedOrder,
        tiers: &LoyaltyProgram,
    ) -> DbResult<PersistOutcome> {
        let email = confirmed.email.trim().to_lowercase();
        let totals = &confirmed.metadata.totals;
        let order_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(
            session_id = %confirmed.payment_session_id,
            order_number = %confirmed.order_number,
            "Recording confirmed order"
        );

        let items_json = serde_json::to_string(&confirmed.metadata.items)?;
        let extras_json = serde_json::to_string(&confirmed.metadata.extra_locations)?;
        let shipping_json = confirmed
            .shipping_address
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, customer_id, email, payment_session_id, payment_intent_id,
                items, embroidery_type, front_location, extra_locations,
                artwork_file_name, special_instructions,
                hat_subtotal_cents, volume_discount_cents, discount_per_hat_cents,
                extra_embroidery_total_cents, puff_embroidery_total_cents,
                artwork_setup_fee_cents, rewards_discount_cents, rewards_discount_percent,
                order_total_cents, total_hats, amount_paid_cents,
                shipping_name, shipping_address, status, created_at, updated_at
            ) VALUES (
                ?1, ?2, NULL, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11,
                ?12, ?13, ?14,
                ?15, ?16,
                ?17, ?18, ?19,
                ?20, ?21, ?22,
                ?23, ?24, ?25, ?26, ?26
            )
            ON CONFLICT(payment_session_id) DO NOTHING
            "#,
        )
        .bind(&order_id)
        .bind(&confirmed.order_number)
        .bind(&email)
        .bind(&confirmed.payment_session_id)
        .bind(&confirmed.payment_intent_id)
        .bind(&items_json)
        .bind(confirmed.metadata.embroidery_type)
        .bind(confirmed.metadata.front_location)
        .bind(&extras_json)
        .bind(&confirmed.metadata.artwork_file_name)
        .bind(&confirmed.metadata.special_instructions)
        .bind(totals.hat_subtotal.cents())
        .bind(totals.volume_discount.cents())
        .bind(totals.discount_per_hat.cents())
        .bind(totals.extra_embroidery_total.cents())
        .bind(totals.puff_embroidery_total.cents())
        .bind(totals.artwork_setup_fee.cents())
        .bind(totals.rewards_discount.cents())
        .bind(i64::from(totals.rewards_discount_percent))
        .bind(totals.order_total.cents())
        .bind(totals.total_hats)
        .bind(confirmed.amount_paid.cents())
        .bind(&confirmed.shipping_name)
        .bind(&shipping_json)
        .bind(OrderStatus::Paid)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            info!(
                session_id = %confirmed.payment_session_id,
                "Payment session already recorded, skipping"
            );
            return Ok(PersistOutcome::AlreadyProcessed {
                payment_session_id: confirmed.payment_session_id,
            });
        }

        let (customer_id, lifetime_spend_cents): (String, i64) = sqlx::query_as(
            r#"
            INSERT INTO customers (
                id, email, reward_tier, total_lifetime_spend_cents,
                total_hats_ordered, has_setup_fee_paid, created_at, updated_at
            ) VALUES (?1, ?2, 'Bronze', ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT(email) DO UPDATE SET
                total_lifetime_spend_cents =
                    customers.total_lifetime_spend_cents + excluded.total_lifetime_spend_cents,
                total_hats_ordered = customers.total_hats_ordered + excluded.total_hats_ordered,
                has_setup_fee_paid = customers.has_setup_fee_paid OR excluded.has_setup_fee_paid,
                updated_at = excluded.updated_at
            RETURNING id, total_lifetime_spend_cents
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&email)
        .bind(totals.order_total.cents())
        .bind(totals.total_hats)
        .bind(totals.artwork_setup_fee.is_positive())
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let tier = tiers.resolve(Money::from_cents(lifetime_spend_cents));

        sqlx::query("UPDATE customers SET reward_tier = ?1 WHERE id = ?2")
            .bind(tier)
            .bind(&customer_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE orders SET customer_id = ?1 WHERE id = ?2")
            .bind(&customer_id)
            .bind(&order_id)
            .execute(&mut *tx)
            .await?;

        if let Some(file_name) = &confirmed.metadata.artwork_file_name {
            sqlx::query(
                r#"
                INSERT INTO logos (id, customer_id, email, file_name, order_id, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(email, file_name) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&customer_id)
            .bind(&email)
            .bind(file_name)
            .bind(&order_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        for item in &confirmed.metadata.items {
            let unit_price = Money::from_cents(item.unit_price_cents);
            sqlx::query(
                r#"
                INSERT INTO hat_sales (
                    id, order_id, hat_model, hat_color, quantity,
                    unit_price_cents, total_price_cents, sale_date
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&order_id)
            .bind(item.model.as_deref().unwrap_or(item.name.as_str()))
            .bind(item.color.as_deref().unwrap_or_default())
            .bind(item.quantity)
            .bind(unit_price.cents())
            .bind(unit_price.multiply_quantity(item.quantity).cents())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        insert_revenue(&mut tx, &order_id, confirmed.amount_paid, RevenueType::Sale).await?;

        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
        ))
        .bind(&customer_id)
        .fetch_one(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(&order_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            order_number = %confirmed.order_number,
            customer_id = %customer_id,
            tier = %tier,
            lifetime_spend_cents,
            "Order recorded and customer credited"
        );

        Ok(PersistOutcome::Created {
            order: row.try_into()?,
            customer,
        })
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PersistedOrder>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PersistedOrder::try_from).transpose()
    }

    /// Gets the order created for a payment session.
    pub async fn get_by_session_id(&self, session_id: &str) -> DbResult<Option<PersistedOrder>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE payment_session_id = ?1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PersistedOrder::try_from).transpose()
    }

    /// A customer's orders, newest first.
    pub async fn list_for_email(&self, email: &str, limit: i64) -> DbResult<Vec<PersistedOrder>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE email = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        ))
        .bind(email.trim().to_lowercase())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PersistedOrder::try_from).collect()
    }

    /// Moves an order to a new status.
    ///
    /// ## Errors
    /// - `NotFound` if the order doesn't exist
    /// - `InvalidStatusTransition` if the move isn't allowed, including when
    ///   another writer changed the status first
    pub async fn update_status(&self, id: &str, next: OrderStatus) -> DbResult<PersistedOrder> {
        let order = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        if !order.status.can_transition_to(next) {
            return Err(DbError::InvalidStatusTransition {
                id: id.to_string(),
                from: order.status,
                to: next,
            });
        }

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        )
        .bind(next)
        .bind(Utc::now())
        .bind(id)
        .bind(order.status)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::InvalidStatusTransition {
                id: id.to_string(),
                from: order.status,
                to: next,
            });
        }

        // Only a paid order has money to give back.
        if next == OrderStatus::Cancelled && order.status != OrderStatus::Pending {
            insert_revenue(&mut tx, id, order.amount_paid(), RevenueType::Refund).await?;
        }

        tx.commit().await?;

        debug!(id = %id, from = ?order.status, to = ?next, "Order status updated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    /// Number of orders (diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Appends a sale or refund row. Amounts are stored as positive cents.
async fn insert_revenue(
    tx: &mut Transaction<'_, Sqlite>,
    order_id: &str,
    amount: Money,
    revenue_type: RevenueType,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO revenue (id, order_id, amount_cents, revenue_type, revenue_date)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(order_id)
    .bind(amount.non_negative().cents())
    .bind(revenue_type)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use hatshop_core::cart::{Cart, CartAction};
    use hatshop_core::{ExtraLocation, PricingEngine, RewardTier, ORDER_NUMBER_PREFIX};

    pub(crate) fn metadata_for(hats: i64, unit_price_dollars: i64, upload: bool) -> OrderMetadata {
        let mut cart = Cart::new()
            .apply(CartAction::AddItem {
                id: "trucker-01".to_string(),
                name: "Trucker Cap".to_string(),
                unit_price: Money::from_major(unit_price_dollars),
                quantity: hats,
                model: Some("Richardson 112".to_string()),
                color: Some("Black".to_string()),
            })
            .unwrap()
            .apply(CartAction::ToggleExtraLocation(ExtraLocation::Back))
            .unwrap();
        if upload {
            cart = cart
                .apply(CartAction::AttachArtwork(Some("logo.png".to_string())))
                .unwrap();
        }
        let totals = PricingEngine::standard().price_cart(&cart, None);
        OrderMetadata::from_cart(&cart, &totals)
    }

    pub(crate) fn confirmed(session_id: &str, email: &str, metadata: OrderMetadata) -> ConfirmedOrder {
        ConfirmedOrder {
            order_number: generate_order_number(ORDER_NUMBER_PREFIX),
            email: email.to_string(),
            payment_session_id: session_id.to_string(),
            payment_intent_id: Some(format!("pi_{session_id}")),
            amount_paid: metadata.totals.order_total,
            metadata,
            shipping_name: Some("Jo Buyer".to_string()),
            shipping_address: Some(ShippingAddress {
                line1: "1 Main St".to_string(),
                city: "Austin".to_string(),
                state: "TX".to_string(),
                postal_code: "78701".to_string(),
                country: "US".to_string(),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number("CBH");
        assert!(number.starts_with("CBH-"));
        assert_eq!(number.len(), 12);
        assert!(number[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[tokio::test]
    async fn test_first_order_creates_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tiers = LoyaltyProgram::standard();

        // 12 hats at $25 + back embroidery: $300 + $60, setup waived by volume
        let outcome = db
            .orders()
            .record_confirmed_order(confirmed("cs_1", "Jo@Example.com", metadata_for(12, 25, true)), &tiers)
            .await
            .unwrap();

        let PersistOutcome::Created { order, customer } = outcome else {
            panic!("expected a created order");
        };

        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.email, "jo@example.com");
        assert_eq!(order.customer_id.as_deref(), Some(customer.id.as_str()));
        assert_eq!(order.order_total_cents, 36_000);
        assert_eq!(order.amount_paid_cents, 36_000);
        assert_eq!(order.extra_locations, vec![ExtraLocation::Back]);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.artwork_setup_fee_cents, 0);
        assert_eq!(
            order.shipping_address.as_ref().map(|a| a.city.as_str()),
            Some("Austin")
        );

        assert_eq!(customer.email, "jo@example.com");
        assert_eq!(customer.total_lifetime_spend_cents, 36_000);
        assert_eq!(customer.total_hats_ordered, 12);
        assert_eq!(customer.reward_tier, RewardTier::Silver);
        assert!(!customer.has_setup_fee_paid);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_absorbed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tiers = LoyaltyProgram::standard();
        let orders = db.orders();

        let first = orders
            .record_confirmed_order(confirmed("cs_dup", "jo@example.com", metadata_for(12, 25, false)), &tiers)
            .await
            .unwrap();
        assert!(!first.is_duplicate());

        let second = orders
            .record_confirmed_order(confirmed("cs_dup", "jo@example.com", metadata_for(12, 25, false)), &tiers)
            .await
            .unwrap();
        assert!(second.is_duplicate());

        assert_eq!(orders.count().await.unwrap(), 1);
        let customer = db
            .customers()
            .find_by_email("jo@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(customer.total_lifetime_spend_cents, 36_000);
        assert_eq!(customer.total_hats_ordered, 12);
    }

    #[tokio::test]
    async fn test_tier_recomputed_from_cumulative_spend() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tiers = LoyaltyProgram::standard();

        for session in ["cs_a", "cs_b"] {
            db.orders()
                .record_confirmed_order(confirmed(session, "jo@example.com", metadata_for(12, 25, false)), &tiers)
                .await
                .unwrap();
        }

        let customer = db
            .customers()
            .find_by_email("jo@example.com")
            .await
            .unwrap()
            .unwrap();

        // $360 + $360 = $720 → Gold ($500)
        assert_eq!(customer.total_lifetime_spend_cents, 72_000);
        assert_eq!(customer.total_hats_ordered, 24);
        assert_eq!(customer.reward_tier, RewardTier::Gold);
    }

    #[tokio::test]
    async fn test_setup_fee_flag_is_sticky() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tiers = LoyaltyProgram::standard();

        // 5 hats: setup fee charged
        let outcome = db
            .orders()
            .record_confirmed_order(confirmed("cs_fee", "jo@example.com", metadata_for(5, 20, true)), &tiers)
            .await
            .unwrap();
        let PersistOutcome::Created { order, customer } = outcome else {
            panic!("expected a created order");
        };
        assert_eq!(order.artwork_setup_fee_cents, 4_000);
        assert!(customer.has_setup_fee_paid);

        // Later order with the fee waived keeps the flag
        let outcome = db
            .orders()
            .record_confirmed_order(confirmed("cs_vol", "jo@example.com", metadata_for(12, 25, false)), &tiers)
            .await
            .unwrap();
        let PersistOutcome::Created { customer, .. } = outcome else {
            panic!("expected a created order");
        };
        assert!(customer.has_setup_fee_paid);
    }

    #[tokio::test]
    async fn test_list_for_email_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tiers = LoyaltyProgram::standard();
        let orders = db.orders();

        for session in ["cs_1", "cs_2", "cs_3"] {
            orders
                .record_confirmed_order(confirmed(session, "jo@example.com", metadata_for(12, 25, false)), &tiers)
                .await
                .unwrap();
        }
        orders
            .record_confirmed_order(confirmed("cs_other", "sam@example.com", metadata_for(12, 25, false)), &tiers)
            .await
            .unwrap();

        let listed = orders.list_for_email("JO@example.com", 2).await.unwrap();
        let sessions: Vec<_> = listed.iter().map(|o| o.payment_session_id.as_str()).collect();
        assert_eq!(sessions, vec!["cs_3", "cs_2"]);

        let found = orders.get_by_session_id("cs_other").await.unwrap().unwrap();
        assert_eq!(found.email, "sam@example.com");
        assert!(orders.get_by_session_id("cs_missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tiers = LoyaltyProgram::standard();
        let orders = db.orders();

        let PersistOutcome::Created { order, .. } = orders
            .record_confirmed_order(confirmed("cs_s", "jo@example.com", metadata_for(12, 25, false)), &tiers)
            .await
            .unwrap()
        else {
            panic!("expected a created order");
        };

        let processing = orders
            .update_status(&order.id, OrderStatus::Processing)
            .await
            .unwrap();
        assert_eq!(processing.status, OrderStatus::Processing);

        let err = orders
            .update_status(&order.id, OrderStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidStatusTransition {
                from: OrderStatus::Processing,
                to: OrderStatus::Paid,
                ..
            }
        ));

        let err = orders
            .update_status("missing", OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_confirmation_saves_logo_and_sales_rows() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tiers = LoyaltyProgram::standard();

        let PersistOutcome::Created { order, customer } = db
            .orders()
            .record_confirmed_order(confirmed("cs_logo", "jo@example.com", metadata_for(12, 25, true)), &tiers)
            .await
            .unwrap()
        else {
            panic!("expected a created order");
        };

        let logos = db.logos().list_for_email("jo@example.com").await.unwrap();
        assert_eq!(logos.len(), 1);
        assert_eq!(logos[0].file_name, "logo.png");
        assert_eq!(logos[0].customer_id.as_deref(), Some(customer.id.as_str()));
        assert_eq!(logos[0].order_id.as_deref(), Some(order.id.as_str()));

        let sales = db.stats().hat_sales_for_order(&order.id).await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].hat_model, "Richardson 112");
        assert_eq!(sales[0].hat_color, "Black");
        assert_eq!(sales[0].quantity, 12);
        assert_eq!(sales[0].total_price_cents, 30_000);
        assert_eq!(order.items[0].model.as_deref(), Some("Richardson 112"));

        // same file again, and a redelivery: nothing new is saved
        db.orders()
            .record_confirmed_order(confirmed("cs_again", "jo@example.com", metadata_for(12, 25, true)), &tiers)
            .await
            .unwrap();
        db.orders()
            .record_confirmed_order(confirmed("cs_logo", "jo@example.com", metadata_for(12, 25, true)), &tiers)
            .await
            .unwrap();
        assert_eq!(db.logos().count().await.unwrap(), 1);

        let revenue = db.stats().revenue_summary().await.unwrap();
        assert_eq!(revenue.sales_cents, 72_000);
        assert_eq!(revenue.refunds_cents, 0);
    }

    #[tokio::test]
    async fn test_no_logo_without_upload() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.orders()
            .record_confirmed_order(
                confirmed("cs_plain", "jo@example.com", metadata_for(12, 25, false)),
                &LoyaltyProgram::standard(),
            )
            .await
            .unwrap();

        assert!(db.logos().list_for_email("jo@example.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelling_paid_order_records_refund() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tiers = LoyaltyProgram::standard();
        let orders = db.orders();

        let PersistOutcome::Created { order, .. } = orders
            .record_confirmed_order(confirmed("cs_c", "jo@example.com", metadata_for(12, 25, false)), &tiers)
            .await
            .unwrap()
        else {
            panic!("expected a created order");
        };

        let cancelled = orders
            .update_status(&order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let revenue = db.stats().revenue_summary().await.unwrap();
        assert_eq!(revenue.sales_cents, 36_000);
        assert_eq!(revenue.refunds_cents, 36_000);
        assert_eq!(revenue.net(), Money::zero());

        let rows = db.stats().revenue_for_order(&order.id).await.unwrap();
        let kinds: Vec<_> = rows.iter().map(|r| r.revenue_type).collect();
        assert_eq!(kinds, vec![RevenueType::Sale, RevenueType::Refund]);

        // a second cancel is rejected and refunds nothing
        assert!(orders
            .update_status(&order.id, OrderStatus::Cancelled)
            .await
            .is_err());
        assert_eq!(db.stats().revenue_summary().await.unwrap().refunds_cents, 36_000);
    }
}
