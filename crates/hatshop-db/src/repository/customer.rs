//! # Customer Repository
//!
//! Read access to customers. Rows are only ever created or credited inside
//! the order transaction (see [`super::order::OrderRepository`]).
//!
//! Emails are matched case-insensitively: every lookup normalizes the input
//! the same way the write path does before touching the `email` column.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use hatshop_core::validation::validate_email;
use hatshop_core::{Customer, CustomerLoyaltyRecord};

const CUSTOMER_COLUMNS: &str = r#"
    id, email, name, phone, reward_tier,
    total_lifetime_spend_cents, total_hats_ordered, has_setup_fee_paid,
    created_at, updated_at
"#;

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Finds a customer by email.
    ///
    /// Malformed emails can't match a stored row, so they return `None`
    /// instead of an error.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<Customer>> {
        let Ok(email) = validate_email(email) else {
            debug!("Lookup with malformed email, treating as unknown");
            return Ok(None);
        };

        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE email = ?1"
        ))
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        debug!(email = %email, found = customer.is_some(), "Customer lookup");
        Ok(customer)
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// The loyalty view the pricing engine consumes.
    ///
    /// Unknown emails get the new-customer record: Bronze, zero spend,
    /// no setup fee paid.
    pub async fn loyalty_record(&self, email: &str) -> DbResult<CustomerLoyaltyRecord> {
        let record = match self.find_by_email(email).await? {
            Some(customer) => customer.loyalty_record(),
            None => CustomerLoyaltyRecord::new_customer(
                validate_email(email).unwrap_or_else(|_| email.trim().to_lowercase()),
            ),
        };
        Ok(record)
    }

    /// Number of customers (diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
