//! # Loyalty Lookup State
//!
//! Resolves the shopper's loyalty record from their email while they edit
//! the cart, without ever holding pricing hostage to the lookup.
//!
//! ## Last Ticket Wins
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Overlapping Lookups                                  │
//! │                                                                         │
//! │  typing "jo@ex"       ── ticket 1 ──► directory ......... slow reply   │
//! │  typing "jo@ex.com"   ── ticket 2 ──► directory ── reply ─┐            │
//! │                                                            ▼            │
//! │                                          latest == 2 → APPLIED          │
//! │                                                                         │
//! │  ticket 1 reply arrives ───────────────► latest == 2 → DISCARDED       │
//! │                                                                         │
//! │  Timeout or directory error ─► new-customer record (Bronze, no fee)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use hatshop_core::CustomerLoyaltyRecord;
use hatshop_db::{CustomerRepository, DbResult};

// =============================================================================
// Customer Directory
// =============================================================================

/// Where loyalty records come from.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// `None` means the email has never completed an order.
    async fn find_by_email(&self, email: &str) -> DbResult<Option<CustomerLoyaltyRecord>>;
}

#[async_trait]
impl CustomerDirectory for CustomerRepository {
    async fn find_by_email(&self, email: &str) -> DbResult<Option<CustomerLoyaltyRecord>> {
        let customer = CustomerRepository::find_by_email(self, email).await?;
        Ok(customer.map(|c| c.loyalty_record()))
    }
}

// =============================================================================
// Lookup Coordinator
// =============================================================================

/// Result of one lookup call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "record", rename_all = "snake_case")]
pub enum LookupOutcome {
    /// This lookup was the latest; its record is now current.
    Applied(CustomerLoyaltyRecord),
    /// A newer lookup started while this one was in flight.
    Superseded,
}

/// Session loyalty state.
pub struct LoyaltyState {
    directory: Arc<dyn CustomerDirectory>,
    timeout: Duration,
    latest_ticket: AtomicU64,
    current: Mutex<Option<CustomerLoyaltyRecord>>,
}

impl std::fmt::Debug for LoyaltyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoyaltyState")
            .field("timeout", &self.timeout)
            .field("latest_ticket", &self.latest_ticket.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl LoyaltyState {
    pub fn new(directory: Arc<dyn CustomerDirectory>, timeout: Duration) -> Self {
        LoyaltyState {
            directory,
            timeout,
            latest_ticket: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    /// Looks up `email` and makes it current unless a newer lookup started.
    ///
    /// Never fails: a slow or broken directory yields the new-customer
    /// record so the cart can still be priced.
    pub async fn lookup(&self, email: &str) -> LookupOutcome {
        let ticket = self.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let normalized = email.trim().to_lowercase();

        let record = match tokio::time::timeout(self.timeout, self.directory.find_by_email(&normalized)).await {
            Ok(Ok(Some(record))) => record,
            Ok(Ok(None)) => CustomerLoyaltyRecord::new_customer(normalized.as_str()),
            Ok(Err(e)) => {
                warn!(ticket, error = %e, "Customer lookup failed, pricing as new customer");
                CustomerLoyaltyRecord::new_customer(normalized.as_str())
            }
            Err(_) => {
                warn!(
                    ticket,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Customer lookup timed out, pricing as new customer"
                );
                CustomerLoyaltyRecord::new_customer(normalized.as_str())
            }
        };

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if self.latest_ticket.load(Ordering::SeqCst) != ticket {
            debug!(ticket, "Discarding superseded customer lookup");
            return LookupOutcome::Superseded;
        }

        debug!(ticket, tier = %record.reward_tier, "Customer lookup applied");
        *current = Some(record.clone());
        LookupOutcome::Applied(record)
    }

    /// The record of the latest applied lookup.
    pub fn current(&self) -> Option<CustomerLoyaltyRecord> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current record if it belongs to `email`.
    pub fn current_for(&self, email: &str) -> Option<CustomerLoyaltyRecord> {
        let email = email.trim().to_lowercase();
        self.current().filter(|record| record.email == email)
    }

    /// Forgets the current record. In-flight lookups are superseded.
    pub fn reset(&self) {
        self.latest_ticket.fetch_add(1, Ordering::SeqCst);
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
