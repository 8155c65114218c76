//! # Order Commands
//!
//! Order lookups for the success page and status changes for fulfilment.

use tracing::info;

use crate::error::ApiError;
use crate::state::DbState;
use hatshop_core::{OrderStatus, PersistedOrder};

/// Gets the order created for a checkout session (success page).
///
/// `NOT_FOUND` until the confirmation webhook has been processed.
pub async fn get_order_by_session(db: &DbState, session_id: &str) -> Result<PersistedOrder, ApiError> {
    db.inner()
        .orders()
        .get_by_session_id(session_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order for session", session_id))
}

/// Moves an order along its lifecycle.
///
/// ```text
/// pending ─► paid ─► processing ─► shipped ─► delivered
///    │         │          │
///    └─────────┴──────────┴──► cancelled
/// ```
pub async fn update_order_status(
    db: &DbState,
    order_id: &str,
    status: OrderStatus,
) -> Result<PersistedOrder, ApiError> {
    let order = db.inner().orders().update_status(order_id, status).await?;
    info!(order_number = %order.order_number, status = ?order.status, "Order status changed");
    Ok(order)
}
