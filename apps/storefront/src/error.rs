//! # API Error Type
//!
//! Unified error type for storefront commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Storefront                         │
//! │                                                                         │
//! │  Command Function  →  Result<T, ApiError>                               │
//! │         │                                                               │
//! │         ├── CoreError   (cart rules, checkout decomposition)            │
//! │         ├── DbError     (customer / order persistence)                  │
//! │         ├── GatewayError (payment session creation)                     │
//! │         └── ConfigError (startup only)                                  │
//! │                         │                                               │
//! │                         ▼                                               │
//! │  { "code": "PAYMENT_ERROR", "message": "...", "retryable": true }       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `retryable` tells the caller whether the same request may succeed later
//! (gateway hiccups, a busy pool) or needs the input fixed first.

use serde::Serialize;

use crate::commands::checkout::GatewayError;
use crate::state::ConfigError;
use hatshop_core::CoreError;
use hatshop_db::DbError;

/// API error returned from storefront commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "CART_ERROR",
///   "message": "Item not in cart: trucker-01",
///   "retryable": false
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Whether retrying the same request could succeed
    pub retryable: bool,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Database operation failed (500)
    DatabaseError,

    /// Business rule refused the request (422)
    BusinessLogic,

    /// Cart operation failed
    CartError,

    /// Payment gateway or checkout total problem
    PaymentError,

    /// Store configuration is unusable
    ConfigError,

    /// Internal server error (500)
    Internal,
}

impl ApiError {
    /// Creates a new, non-retryable API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            retryable: false,
        }
    }

    /// Marks the error as retryable.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        let transient = err.is_transient();
        let api = match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::InvalidStatusTransition { id, from, to } => ApiError::new(
                ErrorCode::BusinessLogic,
                format!("Order {} cannot move from {:?} to {:?}", id, from, to),
            ),
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Serialization(e) => {
                tracing::error!("Stored order data unreadable: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Stored data is corrupt")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        };

        if transient {
            api.retryable()
        } else {
            api
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ItemNotInCart(id) => {
                ApiError::new(ErrorCode::CartError, format!("Item not in cart: {}", id))
            }
            CoreError::CartTooLarge { max } => ApiError::new(
                ErrorCode::CartError,
                format!("Cart cannot have more than {} items", max),
            ),
            CoreError::QuantityTooLarge { requested, max } => ApiError::new(
                ErrorCode::ValidationError,
                format!("Quantity {} exceeds maximum allowed ({})", requested, max),
            ),
            CoreError::EmptyCart => ApiError::new(ErrorCode::CartError, err.to_string()),
            CoreError::ArtworkRightsNotConfirmed => {
                ApiError::new(ErrorCode::BusinessLogic, err.to_string())
            }
            CoreError::TotalMismatch { .. } => {
                tracing::error!("{}", err);
                ApiError::new(ErrorCode::PaymentError, "Checkout total could not be reconciled")
            }
            CoreError::NothingToCharge { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, err.to_string())
            }
            CoreError::InvalidMetadata { reason } => {
                ApiError::validation(format!("Invalid order metadata: {}", reason))
            }
            CoreError::InvalidConfig { reason } => ApiError::new(
                ErrorCode::ConfigError,
                format!("Pricing is not configured: {}", reason),
            ),
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

/// Gateway failures never mean the cart is wrong, so they are retryable.
impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        tracing::warn!(error = %err, "Payment gateway call failed");
        ApiError::new(ErrorCode::PaymentError, err.to_string()).retryable()
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Pricing(core) => ApiError::from(core),
            other => ApiError::new(ErrorCode::ConfigError, other.to_string()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
