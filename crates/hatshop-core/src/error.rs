//! # Error Types
//!
//! Domain-specific error types for hatshop-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  hatshop-core errors (this file)                                       │
//! │  ├── CoreError        - Cart, checkout and configuration failures      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  hatshop-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Storefront API errors (in app)                                        │
//! │  └── ApiError         - What the frontend sees (serialized)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Frontend     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Note on the Pricing Engine
//! The pricing engine itself never returns an error. Everything that can go
//! wrong is rejected earlier (cart store, config loading) or later
//! (checkout submission).

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Cart line cannot be found.
    ///
    /// ## When This Occurs
    /// - Quantity update for a hat variant that was never added
    /// - Removing a line twice (double click on the remove button)
    #[error("Item not in cart: {0}")]
    ItemNotInCart(String),

    /// Cart has exceeded maximum allowed distinct lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Checkout was attempted with nothing in the cart.
    #[error("Cannot check out an empty cart")]
    EmptyCart,

    /// The shopper has not confirmed they own the rights to the artwork.
    #[error("Artwork rights must be confirmed before checkout")]
    ArtworkRightsNotConfirmed,

    /// Checkout line items do not reproduce the computed order total.
    ///
    /// ## When This Occurs
    /// ```text
    /// OrderTotals.order_total = $2,250.00
    ///      │
    ///      ▼
    /// Σ line items − session discount = $2,249.97
    ///      │
    ///      ▼
    /// |diff| > 1 cent → TotalMismatch, session is never created
    /// ```
    #[error("Checkout total {line_items_total} cents does not match order total {order_total} cents")]
    TotalMismatch {
        line_items_total: i64,
        order_total: i64,
    },

    /// The order prices to nothing, so there is no payment session to open.
    #[error("Nothing to charge: order total is {amount_total} cents")]
    NothingToCharge { amount_total: i64 },

    /// Payment-session metadata could not be decoded back into an order.
    #[error("Invalid order metadata: {reason}")]
    InvalidMetadata { reason: String },

    /// Pricing or tier configuration is malformed.
    ///
    /// ## When This Occurs
    /// - Step table empty, unsorted or not starting at 0 hats
    /// - Negative price in a table
    /// - Reward tier table not starting at Bronze / $0
    ///
    /// Startup halts; prices are never computed from a guessed table.
    #[error("Invalid pricing configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., malformed email, bad SKU characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::TotalMismatch {
            line_items_total: 224997,
            order_total: 225000,
        };
        assert_eq!(
            err.to_string(),
            "Checkout total 224997 cents does not match order total 225000 cents"
        );

        let err = CoreError::ItemNotInCart("RICH-112".to_string());
        assert_eq!(err.to_string(), "Item not in cart: RICH-112");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "email".to_string(),
        };
        assert_eq!(err.to_string(), "email is required");

        let err = ValidationError::MustNotBeNegative {
            field: "unit_price".to_string(),
        };
        assert_eq!(err.to_string(), "unit_price cannot be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
