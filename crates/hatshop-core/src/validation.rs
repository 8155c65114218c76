//! # Validation Module
//!
//! Input validation utilities for the Hat Shop storefront.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend (TypeScript)                                        │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate shopper feedback                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Cart store / checkout (Rust)                                 │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE(payment_session_id), UNIQUE(email)                         │
//! │                                                                         │
//! │  The pricing engine sits AFTER layer 2 and trusts its inputs.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use hatshop_core::validation::{validate_item_id, validate_quantity};
//!
//! validate_item_id("RICH-112-BLK").unwrap();
//! validate_quantity(24).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_UNIT_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of the free-text instructions field.
pub const MAX_SPECIAL_INSTRUCTIONS: usize = 1000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a cart item id (catalog SKU/variant key).
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
/// - Letters, numbers, hyphens, underscores and dots only
///
/// ## Example
/// ```rust
/// use hatshop_core::validation::validate_item_id;
///
/// assert!(validate_item_id("RICH-112-BLK").is_ok());
/// assert!(validate_item_id("").is_err());
/// assert!(validate_item_id("has space").is_err());
/// ```
pub fn validate_item_id(id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    if id.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "id".to_string(),
            max: 100,
        });
    }

    if !id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ValidationError::InvalidFormat {
            field: "id".to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores, and dots"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a hat display name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates and normalizes a customer email.
///
/// ## Rules
/// - Must not be empty, at most 254 characters
/// - Exactly one `@`, non-empty local part, a dotted domain
/// - No whitespace
///
/// ## Returns
/// The trimmed, lowercased email. Customers are keyed on this form.
///
/// ## Example
/// ```rust
/// use hatshop_core::validation::validate_email;
///
/// assert_eq!(validate_email(" Jo@Example.com ").unwrap(), "jo@example.com");
/// assert!(validate_email("jo@localhost").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("missing @"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must have exactly one @ after a name"));
    }

    let domain_ok = domain
        .split('.')
        .all(|label| !label.is_empty())
        && domain.contains('.');
    if !domain_ok {
        return Err(invalid("domain must look like example.com"));
    }

    Ok(email.to_lowercase())
}

/// Validates the free-text special instructions.
pub fn validate_special_instructions(text: &str) -> ValidationResult<()> {
    if text.chars().count() > MAX_SPECIAL_INSTRUCTIONS {
        return Err(ValidationError::TooLong {
            field: "special_instructions".to_string(),
            max: MAX_SPECIAL_INSTRUCTIONS,
        });
    }

    Ok(())
}

/// Validates a payment-gateway session identifier.
///
/// ## Rules
/// - Must not be empty
/// - At most 255 characters, no whitespace
pub fn validate_session_id(session_id: &str) -> ValidationResult<()> {
    if session_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "session_id".to_string(),
        });
    }

    if session_id.len() > 255 {
        return Err(ValidationError::TooLong {
            field: "session_id".to_string(),
            max: 255,
        });
    }

    if session_id.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "session_id".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (5000)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Hat selection: quantity stepper                                        │
/// │                                                                         │
/// │  Shopper enters quantity: 24                                           │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(24) ← THIS FUNCTION                                 │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error (0 is handled as "remove" by the cart)     │
/// │       │                                                                 │
/// │       ├── qty > 5000? → Error: out of range                            │
/// │       │                                                                 │
/// │       └── OK → cart store applies the change                           │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (promotional blanks)
/// - At most MAX_UNIT_PRICE_CENTS, so line and cart totals stay inside i64
///
/// ## Example
/// ```rust
/// use hatshop_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1599).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// assert!(validate_price_cents(i64::MAX).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "unit_price".to_string(),
        });
    }

    if cents > MAX_UNIT_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "unit_price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more distinct line fits in the cart.
///
/// ## Rules
/// - Must not exceed MAX_CART_ITEMS (100)
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
