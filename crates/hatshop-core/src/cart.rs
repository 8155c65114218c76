//! # Cart Module
//!
//! The order-builder session state as an immutable-update store.
//!
//! ## Reducer Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Cart (state n) ──► apply(CartAction) ──► Ok(Cart (state n+1))         │
//! │        │                    │                                           │
//! │        │                    └──► Err(CoreError)  state n unchanged      │
//! │        ▼                                                                │
//! │   PricingEngine::price_cart(&cart, loyalty) ──► OrderTotals             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `apply` never mutates `self`. The session layer swaps the returned value
//! in, so a rejected action leaves the previous state exactly as it was.
//!
//! ## Invariants
//! - Lines are unique by `id` (adding the same hat again merges quantities)
//! - Every stored quantity is ≥ 1 (setting 0 removes the line)
//! - At most `MAX_CART_ITEMS` lines, each at most `MAX_ITEM_QUANTITY`

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CartLineItem, EmbroideryOptions, EmbroideryType, ExtraLocation, FrontLocation};
use crate::validation::{
    validate_cart_size, validate_item_id, validate_item_name, validate_price_cents,
    validate_quantity, validate_special_instructions,
};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Actions
// =============================================================================

/// Everything the shopper can do to the order in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum CartAction {
    AddItem {
        id: String,
        name: String,
        unit_price: Money,
        quantity: i64,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        color: Option<String>,
    },
    UpdateQuantity {
        id: String,
        quantity: i64,
    },
    RemoveItem {
        id: String,
    },
    SetEmbroideryType(EmbroideryType),
    SetFrontLocation(FrontLocation),
    ToggleExtraLocation(ExtraLocation),
    SetExtraLocations(Vec<ExtraLocation>),
    ConfirmArtworkRights(bool),
    /// `Some(file)` when a fresh artwork file was uploaded this session.
    AttachArtwork(Option<String>),
    SetSpecialInstructions(String),
    Clear,
}

// =============================================================================
// Cart
// =============================================================================

/// The shopper's order in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<CartLineItem>,
    embroidery: EmbroideryOptions,
    artwork_file_name: Option<String>,
    special_instructions: String,
}

impl Cart {
    /// Creates a new empty cart with default embroidery options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next state, leaving `self` untouched.
    pub fn apply(&self, action: CartAction) -> CoreResult<Cart> {
        let mut next = self.clone();
        match action {
            CartAction::AddItem {
                id,
                name,
                unit_price,
                quantity,
                model,
                color,
            } => next.add_item(CartLineItem {
                id,
                name,
                unit_price,
                quantity,
                model,
                color,
            })?,
            CartAction::UpdateQuantity { id, quantity } => next.update_quantity(&id, quantity)?,
            CartAction::RemoveItem { id } => next.remove_item(&id)?,
            CartAction::SetEmbroideryType(embroidery_type) => {
                next.embroidery.embroidery_type = embroidery_type;
            }
            CartAction::SetFrontLocation(location) => {
                next.embroidery.front_location = location;
            }
            CartAction::ToggleExtraLocation(location) => {
                if !next.embroidery.extra_locations.remove(&location) {
                    next.embroidery.extra_locations.insert(location);
                }
            }
            CartAction::SetExtraLocations(locations) => {
                next.embroidery.extra_locations = locations.into_iter().collect();
            }
            CartAction::ConfirmArtworkRights(confirmed) => {
                next.embroidery.artwork_rights_confirmed = confirmed;
            }
            CartAction::AttachArtwork(file_name) => {
                next.artwork_file_name = match file_name {
                    Some(name) if name.trim().is_empty() => {
                        return Err(ValidationError::Required {
                            field: "artwork_file_name".to_string(),
                        }
                        .into())
                    }
                    other => other,
                };
            }
            CartAction::SetSpecialInstructions(text) => {
                validate_special_instructions(&text)?;
                next.special_instructions = text;
            }
            CartAction::Clear => next = Cart::new(),
        }
        Ok(next)
    }

    fn add_item(&mut self, item: CartLineItem) -> CoreResult<()> {
        validate_item_id(&item.id)?;
        validate_item_name(&item.name)?;
        validate_price_cents(item.unit_price.cents())?;
        validate_quantity(item.quantity)?;

        if let Some(line) = self.items.iter_mut().find(|l| l.id == item.id) {
            let merged = line.quantity + item.quantity;
            if merged > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: merged,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            line.quantity = merged;
            return Ok(());
        }

        validate_cart_size(self.items.len()).map_err(|_| CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        })?;

        self.items.push(CartLineItem {
            name: item.name.trim().to_string(),
            model: trimmed(item.model),
            color: trimmed(item.color),
            ..item
        });
        Ok(())
    }

    fn update_quantity(&mut self, id: &str, quantity: i64) -> CoreResult<()> {
        if quantity < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "quantity".to_string(),
            }
            .into());
        }
        if quantity == 0 {
            return self.remove_item(id);
        }
        validate_quantity(quantity)?;

        let line = self
            .items
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| CoreError::ItemNotInCart(id.to_string()))?;
        line.quantity = quantity;
        Ok(())
    }

    fn remove_item(&mut self, id: &str) -> CoreResult<()> {
        let before = self.items.len();
        self.items.retain(|l| l.id != id);
        if self.items.len() == before {
            return Err(CoreError::ItemNotInCart(id.to_string()));
        }
        Ok(())
    }

    // ===== Read access =====

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn embroidery(&self) -> &EmbroideryOptions {
        &self.embroidery
    }

    pub fn artwork_file_name(&self) -> Option<&str> {
        self.artwork_file_name.as_deref()
    }

    pub fn special_instructions(&self) -> &str {
        &self.special_instructions
    }

    /// Whether a fresh artwork file was attached this session.
    pub fn has_new_artwork_upload(&self) -> bool {
        self.artwork_file_name.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of quantities across lines.
    pub fn total_hats(&self) -> i64 {
        self.items.iter().map(|l| l.quantity).sum()
    }
}

/// Blank style labels are dropped rather than stored.
fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn add(id: &str, cents: i64, quantity: i64) -> CartAction {
        CartAction::AddItem {
            id: id.to_string(),
            name: format!("Hat {id}"),
            unit_price: Money::from_cents(cents),
            quantity,
            model: None,
            color: None,
        }
    }

    #[test]
    fn test_add_item() {
        let cart = Cart::new().apply(add("RICH-112", 1500, 2)).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_hats(), 2);
    }

    #[test]
    fn test_add_same_item_merges_quantity() {
        let cart = Cart::new()
            .apply(add("RICH-112", 1500, 2))
            .unwrap()
            .apply(add("RICH-112", 1500, 3))
            .unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_hats(), 5);
    }

    #[test]
    fn test_apply_does_not_mutate_previous_state() {
        let before = Cart::new().apply(add("A", 1000, 1)).unwrap();
        let after = before.apply(add("B", 1000, 1)).unwrap();
        assert_eq!(before.item_count(), 1);
        assert_eq!(after.item_count(), 2);
    }

    #[test]
    fn test_rejected_action_keeps_state() {
        let cart = Cart::new().apply(add("A", 1000, 1)).unwrap();
        let err = cart.apply(add("A", 1000, MAX_ITEM_QUANTITY)).unwrap_err();
        assert!(matches!(err, CoreError::QuantityTooLarge { .. }));
        assert_eq!(cart.total_hats(), 1);
    }

    #[test]
    fn test_add_rejects_bad_input() {
        assert!(Cart::new().apply(add("A", 1000, 0)).is_err());
        assert!(Cart::new().apply(add("A", 1000, -2)).is_err());
        assert!(Cart::new().apply(add("A", -1, 1)).is_err());
        assert!(Cart::new().apply(add("bad id", 1000, 1)).is_err());
    }

    #[test]
    fn test_quantity_and_price_bounds() {
        let too_many = Cart::new().apply(add("A", 1000, MAX_ITEM_QUANTITY + 1));
        assert!(matches!(
            too_many,
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(Cart::new().apply(add("A", 1000, MAX_ITEM_QUANTITY)).is_ok());

        let huge_price = Cart::new().apply(add("A", i64::MAX / 2, 1));
        assert!(matches!(
            huge_price,
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let cart = Cart::new().apply(add("A", 1000, 1)).unwrap();
        let set_too_many = cart.apply(CartAction::UpdateQuantity {
            id: "A".to_string(),
            quantity: MAX_ITEM_QUANTITY + 1,
        });
        assert!(matches!(
            set_too_many,
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_add_item_keeps_style() {
        let cart = Cart::new()
            .apply(CartAction::AddItem {
                id: "RICH-112-BLK".to_string(),
                name: " Richardson 112 ".to_string(),
                unit_price: Money::from_cents(1500),
                quantity: 12,
                model: Some("Richardson 112".to_string()),
                color: Some("  ".to_string()),
            })
            .unwrap();
        let line = &cart.items()[0];
        assert_eq!(line.name, "Richardson 112");
        assert_eq!(line.model.as_deref(), Some("Richardson 112"));
        assert_eq!(line.color, None);

        let legacy: CartAction = serde_json::from_str(
            r#"{"type":"add_item","payload":{"id":"A","name":"Hat","unit_price":1500,"quantity":1}}"#,
        )
        .unwrap();
        assert!(matches!(legacy, CartAction::AddItem { model: None, .. }));
    }

    #[test]
    fn test_cart_size_limit() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_ITEMS {
            cart = cart.apply(add(&format!("SKU-{i}"), 100, 1)).unwrap();
        }
        let err = cart.apply(add("ONE-MORE", 100, 1)).unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { .. }));
    }

    #[test]
    fn test_update_quantity_zero_removes_line() {
        let cart = Cart::new()
            .apply(add("A", 1000, 4))
            .unwrap()
            .apply(CartAction::UpdateQuantity {
                id: "A".to_string(),
                quantity: 0,
            })
            .unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_rejects_negative_and_unknown() {
        let cart = Cart::new().apply(add("A", 1000, 4)).unwrap();

        let negative = cart.apply(CartAction::UpdateQuantity {
            id: "A".to_string(),
            quantity: -1,
        });
        assert!(matches!(negative, Err(CoreError::Validation(_))));

        let unknown = cart.apply(CartAction::UpdateQuantity {
            id: "B".to_string(),
            quantity: 2,
        });
        assert!(matches!(unknown, Err(CoreError::ItemNotInCart(_))));

        let updated = cart
            .apply(CartAction::UpdateQuantity {
                id: "A".to_string(),
                quantity: 24,
            })
            .unwrap();
        assert_eq!(updated.total_hats(), 24);
    }

    #[test]
    fn test_remove_item() {
        let cart = Cart::new().apply(add("A", 1000, 1)).unwrap();
        let empty = cart
            .apply(CartAction::RemoveItem {
                id: "A".to_string(),
            })
            .unwrap();
        assert!(empty.is_empty());
        assert!(empty
            .apply(CartAction::RemoveItem {
                id: "A".to_string()
            })
            .is_err());
    }

    #[test]
    fn test_embroidery_actions() {
        let cart = Cart::new()
            .apply(CartAction::SetEmbroideryType(EmbroideryType::Puff))
            .unwrap()
            .apply(CartAction::SetFrontLocation(FrontLocation::FrontLeft))
            .unwrap()
            .apply(CartAction::ToggleExtraLocation(ExtraLocation::Back))
            .unwrap()
            .apply(CartAction::ToggleExtraLocation(ExtraLocation::LeftSide))
            .unwrap()
            .apply(CartAction::ToggleExtraLocation(ExtraLocation::Back))
            .unwrap()
            .apply(CartAction::ConfirmArtworkRights(true))
            .unwrap();

        let e = cart.embroidery();
        assert_eq!(e.embroidery_type, EmbroideryType::Puff);
        assert_eq!(e.front_location, FrontLocation::FrontLeft);
        assert_eq!(e.extra_locations.len(), 1);
        assert!(e.extra_locations.contains(&ExtraLocation::LeftSide));
        assert!(e.artwork_rights_confirmed);

        let replaced = cart
            .apply(CartAction::SetExtraLocations(vec![
                ExtraLocation::Back,
                ExtraLocation::Back,
                ExtraLocation::RightSide,
            ]))
            .unwrap();
        assert_eq!(replaced.embroidery().extra_location_count(), 2);
    }

    #[test]
    fn test_artwork_upload_flag() {
        let cart = Cart::new();
        assert!(!cart.has_new_artwork_upload());

        let uploaded = cart
            .apply(CartAction::AttachArtwork(Some("logo.png".to_string())))
            .unwrap();
        assert!(uploaded.has_new_artwork_upload());
        assert_eq!(uploaded.artwork_file_name(), Some("logo.png"));

        let detached = uploaded.apply(CartAction::AttachArtwork(None)).unwrap();
        assert!(!detached.has_new_artwork_upload());

        assert!(cart
            .apply(CartAction::AttachArtwork(Some("  ".to_string())))
            .is_err());
    }

    #[test]
    fn test_clear_resets_everything() {
        let cart = Cart::new()
            .apply(add("A", 1000, 3))
            .unwrap()
            .apply(CartAction::SetSpecialInstructions("Gold thread".to_string()))
            .unwrap()
            .apply(CartAction::Clear)
            .unwrap();
        assert_eq!(cart, Cart::new());
    }

    #[test]
    fn test_action_wire_format() {
        let json = r#"{"type":"update_quantity","payload":{"id":"A","quantity":3}}"#;
        let action: CartAction = serde_json::from_str(json).unwrap();
        assert_eq!(
            action,
            CartAction::UpdateQuantity {
                id: "A".to_string(),
                quantity: 3
            }
        );

        let toggle: CartAction =
            serde_json::from_str(r#"{"type":"toggle_extra_location","payload":"right-side"}"#)
                .unwrap();
        assert_eq!(toggle, CartAction::ToggleExtraLocation(ExtraLocation::RightSide));

        let clear: CartAction = serde_json::from_str(r#"{"type":"clear"}"#).unwrap();
        assert_eq!(clear, CartAction::Clear);
    }
}
