//! # Validation Module
//!
//! Input validation for orders and the catalog snapshots they carry.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Transport adapter                                            │
//! │  └── Deserialization, path/query parsing                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: cafe-service                                                 │
//! │  ├── Catalog validator (pluggable, defaults to these rules)            │
//! │  └── THIS MODULE: order shape, quantities, ids, paging                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  └── NOT NULL / CHECK constraints                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cafe_core::validation::{validate_quantity, validate_reference};
//!
//! assert!(validate_quantity(2).is_ok());
//! assert!(validate_reference("table_id", "").is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{CatalogItemSnapshot, OrderItem, PageRequest};
use crate::money::Money;
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Checks that a trimmed string's length is within `[min, max]`.
fn validate_length(field: &str, value: &str, min: usize, max: usize) -> ValidationResult<()> {
    let len = value.trim().chars().count();

    if len == 0 {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if len < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }

    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an opaque reference (table id, staff id, catalog id).
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
pub fn validate_reference(field: &str, value: &str) -> ValidationResult<()> {
    validate_length(field, value, 1, 64)
}

/// Validates an order id.
///
/// Order ids are generated as UUID v4.
///
/// ## Example
/// ```rust
/// use cafe_core::validation::validate_order_id;
///
/// assert!(validate_order_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_order_id("not-a-uuid").is_err());
/// ```
pub fn validate_order_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "order_id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "order_id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
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

/// Validates a catalog price in cents. Menu items are never free.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 1,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

// =============================================================================
// Catalog Snapshot
// =============================================================================

/// Validates the fields of a catalog item snapshot.
///
/// ## Rules
/// | Field       | Rule             |
/// |-------------|------------------|
/// | id          | required         |
/// | name        | 2–100 characters |
/// | description | 5–500 characters |
/// | price       | 1–10,000,000 ¢   |
/// | category    | 2–100 characters |
/// | image       | required         |
pub fn validate_catalog_item(item: &CatalogItemSnapshot) -> ValidationResult<()> {
    validate_reference("id", &item.id)?;
    validate_length("name", &item.name, 2, 100)?;
    validate_length("description", &item.description, 5, 500)?;
    validate_price_cents(item.price_cents)?;
    validate_length("category", &item.category, 2, 100)?;
    validate_length("image", &item.image, 1, 255)?;
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the shape of an order's item list: non-empty, bounded, and
/// every quantity in range. Catalog fields are checked separately by the
/// catalog validator.
pub fn validate_order_items(items: &[OrderItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if items.len() > MAX_ORDER_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_ITEMS as i64,
        });
    }

    for (index, line) in items.iter().enumerate() {
        validate_quantity(line.quantity).map_err(|e| e.for_item(index, &line.item.name))?;
    }

    validate_order_total(items)
}

/// Checks that the order total is representable whatever catalog validator
/// is plugged in.
fn validate_order_total(items: &[OrderItem]) -> ValidationResult<()> {
    let overflow = || ValidationError::OutOfRange {
        field: "total".to_string(),
        min: 0,
        max: i64::MAX,
    };

    items.iter().try_fold(Money::zero(), |total, line| {
        let line_total = line
            .item
            .price()
            .checked_multiply_quantity(line.quantity)
            .ok_or_else(overflow)?;
        total.checked_add(line_total).ok_or_else(overflow)
    })?;

    Ok(())
}

/// Validates a listing page request.
pub fn validate_page(page: PageRequest) -> ValidationResult<()> {
    if page.page == 0 {
        return Err(ValidationError::MustBePositive {
            field: "page".to_string(),
        });
    }

    if page.limit == 0 || page.limit > PageRequest::MAX_LIMIT {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: i64::from(PageRequest::MAX_LIMIT),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> CatalogItemSnapshot {
        CatalogItemSnapshot {
            id: "item-1".to_string(),
            name: "Cappuccino".to_string(),
            description: "Espresso with foamed milk".to_string(),
            price_cents: 420,
            category: "Coffee".to_string(),
            image: "img/cappuccino.png".to_string(),
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_catalog_item() {
        assert!(validate_catalog_item(&snapshot()).is_ok());

        let mut item = snapshot();
        item.name = "C".to_string();
        assert_eq!(validate_catalog_item(&item).unwrap_err().field(), "name");

        let mut item = snapshot();
        item.description = "Nice".to_string();
        assert_eq!(validate_catalog_item(&item).unwrap_err().field(), "description");

        let mut item = snapshot();
        item.price_cents = 0;
        assert_eq!(validate_catalog_item(&item).unwrap_err().field(), "price");

        let mut item = snapshot();
        item.image = "   ".to_string();
        assert_eq!(validate_catalog_item(&item).unwrap_err().field(), "image");
    }

    #[test]
    fn test_validate_order_items() {
        assert!(matches!(
            validate_order_items(&[]),
            Err(ValidationError::Required { .. })
        ));

        let ok = vec![OrderItem::new(snapshot(), 2)];
        assert!(validate_order_items(&ok).is_ok());

        let bad = vec![OrderItem::new(snapshot(), 1), OrderItem::new(snapshot(), 0)];
        let err = validate_order_items(&bad).unwrap_err();
        assert!(matches!(err, ValidationError::Item { index: 1, .. }));
        assert_eq!(err.field(), "quantity");
    }

    #[test]
    fn test_price_is_bounded() {
        assert!(validate_price_cents(MAX_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price_cents(MAX_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_unrepresentable_total_is_rejected() {
        let mut item = snapshot();
        item.price_cents = i64::MAX / 2;
        let lines = vec![OrderItem::new(item, 3)];

        let err = validate_order_items(&lines).unwrap_err();
        assert_eq!(err.field(), "total");
    }

    #[test]
    fn test_validate_order_id() {
        assert!(validate_order_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_order_id("").is_err());
        assert!(validate_order_id("123").is_err());
    }

    #[test]
    fn test_validate_page() {
        assert!(validate_page(PageRequest::default()).is_ok());
        assert!(validate_page(PageRequest::new(0, 20)).is_err());
        assert!(validate_page(PageRequest::new(1, 0)).is_err());
        assert!(validate_page(PageRequest::new(1, 101)).is_err());
    }
}
