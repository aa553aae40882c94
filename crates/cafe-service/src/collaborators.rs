//! # External Collaborators
//!
//! Interfaces to the systems this service depends on but does not own.
//!
//! ```text
//! ┌───────────────────┬──────────────────────────┬──────────────────────────┐
//! │ trait             │ question                 │ bundled implementation   │
//! ├───────────────────┼──────────────────────────┼──────────────────────────┤
//! │ CatalogValidator  │ is this snapshot valid?  │ SnapshotValidator        │
//! │ TableDirectory    │ does this table exist?   │ KnownTables              │
//! │ AccessPolicy      │ may caller read target?  │ cafe_core::SelfOrAdmin   │
//! │ NotificationSink  │ (publish, no answer)     │ NotificationHub          │
//! └───────────────────┴──────────────────────────┴──────────────────────────┘
//! ```

use std::collections::HashSet;

use async_trait::async_trait;

use cafe_core::validation::validate_catalog_item;
use cafe_core::{CatalogItemSnapshot, ValidationError};

use crate::error::ServiceResult;

// =============================================================================
// Catalog
// =============================================================================

/// Validates a catalog item snapshot before it is written into an order.
#[async_trait]
pub trait CatalogValidator: Send + Sync {
    async fn validate(&self, item: &CatalogItemSnapshot) -> Result<(), ValidationError>;
}

/// Checks snapshots against the menu field rules, without consulting a live
/// catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotValidator;

#[async_trait]
impl CatalogValidator for SnapshotValidator {
    async fn validate(&self, item: &CatalogItemSnapshot) -> Result<(), ValidationError> {
        validate_catalog_item(item)
    }
}

// =============================================================================
// Tables
// =============================================================================

/// Table registry existence check.
#[async_trait]
pub trait TableDirectory: Send + Sync {
    async fn exists(&self, table_id: &str) -> ServiceResult<bool>;
}

/// A fixed set of table ids.
#[derive(Debug, Clone, Default)]
pub struct KnownTables {
    tables: HashSet<String>,
}

impl KnownTables {
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KnownTables {
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl TableDirectory for KnownTables {
    async fn exists(&self, table_id: &str) -> ServiceResult<bool> {
        Ok(self.tables.contains(table_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_tables() {
        let tables = KnownTables::new(["t1", "t2"]);
        assert!(tables.exists("t1").await.unwrap());
        assert!(!tables.exists("t9").await.unwrap());
    }

    #[tokio::test]
    async fn test_snapshot_validator() {
        let mut item = CatalogItemSnapshot {
            id: "latte".to_string(),
            name: "Latte".to_string(),
            description: "Espresso and steamed milk".to_string(),
            price_cents: 450,
            category: "Coffee".to_string(),
            image: "img/latte.png".to_string(),
        };
        assert!(SnapshotValidator.validate(&item).await.is_ok());

        item.price_cents = -1;
        let err = SnapshotValidator.validate(&item).await.unwrap_err();
        assert_eq!(err.field(), "price");
    }
}
