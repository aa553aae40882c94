//! Consolidated bill of a table.

use tracing::debug;

use cafe_core::bill::merge_table_orders;
use cafe_core::validation::validate_reference;
use cafe_core::OrderTotal;
use cafe_db::Database;

use crate::context::RequestContext;
use crate::error::ServiceResult;

/// Read-side view merging a table's unclosed orders into one bill.
#[derive(Debug, Clone)]
pub struct TableOrderAggregator {
    db: Database,
}

impl TableOrderAggregator {
    pub fn new(db: Database) -> Self {
        TableOrderAggregator { db }
    }

    /// Merged items and total of every open or served order of `table_id`.
    ///
    /// A table without such orders yields an empty, zero-priced bill.
    pub async fn active_total(&self, ctx: &RequestContext, table_id: &str) -> ServiceResult<OrderTotal> {
        validate_reference("table_id", table_id)?;

        let orders = ctx
            .run("orders.active_for_table", self.db.orders().active_for_table(table_id))
            .await?;
        let bill = merge_table_orders(table_id, &orders);

        debug!(
            table_id,
            orders = orders.len(),
            lines = bill.items.len(),
            total_cents = bill.total_price_cents,
            "Active total computed"
        );
        Ok(bill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{KnownTables, SnapshotValidator};
    use crate::lifecycle::{CloseScope, OrderLifecycle};
    use crate::notify::NotificationHub;
    use cafe_core::{CatalogItemSnapshot, OrderItem};
    use cafe_db::DbConfig;
    use std::sync::Arc;

    fn item(id: &str, price_cents: i64, quantity: i64) -> OrderItem {
        OrderItem::new(
            CatalogItemSnapshot {
                id: id.to_string(),
                name: format!("Item {id}"),
                description: "House special".to_string(),
                price_cents,
                category: "Bakery".to_string(),
                image: format!("img/{id}.png"),
            },
            quantity,
        )
    }

    #[tokio::test]
    async fn test_active_total_merges_open_and_served() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let lifecycle = OrderLifecycle::new(
            db.clone(),
            Arc::new(SnapshotValidator),
            Arc::new(KnownTables::new(["t1", "t2"])),
            Arc::new(NotificationHub::default()),
        );
        let aggregator = TableOrderAggregator::new(db);
        let ctx = RequestContext::default();

        let first = lifecycle
            .create(&ctx, "t1", vec![item("croissant", 350, 2), item("latte", 450, 1)])
            .await
            .unwrap();
        lifecycle
            .create(&ctx, "t1", vec![item("latte", 450, 2)])
            .await
            .unwrap();
        lifecycle
            .create(&ctx, "t2", vec![item("latte", 450, 5)])
            .await
            .unwrap();
        lifecycle.serve(&ctx, &first.id, "w1").await.unwrap();

        let bill = aggregator.active_total(&ctx, "t1").await.unwrap();
        let mut lines: Vec<(&str, i64)> = bill
            .items
            .iter()
            .map(|l| (l.item.id.as_str(), l.quantity))
            .collect();
        lines.sort();
        assert_eq!(lines, vec![("croissant", 2), ("latte", 3)]);
        assert_eq!(bill.total_price_cents, 2 * 350 + 3 * 450);

        lifecycle
            .close(&ctx, &CloseScope::Order(first.id.clone()), "c1")
            .await
            .unwrap();
        let bill = aggregator.active_total(&ctx, "t1").await.unwrap();
        assert_eq!(bill.total_price_cents, 2 * 450);
    }

    #[tokio::test]
    async fn test_empty_table_is_zero() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let aggregator = TableOrderAggregator::new(db);

        let bill = aggregator
            .active_total(&RequestContext::default(), "t7")
            .await
            .unwrap();
        assert!(bill.items.is_empty());
        assert_eq!(bill.total_price_cents, 0);
    }
}
