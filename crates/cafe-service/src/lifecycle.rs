//! # Order Lifecycle
//!
//! Creates orders and drives their state transitions.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create ──► OPEN ──serve(staff)──► SERVED ──close(staff)──► CLOSED    │
//! │               │                       │                                 │
//! │               └──── update(items) ────┘        (terminal, immutable)    │
//! │                                                                         │
//! │   serve:  UPDATE ... WHERE id = ? AND served_at IS NULL                │
//! │   close:  UPDATE ... WHERE served_at IS NOT NULL AND closed_at IS NULL │
//! │   update: UPDATE ... WHERE id = ? AND closed_at IS NULL                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Classification
//! A transition statement that affects zero rows is followed by a read that
//! only decides the error kind: `NotFound` if the order is missing,
//! `Conflict` if its state forbids the transition. The read never decides
//! whether the write happens.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cafe_core::validation::{validate_order_id, validate_order_items, validate_page, validate_reference};
use cafe_core::{compute_total, CoreError, Order, OrderFilter, OrderItem, OrderPage, PageRequest};
use cafe_db::Database;

use crate::collaborators::{CatalogValidator, TableDirectory};
use crate::context::RequestContext;
use crate::error::{ServiceError, ServiceResult};
use crate::notify::{NotificationSink, OrderEvent};

/// What a close applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "camelCase")]
pub enum CloseScope {
    /// One order.
    Order(String),
    /// Every served, unclosed order of a table.
    Table(String),
}

/// Result of a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseOutcome {
    /// Orders closed by this call.
    pub matched: u64,
}

/// Order creation and state transitions.
#[derive(Clone)]
pub struct OrderLifecycle {
    db: Database,
    catalog: Arc<dyn CatalogValidator>,
    tables: Arc<dyn TableDirectory>,
    notifier: Arc<dyn NotificationSink>,
}

impl OrderLifecycle {
    pub fn new(
        db: Database,
        catalog: Arc<dyn CatalogValidator>,
        tables: Arc<dyn TableDirectory>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        OrderLifecycle {
            db,
            catalog,
            tables,
            notifier,
        }
    }

    // =========================================================================
    // Create / Read
    // =========================================================================

    /// Creates an open order for `table_id`.
    ///
    /// Publishes `OrderEvent::Created` after the insert; publishing can
    /// neither delay nor fail the call.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        table_id: &str,
        items: Vec<OrderItem>,
    ) -> ServiceResult<Order> {
        validate_reference("table_id", table_id)?;
        self.validate_items(ctx, &items).await?;

        let table_exists = ctx.run("tables.exists", self.tables.exists(table_id)).await?;
        if !table_exists {
            return Err(ServiceError::not_found("Table", table_id));
        }

        let order = Order::new(table_id, items, now());
        ctx.run("orders.insert", self.db.orders().insert(&order)).await?;

        info!(
            order_id = %order.id,
            table_id = %order.table_id,
            total = %order.total_price(),
            lines = order.items.len(),
            "Order created"
        );

        self.notifier.publish(OrderEvent::created(&order));
        Ok(order)
    }

    /// Loads one order.
    pub async fn get(&self, ctx: &RequestContext, order_id: &str) -> ServiceResult<Order> {
        validate_order_id(order_id)?;
        ctx.run("orders.get_by_id", self.db.orders().get_by_id(order_id))
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order_id))
    }

    /// Lists orders, newest first.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> ServiceResult<OrderPage> {
        validate_page(page)?;
        if let Some(table_id) = &filter.table_id {
            validate_reference("table_id", table_id)?;
        }
        ctx.run("orders.list", self.db.orders().list(filter, page)).await
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Marks an open order as served by `staff_id`.
    ///
    /// Of any number of concurrent calls for the same order, exactly one
    /// succeeds.
    pub async fn serve(&self, ctx: &RequestContext, order_id: &str, staff_id: &str) -> ServiceResult<()> {
        validate_order_id(order_id)?;
        validate_reference("staff_id", staff_id)?;

        let applied = ctx
            .run(
                "orders.mark_served",
                self.db.orders().mark_served(order_id, staff_id, now()),
            )
            .await?;

        if !applied {
            return Err(self.classify_miss(ctx, order_id, Order::ensure_servable).await);
        }

        info!(order_id, staff_id, "Order served");
        Ok(())
    }

    /// Closes one order, or every served order of a table, on behalf of
    /// `staff_id`.
    ///
    /// A table close that matches nothing is `NotFound`.
    pub async fn close(
        &self,
        ctx: &RequestContext,
        scope: &CloseScope,
        staff_id: &str,
    ) -> ServiceResult<CloseOutcome> {
        validate_reference("staff_id", staff_id)?;
        let closed_at = now();

        match scope {
            CloseScope::Order(order_id) => {
                validate_order_id(order_id)?;
                let applied = ctx
                    .run(
                        "orders.close_order",
                        self.db.orders().close_order(order_id, staff_id, closed_at),
                    )
                    .await?;

                if !applied {
                    return Err(self.classify_miss(ctx, order_id, Order::ensure_closable).await);
                }

                info!(order_id = %order_id, staff_id, "Order closed");
                Ok(CloseOutcome { matched: 1 })
            }
            CloseScope::Table(table_id) => {
                validate_reference("table_id", table_id)?;
                let matched = ctx
                    .run(
                        "orders.close_table",
                        self.db.orders().close_table(table_id, staff_id, closed_at),
                    )
                    .await?;

                if matched == 0 {
                    warn!(table_id = %table_id, "No served orders to close");
                    return Err(ServiceError::not_found("Served orders for table", table_id.as_str()));
                }

                info!(table_id = %table_id, staff_id, matched, "Table closed");
                Ok(CloseOutcome { matched })
            }
        }
    }

    /// Replaces the items of an order that is not closed and recomputes its
    /// total. Timestamps are untouched.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        order_id: &str,
        items: Vec<OrderItem>,
    ) -> ServiceResult<()> {
        validate_order_id(order_id)?;
        self.validate_items(ctx, &items).await?;

        let total = compute_total(&items);
        let applied = ctx
            .run(
                "orders.replace_items",
                self.db
                    .orders()
                    .replace_items(order_id, &items, total.cents(), now()),
            )
            .await?;

        if !applied {
            return Err(self.classify_miss(ctx, order_id, Order::ensure_editable).await);
        }

        info!(order_id, total = %total, lines = items.len(), "Order items replaced");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn validate_items(&self, ctx: &RequestContext, items: &[OrderItem]) -> ServiceResult<()> {
        validate_order_items(items)?;

        for (index, line) in items.iter().enumerate() {
            ctx.run("catalog.validate", async {
                self.catalog
                    .validate(&line.item)
                    .await
                    .map_err(|e| e.for_item(index, &line.item.name))
            })
            .await?;
        }

        Ok(())
    }

    /// Explains why a conditional update matched nothing.
    ///
    /// `precondition` is the transition's state rule. If the re-read order
    /// satisfies it, another writer changed the order in between.
    async fn classify_miss(
        &self,
        ctx: &RequestContext,
        order_id: &str,
        precondition: fn(&Order) -> Result<(), CoreError>,
    ) -> ServiceError {
        match ctx.run("orders.get_by_id", self.db.orders().get_by_id(order_id)).await {
            Ok(Some(order)) => match precondition(&order) {
                Err(err) => {
                    warn!(order_id, state = %order.state(), error = %err, "Transition rejected");
                    err.into()
                }
                Ok(()) => {
                    warn!(order_id, state = %order.state(), "Order changed during transition");
                    ServiceError::Conflict(format!("Order {order_id} changed concurrently"))
                }
            },
            Ok(None) => ServiceError::not_found("Order", order_id),
            Err(err) => err,
        }
    }
}

/// Current time at the millisecond precision orders are stored with.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

impl std::fmt::Debug for OrderLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderLifecycle").field("db", &self.db).finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{KnownTables, SnapshotValidator};
    use crate::notify::NotificationHub;
    use cafe_core::{CatalogItemSnapshot, OrderState};
    use cafe_db::DbConfig;

    fn item(id: &str, price_cents: i64, quantity: i64) -> OrderItem {
        OrderItem::new(
            CatalogItemSnapshot {
                id: id.to_string(),
                name: format!("Item {id}"),
                description: "Freshly made".to_string(),
                price_cents,
                category: "Kitchen".to_string(),
                image: format!("img/{id}.png"),
            },
            quantity,
        )
    }

    async fn lifecycle() -> (OrderLifecycle, NotificationHub) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let hub = NotificationHub::new(8);
        let lifecycle = OrderLifecycle::new(
            db,
            Arc::new(SnapshotValidator),
            Arc::new(KnownTables::new(["t1", "t2"])),
            Arc::new(hub.clone()),
        );
        (lifecycle, hub)
    }

    #[tokio::test]
    async fn test_create_computes_exact_total_and_notifies() {
        let (lifecycle, hub) = lifecycle().await;
        let mut sub = hub.subscribe(Some("t1"));
        let ctx = RequestContext::default();

        let order = lifecycle
            .create(&ctx, "t1", vec![item("a", 500, 2), item("b", 300, 1)])
            .await
            .unwrap();

        assert_eq!(order.total_price_cents, 1300);
        assert_eq!(order.state(), OrderState::Open);
        assert_eq!(order.handled_by, None);
        assert_eq!(sub.try_recv(), Some(OrderEvent::created(&order)));
        assert_eq!(lifecycle.get(&ctx, &order.id).await.unwrap(), order);
    }

    #[tokio::test]
    async fn test_returned_order_matches_stored_record() {
        let (lifecycle, _hub) = lifecycle().await;
        let ctx = RequestContext::default();

        let order = lifecycle.create(&ctx, "t1", vec![item("a", 500, 1)]).await.unwrap();
        assert_eq!(order.created_at.timestamp_subsec_nanos() % 1_000_000, 0);

        lifecycle.serve(&ctx, &order.id, "w1").await.unwrap();
        lifecycle
            .close(&ctx, &CloseScope::Order(order.id.clone()), "c1")
            .await
            .unwrap();

        let stored = lifecycle.get(&ctx, &order.id).await.unwrap();
        assert_eq!(stored.created_at, order.created_at);
        let served_at = stored.served_at.unwrap();
        let closed_at = stored.closed_at.unwrap();
        assert_eq!(served_at.timestamp_subsec_nanos() % 1_000_000, 0);
        assert!(served_at >= stored.created_at);
        assert!(closed_at >= served_at);
    }

    struct AcceptAnyItem;

    #[async_trait::async_trait]
    impl CatalogValidator for AcceptAnyItem {
        async fn validate(&self, _item: &CatalogItemSnapshot) -> Result<(), cafe_core::ValidationError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_oversized_total_is_rejected_not_overflowed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let permissive = OrderLifecycle::new(
            db,
            Arc::new(AcceptAnyItem),
            Arc::new(KnownTables::new(["t1"])),
            Arc::new(NotificationHub::default()),
        );
        let ctx = RequestContext::default();

        let err = permissive
            .create(&ctx, "t1", vec![item("a", i64::MAX / 2, 3)])
            .await
            .unwrap_err();
        assert!(matches!(&err, ServiceError::Validation(e) if e.field() == "total"));

        let (checked, _hub) = lifecycle().await;
        let err = checked
            .create(&ctx, "t1", vec![item("a", cafe_core::MAX_PRICE_CENTS + 1, 1)])
            .await
            .unwrap_err();
        assert!(matches!(&err, ServiceError::Validation(e) if e.field() == "price"));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let (lifecycle, _hub) = lifecycle().await;
        let ctx = RequestContext::default();

        let err = lifecycle.create(&ctx, "t1", vec![]).await.unwrap_err();
        assert_eq!(err.kind(), "validation");

        let err = lifecycle
            .create(&ctx, "t1", vec![item("a", 500, 0)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");

        let err = lifecycle
            .create(&ctx, "t1", vec![item("a", 0, 1)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(cafe_core::ValidationError::Item { index: 0, .. })
        ));

        let err = lifecycle
            .create(&ctx, "t9", vec![item("a", 500, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "Table", .. }));
    }

    #[tokio::test]
    async fn test_lifecycle_is_monotonic() {
        let (lifecycle, _hub) = lifecycle().await;
        let ctx = RequestContext::default();
        let order = lifecycle.create(&ctx, "t1", vec![item("a", 500, 1)]).await.unwrap();
        let scope = CloseScope::Order(order.id.clone());

        let err = lifecycle.close(&ctx, &scope, "c1").await.unwrap_err();
        assert_eq!(err.kind(), "conflict");

        lifecycle.serve(&ctx, &order.id, "w1").await.unwrap();
        let err = lifecycle.serve(&ctx, &order.id, "w2").await.unwrap_err();
        assert_eq!(err.kind(), "conflict");

        assert_eq!(lifecycle.close(&ctx, &scope, "c1").await.unwrap().matched, 1);
        let err = lifecycle.close(&ctx, &scope, "c1").await.unwrap_err();
        assert_eq!(err.kind(), "conflict");

        let closed = lifecycle.get(&ctx, &order.id).await.unwrap();
        assert_eq!(closed.state(), OrderState::Closed);
        assert_eq!(closed.handled_by.as_deref(), Some("w1"));
        assert_eq!(closed.closed_by.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let (lifecycle, _hub) = lifecycle().await;
        let ctx = RequestContext::default();
        let missing = "550e8400-e29b-41d4-a716-446655440000";

        let err = lifecycle.serve(&ctx, missing, "w1").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
        let err = lifecycle.get(&ctx, missing).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
        let err = lifecycle.serve(&ctx, "not-a-uuid", "w1").await.unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn test_concurrent_serve_has_one_winner() {
        let (lifecycle, _hub) = lifecycle().await;
        let ctx = RequestContext::default();
        let order = lifecycle.create(&ctx, "t1", vec![item("a", 500, 1)]).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let lifecycle = lifecycle.clone();
                let id = order.id.clone();
                tokio::spawn(async move {
                    lifecycle
                        .serve(&RequestContext::default(), &id, &format!("w{i}"))
                        .await
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => winners += 1,
                Err(err) => assert_eq!(err.kind(), "conflict"),
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_close_table() {
        let (lifecycle, _hub) = lifecycle().await;
        let ctx = RequestContext::default();
        let a = lifecycle.create(&ctx, "t1", vec![item("a", 500, 1)]).await.unwrap();
        let b = lifecycle.create(&ctx, "t1", vec![item("b", 300, 1)]).await.unwrap();
        let unserved = lifecycle.create(&ctx, "t1", vec![item("c", 200, 1)]).await.unwrap();
        lifecycle.serve(&ctx, &a.id, "w1").await.unwrap();
        lifecycle.serve(&ctx, &b.id, "w1").await.unwrap();

        let scope = CloseScope::Table("t1".to_string());
        assert_eq!(lifecycle.close(&ctx, &scope, "c1").await.unwrap().matched, 2);

        let err = lifecycle.close(&ctx, &scope, "c1").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");

        let unserved = lifecycle.get(&ctx, &unserved.id).await.unwrap();
        assert_eq!(unserved.state(), OrderState::Open);
    }

    #[tokio::test]
    async fn test_update_recomputes_total_until_closed() {
        let (lifecycle, _hub) = lifecycle().await;
        let ctx = RequestContext::default();
        let order = lifecycle.create(&ctx, "t1", vec![item("a", 500, 1)]).await.unwrap();

        lifecycle.serve(&ctx, &order.id, "w1").await.unwrap();
        let served = lifecycle.get(&ctx, &order.id).await.unwrap();
        lifecycle
            .update(&ctx, &order.id, vec![item("a", 500, 2), item("b", 250, 2)])
            .await
            .unwrap();

        let updated = lifecycle.get(&ctx, &order.id).await.unwrap();
        assert_eq!(updated.total_price_cents, 1500);
        assert_eq!(updated.items.len(), 2);
        assert_eq!(updated.served_at, served.served_at);
        assert_eq!(updated.handled_by, served.handled_by);
        assert_eq!(updated.created_at, served.created_at);

        lifecycle
            .close(&ctx, &CloseScope::Order(order.id.clone()), "c1")
            .await
            .unwrap();
        let err = lifecycle
            .update(&ctx, &order.id, vec![item("a", 500, 3)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "conflict");
        assert_eq!(lifecycle.get(&ctx, &order.id).await.unwrap().total_price_cents, 1500);
    }

    #[tokio::test]
    async fn test_list_validates_page() {
        let (lifecycle, _hub) = lifecycle().await;
        let ctx = RequestContext::default();
        lifecycle.create(&ctx, "t1", vec![item("a", 500, 1)]).await.unwrap();
        lifecycle.create(&ctx, "t2", vec![item("a", 500, 1)]).await.unwrap();

        let filter = OrderFilter {
            table_id: Some("t2".to_string()),
            ..OrderFilter::default()
        };
        let page = lifecycle.list(&ctx, &filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.orders[0].table_id, "t2");

        let err = lifecycle
            .list(&ctx, &OrderFilter::default(), PageRequest::new(0, 20))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
