//! # Order Repository
//!
//! Database operations for orders.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── insert() → served_at, closed_at NULL                          │
//! │                                                                         │
//! │  2. SERVE                                                              │
//! │     └── mark_served()                                                  │
//! │         UPDATE ... WHERE id = ? AND served_at IS NULL                  │
//! │                                                                         │
//! │  3. CLOSE                                                              │
//! │     └── close_order() / close_table()                                  │
//! │         UPDATE ... WHERE served_at IS NOT NULL AND closed_at IS NULL   │
//! │                                                                         │
//! │  (any time before 3) replace_items()                                   │
//! │         UPDATE ... WHERE id = ? AND closed_at IS NULL                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conditional Updates
//! Every transition is a single statement whose WHERE clause carries the
//! state predicate. SQLite serializes writers, so of two racing serves only
//! one sees `served_at IS NULL`; the other affects zero rows. Callers decide
//! success from the affected-row count alone and never read before writing.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use cafe_core::{Order, OrderFilter, OrderItem, OrderPage, PageMeta, PageRequest};

use super::{from_millis, from_millis_opt, to_millis};
use crate::error::{DbError, DbResult};

const ORDER_COLUMNS: &str = "id, table_id, items, total_price_cents, created_at, \
     served_at, handled_by, closed_at, closed_by";

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw `orders` row.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    table_id: String,
    items: String,
    total_price_cents: i64,
    created_at: i64,
    served_at: Option<i64>,
    handled_by: Option<String>,
    closed_at: Option<i64>,
    closed_by: Option<String>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> DbResult<Self> {
        let items: Vec<OrderItem> = serde_json::from_str(&row.items)?;

        Ok(Order {
            id: row.id,
            items,
            total_price_cents: row.total_price_cents,
            table_id: row.table_id,
            created_at: from_millis("created_at", row.created_at)?,
            served_at: from_millis_opt("served_at", row.served_at)?,
            handled_by: row.handled_by,
            closed_at: from_millis_opt("closed_at", row.closed_at)?,
            closed_by: row.closed_by,
        })
    }
}

fn into_orders(rows: Vec<OrderRow>) -> DbResult<Vec<Order>> {
    rows.into_iter().map(Order::try_from).collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts a freshly created order.
    pub async fn insert(&self, order: &Order) -> DbResult<()> {
        let items = serde_json::to_string(&order.items)?;
        let created_at = to_millis(order.created_at);

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, table_id, items, total_price_cents, created_at,
                served_at, handled_by, closed_at, closed_by, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id)
        .bind(&order.table_id)
        .bind(items)
        .bind(order.total_price_cents)
        .bind(created_at)
        .bind(order.served_at.map(to_millis))
        .bind(&order.handled_by)
        .bind(order.closed_at.map(to_millis))
        .bind(&order.closed_by)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        debug!(order_id = %order.id, table_id = %order.table_id, "Order inserted");
        Ok(())
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?");
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    /// Lists orders matching `filter`, newest first.
    pub async fn list(&self, filter: &OrderFilter, page: PageRequest) -> DbResult<OrderPage> {
        let mut count_query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM orders");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut page_query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        push_filters(&mut page_query, filter);
        page_query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows: Vec<OrderRow> = page_query
            .build_query_as::<OrderRow>()
            .fetch_all(&self.pool)
            .await?;

        debug!(total, returned = rows.len(), page = page.page, "Orders listed");

        Ok(OrderPage {
            orders: into_orders(rows)?,
            meta: PageMeta::new(total as u64, page),
        })
    }

    /// Marks an order as served by `staff_id`.
    ///
    /// Returns `false` when nothing matched: the order doesn't exist or was
    /// already served.
    pub async fn mark_served(&self, id: &str, staff_id: &str, at: DateTime<Utc>) -> DbResult<bool> {
        let at = to_millis(at);
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET served_at = ?, handled_by = ?, updated_at = ?
            WHERE id = ? AND served_at IS NULL
            "#,
        )
        .bind(at)
        .bind(staff_id)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Closes one served order on behalf of `staff_id`.
    ///
    /// Returns `false` when nothing matched: the order doesn't exist, was
    /// never served, or is already closed.
    pub async fn close_order(&self, id: &str, staff_id: &str, at: DateTime<Utc>) -> DbResult<bool> {
        let at = to_millis(at);
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET closed_at = ?, closed_by = ?, updated_at = ?
            WHERE id = ? AND served_at IS NOT NULL AND closed_at IS NULL
            "#,
        )
        .bind(at)
        .bind(staff_id)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Closes every served, unclosed order of a table in one statement.
    ///
    /// Returns the number of orders closed. Open (unserved) orders of the
    /// table are left alone.
    pub async fn close_table(&self, table_id: &str, staff_id: &str, at: DateTime<Utc>) -> DbResult<u64> {
        let at = to_millis(at);
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET closed_at = ?, closed_by = ?, updated_at = ?
            WHERE table_id = ? AND served_at IS NOT NULL AND closed_at IS NULL
            "#,
        )
        .bind(at)
        .bind(staff_id)
        .bind(at)
        .bind(table_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Replaces the items and total of an order that is not closed yet.
    ///
    /// State timestamps are untouched. Returns `false` when nothing matched.
    pub async fn replace_items(
        &self,
        id: &str,
        items: &[OrderItem],
        total_price_cents: i64,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let items = serde_json::to_string(items)?;
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET items = ?, total_price_cents = ?, updated_at = ?
            WHERE id = ? AND closed_at IS NULL
            "#,
        )
        .bind(items)
        .bind(total_price_cents)
        .bind(to_millis(at))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// All orders of a table that are not closed yet, oldest first.
    pub async fn active_for_table(&self, table_id: &str) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE table_id = ? AND closed_at IS NULL \
             ORDER BY created_at ASC, id ASC"
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(table_id)
            .fetch_all(&self.pool)
            .await?;

        into_orders(rows)
    }
}

// =============================================================================
// Filter Helpers
// =============================================================================

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &OrderFilter) {
    query.push(" WHERE 1 = 1");

    if let Some(closed) = filter.closed {
        query.push(if closed {
            " AND closed_at IS NOT NULL"
        } else {
            " AND closed_at IS NULL"
        });
    }

    if let Some(served) = filter.served {
        query.push(if served {
            " AND served_at IS NOT NULL"
        } else {
            " AND served_at IS NULL"
        });
    }

    if let Some(table_id) = &filter.table_id {
        query.push(" AND table_id = ").push_bind(table_id.clone());
    }

    if let Some(date) = filter.date {
        let (start, end) = day_bounds(date);
        query
            .push(" AND created_at >= ")
            .push_bind(start)
            .push(" AND created_at < ")
            .push_bind(end);
    }
}

/// `[start, end)` of a UTC calendar day, in epoch milliseconds.
fn day_bounds(date: NaiveDate) -> (i64, i64) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = start
        .checked_add_signed(Duration::days(1))
        .map_or(i64::MAX, to_millis);
    (to_millis(start), end)
}

// =============================================================================
// Unit Tests
// =============================================================================
