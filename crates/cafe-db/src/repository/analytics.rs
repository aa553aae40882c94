//! # Analytics Repository
//!
//! Read-only, filtered projections feeding the statistics reducers in
//! `cafe_core::stats`.
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────────┬──────────────┐
//! │ projection           │ filter                       │ bucket time  │
//! ├──────────────────────┼──────────────────────────────┼──────────────┤
//! │ closed_revenue       │ closed, created_at ∈ range   │ created_at   │
//! │ serving              │ handled_by, served_at ∈ range│ created_at   │
//! │ cashier              │ closed_by, closed_at ∈ range │ closed_at    │
//! └──────────────────────┴──────────────────────────────┴──────────────┘
//! ```
//!
//! Each projection is one query returning only the columns its reducer
//! needs. Overall figures and buckets are both derived from that single
//! result set.

use sqlx::SqlitePool;
use tracing::debug;

use cafe_core::stats::{RevenueSample, ServingSample, TimeRange};
use cafe_core::Money;

use super::{from_millis, to_millis};
use crate::error::DbResult;

/// Repository for statistics projections.
#[derive(Debug, Clone)]
pub struct AnalyticsRepository {
    pool: SqlitePool,
}

impl AnalyticsRepository {
    /// Creates a new AnalyticsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AnalyticsRepository { pool }
    }

    /// Closed orders created within `range`, sampled at their creation time.
    pub async fn closed_revenue_samples(&self, range: TimeRange) -> DbResult<Vec<RevenueSample>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT created_at, total_price_cents
            FROM orders
            WHERE closed_at IS NOT NULL
              AND created_at >= ? AND created_at < ?
            "#,
        )
        .bind(to_millis(range.from))
        .bind(to_millis(range.to))
        .fetch_all(&self.pool)
        .await?;

        debug!(samples = rows.len(), "Closed revenue projection");
        revenue_samples("created_at", rows)
    }

    /// Orders served by `staff_id` within `range` (by serving time).
    pub async fn serving_samples(&self, staff_id: &str, range: TimeRange) -> DbResult<Vec<ServingSample>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT created_at, served_at
            FROM orders
            WHERE handled_by = ?
              AND served_at >= ? AND served_at < ?
            "#,
        )
        .bind(staff_id)
        .bind(to_millis(range.from))
        .bind(to_millis(range.to))
        .fetch_all(&self.pool)
        .await?;

        debug!(staff_id, samples = rows.len(), "Serving projection");
        rows.into_iter()
            .map(|(created_at, served_at)| {
                Ok(ServingSample {
                    created_at: from_millis("created_at", created_at)?,
                    served_at: from_millis("served_at", served_at)?,
                })
            })
            .collect()
    }

    /// Orders closed by `staff_id` within `range`, sampled at closing time.
    pub async fn cashier_samples(&self, staff_id: &str, range: TimeRange) -> DbResult<Vec<RevenueSample>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT closed_at, total_price_cents
            FROM orders
            WHERE closed_by = ?
              AND closed_at >= ? AND closed_at < ?
            "#,
        )
        .bind(staff_id)
        .bind(to_millis(range.from))
        .bind(to_millis(range.to))
        .fetch_all(&self.pool)
        .await?;

        debug!(staff_id, samples = rows.len(), "Cashier projection");
        revenue_samples("closed_at", rows)
    }
}

fn revenue_samples(column: &str, rows: Vec<(i64, i64)>) -> DbResult<Vec<RevenueSample>> {
    rows.into_iter()
        .map(|(at, cents)| {
            Ok(RevenueSample {
                at: from_millis(column, at)?,
                total: Money::from_cents(cents),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use cafe_core::{CatalogItemSnapshot, Order, OrderItem};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    fn order(table: &str, price_cents: i64, created: DateTime<Utc>) -> Order {
        let item = CatalogItemSnapshot {
            id: "tea".to_string(),
            name: "Green Tea".to_string(),
            description: "Loose leaf sencha".to_string(),
            price_cents,
            category: "Tea".to_string(),
            image: "img/tea.png".to_string(),
        };
        Order::new(table, vec![OrderItem::new(item, 1)], created)
    }

    #[tokio::test]
    async fn test_projections_filter_on_different_columns() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let orders = db.orders();
        let analytics = db.analytics();

        // Created on Jan 1, served on Jan 2, closed on Jan 3, all by staff "s1".
        let late = order("t1", 700, at(1, 22));
        orders.insert(&late).await.unwrap();
        orders.mark_served(&late.id, "s1", at(2, 1)).await.unwrap();
        orders.close_order(&late.id, "s1", at(3, 9)).await.unwrap();

        // Created and served on Jan 2, never closed.
        let open = order("t2", 300, at(2, 10));
        orders.insert(&open).await.unwrap();
        orders.mark_served(&open.id, "s1", at(2, 11)).await.unwrap();

        let jan2 = TimeRange::new(at(2, 0), at(3, 0));

        let revenue = analytics.closed_revenue_samples(jan2).await.unwrap();
        assert!(revenue.is_empty());

        let serving = analytics.serving_samples("s1", jan2).await.unwrap();
        assert_eq!(serving.len(), 2);

        let closing = analytics.cashier_samples("s1", jan2).await.unwrap();
        assert!(closing.is_empty());

        let jan3 = TimeRange::new(at(3, 0), at(4, 0));
        let closing = analytics.cashier_samples("s1", jan3).await.unwrap();
        assert_eq!(closing.len(), 1);
        assert_eq!(closing[0].at, at(3, 9));
        assert_eq!(closing[0].total.cents(), 700);

        let jan1 = TimeRange::new(at(1, 0), at(2, 0));
        let revenue = analytics.closed_revenue_samples(jan1).await.unwrap();
        assert_eq!(revenue.len(), 1);
        assert_eq!(revenue[0].at, at(1, 22));
    }

    #[tokio::test]
    async fn test_range_end_is_exclusive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let edge = order("t1", 500, at(2, 0));
        db.orders().insert(&edge).await.unwrap();
        db.orders().mark_served(&edge.id, "w1", at(2, 0)).await.unwrap();
        db.orders().close_order(&edge.id, "c1", at(2, 0)).await.unwrap();

        let before = TimeRange::new(at(1, 0), at(2, 0));
        assert!(db.analytics().closed_revenue_samples(before).await.unwrap().is_empty());

        let from_edge = TimeRange::new(at(2, 0), at(3, 0));
        assert_eq!(db.analytics().closed_revenue_samples(from_edge).await.unwrap().len(), 1);
    }
}
