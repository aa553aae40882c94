//! # Statistics Engine
//!
//! Time-bucketed figures over the orders table.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  waiter_stats / cashier_stats                                           │
//! │       │                                                                 │
//! │       ├── AccessPolicy::allows(caller, target)?   ✗ → Unauthorized      │
//! │       │                                                                 │
//! │  period_stats ─┐                                                        │
//! │       ├── "day" | "week" | "month"?               ✗ → UnsupportedParam  │
//! │       ├── from >= to?                             ✓ → empty result      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AnalyticsRepository (one filtered projection)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cafe_core::stats reducers (overall + buckets, one pass)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Each Statistic Counts
//! | statistic | filter                                     | bucketed by  |
//! |-----------|--------------------------------------------|--------------|
//! | period    | closed orders, `created_at` in range       | `created_at` |
//! | waiter    | `handled_by = staff`, `served_at` in range | `created_at` |
//! | cashier   | `closed_by = staff`, `closed_at` in range  | `closed_at`  |
//!
//! NOTE: waiter statistics filter on serving time but bucket on creation
//! time, so an order served after midnight lands in the previous day's
//! bucket. Existing reports depend on this; changing it changes their
//! numbers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use cafe_core::stats::{self, Bucket, CashierStats, PeriodStats, TimeRange, WaiterStats};
use cafe_core::validation::validate_reference;
use cafe_core::{AccessPolicy, Caller};
use cafe_db::Database;

use crate::context::RequestContext;
use crate::error::{ServiceError, ServiceResult};

/// Revenue and staff productivity statistics.
#[derive(Clone)]
pub struct StatisticsEngine {
    db: Database,
    policy: Arc<dyn AccessPolicy>,
}

impl StatisticsEngine {
    pub fn new(db: Database, policy: Arc<dyn AccessPolicy>) -> Self {
        StatisticsEngine { db, policy }
    }

    /// Volume and revenue of closed orders created in `[from, to)`, overall
    /// and per `bucket` (`"day"`, `"week"` or `"month"`).
    pub async fn period_stats(
        &self,
        ctx: &RequestContext,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        bucket: &str,
    ) -> ServiceResult<PeriodStats> {
        let bucket: Bucket = bucket.parse()?;
        let range = TimeRange::new(from, to);
        if range.is_empty() {
            return Ok(PeriodStats::default());
        }

        let samples = ctx
            .run(
                "analytics.closed_revenue_samples",
                self.db.analytics().closed_revenue_samples(range),
            )
            .await?;

        let result = stats::period_stats(samples, bucket);
        debug!(
            %bucket,
            orders = result.overall.total_orders,
            buckets = result.buckets.len(),
            "Period statistics computed"
        );
        Ok(result)
    }

    /// Serving performance of `staff_id` for orders served in `[from, to)`.
    pub async fn waiter_stats(
        &self,
        ctx: &RequestContext,
        caller: &Caller,
        staff_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        bucket: Option<&str>,
    ) -> ServiceResult<WaiterStats> {
        self.authorize(caller, staff_id)?;
        let bucket = parse_bucket(bucket)?;
        let range = TimeRange::new(from, to);
        if range.is_empty() {
            return Ok(WaiterStats::default());
        }

        let samples = ctx
            .run(
                "analytics.serving_samples",
                self.db.analytics().serving_samples(staff_id, range),
            )
            .await?;

        let result = stats::waiter_stats(samples, bucket);
        debug!(
            staff_id,
            served = result.total_orders_served,
            "Waiter statistics computed"
        );
        Ok(result)
    }

    /// Orders closed and revenue taken by `staff_id` in `[from, to)`.
    pub async fn cashier_stats(
        &self,
        ctx: &RequestContext,
        caller: &Caller,
        staff_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        bucket: Option<&str>,
    ) -> ServiceResult<CashierStats> {
        self.authorize(caller, staff_id)?;
        let bucket = parse_bucket(bucket)?;
        let range = TimeRange::new(from, to);
        if range.is_empty() {
            return Ok(CashierStats::default());
        }

        let samples = ctx
            .run(
                "analytics.cashier_samples",
                self.db.analytics().cashier_samples(staff_id, range),
            )
            .await?;

        let result = stats::cashier_stats(samples, bucket);
        debug!(
            staff_id,
            closed = result.total_orders_closed,
            revenue_cents = result.total_revenue_cents,
            "Cashier statistics computed"
        );
        Ok(result)
    }

    fn authorize(&self, caller: &Caller, staff_id: &str) -> ServiceResult<()> {
        validate_reference("staff_id", staff_id)?;

        if !self.policy.allows_caller(caller, staff_id) {
            warn!(
                caller = %caller.staff_id,
                role = %caller.role,
                target = staff_id,
                "Statistics access denied"
            );
            return Err(ServiceError::Unauthorized(format!(
                "{} may not read statistics of {}",
                caller.staff_id, staff_id
            )));
        }
        Ok(())
    }
}

fn parse_bucket(bucket: Option<&str>) -> ServiceResult<Option<Bucket>> {
    Ok(bucket.map(str::parse::<Bucket>).transpose()?)
}

impl std::fmt::Debug for StatisticsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticsEngine").field("db", &self.db).finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
