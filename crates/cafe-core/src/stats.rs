//! # Statistics
//!
//! Time buckets and the reductions behind period, waiter and cashier
//! statistics.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      One Filtered Pass                                  │
//! │                                                                         │
//! │  cafe-db: filtered projection (only the columns a reducer needs)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RevenueSample / ServingSample  ──┬──► overall accumulator             │
//! │                                   │                                     │
//! │                                   └──► per-bucket accumulators         │
//! │                                        (BTreeMap, ascending label)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PeriodStats / WaiterStats / CashierStats                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both reductions consume the same samples in the same loop, so the overall
//! figures always equal the sum of the buckets. A bucket exists only when at
//! least one sample landed in it, which keeps every average well defined.
//!
//! ## Bucket Labels
//! | Bucket | Label          | Example      |
//! |--------|----------------|--------------|
//! | day    | `YYYY-MM-DD`   | `2024-01-03` |
//! | week   | `YYYY-Ww`      | `2024-W1`    |
//! | month  | `YYYY-MM`      | `2024-01`    |
//!
//! Week labels use the ISO week-numbering year, so 2024-12-30 is `2025-W1`.
//! Week numbers are not padded, and buckets are ordered by label, so
//! `2024-W10` sorts before `2024-W2`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;
use crate::money::Money;

// =============================================================================
// Bucket
// =============================================================================

/// Granularity of a statistics breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Bucket {
    Day,
    Week,
    Month,
}

impl Bucket {
    /// Label of the bucket `at` falls into (UTC calendar).
    pub fn label(&self, at: DateTime<Utc>) -> String {
        match self {
            Bucket::Day => at.format("%Y-%m-%d").to_string(),
            Bucket::Week => {
                let week = at.iso_week();
                format!("{}-W{}", week.year(), week.week())
            }
            Bucket::Month => at.format("%Y-%m").to_string(),
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Day => write!(f, "day"),
            Bucket::Week => write!(f, "week"),
            Bucket::Month => write!(f, "month"),
        }
    }
}

impl FromStr for Bucket {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Bucket::Day),
            "week" => Ok(Bucket::Week),
            "month" => Ok(Bucket::Month),
            other => Err(CoreError::UnsupportedBucket(other.to_string())),
        }
    }
}

// =============================================================================
// Time Range
// =============================================================================

/// Half-open interval `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        TimeRange { from, to }
    }

    /// True when no instant can fall inside the range (`from >= to`).
    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at < self.to
    }
}

// =============================================================================
// Samples
// =============================================================================

/// One closed order as seen by revenue statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueSample {
    /// Timestamp that decides the bucket.
    pub at: DateTime<Utc>,
    pub total: Money,
}

/// One served order as seen by waiter statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServingSample {
    pub created_at: DateTime<Utc>,
    pub served_at: DateTime<Utc>,
}

impl ServingSample {
    /// Milliseconds between taking and serving the order.
    pub fn serving_millis(&self) -> i64 {
        (self.served_at - self.created_at).num_milliseconds()
    }
}

const MILLIS_PER_MINUTE: i64 = 60_000;

// =============================================================================
// Revenue Statistics
// =============================================================================

/// Volume and revenue over a whole filtered range.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderStats {
    pub total_orders: u64,
    #[serde(rename = "totalRevenue")]
    pub total_revenue_cents: i64,
    #[serde(rename = "averageOrderValue")]
    pub average_order_value_cents: f64,
}

/// Volume and revenue of one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AggregatedStat {
    pub group_key: String,
    pub total_orders: u64,
    #[serde(rename = "totalRevenue")]
    pub total_revenue_cents: i64,
    #[serde(rename = "averageOrderValue")]
    pub average_order_value_cents: f64,
}

/// Result of a period statistics request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PeriodStats {
    pub overall: OrderStats,
    pub buckets: Vec<AggregatedStat>,
}

#[derive(Debug, Clone, Copy, Default)]
struct RevenueAccumulator {
    count: u64,
    revenue: Money,
}

impl RevenueAccumulator {
    fn push(&mut self, total: Money) {
        self.count += 1;
        self.revenue += total;
    }

    fn average(&self) -> f64 {
        self.revenue.average_over(self.count).unwrap_or(0.0)
    }

    fn overall(&self) -> OrderStats {
        OrderStats {
            total_orders: self.count,
            total_revenue_cents: self.revenue.cents(),
            average_order_value_cents: self.average(),
        }
    }

    fn bucket(&self, group_key: String) -> AggregatedStat {
        AggregatedStat {
            group_key,
            total_orders: self.count,
            total_revenue_cents: self.revenue.cents(),
            average_order_value_cents: self.average(),
        }
    }
}

/// Reduces closed-order samples into overall figures and a bucketed
/// breakdown, in a single pass.
///
/// ## Example
/// ```rust
/// use cafe_core::stats::{period_stats, Bucket, RevenueSample};
/// use cafe_core::Money;
/// use chrono::{TimeZone, Utc};
///
/// let samples = vec![
///     RevenueSample { at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(), total: Money::from_cents(500) },
///     RevenueSample { at: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(), total: Money::from_cents(800) },
/// ];
/// let stats = period_stats(samples, Bucket::Day);
/// assert_eq!(stats.overall.total_orders, 2);
/// assert_eq!(stats.overall.average_order_value_cents, 650.0);
/// assert_eq!(stats.buckets[0].group_key, "2024-01-01");
/// ```
pub fn period_stats<I>(samples: I, bucket: Bucket) -> PeriodStats
where
    I: IntoIterator<Item = RevenueSample>,
{
    let mut overall = RevenueAccumulator::default();
    let mut buckets: BTreeMap<String, RevenueAccumulator> = BTreeMap::new();

    for sample in samples {
        overall.push(sample.total);
        buckets
            .entry(bucket.label(sample.at))
            .or_default()
            .push(sample.total);
    }

    PeriodStats {
        overall: overall.overall(),
        buckets: buckets
            .into_iter()
            .map(|(key, acc)| acc.bucket(key))
            .collect(),
    }
}

// =============================================================================
// Waiter Statistics
// =============================================================================

/// Serving performance of one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ServingStat {
    pub group_key: String,
    pub total_orders_served: u64,
    pub average_serving_time_minutes: f64,
    pub fastest_serving_time_minutes: i64,
}

/// Serving performance of a waiter.
///
/// The average is fractional minutes; the fastest time is truncated to
/// whole minutes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WaiterStats {
    pub total_orders_served: u64,
    pub average_serving_time_minutes: f64,
    pub fastest_serving_time_minutes: i64,
    pub buckets: Vec<ServingStat>,
}

#[derive(Debug, Clone, Copy, Default)]
struct ServingAccumulator {
    count: u64,
    total_millis: i64,
    fastest_millis: Option<i64>,
}

impl ServingAccumulator {
    fn push(&mut self, millis: i64) {
        self.count += 1;
        self.total_millis += millis;
        self.fastest_millis = Some(self.fastest_millis.map_or(millis, |f| f.min(millis)));
    }

    fn average_minutes(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total_millis as f64 / self.count as f64 / MILLIS_PER_MINUTE as f64
    }

    fn fastest_minutes(&self) -> i64 {
        self.fastest_millis.unwrap_or(0) / MILLIS_PER_MINUTE
    }
}

/// Reduces served-order samples into waiter statistics.
///
/// Buckets are keyed by the order's **creation** time even though callers
/// select samples by serving time. An order created just before midnight and
/// served after it is counted on the earlier day. Reports published from
/// this engine have always been keyed this way, so the behaviour is kept.
pub fn waiter_stats<I>(samples: I, bucket: Option<Bucket>) -> WaiterStats
where
    I: IntoIterator<Item = ServingSample>,
{
    let mut overall = ServingAccumulator::default();
    let mut buckets: BTreeMap<String, ServingAccumulator> = BTreeMap::new();

    for sample in samples {
        let millis = sample.serving_millis();
        overall.push(millis);
        if let Some(bucket) = bucket {
            buckets
                .entry(bucket.label(sample.created_at))
                .or_default()
                .push(millis);
        }
    }

    WaiterStats {
        total_orders_served: overall.count,
        average_serving_time_minutes: overall.average_minutes(),
        fastest_serving_time_minutes: overall.fastest_minutes(),
        buckets: buckets
            .into_iter()
            .map(|(group_key, acc)| ServingStat {
                group_key,
                total_orders_served: acc.count,
                average_serving_time_minutes: acc.average_minutes(),
                fastest_serving_time_minutes: acc.fastest_minutes(),
            })
            .collect(),
    }
}

// =============================================================================
// Cashier Statistics
// =============================================================================

/// Orders closed and revenue taken in one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClosingStat {
    pub group_key: String,
    pub total_orders_closed: u64,
    #[serde(rename = "totalRevenue")]
    pub total_revenue_cents: i64,
}

/// Orders closed and revenue taken by a cashier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashierStats {
    pub total_orders_closed: u64,
    #[serde(rename = "totalRevenue")]
    pub total_revenue_cents: i64,
    pub buckets: Vec<ClosingStat>,
}

/// Reduces closed-order samples into cashier statistics.
///
/// `sample.at` must be the closing time; buckets are keyed by it.
pub fn cashier_stats<I>(samples: I, bucket: Option<Bucket>) -> CashierStats
where
    I: IntoIterator<Item = RevenueSample>,
{
    let mut overall = RevenueAccumulator::default();
    let mut buckets: BTreeMap<String, RevenueAccumulator> = BTreeMap::new();

    for sample in samples {
        overall.push(sample.total);
        if let Some(bucket) = bucket {
            buckets
                .entry(bucket.label(sample.at))
                .or_default()
                .push(sample.total);
        }
    }

    CashierStats {
        total_orders_closed: overall.count,
        total_revenue_cents: overall.revenue.cents(),
        buckets: buckets
            .into_iter()
            .map(|(group_key, acc)| ClosingStat {
                group_key,
                total_orders_closed: acc.count,
                total_revenue_cents: acc.revenue.cents(),
            })
            .collect(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
