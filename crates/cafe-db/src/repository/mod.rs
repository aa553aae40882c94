//! # Repository Module
//!
//! Database repositories for cafe orders.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Write side vs read side                              │
//! │                                                                         │
//! │  OrderLifecycle / TableOrderAggregator      StatisticsEngine           │
//! │       │                                          │                      │
//! │       ▼                                          ▼                      │
//! │  OrderRepository                            AnalyticsRepository        │
//! │  ├── insert / get_by_id / list              ├── closed_revenue_samples │
//! │  ├── mark_served      (conditional)         ├── serving_samples        │
//! │  ├── close_order      (conditional)         └── cashier_samples        │
//! │  ├── close_table      (conditional)                                    │
//! │  ├── replace_items    (conditional)                                    │
//! │  └── active_for_table                                                  │
//! │       │                                          │                      │
//! │       └──────────────────┬───────────────────────┘                      │
//! │                          ▼                                              │
//! │                    orders table                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`OrderRepository`](order::OrderRepository) - Order persistence and state transitions
//! - [`AnalyticsRepository`](analytics::AnalyticsRepository) - Filtered projections for statistics

pub mod analytics;
pub mod order;

use chrono::{DateTime, Utc};

use crate::error::{DbError, DbResult};

/// Timestamps are stored as Unix epoch milliseconds.
pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(column: &str, millis: i64) -> DbResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| DbError::Corrupt(format!("{column} out of range: {millis}")))
}

pub(crate) fn from_millis_opt(column: &str, millis: Option<i64>) -> DbResult<Option<DateTime<Utc>>> {
    millis.map(|m| from_millis(column, m)).transpose()
}
