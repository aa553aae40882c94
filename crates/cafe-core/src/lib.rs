//! # cafe-core: Pure Business Logic for Cafe Orders
//!
//! This crate is the **heart** of the order lifecycle and analytics
//! subsystem. It contains all business rules as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Cafe Orders Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Transport adapter (HTTP / SSE, external)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    cafe-service                                 │   │
//! │  │    OrderLifecycle, TableOrderAggregator, StatisticsEngine      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cafe-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   bill    │  │   stats   │  │   │
//! │  │   │   Order   │  │   Money   │  │ OrderTotal│  │  buckets  │  │   │
//! │  │   │ OrderItem │  │           │  │   merge   │  │  reducers │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    cafe-db (Database Layer)                     │   │
//! │  │          SQLite queries, migrations, conditional updates        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, OrderItem, catalog snapshot, roles)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`bill`] - Consolidation of a table's open orders into one bill
//! - [`stats`] - Time buckets and statistics reductions
//! - [`access`] - Self-or-admin access predicate for staff statistics
//!
//! ## Example Usage
//!
//! ```rust
//! use cafe_core::money::Money;
//!
//! let espresso = Money::from_cents(500);
//! let line = espresso.multiply_quantity(2);
//! assert_eq!(line.cents(), 1000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod bill;
pub mod error;
pub mod money;
pub mod stats;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{AccessPolicy, SelfOrAdmin};
pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use stats::Bucket;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines in a single order.
///
/// ## Business Reason
/// A cafe ticket with more than a hundred distinct lines is a data entry
/// mistake, not a real order.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity of a single line.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum catalog price of one item, in cents ($100,000.00).
///
/// With the line and quantity caps this keeps every order total far inside
/// `i64`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000;
