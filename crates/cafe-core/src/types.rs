//! # Domain Types
//!
//! Core domain types used throughout Cafe Orders.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Order      │   │    OrderItem    │   │ CatalogItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │   Snapshot      │       │
//! │  │  id (UUID)      │──►│  item ──────────┼──►│  ─────────────  │       │
//! │  │  table_id       │   │  quantity ≥ 1   │   │  id, name       │       │
//! │  │  total_price    │   └─────────────────┘   │  price_cents    │       │
//! │  │  created_at     │                         └─────────────────┘       │
//! │  │  served_at?     │   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  handled_by?    │   │   OrderState    │   │   StaffRole     │       │
//! │  │  closed_at?     │   │  Open           │   │  Admin          │       │
//! │  │  closed_by?     │   │  Served         │   │  Waiter         │       │
//! │  └─────────────────┘   │  Closed         │   │  Cashier        │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! An order line carries a full copy of the catalog item as it was when the
//! order was taken. Later menu edits never change past orders or revenue.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreError;
use crate::money::Money;

// =============================================================================
// Catalog Item Snapshot
// =============================================================================

/// A copy of a menu item's fields captured when the order was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CatalogItemSnapshot {
    /// Catalog identity of the item. Bill merging deduplicates on this.
    pub id: String,
    pub name: String,
    pub description: String,
    /// Unit price in cents at order time (frozen).
    pub price_cents: i64,
    pub category: String,
    /// Image path as stored by the catalog.
    pub image: String,
}

impl CatalogItemSnapshot {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line in an order: a catalog snapshot and how many of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderItem {
    pub item: CatalogItemSnapshot,
    pub quantity: i64,
}

impl OrderItem {
    pub fn new(item: CatalogItemSnapshot, quantity: i64) -> Self {
        OrderItem { item, quantity }
    }

    /// Unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.item.price().multiply_quantity(self.quantity)
    }
}

/// Sums the line totals of `items`.
///
/// ## Example
/// ```rust
/// use cafe_core::types::{compute_total, CatalogItemSnapshot, OrderItem};
///
/// let item = |id: &str, price| CatalogItemSnapshot {
///     id: id.into(),
///     name: "Item".into(),
///     description: "A menu item".into(),
///     price_cents: price,
///     category: "Drinks".into(),
///     image: "img/item.png".into(),
/// };
/// let items = vec![OrderItem::new(item("a", 500), 2), OrderItem::new(item("b", 300), 1)];
/// assert_eq!(compute_total(&items).cents(), 1300);
/// ```
pub fn compute_total(items: &[OrderItem]) -> Money {
    items.iter().map(OrderItem::line_total).sum()
}

// =============================================================================
// Order State
// =============================================================================

/// Lifecycle state, derived from the order's timestamps.
///
/// ```text
/// OPEN ──serve──► SERVED ──close──► CLOSED (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum OrderState {
    /// Taken, not yet brought to the table.
    Open,
    /// Brought to the table, not yet paid.
    Served,
    /// Paid. Immutable from here on.
    Closed,
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderState::Open => write!(f, "open"),
            OrderState::Served => write!(f, "served"),
            OrderState::Closed => write!(f, "closed"),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A table's order.
///
/// ## Invariants
/// - `served_at` is set at most once
/// - `closed_at` is only set when `served_at` is already set
/// - `total_price_cents` = Σ(unit price × quantity) at the last (re)computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub items: Vec<OrderItem>,
    pub total_price_cents: i64,
    pub table_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub served_at: Option<DateTime<Utc>>,
    pub handled_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
}

impl Order {
    /// Builds a new, open order with a fresh id and a computed total.
    ///
    /// Items are expected to be validated already.
    pub fn new(table_id: impl Into<String>, items: Vec<OrderItem>, now: DateTime<Utc>) -> Self {
        let total = compute_total(&items);
        Order {
            id: Uuid::new_v4().to_string(),
            items,
            total_price_cents: total.cents(),
            table_id: table_id.into(),
            created_at: now,
            served_at: None,
            handled_by: None,
            closed_at: None,
            closed_by: None,
        }
    }

    /// Returns the frozen total as Money.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> OrderState {
        match (self.served_at, self.closed_at) {
            (_, Some(_)) => OrderState::Closed,
            (Some(_), None) => OrderState::Served,
            (None, None) => OrderState::Open,
        }
    }

    /// Checks that the order can be served.
    pub fn ensure_servable(&self) -> Result<(), CoreError> {
        self.ensure_state(OrderState::Open, "serve")
    }

    /// Checks that the order can be closed.
    pub fn ensure_closable(&self) -> Result<(), CoreError> {
        self.ensure_state(OrderState::Served, "close")
    }

    /// Checks that the order's items may still be replaced.
    pub fn ensure_editable(&self) -> Result<(), CoreError> {
        match self.state() {
            OrderState::Closed => Err(self.transition_error("update")),
            _ => Ok(()),
        }
    }

    fn ensure_state(&self, expected: OrderState, action: &'static str) -> Result<(), CoreError> {
        if self.state() == expected {
            Ok(())
        } else {
            Err(self.transition_error(action))
        }
    }

    fn transition_error(&self, action: &'static str) -> CoreError {
        CoreError::InvalidTransition {
            order_id: self.id.clone(),
            state: self.state(),
            action,
        }
    }
}

// =============================================================================
// Table Bill
// =============================================================================

/// The consolidated bill of a table's open orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderTotal {
    pub table_id: String,
    pub items: Vec<OrderItem>,
    pub total_price_cents: i64,
}

// =============================================================================
// Staff
// =============================================================================

/// Role of an authenticated staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StaffRole {
    Admin,
    Waiter,
    Cashier,
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaffRole::Admin => write!(f, "admin"),
            StaffRole::Waiter => write!(f, "waiter"),
            StaffRole::Cashier => write!(f, "cashier"),
        }
    }
}

impl FromStr for StaffRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(StaffRole::Admin),
            "waiter" => Ok(StaffRole::Waiter),
            "cashier" => Ok(StaffRole::Cashier),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}

/// The identity the transport adapter resolved for the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub staff_id: String,
    pub role: StaffRole,
}

impl Caller {
    pub fn new(staff_id: impl Into<String>, role: StaffRole) -> Self {
        Caller {
            staff_id: staff_id.into(),
            role,
        }
    }
}

// =============================================================================
// Listing
// =============================================================================

/// Optional filters for listing orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    /// `Some(true)` = only closed orders, `Some(false)` = only unclosed ones.
    pub closed: Option<bool>,
    /// `Some(true)` = only served orders, `Some(false)` = only unserved ones.
    pub served: Option<bool>,
    pub table_id: Option<String>,
    /// Calendar day (UTC) of `created_at`.
    pub date: Option<NaiveDate>,
}

/// Page selection for listings. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: u32, limit: u32) -> Self {
        PageRequest { page, limit }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// Pagination metadata returned next to a page of orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl PageMeta {
    pub fn new(total: u64, request: PageRequest) -> Self {
        let limit = u64::from(request.limit.max(1));
        PageMeta {
            total,
            page: request.page,
            limit: request.limit,
            total_pages: total.div_ceil(limit),
        }
    }
}

/// A page of orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub meta: PageMeta,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(id: &str, price_cents: i64) -> CatalogItemSnapshot {
        CatalogItemSnapshot {
            id: id.to_string(),
            name: "Flat White".to_string(),
            description: "Double shot with milk".to_string(),
            price_cents,
            category: "Coffee".to_string(),
            image: "img/flat-white.png".to_string(),
        }
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_total_price_is_exact() {
        let order = Order::new(
            "table-1",
            vec![
                OrderItem::new(snapshot("a", 500), 2),
                OrderItem::new(snapshot("b", 300), 1),
            ],
            at(9),
        );
        assert_eq!(order.total_price_cents, 1300);
        assert_eq!(order.state(), OrderState::Open);
    }

    #[test]
    fn test_state_follows_timestamps() {
        let mut order = Order::new("table-1", vec![OrderItem::new(snapshot("a", 500), 1)], at(9));
        assert!(order.ensure_servable().is_ok());
        assert!(order.ensure_closable().is_err());

        order.served_at = Some(at(10));
        assert_eq!(order.state(), OrderState::Served);
        assert!(order.ensure_servable().is_err());
        assert!(order.ensure_closable().is_ok());
        assert!(order.ensure_editable().is_ok());

        order.closed_at = Some(at(11));
        assert_eq!(order.state(), OrderState::Closed);
        assert!(order.ensure_closable().is_err());
        assert!(matches!(
            order.ensure_editable(),
            Err(CoreError::InvalidTransition { action: "update", .. })
        ));
    }

    #[test]
    fn test_staff_role_from_str() {
        assert_eq!("Admin".parse::<StaffRole>().unwrap(), StaffRole::Admin);
        assert_eq!("waiter".parse::<StaffRole>().unwrap(), StaffRole::Waiter);
        assert!("barista".parse::<StaffRole>().is_err());
    }

    #[test]
    fn test_page_meta() {
        let meta = PageMeta::new(41, PageRequest::new(2, 20));
        assert_eq!(meta.total_pages, 3);
        assert_eq!(PageRequest::new(3, 20).offset(), 40);
        assert_eq!(PageMeta::new(0, PageRequest::default()).total_pages, 0);
    }
}
