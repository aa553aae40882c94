//! # Table Bill
//!
//! Consolidates every open order of a table into a single bill.
//!
//! ```text
//! Order A: Latte ×2, Muffin ×1 ─┐
//!                               ├──► Latte ×3, Muffin ×1, Tea ×2
//! Order B: Latte ×1, Tea ×2 ────┘     total recomputed from merged lines
//! ```
//!
//! Lines are deduplicated by catalog item id and keep the position of the
//! first order that mentioned them. The snapshot (and so the unit price) of
//! that first occurrence is the one billed.

use std::collections::HashMap;

use crate::types::{compute_total, Order, OrderItem, OrderTotal};

/// Merges the items of `orders` into one bill for `table_id`.
///
/// The result does not depend on how the same catalog item is split across
/// orders. No orders yields an empty, zero-priced bill.
pub fn merge_table_orders(table_id: &str, orders: &[Order]) -> OrderTotal {
    let mut items: Vec<OrderItem> = Vec::new();
    let mut index_by_item: HashMap<&str, usize> = HashMap::new();

    for line in orders.iter().flat_map(|order| order.items.iter()) {
        match index_by_item.get(line.item.id.as_str()) {
            Some(&idx) => items[idx].quantity += line.quantity,
            None => {
                index_by_item.insert(line.item.id.as_str(), items.len());
                items.push(line.clone());
            }
        }
    }

    let total = compute_total(&items);

    OrderTotal {
        table_id: table_id.to_string(),
        items,
        total_price_cents: total.cents(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CatalogItemSnapshot;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn snapshot(id: u8) -> CatalogItemSnapshot {
        CatalogItemSnapshot {
            id: format!("item-{id}"),
            name: format!("Item {id}"),
            description: "Something on the menu".to_string(),
            price_cents: (i64::from(id) + 1) * 150,
            category: "Menu".to_string(),
            image: format!("img/{id}.png"),
        }
    }

    fn order(lines: &[(u8, i64)]) -> Order {
        let items = lines
            .iter()
            .map(|&(id, qty)| OrderItem::new(snapshot(id), qty))
            .collect();
        Order::new("table-7", items, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_merges_overlapping_items() {
        let orders = vec![order(&[(0, 2), (1, 1)]), order(&[(0, 1), (2, 2)])];
        let bill = merge_table_orders("table-7", &orders);

        let quantities: Vec<(String, i64)> = bill
            .items
            .iter()
            .map(|l| (l.item.id.clone(), l.quantity))
            .collect();
        assert_eq!(
            quantities,
            vec![
                ("item-0".to_string(), 3),
                ("item-1".to_string(), 1),
                ("item-2".to_string(), 2),
            ]
        );
        // 3×150 + 1×300 + 2×450
        assert_eq!(bill.total_price_cents, 1650);
    }

    #[test]
    fn test_no_orders_is_an_empty_bill() {
        let bill = merge_table_orders("table-7", &[]);
        assert_eq!(bill.table_id, "table-7");
        assert!(bill.items.is_empty());
        assert_eq!(bill.total_price_cents, 0);
    }

    proptest! {
        #[test]
        fn merged_quantities_equal_sums(
            orders in prop::collection::vec(
                prop::collection::vec((0u8..6, 1i64..10), 1..5),
                0..6,
            )
        ) {
            let built: Vec<Order> = orders.iter().map(|lines| order(lines)).collect();
            let bill = merge_table_orders("table-7", &built);

            let mut expected: HashMap<String, i64> = HashMap::new();
            for lines in &orders {
                for &(id, qty) in lines {
                    *expected.entry(format!("item-{id}")).or_default() += qty;
                }
            }

            prop_assert_eq!(bill.items.len(), expected.len());
            for line in &bill.items {
                prop_assert_eq!(Some(&line.quantity), expected.get(&line.item.id));
            }

            let split_total: i64 = built.iter().map(|o| o.total_price_cents).sum();
            prop_assert_eq!(bill.total_price_cents, split_total);
        }
    }
}
