//! Reconciliation of a client-held cart against current prices and stock.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, models::tyre::Tyre};

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CartItem {
    #[serde(alias = "tyreId")]
    pub tyre_id: Uuid,
    pub quantity: i32,
}

/// What reconciliation needs to know about a catalog entry.
pub trait StockedItem: Clone {
    fn stock(&self) -> i32;
    /// Unit price in paise.
    fn price(&self) -> i64;
}

impl StockedItem for Tyre {
    fn stock(&self) -> i32 {
        Self::stock(self)
    }
    fn price(&self) -> i64 {
        Self::price(self)
    }
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct CartLine<T> {
    pub tyre: T,
    pub quantity: i32,
    /// Unit price in paise.
    pub unit_price: i64,
    pub line_total: i64,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartAdjustment {
    /// The tyre no longer exists.
    Removed { tyre_id: Uuid },
    /// The tyre exists but has no stock.
    OutOfStock { tyre_id: Uuid },
    /// The quantity was clamped to what is available.
    QuantityChanged {
        tyre_id: Uuid,
        requested: i32,
        quantity: i32,
    },
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct ReconciledCart<T> {
    pub items: Vec<CartLine<T>>,
    pub total: i64,
    pub adjustments: Vec<CartAdjustment>,
}

/// Merge lines for the same tyre, keeping first-seen order.
pub fn merge_lines(items: &[CartItem]) -> Vec<CartItem> {
    let mut merged: Vec<CartItem> = Vec::with_capacity(items.len());
    for item in items {
        if let Some(existing) = merged.iter_mut().find(|line| line.tyre_id == item.tyre_id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            merged.push(*item);
        }
    }
    merged
}

/// Reconcile `items` against the current catalog. Duplicate lines for the
/// same tyre are merged first.
pub fn reconcile<T: StockedItem>(
    items: &[CartItem],
    catalog: &HashMap<Uuid, T>,
) -> ReconciledCart<T> {
    let merged = merge_lines(items);
    let mut lines = Vec::with_capacity(merged.len());
    let mut adjustments = Vec::new();
    for item in merged {
        let Some(tyre) = catalog.get(&item.tyre_id) else {
            adjustments.push(CartAdjustment::Removed {
                tyre_id: item.tyre_id,
            });
            continue;
        };
        if tyre.stock() <= 0 {
            adjustments.push(CartAdjustment::OutOfStock {
                tyre_id: item.tyre_id,
            });
            continue;
        }
        let quantity = item.quantity.clamp(1, tyre.stock());
        if quantity != item.quantity {
            adjustments.push(CartAdjustment::QuantityChanged {
                tyre_id: item.tyre_id,
                requested: item.quantity,
                quantity,
            });
        }
        let unit_price = tyre.price();
        lines.push(CartLine {
            tyre: tyre.clone(),
            quantity,
            unit_price,
            line_total: unit_price.saturating_mul(i64::from(quantity)),
        });
    }
    // Saturates like the line totals; checkout rejects totals this large.
    let total = lines
        .iter()
        .fold(0_i64, |total, line| total.saturating_add(line.line_total));
    ReconciledCart {
        items: lines,
        total,
        adjustments,
    }
}

/// Load the tyres referenced by the cart and reconcile it.
pub async fn validate(
    items: &[CartItem],
    db_conn: &db::ConnectionPool,
) -> Result<ReconciledCart<Tyre>, db::errors::DatabaseError> {
    let ids: Vec<Uuid> = items.iter().map(|item| item.tyre_id).collect();
    let catalog = if ids.is_empty() {
        HashMap::new()
    } else {
        Tyre::select_many(&ids, db_conn)
            .await?
            .into_iter()
            .map(|tyre| (tyre.id(), tyre))
            .collect()
    };
    Ok(reconcile(items, &catalog))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Stock {
        stock: i32,
        price: i64,
    }

    impl StockedItem for Stock {
        fn stock(&self) -> i32 {
            self.stock
        }
        fn price(&self) -> i64 {
            self.price
        }
    }

    fn item(tyre_id: Uuid, quantity: i32) -> CartItem {
        CartItem { tyre_id, quantity }
    }

    #[test]
    fn prices_lines_from_the_catalog() {
        let id = Uuid::new_v4();
        let catalog = HashMap::from([(id, Stock { stock: 10, price: 450_000 })]);
        let cart = reconcile(&[item(id, 2)], &catalog);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].line_total, 900_000);
        assert_eq!(cart.total, 900_000);
        assert!(cart.adjustments.is_empty());
    }

    #[test]
    fn drops_missing_and_out_of_stock_tyres() {
        let gone = Uuid::new_v4();
        let empty = Uuid::new_v4();
        let catalog = HashMap::from([(empty, Stock { stock: 0, price: 100 })]);
        let cart = reconcile(&[item(gone, 1), item(empty, 1)], &catalog);
        assert!(cart.items.is_empty());
        assert_eq!(cart.total, 0);
        assert_eq!(
            cart.adjustments,
            vec![
                CartAdjustment::Removed { tyre_id: gone },
                CartAdjustment::OutOfStock { tyre_id: empty },
            ]
        );
    }

    #[test]
    fn clamps_quantity_to_stock_and_minimum_one() {
        let low = Uuid::new_v4();
        let zero = Uuid::new_v4();
        let catalog = HashMap::from([
            (low, Stock { stock: 3, price: 1_000 }),
            (zero, Stock { stock: 5, price: 500 }),
        ]);
        let cart = reconcile(&[item(low, 8), item(zero, 0)], &catalog);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.items[1].quantity, 1);
        assert_eq!(cart.total, 3_500);
        assert_eq!(
            cart.adjustments[0],
            CartAdjustment::QuantityChanged {
                tyre_id: low,
                requested: 8,
                quantity: 3
            }
        );
    }

    #[test]
    fn merges_duplicate_lines() {
        let id = Uuid::new_v4();
        let catalog = HashMap::from([(id, Stock { stock: 10, price: 100 })]);
        let cart = reconcile(&[item(id, 2), item(id, 3)], &catalog);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
    }

    #[test]
    fn huge_totals_saturate() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let price = i64::MAX / 2 + 1;
        let catalog = HashMap::from([
            (first, Stock { stock: 1, price }),
            (second, Stock { stock: 1, price }),
        ]);
        let cart = reconcile(&[item(first, 1), item(second, 1)], &catalog);
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.total, i64::MAX);
    }
}
