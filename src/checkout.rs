//! Turning a cart into an order.
//!
//! [`draft`] does the arithmetic; the store implementations call it while
//! holding their transaction so that reading the cart, writing the order and
//! draining the cart happen as one unit.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::cart::CartItem;
use crate::order::{Order, OrderItem};

#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub menu_item: u64,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub price: Decimal,
}

/// An order that has not been given ids yet.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub user: u64,
    pub date: NaiveDate,
    pub total: Decimal,
    pub items: Vec<ItemDraft>,
}

/// Builds the order for `user` from their cart rows. An empty cart yields an
/// order with no items and a zero total.
pub fn draft(user: u64, cart: &[CartItem], date: NaiveDate) -> OrderDraft {
    let mut rows: Vec<&CartItem> = cart.iter().filter(|row| row.user == user).collect();
    rows.sort_by_key(|row| row.id);

    let items: Vec<ItemDraft> = rows
        .into_iter()
        .map(|row| ItemDraft {
            menu_item: row.menu_item,
            quantity: row.quantity,
            unit_price: row.unit_price,
            price: row.price(),
        })
        .collect();
    let total = items.iter().map(|item| item.price).sum();

    OrderDraft {
        user,
        date,
        total,
        items,
    }
}

impl OrderDraft {
    /// Number of item ids [`OrderDraft::persist`] will consume.
    pub fn item_count(&self) -> u64 {
        self.items.len() as u64
    }

    /// Assigns the order id and consecutive item ids starting after
    /// `last_item_id`. The new order is unassigned and unfulfilled.
    pub fn persist(self, order_id: u64, last_item_id: u64) -> Order {
        let order_items = self
            .items
            .into_iter()
            .zip(last_item_id + 1..)
            .map(|(item, id)| OrderItem {
                id,
                order: order_id,
                menu_item: item.menu_item,
                quantity: item.quantity,
                unit_price: item.unit_price,
                price: item.price,
            })
            .collect();

        Order {
            id: order_id,
            user: self.user,
            delivery_crew: None,
            status: false,
            total: self.total,
            date: self.date,
            order_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn row(id: u64, user: u64, menu_item: u64, quantity: u32, cents: i64) -> CartItem {
        CartItem {
            id,
            user,
            menu_item,
            quantity,
            unit_price: Decimal::new(cents, 2),
        }
    }

    #[test]
    fn pizza_example() {
        let cart = vec![row(1, 7, 42, 2, 1000)];
        let order = draft(7, &cart, today()).persist(1, 0);

        assert_eq!(order.total, Decimal::new(20, 0));
        assert!(!order.status);
        assert_eq!(order.delivery_crew, None);
        assert_eq!(order.order_items.len(), 1);
        let item = &order.order_items[0];
        assert_eq!((item.menu_item, item.quantity), (42, 2));
        assert_eq!(item.price, Decimal::new(20, 0));
        assert_eq!(item.order, 1);
    }

    #[test]
    fn total_is_sum_of_line_prices() {
        let cart = vec![
            row(1, 7, 1, 3, 450),
            row(2, 7, 2, 1, 1299),
            row(3, 8, 3, 5, 100),
        ];
        let draft = draft(7, &cart, today());
        let expected: Decimal = cart
            .iter()
            .filter(|r| r.user == 7)
            .map(|r| r.unit_price * Decimal::from(r.quantity))
            .sum();

        assert_eq!(draft.total, expected);
        assert_eq!(draft.item_count(), 2);
    }

    #[test]
    fn empty_cart_gives_empty_order() {
        let order = draft(7, &[], today()).persist(3, 10);
        assert!(order.order_items.is_empty());
        assert_eq!(order.total, Decimal::ZERO);
    }

    #[test]
    fn item_ids_continue_from_counter() {
        let cart = vec![row(5, 7, 1, 1, 100), row(2, 7, 2, 1, 100)];
        let order = draft(7, &cart, today()).persist(4, 10);
        let ids: Vec<(u64, u64)> = order
            .order_items
            .iter()
            .map(|i| (i.id, i.menu_item))
            .collect();
        assert_eq!(ids, vec![(11, 2), (12, 1)]);
    }
}
