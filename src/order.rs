use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppResult;
use crate::listing::SortKey;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Order {
    pub id: u64,
    pub user: u64,
    pub delivery_crew: Option<u64>,
    pub status: bool,
    pub total: Decimal,
    pub date: NaiveDate,
    pub order_items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderItem {
    pub id: u64,
    pub order: u64,
    pub menu_item: u64,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub price: Decimal,
}

/// Fields an order detail request may carry. Absent fields are left alone;
/// `delivery_crew: null` unassigns.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct OrderPatch {
    #[serde(default, deserialize_with = "present")]
    pub delivery_crew: Option<Option<u64>>,
    pub status: Option<bool>,
    pub date: Option<NaiveDate>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A patchable order field, used when reporting what a role may not touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    DeliveryCrew,
    Status,
    Date,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    pub fn fields(&self) -> Vec<OrderField> {
        let mut fields = Vec::new();
        if self.delivery_crew.is_some() {
            fields.push(OrderField::DeliveryCrew);
        }
        if self.status.is_some() {
            fields.push(OrderField::Status);
        }
        if self.date.is_some() {
            fields.push(OrderField::Date);
        }
        fields
    }

    pub fn apply(&self, order: &mut Order) {
        if let Some(crew) = self.delivery_crew {
            order.delivery_crew = crew;
        }
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(date) = self.date {
            order.date = date;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSortField {
    Date,
    Total,
}

impl FromStr for OrderSortField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "date" => Ok(OrderSortField::Date),
            "total" => Ok(OrderSortField::Total),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<bool>,
    pub ordering: Option<String>,
}

impl OrderQuery {
    pub fn apply(&self, mut orders: Vec<Order>) -> AppResult<Vec<Order>> {
        let sort = SortKey::<OrderSortField>::parse(self.ordering.as_deref())?;
        if let Some(status) = self.status {
            orders.retain(|order| order.status == status);
        }
        orders.sort_by_key(|order| order.id);
        if let Some(sort) = sort {
            orders.sort_by(|a, b| {
                let ordering = match sort.field {
                    OrderSortField::Date => a.date.cmp(&b.date),
                    OrderSortField::Total => a.total.cmp(&b.total),
                };
                sort.direct(ordering)
            });
        }
        Ok(orders)
    }
}
