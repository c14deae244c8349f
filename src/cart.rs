use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, FieldErrors};

pub const MAX_QUANTITY: u32 = 1_000;

/// One pending line of a user's cart. The line price is derived on read.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CartItem {
    pub id: u64,
    pub user: u64,
    pub menu_item: u64,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl CartItem {
    pub fn price(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Quantity of a cart row once `added` more are put in, or `None` when that
/// would go past [`MAX_QUANTITY`].
pub fn merged_quantity(current: u32, added: u32) -> Option<u32> {
    current.checked_add(added).filter(|q| *q <= MAX_QUANTITY)
}

fn over_limit_message() -> String {
    format!("Ensure this value is less than or equal to {MAX_QUANTITY}.")
}

/// Field error for a cart row that would hold more than [`MAX_QUANTITY`].
pub fn quantity_limit_error() -> AppError {
    let mut errors = FieldErrors::new();
    errors.add("quantity", over_limit_message());
    AppError::Validation(errors)
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CartItemView {
    pub id: u64,
    pub menu_item: u64,
    pub quantity: u32,
    pub user: u64,
    pub unit_price: Decimal,
    pub price: Decimal,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        CartItemView {
            id: item.id,
            menu_item: item.menu_item,
            quantity: item.quantity,
            user: item.user,
            unit_price: item.unit_price,
            price: item.price(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CartInput {
    pub menu_item: Option<u64>,
    pub quantity: Option<u32>,
}

/// A validated request to put `quantity` of `menu_item` into the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartAddition {
    pub menu_item: u64,
    pub quantity: u32,
}

impl CartInput {
    pub fn validate(self) -> AppResult<CartAddition> {
        let mut errors = FieldErrors::new();
        let menu_item = errors.require("menu_item", self.menu_item);
        let quantity = self.quantity.unwrap_or(1);
        if quantity < 1 {
            errors.add("quantity", "Ensure this value is greater than or equal to 1.");
        } else if quantity > MAX_QUANTITY {
            errors.add("quantity", over_limit_message());
        }

        let Some(menu_item) = menu_item else {
            return Err(AppError::Validation(errors));
        };
        errors.into_result()?;
        Ok(CartAddition {
            menu_item,
            quantity,
        })
    }
}
