//! Persistence for every entity the API exposes.
//!
//! [`EntityStore`] is implemented by [`RedisStore`] for deployments and by
//! [`MemoryStore`] for tests and throwaway local runs. Operations that must
//! be atomic per user (adding to a cart, checkout) are single trait methods
//! so each backend can run them inside its own transaction.

mod memory;
mod redis_store;

use chrono::NaiveDate;
use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

use crate::cart::{CartAddition, CartItem};
use crate::menu::{Category, MenuItem, NewCategory, NewMenuItem};
use crate::order::Order;
use crate::role::Role;
use crate::user::{NewUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("corrupt record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Conflict(String),

    #[error("cart row would hold more than {0} items")]
    QuantityLimit(u32),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait EntityStore: Send + Sync {
    /// Creates a category.
    ///
    /// # Arguments
    /// * `new` - Slug and title of the category
    ///
    /// # Returns
    /// * `StoreResult<Category>` - The stored category, or
    ///   [`StoreError::Conflict`] if the slug is taken
    fn create_category(&self, new: NewCategory) -> StoreResult<Category>;
    fn list_categories(&self) -> StoreResult<Vec<Category>>;
    fn get_category(&self, id: u64) -> StoreResult<Option<Category>>;

    fn create_menu_item(&self, new: NewMenuItem) -> StoreResult<MenuItem>;
    /// All menu items in id order.
    fn list_menu_items(&self) -> StoreResult<Vec<MenuItem>>;
    fn get_menu_item(&self, id: u64) -> StoreResult<Option<MenuItem>>;
    /// Overwrites an existing menu item.
    ///
    /// # Arguments
    /// * `item` - The full replacement record; its `id` picks the item
    ///
    /// # Returns
    /// * `StoreResult<bool>` - False if the item no longer exists, in which
    ///   case nothing is written
    fn update_menu_item(&self, item: &MenuItem) -> StoreResult<bool>;
    /// Returns false if there was nothing to delete.
    fn delete_menu_item(&self, id: u64) -> StoreResult<bool>;

    /// Creates a user.
    ///
    /// # Arguments
    /// * `new` - The account, with its password already hashed
    ///
    /// # Returns
    /// * `StoreResult<User>` - The stored user, or [`StoreError::Conflict`]
    ///   if the username is taken
    fn create_user(&self, new: NewUser) -> StoreResult<User>;
    fn get_user(&self, id: u64) -> StoreResult<Option<User>>;
    fn find_user(&self, username: &str) -> StoreResult<Option<User>>;
    /// Returns false if the user was already a member.
    fn add_role(&self, user_id: u64, role: Role) -> StoreResult<bool>;
    /// Returns false if the user was not a member.
    fn remove_role(&self, user_id: u64, role: Role) -> StoreResult<bool>;
    /// Members of `role`, in id order.
    fn users_with_role(&self, role: Role) -> StoreResult<Vec<User>>;

    fn save_token(&self, token: &str, user_id: u64) -> StoreResult<()>;
    fn user_for_token(&self, token: &str) -> StoreResult<Option<u64>>;

    /// The user's cart rows in id order.
    fn cart(&self, user_id: u64) -> StoreResult<Vec<CartItem>>;
    /// Adds to the user's row for this menu item, creating it if needed.
    ///
    /// # Arguments
    /// * `user_id` - Owner of the cart
    /// * `menu_item` - The item being added; its price becomes the unit
    ///   price when the row is created
    /// * `addition` - Validated quantity to add
    ///
    /// # Returns
    /// * `StoreResult<CartItem>` - The row after the change, or
    ///   [`StoreError::QuantityLimit`] if the merged quantity would pass
    ///   [`MAX_QUANTITY`](crate::cart::MAX_QUANTITY)
    fn add_to_cart(
        &self,
        user_id: u64,
        menu_item: &MenuItem,
        addition: CartAddition,
    ) -> StoreResult<CartItem>;
    /// Returns how many rows were removed.
    fn clear_cart(&self, user_id: u64) -> StoreResult<usize>;

    /// Turns the user's cart into an order.
    ///
    /// Reading the cart, writing the order with its items and emptying the
    /// cart happen atomically, so two concurrent checkouts never consume
    /// the same rows.
    ///
    /// # Arguments
    /// * `user_id` - The customer checking out
    /// * `date` - Date recorded on the order
    ///
    /// # Returns
    /// * `StoreResult<Order>` - The new, unassigned order
    fn checkout(&self, user_id: u64, date: NaiveDate) -> StoreResult<Order>;
    /// All orders in id order.
    fn list_orders(&self) -> StoreResult<Vec<Order>>;
    fn get_order(&self, id: u64) -> StoreResult<Option<Order>>;
    /// Applies `change` to the current copy of an order and saves it.
    ///
    /// # Arguments
    /// * `id` - The order to change
    /// * `change` - Edit applied to the freshest stored version; may run
    ///   more than once if the order is written concurrently
    ///
    /// # Returns
    /// * `StoreResult<Option<Order>>` - The saved order, or `None` if it
    ///   no longer exists
    fn update_order(&self, id: u64, change: &dyn Fn(&mut Order)) -> StoreResult<Option<Order>>;
    /// Removes the order together with its items.
    fn delete_order(&self, id: u64) -> StoreResult<bool>;
}
