use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use super::{EntityStore, StoreError, StoreResult};
use crate::cart::{self, CartAddition, CartItem};
use crate::checkout;
use crate::menu::{Category, MenuItem, NewCategory, NewMenuItem};
use crate::order::Order;
use crate::role::Role;
use crate::user::{NewUser, User};

#[derive(Default)]
struct Tables {
    next_id: HashMap<&'static str, u64>,
    categories: BTreeMap<u64, Category>,
    menu_items: BTreeMap<u64, MenuItem>,
    users: BTreeMap<u64, User>,
    tokens: HashMap<String, u64>,
    carts: BTreeMap<u64, CartItem>,
    orders: BTreeMap<u64, Order>,
}

impl Tables {
    fn allocate(&mut self, table: &'static str, count: u64) -> u64 {
        let counter = self.next_id.entry(table).or_insert(0);
        let first = *counter + 1;
        *counter += count;
        first
    }
}

/// Everything in one mutex; each trait call is one critical section.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl EntityStore for MemoryStore {
    fn create_category(&self, new: NewCategory) -> StoreResult<Category> {
        let mut tables = self.lock()?;
        if tables.categories.values().any(|c| c.slug == new.slug) {
            return Err(StoreError::Conflict(format!(
                "category with slug \"{}\" already exists",
                new.slug
            )));
        }
        let id = tables.allocate("categories", 1);
        let category = Category {
            id,
            slug: new.slug,
            title: new.title,
        };
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.lock()?.categories.values().cloned().collect())
    }

    fn get_category(&self, id: u64) -> StoreResult<Option<Category>> {
        Ok(self.lock()?.categories.get(&id).cloned())
    }

    fn create_menu_item(&self, new: NewMenuItem) -> StoreResult<MenuItem> {
        let mut tables = self.lock()?;
        let id = tables.allocate("menu_items", 1);
        let item = new.with_id(id);
        tables.menu_items.insert(id, item.clone());
        Ok(item)
    }

    fn list_menu_items(&self) -> StoreResult<Vec<MenuItem>> {
        Ok(self.lock()?.menu_items.values().cloned().collect())
    }

    fn get_menu_item(&self, id: u64) -> StoreResult<Option<MenuItem>> {
        Ok(self.lock()?.menu_items.get(&id).cloned())
    }

    fn update_menu_item(&self, item: &MenuItem) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        let Some(stored) = tables.menu_items.get_mut(&item.id) else {
            return Ok(false);
        };
        *stored = item.clone();
        Ok(true)
    }

    fn delete_menu_item(&self, id: u64) -> StoreResult<bool> {
        Ok(self.lock()?.menu_items.remove(&id).is_some())
    }

    fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.username == new.username) {
            return Err(StoreError::Conflict(
                "A user with that username already exists.".to_string(),
            ));
        }
        let id = tables.allocate("users", 1);
        let user = new.with_id(id);
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    fn get_user(&self, id: u64) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    fn find_user(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    fn add_role(&self, user_id: u64, role: Role) -> StoreResult<bool> {
        Ok(self
            .lock()?
            .users
            .get_mut(&user_id)
            .map(|user| user.roles.insert(role))
            .unwrap_or(false))
    }

    fn remove_role(&self, user_id: u64, role: Role) -> StoreResult<bool> {
        Ok(self
            .lock()?
            .users
            .get_mut(&user_id)
            .map(|user| user.roles.remove(role))
            .unwrap_or(false))
    }

    fn users_with_role(&self, role: Role) -> StoreResult<Vec<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .filter(|u| u.roles.contains(role))
            .cloned()
            .collect())
    }

    fn save_token(&self, token: &str, user_id: u64) -> StoreResult<()> {
        self.lock()?.tokens.insert(token.to_string(), user_id);
        Ok(())
    }

    fn user_for_token(&self, token: &str) -> StoreResult<Option<u64>> {
        Ok(self.lock()?.tokens.get(token).copied())
    }

    fn cart(&self, user_id: u64) -> StoreResult<Vec<CartItem>> {
        Ok(self
            .lock()?
            .carts
            .values()
            .filter(|row| row.user == user_id)
            .cloned()
            .collect())
    }

    fn add_to_cart(
        &self,
        user_id: u64,
        menu_item: &MenuItem,
        addition: CartAddition,
    ) -> StoreResult<CartItem> {
        let mut tables = self.lock()?;
        let existing = tables
            .carts
            .values_mut()
            .find(|row| row.user == user_id && row.menu_item == menu_item.id);
        if let Some(row) = existing {
            row.quantity = cart::merged_quantity(row.quantity, addition.quantity)
                .ok_or(StoreError::QuantityLimit(cart::MAX_QUANTITY))?;
            return Ok(row.clone());
        }

        let id = tables.allocate("carts", 1);
        let row = CartItem {
            id,
            user: user_id,
            menu_item: menu_item.id,
            quantity: addition.quantity,
            unit_price: menu_item.price,
        };
        tables.carts.insert(id, row.clone());
        Ok(row)
    }

    fn clear_cart(&self, user_id: u64) -> StoreResult<usize> {
        let mut tables = self.lock()?;
        let before = tables.carts.len();
        tables.carts.retain(|_, row| row.user != user_id);
        Ok(before - tables.carts.len())
    }

    fn checkout(&self, user_id: u64, date: NaiveDate) -> StoreResult<Order> {
        let mut tables = self.lock()?;
        let rows: Vec<CartItem> = tables
            .carts
            .values()
            .filter(|row| row.user == user_id)
            .cloned()
            .collect();

        let draft = checkout::draft(user_id, &rows, date);
        let order_id = tables.allocate("orders", 1);
        let first_item = tables.allocate("order_items", draft.item_count());
        let order = draft.persist(order_id, first_item - 1);

        tables.orders.insert(order_id, order.clone());
        tables.carts.retain(|_, row| row.user != user_id);
        Ok(order)
    }

    fn list_orders(&self) -> StoreResult<Vec<Order>> {
        Ok(self.lock()?.orders.values().cloned().collect())
    }

    fn get_order(&self, id: u64) -> StoreResult<Option<Order>> {
        Ok(self.lock()?.orders.get(&id).cloned())
    }

    fn update_order(&self, id: u64, change: &dyn Fn(&mut Order)) -> StoreResult<Option<Order>> {
        let mut tables = self.lock()?;
        Ok(tables.orders.get_mut(&id).map(|order| {
            change(order);
            order.clone()
        }))
    }

    fn delete_order(&self, id: u64) -> StoreResult<bool> {
        Ok(self.lock()?.orders.remove(&id).is_some())
    }
}
