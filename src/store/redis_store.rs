use chrono::NaiveDate;
use redis::{Client, Commands, Connection, ErrorKind, RedisError, RedisResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{EntityStore, StoreError, StoreResult};
use crate::cart::{self, CartAddition, CartItem};
use crate::checkout;
use crate::menu::{Category, MenuItem, NewCategory, NewMenuItem};
use crate::order::Order;
use crate::role::Role;
use crate::user::{NewUser, User};

const CATEGORIES: &str = "categories";
const MENU_ITEMS: &str = "menu_items";
const USERS: &str = "users";
const ORDERS: &str = "orders";
const CART_ROWS: &str = "cart_rows";
const ORDER_ITEMS: &str = "order_items";

fn counter(table: &str) -> String {
    format!("next_id:{table}")
}

fn record(table: &str, id: u64) -> String {
    format!("{table}:{id}")
}

fn cart_key(user_id: u64) -> String {
    format!("cart:{user_id}")
}

fn group_key(role: Role) -> String {
    format!("group:{}", role.key())
}

fn username_key(username: &str) -> String {
    format!("username:{username}")
}

fn slug_key(slug: &str) -> String {
    format!("category_slug:{slug}")
}

fn token_key(token: &str) -> String {
    format!("token:{token}")
}

// Used inside `redis::transaction` closures, which can only fail with a
// `RedisError`.
fn decode<T: DeserializeOwned>(json: &str) -> RedisResult<T> {
    serde_json::from_str(json).map_err(|e| {
        RedisError::from((ErrorKind::TypeError, "corrupt record", e.to_string()))
    })
}

fn encode<T: Serialize>(value: &T) -> RedisResult<String> {
    serde_json::to_string(value).map_err(|e| {
        RedisError::from((ErrorKind::TypeError, "unserializable record", e.to_string()))
    })
}

/// Entity store backed by Redis. Records are JSON strings under
/// `<table>:<id>`, each table has a set of live ids, carts are hashes keyed
/// by menu item id.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
}

impl RedisStore {
    /// Creates a new RedisStore instance.
    ///
    /// # Arguments
    /// * `client` - Redis client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a store for the server at `url`. No connection is made until
    /// the first call.
    ///
    /// # Arguments
    /// * `url` - Connection URL, e.g. `redis://127.0.0.1/`
    ///
    /// # Returns
    /// * `StoreResult<Self>` - The store, or an error if the URL is invalid
    pub fn open(url: &str) -> StoreResult<Self> {
        Ok(Self::new(Client::open(url)?))
    }

    /// Gets a connection from the Redis client.
    ///
    /// # Returns
    /// * `StoreResult<Connection>` - A Redis connection or an error
    pub fn get_connection(&self) -> StoreResult<Connection> {
        Ok(self.client.get_connection()?)
    }

    fn next_id(conn: &mut Connection, table: &str) -> StoreResult<u64> {
        Ok(conn.incr(counter(table), 1)?)
    }

    fn load<T: DeserializeOwned>(conn: &mut Connection, key: &str) -> StoreResult<Option<T>> {
        let json: Option<String> = conn.get(key)?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn load_all<T: DeserializeOwned>(conn: &mut Connection, table: &str) -> StoreResult<Vec<T>> {
        let mut ids: Vec<u64> = conn.smembers(table)?;
        ids.sort_unstable();
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(value) = Self::load(conn, &record(table, id))? {
                records.push(value);
            }
        }
        Ok(records)
    }

    fn insert<T: Serialize>(
        conn: &mut Connection,
        table: &str,
        id: u64,
        value: &T,
    ) -> StoreResult<()> {
        let json = serde_json::to_string(value)?;
        redis::pipe()
            .atomic()
            .set(record(table, id), json)
            .ignore()
            .sadd(table, id)
            .ignore()
            .query::<()>(conn)?;
        Ok(())
    }

    fn remove(conn: &mut Connection, table: &str, id: u64) -> StoreResult<bool> {
        let (deleted,): (u64,) = redis::pipe()
            .atomic()
            .del(record(table, id))
            .srem(table, id)
            .ignore()
            .query(conn)?;
        Ok(deleted > 0)
    }

    /// Read-modify-write of a user record, retried if it changes underneath.
    fn modify_roles(
        &self,
        user_id: u64,
        role: Role,
        change: fn(&mut User, Role) -> bool,
    ) -> StoreResult<bool> {
        let mut conn = self.get_connection()?;
        let key = record(USERS, user_id);
        let changed = redis::transaction(&mut conn, &[key.as_str()], |conn, pipe| {
            let json: Option<String> = conn.get(&key)?;
            let Some(json) = json else {
                return Ok(Some(false));
            };
            let mut user: User = decode(&json)?;
            if !change(&mut user, role) {
                return Ok(Some(false));
            }
            pipe.set(&key, encode(&user)?).ignore();
            if user.roles.contains(role) {
                pipe.sadd(group_key(role), user_id).ignore();
            } else {
                pipe.srem(group_key(role), user_id).ignore();
            }
            let done: Option<()> = pipe.query(conn)?;
            Ok(done.map(|()| true))
        })?;
        Ok(changed)
    }
}

impl EntityStore for RedisStore {
    fn create_category(&self, new: NewCategory) -> StoreResult<Category> {
        let mut conn = self.get_connection()?;
        let id = Self::next_id(&mut conn, CATEGORIES)?;
        let claimed: bool = conn.set_nx(slug_key(&new.slug), id)?;
        if !claimed {
            return Err(StoreError::Conflict(format!(
                "category with slug \"{}\" already exists",
                new.slug
            )));
        }
        let category = Category {
            id,
            slug: new.slug,
            title: new.title,
        };
        Self::insert(&mut conn, CATEGORIES, id, &category)?;
        Ok(category)
    }

    fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Self::load_all(&mut self.get_connection()?, CATEGORIES)
    }

    fn get_category(&self, id: u64) -> StoreResult<Option<Category>> {
        Self::load(&mut self.get_connection()?, &record(CATEGORIES, id))
    }

    fn create_menu_item(&self, new: NewMenuItem) -> StoreResult<MenuItem> {
        let mut conn = self.get_connection()?;
        let id = Self::next_id(&mut conn, MENU_ITEMS)?;
        let item = new.with_id(id);
        Self::insert(&mut conn, MENU_ITEMS, id, &item)?;
        Ok(item)
    }

    fn list_menu_items(&self) -> StoreResult<Vec<MenuItem>> {
        Self::load_all(&mut self.get_connection()?, MENU_ITEMS)
    }

    fn get_menu_item(&self, id: u64) -> StoreResult<Option<MenuItem>> {
        Self::load(&mut self.get_connection()?, &record(MENU_ITEMS, id))
    }

    fn update_menu_item(&self, item: &MenuItem) -> StoreResult<bool> {
        let mut conn = self.get_connection()?;
        let key = record(MENU_ITEMS, item.id);
        let json = serde_json::to_string(item)?;
        let updated = redis::transaction(&mut conn, &[key.as_str()], |conn, pipe| {
            if !conn.exists::<_, bool>(&key)? {
                return Ok(Some(false));
            }
            let done: Option<()> = pipe.set(&key, &json).ignore().query(conn)?;
            Ok(done.map(|()| true))
        })?;
        Ok(updated)
    }

    fn delete_menu_item(&self, id: u64) -> StoreResult<bool> {
        Self::remove(&mut self.get_connection()?, MENU_ITEMS, id)
    }

    fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut conn = self.get_connection()?;
        let id = Self::next_id(&mut conn, USERS)?;
        let claimed: bool = conn.set_nx(username_key(&new.username), id)?;
        if !claimed {
            return Err(StoreError::Conflict(
                "A user with that username already exists.".to_string(),
            ));
        }
        let user = new.with_id(id);
        Self::insert(&mut conn, USERS, id, &user)?;
        for role in user.roles.iter() {
            conn.sadd::<_, _, ()>(group_key(role), id)?;
        }
        debug!(user_id = id, "created user");
        Ok(user)
    }

    fn get_user(&self, id: u64) -> StoreResult<Option<User>> {
        Self::load(&mut self.get_connection()?, &record(USERS, id))
    }

    fn find_user(&self, username: &str) -> StoreResult<Option<User>> {
        let mut conn = self.get_connection()?;
        let id: Option<u64> = conn.get(username_key(username))?;
        match id {
            Some(id) => Self::load(&mut conn, &record(USERS, id)),
            None => Ok(None),
        }
    }

    fn add_role(&self, user_id: u64, role: Role) -> StoreResult<bool> {
        self.modify_roles(user_id, role, |user, role| user.roles.insert(role))
    }

    fn remove_role(&self, user_id: u64, role: Role) -> StoreResult<bool> {
        self.modify_roles(user_id, role, |user, role| user.roles.remove(role))
    }

    fn users_with_role(&self, role: Role) -> StoreResult<Vec<User>> {
        let mut conn = self.get_connection()?;
        let mut ids: Vec<u64> = conn.smembers(group_key(role))?;
        ids.sort_unstable();
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = Self::load::<User>(&mut conn, &record(USERS, id))? {
                users.push(user);
            }
        }
        Ok(users)
    }

    fn save_token(&self, token: &str, user_id: u64) -> StoreResult<()> {
        let mut conn = self.get_connection()?;
        conn.set::<_, _, ()>(token_key(token), user_id)?;
        Ok(())
    }

    fn user_for_token(&self, token: &str) -> StoreResult<Option<u64>> {
        Ok(self.get_connection()?.get(token_key(token))?)
    }

    fn cart(&self, user_id: u64) -> StoreResult<Vec<CartItem>> {
        let mut conn = self.get_connection()?;
        let rows: Vec<String> = conn.hvals(cart_key(user_id))?;
        let mut rows = rows
            .iter()
            .map(|json| serde_json::from_str(json))
            .collect::<Result<Vec<CartItem>, _>>()?;
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    fn add_to_cart(
        &self,
        user_id: u64,
        menu_item: &MenuItem,
        addition: CartAddition,
    ) -> StoreResult<CartItem> {
        let mut conn = self.get_connection()?;
        let key = cart_key(user_id);
        // `Some(None)` ends the transaction without writing: the merged
        // quantity would be over the cap.
        let row = redis::transaction(&mut conn, &[key.as_str()], |conn, pipe| {
            let existing: Option<String> = conn.hget(&key, menu_item.id)?;
            let row = match existing {
                Some(json) => {
                    let mut row: CartItem = decode(&json)?;
                    match cart::merged_quantity(row.quantity, addition.quantity) {
                        Some(quantity) => row.quantity = quantity,
                        None => return Ok(Some(None)),
                    }
                    row
                }
                None => CartItem {
                    id: conn.incr(counter(CART_ROWS), 1)?,
                    user: user_id,
                    menu_item: menu_item.id,
                    quantity: addition.quantity,
                    unit_price: menu_item.price,
                },
            };
            let done: Option<()> = pipe
                .hset(&key, menu_item.id, encode(&row)?)
                .ignore()
                .query(conn)?;
            Ok(done.map(|()| Some(row)))
        })?;
        row.ok_or(StoreError::QuantityLimit(cart::MAX_QUANTITY))
    }

    fn clear_cart(&self, user_id: u64) -> StoreResult<usize> {
        let mut conn = self.get_connection()?;
        let key = cart_key(user_id);
        let (count, _): (usize, u64) = redis::pipe()
            .atomic()
            .hlen(&key)
            .del(&key)
            .query(&mut conn)?;
        Ok(count)
    }

    fn checkout(&self, user_id: u64, date: NaiveDate) -> StoreResult<Order> {
        let mut conn = self.get_connection()?;
        let cart = cart_key(user_id);
        let order_counter = counter(ORDERS);
        let item_counter = counter(ORDER_ITEMS);
        let watched = [cart.as_str(), order_counter.as_str(), item_counter.as_str()];

        let order = redis::transaction(&mut conn, &watched, |conn, pipe| {
            let raw: Vec<String> = conn.hvals(&cart)?;
            let rows = raw
                .iter()
                .map(|json| decode::<CartItem>(json))
                .collect::<RedisResult<Vec<_>>>()?;

            let draft = checkout::draft(user_id, &rows, date);
            let order_id = conn.get::<_, Option<u64>>(&order_counter)?.unwrap_or(0) + 1;
            let last_item = conn.get::<_, Option<u64>>(&item_counter)?.unwrap_or(0);
            let next_item = last_item + draft.item_count();
            let order = draft.persist(order_id, last_item);

            let done: Option<()> = pipe
                .set(&order_counter, order_id)
                .ignore()
                .set(&item_counter, next_item)
                .ignore()
                .set(record(ORDERS, order_id), encode(&order)?)
                .ignore()
                .sadd(ORDERS, order_id)
                .ignore()
                .del(&cart)
                .ignore()
                .query(conn)?;
            Ok(done.map(|()| order))
        })?;
        Ok(order)
    }

    fn list_orders(&self) -> StoreResult<Vec<Order>> {
        Self::load_all(&mut self.get_connection()?, ORDERS)
    }

    fn get_order(&self, id: u64) -> StoreResult<Option<Order>> {
        Self::load(&mut self.get_connection()?, &record(ORDERS, id))
    }

    fn update_order(&self, id: u64, change: &dyn Fn(&mut Order)) -> StoreResult<Option<Order>> {
        let mut conn = self.get_connection()?;
        let key = record(ORDERS, id);
        let order = redis::transaction(&mut conn, &[key.as_str()], |conn, pipe| {
            let json: Option<String> = conn.get(&key)?;
            let Some(json) = json else {
                return Ok(Some(None));
            };
            let mut order: Order = decode(&json)?;
            change(&mut order);
            let done: Option<()> = pipe.set(&key, encode(&order)?).ignore().query(conn)?;
            Ok(done.map(|()| Some(order)))
        })?;
        Ok(order)
    }

    fn delete_order(&self, id: u64) -> StoreResult<bool> {
        Self::remove(&mut self.get_connection()?, ORDERS, id)
    }
}
