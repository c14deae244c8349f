use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::store::EntityStore;

mod cart;
mod groups;
mod menu;
mod orders;
mod users;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/users", post(users::register))
        .route("/api-token-auth", post(users::obtain_token))
        .route(
            "/categories",
            get(menu::list_categories).post(menu::create_category),
        )
        .route(
            "/menu-item",
            get(menu::list_menu_items).post(menu::create_menu_item),
        )
        .route(
            "/menu-item/:id",
            get(menu::get_menu_item)
                .put(menu::replace_menu_item)
                .patch(menu::patch_menu_item)
                .delete(menu::delete_menu_item),
        )
        .route(
            "/groups/managers/users",
            get(groups::list_managers).post(groups::add_manager),
        )
        .route(
            "/groups/managers/users/:id",
            get(groups::get_manager).delete(groups::remove_manager),
        )
        .route(
            "/groups/delivery-crew/users",
            get(groups::list_delivery_crew).post(groups::add_delivery_crew),
        )
        .route(
            "/groups/delivery-crew/users/:id",
            get(groups::get_delivery_crew).delete(groups::remove_delivery_crew),
        )
        .route(
            "/cart/menu-items",
            get(cart::view_cart)
                .post(cart::add_to_cart)
                .delete(cart::clear_cart),
        )
        .route(
            "/orders/",
            get(orders::list_orders).post(orders::checkout),
        )
        .route(
            "/orders/:id",
            get(orders::get_order)
                .put(orders::update_order)
                .patch(orders::update_order)
                .delete(orders::delete_order),
        )
        .with_state(state)
}
