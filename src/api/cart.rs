use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    Json,
};
use tracing::debug;

use super::AppState;
use crate::auth::Principal;
use crate::cart::{self, CartInput, CartItemView};
use crate::error::{AppError, AppResult, FieldErrors, FORBIDDEN};
use crate::policy::{authorize, Action, Resource};
use crate::store::StoreError;

pub async fn view_cart(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<Json<Vec<CartItemView>>> {
    authorize(&principal.roles, Resource::Cart, Action::Read).ensure(FORBIDDEN)?;
    let rows = state.store.cart(principal.user_id)?;
    Ok(Json(rows.iter().map(CartItemView::from).collect()))
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<CartInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CartItemView>)> {
    authorize(&principal.roles, Resource::Cart, Action::Create).ensure(FORBIDDEN)?;
    let Json(input) = payload?;
    let addition = input.validate()?;
    let Some(menu_item) = state.store.get_menu_item(addition.menu_item)? else {
        let mut errors = FieldErrors::new();
        errors.add(
            "menu_item",
            format!(
                "Invalid pk \"{}\" - object does not exist.",
                addition.menu_item
            ),
        );
        return Err(AppError::Validation(errors));
    };

    let row = match state.store.add_to_cart(principal.user_id, &menu_item, addition) {
        Ok(row) => row,
        Err(StoreError::QuantityLimit(_)) => return Err(cart::quantity_limit_error()),
        Err(e) => return Err(e.into()),
    };
    debug!(user = %principal.username, menu_item = menu_item.id, quantity = row.quantity, "cart updated");
    Ok((StatusCode::CREATED, Json(CartItemView::from(&row))))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<StatusCode> {
    authorize(&principal.roles, Resource::Cart, Action::Delete).ensure(FORBIDDEN)?;
    let removed = state.store.clear_cart(principal.user_id)?;
    debug!(user = %principal.username, removed, "cart cleared");
    Ok(StatusCode::NO_CONTENT)
}
