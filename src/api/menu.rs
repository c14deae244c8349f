use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::AppState;
use crate::auth::Principal;
use crate::error::{AppError, AppResult, FieldErrors, FORBIDDEN};
use crate::menu::{Category, CategoryInput, MenuItem, MenuItemInput, MenuQuery};
use crate::policy::{authorize, Action, Resource};
use crate::store::{EntityStore, StoreError};

const UNAUTHORIZED: &str = "Unauthorized";

fn ensure_category(store: &dyn EntityStore, id: u64) -> AppResult<()> {
    if store.get_category(id)?.is_some() {
        return Ok(());
    }
    let mut errors = FieldErrors::new();
    errors.add(
        "category",
        format!("Invalid pk \"{id}\" - object does not exist."),
    );
    Err(AppError::Validation(errors))
}

fn find_menu_item(store: &dyn EntityStore, id: u64) -> AppResult<MenuItem> {
    store
        .get_menu_item(id)?
        .ok_or_else(|| AppError::NotFound(format!("menu item {id}")))
}

/// Writes the item back, failing if it was deleted since it was read.
fn save_menu_item(store: &dyn EntityStore, item: &MenuItem) -> AppResult<()> {
    if store.update_menu_item(item)? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("menu item {}", item.id)))
    }
}

pub async fn list_categories(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<Json<Vec<Category>>> {
    authorize(&principal.roles, Resource::Category, Action::Read).ensure(FORBIDDEN)?;
    Ok(Json(state.store.list_categories()?))
}

pub async fn create_category(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<CategoryInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Category>)> {
    authorize(&principal.roles, Resource::Category, Action::Create).ensure(UNAUTHORIZED)?;
    let Json(input) = payload?;
    let new = input.validate()?;
    let category = match state.store.create_category(new) {
        Ok(category) => category,
        Err(StoreError::Conflict(msg)) => {
            let mut errors = FieldErrors::new();
            errors.add("slug", msg);
            return Err(AppError::Validation(errors));
        }
        Err(e) => return Err(e.into()),
    };
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_menu_items(
    State(state): State<AppState>,
    principal: Principal,
    query: Result<Query<MenuQuery>, QueryRejection>,
) -> AppResult<Json<Vec<MenuItem>>> {
    authorize(&principal.roles, Resource::MenuItem, Action::Read).ensure(FORBIDDEN)?;
    let Query(query) = query?;
    let items = query.apply(state.store.list_menu_items()?)?;
    Ok(Json(items))
}

pub async fn create_menu_item(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<MenuItemInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MenuItem>)> {
    authorize(&principal.roles, Resource::MenuItem, Action::Create).ensure(UNAUTHORIZED)?;
    let Json(input) = payload?;
    let new = input.into_new()?;
    ensure_category(state.store.as_ref(), new.category)?;

    let item = state.store.create_menu_item(new)?;
    info!(menu_item = item.id, by = %principal.username, "created menu item");
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_menu_item(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<u64>,
) -> AppResult<Json<MenuItem>> {
    authorize(&principal.roles, Resource::MenuItem, Action::Read).ensure(FORBIDDEN)?;
    Ok(Json(find_menu_item(state.store.as_ref(), id)?))
}

pub async fn replace_menu_item(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<u64>,
    payload: Result<Json<MenuItemInput>, JsonRejection>,
) -> AppResult<Json<MenuItem>> {
    authorize(&principal.roles, Resource::MenuItem, Action::Update).ensure(UNAUTHORIZED)?;
    let Json(input) = payload?;
    let existing = find_menu_item(state.store.as_ref(), id)?;
    let replacement = input.into_new()?.with_id(existing.id);
    ensure_category(state.store.as_ref(), replacement.category)?;

    save_menu_item(state.store.as_ref(), &replacement)?;
    info!(menu_item = id, by = %principal.username, "replaced menu item");
    Ok(Json(replacement))
}

pub async fn patch_menu_item(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<u64>,
    payload: Result<Json<MenuItemInput>, JsonRejection>,
) -> AppResult<Json<MenuItem>> {
    authorize(&principal.roles, Resource::MenuItem, Action::Update).ensure(UNAUTHORIZED)?;
    let Json(input) = payload?;
    let existing = find_menu_item(state.store.as_ref(), id)?;
    let updated = input.apply_to(&existing)?;
    if updated.category != existing.category {
        ensure_category(state.store.as_ref(), updated.category)?;
    }

    save_menu_item(state.store.as_ref(), &updated)?;
    info!(menu_item = id, by = %principal.username, "updated menu item");
    Ok(Json(updated))
}

pub async fn delete_menu_item(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<u64>,
) -> AppResult<StatusCode> {
    authorize(&principal.roles, Resource::MenuItem, Action::Delete).ensure(UNAUTHORIZED)?;
    if !state.store.delete_menu_item(id)? {
        return Err(AppError::NotFound(format!("menu item {id}")));
    }
    info!(menu_item = id, by = %principal.username, "deleted menu item");
    Ok(StatusCode::NO_CONTENT)
}
