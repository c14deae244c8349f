use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;

use super::AppState;
use crate::auth::Principal;
use crate::error::{AppError, AppResult, FieldErrors, FORBIDDEN};
use crate::order::{Order, OrderPatch, OrderQuery};
use crate::policy::{authorize, authorize_order_patch, Action, OrderScope, Resource};
use crate::role::Role;

/// Looks the order up within the caller's scope. Orders outside it are
/// reported as missing.
fn find_scoped(state: &AppState, principal: &Principal, id: u64) -> AppResult<Order> {
    let scope = OrderScope::for_caller(principal.user_id, &principal.roles);
    state
        .store
        .get_order(id)?
        .filter(|order| scope.admits(order))
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

pub async fn list_orders(
    State(state): State<AppState>,
    principal: Principal,
    query: Result<Query<OrderQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Order>>> {
    authorize(&principal.roles, Resource::Order, Action::Read).ensure(FORBIDDEN)?;
    let Query(query) = query?;
    let scope = OrderScope::for_caller(principal.user_id, &principal.roles);
    let mut orders = state.store.list_orders()?;
    orders.retain(|order| scope.admits(order));
    Ok(Json(query.apply(orders)?))
}

pub async fn checkout(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<(StatusCode, Json<Order>)> {
    authorize(&principal.roles, Resource::Order, Action::Create).ensure(FORBIDDEN)?;
    let today = Utc::now().date_naive();
    let order = state.store.checkout(principal.user_id, today)?;
    info!(
        order = order.id,
        user = %principal.username,
        items = order.order_items.len(),
        total = %order.total,
        "checked out cart"
    );
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<u64>,
) -> AppResult<Json<Order>> {
    authorize(&principal.roles, Resource::Order, Action::Read).ensure(FORBIDDEN)?;
    Ok(Json(find_scoped(&state, &principal, id)?))
}

/// PUT and PATCH both land here; only the fields present are changed.
pub async fn update_order(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<u64>,
    payload: Result<Json<OrderPatch>, JsonRejection>,
) -> AppResult<Json<Order>> {
    authorize(&principal.roles, Resource::Order, Action::Update).ensure(FORBIDDEN)?;
    let Json(patch) = payload?;
    let order = find_scoped(&state, &principal, id)?;
    authorize_order_patch(principal.user_id, &principal.roles, &order, &patch)
        .ensure(FORBIDDEN)?;

    if let Some(Some(crew)) = patch.delivery_crew {
        let is_crew = state
            .store
            .get_user(crew)?
            .is_some_and(|user| user.roles.contains(Role::DeliveryCrew));
        if !is_crew {
            let mut errors = FieldErrors::new();
            errors.add(
                "delivery_crew",
                format!("User \"{crew}\" is not a member of the delivery crew."),
            );
            return Err(AppError::Validation(errors));
        }
    }

    if patch.is_empty() {
        return Ok(Json(order));
    }
    let order = state
        .store
        .update_order(id, &|order| patch.apply(order))?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    info!(order = order.id, by = %principal.username, role = %principal.role(), "updated order");
    Ok(Json(order))
}

pub async fn delete_order(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<u64>,
) -> AppResult<StatusCode> {
    authorize(&principal.roles, Resource::Order, Action::Delete).ensure(FORBIDDEN)?;
    if !state.store.delete_order(id)? {
        return Err(AppError::NotFound(format!("order {id}")));
    }
    info!(order = id, by = %principal.username, "deleted order");
    Ok(StatusCode::NO_CONTENT)
}
