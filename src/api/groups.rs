//! Manager and delivery crew rosters. Both are manager-only and differ only
//! in which group they edit.

use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use super::AppState;
use crate::auth::Principal;
use crate::error::{AppError, AppResult, ROSTER_FORBIDDEN};
use crate::policy::{authorize, Action, Resource};
use crate::role::Role;
use crate::user::{MemberInput, UserView};

fn roster(role: Role) -> Resource {
    match role {
        Role::DeliveryCrew => Resource::DeliveryCrewRoster,
        Role::Manager | Role::Customer => Resource::ManagerRoster,
    }
}

async fn list_members(
    state: AppState,
    principal: Principal,
    role: Role,
) -> AppResult<Json<Vec<UserView>>> {
    authorize(&principal.roles, roster(role), Action::Read).ensure(ROSTER_FORBIDDEN)?;
    let members = state.store.users_with_role(role)?;
    Ok(Json(members.iter().map(UserView::from).collect()))
}

async fn get_member(
    state: AppState,
    principal: Principal,
    role: Role,
    id: u64,
) -> AppResult<Json<UserView>> {
    authorize(&principal.roles, roster(role), Action::Read).ensure(ROSTER_FORBIDDEN)?;
    match state.store.get_user(id)? {
        Some(user) if user.roles.contains(role) => Ok(Json(UserView::from(&user))),
        _ => Err(AppError::NotFound(format!("{role} {id}"))),
    }
}

async fn add_member(
    state: AppState,
    principal: Principal,
    role: Role,
    payload: Result<Json<MemberInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<UserView>)> {
    authorize(&principal.roles, roster(role), Action::Create).ensure(ROSTER_FORBIDDEN)?;
    let Json(input) = payload?;
    let username = input.validate()?;
    let user = state
        .store
        .find_user(&username)?
        .ok_or_else(|| AppError::NotFound(format!("user {username}")))?;

    let added = state.store.add_role(user.id, role)?;
    let status = if added {
        info!(user = %user.username, group = %role, by = %principal.username, "added to group");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(UserView::from(&user))))
}

async fn remove_member(
    state: AppState,
    principal: Principal,
    role: Role,
    id: u64,
) -> AppResult<Json<Value>> {
    authorize(&principal.roles, roster(role), Action::Delete).ensure(ROSTER_FORBIDDEN)?;
    if !state.store.remove_role(id, role)? {
        return Err(AppError::NotFound(format!("{role} {id}")));
    }
    info!(user_id = id, group = %role, by = %principal.username, "removed from group");
    Ok(Json(json!({ "message": "successfully deleted." })))
}

pub async fn list_managers(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<Json<Vec<UserView>>> {
    list_members(state, principal, Role::Manager).await
}

pub async fn get_manager(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<u64>,
) -> AppResult<Json<UserView>> {
    get_member(state, principal, Role::Manager, id).await
}

pub async fn add_manager(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<MemberInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<UserView>)> {
    add_member(state, principal, Role::Manager, payload).await
}

pub async fn remove_manager(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<u64>,
) -> AppResult<Json<Value>> {
    remove_member(state, principal, Role::Manager, id).await
}

pub async fn list_delivery_crew(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<Json<Vec<UserView>>> {
    list_members(state, principal, Role::DeliveryCrew).await
}

pub async fn get_delivery_crew(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<u64>,
) -> AppResult<Json<UserView>> {
    get_member(state, principal, Role::DeliveryCrew, id).await
}

pub async fn add_delivery_crew(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<MemberInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<UserView>)> {
    add_member(state, principal, Role::DeliveryCrew, payload).await
}

pub async fn remove_delivery_crew(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<u64>,
) -> AppResult<Json<Value>> {
    remove_member(state, principal, Role::DeliveryCrew, id).await
}
