use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use secrecy::SecretString;
use tracing::info;

use super::AppState;
use crate::auth;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::role::{Role, RoleSet};
use crate::store::StoreError;
use crate::user::{NewUser, RegisterInput, TokenRequest, TokenResponse, UserView};

/// Open registration; every new account starts out as a customer.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<UserView>)> {
    let Json(input) = payload?;
    let registration = input.validate()?;
    let password = registration.password;
    let password_hash = auth::run_blocking(move || auth::hash_password(&password)).await?;
    let new = NewUser {
        username: registration.username,
        email: registration.email,
        password_hash,
        roles: RoleSet::of(Role::Customer),
    };

    let user = match state.store.create_user(new) {
        Ok(user) => user,
        Err(StoreError::Conflict(msg)) => {
            let mut errors = FieldErrors::new();
            errors.add("username", msg);
            return Err(AppError::Validation(errors));
        }
        Err(e) => return Err(e.into()),
    };
    info!(user = %user.username, "registered user");
    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

pub async fn obtain_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Json(request) = payload?;
    let mut errors = FieldErrors::new();
    let username = errors.require("username", request.username);
    let password = errors.require("password", request.password);
    let (Some(username), Some(password)) = (username, password) else {
        return Err(AppError::Validation(errors));
    };

    let store = Arc::clone(&state.store);
    let password = SecretString::from(password);
    let token =
        auth::run_blocking(move || auth::issue_token(store.as_ref(), &username, &password))
            .await?;
    Ok(Json(TokenResponse { token }))
}
