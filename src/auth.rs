//! Token authentication and password handling.
//!
//! Clients send `Authorization: Token <key>` (or `Bearer <key>`). The key is
//! resolved to a user once per request and handed to handlers as a
//! [`Principal`].

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::AppState;
use crate::config::ManagerSeed;
use crate::error::{AppError, AppResult};
use crate::role::{Role, RoleSet};
use crate::store::EntityStore;
use crate::user::{NewUser, User};

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: u64,
    pub username: String,
    pub roles: RoleSet,
}

impl Principal {
    pub fn role(&self) -> Role {
        self.roles.primary()
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Principal {
            user_id: user.id,
            username: user.username.clone(),
            roles: user.roles,
        }
    }
}

fn bearer(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim()).filter(|t| !t.is_empty())
    } else {
        None
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> AppResult<Self> {
        let token = bearer(parts).ok_or(AppError::Unauthenticated)?;
        let user_id = state
            .store
            .user_for_token(token)?
            .ok_or(AppError::Unauthenticated)?;
        let user = state
            .store
            .get_user(user_id)?
            .ok_or(AppError::Unauthenticated)?;
        debug!(user = %user.username, role = %user.roles.primary(), "authenticated");
        Ok(Principal::from(&user))
    }
}

pub fn hash_password(password: &SecretString) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &SecretString, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.expose_secret().as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Runs argon2 work on the blocking pool so it does not stall the async
/// workers.
pub async fn run_blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {e}")))?
}

/// Checks the credentials and stores a fresh token for the user.
pub fn issue_token(
    store: &dyn EntityStore,
    username: &str,
    password: &SecretString,
) -> AppResult<String> {
    let invalid = || AppError::BadRequest("Unable to log in with provided credentials.".into());
    let user = store.find_user(username)?.ok_or_else(invalid)?;
    if !verify_password(password, &user.password_hash) {
        return Err(invalid());
    }
    let token = Uuid::new_v4().simple().to_string();
    store.save_token(&token, user.id)?;
    debug!(user = %user.username, "issued token");
    Ok(token)
}

/// Makes sure the configured account exists and is a manager.
///
/// An account that already exists under the configured username is only
/// promoted if its password matches the configured one. Registration is
/// open, so the name alone proves nothing.
pub fn seed_manager(store: &dyn EntityStore, seed: &ManagerSeed) -> AppResult<()> {
    let user = match store.find_user(&seed.username)? {
        Some(user) if verify_password(&seed.password, &user.password_hash) => user,
        Some(user) => {
            warn!(user = %user.username, "existing account does not match MANAGER_PASSWORD");
            return Err(AppError::Internal(format!(
                "account {} already exists with a different password; refusing to make it a manager",
                user.username
            )));
        }
        None => store.create_user(NewUser {
            username: seed.username.clone(),
            email: seed.email.clone(),
            password_hash: hash_password(&seed.password)?,
            roles: RoleSet::of(Role::Manager),
        })?,
    };
    store.add_role(user.id, Role::Manager)?;
    info!(user = %user.username, "manager account ready");
    Ok(())
}
