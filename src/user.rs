use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, FieldErrors};
use crate::role::RoleSet;

const MAX_USERNAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;

/// A stored account. The password hash and group membership never leave
/// the server; responses go through [`UserView`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub roles: RoleSet,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserView {
    pub id: u64,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        UserView {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: RoleSet,
}

impl NewUser {
    pub fn with_id(self, id: u64) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            roles: self.roles,
        }
    }
}

/// Registration body. The password is write-only.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A registration that passed validation; the password is not hashed yet.
#[derive(Debug)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: SecretString,
}

impl RegisterInput {
    pub fn validate(self) -> AppResult<Registration> {
        let mut errors = FieldErrors::new();

        let username = errors
            .require("username", self.username)
            .map(|name| name.trim().to_string());
        if let Some(name) = &username {
            if name.is_empty() {
                errors.add("username", "This field may not be blank.");
            } else if name.chars().count() > MAX_USERNAME_LEN {
                errors.add(
                    "username",
                    format!("Ensure this field has no more than {MAX_USERNAME_LEN} characters."),
                );
            } else if !name
                .chars()
                .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
            {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                );
            }
        }

        let email = self.email.map(|e| e.trim().to_string()).unwrap_or_default();
        if !email.is_empty() && !looks_like_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }

        let password = errors.require("password", self.password);
        if let Some(password) = &password {
            if password.chars().count() < MIN_PASSWORD_LEN {
                errors.add(
                    "password",
                    format!("This password is too short. It must contain at least {MIN_PASSWORD_LEN} characters."),
                );
            }
        }

        let (Some(username), Some(password)) = (username, password) else {
            return Err(AppError::Validation(errors));
        };
        errors.into_result()?;
        Ok(Registration {
            username,
            email,
            password: SecretString::from(password),
        })
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

/// Body of the roster endpoints: names an existing user.
#[derive(Debug, Default, Deserialize)]
pub struct MemberInput {
    pub username: Option<String>,
}

impl MemberInput {
    pub fn validate(self) -> AppResult<String> {
        let mut errors = FieldErrors::new();
        let username = errors
            .require("username", self.username)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        match username {
            Some(name) => Ok(name),
            None => {
                if errors.is_empty() {
                    errors.add("username", "This field may not be blank.");
                }
                Err(AppError::Validation(errors))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}
