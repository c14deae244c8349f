//! Service configuration read from the environment (and `.env`, if present).

use std::env;
use std::net::SocketAddr;

use secrecy::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid listen address {0}")]
    InvalidAddress(String),

    #[error("{0} is set but {1} is missing")]
    Incomplete(&'static str, &'static str),
}

/// Credentials of a manager account to create on startup if it does not
/// exist yet. Without one there is no way to appoint the first manager.
#[derive(Debug, Clone)]
pub struct ManagerSeed {
    pub username: String,
    pub email: String,
    pub password: SecretString,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub redis_url: String,
    pub manager: Option<ManagerSeed>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("PORT").unwrap_or_else(|| "3000".to_string());
        let addr = format!("{}:{}", host, port);
        let addr = addr
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidAddress(addr))?;

        let redis_url = lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1/".to_string());

        let manager = match (lookup("MANAGER_USERNAME"), lookup("MANAGER_PASSWORD")) {
            (Some(username), Some(password)) => Some(ManagerSeed {
                username,
                email: lookup("MANAGER_EMAIL").unwrap_or_default(),
                password: SecretString::from(password),
            }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete("MANAGER_USERNAME", "MANAGER_PASSWORD"))
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete("MANAGER_PASSWORD", "MANAGER_USERNAME"))
            }
            (None, None) => None,
        };

        Ok(Config {
            addr,
            redis_url,
            manager,
        })
    }
}
