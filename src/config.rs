use derive_more::Display;

use crate::security::PasswordHasher;

/// Shortest cookie key accepted by the session middleware.
pub const COOKIE_KEY_MIN_LEN: usize = 64;

#[derive(Debug, Display, PartialEq)]
pub enum ConfigError {
    #[display(fmt = "{} must be set", _0)]
    Missing(String),

    #[display(fmt = "{} is invalid: {}", _0, _1)]
    Invalid(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
    pub replace: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// In-memory backend when absent.
    pub database_url: Option<String>,
    pub pool_size: u32,
    pub bind_address: String,
    pub domain: String,
    pub cookie_secret_key: String,
    pub password_secret_key: String,
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub admin: Option<AdminBootstrap>,
    pub allow_admin_signup: bool,
}

fn parse_number<F>(lookup: &F, name: &str, default: u32) -> Result<u32, ConfigError>
    where F: Fn(&str) -> Option<String>
{
    match lookup(name) {
        None => Ok(default),
        Some(x) => x.trim().parse::<u32>()
            .map_err(|err| ConfigError::Invalid(name.to_string(), err.to_string())),
    }
}

fn flag<F>(lookup: &F, name: &str) -> bool
    where F: Fn(&str) -> Option<String>
{
    lookup(name)
        .map(|x| !x.is_empty() && x != "0" && !x.eq_ignore_ascii_case("false"))
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let expect_var = |name: &str| lookup(name).ok_or_else(|| ConfigError::Missing(name.to_string()));

        let cookie_secret_key = expect_var("COOKIE_SECRET_KEY")?;
        if cookie_secret_key.len() < COOKIE_KEY_MIN_LEN {
            return Err(ConfigError::Invalid(
                "COOKIE_SECRET_KEY".to_string(),
                format!("needs at least {} bytes", COOKIE_KEY_MIN_LEN),
            ))
        }

        let admin = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_DEFAULT_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                email,
                password,
                replace: flag(&lookup, "ADMIN_PASSWORD_OVERRIDE"),
            }),
            (Some(_), None) => return Err(ConfigError::Missing("ADMIN_DEFAULT_PASSWORD".to_string())),
            _ => None,
        };

        Ok(Config {
            database_url: lookup("DATABASE_URL").filter(|x| !x.is_empty()),
            pool_size: parse_number(&lookup, "DATABASE_POOL_SIZE", 10)?,
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            domain: lookup("DOMAIN").unwrap_or_else(|| "localhost".to_string()),
            cookie_secret_key,
            password_secret_key: expect_var("PASSWORD_SECRET_KEY")?,
            hash_memory_kib: parse_number(&lookup, "PASSWORD_HASH_MEMORY_KIB", argon2::Params::DEFAULT_M_COST)?,
            hash_iterations: parse_number(&lookup, "PASSWORD_HASH_ITERATIONS", argon2::Params::DEFAULT_T_COST)?,
            admin,
            allow_admin_signup: flag(&lookup, "ALLOW_ADMIN_SIGNUP"),
        })
    }

    pub fn password_hasher(&self) -> PasswordHasher {
        PasswordHasher::new(self.password_secret_key.clone())
            .with_cost(self.hash_memory_kib, self.hash_iterations)
    }
}
