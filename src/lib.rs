#[macro_use]
extern crate diesel;

use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};

use crate::backend::{IdentityProvider, MemoryBackend, PgBackend, Store};
use crate::config::Config;
use crate::forms::normalize_email;
use crate::models::{Role, User};
use crate::web::errors::ServiceResult;
use crate::web::graphql_schema::{create_schema, Schema};

pub mod auth;
pub mod backend;
pub mod config;
pub mod flow;
pub mod forms;
pub mod models;
pub mod nodes;
pub mod schema;
pub mod security;
pub mod sensors;
pub mod session;
pub mod web;

/// Built once at startup and handed to every request.
#[derive(Clone)]
pub struct AppData {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn Store>,
    pub graphql_schema: Arc<Schema>,
    pub allow_admin_signup: bool,
}

impl AppData {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn Store>, allow_admin_signup: bool) -> Self {
        AppData {
            identity,
            store,
            graphql_schema: Arc::new(create_schema()),
            allow_admin_signup,
        }
    }

    pub fn in_memory(backend: Arc<MemoryBackend>, allow_admin_signup: bool) -> Self {
        AppData::new(backend.clone(), backend, allow_admin_signup)
    }

    pub fn from_config(config: &Config) -> ServiceResult<Self> {
        let hasher = config.password_hasher();

        match config.database_url.as_ref() {
            Some(url) => {
                let backend = Arc::new(PgBackend::connect(url, config.pool_size, hasher)?);
                backend.setup_migrations()?;
                Ok(AppData::new(backend.clone(), backend, config.allow_admin_signup))
            },
            None => {
                warn!("DATABASE_URL not set, using the in-memory backend");
                Ok(AppData::in_memory(Arc::new(MemoryBackend::new(hasher)), config.allow_admin_signup))
            },
        }
    }

    /// Makes sure an admin account exists for `email`. An identity left
    /// without a directory row by an earlier failed run is reused.
    pub fn setup_admin(&self, email: &str, password: String, replace: bool) -> ServiceResult<()> {
        let email = normalize_email(email);

        match self.store.find_user_by_email(&email)? {
            None => {
                let identity = match self.identity.find_identity(&email)? {
                    Some(identity) => {
                        warn!("Identity for {} has no directory row, completing it", email);
                        if replace {
                            self.identity.update_password(&identity.id, &password)?
                        } else {
                            identity
                        }
                    },
                    None => self.identity.sign_up(&email, &password)?,
                };
                self.store.insert_user(&User {
                    id: identity.id,
                    user_id: "admin".to_string(),
                    email: email.clone(),
                    phone_no: String::new(),
                    role: Role::Admin,
                    created_at: Utc::now(),
                    password_reset_at: None,
                })?;
                info!("Created admin account {}", email);
            },
            Some(ref user) if user.role != Role::Admin => {
                warn!("{} exists without the admin role, leaving it untouched", email);
            },
            Some(ref user) if replace => {
                self.identity.update_password(&user.id, &password)?;
                self.store.mark_password_reset(&user.id, Utc::now())?;
                info!("Replaced password of {}", email);
            },
            _ => {},
        }

        Ok(())
    }
}
