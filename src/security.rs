use std::fmt::Display;

use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::AppData;
use crate::models::{AuthIdentity, Node, Role, User, UserId};
use crate::web::errors::{ServiceError, ServiceResult};

const SALT_LEN: usize = 16;

fn hashing_error(err: impl Display) -> ServiceError {
    ServiceError::InternalServerError(format!("Hashing error: {}", err))
}

/// Argon2id keyed with the server secret, stored as PHC strings.
///
/// The cost set here only applies to new hashes, verification reads the
/// parameters back from the stored string.
#[derive(Clone)]
pub struct PasswordHasher {
    secret_key: String,
    memory_kib: u32,
    iterations: u32,
}

impl PasswordHasher {
    pub fn new(secret_key: String) -> Self {
        PasswordHasher {
            secret_key,
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
        }
    }

    pub fn with_cost(mut self, memory_kib: u32, iterations: u32) -> Self {
        self.memory_kib = memory_kib;
        self.iterations = iterations;
        self
    }

    fn argon(&self) -> ServiceResult<Argon2<'_>> {
        let params = Params::new(self.memory_kib, self.iterations, 1, None)
            .map_err(hashing_error)?;
        Argon2::new_with_secret(self.secret_key.as_bytes(), Algorithm::Argon2id, Version::V0x13, params)
            .map_err(hashing_error)
    }

    pub fn hash_password(&self, password: &str) -> ServiceResult<String> {
        let salt = SaltString::encode_b64(&rand::random::<[u8; SALT_LEN]>())
            .map_err(hashing_error)?;
        let hash = self.argon()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(hashing_error)?;
        Ok(hash.to_string())
    }

    pub fn verify_hash(&self, hash: &str, password: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(x) => x,
            Err(err) => {
                warn!("Malformed password hash: {}", err);
                return false;
            }
        };

        match self.argon() {
            Ok(argon) => argon.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(err) => {
                warn!("{}", err);
                false
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct IdentityCookie {
    id: UserId,
    timestamp: DateTime<Utc>,
}

pub fn save_identity(identity: &AuthIdentity) -> ServiceResult<String> {
    serde_json::to_string(&IdentityCookie {
        id: identity.id,
        timestamp: identity.last_password_change,
    }).map_err(|err| ServiceError::InternalServerError(format!("Cookie error: {}", err)))
}

/// Resolves a cookie back to its identity, rejecting cookies issued before the
/// last password change.
pub fn parse_identity(ctx: &AppData, identity: &str) -> ServiceResult<Option<AuthIdentity>> {
    let cookie: Option<IdentityCookie> = serde_json::from_str(identity).ok();
    let cookie = match cookie {
        Some(x) => x,
        None => return Ok(None),
    };

    let found = match ctx.identity.get_identity(&cookie.id)? {
        None => return Ok(None),
        Some(u) => u,
    };
    if found.last_password_change > cookie.timestamp {
        warn!("Rejected stale session for {}", found.id);
        Ok(None)
    } else {
        Ok(Some(found))
    }
}

pub trait PermissionCheckable {
    fn is_admin(&self) -> bool;

    fn ensure_admin(&self) -> ServiceResult<()>;

    fn ensure_owner_visible(&self, owner: &UserId) -> ServiceResult<()>;

    fn ensure_node_visible(&self, node: &Node) -> ServiceResult<()>;

    fn ensure_node_identifier_visible(&self, ctx: &AppData, node_identifier: &str) -> ServiceResult<()>;
}

impl PermissionCheckable for User {
    fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    fn ensure_admin(&self) -> ServiceResult<()> {
        if !self.is_admin() {
            Err(ServiceError::Unauthorized)
        } else {
            Ok(())
        }
    }

    fn ensure_owner_visible(&self, owner: &UserId) -> ServiceResult<()> {
        if self.is_admin() || &self.id == owner {
            Ok(())
        } else {
            Err(ServiceError::Unauthorized)
        }
    }

    fn ensure_node_visible(&self, node: &Node) -> ServiceResult<()> {
        if self.is_admin() || node.user_id == self.id {
            Ok(())
        } else {
            Err(ServiceError::NotFound("Node".to_string()))
        }
    }

    fn ensure_node_identifier_visible(&self, ctx: &AppData, node_identifier: &str) -> ServiceResult<()> {
        use crate::backend::NodeScope;

        if self.is_admin() {
            return Ok(())
        }

        let owned = ctx.store.list_nodes(&NodeScope::OwnedBy(self.id))?;
        if owned.iter().any(|node| node.node_id == node_identifier) {
            Ok(())
        } else {
            Err(ServiceError::NotFound("Node".to_string()))
        }
    }
}
