//! The boundary to the hosted backend: an identity provider issuing
//! credentials and a table store holding users, nodes and sensors.
//!
//! Both sides are plain request/response calls. Nothing here spans more than
//! one table write, callers sequence dependent calls themselves.

use chrono::{DateTime, Utc};

use crate::models::{AuthIdentity, IdType, NewNode, Node, Sensor, User, UserId};
use crate::web::errors::ServiceResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryBackend;
pub use postgres::PgBackend;

pub trait IdentityProvider: Send + Sync {
    /// Creates a new identity, `AlreadyPresent` when the email is taken.
    fn sign_up(&self, email: &str, password: &str) -> ServiceResult<AuthIdentity>;

    /// Checks credentials, `WrongPassword` for unknown emails too.
    fn sign_in(&self, email: &str, password: &str) -> ServiceResult<AuthIdentity>;

    fn get_identity(&self, id: &UserId) -> ServiceResult<Option<AuthIdentity>>;

    fn find_identity(&self, email: &str) -> ServiceResult<Option<AuthIdentity>>;

    fn update_password(&self, id: &UserId, password: &str) -> ServiceResult<AuthIdentity>;
}

/// Which rows of the node registry a query may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeScope {
    All,
    OwnedBy(UserId),
}

impl NodeScope {
    pub fn includes(&self, node: &Node) -> bool {
        match self {
            NodeScope::All => true,
            NodeScope::OwnedBy(owner) => &node.user_id == owner,
        }
    }
}

pub trait Store: Send + Sync {
    fn insert_user(&self, user: &User) -> ServiceResult<User>;

    fn find_user(&self, id: &UserId) -> ServiceResult<Option<User>>;

    fn find_user_by_email(&self, email: &str) -> ServiceResult<Option<User>>;

    fn list_users(&self) -> ServiceResult<Vec<User>>;

    fn mark_password_reset(&self, id: &UserId, at: DateTime<Utc>) -> ServiceResult<User>;

    /// Rows come back in store order, no sorting is applied.
    fn list_nodes(&self, scope: &NodeScope) -> ServiceResult<Vec<Node>>;

    fn find_node(&self, id: IdType) -> ServiceResult<Option<Node>>;

    fn insert_node(&self, node: &NewNode) -> ServiceResult<Node>;

    fn update_node_status(&self, id: IdType, status: &str) -> ServiceResult<Node>;

    /// Hard delete. Sensors referencing the node identifier are left alone.
    fn delete_node(&self, id: IdType) -> ServiceResult<()>;

    fn list_sensors(&self, node_identifier: &str) -> ServiceResult<Vec<Sensor>>;
}
