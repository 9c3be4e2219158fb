use chrono::{DateTime, Utc};
use derive_more::Display;
use uuid::Uuid;

use super::schema::*;

pub type IdType = i32;

/// Identifier issued by the identity provider, shared by the directory row.
pub type UserId = Uuid;

#[derive(Debug, Display, Clone, Copy, juniper::GraphQLEnum, PartialEq, Eq)]
pub enum Role {
    #[display(fmt = "user")]
    User,
    #[display(fmt = "admin")]
    Admin,
}

impl Role {
    pub fn from_db(name: &str) -> Option<Role> {
        match name {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn to_db(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// Node status values observed in the store. The column itself is free text.
#[derive(Debug, Display, Clone, Copy, juniper::GraphQLEnum, PartialEq, Eq)]
pub enum NodeStatus {
    #[display(fmt = "Pending")]
    Pending,
    #[display(fmt = "active")]
    Active,
    #[display(fmt = "inactive")]
    Inactive,
}

impl NodeStatus {
    pub fn from_db(value: &str) -> Option<NodeStatus> {
        match value {
            "Pending" => Some(NodeStatus::Pending),
            "active" => Some(NodeStatus::Active),
            "inactive" => Some(NodeStatus::Inactive),
            _ => None,
        }
    }

    pub fn to_db(&self) -> &'static str {
        match self {
            NodeStatus::Pending => "Pending",
            NodeStatus::Active => "active",
            NodeStatus::Inactive => "inactive",
        }
    }
}

/// The only targets an admin may pick when editing a node status.
#[derive(Debug, Clone, Copy, juniper::GraphQLEnum, PartialEq, Eq)]
pub enum StatusChoice {
    Active,
    Inactive,
}

impl From<StatusChoice> for NodeStatus {
    fn from(choice: StatusChoice) -> NodeStatus {
        match choice {
            StatusChoice::Active => NodeStatus::Active,
            StatusChoice::Inactive => NodeStatus::Inactive,
        }
    }
}

/// Directory entry as the application sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub user_id: String,
    pub email: String,
    pub phone_no: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub password_reset_at: Option<DateTime<Utc>>,
}

/// Directory entry as stored: the `users` table uses abbreviated column names.
#[derive(Debug, Clone, PartialEq, Queryable, Insertable)]
#[diesel(table_name = users)]
pub struct UserRow {
    pub id: Uuid,
    pub userid: String,
    pub email: String,
    pub phoneno: String,
    pub role: String,
    pub createdat: DateTime<Utc>,
    pub passwordresetat: Option<DateTime<Utc>>,
}

// Column adapter between the `users` table and `User`. Every backend goes
// through these two conversions.
impl From<UserRow> for User {
    fn from(row: UserRow) -> User {
        User {
            id: row.id,
            user_id: row.userid,
            email: row.email,
            phone_no: row.phoneno,
            role: Role::from_db(row.role.as_str()).unwrap_or(Role::User),
            created_at: row.createdat,
            password_reset_at: row.passwordresetat,
        }
    }
}

impl From<&User> for UserRow {
    fn from(user: &User) -> UserRow {
        UserRow {
            id: user.id,
            userid: user.user_id.clone(),
            email: user.email.clone(),
            phoneno: user.phone_no.clone(),
            role: user.role.to_db().to_string(),
            createdat: user.created_at,
            passwordresetat: user.password_reset_at,
        }
    }
}

/// Record kept by the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthIdentity {
    pub id: UserId,
    pub email: String,
    pub last_password_change: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Queryable)]
pub struct Node {
    pub id: IdType,
    pub user_id: UserId,
    pub user_email: String,
    pub phone: String,
    pub node_id: String,
    pub location: String,
    pub total_sensors: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Node {
    pub fn known_status(&self) -> Option<NodeStatus> {
        NodeStatus::from_db(self.status.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = nodes)]
pub struct NewNode {
    pub user_id: UserId,
    pub user_email: String,
    pub phone: String,
    pub node_id: String,
    pub location: String,
    pub total_sensors: i32,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Queryable)]
pub struct Sensor {
    pub id: IdType,
    pub node_id: String,
    pub sensor_name: String,
    pub sensor_type: Option<String>,
    pub sensor_value: Option<String>,
    pub unit: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Sensor {
    /// The stored value is loosely typed, only some readings are numbers.
    pub fn value_as_number(&self) -> Option<f64> {
        self.sensor_value.as_ref().and_then(|x| x.trim().parse::<f64>().ok())
    }
}

/// Sensor rows are written by the ingest side, never by this service.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSensor {
    pub node_id: String,
    pub sensor_name: String,
    pub sensor_type: Option<String>,
    pub sensor_value: Option<String>,
    pub unit: Option<String>,
}
