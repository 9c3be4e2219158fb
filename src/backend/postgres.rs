use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use uuid::Uuid;

use crate::models::{AuthIdentity, IdType, NewNode, Node, Sensor, User, UserId, UserRow};
use crate::schema::auth_identity;
use crate::security::PasswordHasher;
use crate::web::errors::{ServiceError, ServiceResult};

use super::{IdentityProvider, NodeScope, Store};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

#[derive(Debug, Queryable)]
struct IdentityRow {
    id: Uuid,
    email: String,
    password_hash: String,
    last_password_change: DateTime<Utc>,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

impl From<IdentityRow> for AuthIdentity {
    fn from(row: IdentityRow) -> AuthIdentity {
        AuthIdentity {
            id: row.id,
            email: row.email,
            last_password_change: row.last_password_change,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = auth_identity)]
struct NewIdentityRow {
    id: Uuid,
    email: String,
    password_hash: String,
    last_password_change: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

/// Both halves of the backend on one Postgres database.
pub struct PgBackend {
    pool: Pool,
    hasher: PasswordHasher,
}

impl PgBackend {
    pub fn connect(database_url: &str, pool_size: u32, hasher: PasswordHasher) -> ServiceResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = r2d2::Pool::builder()
            .max_size(pool_size)
            .build(manager)?;

        Ok(PgBackend { pool, hasher })
    }

    pub fn setup_migrations(&self) -> ServiceResult<()> {
        let mut conn = self.get_connection()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| ServiceError::InternalServerError(format!("Migration error: {}", err)))?;
        Ok(())
    }

    fn get_connection(&self) -> ServiceResult<PooledConnection<ConnectionManager<PgConnection>>> {
        Ok(self.pool.get()?)
    }

    fn find_identity_by_email(&self, email: &str) -> ServiceResult<Option<IdentityRow>> {
        use crate::schema::auth_identity::dsl;

        let mut conn = self.get_connection()?;
        Ok(dsl::auth_identity
            .filter(dsl::email.eq(email))
            .first::<IdentityRow>(&mut conn)
            .optional()?)
    }
}

impl IdentityProvider for PgBackend {
    fn sign_up(&self, email: &str, password: &str) -> ServiceResult<AuthIdentity> {
        use crate::schema::auth_identity::dsl;

        let now = Utc::now();
        let value = NewIdentityRow {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: self.hasher.hash_password(password)?,
            last_password_change: now,
            created_at: now,
        };

        let mut conn = self.get_connection()?;
        let row = diesel::insert_into(dsl::auth_identity)
            .values(&value)
            .get_result::<IdentityRow>(&mut conn)
            .map_err(|err| ServiceError::unique_as(err, "Email"))?;
        Ok(row.into())
    }

    fn sign_in(&self, email: &str, password: &str) -> ServiceResult<AuthIdentity> {
        let row = match self.find_identity_by_email(email)? {
            None => return Err(ServiceError::WrongPassword),
            Some(row) => row,
        };

        if !self.hasher.verify_hash(row.password_hash.as_str(), password) {
            Err(ServiceError::WrongPassword)
        } else {
            Ok(row.into())
        }
    }

    fn get_identity(&self, id: &UserId) -> ServiceResult<Option<AuthIdentity>> {
        use crate::schema::auth_identity::dsl;

        let mut conn = self.get_connection()?;
        Ok(dsl::auth_identity.find(id)
            .first::<IdentityRow>(&mut conn)
            .optional()?
            .map(AuthIdentity::from))
    }

    fn find_identity(&self, email: &str) -> ServiceResult<Option<AuthIdentity>> {
        Ok(self.find_identity_by_email(email)?.map(AuthIdentity::from))
    }

    fn update_password(&self, id: &UserId, password: &str) -> ServiceResult<AuthIdentity> {
        use crate::schema::auth_identity::dsl;

        let hash = self.hasher.hash_password(password)?;
        let mut conn = self.get_connection()?;

        diesel::update(dsl::auth_identity.find(id))
            .set((dsl::password_hash.eq(hash), dsl::last_password_change.eq(Utc::now())))
            .get_result::<IdentityRow>(&mut conn)
            .optional()?
            .map(AuthIdentity::from)
            .ok_or_else(|| ServiceError::NotFound("User".to_string()))
    }
}

impl Store for PgBackend {
    fn insert_user(&self, user: &User) -> ServiceResult<User> {
        use crate::schema::users::dsl;

        let mut conn = self.get_connection()?;
        let row = diesel::insert_into(dsl::users)
            .values(UserRow::from(user))
            .get_result::<UserRow>(&mut conn)
            .map_err(|err| ServiceError::unique_as(err, "User"))?;
        Ok(row.into())
    }

    fn find_user(&self, id: &UserId) -> ServiceResult<Option<User>> {
        use crate::schema::users::dsl;

        let mut conn = self.get_connection()?;
        Ok(dsl::users.find(id)
            .first::<UserRow>(&mut conn)
            .optional()?
            .map(User::from))
    }

    fn find_user_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        use crate::schema::users::dsl;

        let mut conn = self.get_connection()?;
        Ok(dsl::users.filter(dsl::email.eq(email))
            .first::<UserRow>(&mut conn)
            .optional()?
            .map(User::from))
    }

    fn list_users(&self) -> ServiceResult<Vec<User>> {
        use crate::schema::users::dsl;

        let mut conn = self.get_connection()?;
        Ok(dsl::users.load::<UserRow>(&mut conn)?
            .into_iter()
            .map(User::from)
            .collect())
    }

    fn mark_password_reset(&self, id: &UserId, at: DateTime<Utc>) -> ServiceResult<User> {
        use crate::schema::users::dsl;

        let mut conn = self.get_connection()?;
        diesel::update(dsl::users.find(id))
            .set(dsl::passwordresetat.eq(Some(at)))
            .get_result::<UserRow>(&mut conn)
            .optional()?
            .map(User::from)
            .ok_or_else(|| ServiceError::NotFound("User".to_string()))
    }

    fn list_nodes(&self, scope: &NodeScope) -> ServiceResult<Vec<Node>> {
        use crate::schema::nodes::dsl;

        let mut conn = self.get_connection()?;
        let nodes = match scope {
            NodeScope::All => dsl::nodes.load::<Node>(&mut conn)?,
            NodeScope::OwnedBy(owner) => dsl::nodes
                .filter(dsl::user_id.eq(owner))
                .load::<Node>(&mut conn)?,
        };
        Ok(nodes)
    }

    fn find_node(&self, id: IdType) -> ServiceResult<Option<Node>> {
        use crate::schema::nodes::dsl;

        let mut conn = self.get_connection()?;
        Ok(dsl::nodes.find(id).first::<Node>(&mut conn).optional()?)
    }

    fn insert_node(&self, node: &NewNode) -> ServiceResult<Node> {
        use crate::schema::nodes::dsl;

        let mut conn = self.get_connection()?;
        Ok(diesel::insert_into(dsl::nodes)
            .values(node)
            .get_result::<Node>(&mut conn)?)
    }

    fn update_node_status(&self, id: IdType, status: &str) -> ServiceResult<Node> {
        use crate::schema::nodes::dsl;

        let mut conn = self.get_connection()?;
        diesel::update(dsl::nodes.find(id))
            .set(dsl::status.eq(status))
            .get_result::<Node>(&mut conn)
            .optional()?
            .ok_or_else(|| ServiceError::NotFound("Node".to_string()))
    }

    fn delete_node(&self, id: IdType) -> ServiceResult<()> {
        use crate::schema::nodes::dsl;

        let mut conn = self.get_connection()?;
        let del_count = diesel::delete(dsl::nodes.find(id))
            .execute(&mut conn)?;

        if del_count != 1 {
            Err(ServiceError::NotFound("Node".to_string()))
        } else {
            Ok(())
        }
    }

    fn list_sensors(&self, node_identifier: &str) -> ServiceResult<Vec<Sensor>> {
        use crate::schema::sensors::dsl;

        let mut conn = self.get_connection()?;
        Ok(dsl::sensors
            .filter(dsl::node_id.eq(node_identifier))
            .load::<Sensor>(&mut conn)?)
    }
}
