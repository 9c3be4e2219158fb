use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{AuthIdentity, IdType, NewNode, NewSensor, Node, Sensor, User, UserId, UserRow};
use crate::security::PasswordHasher;
use crate::web::errors::{ServiceError, ServiceResult};

use super::{IdentityProvider, NodeScope, Store};

struct IdentityRecord {
    identity: AuthIdentity,
    password_hash: String,
}

#[derive(Default)]
struct Tables {
    identities: Vec<IdentityRecord>,
    users: Vec<UserRow>,
    nodes: Vec<Node>,
    sensors: Vec<Sensor>,
    last_node_id: IdType,
    last_sensor_id: IdType,
}

/// Process-local backend for tests and runs without `DATABASE_URL`.
///
/// Rows live in insertion order. The failure switches make the store behave
/// like an unreachable service, the identity side keeps working.
pub struct MemoryBackend {
    tables: Mutex<Tables>,
    hasher: PasswordHasher,
    sign_up_calls: AtomicUsize,
    offline: AtomicBool,
    reject_user_inserts: AtomicBool,
}

impl MemoryBackend {
    pub fn new(hasher: PasswordHasher) -> Self {
        MemoryBackend {
            tables: Mutex::new(Tables::default()),
            hasher,
            sign_up_calls: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            reject_user_inserts: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_online(&self) -> ServiceResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(ServiceError::Backend("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    /// Makes every table call fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes directory inserts fail while identities can still be created.
    pub fn reject_user_inserts(&self, reject: bool) {
        self.reject_user_inserts.store(reject, Ordering::SeqCst);
    }

    pub fn sign_up_calls(&self) -> usize {
        self.sign_up_calls.load(Ordering::SeqCst)
    }

    pub fn identity_count(&self) -> usize {
        self.lock().identities.len()
    }

    /// Stands in for the ingest pipeline that fills the sensors table.
    pub fn insert_sensor(&self, sensor: NewSensor) -> Sensor {
        let mut tables = self.lock();
        tables.last_sensor_id += 1;

        let row = Sensor {
            id: tables.last_sensor_id,
            node_id: sensor.node_id,
            sensor_name: sensor.sensor_name,
            sensor_type: sensor.sensor_type,
            sensor_value: sensor.sensor_value,
            unit: sensor.unit,
            created_at: Utc::now(),
        };
        tables.sensors.push(row.clone());
        row
    }
}

impl IdentityProvider for MemoryBackend {
    fn sign_up(&self, email: &str, password: &str) -> ServiceResult<AuthIdentity> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        let password_hash = self.hasher.hash_password(password)?;

        let mut tables = self.lock();
        if tables.identities.iter().any(|x| x.identity.email == email) {
            return Err(ServiceError::AlreadyPresent("Email".to_string()))
        }

        let identity = AuthIdentity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            last_password_change: Utc::now(),
        };
        tables.identities.push(IdentityRecord {
            identity: identity.clone(),
            password_hash,
        });
        Ok(identity)
    }

    fn sign_in(&self, email: &str, password: &str) -> ServiceResult<AuthIdentity> {
        let (identity, hash) = {
            let tables = self.lock();
            match tables.identities.iter().find(|x| x.identity.email == email) {
                None => return Err(ServiceError::WrongPassword),
                Some(x) => (x.identity.clone(), x.password_hash.clone()),
            }
        };

        if !self.hasher.verify_hash(hash.as_str(), password) {
            Err(ServiceError::WrongPassword)
        } else {
            Ok(identity)
        }
    }

    fn get_identity(&self, id: &UserId) -> ServiceResult<Option<AuthIdentity>> {
        Ok(self.lock().identities.iter()
            .find(|x| &x.identity.id == id)
            .map(|x| x.identity.clone()))
    }

    fn find_identity(&self, email: &str) -> ServiceResult<Option<AuthIdentity>> {
        Ok(self.lock().identities.iter()
            .find(|x| x.identity.email == email)
            .map(|x| x.identity.clone()))
    }

    fn update_password(&self, id: &UserId, password: &str) -> ServiceResult<AuthIdentity> {
        let password_hash = self.hasher.hash_password(password)?;

        let mut tables = self.lock();
        let record = tables.identities.iter_mut()
            .find(|x| &x.identity.id == id)
            .ok_or_else(|| ServiceError::NotFound("User".to_string()))?;

        record.password_hash = password_hash;
        record.identity.last_password_change = Utc::now();
        Ok(record.identity.clone())
    }
}

impl Store for MemoryBackend {
    fn insert_user(&self, user: &User) -> ServiceResult<User> {
        self.ensure_online()?;
        if self.reject_user_inserts.load(Ordering::SeqCst) {
            return Err(ServiceError::Backend("users insert rejected".to_string()))
        }

        let mut tables = self.lock();
        if tables.users.iter().any(|x| x.id == user.id || x.email == user.email) {
            return Err(ServiceError::AlreadyPresent("User".to_string()))
        }
        let row = UserRow::from(user);
        tables.users.push(row.clone());
        Ok(row.into())
    }

    fn find_user(&self, id: &UserId) -> ServiceResult<Option<User>> {
        self.ensure_online()?;
        Ok(self.lock().users.iter()
            .find(|x| &x.id == id)
            .cloned()
            .map(User::from))
    }

    fn find_user_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        self.ensure_online()?;
        Ok(self.lock().users.iter()
            .find(|x| x.email == email)
            .cloned()
            .map(User::from))
    }

    fn list_users(&self) -> ServiceResult<Vec<User>> {
        self.ensure_online()?;
        Ok(self.lock().users.iter().cloned().map(User::from).collect())
    }

    fn mark_password_reset(&self, id: &UserId, at: DateTime<Utc>) -> ServiceResult<User> {
        self.ensure_online()?;
        let mut tables = self.lock();
        let row = tables.users.iter_mut()
            .find(|x| &x.id == id)
            .ok_or_else(|| ServiceError::NotFound("User".to_string()))?;

        row.passwordresetat = Some(at);
        Ok(row.clone().into())
    }

    fn list_nodes(&self, scope: &NodeScope) -> ServiceResult<Vec<Node>> {
        self.ensure_online()?;
        Ok(self.lock().nodes.iter()
            .filter(|x| scope.includes(x))
            .cloned()
            .collect())
    }

    fn find_node(&self, id: IdType) -> ServiceResult<Option<Node>> {
        self.ensure_online()?;
        Ok(self.lock().nodes.iter().find(|x| x.id == id).cloned())
    }

    fn insert_node(&self, node: &NewNode) -> ServiceResult<Node> {
        self.ensure_online()?;
        let mut tables = self.lock();
        tables.last_node_id += 1;

        let row = Node {
            id: tables.last_node_id,
            user_id: node.user_id,
            user_email: node.user_email.clone(),
            phone: node.phone.clone(),
            node_id: node.node_id.clone(),
            location: node.location.clone(),
            total_sensors: node.total_sensors,
            status: node.status.clone(),
            created_at: Utc::now(),
        };
        tables.nodes.push(row.clone());
        Ok(row)
    }

    fn update_node_status(&self, id: IdType, status: &str) -> ServiceResult<Node> {
        self.ensure_online()?;
        let mut tables = self.lock();
        let node = tables.nodes.iter_mut()
            .find(|x| x.id == id)
            .ok_or_else(|| ServiceError::NotFound("Node".to_string()))?;

        node.status = status.to_string();
        Ok(node.clone())
    }

    fn delete_node(&self, id: IdType) -> ServiceResult<()> {
        self.ensure_online()?;
        let mut tables = self.lock();
        let before = tables.nodes.len();
        tables.nodes.retain(|x| x.id != id);

        if tables.nodes.len() == before {
            Err(ServiceError::NotFound("Node".to_string()))
        } else {
            Ok(())
        }
    }

    fn list_sensors(&self, node_identifier: &str) -> ServiceResult<Vec<Sensor>> {
        self.ensure_online()?;
        Ok(self.lock().sensors.iter()
            .filter(|x| x.node_id == node_identifier)
            .cloned()
            .collect())
    }
}
