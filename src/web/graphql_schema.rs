use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use juniper::{EmptySubscription, RootNode};
use log::error;
use uuid::Uuid;

use crate::{auth, nodes, sensors, AppData};
use crate::forms::{LoginForm, NodeForm, PasswordResetForm, SignUpForm};
use crate::models::{AuthIdentity, IdType, Node, NodeStatus, Role, Sensor, StatusChoice, User};
use crate::security::{parse_identity, save_identity, PermissionCheckable};
use crate::session::{Session, SessionEvent, SessionStateKind, Surface};

use super::errors::{ServiceError, ServiceResult};

pub const API_VERSION: &str = "1.0";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Per-request state: the raw cookie value and the session it resolved to.
pub struct Context {
    pub app: Arc<AppData>,
    identity: Mutex<Option<String>>,
    session: Mutex<Session>,
    unavailable: Option<String>,
}

impl Context {
    pub fn new(app: Arc<AppData>, identity: Option<String>) -> Context {
        let resolved = match identity.as_deref() {
            None => Ok(None),
            Some(raw) => resolve_session(&app, raw),
        };

        let (identity, session, unavailable) = match resolved {
            Ok(Some(user)) => (identity, Session::for_user(user), None),
            Ok(None) => (None, Session::LoggedOut, None),
            Err(err) => {
                // Keep the cookie, the backend may come back.
                error!("Cannot resolve session: {}", err);
                (identity, Session::LoggedOut, Some(err.to_string()))
            },
        };

        Context {
            app,
            identity: Mutex::new(identity),
            session: Mutex::new(session),
            unavailable,
        }
    }

    pub fn session(&self) -> Session {
        lock(&self.session).clone()
    }

    pub fn get_user(&self) -> Option<User> {
        lock(&self.session).user().cloned()
    }

    pub fn get_user_required(&self) -> ServiceResult<User> {
        if let Some(reason) = self.unavailable.as_ref() {
            return Err(ServiceError::Backend(reason.clone()))
        }
        self.get_user().ok_or(ServiceError::LoginRequired)
    }

    pub fn save_session(&self, event: SessionEvent, identity: Option<&AuthIdentity>) -> ServiceResult<Session> {
        let cookie = match identity {
            Some(identity) => Some(save_identity(identity)?),
            None => None,
        };

        let mut session = lock(&self.session);
        *session = session.clone().transition(event);
        *lock(&self.identity) = cookie;
        Ok(session.clone())
    }

    /// Cookie value to hand back to the client once the request is done.
    pub fn into_identity(self) -> Option<String> {
        self.identity.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn resolve_session(app: &AppData, raw: &str) -> ServiceResult<Option<User>> {
    let identity = match parse_identity(app, raw)? {
        None => return Ok(None),
        Some(x) => x,
    };
    app.store.find_user(&identity.id)
}

impl juniper::Context for Context {}

fn parse_user_id(id: &str) -> ServiceResult<Uuid> {
    Uuid::parse_str(id.trim())
        .map_err(|_| ServiceError::BadRequest(format!("Invalid user id: {}", id)))
}

#[derive(juniper::GraphQLObject)]
#[graphql(Context = Context, description = "Current session and the dashboard to show for it")]
pub struct SessionView {
    pub state: SessionStateKind,
    pub surface: Surface,
    pub user: Option<User>,
}

impl From<Session> for SessionView {
    fn from(session: Session) -> SessionView {
        SessionView {
            state: session.kind(),
            surface: session.surface(),
            user: session.user().cloned(),
        }
    }
}

#[juniper::graphql_object(
    description = "A directory entry",
    context = Context,
)]
impl User {
    pub fn id(&self) -> String {
        self.id.to_string()
    }

    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    pub fn phone_no(&self) -> &str {
        self.phone_no.as_str()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn password_reset_at(&self) -> Option<DateTime<Utc>> {
        self.password_reset_at
    }

    pub fn nodes(&self, context: &Context) -> ServiceResult<Vec<Node>> {
        let viewer = context.get_user_required()?;
        nodes::list_nodes(&context.app, &viewer, Some(self.id))
    }
}

#[juniper::graphql_object(
    description = "A registered device",
    context = Context,
)]
impl Node {
    pub fn id(&self) -> IdType {
        self.id
    }

    pub fn owner_id(&self) -> String {
        self.user_id.to_string()
    }

    pub fn owner_email(&self) -> &str {
        self.user_email.as_str()
    }

    pub fn phone(&self) -> &str {
        self.phone.as_str()
    }

    pub fn node_id(&self) -> &str {
        self.node_id.as_str()
    }

    pub fn location(&self) -> &str {
        self.location.as_str()
    }

    pub fn total_sensors(&self) -> i32 {
        self.total_sensors
    }

    /// Stored status text, shown as is.
    pub fn status(&self) -> &str {
        self.status.as_str()
    }

    pub fn status_kind(&self) -> Option<NodeStatus> {
        self.known_status()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn owner(&self, context: &Context) -> ServiceResult<Option<User>> {
        let viewer = context.get_user_required()?;
        viewer.ensure_owner_visible(&self.user_id)?;
        context.app.store.find_user(&self.user_id)
    }

    pub fn sensors(&self, context: &Context) -> ServiceResult<Vec<Sensor>> {
        let viewer = context.get_user_required()?;
        sensors::list_sensors(&context.app, &viewer, self.node_id.as_str())
    }
}

#[juniper::graphql_object(
    description = "A reading stored for a node identifier",
    context = Context,
)]
impl Sensor {
    pub fn id(&self) -> IdType {
        self.id
    }

    pub fn node_id(&self) -> &str {
        self.node_id.as_str()
    }

    pub fn sensor_name(&self) -> &str {
        self.sensor_name.as_str()
    }

    pub fn sensor_type(&self) -> Option<&str> {
        self.sensor_type.as_deref()
    }

    pub fn sensor_value(&self) -> Option<&str> {
        self.sensor_value.as_deref()
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// The value as a number, when it is one.
    pub fn numeric_value(&self) -> Option<f64> {
        self.value_as_number()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

pub struct QueryRoot;

#[juniper::graphql_object(
    context = Context,
)]
impl QueryRoot {
    fn api_version() -> &'static str {
        API_VERSION
    }

    fn session(context: &Context) -> SessionView {
        context.session().into()
    }

    fn user_me(context: &Context) -> ServiceResult<User> {
        context.get_user_required()
    }

    fn users(context: &Context) -> ServiceResult<Vec<User>> {
        context.get_user_required()?.ensure_admin()?;
        context.app.store.list_users()
    }

    fn user(context: &Context, id: String) -> ServiceResult<User> {
        let viewer = context.get_user_required()?;
        let id = parse_user_id(&id)?;
        viewer.ensure_owner_visible(&id)?;

        context.app.store.find_user(&id)?
            .ok_or_else(|| ServiceError::NotFound("User".to_string()))
    }

    #[graphql(arguments(owner_id(description = "Only nodes of this user")))]
    fn nodes(context: &Context, owner_id: Option<String>) -> ServiceResult<Vec<Node>> {
        let viewer = context.get_user_required()?;
        let owner = match owner_id {
            Some(x) => Some(parse_user_id(&x)?),
            None => None,
        };
        nodes::list_nodes(&context.app, &viewer, owner)
    }

    fn node(context: &Context, id: IdType) -> ServiceResult<Node> {
        let viewer = context.get_user_required()?;
        nodes::find_node(&context.app, &viewer, id)
    }

    fn sensors(context: &Context, node_id: String) -> ServiceResult<Vec<Sensor>> {
        let viewer = context.get_user_required()?;
        sensors::list_sensors(&context.app, &viewer, node_id.as_str())
    }
}

pub struct MutationRoot;

#[juniper::graphql_object(
    context = Context,
)]
impl MutationRoot {
    fn sign_up(context: &Context, data: SignUpForm) -> ServiceResult<User> {
        auth::sign_up(&context.app, &data)
    }

    fn login(context: &Context, data: LoginForm) -> ServiceResult<SessionView> {
        let (user, identity) = auth::sign_in(&context.app, &data)?;
        let session = context.save_session(SessionEvent::SignedIn(user), Some(&identity))?;
        Ok(session.into())
    }

    fn logout(context: &Context) -> ServiceResult<SessionView> {
        let session = context.save_session(SessionEvent::SignedOut, None)?;
        Ok(session.into())
    }

    fn reset_password(context: &Context, data: PasswordResetForm) -> ServiceResult<User> {
        let (user, identity) = auth::reset_password(&context.app, &context.session(), &data)?;

        // The old cookie predates the change, issue a fresh one.
        context.save_session(SessionEvent::SignedIn(user.clone()), Some(&identity))?;
        Ok(user)
    }

    fn register_node(context: &Context, data: NodeForm) -> ServiceResult<Node> {
        let user = context.get_user_required()?;
        nodes::register_node(&context.app, &user, &data)
    }

    fn update_node_status(context: &Context, id: IdType, status: StatusChoice) -> ServiceResult<Node> {
        let user = context.get_user_required()?;
        nodes::update_node_status(&context.app, &user, id, status)
    }

    #[graphql(arguments(
        id(description = "Primary key of the node to delete"),
        confirm(description = "Must be true, the delete cannot be undone"),
    ))]
    fn delete_node(context: &Context, id: IdType, confirm: Option<bool>) -> ServiceResult<bool> {
        let user = context.get_user_required()?;
        nodes::delete_node(&context.app, &user, id, confirm.unwrap_or(false))?;
        Ok(true)
    }
}

pub type Schema = RootNode<'static, QueryRoot, MutationRoot, EmptySubscription<Context>>;

pub fn create_schema() -> Schema {
    Schema::new(QueryRoot, MutationRoot, EmptySubscription::<Context>::new())
}
