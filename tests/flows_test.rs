use std::sync::Arc;

use nodewatch_server::backend::{IdentityProvider, MemoryBackend, Store};
use nodewatch_server::forms::{LoginForm, NodeForm, PasswordResetForm, SignUpForm};
use nodewatch_server::models::{NewSensor, Role, StatusChoice};
use nodewatch_server::session::{Session, Surface};
use nodewatch_server::web::errors::ServiceError;
use nodewatch_server::{auth, nodes, sensors, AppData};

#[macro_use]
extern crate lazy_static;

mod common;

use common::graphql::test_hasher;

fn setup() -> (AppData, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new(test_hasher()));
    (AppData::in_memory(backend.clone(), false), backend)
}

fn sign_up_form(email: &str, password: &str, confirm: &str) -> SignUpForm {
    SignUpForm {
        email: email.to_string(),
        user_id: "someone".to_string(),
        phone_no: "5550100".to_string(),
        password: password.to_string(),
        confirm_password: confirm.to_string(),
        role: None,
    }
}

fn login_form(email: &str, password: &str) -> LoginForm {
    LoginForm {
        email: email.to_string(),
        password: password.to_string(),
    }
}

fn node_form(node_id: &str, total_sensors: &str) -> NodeForm {
    NodeForm {
        phone: "5550199".to_string(),
        node_id: node_id.to_string(),
        location: "Roof".to_string(),
        total_sensors: total_sensors.to_string(),
    }
}

#[test]
fn test_identity_called_once_per_valid_sign_up() {
    let (app, backend) = setup();

    let err = auth::sign_up(&app, &sign_up_form("a@x.com", "pw", "other")).unwrap_err();
    assert!(matches!(err, ServiceError::Validation { .. }));
    assert_eq!(backend.sign_up_calls(), 0);

    let user = auth::sign_up(&app, &sign_up_form("a@x.com", "pw", "pw")).unwrap();
    assert_eq!(backend.sign_up_calls(), 1);
    assert_eq!(user.role, Role::User);

    let err = auth::sign_up(&app, &sign_up_form("A@x.com", "pw", "pw")).unwrap_err();
    assert_eq!(err, ServiceError::AlreadyPresent("Email".to_string()));
    assert_eq!(backend.sign_up_calls(), 2);
}

#[test]
fn test_directory_failure_leaves_orphan_identity() {
    let (app, backend) = setup();

    backend.reject_user_inserts(true);
    let err = auth::sign_up(&app, &sign_up_form("orphan@x.com", "pw", "pw")).unwrap_err();
    assert!(matches!(err, ServiceError::Backend(_)));

    assert_eq!(backend.identity_count(), 1);
    assert_eq!(app.store.find_user_by_email("orphan@x.com").unwrap(), None);
    assert!(app.identity.sign_in("orphan@x.com", "pw").is_ok());

    backend.reject_user_inserts(false);
    let err = auth::sign_in(&app, &login_form("orphan@x.com", "pw")).unwrap_err();
    assert_eq!(err, ServiceError::NotFound("User data".to_string()));
}

#[test]
fn test_sign_in_with_store_down() {
    let (app, backend) = setup();
    auth::sign_up(&app, &sign_up_form("b@x.com", "pw", "pw")).unwrap();

    backend.set_offline(true);
    let err = auth::sign_in(&app, &login_form("b@x.com", "pw")).unwrap_err();
    assert_eq!(err, ServiceError::NotFound("User data".to_string()));

    backend.set_offline(false);
    let (user, identity) = auth::sign_in(&app, &login_form(" B@X.com", "pw")).unwrap();
    assert_eq!(user.id, identity.id);
    assert_eq!(Session::for_user(user).surface(), Surface::UserDashboard);
}

#[test]
fn test_reset_password_with_store_down() {
    let (app, backend) = setup();
    auth::sign_up(&app, &sign_up_form("c@x.com", "old", "old")).unwrap();
    let (user, _) = auth::sign_in(&app, &login_form("c@x.com", "old")).unwrap();
    let session = Session::for_user(user);

    let form = PasswordResetForm {
        email: "c@x.com".to_string(),
        new_password: "new".to_string(),
        confirm_password: "new".to_string(),
    };

    // The lookup by email happens before the identity update
    backend.set_offline(true);
    assert!(matches!(auth::reset_password(&app, &session, &form), Err(ServiceError::Backend(_))));
    backend.set_offline(false);
    assert!(app.identity.sign_in("c@x.com", "old").is_ok());

    let (user, identity) = auth::reset_password(&app, &session, &form).unwrap();
    assert_eq!(user.password_reset_at, Some(identity.last_password_change));
    assert!(app.identity.sign_in("c@x.com", "new").is_ok());
    assert!(app.identity.sign_in("c@x.com", "old").is_err());

    let err = auth::reset_password(&app, &Session::LoggedOut, &form).unwrap_err();
    assert_eq!(err, ServiceError::LoginRequired);
}

#[test]
fn test_node_lifecycle() {
    let (app, backend) = setup();
    app.setup_admin("root@x.com", "pw".to_string(), false).unwrap();
    let user = auth::sign_up(&app, &sign_up_form("d@x.com", "pw", "pw")).unwrap();
    let admin = app.store.find_user_by_email("root@x.com").unwrap().unwrap();
    assert_eq!(admin.role, Role::Admin);

    let err = nodes::register_node(&app, &user, &node_form("N1", "abc")).unwrap_err();
    assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "totalSensors"));
    assert!(nodes::list_nodes(&app, &admin, None).unwrap().is_empty());

    let node = nodes::register_node(&app, &user, &node_form("N1", "3")).unwrap();
    assert_eq!(node.user_id, user.id);
    assert_eq!(node.status, "Pending");

    let err = nodes::update_node_status(&app, &user, node.id, StatusChoice::Active).unwrap_err();
    assert_eq!(err, ServiceError::Unauthorized);

    let node = nodes::update_node_status(&app, &admin, node.id, StatusChoice::Inactive).unwrap();
    assert_eq!(node.status, "inactive");

    backend.insert_sensor(NewSensor {
        node_id: "N1".to_string(),
        sensor_name: "humidity".to_string(),
        sensor_type: None,
        sensor_value: Some("40".to_string()),
        unit: Some("%".to_string()),
    });
    assert_eq!(sensors::list_sensors(&app, &user, "N1").unwrap().len(), 1);

    let err = nodes::delete_node(&app, &admin, node.id, false).unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));
    nodes::delete_node(&app, &admin, node.id, true).unwrap();

    assert!(nodes::list_nodes(&app, &user, None).unwrap().is_empty());
    assert_eq!(sensors::list_sensors(&app, &user, "N1").unwrap_err(), ServiceError::NotFound("Node".to_string()));
    assert_eq!(sensors::list_sensors(&app, &admin, "N1").unwrap().len(), 1);
}

#[test]
fn test_setup_admin_replaces_password() {
    let (app, backend) = setup();

    app.setup_admin("Root@X.com", "first".to_string(), false).unwrap();
    app.setup_admin("root@x.com", "second".to_string(), false).unwrap();
    assert!(app.identity.sign_in("root@x.com", "first").is_ok());
    assert_eq!(backend.identity_count(), 1);

    app.setup_admin("root@x.com", "second".to_string(), true).unwrap();
    assert!(app.identity.sign_in("root@x.com", "second").is_ok());
    assert!(app.identity.sign_in("root@x.com", "first").is_err());
}

#[test]
fn test_setup_admin_completes_orphan_identity() {
    let (app, backend) = setup();

    backend.reject_user_inserts(true);
    let err = app.setup_admin("root@x.com", "pw".to_string(), false).unwrap_err();
    assert!(matches!(err, ServiceError::Backend(_)));
    assert_eq!(backend.identity_count(), 1);

    backend.reject_user_inserts(false);
    app.setup_admin("root@x.com", "pw".to_string(), false).unwrap();
    assert_eq!(backend.identity_count(), 1);
    assert_eq!(backend.sign_up_calls(), 1);

    let (admin, _) = auth::sign_in(&app, &login_form("root@x.com", "pw")).unwrap();
    assert_eq!(admin.role, Role::Admin);
    assert_eq!(Session::for_user(admin).surface(), Surface::AdminDashboard);
}

#[test]
fn test_setup_admin_leaves_regular_user_alone() {
    let (app, _) = setup();
    auth::sign_up(&app, &sign_up_form("e@x.com", "pw", "pw")).unwrap();

    app.setup_admin("e@x.com", "other".to_string(), true).unwrap();
    assert!(app.identity.sign_in("e@x.com", "pw").is_ok());
    assert!(app.identity.sign_in("e@x.com", "other").is_err());

    let user = app.store.find_user_by_email("e@x.com").unwrap().unwrap();
    assert_eq!(user.role, Role::User);
    assert_eq!(user.password_reset_at, None);
}
