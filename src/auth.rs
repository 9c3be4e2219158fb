use chrono::Utc;
use log::{info, warn};

use crate::AppData;
use crate::flow::FormFlow;
use crate::forms::{LoginForm, PasswordResetForm, SignUpForm};
use crate::models::{AuthIdentity, User};
use crate::session::Session;
use crate::web::errors::{ServiceError, ServiceResult};

/// Creates the identity, then the directory row.
///
/// The two writes are independent. When the directory insert fails the
/// identity stays behind without a row and the insert error is returned.
pub fn sign_up(app: &AppData, form: &SignUpForm) -> ServiceResult<User> {
    let mut flow = FormFlow::new("sign_up");
    let valid = flow.validate(|| form.validate(app.allow_admin_signup))?;

    flow.submit(|| {
        let identity = app.identity.sign_up(&valid.email, &valid.password)?;

        let user = User {
            id: identity.id,
            user_id: valid.user_id.clone(),
            email: valid.email.clone(),
            phone_no: valid.phone_no.clone(),
            role: valid.role,
            created_at: Utc::now(),
            password_reset_at: None,
        };

        match app.store.insert_user(&user) {
            Ok(user) => {
                info!("Registered {} ({})", user.email, user.role);
                Ok(user)
            },
            Err(err) => {
                warn!("Identity {} for {} left without directory entry: {}", identity.id, identity.email, err);
                Err(err)
            },
        }
    })
}

/// Checks the credentials and loads the directory row that decides the role.
pub fn sign_in(app: &AppData, form: &LoginForm) -> ServiceResult<(User, AuthIdentity)> {
    let mut flow = FormFlow::new("sign_in");
    let email = flow.validate(|| form.validate())?;

    flow.submit(|| {
        let identity = app.identity.sign_in(&email, &form.password)?;

        let user = match app.store.find_user(&identity.id) {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!("Identity {} has no directory entry", identity.id);
                return Err(ServiceError::NotFound("User data".to_string()))
            },
            Err(err) => {
                warn!("Directory lookup for {} failed: {}", identity.id, err);
                return Err(ServiceError::NotFound("User data".to_string()))
            },
        };

        info!("{} signed in as {}", user.email, user.role);
        Ok((user, identity))
    })
}

/// Changes the password of the signed-in user and stamps the directory row.
pub fn reset_password(app: &AppData, session: &Session, form: &PasswordResetForm) -> ServiceResult<(User, AuthIdentity)> {
    let mut flow = FormFlow::new("reset_password");
    let email = flow.validate(|| form.validate())?;

    flow.submit(|| {
        let current = session.user().ok_or(ServiceError::LoginRequired)?;

        let target = app.store.find_user_by_email(&email)?
            .ok_or_else(|| ServiceError::NotFound("User".to_string()))?;

        // The provider only updates the identity behind the current session.
        if target.id != current.id {
            return Err(ServiceError::Unauthorized)
        }

        let identity = app.identity.update_password(&target.id, &form.new_password)?;

        let user = app.store.mark_password_reset(&target.id, identity.last_password_change)
            .map_err(|err| {
                warn!("Password of {} changed but directory not updated: {}", target.email, err);
                err
            })?;

        info!("Password reset for {}", user.email);
        Ok((user, identity))
    })
}
