use std::fmt;

use crate::models::Role;
use crate::web::errors::{ServiceError, ServiceResult};

const ALL_FIELDS_REQUIRED: &str = "All fields are required!";
const PASSWORDS_DIFFER: &str = "Passwords do not match!";

fn required(fields: &[(&str, &str)], message: &str) -> ServiceResult<()> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(ServiceError::validation(*name, message)),
        None => Ok(()),
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(juniper::GraphQLInputObject, Clone)]
pub struct SignUpForm {
    pub email: String,
    pub user_id: String,
    pub phone_no: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Option<Role>,
}

impl fmt::Debug for SignUpForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpForm")
            .field("email", &self.email)
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Clone, PartialEq)]
pub struct ValidSignUp {
    pub email: String,
    pub user_id: String,
    pub phone_no: String,
    pub password: String,
    pub role: Role,
}

impl fmt::Debug for ValidSignUp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidSignUp")
            .field("email", &self.email)
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .finish()
    }
}

impl SignUpForm {
    pub fn validate(&self, allow_admin: bool) -> ServiceResult<ValidSignUp> {
        required(&[
            ("email", self.email.as_str()),
            ("userId", self.user_id.as_str()),
            ("phoneNo", self.phone_no.as_str()),
            ("password", self.password.as_str()),
            ("confirmPassword", self.confirm_password.as_str()),
        ], ALL_FIELDS_REQUIRED)?;

        if self.password != self.confirm_password {
            return Err(ServiceError::validation("confirmPassword", PASSWORDS_DIFFER))
        }

        let role = self.role.unwrap_or(Role::User);
        if role == Role::Admin && !allow_admin {
            return Err(ServiceError::validation("role", "Admin accounts cannot be self-registered"))
        }

        Ok(ValidSignUp {
            email: normalize_email(&self.email),
            user_id: self.user_id.trim().to_string(),
            phone_no: self.phone_no.trim().to_string(),
            password: self.password.clone(),
            role,
        })
    }
}

#[derive(juniper::GraphQLInputObject, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm").field("email", &self.email).finish()
    }
}

impl LoginForm {
    /// Returns the normalized email.
    pub fn validate(&self) -> ServiceResult<String> {
        required(&[
            ("email", self.email.as_str()),
            ("password", self.password.as_str()),
        ], "Please enter email and password!")?;

        Ok(normalize_email(&self.email))
    }
}

#[derive(juniper::GraphQLInputObject, Clone)]
pub struct PasswordResetForm {
    pub email: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl fmt::Debug for PasswordResetForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordResetForm").field("email", &self.email).finish()
    }
}

impl PasswordResetForm {
    pub fn validate(&self) -> ServiceResult<String> {
        required(&[
            ("email", self.email.as_str()),
            ("newPassword", self.new_password.as_str()),
            ("confirmPassword", self.confirm_password.as_str()),
        ], ALL_FIELDS_REQUIRED)?;

        if self.new_password != self.confirm_password {
            return Err(ServiceError::validation("confirmPassword", PASSWORDS_DIFFER))
        }

        Ok(normalize_email(&self.email))
    }
}

/// Node registration as typed by the owner. `total_sensors` arrives as text.
#[derive(Debug, juniper::GraphQLInputObject, Clone, PartialEq)]
pub struct NodeForm {
    pub phone: String,
    pub node_id: String,
    pub location: String,
    pub total_sensors: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidNode {
    pub phone: String,
    pub node_id: String,
    pub location: String,
    pub total_sensors: i32,
}

impl NodeForm {
    pub fn validate(&self) -> ServiceResult<ValidNode> {
        required(&[
            ("phone", self.phone.as_str()),
            ("nodeId", self.node_id.as_str()),
            ("location", self.location.as_str()),
            ("totalSensors", self.total_sensors.as_str()),
        ], "Please fill all fields!")?;

        let total_sensors = self.total_sensors.trim().parse::<i32>()
            .map_err(|_| ServiceError::validation("totalSensors", "Total sensors must be a whole number"))?;

        Ok(ValidNode {
            phone: self.phone.trim().to_string(),
            node_id: self.node_id.trim().to_string(),
            location: self.location.trim().to_string(),
            total_sensors,
        })
    }
}
