use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use derive_more::Display;
use diesel::result::{DatabaseErrorKind, Error as DBError};
use juniper::{FieldError, IntoFieldError, Object, ScalarValue, Value};

#[derive(Debug, Display, PartialEq)]
pub enum ServiceError {
    #[display(fmt = "Internal Server Error: {}", _0)]
    InternalServerError(String),

    #[display(fmt = "Backend Error: {}", _0)]
    Backend(String),

    #[display(fmt = "Bad Request: {}", _0)]
    BadRequest(String),

    #[display(fmt = "{}: {}", field, message)]
    Validation { field: String, message: String },

    #[display(fmt = "{} Not Found", _0)]
    NotFound(String),

    #[display(fmt = "Unauthorized")]
    Unauthorized,

    #[display(fmt = "Wrong Password")]
    WrongPassword,

    #[display(fmt = "Login Required")]
    LoginRequired,

    #[display(fmt = "{} Already Present", _0)]
    AlreadyPresent(String),
}

impl ServiceError {
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> ServiceError {
        ServiceError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Reports a unique violation as `AlreadyPresent(what)` without the
    /// database details.
    pub fn unique_as(error: DBError, what: &str) -> ServiceError {
        match error {
            DBError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                ServiceError::AlreadyPresent(what.to_string())
            }
            err => err.into(),
        }
    }

    /// Stable tag reported to clients in `extensions.type`.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ServiceError::Backend(_) => "BACKEND_ERROR",
            ServiceError::BadRequest(_) => "BAD_REQUEST",
            ServiceError::Validation { .. } => "VALIDATION",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Unauthorized => "UNAUTHORIZED",
            ServiceError::WrongPassword => "WRONG_PASSWORD",
            ServiceError::LoginRequired => "LOGIN_REQUIRED",
            ServiceError::AlreadyPresent(_) => "ALREADY_PRESENT",
        }
    }

    /// Short message meant for an alert box, no diagnostics.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::InternalServerError(_) => "Internal server error".to_string(),
            ServiceError::Backend(_) => "Something went wrong. Please try again.".to_string(),
            ServiceError::BadRequest(message) => message.clone(),
            ServiceError::Validation { message, .. } => message.clone(),
            ServiceError::NotFound(type_name) => format!("{} not found!", type_name),
            ServiceError::Unauthorized => "Higher authorization required".to_string(),
            ServiceError::WrongPassword => "Invalid email or password!".to_string(),
            ServiceError::LoginRequired => "Login required".to_string(),
            ServiceError::AlreadyPresent(type_name) => format!("{} already taken", type_name),
        }
    }
}

impl<S: ScalarValue> IntoFieldError<S> for ServiceError {
    fn into_field_error(self) -> FieldError<S> {
        let mut extensions = Object::with_capacity(2);
        extensions.add_field("type", Value::scalar(self.kind().to_string()));
        match &self {
            ServiceError::Validation { field, .. } => {
                extensions.add_field("field", Value::scalar(field.clone()));
            }
            ServiceError::InternalServerError(info) | ServiceError::Backend(info) => {
                log::error!("{}: {}", self.kind(), info);
            }
            _ => {}
        }
        FieldError::new(self.user_message(), Value::Object(extensions))
    }
}

impl From<DBError> for ServiceError {
    fn from(error: DBError) -> ServiceError {
        match error {
            DBError::NotFound => ServiceError::NotFound("Row".to_string()),
            DBError::DatabaseError(kind, info) => {
                let message = info.details().unwrap_or_else(|| info.message()).to_string();
                if let DatabaseErrorKind::UniqueViolation = kind {
                    log::debug!("Unique violation: {}", message);
                    ServiceError::AlreadyPresent("Value".to_string())
                } else {
                    ServiceError::Backend(format!("DB error, {:?} {}", kind, message))
                }
            }
            err => ServiceError::Backend(format!("DB error, {}", err)),
        }
    }
}

impl From<r2d2::Error> for ServiceError {
    fn from(error: r2d2::Error) -> ServiceError {
        ServiceError::Backend(format!("Pool error: {}", error))
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InternalServerError(_) | ServiceError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::BadRequest(_) | ServiceError::Validation { .. } => StatusCode::BAD_REQUEST,
            ServiceError::AlreadyPresent(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Unauthorized => StatusCode::FORBIDDEN,
            ServiceError::WrongPassword | ServiceError::LoginRequired => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).body(self.user_message())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
