use actix_web::{
    error,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use derive_more::{Display, Error};
use log::error;
use serde::Serialize;

use crate::db::StoreError;

/// A rejected field, reported back to the client as-is.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, Serialize)]
#[display(fmt = "{}: {}", field, message)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Why the access guard turned a request away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AuthFailure {
    #[display(fmt = "token missing or invalid")]
    MissingToken,

    #[display(fmt = "invalid token")]
    InvalidToken,

    #[display(fmt = "this session has expired")]
    SessionExpired,

    #[display(fmt = "invalid email or password")]
    BadCredentials,
}

#[derive(Debug, Display, Error)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    Validation(ValidationError),

    /// Body, path or query that could not be parsed at all.
    #[display(fmt = "{}", _0)]
    BadRequest(#[error(not(source))] String),

    #[display(fmt = "{}", _0)]
    Unauthorized(#[error(not(source))] AuthFailure),

    #[display(fmt = "{}", _0)]
    Forbidden(#[error(not(source))] String),

    #[display(fmt = "{}", _0)]
    NotFound(#[error(not(source))] String),

    #[display(fmt = "{}", _0)]
    Conflict(#[error(not(source))] String),

    #[display(fmt = "no spots available")]
    CapacityExceeded,

    #[display(fmt = "the event was modified concurrently, try again")]
    ConcurrentModification,

    #[display(fmt = "internal error")]
    Internal,
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} does not exist"))
    }

    pub fn unknown_user() -> Self {
        ApiError::NotFound("this account does not exist".to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => ApiError::Conflict(format!("this {what} is already registered")),
            other => {
                error!("[{:} : {:}] STORE ERROR: {}", file!(), line!(), other);
                ApiError::Internal
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl error::ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(ErrorBody {
                error: self.to_string(),
            })
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            // The public API has always answered 401 here; clients depend on it.
            ApiError::Forbidden(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::CapacityExceeded => StatusCode::UNAUTHORIZED,
            ApiError::ConcurrentModification => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
