// src/error.rs - application error type and its HTTP mapping

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde::Serialize;
use thiserror::Error;

use crate::dtos::form_errors::FormErrors;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),
    /// Raised by the auth extractor; `next` is the path to come back to.
    #[error("login required")]
    LoginRequired { next: String },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("validation failed")]
    Validation(FormErrors),
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ApiError<T: Serialize> {
    status: String,
    message: String,
    data: Option<T>,
}

pub const LOGIN_URL: &str = "/auth/login/";

pub fn login_redirect_url(next: &str) -> String {
    format!("{}?next={}", LOGIN_URL, urlencoding::encode(next))
}

impl AppError {
    fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
            AppError::Validation(_) => "Please correct the errors below.".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::LoginRequired { .. } => StatusCode::FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::LoginRequired { next } => {
                return HttpResponse::Found()
                    .insert_header((header::LOCATION, login_redirect_url(next)))
                    .finish();
            }
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => {
                error!("{}", self);
            }
            _ => {}
        }

        let data = match self {
            AppError::Validation(errors) => Some(errors),
            _ => None,
        };

        HttpResponse::build(self.status_code()).json(ApiError {
            status: "error".to_string(),
            message: self.public_message(),
            data,
        })
    }
}
