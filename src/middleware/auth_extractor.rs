// src/middleware/auth_extractor.rs - session identity for login-only routes
use actix_web::{dev::Payload, http::header, web, Error, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use log::{debug, error};

use crate::error::AppError;
use crate::services::auth_services::AuthService;

pub const SESSION_COOKIE: &str = "yatube_session";

/// The signed-in user behind the request.
/// Routes that take it answer anonymous requests with a redirect to login.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<AuthenticatedUser, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let next = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());
        let login_required = || -> Error { AppError::LoginRequired { next: next.clone() }.into() };

        let Some(auth) = req.app_data::<web::Data<AuthService>>() else {
            error!("AuthService is not registered as app data");
            return ready(Err(AppError::Internal("auth service missing".to_string()).into()));
        };

        let Some(token) = session_token(req) else {
            return ready(Err(login_required()));
        };

        match auth.decode_token(&token) {
            Ok(identity) => ready(Ok(AuthenticatedUser {
                user_id: identity.user_id,
                username: identity.username,
            })),
            Err(e) => {
                debug!("Rejected session token: {}", e);
                ready(Err(login_required()))
            }
        }
    }
}

/// Bearer header first, then the session cookie.
fn session_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        req.cookie(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
    })
}
