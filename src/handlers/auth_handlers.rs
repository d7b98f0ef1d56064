use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{get, post, route, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::dtos::api_response::ApiResponse;
use crate::dtos::auth::{LoginIn, LoginResponse, SignupIn, SignupResponse};
use crate::error::AppResult;
use crate::middleware::auth_extractor::SESSION_COOKIE;
use crate::models::user::UserPublic;
use crate::services::auth_services::AuthService;

pub type SignupBody = web::Either<web::Json<SignupIn>, web::Form<SignupIn>>;
pub type LoginBody = web::Either<web::Json<LoginIn>, web::Form<LoginIn>>;

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Serialize)]
struct FormDescription {
    fields: Vec<&'static str>,
    next: Option<String>,
}

/// Only same-site absolute paths are followed after login.
fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.contains('\\') => n.to_string(),
        _ => "/".to_string(),
    }
}

fn session_cookie(token: String, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age_seconds))
        .finish()
}

/// GET /auth/signup/
#[get("/auth/signup/")]
pub async fn signup_form() -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(
        "Signup form",
        FormDescription {
            fields: vec!["first_name", "last_name", "username", "email", "password"],
            next: None,
        },
    ))
}

/// POST /auth/signup/
/// Creates the account only; the client logs in afterwards.
#[post("/auth/signup/")]
pub async fn signup(
    svc: web::Data<AuthService>,
    body: SignupBody,
) -> AppResult<HttpResponse> {
    let input = match body {
        web::Either::Left(json) => json.into_inner(),
        web::Either::Right(form) => form.into_inner(),
    };

    let user = svc.signup(input).await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(
        "Account created",
        SignupResponse {
            user: UserPublic::from(&user),
            next_step: "login".to_string(),
        },
    )))
}

/// GET /auth/login/
#[get("/auth/login/")]
pub async fn login_form(query: web::Query<NextQuery>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(
        "Login form",
        FormDescription {
            fields: vec!["username", "password"],
            next: query.next.clone(),
        },
    ))
}

/// POST /auth/login/
/// Returns the session in the body and also sets it as a cookie.
#[post("/auth/login/")]
pub async fn login(
    svc: web::Data<AuthService>,
    query: web::Query<NextQuery>,
    body: LoginBody,
) -> AppResult<HttpResponse> {
    let input = match body {
        web::Either::Left(json) => json.into_inner(),
        web::Either::Right(form) => form.into_inner(),
    };

    let (session, user) = svc.login(input).await?;
    let cookie = session_cookie(session.access_token.clone(), svc.token_ttl_seconds());

    Ok(HttpResponse::Ok().cookie(cookie).json(ApiResponse::success(
        "Login successful",
        LoginResponse {
            session,
            user: UserPublic::from(&user),
            redirect_to: safe_next(query.next.as_deref()),
        },
    )))
}

/// GET|POST /auth/logout/
/// Tokens are stateless; logging out drops the cookie.
#[route("/auth/logout/", method = "GET", method = "POST")]
pub async fn logout() -> impl Responder {
    let mut removal = session_cookie(String::new(), 0);
    removal.make_removal();

    HttpResponse::Ok().cookie(removal).json(ApiResponse::<()> {
        status: "success".to_string(),
        message: "Logged out".to_string(),
        data: None,
    })
}
