use actix_web::{http::header, web, HttpResponse};

pub mod admin_handlers;
pub mod auth_handlers;
pub mod post_handlers;

/// 302 to `location`, the way every successful form submission ends.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", username)
}

pub fn post_detail_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

/// Every route of the site; shared by `main` and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(post_handlers::index)
        .service(post_handlers::group_posts)
        .service(post_handlers::profile)
        .service(post_handlers::post_detail)
        .service(post_handlers::post_create_form)
        .service(post_handlers::post_create)
        .service(post_handlers::post_edit_form)
        .service(post_handlers::post_edit)
        .service(auth_handlers::signup_form)
        .service(auth_handlers::signup)
        .service(auth_handlers::login_form)
        .service(auth_handlers::login)
        .service(auth_handlers::logout)
        .service(admin_handlers::create_group);
}
