// src/handlers/admin_handlers.rs - reference data managed with the admin token
use std::sync::LazyLock;

use actix_web::{post, web, HttpRequest, HttpResponse};
use log::{debug, info, warn};
use regex::Regex;
use validator::Validate;

use crate::dtos::api_response::ApiResponse;
use crate::dtos::form_errors::{FormErrors, NON_FIELD_ERRORS};
use crate::dtos::group_dtos::GroupForm;
use crate::error::{AppError, AppResult};
use crate::models::group::NewGroup;
use crate::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("slug pattern is valid"));

fn looks_like_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

/// Takes the same time for every pair of equal-length inputs.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

fn check_admin_token(req: &HttpRequest, expected: Option<&str>) -> AppResult<()> {
    let Some(expected) = expected else {
        return Err(AppError::Forbidden("admin endpoints are disabled".to_string()));
    };

    let given = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim);

    if given.is_some_and(|g| constant_time_compare(g.as_bytes(), expected.as_bytes())) {
        Ok(())
    } else {
        warn!("Rejected admin request to {}", req.path());
        Err(AppError::Forbidden("invalid admin token".to_string()))
    }
}

/// POST /admin/groups/
#[post("/admin/groups/")]
pub async fn create_group(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    body: Result<web::Either<web::Json<GroupForm>, web::Form<GroupForm>>, actix_web::Error>,
) -> AppResult<HttpResponse> {
    check_admin_token(&req, app_state.admin_token.as_deref())?;

    let mut form = match body {
        Ok(web::Either::Left(json)) => json.into_inner(),
        Ok(web::Either::Right(form)) => form.into_inner(),
        Err(e) => {
            debug!("Unreadable group form: {}", e);
            let mut errors = FormErrors::new();
            errors.add(NON_FIELD_ERRORS, "The submitted form could not be read.");
            return Err(AppError::Validation(errors));
        }
    };
    form.title = form.title.trim().to_string();
    form.slug = form.slug.trim().to_string();

    let mut errors = match form.validate() {
        Ok(()) => FormErrors::new(),
        Err(e) => FormErrors::from(e),
    };
    if !form.slug.is_empty() && !looks_like_slug(&form.slug) {
        errors.add(
            "slug",
            "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
        );
    }
    errors.into_result().map_err(AppError::Validation)?;

    let created = app_state
        .store
        .create_group(NewGroup {
            title: form.title,
            slug: form.slug,
            description: form.description,
        })
        .await;

    let group = match created {
        Ok(group) => group,
        Err(AppError::Conflict(_)) => {
            let mut errors = FormErrors::new();
            errors.add("slug", "Group with this slug already exists.");
            return Err(AppError::Validation(errors));
        }
        Err(e) => return Err(e),
    };

    info!("Group '{}' created", group.slug);
    Ok(HttpResponse::Created().json(ApiResponse::success("Group created", group)))
}
