// src/handlers/post_handlers.rs - listings, detail and the post form pages

use actix_web::{get, post, web, HttpResponse};
use log::{debug, warn};

use crate::dtos::api_response::ApiResponse;
use crate::dtos::form_errors::{FormErrors, NON_FIELD_ERRORS};
use crate::dtos::post_dtos::{
    GroupContext, IndexContext, PostDetailContext, PostForm, PostFormContext, ProfileContext,
};
use crate::error::{AppError, AppResult};
use crate::handlers::{post_detail_url, profile_url, redirect};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::models::post::{PostFilter, PostView};
use crate::models::user::UserPublic;
use crate::pagination::{PageQuery, QueryPairs};
use crate::repositories::Store;
use crate::services::post_services::{
    can_edit_post, clean_post_form, create_post, paginated_posts, update_post,
};
use crate::AppState;

const MALFORMED_FORM: &str = "The submitted form could not be read.";

/// Post form body, JSON or urlencoded. Extraction failures reach the
/// handler, which decides what to answer.
pub type PostFormBody =
    Result<web::Either<web::Json<PostForm>, web::Form<PostForm>>, actix_web::Error>;

fn form_from_body(body: PostFormBody) -> Result<PostForm, FormErrors> {
    match body {
        Ok(web::Either::Left(json)) => Ok(json.into_inner()),
        Ok(web::Either::Right(form)) => Ok(form.into_inner()),
        Err(e) => {
            debug!("Unreadable post form: {}", e);
            let mut errors = FormErrors::new();
            errors.add(NON_FIELD_ERRORS, MALFORMED_FORM);
            Err(errors)
        }
    }
}

async fn find_post_or_404(store: &dyn Store, post_id: i64) -> AppResult<PostView> {
    store
        .find_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
}

/// The form page, either empty, prefilled, or carrying errors.
async fn form_page(
    store: &dyn Store,
    form: PostForm,
    errors: FormErrors,
    is_edit: bool,
) -> AppResult<HttpResponse> {
    let groups = store.list_groups().await?;
    let invalid = !errors.is_empty();
    let context = PostFormContext {
        form,
        errors,
        groups,
        is_edit,
    };

    if invalid {
        Ok(HttpResponse::BadRequest().json(ApiResponse::error(
            "Please correct the errors below.",
            Some(context),
        )))
    } else {
        Ok(HttpResponse::Ok().json(ApiResponse::success("Form ready", context)))
    }
}

/// GET /
#[get("/")]
pub async fn index(
    app_state: web::Data<AppState>,
    query: QueryPairs,
) -> AppResult<HttpResponse> {
    let page_query = PageQuery::from_pairs(&query);
    let page = paginated_posts(app_state.store.as_ref(), PostFilter::All, page_query.page.as_deref()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Posts retrieved successfully",
        IndexContext { page },
    )))
}

/// GET /group/{slug}/
#[get("/group/{slug}/")]
pub async fn group_posts(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
    query: QueryPairs,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let store = app_state.store.as_ref();

    let group = store
        .find_group_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("group '{}'", slug)))?;
    let page_query = PageQuery::from_pairs(&query);
    let page = paginated_posts(store, PostFilter::Group(group.id), page_query.page.as_deref()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Group posts retrieved successfully",
        GroupContext { group, page },
    )))
}

/// GET /profile/{username}/
#[get("/profile/{username}/")]
pub async fn profile(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
    query: QueryPairs,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let store = app_state.store.as_ref();

    let author = store
        .find_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user '{}'", username)))?;
    let page_query = PageQuery::from_pairs(&query);
    let page = paginated_posts(store, PostFilter::Author(author.id), page_query.page.as_deref()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Profile retrieved successfully",
        ProfileContext {
            author: UserPublic::from(&author),
            post_count: page.count,
            page,
        },
    )))
}

/// GET /posts/{post_id}/
#[get("/posts/{post_id}/")]
pub async fn post_detail(
    app_state: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let post = find_post_or_404(app_state.store.as_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Post retrieved successfully",
        PostDetailContext { post },
    )))
}

/// GET /create/
#[get("/create/")]
pub async fn post_create_form(
    app_state: web::Data<AppState>,
    _user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
    form_page(app_state.store.as_ref(), PostForm::default(), FormErrors::new(), false).await
}

/// POST /create/
#[post("/create/")]
pub async fn post_create(
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: PostFormBody,
) -> AppResult<HttpResponse> {
    let store = app_state.store.as_ref();
    let form = match form_from_body(body) {
        Ok(form) => form,
        Err(errors) => return form_page(store, PostForm::default(), errors, false).await,
    };

    match clean_post_form(store, &form).await? {
        Ok(clean) => {
            create_post(store, &user, clean).await?;
            Ok(redirect(&profile_url(&user.username)))
        }
        Err(errors) => form_page(store, form, errors, false).await,
    }
}

/// GET /posts/{post_id}/edit/
#[get("/posts/{post_id}/edit/")]
pub async fn post_edit_form(
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let store = app_state.store.as_ref();
    let post = find_post_or_404(store, path.into_inner()).await?.to_post();

    if !can_edit_post(&user, &post) {
        warn!("{} tried to open the edit form of post {}", user.username, post.id);
        return Ok(redirect(&post_detail_url(post.id)));
    }

    form_page(store, PostForm::from_post(&post), FormErrors::new(), true).await
}

/// POST /posts/{post_id}/edit/
#[post("/posts/{post_id}/edit/")]
pub async fn post_edit(
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: PostFormBody,
) -> AppResult<HttpResponse> {
    let store = app_state.store.as_ref();
    let post = find_post_or_404(store, path.into_inner()).await?.to_post();

    if !can_edit_post(&user, &post) {
        warn!("{} tried to edit post {} by someone else", user.username, post.id);
        return Ok(redirect(&post_detail_url(post.id)));
    }

    let form = match form_from_body(body) {
        Ok(form) => form,
        Err(errors) => return form_page(store, PostForm::from_post(&post), errors, true).await,
    };

    match clean_post_form(store, &form).await? {
        Ok(clean) => {
            update_post(store, &user, &post, clean).await?;
            Ok(redirect(&post_detail_url(post.id)))
        }
        Err(errors) => form_page(store, form, errors, true).await,
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use crate::handlers::configure;
    use crate::handlers::test_support::TestContext;
    use crate::models::post::PostFilter;
    use crate::repositories::PostRepository;

    macro_rules! app {
        ($ctx:expr) => {
            test::init_service(
                App::new()
                    .app_data($ctx.state.clone())
                    .app_data($ctx.auth.clone())
                    .configure(configure),
            )
            .await
        };
    }

    fn bearer(token: &str) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", token))
    }

    fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
        resp.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[actix_web::test]
    async fn index_paginates_thirteen_posts_into_ten_and_three() {
        let ctx = TestContext::new();
        let (leo, _) = ctx.user("leo").await;
        for i in 1..=13 {
            ctx.post(&leo, &format!("post {}", i), None).await;
        }
        let app = app!(ctx);

        let req = test::TestRequest::get().uri("/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["page"]["items"].as_array().unwrap().len(), 10);
        assert_eq!(body["data"]["page"]["items"][0]["text"], "post 13");
        assert_eq!(body["data"]["page"]["num_pages"], 2);

        let req = test::TestRequest::get().uri("/?page=2").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["page"]["items"].as_array().unwrap().len(), 3);
        assert_eq!(body["data"]["page"]["has_previous"], true);

        let req = test::TestRequest::get().uri("/?page=99").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["page"]["number"], 2);

        let req = test::TestRequest::get().uri("/?page=abc").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["page"]["number"], 1);
    }

    #[actix_web::test]
    async fn group_listing_only_shows_its_own_posts() {
        let ctx = TestContext::new();
        let (leo, _) = ctx.user("leo").await;
        let cats = ctx.group("cats").await;
        let dogs = ctx.group("dogs").await;
        let meow = ctx.post(&leo, "meow", Some(&cats)).await;
        ctx.post(&leo, "no group", None).await;
        let app = app!(ctx);

        let req = test::TestRequest::get().uri("/group/cats/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let items = body["data"]["page"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], meow.id);
        assert_eq!(items[0]["group"]["slug"], "cats");
        assert_eq!(body["data"]["group"]["title"], "Group cats");

        let req = test::TestRequest::get().uri("/group/dogs/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["data"]["page"]["items"].as_array().unwrap().is_empty());
        assert_eq!(body["data"]["group"]["id"], dogs.id);

        // The post also shows up on the index and on its author's profile.
        for uri in ["/", "/profile/leo/"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            let ids: Vec<_> = body["data"]["page"]["items"]
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p["id"].clone())
                .collect();
            assert!(ids.contains(&json!(meow.id)), "{} is missing post", uri);
        }
    }

    #[actix_web::test]
    async fn profile_reports_post_count() {
        let ctx = TestContext::new();
        let (leo, _) = ctx.user("leo").await;
        let (ann, _) = ctx.user("ann").await;
        ctx.post(&leo, "one", None).await;
        ctx.post(&leo, "two", None).await;
        ctx.post(&ann, "other", None).await;
        let app = app!(ctx);

        let req = test::TestRequest::get().uri("/profile/leo/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["post_count"], 2);
        assert_eq!(body["data"]["author"]["username"], "leo");
        assert!(body["data"]["author"].get("password_hash").is_none());
    }

    #[actix_web::test]
    async fn missing_objects_are_not_found() {
        let ctx = TestContext::new();
        let app = app!(ctx);

        for uri in ["/group/nope/", "/profile/nobody/", "/posts/42/", "/posts/abc/"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        }
    }

    #[actix_web::test]
    async fn post_detail_shows_author_and_group() {
        let ctx = TestContext::new();
        let (leo, _) = ctx.user("leo").await;
        let cats = ctx.group("cats").await;
        let post = ctx.post(&leo, "meow", Some(&cats)).await;
        let app = app!(ctx);

        let req = test::TestRequest::get()
            .uri(&format!("/posts/{}/", post.id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["post"]["text"], "meow");
        assert_eq!(body["data"]["post"]["author"]["username"], "leo");
        assert_eq!(body["data"]["post"]["group"]["id"], cats.id);
    }

    #[actix_web::test]
    async fn anonymous_create_redirects_to_login() {
        let ctx = TestContext::new();
        let app = app!(ctx);

        let req = test::TestRequest::get().uri("/create/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/auth/login/?next=%2Fcreate%2F");

        let req = test::TestRequest::post()
            .uri("/create/")
            .set_json(json!({ "text": "hi" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(ctx.store.count_posts(PostFilter::All).await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn create_form_lists_groups() {
        let ctx = TestContext::new();
        let (_, token) = ctx.user("leo").await;
        ctx.group("cats").await;
        let app = app!(ctx);

        let req = test::TestRequest::get()
            .uri("/create/")
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["is_edit"], false);
        assert_eq!(body["data"]["form"]["text"], "");
        assert_eq!(body["data"]["groups"][0]["slug"], "cats");
    }

    #[actix_web::test]
    async fn valid_create_adds_one_post_and_redirects_to_profile() {
        let ctx = TestContext::new();
        let (leo, token) = ctx.user("leo").await;
        let cats = ctx.group("cats").await;
        ctx.post(&leo, "older", None).await;
        let app = app!(ctx);
        let before = ctx.store.count_posts(PostFilter::All).await.unwrap();
        let group_id = cats.id.to_string();

        let req = test::TestRequest::post()
            .uri("/create/")
            .insert_header(bearer(&token))
            .set_form([("text", "Fresh text"), ("group", group_id.as_str())])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/profile/leo/");

        assert_eq!(ctx.store.count_posts(PostFilter::All).await.unwrap(), before + 1);
        let window = crate::pagination::Paginator::new(1, 10).get_page(None);
        let latest = ctx.store.list_posts(PostFilter::All, window).await.unwrap().remove(0);
        assert_eq!(latest.text, "Fresh text");
        assert_eq!(latest.author.id, leo.id);
        assert_eq!(latest.group.map(|g| g.id), Some(cats.id));
    }

    #[actix_web::test]
    async fn invalid_create_redisplays_form_with_errors() {
        let ctx = TestContext::new();
        let (_, token) = ctx.user("leo").await;
        let app = app!(ctx);

        let req = test::TestRequest::post()
            .uri("/create/")
            .insert_header(bearer(&token))
            .set_json(json!({ "text": "   ", "group": 77 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["data"]["errors"]["text"][0], "This field is required.");
        assert!(body["data"]["errors"]["group"][0].as_str().unwrap().starts_with("Select a valid choice"));
        assert_eq!(ctx.store.count_posts(PostFilter::All).await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn author_edit_updates_text_in_place() {
        let ctx = TestContext::new();
        let (leo, token) = ctx.user("leo").await;
        let cats = ctx.group("cats").await;
        let post = ctx.post(&leo, "Test text", Some(&cats)).await;
        let app = app!(ctx);

        let req = test::TestRequest::get()
            .uri(&format!("/posts/{}/edit/", post.id))
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["is_edit"], true);
        assert_eq!(body["data"]["form"]["text"], "Test text");
        assert_eq!(body["data"]["form"]["group"], cats.id.to_string());

        let req = test::TestRequest::post()
            .uri(&format!("/posts/{}/edit/", post.id))
            .insert_header(bearer(&token))
            .set_form([("text", "Edited text"), ("group", "")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/posts/{}/", post.id));

        assert_eq!(ctx.store.count_posts(PostFilter::All).await.unwrap(), 1);
        let edited = ctx.store.find_post(post.id).await.unwrap().unwrap();
        assert_eq!(edited.text, "Edited text");
        assert_eq!(edited.author.id, leo.id);
        assert!(edited.group.is_none());
        assert_eq!(edited.pub_date, post.pub_date);
    }

    #[actix_web::test]
    async fn non_author_edit_redirects_without_changes() {
        let ctx = TestContext::new();
        let (leo, _) = ctx.user("leo").await;
        let (_, ann_token) = ctx.user("ann").await;
        let post = ctx.post(&leo, "Leo's words", None).await;
        let app = app!(ctx);

        let req = test::TestRequest::get()
            .uri(&format!("/posts/{}/edit/", post.id))
            .insert_header(bearer(&ann_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/posts/{}/", post.id));

        let req = test::TestRequest::post()
            .uri(&format!("/posts/{}/edit/", post.id))
            .insert_header(bearer(&ann_token))
            .set_json(json!({ "text": "Ann's words" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/posts/{}/", post.id));

        let unchanged = ctx.store.find_post(post.id).await.unwrap().unwrap();
        assert_eq!(unchanged.text, "Leo's words");
        assert_eq!(unchanged.author.id, leo.id);
    }

    #[actix_web::test]
    async fn editing_a_missing_post_is_not_found() {
        let ctx = TestContext::new();
        let (_, token) = ctx.user("leo").await;
        let app = app!(ctx);

        let req = test::TestRequest::get()
            .uri("/posts/5/edit/")
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn anonymous_edit_redirects_to_login() {
        let ctx = TestContext::new();
        let (leo, _) = ctx.user("leo").await;
        let post = ctx.post(&leo, "Leo's words", None).await;
        let app = app!(ctx);
        let uri = format!("/posts/{}/edit/", post.id);
        let expected = format!("/auth/login/?next=%2Fposts%2F{}%2Fedit%2F", post.id);

        let req = test::TestRequest::get().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), expected);

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({ "text": "anonymous words" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), expected);

        let unchanged = ctx.store.find_post(post.id).await.unwrap().unwrap();
        assert_eq!(unchanged.text, "Leo's words");
    }

    #[actix_web::test]
    async fn non_author_with_unreadable_body_is_still_redirected() {
        let ctx = TestContext::new();
        let (leo, _) = ctx.user("leo").await;
        let (_, ann_token) = ctx.user("ann").await;
        let post = ctx.post(&leo, "Leo's words", None).await;
        let app = app!(ctx);

        let req = test::TestRequest::post()
            .uri(&format!("/posts/{}/edit/", post.id))
            .insert_header(bearer(&ann_token))
            .set_json(json!({ "text": 5 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/posts/{}/", post.id));

        let req = test::TestRequest::post()
            .uri(&format!("/posts/{}/edit/", post.id))
            .insert_header(bearer(&ann_token))
            .insert_header((header::CONTENT_TYPE, "text/plain"))
            .set_payload("text=Ann's words")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);

        let unchanged = ctx.store.find_post(post.id).await.unwrap().unwrap();
        assert_eq!(unchanged.text, "Leo's words");
    }

    #[actix_web::test]
    async fn unreadable_body_on_missing_post_is_not_found() {
        let ctx = TestContext::new();
        let (_, token) = ctx.user("leo").await;
        let app = app!(ctx);

        let req = test::TestRequest::post()
            .uri("/posts/999/edit/")
            .insert_header(bearer(&token))
            .insert_header((header::CONTENT_TYPE, "text/plain"))
            .set_payload("hello")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn author_with_unreadable_body_gets_the_form_back() {
        let ctx = TestContext::new();
        let (leo, token) = ctx.user("leo").await;
        let post = ctx.post(&leo, "Test text", None).await;
        let app = app!(ctx);

        let req = test::TestRequest::post()
            .uri(&format!("/posts/{}/edit/", post.id))
            .insert_header(bearer(&token))
            .set_json(json!({ "text": 5 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["is_edit"], true);
        assert_eq!(body["data"]["form"]["text"], "Test text");
        assert!(body["data"]["errors"]["__all__"][0].is_string());

        let unchanged = ctx.store.find_post(post.id).await.unwrap().unwrap();
        assert_eq!(unchanged.text, "Test text");
    }

    #[actix_web::test]
    async fn odd_page_parameters_still_list() {
        let ctx = TestContext::new();
        let (leo, _) = ctx.user("leo").await;
        for i in 1..=13 {
            ctx.post(&leo, &format!("post {}", i), None).await;
        }
        let app = app!(ctx);

        let req = test::TestRequest::get().uri("/?page=1&page=2").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["page"]["number"], 2);

        let req = test::TestRequest::get()
            .uri("/profile/leo/?page=99999999999999999999")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["page"]["number"], 2);
        assert_eq!(body["data"]["page"]["items"].as_array().unwrap().len(), 3);
    }
}
