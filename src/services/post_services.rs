// src/services/post_services.rs - listing, form cleaning and authorship rules
use log::info;
use validator::Validate;

use crate::dtos::form_errors::{FormErrors, INVALID_CHOICE_MESSAGE};
use crate::dtos::post_dtos::{CleanPost, PostForm};
use crate::error::{AppError, AppResult};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::models::post::{NewPost, Post, PostChanges, PostFilter, PostView};
use crate::pagination::{POSTS_PER_PAGE, Page, Paginator};
use crate::repositories::Store;

/// Count, resolve the requested page, then fetch just that window.
pub async fn paginated_posts(
    store: &dyn Store,
    filter: PostFilter,
    raw_page: Option<&str>,
) -> AppResult<Page<PostView>> {
    let count = store.count_posts(filter).await?;
    let paginator = Paginator::new(count, POSTS_PER_PAGE);
    let window = paginator.get_page(raw_page);
    let items = store.list_posts(filter, window).await?;
    Ok(Page::new(items, window, &paginator))
}

/// Only the author may change a post.
pub fn can_edit_post(user: &AuthenticatedUser, post: &Post) -> bool {
    user.user_id == post.author_id
}

/// Run field validation, then resolve the group choice against the store.
/// The outer `Result` carries store failures, the inner one form errors.
pub async fn clean_post_form(
    store: &dyn Store,
    form: &PostForm,
) -> AppResult<Result<CleanPost, FormErrors>> {
    let mut errors = match form.validate() {
        Ok(()) => FormErrors::new(),
        Err(e) => FormErrors::from(e),
    };

    let group_id = match form.group.as_deref() {
        None => None,
        Some(raw) => {
            let found = match raw.parse::<i64>() {
                Ok(id) => store.find_group_by_id(id).await?.map(|g| g.id),
                Err(_) => None,
            };
            if found.is_none() {
                errors.add("group", INVALID_CHOICE_MESSAGE);
            }
            found
        }
    };

    Ok(errors.into_result().map(|()| CleanPost {
        text: form.text.clone(),
        group_id,
    }))
}

pub async fn create_post(
    store: &dyn Store,
    author: &AuthenticatedUser,
    clean: CleanPost,
) -> AppResult<Post> {
    let post = store
        .insert_post(NewPost {
            text: clean.text,
            author_id: author.user_id,
            group_id: clean.group_id,
        })
        .await?;
    info!("Post {} created by {}", post.id, author.username);
    Ok(post)
}

/// Apply an edit. Checks authorship again so no caller can skip it.
pub async fn update_post(
    store: &dyn Store,
    editor: &AuthenticatedUser,
    post: &Post,
    clean: CleanPost,
) -> AppResult<Post> {
    if !can_edit_post(editor, post) {
        return Err(AppError::Forbidden(format!(
            "{} is not the author of post {}",
            editor.username, post.id
        )));
    }

    let updated = store
        .update_post(
            post.id,
            PostChanges {
                text: clean.text,
                group_id: clean.group_id,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post.id)))?;
    info!("Post {} edited by {}", updated.id, editor.username);
    Ok(updated)
}
