// src/repositories/memory_store.rs - in-process store for tests and local runs

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::models::group::{Group, GroupRef, NewGroup};
use crate::models::post::{AuthorRef, NewPost, Post, PostChanges, PostFilter, PostView};
use crate::models::user::{NewUser, User};
use crate::pagination::PageWindow;
use crate::repositories::{GroupRepository, PostRepository, UserRepository};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    groups: Vec<Group>,
    posts: Vec<Post>,
    next_user_id: i64,
    next_group_id: i64,
    next_post_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    /// Matching posts, newest first.
    fn ordered_posts(&self, filter: PostFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self.posts.iter().filter(|p| filter.matches(p)).collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }

    fn view(&self, post: &Post) -> AppResult<PostView> {
        let author = self
            .users
            .iter()
            .find(|u| u.id == post.author_id)
            .ok_or_else(|| AppError::Internal(format!("post {} has no author", post.id)))?;
        let group = post
            .group_id
            .and_then(|gid| self.groups.iter().find(|g| g.id == gid))
            .map(GroupRef::from);

        Ok(PostView {
            id: post.id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            author: AuthorRef {
                id: author.id,
                username: author.username.clone(),
            },
            group,
        })
    }
}

/// Same contract as `PgStore`, kept in memory behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == new_user.username) {
            return Err(AppError::Conflict(format!(
                "username '{}' is already taken",
                new_user.username
            )));
        }

        let user = User {
            id: Tables::next_id(&mut tables.next_user_id),
            username: new_user.username,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            date_joined: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn create_group(&self, new_group: NewGroup) -> AppResult<Group> {
        let mut tables = self.tables.write().await;
        if tables.groups.iter().any(|g| g.slug == new_group.slug) {
            return Err(AppError::Conflict(format!(
                "slug '{}' is already taken",
                new_group.slug
            )));
        }

        let group = Group {
            id: Tables::next_id(&mut tables.next_group_id),
            title: new_group.title,
            slug: new_group.slug,
            description: new_group.description,
        };
        tables.groups.push(group.clone());
        Ok(group)
    }

    async fn list_groups(&self) -> AppResult<Vec<Group>> {
        let tables = self.tables.read().await;
        let mut groups = tables.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn find_group_by_slug(&self, slug: &str) -> AppResult<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.slug == slug).cloned())
    }

    async fn find_group_by_id(&self, id: i64) -> AppResult<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.id == id).cloned())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn count_posts(&self, filter: PostFilter) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn list_posts(&self, filter: PostFilter, window: PageWindow) -> AppResult<Vec<PostView>> {
        let tables = self.tables.read().await;
        window
            .apply(tables.ordered_posts(filter))
            .into_iter()
            .map(|post| tables.view(post))
            .collect()
    }

    async fn find_post(&self, id: i64) -> AppResult<Option<PostView>> {
        let tables = self.tables.read().await;
        tables
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|post| tables.view(post))
            .transpose()
    }

    async fn insert_post(&self, new_post: NewPost) -> AppResult<Post> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == new_post.author_id) {
            return Err(AppError::BadRequest(format!(
                "author {} does not exist",
                new_post.author_id
            )));
        }

        let post = Post {
            id: Tables::next_id(&mut tables.next_post_id),
            text: new_post.text,
            pub_date: Utc::now(),
            author_id: new_post.author_id,
            group_id: new_post.group_id,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> AppResult<Option<Post>> {
        let mut tables = self.tables.write().await;
        let Some(post) = tables.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        post.text = changes.text;
        post.group_id = changes.group_id;
        Ok(Some(post.clone()))
    }
}
