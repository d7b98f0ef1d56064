// src/repositories/post_repository.rs - post queries, newest first

use async_trait::async_trait;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

use crate::error::AppResult;
use crate::models::group::GroupRef;
use crate::models::post::{AuthorRef, NewPost, Post, PostChanges, PostFilter, PostView};
use crate::pagination::PageWindow;
use crate::repositories::pg_store::PgStore;

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn count_posts(&self, filter: PostFilter) -> AppResult<u64>;

    /// Posts matching `filter`, ordered by `pub_date` then `id`, both
    /// descending, cut to `window`.
    async fn list_posts(&self, filter: PostFilter, window: PageWindow) -> AppResult<Vec<PostView>>;

    async fn find_post(&self, id: i64) -> AppResult<Option<PostView>>;

    async fn insert_post(&self, new_post: NewPost) -> AppResult<Post>;

    /// Returns `None` when the post does not exist. Never touches the author.
    async fn update_post(&self, id: i64, changes: PostChanges) -> AppResult<Option<Post>>;
}

const POST_VIEW_SELECT: &str = "\
    SELECT p.id, p.text, p.pub_date, u.id AS author_id, u.username, \
           g.id AS group_id, g.title AS group_title, g.slug AS group_slug \
    FROM posts p \
    JOIN users u ON u.id = p.author_id \
    LEFT JOIN post_groups g ON g.id = p.group_id";

const POST_ORDER: &str = "ORDER BY p.pub_date DESC, p.id DESC";

fn filter_clause(filter: &PostFilter) -> (&'static str, Option<i64>) {
    match filter {
        PostFilter::All => ("", None),
        PostFilter::Group(id) => ("WHERE p.group_id = $1", Some(*id)),
        PostFilter::Author(id) => ("WHERE p.author_id = $1", Some(*id)),
    }
}

fn post_view_from_row(row: &Row) -> Result<PostView, tokio_postgres::Error> {
    let group_id: Option<i64> = row.try_get("group_id")?;
    let group = match group_id {
        Some(id) => Some(GroupRef {
            id,
            title: row.try_get("group_title")?,
            slug: row.try_get("group_slug")?,
        }),
        None => None,
    };

    Ok(PostView {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        pub_date: row.try_get("pub_date")?,
        author: AuthorRef {
            id: row.try_get("author_id")?,
            username: row.try_get("username")?,
        },
        group,
    })
}

fn post_from_row(row: &Row) -> Result<Post, tokio_postgres::Error> {
    Ok(Post {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        pub_date: row.try_get("pub_date")?,
        author_id: row.try_get("author_id")?,
        group_id: row.try_get("group_id")?,
    })
}

#[async_trait]
impl PostRepository for PgStore {
    async fn count_posts(&self, filter: PostFilter) -> AppResult<u64> {
        let client = self.client().await?;
        let (clause, param) = filter_clause(&filter);
        let sql = format!("SELECT COUNT(*) FROM posts p {}", clause);

        let row = match param {
            Some(ref id) => client.query_one(sql.as_str(), &[id]).await?,
            None => client.query_one(sql.as_str(), &[]).await?,
        };
        let count: i64 = row.try_get(0)?;
        Ok(count.max(0) as u64)
    }

    async fn list_posts(&self, filter: PostFilter, window: PageWindow) -> AppResult<Vec<PostView>> {
        let client = self.client().await?;
        let (clause, param) = filter_clause(&filter);
        let limit = window.limit as i64;
        let offset = window.offset as i64;

        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(3);
        if let Some(ref id) = param {
            params.push(id);
        }
        let limit_idx = params.len() + 1;
        params.push(&limit);
        params.push(&offset);

        let sql = format!(
            "{} {} {} LIMIT ${} OFFSET ${}",
            POST_VIEW_SELECT,
            clause,
            POST_ORDER,
            limit_idx,
            limit_idx + 1
        );

        let rows = client.query(sql.as_str(), &params).await?;
        let posts = rows
            .iter()
            .map(post_view_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn find_post(&self, id: i64) -> AppResult<Option<PostView>> {
        let client = self.client().await?;
        let sql = format!("{} WHERE p.id = $1", POST_VIEW_SELECT);
        let row = client.query_opt(sql.as_str(), &[&id]).await?;
        Ok(row.as_ref().map(post_view_from_row).transpose()?)
    }

    async fn insert_post(&self, new_post: NewPost) -> AppResult<Post> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "INSERT INTO posts (text, author_id, group_id) VALUES ($1, $2, $3) \
                 RETURNING id, text, pub_date, author_id, group_id",
                &[&new_post.text, &new_post.author_id, &new_post.group_id],
            )
            .await?;
        Ok(post_from_row(&row)?)
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> AppResult<Option<Post>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "UPDATE posts SET text = $2, group_id = $3 WHERE id = $1 \
                 RETURNING id, text, pub_date, author_id, group_id",
                &[&id, &changes.text, &changes.group_id],
            )
            .await?;
        Ok(row.as_ref().map(post_from_row).transpose()?)
    }
}
