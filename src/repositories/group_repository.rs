use async_trait::async_trait;
use tokio_postgres::Row;

use crate::error::{AppError, AppResult};
use crate::models::group::{Group, NewGroup};
use crate::repositories::pg_store::{PgStore, is_unique_violation};

#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Fails with `AppError::Conflict` when the slug is taken.
    async fn create_group(&self, new_group: NewGroup) -> AppResult<Group>;

    /// All groups, by title.
    async fn list_groups(&self) -> AppResult<Vec<Group>>;

    async fn find_group_by_slug(&self, slug: &str) -> AppResult<Option<Group>>;

    async fn find_group_by_id(&self, id: i64) -> AppResult<Option<Group>>;
}

fn group_from_row(row: &Row) -> Result<Group, tokio_postgres::Error> {
    Ok(Group {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
    })
}

#[async_trait]
impl GroupRepository for PgStore {
    async fn create_group(&self, new_group: NewGroup) -> AppResult<Group> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "INSERT INTO post_groups (title, slug, description) VALUES ($1, $2, $3) \
                 RETURNING id, title, slug, description",
                &[&new_group.title, &new_group.slug, &new_group.description],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!("slug '{}' is already taken", new_group.slug))
                } else {
                    AppError::Database(e)
                }
            })?;

        Ok(group_from_row(&row)?)
    }

    async fn list_groups(&self) -> AppResult<Vec<Group>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT id, title, slug, description FROM post_groups ORDER BY title, id",
                &[],
            )
            .await?;
        let groups = rows
            .iter()
            .map(group_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    async fn find_group_by_slug(&self, slug: &str) -> AppResult<Option<Group>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT id, title, slug, description FROM post_groups WHERE slug = $1",
                &[&slug],
            )
            .await?;
        Ok(row.as_ref().map(group_from_row).transpose()?)
    }

    async fn find_group_by_id(&self, id: i64) -> AppResult<Option<Group>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT id, title, slug, description FROM post_groups WHERE id = $1",
                &[&id],
            )
            .await?;
        Ok(row.as_ref().map(group_from_row).transpose()?)
    }
}
