use async_trait::async_trait;
use tokio_postgres::Row;

use crate::error::{AppError, AppResult};
use crate::models::user::{NewUser, User};
use crate::repositories::pg_store::{PgStore, is_unique_violation};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `AppError::Conflict` when the username is taken.
    async fn create_user(&self, new_user: NewUser) -> AppResult<User>;

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
}

const USER_COLUMNS: &str = "id, username, password_hash, first_name, last_name, email, date_joined";

fn user_from_row(row: &Row) -> Result<User, tokio_postgres::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        date_joined: row.try_get("date_joined")?,
    })
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let client = self.client().await?;
        let sql = format!(
            "INSERT INTO users (username, password_hash, first_name, last_name, email) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );

        let row = client
            .query_one(
                sql.as_str(),
                &[
                    &new_user.username,
                    &new_user.password_hash,
                    &new_user.first_name,
                    &new_user.last_name,
                    &new_user.email,
                ],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!("username '{}' is already taken", new_user.username))
                } else {
                    AppError::Database(e)
                }
            })?;

        Ok(user_from_row(&row)?)
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let client = self.client().await?;
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&username]).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }
}
