// src/repositories/pg_store.rs - PostgreSQL-backed store over a deadpool pool

use deadpool_postgres::Pool;
use log::info;
use tokio_postgres::error::SqlState;

use crate::error::AppResult;

const SCHEMA: &str = include_str!("schema.sql");

#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub(crate) async fn client(&self) -> AppResult<deadpool_postgres::Object> {
        Ok(self.pool.get().await?)
    }

    /// Create tables and indexes that are not there yet.
    pub async fn ensure_schema(&self) -> AppResult<()> {
        let client = self.client().await?;
        client.batch_execute(SCHEMA).await?;
        info!("Database schema is up to date");
        Ok(())
    }
}

pub(crate) fn is_unique_violation(err: &tokio_postgres::Error) -> bool {
    err.code() == Some(&SqlState::UNIQUE_VIOLATION)
}
