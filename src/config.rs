use std::env;
use anyhow::{Context, Result, bail};
use deadpool_postgres::{Config, Pool, Runtime, PoolConfig};
use tokio_postgres::NoTls;

const DEFAULT_PORT: &str = "8080";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";
const DEFAULT_POOL_MAX_SIZE: usize = 16;
const DEFAULT_JWT_TTL_SECONDS: i64 = 14 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StorageBackend::Postgres),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => bail!("unknown YATUBE_STORAGE value '{}' (expected postgres or memory)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: String,
    pub allowed_origins: Vec<String>,
    pub storage: StorageBackend,
    pub jwt_secret: String,
    pub jwt_ttl_seconds: i64,
    pub admin_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let storage = match env::var("YATUBE_STORAGE") {
            Ok(raw) => StorageBackend::parse(&raw)?,
            Err(_) => StorageBackend::Postgres,
        };

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET not set")?;
        if jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        let jwt_ttl_seconds = match env::var("JWT_TTL_SECONDS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .context("JWT_TTL_SECONDS must be an integer")?,
            Err(_) => DEFAULT_JWT_TTL_SECONDS,
        };

        let admin_token = env::var("ADMIN_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Self {
            port,
            allowed_origins,
            storage,
            jwt_secret,
            jwt_ttl_seconds,
            admin_token,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

pub fn get_pg_pool() -> Result<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(env::var("PG_HOST").context("PG_HOST not set")?);
    cfg.user = Some(env::var("PG_USER").context("PG_USER not set")?);
    cfg.password = env::var("PG_PASS").ok();
    cfg.dbname = Some(env::var("PG_DB").context("PG_DB not set")?);

    let max_size = match env::var("PG_POOL_MAX_SIZE") {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .context("PG_POOL_MAX_SIZE must be a positive integer")?,
        Err(_) => DEFAULT_POOL_MAX_SIZE,
    };

    let pool_cfg = cfg.pool.get_or_insert_with(PoolConfig::default);
    pool_cfg.max_size = max_size;

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
       .context("failed to create postgres pool")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_names() {
        assert_eq!(StorageBackend::parse("Postgres").unwrap(), StorageBackend::Postgres);
        assert_eq!(StorageBackend::parse(" memory ").unwrap(), StorageBackend::Memory);
        assert!(StorageBackend::parse("sqlite").is_err());
    }
}
