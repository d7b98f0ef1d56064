// src/main.rs
mod config;
mod dtos;
mod error;
mod handlers;
mod middleware;
mod models;
mod pagination;
mod repositories;
mod services;

use std::sync::Arc;

use actix_cors::Cors;
use anyhow::Context;
use actix_web::{App, HttpServer, web, middleware::Logger};
use log::{info, error, warn};

use crate::config::{AppConfig, StorageBackend};
use crate::repositories::{MemoryStore, PgStore, Store};
use crate::services::auth_services::AuthService;

fn mask_key(k: &str) -> String {
    let chars: Vec<char> = k.chars().collect();
    if chars.len() <= 8 { "[REDACTED]".to_string() }
    else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub admin_token: Option<String>,
}

async fn open_store(backend: StorageBackend) -> anyhow::Result<Arc<dyn Store>> {
    match backend {
        StorageBackend::Postgres => {
            let pool = config::get_pg_pool()?;
            let store = PgStore::new(pool);
            store
                .ensure_schema()
                .await
                .context("failed to prepare schema")?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();
    dotenv::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    info!("Storage backend: {:?}", config.storage);
    let store = match open_store(config.storage).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to open storage: {:#}", e);
            std::process::exit(1);
        }
    };

    info!("JWT secret: {}", mask_key(&config.jwt_secret));
    match config.admin_token.as_deref() {
        Some(token) => info!("Admin token: {}", mask_key(token)),
        None => info!("ADMIN_TOKEN not set, admin endpoints disabled"),
    }

    let auth_data = web::Data::new(AuthService::new(
        store.clone(),
        config.jwt_secret.clone(),
        config.jwt_ttl_seconds,
    ));

    let state = web::Data::new(AppState {
        store,
        admin_token: config.admin_token.clone(),
    });

    let allowed_origins = config.allowed_origins.clone();
    let bind_address = config.bind_address();

    info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                "authorization",
                "content-type",
                "accept",
                "x-requested-with",
                "x-admin-token",
            ])
            .supports_credentials()
            .max_age(3600);

        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .app_data(auth_data.clone())
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_key_keeps_both_ends() {
        assert_eq!(mask_key("short"), "[REDACTED]");
        assert_eq!(mask_key("abcd1234efgh"), "abcd***efgh");
        assert_eq!(mask_key("ключ-секрет-длинный"), "ключ***нный");
    }
}
