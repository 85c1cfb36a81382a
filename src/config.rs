use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::catalog::{College, find_college};
use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub catalog_dir: PathBuf,
    pub catalog_base_url: Option<String>,
    pub default_college: College,
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://planner.db".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::BadRequest(format!("BIND_ADDR is invalid: {}", e)))?;

        let catalog_dir = env::var("CATALOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let catalog_base_url = env::var("CATALOG_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let college = env::var("DEFAULT_COLLEGE").unwrap_or_else(|_| "apm".to_string());
        let default_college = find_college(&college)
            .ok_or_else(|| AppError::BadRequest(format!("DEFAULT_COLLEGE {} is not a known college", college)))?;

        Ok(Self {
            database_url,
            bind_addr,
            catalog_dir,
            catalog_base_url,
            default_college,
        })
    }
}
