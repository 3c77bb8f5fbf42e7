//! gitping - polls GitHub for pull requests that need your attention.
//!
//! Each cycle walks the user's organizations and repositories, sorts open
//! pull requests into review-requested, team, authored and mention
//! buckets, and raises an alert when something new shows up.

pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

use error::AppError;
use services::store::{MemoryStore, StateStore};
use std::path::Path;
use std::sync::Arc;

/// Open the state store: in memory, or SQLite at `db_path` (default
/// location when `None`).
pub async fn open_store(db_path: Option<&Path>, in_memory: bool) -> Result<StateStore, AppError> {
    if in_memory {
        return Ok(StateStore::new(Arc::new(MemoryStore::new())));
    }

    let path = match db_path {
        Some(path) => path.to_path_buf(),
        None => db::default_db_path()?,
    };
    let pool = db::initialize(&path).await?;
    Ok(StateStore::new(Arc::new(db::kv_store::SqliteStore::new(pool))))
}
