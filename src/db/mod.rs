//! Database layer for local SQLite storage.
//!
//! This module handles:
//! - Connection pool management with WAL mode
//! - Schema migrations
//! - The SQLite-backed key-value store

pub mod kv_store;
pub mod pool;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the database inside the data directory.
const DB_FILE_NAME: &str = "gitping.db";

/// Migrations in the order they are applied.
const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_kv_store",
    include_str!("migrations/0001_kv_store.sql"),
)];

/// Database-related errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("No data directory available; pass --db-path")]
    NoDataDir,
}

/// Default database location under the platform data directory.
pub fn default_db_path() -> Result<PathBuf, DbError> {
    dirs::data_dir()
        .map(|dir| dir.join("gitping").join(DB_FILE_NAME))
        .ok_or(DbError::NoDataDir)
}

/// Initialize the database: create the file if needed and run migrations.
pub async fn initialize(db_path: &Path) -> Result<pool::DbPool, DbError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DbError::Migration(format!("Failed to create database directory: {}", e))
            })?;
        }
    }

    let pool = pool::create_pool(db_path).await?;
    run_migrations(&pool).await?;
    log::debug!("Database ready at {}", db_path.display());

    Ok(pool)
}

/// Run all pending database migrations.
async fn run_migrations(pool: &pool::DbPool) -> Result<(), DbError> {
    let mut conn = pool.acquire().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    for (name, sql) in MIGRATIONS {
        let applied: Option<(i64,)> = sqlx::query_as("SELECT id FROM _migrations WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
        if applied.is_some() {
            continue;
        }

        log::info!("Applying migration {}", name);
        for statement in parse_sql_statements(sql) {
            sqlx::query(&statement)
                .execute(&mut *conn)
                .await
                .map_err(|e| DbError::Migration(format!("{}: {}", name, e)))?;
        }

        sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
            .bind(name)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Split a migration file into statements.
///
/// Skips `--` comments and ignores semicolons nested in parentheses.
fn parse_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut paren_depth: i32 = 0;

    for line in sql.lines() {
        let code = match line.find("--") {
            Some(idx) => &line[..idx],
            None => line,
        };

        for ch in code.chars() {
            match ch {
                '(' => {
                    paren_depth += 1;
                    current.push(ch);
                }
                ')' => {
                    paren_depth = (paren_depth - 1).max(0);
                    current.push(ch);
                }
                ';' if paren_depth == 0 => {
                    let stmt = current.trim().to_string();
                    if !stmt.is_empty() {
                        statements.push(stmt);
                    }
                    current.clear();
                }
                _ => current.push(ch),
            }
        }

        if !current.is_empty() {
            current.push(' ');
        }
    }

    let last = current.trim().to_string();
    if !last.is_empty() {
        statements.push(last);
    }

    statements
}
