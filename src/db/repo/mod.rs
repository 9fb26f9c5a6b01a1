//! Repository layer for database operations.
//!
//! Methods are organized across submodules by domain:
//! - `events.rs` - match event ingestion and reads
//! - `contests.rs` - teams, contests and contest entries

mod contests;
mod events;

use crate::datasource::StoreError;
use crate::domain::Points;
use sqlx::sqlite::SqlitePool;

/// SQLite-backed implementation of every store trait.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_points(column: &str, key: &str, raw: &str) -> Result<Points, StoreError> {
    Points::from_str_canonical(raw)
        .map_err(|e| StoreError::Corrupt(format!("{} for {} = {:?}: {}", column, key, raw, e)))
}

fn to_u32(column: &str, key: &str, raw: i64) -> Result<u32, StoreError> {
    u32::try_from(raw)
        .map_err(|_| StoreError::Corrupt(format!("{} for {} out of range: {}", column, key, raw)))
}
