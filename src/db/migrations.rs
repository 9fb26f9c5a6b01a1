//! Schema setup for the contest store.

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, info, warn};

const MAX_CONNECTIONS: u32 = 5;

/// Per-connection settings that return no row worth checking.
const CONNECTION_PRAGMAS: &[&str] = &[
    "PRAGMA foreign_keys = ON",
    "PRAGMA busy_timeout = 5000",
    "PRAGMA synchronous = NORMAL",
];

/// Open (creating if needed) the SQLite file at `db_path` and apply the schema.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    ensure_parent_dir(Path::new(db_path));

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .after_connect(|conn, _meta| Box::pin(async move { configure_connection(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    let tables = apply_schema(&pool).await?;
    info!(path = %db_path, tables, max_connections = MAX_CONNECTIONS, "contest store opened");
    Ok(pool)
}

fn ensure_parent_dir(db_file: &Path) {
    let Some(dir) = db_file.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return;
    };
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!(dir = %dir.display(), error = %e, "database directory not created");
    }
}

/// DDL statements from the bundled schema, in file order.
fn schema_statements() -> impl Iterator<Item = &'static str> {
    include_str!("schema.sql")
        .split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty())
}

/// Run every DDL statement; all are `IF NOT EXISTS`. Returns the table count.
async fn apply_schema(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    for stmt in schema_statements() {
        debug!(stmt = %stmt.lines().next().unwrap_or_default(), "ddl");
        sqlx::query(stmt).execute(pool).await?;
    }

    let tables: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'")
        .fetch_one(pool)
        .await?;
    Ok(tables)
}

async fn configure_connection(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    for pragma in CONNECTION_PRAGMAS {
        sqlx::query(pragma).execute(&mut *conn).await?;
    }

    let mode: String = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?
        .try_get(0)?;
    if !mode.eq_ignore_ascii_case("wal") {
        warn!(journal_mode = %mode, "connection not in WAL mode");
    }
    Ok(())
}
