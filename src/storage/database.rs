/// Connection pool setup and schema bootstrap
///
/// Creates the shared SQLite pool and provisions the flow/group tables.
/// Provisioning is a one-time idempotent step; the stores assume the schema exists.

use crate::config::DatabaseConfig;
use crate::error::StoreError;
use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;

/// Open the connection pool described by `config` and provision the schema
///
/// In-memory databases are private to one connection, so their pool is pinned
/// to a single connection that never expires.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    let in_memory = config.url.contains(":memory:");

    if !in_memory {
        ensure_parent_dir(&config.url)?;
    }

    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| anyhow::anyhow!("Invalid database url '{}': {}", config.url, e))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(config.max_connections.max(1))
    };

    tracing::info!("🗄️ Opening database pool: {}", config.url);
    let pool = pool_options.connect_with(options).await?;

    init_schema(&pool).await?;
    tracing::info!("✅ Database schema ready");

    Ok(pool)
}

/// Convenience pool used by tests and throwaway instances
pub async fn connect_in_memory() -> Result<SqlitePool> {
    connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
}

fn ensure_parent_dir(url: &str) -> Result<()> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!("Failed to create database directory '{}': {}", parent.display(), e)
            })?;
        }
    }
    Ok(())
}

/// Create flow, item and group tables
///
/// Safe to call multiple times (uses IF NOT EXISTS). Dependent rows reference
/// their owner with ON DELETE CASCADE so that deleting a flow or group removes them.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS flows (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            columns TEXT,
            deadlines TEXT,
            planner_team_id TEXT,
            planner_channel_id TEXT,
            planner_plan_id TEXT,
            planner_bucket_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS flow_nodes (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            flow_id TEXT NOT NULL REFERENCES flows(id) ON DELETE CASCADE,
            node_id TEXT NOT NULL,
            type TEXT NOT NULL,
            position_x REAL NOT NULL DEFAULT 0,
            position_y REAL NOT NULL DEFAULT 0,
            data TEXT,
            UNIQUE (flow_id, node_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS flow_edges (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            flow_id TEXT NOT NULL REFERENCES flows(id) ON DELETE CASCADE,
            edge_id TEXT NOT NULL,
            source TEXT NOT NULL,
            target TEXT NOT NULL,
            label TEXT,
            data TEXT,
            UNIQUE (flow_id, edge_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS flow_items (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            flow_id TEXT NOT NULL REFERENCES flows(id) ON DELETE CASCADE,
            item_id TEXT NOT NULL,
            data TEXT,
            current_node_id TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            history TEXT,
            path_taken TEXT,
            parallel_paths TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (flow_id, item_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS flow_groups (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            color TEXT NOT NULL DEFAULT '',
            team_id TEXT,
            accept_any INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL UNIQUE
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS group_members (
            group_id TEXT NOT NULL REFERENCES flow_groups(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            position INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (group_id, user_id)
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_flow_nodes_flow ON flow_nodes(flow_id)",
        "CREATE INDEX IF NOT EXISTS idx_flow_edges_flow ON flow_edges(flow_id)",
        "CREATE INDEX IF NOT EXISTS idx_flow_items_flow ON flow_items(flow_id)",
        "CREATE INDEX IF NOT EXISTS idx_flows_name ON flows(name)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

/// Roll back a failed write, logging both the cause and any rollback failure
///
/// The connection returns to the pool either way; an unfinished sqlx
/// transaction also rolls back when dropped.
pub async fn rollback(tx: Transaction<'_, Sqlite>, operation: &str, cause: &StoreError) {
    tracing::warn!("↩️ Rolling back {}: {}", operation, cause);
    if let Err(e) = tx.rollback().await {
        tracing::error!("❌ Rollback of {} failed: {}", operation, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_schema_is_idempotent() {
        let pool = connect_in_memory().await.unwrap();
        init_schema(&pool).await.unwrap();

        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('flows', 'flow_nodes', 'flow_edges', 'flow_items', 'flow_groups', 'users', 'group_members')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 7);
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let pool = connect_in_memory().await.unwrap();
        let (enabled,): (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
