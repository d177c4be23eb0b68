/// SQLite persistence facade for flows
///
/// Reads hydrate flows from their relational rows; writes validate the
/// request body, then run the reconciler inside a single transaction.
/// A failed write is rolled back as a whole, so a flow is either fully in its
/// new state or exactly as it was.

use crate::error::{StoreError, StoreResult};
use crate::flow::hydrate::{self, EdgeRow, FlowRow, ItemRow, NodeRow};
use crate::flow::types::Flow;
use crate::flow::{reconcile, validate};
use crate::storage::rollback;
use serde_json::Value;
use sqlx::sqlite::SqlitePool;

const FLOW_COLUMNS: &str = "id, name, description, columns, deadlines, \
     planner_team_id, planner_channel_id, planner_plan_id, planner_bucket_id, \
     created_at, updated_at";

/// Flow store over a shared connection pool
#[derive(Debug, Clone)]
pub struct FlowStorage {
    pool: SqlitePool,
}

impl FlowStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// List every flow, most recently updated first
    ///
    /// A flow whose related rows fail to load is returned bare (no nodes,
    /// edges, items or columns) instead of failing the whole listing.
    pub async fn list_flows(&self) -> StoreResult<Vec<Flow>> {
        let rows: Vec<FlowRow> = sqlx::query_as(&format!(
            "SELECT {FLOW_COLUMNS} FROM flows ORDER BY updated_at DESC, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut flows = Vec::with_capacity(rows.len());
        for row in rows {
            match self.load_related(&row).await {
                Ok(flow) => flows.push(flow),
                Err(e) => {
                    tracing::error!("❌ Failed to hydrate flow {}, returning it bare: {}", row.id, e);
                    flows.push(hydrate::bare(&row));
                }
            }
        }

        Ok(flows)
    }

    /// Retrieve a hydrated flow by ID
    pub async fn get_flow(&self, id: &str) -> StoreResult<Option<Flow>> {
        let row: Option<FlowRow> =
            sqlx::query_as(&format!("SELECT {FLOW_COLUMNS} FROM flows WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Ok(Some(self.load_related(&row).await?)),
            None => Ok(None),
        }
    }

    /// Create a flow from a request body and return its generated id
    pub async fn create_flow(&self, body: &Value) -> StoreResult<String> {
        let draft = validate::create_draft(body)?;

        let mut tx = self.pool.begin().await?;
        match reconcile::create_flow(&mut *tx, &draft).await {
            Ok(id) => {
                tx.commit().await?;
                tracing::info!("🔥 Created flow: {} ({})", id, draft.name);
                Ok(id)
            }
            Err(e) => {
                rollback(tx, "create flow", &e).await;
                Err(e)
            }
        }
    }

    /// Replace a flow's definition with the request body, diffing by id
    pub async fn update_flow(&self, id: &str, body: &Value) -> StoreResult<()> {
        if id.trim().is_empty() {
            return Err(StoreError::validation("Flow id is required"));
        }
        let draft = validate::update_draft(body)?;

        let mut tx = self.pool.begin().await?;
        match reconcile::update_flow(&mut *tx, id, &draft).await {
            Ok(()) => {
                tx.commit().await?;
                tracing::info!("🔥 Updated flow: {} ({})", id, draft.name);
                Ok(())
            }
            Err(e) => {
                rollback(tx, &format!("update flow {id}"), &e).await;
                Err(e)
            }
        }
    }

    /// Delete a flow; nodes, edges and items go with it through FK cascades
    pub async fn delete_flow(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM flows WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn load_related(&self, flow: &FlowRow) -> StoreResult<Flow> {
        let nodes: Vec<NodeRow> = sqlx::query_as(
            "SELECT node_id, type, position_x, position_y, data \
             FROM flow_nodes WHERE flow_id = ? ORDER BY row_id",
        )
        .bind(&flow.id)
        .fetch_all(&self.pool)
        .await?;

        let edges: Vec<EdgeRow> = sqlx::query_as(
            "SELECT edge_id, source, target, label, data \
             FROM flow_edges WHERE flow_id = ? ORDER BY row_id",
        )
        .bind(&flow.id)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<ItemRow> = sqlx::query_as(
            "SELECT item_id, data, current_node_id, status, history, path_taken, parallel_paths, created_at \
             FROM flow_items WHERE flow_id = ? ORDER BY row_id",
        )
        .bind(&flow.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(hydrate::hydrate(flow, &nodes, &edges, &items))
    }
}
