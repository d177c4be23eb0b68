#![allow(dead_code)]

use flowstore::flow::FlowStorage;
use flowstore::storage::connect_in_memory;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePool;

pub async fn test_pool() -> SqlitePool {
    connect_in_memory().await.expect("in-memory pool")
}

pub async fn test_flows() -> FlowStorage {
    FlowStorage::new(test_pool().await)
}

pub fn node(id: &str, kind: &str, x: f64, y: f64) -> Value {
    json!({"id": id, "type": kind, "position": {"x": x, "y": y}, "data": {"label": id}})
}

pub fn edge(id: &str, source: &str, target: &str) -> Value {
    json!({"id": id, "source": source, "target": target, "data": {}})
}

/// A three-node flow with two edges and two items
pub fn sample_flow() -> Value {
    json!({
        "name": "Purchase approval",
        "description": "Two-step approval",
        "columns": [{"key": "amount", "label": "Amount"}],
        "nodes": [
            node("start", "initial", 250.0, 50.0),
            node("manager", "approval", 250.0, 200.0),
            node("finance", "approval", 250.0, 350.0),
        ],
        "edges": [
            edge("e-start-manager", "start", "manager"),
            {"id": "e-manager-finance", "source": "manager", "target": "finance",
             "label": "approved", "data": {"type": "conditional", "note": "x"}},
        ],
        "items": [
            {"id": "po-1", "data": {"amount": 120}, "currentNodeId": "manager",
             "history": [{"node": "start"}], "pathTaken": ["start"],
             "createdAt": "2024-03-01T10:20:30.500Z"},
            {"id": "po-2", "data": {"amount": 80}, "currentNodeId": "start"},
        ],
        "deadlines": {"field": " due ", "days": "5"},
    })
}

pub async fn count(pool: &SqlitePool, table: &str, flow_id: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table} WHERE flow_id = ?"))
        .bind(flow_id)
        .fetch_one(pool)
        .await
        .expect("count");
    n
}

pub type NodeSnapshot = (i64, String, String, f64, f64, Option<String>);
pub type EdgeSnapshot = (i64, String, String, String, Option<String>, Option<String>);
pub type ItemSnapshot = (
    i64,
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

/// Raw stored rows of a flow, including their row identifiers
pub async fn snapshot(
    pool: &SqlitePool,
    flow_id: &str,
) -> (Vec<NodeSnapshot>, Vec<EdgeSnapshot>, Vec<ItemSnapshot>) {
    let nodes = sqlx::query_as(
        "SELECT row_id, node_id, type, position_x, position_y, data FROM flow_nodes \
         WHERE flow_id = ? ORDER BY row_id",
    )
    .bind(flow_id)
    .fetch_all(pool)
    .await
    .expect("nodes");
    let edges = sqlx::query_as(
        "SELECT row_id, edge_id, source, target, label, data FROM flow_edges \
         WHERE flow_id = ? ORDER BY row_id",
    )
    .bind(flow_id)
    .fetch_all(pool)
    .await
    .expect("edges");
    let items = sqlx::query_as(
        "SELECT row_id, item_id, data, current_node_id, status, history, path_taken, parallel_paths, created_at \
         FROM flow_items WHERE flow_id = ? ORDER BY row_id",
    )
    .bind(flow_id)
    .fetch_all(pool)
    .await
    .expect("items");
    (nodes, edges, items)
}

/// Make any insert of an item with the given id fail inside SQLite
pub async fn fail_item_inserts(pool: &SqlitePool, item_id: &str) {
    sqlx::query(&format!(
        "CREATE TRIGGER reject_item BEFORE INSERT ON flow_items \
         WHEN NEW.item_id = '{item_id}' BEGIN SELECT RAISE(ABORT, 'item rejected'); END"
    ))
    .execute(pool)
    .await
    .expect("trigger");
}
