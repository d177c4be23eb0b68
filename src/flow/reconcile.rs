/// Flow reconciliation
///
/// Applies a desired flow state to storage. Every function here runs on the
/// caller's transaction connection; the caller owns commit/rollback.
///
/// Updates never destroy-and-recreate: each collection is diffed by its
/// client-supplied id so that untouched rows keep their row identifiers.

use crate::error::{StoreError, StoreResult};
use crate::flow::deadlines;
use crate::flow::types::{Edge, FlowDraft, ItemDraft, Node, INITIAL_NODE_TYPE};
use crate::storage::codec::{encode_json, encode_optional_json, normalize_timestamp, now_timestamp};
use serde_json::Value;
use sqlx::SqliteConnection;
use std::collections::BTreeSet;

/// Three-way partition of id sets
///
/// `to_delete` = existing - desired, `to_update` = existing & desired,
/// `to_insert` = desired - existing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IdDiff {
    pub to_delete: BTreeSet<String>,
    pub to_update: BTreeSet<String>,
    pub to_insert: BTreeSet<String>,
}

impl IdDiff {
    pub fn compute<'a>(existing: &BTreeSet<String>, desired: impl IntoIterator<Item = &'a str>) -> Self {
        let desired: BTreeSet<String> = desired.into_iter().map(str::to_string).collect();
        Self {
            to_delete: existing.difference(&desired).cloned().collect(),
            to_update: existing.intersection(&desired).cloned().collect(),
            to_insert: desired.difference(existing).cloned().collect(),
        }
    }

    pub fn is_update(&self, id: &str) -> bool {
        self.to_update.contains(id)
    }
}

/// Child tables diffed by the reconciler
#[derive(Debug, Clone, Copy)]
enum Collection {
    Nodes,
    Edges,
    Items,
}

impl Collection {
    fn table(self) -> &'static str {
        match self {
            Collection::Nodes => "flow_nodes",
            Collection::Edges => "flow_edges",
            Collection::Items => "flow_items",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Collection::Nodes => "node_id",
            Collection::Edges => "edge_id",
            Collection::Items => "item_id",
        }
    }
}

/// Insert a new flow with all of its nodes, edges and items
///
/// An empty node list is replaced by the default start node. Returns the
/// generated flow id.
pub async fn create_flow(conn: &mut SqliteConnection, draft: &FlowDraft) -> StoreResult<String> {
    let flow_id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();
    let deadlines = deadlines::sanitize(draft.deadlines.as_ref());

    sqlx::query(
        r#"
        INSERT INTO flows (
            id, name, description, columns, deadlines,
            planner_team_id, planner_channel_id, planner_plan_id, planner_bucket_id,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&flow_id)
    .bind(&draft.name)
    .bind(&draft.description)
    .bind(encode_json(&Value::Array(draft.columns.clone()))?)
    .bind(encode_optional_json(deadlines.as_ref())?)
    .bind(&draft.planner.planner_team_id)
    .bind(&draft.planner.planner_channel_id)
    .bind(&draft.planner.planner_plan_id)
    .bind(&draft.planner.planner_bucket_id)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    if draft.nodes.is_empty() {
        insert_node(conn, &flow_id, &Node::default_start()).await?;
    } else {
        for node in &draft.nodes {
            insert_node(conn, &flow_id, node).await?;
        }
    }
    ensure_initial_node(conn, &flow_id).await?;

    for edge in &draft.edges {
        insert_edge(conn, &flow_id, edge).await?;
    }
    for item in &draft.items {
        insert_item(conn, &flow_id, item).await?;
    }

    tracing::debug!(
        "🧩 Flow {} written: {} nodes, {} edges, {} items",
        flow_id,
        draft.nodes.len().max(1),
        draft.edges.len(),
        draft.items.len()
    );

    Ok(flow_id)
}

/// Reconcile a stored flow with its desired state
///
/// Steps run strictly in order: metadata, node diff, edge diff, item diff,
/// start-node restoration.
pub async fn update_flow(conn: &mut SqliteConnection, flow_id: &str, draft: &FlowDraft) -> StoreResult<()> {
    let deadlines = deadlines::sanitize(draft.deadlines.as_ref());

    let updated = sqlx::query(
        r#"
        UPDATE flows SET
            name = ?, description = ?,
            planner_team_id = ?, planner_channel_id = ?, planner_plan_id = ?, planner_bucket_id = ?,
            columns = ?, deadlines = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&draft.name)
    .bind(&draft.description)
    .bind(&draft.planner.planner_team_id)
    .bind(&draft.planner.planner_channel_id)
    .bind(&draft.planner.planner_plan_id)
    .bind(&draft.planner.planner_bucket_id)
    .bind(encode_json(&Value::Array(draft.columns.clone()))?)
    .bind(encode_optional_json(deadlines.as_ref())?)
    .bind(now_timestamp())
    .bind(flow_id)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(StoreError::not_found(format!("Flow not found: {flow_id}")));
    }

    let node_ids = existing_ids(conn, Collection::Nodes, flow_id).await?;
    let edge_ids = existing_ids(conn, Collection::Edges, flow_id).await?;
    let item_ids = existing_ids(conn, Collection::Items, flow_id).await?;

    let nodes = IdDiff::compute(&node_ids, draft.nodes.iter().map(|n| n.id.as_str()));
    delete_rows(conn, Collection::Nodes, flow_id, &nodes.to_delete).await?;
    for node in &draft.nodes {
        if nodes.is_update(&node.id) {
            update_node(conn, flow_id, node).await?;
        } else {
            insert_node(conn, flow_id, node).await?;
        }
    }

    let edges = IdDiff::compute(&edge_ids, draft.edges.iter().map(|e| e.id.as_str()));
    delete_rows(conn, Collection::Edges, flow_id, &edges.to_delete).await?;
    for edge in &draft.edges {
        if edges.is_update(&edge.id) {
            update_edge(conn, flow_id, edge).await?;
        } else {
            insert_edge(conn, flow_id, edge).await?;
        }
    }

    let items = IdDiff::compute(&item_ids, draft.items.iter().map(|i| i.id.as_str()));
    delete_rows(conn, Collection::Items, flow_id, &items.to_delete).await?;
    for item in &draft.items {
        if items.is_update(&item.id) {
            update_item(conn, flow_id, item).await?;
        } else {
            insert_item(conn, flow_id, item).await?;
        }
    }

    ensure_initial_node(conn, flow_id).await?;

    tracing::debug!(
        "🧩 Flow {} reconciled: nodes -{} ~{} +{}, edges -{} ~{} +{}, items -{} ~{} +{}",
        flow_id,
        nodes.to_delete.len(),
        nodes.to_update.len(),
        nodes.to_insert.len(),
        edges.to_delete.len(),
        edges.to_update.len(),
        edges.to_insert.len(),
        items.to_delete.len(),
        items.to_update.len(),
        items.to_insert.len()
    );

    Ok(())
}

/// Insert the default start node when the flow has no initial node
///
/// Returns whether a node was inserted.
pub async fn ensure_initial_node(conn: &mut SqliteConnection, flow_id: &str) -> StoreResult<bool> {
    let (initial_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM flow_nodes WHERE flow_id = ? AND type = ?")
            .bind(flow_id)
            .bind(INITIAL_NODE_TYPE)
            .fetch_one(&mut *conn)
            .await?;

    if initial_count > 0 {
        return Ok(false);
    }

    let mut start = Node::default_start();
    let (taken,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM flow_nodes WHERE flow_id = ? AND node_id = ?")
            .bind(flow_id)
            .bind(&start.id)
            .fetch_one(&mut *conn)
            .await?;
    if taken > 0 {
        start.id = format!("{}-{}", INITIAL_NODE_TYPE, uuid::Uuid::new_v4().simple());
    }

    insert_node(conn, flow_id, &start).await?;
    tracing::info!("🚩 Flow {} had no initial node, inserted default start node '{}'", flow_id, start.id);

    Ok(true)
}

async fn existing_ids(
    conn: &mut SqliteConnection,
    collection: Collection,
    flow_id: &str,
) -> StoreResult<BTreeSet<String>> {
    let query = format!(
        "SELECT {} FROM {} WHERE flow_id = ?",
        collection.key(),
        collection.table()
    );
    let ids: Vec<(String,)> = sqlx::query_as(&query)
        .bind(flow_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(ids.into_iter().map(|(id,)| id).collect())
}

async fn delete_rows(
    conn: &mut SqliteConnection,
    collection: Collection,
    flow_id: &str,
    ids: &BTreeSet<String>,
) -> StoreResult<()> {
    let query = format!(
        "DELETE FROM {} WHERE flow_id = ? AND {} = ?",
        collection.table(),
        collection.key()
    );
    for id in ids {
        sqlx::query(&query)
            .bind(flow_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_node(conn: &mut SqliteConnection, flow_id: &str, node: &Node) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO flow_nodes (flow_id, node_id, type, position_x, position_y, data)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(flow_id)
    .bind(&node.id)
    .bind(&node.node_type)
    .bind(node.position.x)
    .bind(node.position.y)
    .bind(encode_json(&node.data)?)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn update_node(conn: &mut SqliteConnection, flow_id: &str, node: &Node) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE flow_nodes SET type = ?, position_x = ?, position_y = ?, data = ?
        WHERE flow_id = ? AND node_id = ?
        "#,
    )
    .bind(&node.node_type)
    .bind(node.position.x)
    .bind(node.position.y)
    .bind(encode_json(&node.data)?)
    .bind(flow_id)
    .bind(&node.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_edge(conn: &mut SqliteConnection, flow_id: &str, edge: &Edge) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO flow_edges (flow_id, edge_id, source, target, label, data)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(flow_id)
    .bind(&edge.id)
    .bind(&edge.source)
    .bind(&edge.target)
    .bind(&edge.label)
    .bind(encode_json(&edge.stored_data())?)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn update_edge(conn: &mut SqliteConnection, flow_id: &str, edge: &Edge) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE flow_edges SET source = ?, target = ?, label = ?, data = ?
        WHERE flow_id = ? AND edge_id = ?
        "#,
    )
    .bind(&edge.source)
    .bind(&edge.target)
    .bind(&edge.label)
    .bind(encode_json(&edge.stored_data())?)
    .bind(flow_id)
    .bind(&edge.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_item(conn: &mut SqliteConnection, flow_id: &str, item: &ItemDraft) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO flow_items (
            flow_id, item_id, data, current_node_id, status,
            history, path_taken, parallel_paths, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(flow_id)
    .bind(&item.id)
    .bind(encode_json(&item.data)?)
    .bind(&item.current_node_id)
    .bind(&item.status)
    .bind(encode_json(&item.history)?)
    .bind(encode_json(&item.path_taken)?)
    .bind(encode_json(&item.parallel_paths)?)
    .bind(normalize_timestamp(item.created_at.as_ref()))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn update_item(conn: &mut SqliteConnection, flow_id: &str, item: &ItemDraft) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE flow_items SET
            data = ?, current_node_id = ?, status = ?,
            history = ?, path_taken = ?, parallel_paths = ?
        WHERE flow_id = ? AND item_id = ?
        "#,
    )
    .bind(encode_json(&item.data)?)
    .bind(&item.current_node_id)
    .bind(&item.status)
    .bind(encode_json(&item.history)?)
    .bind(encode_json(&item.path_taken)?)
    .bind(encode_json(&item.parallel_paths)?)
    .bind(flow_id)
    .bind(&item.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
