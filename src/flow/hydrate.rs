/// Flow hydration
///
/// Reassembles the nested `Flow` shape from its relational rows. Payload
/// columns are decoded tolerantly: a corrupt column degrades to its empty
/// default and is logged, it never fails the read.

use crate::flow::deadlines;
use crate::flow::types::{
    lift_edge_type, Edge, Flow, Item, Node, PlannerLinks, Position, DEFAULT_ITEM_STATUS,
};
use crate::storage::codec::decode_json;
use serde_json::{json, Value};

/// Scalar columns of a `flows` row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FlowRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub columns: Option<String>,
    pub deadlines: Option<String>,
    pub planner_team_id: Option<String>,
    pub planner_channel_id: Option<String>,
    pub planner_plan_id: Option<String>,
    pub planner_bucket_id: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A `flow_nodes` row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NodeRow {
    pub node_id: String,
    #[sqlx(rename = "type")]
    pub node_type: String,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub data: Option<String>,
}

/// A `flow_edges` row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EdgeRow {
    pub edge_id: String,
    pub source: String,
    pub target: String,
    pub label: Option<String>,
    pub data: Option<String>,
}

/// A `flow_items` row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemRow {
    pub item_id: String,
    pub data: Option<String>,
    pub current_node_id: Option<String>,
    pub status: Option<String>,
    pub history: Option<String>,
    pub path_taken: Option<String>,
    pub parallel_paths: Option<String>,
    pub created_at: Option<String>,
}

/// Assemble a flow from its rows
pub fn hydrate(flow: &FlowRow, nodes: &[NodeRow], edges: &[EdgeRow], items: &[ItemRow]) -> Flow {
    let mut hydrated = bare(flow);
    hydrated.columns = decode_json(
        flow.columns.as_deref(),
        json!([]),
        &format!("flows.columns[{}]", flow.id),
    );
    hydrated.nodes = nodes.iter().map(|row| hydrate_node(&flow.id, row)).collect();
    hydrated.edges = edges.iter().map(|row| hydrate_edge(&flow.id, row)).collect();
    hydrated.items = items.iter().map(|row| hydrate_item(&flow.id, row)).collect();
    hydrated
}

/// Scalar-only flow with empty collections
///
/// Used on its own when a flow's related rows cannot be loaded.
pub fn bare(flow: &FlowRow) -> Flow {
    Flow {
        id: flow.id.clone(),
        name: flow.name.clone(),
        description: flow.description.clone(),
        columns: json!([]),
        deadlines: deadlines::sanitize(Some(&decode_json(
            flow.deadlines.as_deref(),
            Value::Null,
            &format!("flows.deadlines[{}]", flow.id),
        ))),
        planner: PlannerLinks {
            planner_team_id: flow.planner_team_id.clone(),
            planner_channel_id: flow.planner_channel_id.clone(),
            planner_plan_id: flow.planner_plan_id.clone(),
            planner_bucket_id: flow.planner_bucket_id.clone(),
        },
        created_at: flow.created_at.clone(),
        updated_at: flow.updated_at.clone(),
        nodes: Vec::new(),
        edges: Vec::new(),
        items: Vec::new(),
    }
}

fn hydrate_node(flow_id: &str, row: &NodeRow) -> Node {
    Node {
        id: row.node_id.clone(),
        node_type: row.node_type.clone(),
        position: Position {
            x: row.position_x.unwrap_or(0.0),
            y: row.position_y.unwrap_or(0.0),
        },
        data: decode_json(
            row.data.as_deref(),
            json!({}),
            &format!("flow_nodes.data[{flow_id}/{}]", row.node_id),
        ),
    }
}

fn hydrate_edge(flow_id: &str, row: &EdgeRow) -> Edge {
    let data = decode_json(
        row.data.as_deref(),
        json!({}),
        &format!("flow_edges.data[{flow_id}/{}]", row.edge_id),
    );
    let (edge_type, data) = lift_edge_type(data);

    Edge {
        id: row.edge_id.clone(),
        source: row.source.clone(),
        target: row.target.clone(),
        label: row.label.clone(),
        edge_type,
        data,
    }
}

fn hydrate_item(flow_id: &str, row: &ItemRow) -> Item {
    let column = |name: &str| format!("flow_items.{name}[{flow_id}/{}]", row.item_id);

    Item {
        id: row.item_id.clone(),
        data: decode_json(row.data.as_deref(), json!({}), &column("data")),
        current_node_id: row.current_node_id.clone(),
        status: row
            .status
            .clone()
            .unwrap_or_else(|| DEFAULT_ITEM_STATUS.to_string()),
        history: decode_json(row.history.as_deref(), json!([]), &column("history")),
        path_taken: decode_json(row.path_taken.as_deref(), json!([]), &column("path_taken")),
        parallel_paths: decode_json(
            row.parallel_paths.as_deref(),
            json!({}),
            &column("parallel_paths"),
        ),
        created_at: row.created_at.clone(),
    }
}
