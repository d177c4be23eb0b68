/// Core flow type definitions
///
/// Defines the public shape of flows, nodes, edges and items. Flows are stored
/// relationally (one row per node/edge/item) and hydrated back into this
/// nested form for clients.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Node type tag of the mandatory start node
pub const INITIAL_NODE_TYPE: &str = "initial";

/// Edge kind that is never promoted out of the edge payload
pub const DEFAULT_EDGE_TYPE: &str = "default";

/// Item status when the client does not provide one
pub const DEFAULT_ITEM_STATUS: &str = "active";

/// A complete flow as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Column definitions, opaque to the store
    pub columns: Value,
    /// Canonical deadline rules or null
    pub deadlines: Option<Value>,
    #[serde(flatten)]
    pub planner: PlannerLinks,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub items: Vec<Item>,
}

/// External planner linkage identifiers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerLinks {
    pub planner_team_id: Option<String>,
    pub planner_channel_id: Option<String>,
    pub planner_plan_id: Option<String>,
    pub planner_bucket_id: Option<String>,
}

/// Canvas coordinates of a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A graph vertex
///
/// The id is client-assigned and unique within its flow; it is the key the
/// reconciler diffs on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: Position,
    /// Free-form payload (label, input ports, deletability, ...)
    pub data: Value,
}

impl Node {
    /// The synthesized start node seeded into flows lacking one
    pub fn default_start() -> Self {
        Self {
            id: INITIAL_NODE_TYPE.to_string(),
            node_type: INITIAL_NODE_TYPE.to_string(),
            position: Position { x: 250.0, y: 50.0 },
            data: json!({ "label": "Start", "inputs": [], "deletable": false }),
        }
    }

    pub fn is_initial(&self) -> bool {
        self.node_type == INITIAL_NODE_TYPE
    }
}

/// A directed connection between two nodes of the same flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: Option<String>,
    /// Edge kind, present only when it is not the default kind
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    pub data: Value,
}

impl Edge {
    /// Payload as persisted: a non-default kind is folded into `data.type`
    pub fn stored_data(&self) -> Value {
        fold_edge_type(self.edge_type.as_deref(), &self.data)
    }
}

/// Fold an edge kind into its payload
///
/// Missing or `"default"` kinds leave the payload untouched. A null payload
/// becomes an object; validation rejects typed edges with any other payload.
pub fn fold_edge_type(edge_type: Option<&str>, data: &Value) -> Value {
    let kind = match edge_type {
        Some(kind) if kind != DEFAULT_EDGE_TYPE => kind,
        _ => return data.clone(),
    };

    match data {
        Value::Object(map) => {
            let mut map = map.clone();
            map.insert("type".to_string(), Value::String(kind.to_string()));
            Value::Object(map)
        }
        Value::Null => json!({ "type": kind }),
        other => other.clone(),
    }
}

/// Lift a stored edge kind out of its payload
///
/// Only a string `type` other than `"default"` is lifted; otherwise the payload
/// is returned whole and no kind is reported.
pub fn lift_edge_type(data: Value) -> (Option<String>, Value) {
    match data {
        Value::Object(mut map) => {
            let liftable = matches!(
                map.get("type"),
                Some(Value::String(kind)) if kind != DEFAULT_EDGE_TYPE
            );
            if liftable {
                let kind = map
                    .remove("type")
                    .and_then(|kind| kind.as_str().map(str::to_string));
                (kind, Value::Object(map))
            } else {
                (None, Value::Object(map))
            }
        }
        other => (None, other),
    }
}

/// A runtime token traversing a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub data: Value,
    pub current_node_id: Option<String>,
    pub status: String,
    /// Ordered trace entries
    pub history: Value,
    /// Ordered node references
    pub path_taken: Value,
    /// Branch key -> in-progress path state
    pub parallel_paths: Value,
    pub created_at: Option<String>,
}

/// Item as supplied by a client, before timestamp normalization
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub id: String,
    pub data: Value,
    pub current_node_id: Option<String>,
    pub status: String,
    pub history: Value,
    pub path_taken: Value,
    pub parallel_paths: Value,
    /// Raw client value; normalized (or defaulted to now) on insert only
    pub created_at: Option<Value>,
}

/// Fully validated desired state of a flow
#[derive(Debug, Clone, PartialEq)]
pub struct FlowDraft {
    pub name: String,
    pub description: Option<String>,
    pub columns: Vec<Value>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub items: Vec<ItemDraft>,
    /// Raw deadline rules; sanitized by the reconciler
    pub deadlines: Option<Value>,
    pub planner: PlannerLinks,
}
