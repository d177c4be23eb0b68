/// Flow payload validation
///
/// Converts an untyped request body into a `FlowDraft`. Create is lenient about
/// missing collections (they default to empty); update requires every
/// collection and enforces the graph invariants before any write happens.

use crate::error::{StoreError, StoreResult};
use crate::flow::types::{
    Edge, FlowDraft, ItemDraft, Node, PlannerLinks, Position, DEFAULT_EDGE_TYPE,
    DEFAULT_ITEM_STATUS,
};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Create,
    Update,
}

/// Validate a create payload
pub fn create_draft(body: &Value) -> StoreResult<FlowDraft> {
    parse_draft(body, Mode::Create)
}

/// Validate an update payload, including graph invariants
pub fn update_draft(body: &Value) -> StoreResult<FlowDraft> {
    let draft = parse_draft(body, Mode::Update)?;

    if draft.nodes.is_empty() {
        return Err(StoreError::validation("Flow must contain at least one node"));
    }
    if !draft.nodes.iter().any(Node::is_initial) {
        return Err(StoreError::validation("Flow must contain an initial node"));
    }

    let node_ids: HashSet<&str> = draft.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &draft.edges {
        if !node_ids.contains(edge.source.as_str()) {
            return Err(StoreError::validation(format!(
                "Edge '{}' references unknown source node '{}'",
                edge.id, edge.source
            )));
        }
        if !node_ids.contains(edge.target.as_str()) {
            return Err(StoreError::validation(format!(
                "Edge '{}' references unknown target node '{}'",
                edge.id, edge.target
            )));
        }
    }

    Ok(draft)
}

fn parse_draft(body: &Value, mode: Mode) -> StoreResult<FlowDraft> {
    let body = body
        .as_object()
        .ok_or_else(|| StoreError::validation("Request body must be a JSON object"))?;

    let name = match body.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
        _ => return Err(StoreError::validation("Flow name is required and must be a non-empty string")),
    };

    let required = mode == Mode::Update;
    let columns = list_field(body, "columns", required)?;
    let nodes = list_field(body, "nodes", required)?
        .iter()
        .enumerate()
        .map(|(index, value)| parse_node(index, value))
        .collect::<StoreResult<Vec<_>>>()?;
    let edges = list_field(body, "edges", required)?
        .iter()
        .enumerate()
        .map(|(index, value)| parse_edge(index, value))
        .collect::<StoreResult<Vec<_>>>()?;
    let items = list_field(body, "items", required)?
        .iter()
        .enumerate()
        .map(|(index, value)| parse_item(index, value))
        .collect::<StoreResult<Vec<_>>>()?;

    ensure_unique("node", nodes.iter().map(|n| n.id.as_str()))?;
    ensure_unique("edge", edges.iter().map(|e| e.id.as_str()))?;
    ensure_unique("item", items.iter().map(|i| i.id.as_str()))?;

    Ok(FlowDraft {
        name,
        description: optional_string(body, "description")?,
        columns,
        nodes,
        edges,
        items,
        deadlines: body.get("deadlines").filter(|d| !d.is_null()).cloned(),
        planner: PlannerLinks {
            planner_team_id: optional_string(body, "plannerTeamId")?,
            planner_channel_id: optional_string(body, "plannerChannelId")?,
            planner_plan_id: optional_string(body, "plannerPlanId")?,
            planner_bucket_id: optional_string(body, "plannerBucketId")?,
        },
    })
}

fn list_field(body: &Map<String, Value>, key: &str, required: bool) -> StoreResult<Vec<Value>> {
    match body.get(key) {
        Some(Value::Array(values)) => Ok(values.clone()),
        None | Some(Value::Null) if !required => Ok(Vec::new()),
        _ => Err(StoreError::validation(format!("{key} must be an array"))),
    }
}

fn optional_string(body: &Map<String, Value>, key: &str) -> StoreResult<Option<String>> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(StoreError::validation(format!("{key} must be a string"))),
    }
}

fn required_string<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

fn payload(object: &Map<String, Value>, key: &str, empty: Value) -> Value {
    match object.get(key) {
        None | Some(Value::Null) => empty,
        Some(value) => value.clone(),
    }
}

fn parse_node(index: usize, value: &Value) -> StoreResult<Node> {
    let object = value
        .as_object()
        .ok_or_else(|| StoreError::validation(format!("Node at index {index} must be an object")))?;

    let id = required_string(object, "id")
        .ok_or_else(|| StoreError::validation(format!("Node at index {index} is missing an id")))?;
    let node_type = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::validation(format!("Node '{id}' is missing a type")))?;

    let position = object
        .get("position")
        .and_then(|p| Some(Position { x: p.get("x")?.as_f64()?, y: p.get("y")?.as_f64()? }))
        .ok_or_else(|| {
            StoreError::validation(format!("Node '{id}' must have a position with numeric x and y"))
        })?;

    Ok(Node {
        id: id.to_string(),
        node_type: node_type.to_string(),
        position,
        data: payload(object, "data", json!({})),
    })
}

fn parse_edge(index: usize, value: &Value) -> StoreResult<Edge> {
    let object = value
        .as_object()
        .ok_or_else(|| StoreError::validation(format!("Edge at index {index} must be an object")))?;

    let id = required_string(object, "id")
        .ok_or_else(|| StoreError::validation(format!("Edge at index {index} is missing an id")))?;
    let source = required_string(object, "source")
        .ok_or_else(|| StoreError::validation(format!("Edge '{id}' is missing a source")))?;
    let target = required_string(object, "target")
        .ok_or_else(|| StoreError::validation(format!("Edge '{id}' is missing a target")))?;

    let edge_type = object.get("type").and_then(Value::as_str).map(str::to_string);
    let data = payload(object, "data", json!({}));

    // a typed edge stores its kind inside the payload, which must be an object
    let typed = matches!(edge_type.as_deref(), Some(kind) if kind != DEFAULT_EDGE_TYPE);
    if typed && !data.is_object() {
        return Err(StoreError::validation(format!(
            "Edge '{id}' must have object data when it has a type"
        )));
    }

    Ok(Edge {
        id: id.to_string(),
        source: source.to_string(),
        target: target.to_string(),
        label: object.get("label").and_then(Value::as_str).map(str::to_string),
        edge_type,
        data,
    })
}

fn parse_item(index: usize, value: &Value) -> StoreResult<ItemDraft> {
    let object = value
        .as_object()
        .ok_or_else(|| StoreError::validation(format!("Item at index {index} must be an object")))?;

    let id = match object.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        None | Some(Value::Null) => uuid::Uuid::new_v4().to_string(),
        Some(_) => {
            return Err(StoreError::validation(format!(
                "Item at index {index} has an invalid id"
            )))
        }
    };

    Ok(ItemDraft {
        id,
        data: payload(object, "data", json!({})),
        current_node_id: object
            .get("currentNodeId")
            .and_then(Value::as_str)
            .map(str::to_string),
        status: object
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_ITEM_STATUS)
            .to_string(),
        history: payload(object, "history", json!([])),
        path_taken: payload(object, "pathTaken", json!([])),
        parallel_paths: payload(object, "parallelPaths", json!({})),
        created_at: object.get("createdAt").filter(|v| !v.is_null()).cloned(),
    })
}

fn ensure_unique<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> StoreResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(StoreError::validation(format!("Duplicate {kind} id '{id}'")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, kind: &str) -> Value {
        json!({"id": id, "type": kind, "position": {"x": 1, "y": 2.5}, "data": {"label": id}})
    }

    fn update_body() -> Value {
        json!({
            "name": "Onboarding",
            "description": null,
            "columns": [],
            "nodes": [node("start", "initial"), node("review", "task")],
            "edges": [{"id": "e1", "source": "start", "target": "review"}],
            "items": [],
        })
    }

    fn message(err: StoreError) -> String {
        match err {
            StoreError::Validation(message) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_keeps_name_as_given_and_defaults_collections() {
        let draft = create_draft(&json!({"name": "  Intake "})).unwrap();
        assert_eq!(draft.name, "  Intake ");
        assert!(draft.nodes.is_empty() && draft.edges.is_empty() && draft.items.is_empty());
        assert!(draft.columns.is_empty());
        assert_eq!(draft.deadlines, None);
    }

    #[test]
    fn create_rejects_blank_name_and_non_lists() {
        assert!(message(create_draft(&json!({"name": "   "})).unwrap_err()).contains("name"));
        assert_eq!(
            message(create_draft(&json!({"name": "x", "nodes": {}})).unwrap_err()),
            "nodes must be an array"
        );
        assert!(create_draft(&json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn create_skips_edge_endpoint_check() {
        let body = json!({
            "name": "x",
            "edges": [{"id": "e1", "source": "ghost", "target": "phantom"}],
        });
        assert_eq!(create_draft(&body).unwrap().edges.len(), 1);
    }

    #[test]
    fn update_accepts_valid_graph() {
        let draft = update_draft(&update_body()).unwrap();
        assert_eq!(draft.nodes.len(), 2);
        assert_eq!(draft.nodes[0].position, Position { x: 1.0, y: 2.5 });
        assert_eq!(draft.edges[0].data, json!({}));
    }

    #[test]
    fn update_requires_all_collections() {
        let mut body = update_body();
        body.as_object_mut().unwrap().remove("items");
        assert_eq!(message(update_draft(&body).unwrap_err()), "items must be an array");
    }

    #[test]
    fn update_requires_initial_node() {
        let mut body = update_body();
        body["nodes"] = json!([node("review", "task")]);
        body["edges"] = json!([]);
        assert_eq!(
            message(update_draft(&body).unwrap_err()),
            "Flow must contain an initial node"
        );

        body["nodes"] = json!([]);
        assert_eq!(
            message(update_draft(&body).unwrap_err()),
            "Flow must contain at least one node"
        );
    }

    #[test]
    fn update_rejects_dangling_edge() {
        let mut body = update_body();
        body["edges"] = json!([
            {"id": "e1", "source": "start", "target": "review"},
            {"id": "e2", "source": "review", "target": "missing"},
        ]);
        assert_eq!(
            message(update_draft(&body).unwrap_err()),
            "Edge 'e2' references unknown target node 'missing'"
        );
    }

    #[test]
    fn node_shape_is_checked() {
        let mut body = update_body();
        body["nodes"] = json!([{"id": "start", "type": "initial", "position": {"x": "1", "y": 2}}]);
        body["edges"] = json!([]);
        assert_eq!(
            message(update_draft(&body).unwrap_err()),
            "Node 'start' must have a position with numeric x and y"
        );

        body["nodes"] = json!([{"type": "initial", "position": {"x": 1, "y": 2}}]);
        assert_eq!(
            message(update_draft(&body).unwrap_err()),
            "Node at index 0 is missing an id"
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut body = update_body();
        body["nodes"] = json!([node("start", "initial"), node("start", "task")]);
        body["edges"] = json!([]);
        assert_eq!(
            message(update_draft(&body).unwrap_err()),
            "Duplicate node id 'start'"
        );
    }

    #[test]
    fn item_defaults_are_applied() {
        let draft = create_draft(&json!({"name": "x", "items": [{"data": {"k": 1}}, {"id": 42}]})).unwrap();
        let first = &draft.items[0];
        assert!(!first.id.is_empty());
        assert_eq!(first.status, "active");
        assert_eq!(first.history, json!([]));
        assert_eq!(first.path_taken, json!([]));
        assert_eq!(first.parallel_paths, json!({}));
        assert_eq!(first.created_at, None);
        assert_eq!(draft.items[1].id, "42");
    }

    #[test]
    fn planner_links_must_be_strings() {
        let mut body = update_body();
        body["plannerTeamId"] = json!("team-1");
        let draft = update_draft(&body).unwrap();
        assert_eq!(draft.planner.planner_team_id.as_deref(), Some("team-1"));

        body["plannerPlanId"] = json!(7);
        assert_eq!(
            message(update_draft(&body).unwrap_err()),
            "plannerPlanId must be a string"
        );
    }

    #[test]
    fn typed_edge_needs_object_data() {
        let mut body = update_body();
        body["edges"][0]["type"] = json!("conditional");
        body["edges"][0]["data"] = json!(["a"]);
        assert_eq!(
            message(update_draft(&body).unwrap_err()),
            "Edge 'e1' must have object data when it has a type"
        );

        body["edges"][0]["data"] = Value::Null;
        assert_eq!(update_draft(&body).unwrap().edges[0].data, json!({}));

        body["edges"][0]["type"] = json!("default");
        body["edges"][0]["data"] = json!("plain");
        assert_eq!(update_draft(&body).unwrap().edges[0].data, json!("plain"));
    }
}
