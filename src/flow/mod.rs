/// Flow Management Layer
///
/// Persists flow graph definitions and their items:
/// - Type definitions (Flow, Node, Edge, Item)
/// - Deadline rule sanitization
/// - Request validation into typed drafts
/// - Hydration of relational rows into the nested flow shape
/// - Transactional, diff-based reconciliation

pub mod deadlines;
pub mod hydrate;
pub mod reconcile;
pub mod storage;
pub mod types;
pub mod validate;

pub use storage::FlowStorage;
pub use types::{Edge, Flow, FlowDraft, Item, Node, Position};
