/// Flowstore: workflow-definition store
///
/// Persists flow graphs (nodes, edges, deadline rules), the items traversing
/// them and assignable groups, behind a JSON HTTP API.

// Core configuration and setup
pub mod config;

// Store error taxonomy
pub mod error;

// Storage gateway - pooled SQLite connections, schema bootstrap, column codecs
pub mod storage;

// Flow management layer - validation, hydration and diff-based reconciliation
pub mod flow;

// Group management layer - groups, users and memberships
pub mod group;

// HTTP API layer - REST endpoints for flows and groups
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{StoreError, StoreResult};
pub use flow::{Edge, Flow, FlowStorage, Item, Node};
pub use group::{Group, GroupStorage};
pub use server::start_server;
