/// Group management
///
/// Reusable groups of people (users keyed by email) assignable to flow steps.

pub mod storage;
pub mod types;

pub use storage::GroupStorage;
pub use types::{Group, GroupDraft, Member};
