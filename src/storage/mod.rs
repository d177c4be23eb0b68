/// Storage gateway
///
/// Pooled, transactional access to the relational store:
/// - Pool creation and schema provisioning
/// - Transaction rollback on failed writes
/// - JSON and timestamp column codecs

pub mod codec;
pub mod database;

pub use database::{connect, connect_in_memory, init_schema, rollback};
