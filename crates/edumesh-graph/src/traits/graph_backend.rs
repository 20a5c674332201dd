//! GraphBackend trait definition for graph database interaction

use async_trait::async_trait;

use crate::data::{
    errors::StoreError,
    records::{EdgeRecord, LinkOutcome, NodeRecord, RelationshipRequest, Resolution},
};

/// Represents the interface every graph backend implements.
/// The `GraphStore` routes each of its operations to exactly one backend.
///
/// Implementations must make each call a single logical operation: a
/// concurrent reader never observes half of an upsert or link.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Creates the node if absent, otherwise overwrites only the supplied properties.
    async fn upsert_node(&self, node: &NodeRecord) -> Result<(), StoreError>;

    /// Resolves a key against the `id` or `name` of every node.
    async fn resolve(&self, key: &str) -> Result<Resolution, StoreError>;

    /// Resolves both endpoints and, only when each resolves to exactly one
    /// node, merges the typed edge and overwrites the supplied properties.
    async fn link(&self, request: &RelationshipRequest) -> Result<LinkOutcome, StoreError>;

    /// Point-in-time view of every node.
    async fn nodes(&self) -> Result<Vec<NodeRecord>, StoreError>;

    /// Point-in-time view of every relationship.
    async fn edges(&self) -> Result<Vec<EdgeRecord>, StoreError>;

    /// Releases any connection held by the backend. Must tolerate repeated calls.
    async fn close(&self) -> Result<(), StoreError>;
}
