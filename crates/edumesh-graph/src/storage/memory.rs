use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

use crate::data::{
    EdgeRecord, LinkOutcome, NodeRecord, NodeRef, Properties, RelationshipRequest, Resolution,
    StoreError,
};
use crate::traits::GraphBackend;

/// Edge identity: one edge per ordered pair and relationship type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct EdgeKey {
    from: NodeRef,
    to: NodeRef,
    rel_type: String,
}

#[derive(Debug, Default)]
struct GraphState {
    nodes: BTreeMap<NodeRef, NodeRecord>,
    edges: BTreeMap<EdgeKey, Properties>,
}

impl GraphState {
    fn resolve(&self, key: &str) -> Resolution {
        let matches = self
            .nodes
            .values()
            .filter(|node| node.matches_key(key))
            .map(NodeRecord::node_ref)
            .collect();
        Resolution::from_matches(matches)
    }
}

/// In-memory directed graph used as the mock backend.
///
/// Nodes and edges share one lock: writers are exclusive and snapshot reads
/// see either all or none of a concurrent upsert.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: RwLock<GraphState>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.state.read().edges.len()
    }

    /// Looks up a node by its identity.
    pub fn node(&self, node: &NodeRef) -> Option<NodeRecord> {
        self.state.read().nodes.get(node).cloned()
    }

    /// True when an edge of `rel_type` exists from `from` to `to`.
    pub fn has_edge(&self, from: &NodeRef, to: &NodeRef, rel_type: &str) -> bool {
        let key = EdgeKey {
            from: from.clone(),
            to: to.clone(),
            rel_type: rel_type.to_string(),
        };
        self.state.read().edges.contains_key(&key)
    }
}

#[async_trait]
impl GraphBackend for MemoryGraph {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upsert_node(&self, node: &NodeRecord) -> Result<(), StoreError> {
        let mut state = self.state.write();
        match state.nodes.get_mut(&node.node_ref()) {
            Some(existing) => existing.merge(&node.properties),
            None => {
                state.nodes.insert(node.node_ref(), node.clone());
            }
        }
        Ok(())
    }

    async fn resolve(&self, key: &str) -> Result<Resolution, StoreError> {
        Ok(self.state.read().resolve(key))
    }

    async fn link(&self, request: &RelationshipRequest) -> Result<LinkOutcome, StoreError> {
        let mut state = self.state.write();
        let from = state.resolve(&request.from_key);
        let to = state.resolve(&request.to_key);

        let (from, to) = match (from, to) {
            (Resolution::Found(from), Resolution::Found(to)) => (from, to),
            (from, to) => return Ok(LinkOutcome::Unresolved { from, to }),
        };

        let key = EdgeKey {
            from: from.clone(),
            to: to.clone(),
            rel_type: request.rel_type.clone(),
        };
        let properties = state.edges.entry(key).or_default();
        for (k, v) in &request.properties {
            properties.insert(k.clone(), v.clone());
        }
        debug!("Merged edge {} -[{}]-> {}", from, request.rel_type, to);

        Ok(LinkOutcome::Linked { from, to })
    }

    async fn nodes(&self) -> Result<Vec<NodeRecord>, StoreError> {
        Ok(self.state.read().nodes.values().cloned().collect())
    }

    async fn edges(&self) -> Result<Vec<EdgeRecord>, StoreError> {
        let state = self.state.read();
        Ok(state
            .edges
            .iter()
            .map(|(key, properties)| EdgeRecord {
                from: key.from.clone(),
                to: key.to.clone(),
                rel_type: key.rel_type.clone(),
                properties: properties.clone(),
            })
            .collect())
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
