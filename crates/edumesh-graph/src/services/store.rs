//! Graph store: backend selection, failover and the public upsert/query surface

use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "neo4j")]
use crate::adapters::Neo4jGraph;
use crate::{
    config::{BackendPreference, StoreConfig},
    data::{
        EdgeRecord, Label, LinkOutcome, NodeRecord, NodeRef, Properties, RelationshipRequest,
        Resolution, StoreError,
    },
    storage::MemoryGraph,
    traits::GraphBackend,
};

/// Why a store runs on the in-memory graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum MockReason {
    /// Configuration asked for the mock backend.
    Requested,
    /// The durable backend failed its connectivity probe.
    Unreachable(String),
}

/// Backend a store instance is bound to.
///
/// The only transition is `Durable -> Mock`, taken once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BackendMode {
    Durable,
    Mock(MockReason),
}

impl BackendMode {
    pub fn is_mock(&self) -> bool {
        matches!(self, BackendMode::Mock(_))
    }

    /// Moves to mock mode after a connectivity failure. Mock stays mock.
    pub fn fail_over(self, cause: impl Into<String>) -> Self {
        match self {
            BackendMode::Durable => BackendMode::Mock(MockReason::Unreachable(cause.into())),
            mock @ BackendMode::Mock(_) => mock,
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendMode::Durable => f.write_str("durable"),
            BackendMode::Mock(MockReason::Requested) => f.write_str("mock (requested)"),
            BackendMode::Mock(MockReason::Unreachable(cause)) => write!(f, "mock (unreachable: {})", cause),
        }
    }
}

/// Community graph store.
///
/// Owns exactly one backend for its whole life. Cheap to share behind `Arc`.
pub struct GraphStore {
    backend: RwLock<Option<Arc<dyn GraphBackend>>>,
    mode: BackendMode,
}

impl fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphStore")
            .field("mode", &self.mode)
            .field("closed", &self.backend.read().is_none())
            .finish()
    }
}

impl GraphStore {
    /// Builds a store from configuration.
    ///
    /// Invalid configuration is fatal. Otherwise the durable backend is
    /// probed once; any probe failure yields a store in mock mode.
    pub async fn connect(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;

        if config.backend == BackendPreference::Mock {
            info!("Mock graph backend requested by configuration");
            return Ok(Self::with_backend(
                Arc::new(MemoryGraph::new()),
                BackendMode::Mock(MockReason::Requested),
            ));
        }

        match connect_durable(&config).await {
            Ok(backend) => {
                info!("Graph store using durable backend at {}", config.uri);
                Ok(Self::with_backend(backend, BackendMode::Durable))
            }
            Err(e) => {
                warn!(
                    "Durable graph backend at {} unavailable, switching to in-memory mock: {}",
                    config.uri, e
                );
                Ok(Self::with_backend(
                    Arc::new(MemoryGraph::new()),
                    BackendMode::Durable.fail_over(e.to_string()),
                ))
            }
        }
    }

    /// `connect` with configuration read from the environment.
    pub async fn from_env() -> Result<Self, StoreError> {
        Self::connect(StoreConfig::from_env()?).await
    }

    /// Store over a fresh in-memory graph.
    pub fn in_memory() -> Self {
        Self::with_backend(
            Arc::new(MemoryGraph::new()),
            BackendMode::Mock(MockReason::Requested),
        )
    }

    /// Store over an already constructed backend.
    pub fn with_backend(backend: Arc<dyn GraphBackend>, mode: BackendMode) -> Self {
        Self {
            backend: RwLock::new(Some(backend)),
            mode,
        }
    }

    pub fn mode(&self) -> &BackendMode {
        &self.mode
    }

    pub fn is_closed(&self) -> bool {
        self.backend.read().is_none()
    }

    // Clones the handle so no lock is held across an await.
    fn backend(&self) -> Result<Arc<dyn GraphBackend>, StoreError> {
        self.backend.read().clone().ok_or(StoreError::Closed)
    }

    /// Name of the active backend, `None` once closed.
    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.read().as_ref().map(|b| b.name())
    }

    #[instrument(skip(self, properties))]
    pub async fn upsert_person(&self, id: &str, properties: Properties) -> Result<(), StoreError> {
        let node = NodeRecord::person(id, properties)?;
        self.upsert_node(&node).await
    }

    #[instrument(skip(self))]
    pub async fn upsert_skill(&self, name: &str) -> Result<(), StoreError> {
        let node = NodeRecord::skill(name)?;
        self.upsert_node(&node).await
    }

    #[instrument(skip(self))]
    pub async fn upsert_need(&self, name: &str) -> Result<(), StoreError> {
        let node = NodeRecord::need(name)?;
        self.upsert_node(&node).await
    }

    #[instrument(skip(self, properties))]
    pub async fn upsert_opportunity(&self, name: &str, properties: Properties) -> Result<(), StoreError> {
        let node = NodeRecord::opportunity(name, properties)?;
        self.upsert_node(&node).await
    }

    /// Create-or-merge of a prepared node record.
    pub async fn upsert_node(&self, node: &NodeRecord) -> Result<(), StoreError> {
        let backend = self.backend()?;
        backend.upsert_node(node).await?;
        debug!("Upserted {}", node.node_ref());
        Ok(())
    }

    /// Validates a typed record (`Person`, `Skill`, `Need`, `Opportunity`) and upserts it.
    pub async fn upsert_record<R>(&self, record: R) -> Result<NodeRef, StoreError>
    where
        R: TryInto<NodeRecord, Error = StoreError>,
    {
        let node = record.try_into()?;
        self.upsert_node(&node).await?;
        Ok(node.node_ref())
    }

    #[instrument(skip(self))]
    pub async fn resolve_endpoint(&self, key: &str) -> Result<Resolution, StoreError> {
        self.backend()?.resolve(key).await
    }

    /// Create-or-merge of a directed typed edge between two existing nodes.
    ///
    /// Each endpoint key may be a node's `id` or its `name`. When either side
    /// does not resolve to exactly one node nothing is written and the
    /// outcome reports why.
    #[instrument(skip(self, properties))]
    pub async fn create_relationship(
        &self,
        from_key: &str,
        to_key: &str,
        rel_type: &str,
        properties: Properties,
    ) -> Result<LinkOutcome, StoreError> {
        let request = RelationshipRequest::new(from_key, to_key, rel_type).with_properties(properties);
        request.validate()?;

        let outcome = self.backend()?.link(&request).await?;
        match &outcome {
            LinkOutcome::Linked { from, to } => debug!("Linked {} -[{}]-> {}", from, rel_type, to),
            LinkOutcome::Unresolved { from, to } => warn!(
                "Relationship {} -[{}]-> {} not created: from={:?} to={:?}",
                from_key, rel_type, to_key, from, to
            ),
        }
        Ok(outcome)
    }

    /// Every node from one point-in-time view.
    #[instrument(skip(self))]
    pub async fn get_all_nodes(&self) -> Result<Vec<NodeRecord>, StoreError> {
        self.backend()?.nodes().await
    }

    /// Nodes carrying `label`.
    pub async fn get_nodes(&self, label: Label) -> Result<Vec<NodeRecord>, StoreError> {
        let mut nodes = self.get_all_nodes().await?;
        nodes.retain(|node| node.label == label);
        Ok(nodes)
    }

    #[instrument(skip(self))]
    pub async fn get_edges(&self) -> Result<Vec<EdgeRecord>, StoreError> {
        self.backend()?.edges().await
    }

    /// Releases the backend. Later operations fail with `StoreError::Closed`.
    pub async fn close(&self) -> Result<(), StoreError> {
        let backend = self.backend.write().take();
        if let Some(backend) = backend {
            backend.close().await?;
            info!("Graph store closed ({} backend)", backend.name());
        }
        Ok(())
    }
}

#[cfg(feature = "neo4j")]
async fn connect_durable(config: &StoreConfig) -> Result<Arc<dyn GraphBackend>, StoreError> {
    Ok(Arc::new(Neo4jGraph::connect(config).await?))
}

#[cfg(not(feature = "neo4j"))]
async fn connect_durable(_config: &StoreConfig) -> Result<Arc<dyn GraphBackend>, StoreError> {
    Err(StoreError::Connection(
        "Neo4j support not compiled in (enable the `neo4j` feature)".to_string(),
    ))
}
