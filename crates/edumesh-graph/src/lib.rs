//! EduMesh community graph
//!
//! Stores people, skills, needs and opportunities in Neo4j, or in an
//! in-memory graph when Neo4j is unreachable, and derives skill gaps from
//! the stored graph without any external service.

// Core modules
pub mod config;
pub mod data;
pub mod traits;
pub mod storage;
pub mod services;

// Durable backend adapters
pub mod adapters;

// Re-export key types for convenient usage
pub use config::{BackendPreference, StoreConfig};
pub use data::{
    EdgeRecord, Label, LinkOutcome, NodeRecord, NodeRef, Properties, PropertyValue,
    RelationshipRequest, Resolution,
    Need, Opportunity, Person, Skill, Urgency,
    REL_CAN_FILL, REL_HAS_NEED, REL_HAS_SKILL, REL_MENTORS,
};
pub use data::errors::{AnalysisError, LoadError, StoreError};
pub use traits::GraphBackend;
pub use storage::MemoryGraph;

#[cfg(feature = "neo4j")]
pub use adapters::Neo4jGraph;

// Re-export core services
pub use services::{
    BackendMode, GraphStore, MockReason,
    GapAnalyzer, GapFinding, PrerequisiteRule, RuleTable, SnapshotSummary,
    Dataset, LoadReport, load_dataset, load_dataset_path, load_dataset_str,
};

/// Initialize tracing for the graph store.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}
