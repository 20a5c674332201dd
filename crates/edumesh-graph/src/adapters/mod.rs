//! Adapters for external graph databases

#[cfg(feature = "neo4j")]
pub mod neo4j_store;

#[cfg(feature = "neo4j")]
pub use neo4j_store::Neo4jGraph;
