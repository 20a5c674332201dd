//! Core services for the EduMesh community graph

pub mod analysis;
pub mod ingestion;
pub mod store;

// Re-exports
pub use analysis::{GapAnalyzer, GapFinding, PrerequisiteRule, RuleTable, SnapshotSummary};
pub use ingestion::{load_dataset, load_dataset_path, load_dataset_str, Dataset, LoadReport};
pub use store::{BackendMode, GraphStore, MockReason};
