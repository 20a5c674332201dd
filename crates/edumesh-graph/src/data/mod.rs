//! Core data structures for the EduMesh community graph

pub mod types;
pub mod records;
pub mod errors;

// Re-export all common types
pub use types::{Properties, PropertyValue, properties_from_json};
pub use records::{
    Label, NodeRef, NodeRecord, EdgeRecord, RelationshipRequest, Resolution, LinkOutcome,
    Person, Skill, Need, Opportunity, Urgency,
    REL_HAS_SKILL, REL_HAS_NEED, REL_MENTORS, REL_CAN_FILL,
};
pub use errors::{StoreError, LoadError, AnalysisError};
