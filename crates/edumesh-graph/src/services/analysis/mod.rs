//! Deterministic skill gap analysis

pub mod analyzer;
pub mod rules;
#[cfg(test)]
mod tests;

pub use analyzer::{GapAnalyzer, GapFinding, SnapshotSummary};
pub use rules::{PrerequisiteRule, RuleTable};
