use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

use super::rules::RuleTable;
use crate::data::{Label, NodeRecord};

/// A skill the community lacks, derived purely from which skills are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapFinding {
    pub missing_skill: String,
    pub reasoning: String,
    pub suggested_action: String,
}

/// Distinct skill and person names found in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub skills: BTreeSet<String>,
    pub people: BTreeSet<String>,
}

impl SnapshotSummary {
    fn record(&mut self, label: Label, name: &str) {
        match label {
            Label::Skill => {
                self.skills.insert(name.to_string());
            }
            Label::Person => {
                self.people.insert(name.to_string());
            }
            Label::Need | Label::Opportunity => {}
        }
    }
}

/// Deterministic skill gap detection over a node snapshot.
///
/// Every rule is evaluated, in table order, against the same summary.
#[derive(Debug, Clone, Default)]
pub struct GapAnalyzer {
    rules: RuleTable,
}

impl GapAnalyzer {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn summarize(&self, nodes: &[NodeRecord]) -> SnapshotSummary {
        let mut summary = SnapshotSummary::default();
        for node in nodes {
            if let Some(name) = node.name() {
                summary.record(node.label, name);
            }
        }
        summary
    }

    /// Summary of loosely shaped nodes.
    ///
    /// Accepts `{ "label": .., "properties": {..} }`, `{ "labels": [..], .. }`
    /// or flat maps carrying `name`. Anything unrecognised is skipped.
    pub fn summarize_values(&self, nodes: &[Value]) -> SnapshotSummary {
        let mut summary = SnapshotSummary::default();
        for node in nodes {
            let Some(label) = value_label(node) else {
                continue;
            };
            let properties = node.get("properties").unwrap_or(node);
            if let Some(name) = properties.get("name").and_then(Value::as_str) {
                summary.record(label, name);
            }
        }
        summary
    }

    pub fn analyze(&self, nodes: &[NodeRecord]) -> Vec<GapFinding> {
        self.evaluate(&self.summarize(nodes))
    }

    pub fn analyze_values(&self, nodes: &[Value]) -> Vec<GapFinding> {
        self.evaluate(&self.summarize_values(nodes))
    }

    pub fn evaluate(&self, summary: &SnapshotSummary) -> Vec<GapFinding> {
        let findings: Vec<GapFinding> = self
            .rules
            .rules
            .iter()
            .filter(|rule| summary.skills.contains(&rule.present) && !summary.skills.contains(&rule.missing))
            .map(|rule| GapFinding {
                missing_skill: rule.missing.clone(),
                reasoning: rule.reasoning.clone(),
                suggested_action: rule.suggested_action.clone(),
            })
            .collect();

        debug!(
            skills = summary.skills.len(),
            people = summary.people.len(),
            findings = findings.len(),
            "Evaluated gap rules"
        );
        findings
    }
}

fn value_label(node: &Value) -> Option<Label> {
    let raw = node.get("label").or_else(|| node.get("labels"))?;
    match raw {
        Value::String(label) => label.parse().ok(),
        Value::Array(labels) => labels
            .iter()
            .filter_map(Value::as_str)
            .find_map(|label| label.parse().ok()),
        _ => None,
    }
}
