use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::errors::AnalysisError;

/// "If skill `present` exists and skill `missing` does not, recommend `missing`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteRule {
    pub present: String,
    pub missing: String,
    pub reasoning: String,
    pub suggested_action: String,
}

impl PrerequisiteRule {
    pub fn new(
        present: impl Into<String>,
        missing: impl Into<String>,
        reasoning: impl Into<String>,
        suggested_action: impl Into<String>,
    ) -> Self {
        Self {
            present: present.into(),
            missing: missing.into(),
            reasoning: reasoning.into(),
            suggested_action: suggested_action.into(),
        }
    }
}

/// Ordered prerequisite rules. Findings are reported in table order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    #[serde(default)]
    pub rules: Vec<PrerequisiteRule>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            rules: vec![
                PrerequisiteRule::new(
                    "Solar Installation",
                    "Solar Maintenance",
                    "Solar installation exists but no maintenance expertise",
                    "Train an existing installer as maintenance lead",
                ),
                PrerequisiteRule::new(
                    "Basic Math",
                    "Advanced Math",
                    "Only foundational math skills present",
                    "Upskill senior students or teachers",
                ),
            ],
        }
    }
}

impl RuleTable {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: PrerequisiteRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, AnalysisError> {
        let table: RuleTable = serde_yaml::from_str(source)?;
        table.validate()?;
        Ok(table)
    }

    pub fn from_json_str(source: &str) -> Result<Self, AnalysisError> {
        let table: RuleTable = serde_json::from_str(source)?;
        table.validate()?;
        Ok(table)
    }

    /// Reads a rule table; `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            path: path.display().to_string(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&source),
            _ => Self::from_yaml_str(&source),
        }
    }

    /// Rejects rules with blank skill names or a skill that is its own prerequisite.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.present.trim().is_empty() || rule.missing.trim().is_empty() {
                return Err(AnalysisError::InvalidRule(format!(
                    "rule {} must name both the present and the missing skill",
                    index
                )));
            }
            if rule.present == rule.missing {
                return Err(AnalysisError::InvalidRule(format!(
                    "rule {} names '{}' as its own prerequisite",
                    index, rule.present
                )));
            }
        }
        Ok(())
    }
}
