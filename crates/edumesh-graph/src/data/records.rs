//! Graph record model: labels, typed node records and relationships

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::data::errors::StoreError;
use crate::data::types::{Properties, PropertyValue};

/// Person has a skill (Person -> Skill).
pub const REL_HAS_SKILL: &str = "HAS_SKILL";
/// Person has a need (Person -> Need).
pub const REL_HAS_NEED: &str = "HAS_NEED";
/// Person mentors another person (Person -> Person).
pub const REL_MENTORS: &str = "MENTORS";
/// Person can fill an opportunity (Person -> Opportunity).
pub const REL_CAN_FILL: &str = "CAN_FILL";

/// Node label. Every node carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Label {
    Person,
    Skill,
    Need,
    Opportunity,
}

impl Label {
    pub const ALL: [Label; 4] = [Label::Person, Label::Skill, Label::Need, Label::Opportunity];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Person => "Person",
            Label::Skill => "Skill",
            Label::Need => "Need",
            Label::Opportunity => "Opportunity",
        }
    }

    /// Property that holds the natural key for this label.
    pub fn key_field(&self) -> &'static str {
        match self {
            Label::Person => "id",
            Label::Skill | Label::Need | Label::Opportunity => "name",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Person" => Ok(Label::Person),
            "Skill" => Ok(Label::Skill),
            "Need" => Ok(Label::Need),
            "Opportunity" => Ok(Label::Opportunity),
            other => Err(StoreError::InvalidInput(format!("Unknown node label: {}", other))),
        }
    }
}

/// Identity of a node: its label plus natural key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub label: Label,
    pub key: String,
}

impl NodeRef {
    pub fn new(label: Label, key: impl Into<String>) -> Self {
        Self { label, key: key.into() }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label, self.key)
    }
}

/// A node as stored and returned by the graph store.
///
/// Constructors validate the label-specific required fields and always
/// write the natural key into `properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub label: Label,
    pub key: String,
    pub properties: Properties,
}

impl NodeRecord {
    /// Builds a record for `label` keyed by `key`, merging `properties` on top.
    ///
    /// A conflicting natural-key property in `properties` is rejected.
    pub fn new(label: Label, key: impl Into<String>, mut properties: Properties) -> Result<Self, StoreError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(StoreError::InvalidInput(format!(
                "{} requires a non-empty '{}'",
                label,
                label.key_field()
            )));
        }

        let field = label.key_field();
        match properties.get(field) {
            Some(PropertyValue::String(existing)) if *existing == key => {}
            Some(other) => {
                return Err(StoreError::InvalidInput(format!(
                    "{} key '{}' conflicts with property {} = {}",
                    label, key, field, other
                )));
            }
            None => {
                properties.insert(field.to_string(), PropertyValue::String(key.clone()));
            }
        }

        Ok(Self { label, key, properties })
    }

    pub fn person(id: impl Into<String>, properties: Properties) -> Result<Self, StoreError> {
        Self::new(Label::Person, id, properties)
    }

    pub fn skill(name: impl Into<String>) -> Result<Self, StoreError> {
        Self::new(Label::Skill, name, Properties::new())
    }

    pub fn need(name: impl Into<String>) -> Result<Self, StoreError> {
        Self::new(Label::Need, name, Properties::new())
    }

    pub fn opportunity(name: impl Into<String>, properties: Properties) -> Result<Self, StoreError> {
        Self::new(Label::Opportunity, name, properties)
    }

    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(self.label, self.key.clone())
    }

    pub fn get(&self, property: &str) -> Option<&PropertyValue> {
        self.properties.get(property)
    }

    /// Display name: the `name` property when present.
    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(|v| v.as_str())
    }

    /// True when `key` equals this node's `id` or `name` property.
    pub fn matches_key(&self, key: &str) -> bool {
        ["id", "name"]
            .iter()
            .any(|field| self.properties.get(*field).and_then(|v| v.as_str()) == Some(key))
    }

    /// Merges `incoming` into this node: new keys added, existing keys overwritten.
    pub fn merge(&mut self, incoming: &Properties) {
        for (key, value) in incoming {
            self.properties.insert(key.clone(), value.clone());
        }
    }
}

/// A directed, typed relationship between two resolved nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: NodeRef,
    pub to: NodeRef,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub properties: Properties,
}

/// Request to create or merge a relationship between two endpoint keys.
///
/// Endpoint keys are matched against the `id` or `name` of existing nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipRequest {
    pub from_key: String,
    pub to_key: String,
    pub rel_type: String,
    pub properties: Properties,
}

impl RelationshipRequest {
    pub fn new(from_key: impl Into<String>, to_key: impl Into<String>, rel_type: impl Into<String>) -> Self {
        Self {
            from_key: from_key.into(),
            to_key: to_key.into(),
            rel_type: rel_type.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        if self.rel_type.trim().is_empty() {
            return Err(StoreError::InvalidInput("Relationship type must not be empty".to_string()));
        }
        if self.from_key.is_empty() || self.to_key.is_empty() {
            return Err(StoreError::InvalidInput("Relationship endpoints must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Result of resolving one endpoint key against the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Found(NodeRef),
    NotFound,
    /// More than one node matched; carries the match count.
    Ambiguous(usize),
}

impl Resolution {
    /// Builds a resolution from the list of matching nodes.
    pub fn from_matches(mut matches: Vec<NodeRef>) -> Self {
        match matches.len() {
            0 => Resolution::NotFound,
            1 => Resolution::Found(matches.remove(0)),
            n => Resolution::Ambiguous(n),
        }
    }

    pub fn found(&self) -> Option<&NodeRef> {
        match self {
            Resolution::Found(node) => Some(node),
            _ => None,
        }
    }
}

/// Outcome of `create_relationship`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkOutcome {
    Linked { from: NodeRef, to: NodeRef },
    /// No edge was written because at least one endpoint did not resolve to exactly one node.
    Unresolved { from: Resolution, to: Resolution },
}

impl LinkOutcome {
    pub fn is_linked(&self) -> bool {
        matches!(self, LinkOutcome::Linked { .. })
    }
}

/// Urgency of a community need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::High => "HIGH",
            Urgency::Medium => "MEDIUM",
            Urgency::Low => "LOW",
        }
    }
}

impl FromStr for Urgency {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HIGH" => Ok(Urgency::High),
            "MEDIUM" => Ok(Urgency::Medium),
            "LOW" => Ok(Urgency::Low),
            other => Err(StoreError::InvalidInput(format!("Unknown urgency: {}", other))),
        }
    }
}

/// A community member.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub bio: Option<String>,
    /// Additional scalar survey answers.
    #[serde(default, flatten)]
    pub extra: Properties,
}

impl Person {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Default::default() }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }
}

/// Category given to skills that do not name one.
pub const DEFAULT_SKILL_CATEGORY: &str = "General";

fn default_skill_category() -> String {
    DEFAULT_SKILL_CATEGORY.to_string()
}

/// A skill held by community members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(default = "default_skill_category")]
    pub category: String,
}

impl Skill {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), category: default_skill_category() }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// A need expressed by community members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Need {
    pub name: String,
    pub urgency: Option<Urgency>,
}

impl Need {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), urgency: None }
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }
}

/// An opening that a person with the required skill can fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub name: String,
    pub description: Option<String>,
    pub required_skill: Option<String>,
}

impl Opportunity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), description: None, required_skill: None }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn requiring(mut self, skill: impl Into<String>) -> Self {
        self.required_skill = Some(skill.into());
        self
    }
}

fn insert_opt(properties: &mut Properties, key: &str, value: Option<String>) {
    if let Some(value) = value {
        properties.insert(key.to_string(), PropertyValue::String(value));
    }
}

impl TryFrom<Person> for NodeRecord {
    type Error = StoreError;

    fn try_from(person: Person) -> Result<Self, Self::Error> {
        let mut properties = person.extra;
        insert_opt(&mut properties, "name", person.name);
        insert_opt(&mut properties, "role", person.role);
        insert_opt(&mut properties, "bio", person.bio);
        NodeRecord::person(person.id, properties)
    }
}

impl TryFrom<Skill> for NodeRecord {
    type Error = StoreError;

    fn try_from(skill: Skill) -> Result<Self, Self::Error> {
        let mut properties = Properties::new();
        properties.insert("category".to_string(), PropertyValue::String(skill.category));
        NodeRecord::new(Label::Skill, skill.name, properties)
    }
}

impl TryFrom<Need> for NodeRecord {
    type Error = StoreError;

    fn try_from(need: Need) -> Result<Self, Self::Error> {
        let mut properties = Properties::new();
        insert_opt(&mut properties, "urgency", need.urgency.map(|u| u.as_str().to_string()));
        NodeRecord::new(Label::Need, need.name, properties)
    }
}

impl TryFrom<Opportunity> for NodeRecord {
    type Error = StoreError;

    fn try_from(opportunity: Opportunity) -> Result<Self, Self::Error> {
        let mut properties = Properties::new();
        insert_opt(&mut properties, "description", opportunity.description);
        insert_opt(&mut properties, "required_skill", opportunity.required_skill);
        NodeRecord::new(Label::Opportunity, opportunity.name, properties)
    }
}
