use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::{
    data::{
        errors::LoadError, Label, NodeRecord, Opportunity, Properties, PropertyValue, REL_HAS_NEED,
        REL_HAS_SKILL,
    },
    services::store::GraphStore,
};

/// A community survey dataset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub people: Vec<PersonEntry>,
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
}

/// One surveyed person. Scalar fields other than `skills`/`needs` become node properties.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub needs: Vec<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PersonEntry {
    fn properties(&self) -> Properties {
        let mut properties = Properties::new();
        for (key, value) in &self.fields {
            if value.is_null() {
                continue;
            }
            match PropertyValue::try_from(value) {
                Ok(scalar) => {
                    properties.insert(key.clone(), scalar);
                }
                Err(_) => debug!("Skipping non-scalar field '{}' of person {}", key, self.id),
            }
        }
        properties
    }
}

impl Dataset {
    pub fn from_json_str(source: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&source)
    }

    /// Checks every entry before anything is written, so a bad entry cannot
    /// leave a partially loaded graph behind.
    pub fn validate(&self) -> Result<(), LoadError> {
        for (index, person) in self.people.iter().enumerate() {
            if person.id.trim().is_empty() {
                return Err(LoadError::InvalidEntry(format!("people[{}] has no id", index)));
            }
            for (field, names) in [("skills", &person.skills), ("needs", &person.needs)] {
                if let Some(position) = names.iter().position(|name| name.trim().is_empty()) {
                    return Err(LoadError::InvalidEntry(format!(
                        "people[{}].{}[{}] is blank",
                        index, field, position
                    )));
                }
            }
        }
        for (index, opportunity) in self.opportunities.iter().enumerate() {
            if opportunity.name.trim().is_empty() {
                return Err(LoadError::InvalidEntry(format!("opportunities[{}] has no name", index)));
            }
        }
        Ok(())
    }
}

/// Counts from one load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub people: usize,
    pub skills: usize,
    pub needs: usize,
    pub opportunities: usize,
    pub relationships: usize,
    pub unresolved: usize,
}

/// Upserts every person, skill, need and opportunity in `dataset` and links
/// people to their skills (`HAS_SKILL`) and needs (`HAS_NEED`).
#[instrument(skip(store, dataset), fields(people = dataset.people.len()))]
pub async fn load_dataset(store: &GraphStore, dataset: &Dataset) -> Result<LoadReport, LoadError> {
    dataset.validate()?;

    let mut report = LoadReport::default();
    let mut skills = BTreeSet::new();
    let mut needs = BTreeSet::new();

    for person in &dataset.people {
        store.upsert_person(&person.id, person.properties()).await?;
        report.people += 1;

        for (names, seen, label, rel_type) in [
            (&person.skills, &mut skills, Label::Skill, REL_HAS_SKILL),
            (&person.needs, &mut needs, Label::Need, REL_HAS_NEED),
        ] {
            for name in names {
                if seen.insert(name.clone()) {
                    let node = NodeRecord::new(label, name.as_str(), Properties::new())?;
                    store.upsert_node(&node).await?;
                }
                // Link from the person's id so a shared display name cannot make it ambiguous.
                let outcome = store
                    .create_relationship(&person.id, name, rel_type, Properties::new())
                    .await?;
                if outcome.is_linked() {
                    report.relationships += 1;
                } else {
                    report.unresolved += 1;
                }
            }
        }
    }

    for opportunity in &dataset.opportunities {
        store.upsert_record(opportunity.clone()).await?;
        report.opportunities += 1;
    }

    report.skills = skills.len();
    report.needs = needs.len();
    info!(
        people = report.people,
        skills = report.skills,
        needs = report.needs,
        opportunities = report.opportunities,
        relationships = report.relationships,
        "Dataset loaded"
    );
    Ok(report)
}

pub async fn load_dataset_str(store: &GraphStore, source: &str) -> Result<LoadReport, LoadError> {
    load_dataset(store, &Dataset::from_json_str(source)?).await
}

pub async fn load_dataset_path(store: &GraphStore, path: impl AsRef<Path>) -> Result<LoadReport, LoadError> {
    let dataset = Dataset::from_path(path)?;
    load_dataset(store, &dataset).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NodeRef;
    use pretty_assertions::assert_eq;

    const DATASET: &str = r#"{
        "people": [
            {
                "id": "p1",
                "name": "Amina",
                "role": "Teacher",
                "age": 34,
                "skills": ["Basic Math", "First Aid"],
                "needs": ["Internet Access"],
                "interests": ["chess"]
            },
            {
                "id": "p2",
                "name": "Tomas",
                "skills": ["Solar Installation", "First Aid"],
                "bio": null
            }
        ],
        "opportunities": [
            { "name": "Clinic Assistant", "description": "Weekend shifts", "required_skill": "First Aid" }
        ]
    }"#;

    #[tokio::test]
    async fn test_load_dataset_builds_graph() {
        let store = GraphStore::in_memory();
        let report = load_dataset_str(&store, DATASET).await.unwrap();

        assert_eq!(
            report,
            LoadReport {
                people: 2,
                skills: 3,
                needs: 1,
                opportunities: 1,
                relationships: 5,
                unresolved: 0,
            }
        );

        let nodes = store.get_all_nodes().await.unwrap();
        assert_eq!(nodes.len(), 2 + 3 + 1 + 1);

        let amina = nodes
            .iter()
            .find(|n| n.node_ref() == NodeRef::new(Label::Person, "p1"))
            .unwrap();
        assert_eq!(amina.get("age").and_then(|v| v.as_i64()), Some(34));
        assert!(amina.get("interests").is_none());
        assert!(amina.get("skills").is_none());

        let tomas = nodes
            .iter()
            .find(|n| n.node_ref() == NodeRef::new(Label::Person, "p2"))
            .unwrap();
        assert!(tomas.get("bio").is_none());
    }

    #[tokio::test]
    async fn test_reload_is_idempotent() {
        let store = GraphStore::in_memory();
        load_dataset_str(&store, DATASET).await.unwrap();
        load_dataset_str(&store, DATASET).await.unwrap();

        assert_eq!(store.get_all_nodes().await.unwrap().len(), 7);
        assert_eq!(store.get_edges().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_person_without_id_is_rejected() {
        let store = GraphStore::in_memory();
        let err = load_dataset_str(&store, r#"{"people":[{"name":"Nobody"}]}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidEntry(_)));
    }

    #[tokio::test]
    async fn test_invalid_later_entry_writes_nothing() {
        let store = GraphStore::in_memory();
        let source = r#"{
            "people": [
                { "id": "p1", "name": "Amina", "skills": ["Basic Math"] },
                { "name": "Nobody", "skills": ["Wiring"] }
            ]
        }"#;
        let err = load_dataset_str(&store, source).await.unwrap_err();

        assert!(matches!(err, LoadError::InvalidEntry(ref msg) if msg == "people[1] has no id"));
        assert!(store.get_all_nodes().await.unwrap().is_empty());
        assert!(store.get_edges().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_opportunity_rejected_before_people_load() {
        let store = GraphStore::in_memory();
        let source = r#"{
            "people": [{ "id": "p1", "skills": ["First Aid"] }],
            "opportunities": [{ "name": "  " }]
        }"#;
        let err = load_dataset_str(&store, source).await.unwrap_err();

        assert!(matches!(err, LoadError::InvalidEntry(ref msg) if msg == "opportunities[0] has no name"));
        assert!(store.get_all_nodes().await.unwrap().is_empty());
    }

    #[test]
    fn test_validate_flags_blank_skill() {
        let dataset = Dataset::from_json_str(
            r#"{"people":[{"id":"p1","skills":["Wiring",""]}]}"#,
        )
        .unwrap();
        let err = dataset.validate().unwrap_err();
        assert!(matches!(err, LoadError::InvalidEntry(ref msg) if msg == "people[0].skills[1] is blank"));
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let store = GraphStore::in_memory();
        let err = load_dataset_str(&store, "{ people: ").await.unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
    }
}
