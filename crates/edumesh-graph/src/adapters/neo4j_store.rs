use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query, Row};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::StoreConfig,
    data::{
        EdgeRecord, Label, LinkOutcome, NodeRecord, NodeRef, Properties, PropertyValue,
        RelationshipRequest, Resolution, StoreError,
    },
    traits::GraphBackend,
};

/// Matches nodes carrying one of the community labels.
const LABEL_FILTER: &str = "(n:Person OR n:Skill OR n:Need OR n:Opportunity)";

/// Neo4j implementation of the `GraphBackend` trait
pub struct Neo4jGraph {
    graph: RwLock<Option<Arc<Graph>>>,
    uri: String,
}

impl Neo4jGraph {
    /// Connects and verifies connectivity with a single `RETURN 1` round trip.
    ///
    /// One attempt only, bounded by `config.connect_timeout`.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut config_builder = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.username)
            .password(&config.password)
            .max_connections(config.pool_size);

        if let Some(db) = &config.database {
            config_builder = config_builder.db(db.as_str());
        }

        let neo4j_config = config_builder
            .build()
            .map_err(|e| StoreError::Connection(format!("Failed to build Neo4j config: {}", e)))?;

        let probe = async {
            let graph = Graph::connect(neo4j_config)
                .await
                .map_err(|e| StoreError::Connection(format!("Failed to connect to {}: {}", config.uri, e)))?;
            graph
                .run(Query::new("RETURN 1".to_string()))
                .await
                .map_err(|e| StoreError::Connection(format!("Connectivity check against {} failed: {}", config.uri, e)))?;
            ensure_constraints(&graph).await;
            Ok::<_, StoreError>(graph)
        };

        let graph = tokio::time::timeout(config.connect_timeout, probe)
            .await
            .map_err(|_| {
                StoreError::Connection(format!(
                    "Connectivity check against {} timed out after {:?}",
                    config.uri, config.connect_timeout
                ))
            })??;

        info!("Connected to Neo4j at {}", config.uri);
        Ok(Self {
            graph: RwLock::new(Some(Arc::new(graph))),
            uri: config.uri.clone(),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    fn graph(&self) -> Result<Arc<Graph>, StoreError> {
        self.graph.read().clone().ok_or(StoreError::Closed)
    }

    async fn fetch_rows(&self, query: Query) -> Result<Vec<Row>, StoreError> {
        let graph = self.graph()?;
        let mut result = graph
            .execute(query)
            .await
            .map_err(|e| StoreError::Query(format!("Failed to execute query: {}", e)))?;

        let mut rows = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to read result row: {}", e)))?
        {
            rows.push(row);
        }
        Ok(rows)
    }
}

/// Quotes a label, relationship type or property key for interpolation into Cypher.
pub(crate) fn escape_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// A Cypher statement plus the property values bound to `$p0..$pN`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Statement {
    pub text: String,
    pub key_params: Vec<(&'static str, String)>,
    pub values: Vec<PropertyValue>,
}

impl Statement {
    fn into_query(self) -> Query {
        let mut query = Query::new(self.text);
        for (name, value) in &self.key_params {
            query = query.param(name, value.as_str());
        }
        for (i, value) in self.values.iter().enumerate() {
            let name = format!("p{}", i);
            query = match value {
                PropertyValue::Bool(b) => query.param(&name, *b),
                PropertyValue::Integer(n) => query.param(&name, *n),
                PropertyValue::Float(f) => query.param(&name, *f),
                PropertyValue::String(s) => query.param(&name, s.as_str()),
            };
        }
        query
    }
}

/// Builds `SET alias.k = $pN, ...` for every property except `skip`.
fn set_clause(alias: &str, properties: &Properties, skip: Option<&str>, values: &mut Vec<PropertyValue>) -> String {
    let assignments: Vec<String> = properties
        .iter()
        .filter(|(key, _)| Some(key.as_str()) != skip)
        .map(|(key, value)| {
            values.push(value.clone());
            format!("{}.{} = $p{}", alias, escape_identifier(key), values.len() - 1)
        })
        .collect();

    if assignments.is_empty() {
        String::new()
    } else {
        format!(" SET {}", assignments.join(", "))
    }
}

/// `MERGE` by natural key, then overwrite the supplied properties.
pub(crate) fn node_merge_statement(node: &NodeRecord) -> Statement {
    let key_field = node.label.key_field();
    let mut values = Vec::new();
    let set = set_clause("n", &node.properties, Some(key_field), &mut values);
    let text = format!(
        "MERGE (n:{} {{{}: $key}}){}",
        escape_identifier(node.label.as_str()),
        escape_identifier(key_field),
        set
    );
    Statement {
        text,
        key_params: vec![("key", node.key.clone())],
        values,
    }
}

/// Natural key of the node bound to `node`: `id` for people, `name` otherwise.
fn key_expression(node: &str) -> String {
    format!(
        "CASE WHEN '{person}' IN labels({node}) THEN {node}.{id} ELSE {node}.{name} END",
        person = Label::Person.as_str(),
        node = node,
        id = escape_identifier(Label::Person.key_field()),
        name = escape_identifier(Label::Skill.key_field()),
    )
}

/// One unique constraint per label on its natural key.
pub(crate) fn constraint_statements() -> Vec<String> {
    Label::ALL
        .iter()
        .map(|label| {
            format!(
                "CREATE CONSTRAINT edumesh_{name}_{field} IF NOT EXISTS \
                 FOR (n:{label}) REQUIRE n.{key} IS UNIQUE",
                name = label.as_str().to_lowercase(),
                field = label.key_field(),
                label = escape_identifier(label.as_str()),
                key = escape_identifier(label.key_field()),
            )
        })
        .collect()
}

/// Creates the natural-key constraints. Failures are logged and skipped so a
/// user without schema privileges can still use the database.
async fn ensure_constraints(graph: &Graph) {
    for text in constraint_statements() {
        if let Err(e) = graph.run(Query::new(text.clone())).await {
            warn!("Could not ensure constraint `{}`: {}", text, e);
        }
    }
}

pub(crate) fn resolve_query_text() -> String {
    format!(
        "MATCH (n) WHERE {filter} AND (n.id = $key OR n.name = $key) \
         RETURN labels(n) AS labels, {key} AS key",
        filter = LABEL_FILTER,
        key = key_expression("n"),
    )
}

pub(crate) fn edges_query_text() -> String {
    format!(
        "MATCH (a)-[r]->(b) \
         RETURN labels(a) AS from_labels, coalesce({from_key}, '') AS from_key, \
                labels(b) AS to_labels, coalesce({to_key}, '') AS to_key, \
                type(r) AS rel_type, properties(r) AS props",
        from_key = key_expression("a"),
        to_key = key_expression("b"),
    )
}

/// Resolves both endpoints and merges the edge only when each matched exactly one node.
pub(crate) fn link_statement(request: &RelationshipRequest) -> Statement {
    let mut values = Vec::new();
    let set = set_clause("r", &request.properties, None, &mut values);
    let text = format!(
        "OPTIONAL MATCH (n) WHERE {filter} AND (n.id = $from_key OR n.name = $from_key) \
         WITH collect(n) AS froms \
         OPTIONAL MATCH (n) WHERE {filter} AND (n.id = $to_key OR n.name = $to_key) \
         WITH froms, collect(n) AS tos \
         CALL {{ \
           WITH froms, tos \
           WITH froms, tos WHERE size(froms) = 1 AND size(tos) = 1 \
           WITH froms[0] AS a, tos[0] AS b \
           MERGE (a)-[r:{rel}]->(b){set} \
           RETURN count(r) AS linked \
         }} \
         RETURN size(froms) AS from_count, size(tos) AS to_count, \
           CASE WHEN size(froms) = 1 THEN labels(froms[0]) ELSE [] END AS from_labels, \
           CASE WHEN size(froms) = 1 THEN coalesce({from_key}, '') ELSE '' END AS from_key, \
           CASE WHEN size(tos) = 1 THEN labels(tos[0]) ELSE [] END AS to_labels, \
           CASE WHEN size(tos) = 1 THEN coalesce({to_key}, '') ELSE '' END AS to_key, \
           linked",
        filter = LABEL_FILTER,
        rel = escape_identifier(&request.rel_type),
        set = set,
        from_key = key_expression("froms[0]"),
        to_key = key_expression("tos[0]"),
    );
    Statement {
        text,
        key_params: vec![
            ("from_key", request.from_key.clone()),
            ("to_key", request.to_key.clone()),
        ],
        values,
    }
}

/// First community label in a node's label list.
fn community_label(labels: &[String]) -> Option<Label> {
    labels.iter().find_map(|label| label.parse::<Label>().ok())
}

/// Keeps the scalar members of a property map returned by the server.
fn scalar_properties(value: serde_json::Value) -> Properties {
    let mut properties = Properties::new();
    if let serde_json::Value::Object(object) = value {
        for (key, value) in object {
            match PropertyValue::try_from(&value) {
                Ok(scalar) => {
                    properties.insert(key, scalar);
                }
                Err(_) => debug!("Skipping non-scalar property '{}'", key),
            }
        }
    }
    properties
}

fn get<T: serde::de::DeserializeOwned>(row: &Row, column: &str) -> Result<T, StoreError> {
    row.get::<T>(column)
        .map_err(|e| StoreError::Mapping(format!("Column '{}': {}", column, e)))
}

fn endpoint_resolution(row: &Row, side: &str) -> Result<Resolution, StoreError> {
    let count: i64 = get(row, &format!("{}_count", side))?;
    match count {
        0 => Ok(Resolution::NotFound),
        1 => {
            let labels: Vec<String> = get(row, &format!("{}_labels", side))?;
            let key: String = get(row, &format!("{}_key", side))?;
            let label = community_label(&labels)
                .ok_or_else(|| StoreError::Mapping(format!("Unrecognised labels {:?}", labels)))?;
            Ok(Resolution::Found(NodeRef::new(label, key)))
        }
        n => Ok(Resolution::Ambiguous(n as usize)),
    }
}

#[async_trait]
impl GraphBackend for Neo4jGraph {
    fn name(&self) -> &'static str {
        "neo4j"
    }

    #[instrument(skip(self, node), fields(label = %node.label, key = %node.key))]
    async fn upsert_node(&self, node: &NodeRecord) -> Result<(), StoreError> {
        let statement = node_merge_statement(node);
        debug!("Executing node merge: {}", statement.text);
        self.graph()?
            .run(statement.into_query())
            .await
            .map_err(|e| StoreError::Query(format!("Failed to merge {}: {}", node.node_ref(), e)))
    }

    #[instrument(skip(self))]
    async fn resolve(&self, key: &str) -> Result<Resolution, StoreError> {
        let query = Query::new(resolve_query_text()).param("key", key);

        let mut matches = Vec::new();
        for row in self.fetch_rows(query).await? {
            let labels: Vec<String> = get(&row, "labels")?;
            let key: String = get(&row, "key")?;
            if let Some(label) = community_label(&labels) {
                matches.push(NodeRef::new(label, key));
            }
        }
        Ok(Resolution::from_matches(matches))
    }

    #[instrument(skip(self, request), fields(from = %request.from_key, to = %request.to_key, rel_type = %request.rel_type))]
    async fn link(&self, request: &RelationshipRequest) -> Result<LinkOutcome, StoreError> {
        let statement = link_statement(request);
        debug!("Executing relationship merge: {}", statement.text);

        let rows = self.fetch_rows(statement.into_query()).await?;
        let row = rows
            .first()
            .ok_or_else(|| StoreError::Mapping("Relationship merge returned no rows".to_string()))?;

        let from = endpoint_resolution(row, "from")?;
        let to = endpoint_resolution(row, "to")?;
        match (from, to) {
            (Resolution::Found(from), Resolution::Found(to)) => {
                let linked: i64 = get(row, "linked")?;
                if linked != 1 {
                    warn!("Expected one merged relationship, server reported {}", linked);
                }
                Ok(LinkOutcome::Linked { from, to })
            }
            (from, to) => Ok(LinkOutcome::Unresolved { from, to }),
        }
    }

    #[instrument(skip(self))]
    async fn nodes(&self) -> Result<Vec<NodeRecord>, StoreError> {
        let query = Query::new("MATCH (n) RETURN labels(n) AS labels, properties(n) AS props".to_string());

        let mut nodes = Vec::new();
        for row in self.fetch_rows(query).await? {
            let labels: Vec<String> = get(&row, "labels")?;
            let Some(label) = community_label(&labels) else {
                debug!("Skipping node with labels {:?}", labels);
                continue;
            };
            let properties = scalar_properties(get(&row, "props")?);
            let Some(key) = properties
                .get(label.key_field())
                .and_then(|v| v.as_str())
                .map(str::to_string)
            else {
                warn!("Skipping {} node without '{}'", label, label.key_field());
                continue;
            };
            nodes.push(NodeRecord { label, key, properties });
        }
        Ok(nodes)
    }

    #[instrument(skip(self))]
    async fn edges(&self) -> Result<Vec<EdgeRecord>, StoreError> {
        let query = Query::new(edges_query_text());

        let mut edges = Vec::new();
        for row in self.fetch_rows(query).await? {
            let from_labels: Vec<String> = get(&row, "from_labels")?;
            let to_labels: Vec<String> = get(&row, "to_labels")?;
            let from_key: String = get(&row, "from_key")?;
            let to_key: String = get(&row, "to_key")?;
            let (Some(from_label), Some(to_label)) = (community_label(&from_labels), community_label(&to_labels))
            else {
                continue;
            };
            if from_key.is_empty() || to_key.is_empty() {
                continue;
            }
            edges.push(EdgeRecord {
                from: NodeRef::new(from_label, from_key),
                to: NodeRef::new(to_label, to_key),
                rel_type: get(&row, "rel_type")?,
                properties: scalar_properties(get(&row, "props")?),
            });
        }
        Ok(edges)
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.graph.write().take().is_some() {
            info!("Closed Neo4j connection pool for {}", self.uri);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("HAS_SKILL"), "`HAS_SKILL`");
        assert_eq!(escape_identifier("bad`) DETACH DELETE n //"), "`bad``) DETACH DELETE n //`");
    }

    #[test]
    fn test_person_merge_statement() {
        let node = NodeRecord::person("p1", props! { "name" => "Ali", "role" => "Teacher" }).unwrap();
        let statement = node_merge_statement(&node);

        assert_eq!(
            statement.text,
            "MERGE (n:`Person` {`id`: $key}) SET n.`name` = $p0, n.`role` = $p1"
        );
        assert_eq!(statement.key_params, vec![("key", "p1".to_string())]);
        assert_eq!(
            statement.values,
            vec![PropertyValue::from("Ali"), PropertyValue::from("Teacher")]
        );
    }

    #[test]
    fn test_skill_merge_statement_has_no_set() {
        let statement = node_merge_statement(&NodeRecord::skill("Basic Math").unwrap());
        assert_eq!(statement.text, "MERGE (n:`Skill` {`name`: $key})");
        assert!(statement.values.is_empty());
    }

    #[test]
    fn test_link_statement_binds_endpoints_and_properties() {
        let request = RelationshipRequest::new("p1", "Basic Math", "HAS_SKILL")
            .with_properties(props! { "level" => 3 });
        let statement = link_statement(&request);

        assert!(statement.text.contains("MERGE (a)-[r:`HAS_SKILL`]->(b) SET r.`level` = $p0"));
        assert!(statement.text.contains("size(froms) = 1 AND size(tos) = 1"));
        assert_eq!(
            statement.key_params,
            vec![("from_key", "p1".to_string()), ("to_key", "Basic Math".to_string())]
        );
        assert_eq!(statement.values, vec![PropertyValue::Integer(3)]);
        assert!(statement.text.contains(
            "coalesce(CASE WHEN 'Person' IN labels(froms[0]) THEN froms[0].`id` ELSE froms[0].`name` END, '')"
        ));
        assert!(statement.text.contains(
            "coalesce(CASE WHEN 'Person' IN labels(tos[0]) THEN tos[0].`id` ELSE tos[0].`name` END, '')"
        ));
        assert!(!statement.text.contains("coalesce(froms[0].id"));
    }

    #[test]
    fn test_resolve_query_keys_by_label() {
        let text = resolve_query_text();
        assert!(text.contains("(n.id = $key OR n.name = $key)"));
        assert!(text.ends_with(
            "RETURN labels(n) AS labels, CASE WHEN 'Person' IN labels(n) THEN n.`id` ELSE n.`name` END AS key"
        ));
        assert!(!text.contains("coalesce(n.id, n.name)"));
    }

    #[test]
    fn test_edges_query_keys_by_label() {
        let text = edges_query_text();
        assert!(text.contains(
            "coalesce(CASE WHEN 'Person' IN labels(a) THEN a.`id` ELSE a.`name` END, '') AS from_key"
        ));
        assert!(text.contains(
            "coalesce(CASE WHEN 'Person' IN labels(b) THEN b.`id` ELSE b.`name` END, '') AS to_key"
        ));
        assert!(!text.contains("coalesce(a.id"));
    }

    #[test]
    fn test_constraint_statements_cover_every_label() {
        assert_eq!(
            constraint_statements(),
            vec![
                "CREATE CONSTRAINT edumesh_person_id IF NOT EXISTS FOR (n:`Person`) REQUIRE n.`id` IS UNIQUE",
                "CREATE CONSTRAINT edumesh_skill_name IF NOT EXISTS FOR (n:`Skill`) REQUIRE n.`name` IS UNIQUE",
                "CREATE CONSTRAINT edumesh_need_name IF NOT EXISTS FOR (n:`Need`) REQUIRE n.`name` IS UNIQUE",
                "CREATE CONSTRAINT edumesh_opportunity_name IF NOT EXISTS FOR (n:`Opportunity`) REQUIRE n.`name` IS UNIQUE",
            ]
        );
    }

    #[test]
    fn test_community_label_picks_known_label() {
        let labels = vec!["Imported".to_string(), "Skill".to_string()];
        assert_eq!(community_label(&labels), Some(Label::Skill));
        assert_eq!(community_label(&["Tenant".to_string()]), None);
    }

    #[test]
    fn test_scalar_properties_skips_lists() {
        let props = scalar_properties(serde_json::json!({
            "name": "Ali",
            "interests": ["math", "solar"],
        }));
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("name").and_then(|v| v.as_str()), Some("Ali"));
    }
}
