//! Round trips against a running Neo4j instance.
//!
//! Run with `--features integration-tests` and NEO4J_URI / NEO4J_USER /
//! NEO4J_PASSWORD pointing at a disposable database. The tests only touch
//! nodes whose keys carry a per-run prefix.
#![cfg(feature = "integration-tests")]

use std::time::{SystemTime, UNIX_EPOCH};

use edumesh_graph::{
    props, BackendMode, GapAnalyzer, GraphStore, Label, LinkOutcome, Resolution, StoreConfig, StoreError,
    REL_HAS_SKILL,
};

fn run_prefix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("it{}", nanos)
}

async fn durable_store() -> GraphStore {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("edumesh_graph=debug")
        .try_init();

    let store = GraphStore::connect(StoreConfig::from_env().unwrap()).await.unwrap();
    assert_eq!(store.mode(), &BackendMode::Durable, "Neo4j must be reachable for integration tests");
    store
}

#[tokio::test]
async fn test_neo4j_upsert_merges() {
    let store = durable_store().await;
    let id = format!("{}-p1", run_prefix());

    store.upsert_person(&id, props! { "role" => "Teacher" }).await.unwrap();
    store.upsert_person(&id, props! { "bio" => "Evening classes" }).await.unwrap();

    let people: Vec<_> = store
        .get_nodes(Label::Person)
        .await
        .unwrap()
        .into_iter()
        .filter(|n| n.key == id)
        .collect();
    assert_eq!(people.len(), 1);
    assert_eq!(people[0].get("role").and_then(|v| v.as_str()), Some("Teacher"));
    assert_eq!(people[0].get("bio").and_then(|v| v.as_str()), Some("Evening classes"));

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_neo4j_relationship_by_either_key() {
    let store = durable_store().await;
    let prefix = run_prefix();
    let id = format!("{}-p1", prefix);
    let name = format!("{}-Amina", prefix);
    let skill = format!("{}-Basic Math", prefix);

    store.upsert_person(&id, props! { "name" => name.as_str() }).await.unwrap();
    store.upsert_skill(&skill).await.unwrap();

    for _ in 0..3 {
        let outcome = store
            .create_relationship(&name, &skill, REL_HAS_SKILL, props! { "level" => 2 })
            .await
            .unwrap();
        assert!(matches!(outcome, LinkOutcome::Linked { .. }));
    }

    let edges: Vec<_> = store
        .get_edges()
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.from.key == id)
        .collect();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].to.key, skill);

    let missing = store
        .create_relationship(&id, &format!("{}-Welding", prefix), REL_HAS_SKILL, props! {})
        .await
        .unwrap();
    assert!(matches!(missing, LinkOutcome::Unresolved { to: Resolution::NotFound, .. }));

    store.close().await.unwrap();
    assert!(matches!(store.get_edges().await, Err(StoreError::Closed)));
}

#[tokio::test]
async fn test_neo4j_snapshot_feeds_analyzer() {
    let store = durable_store().await;
    let nodes = store.get_all_nodes().await.unwrap();

    let analyzer = GapAnalyzer::default();
    assert_eq!(analyzer.analyze(&nodes), analyzer.analyze(&nodes));
    store.close().await.unwrap();
}
