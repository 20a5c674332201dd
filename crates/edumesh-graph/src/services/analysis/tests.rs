use pretty_assertions::assert_eq;
use serde_json::json;

use super::{GapAnalyzer, GapFinding, PrerequisiteRule, RuleTable, SnapshotSummary};
use crate::data::NodeRecord;
use crate::props;

fn skills(names: &[&str]) -> Vec<NodeRecord> {
    names.iter().map(|name| NodeRecord::skill(*name).unwrap()).collect()
}

#[test]
fn test_empty_snapshot_has_no_findings() {
    assert!(GapAnalyzer::default().analyze(&[]).is_empty());
}

#[test]
fn test_solar_gap_appears_and_clears() {
    let analyzer = GapAnalyzer::default();

    let findings = analyzer.analyze(&skills(&["Solar Installation"]));
    assert_eq!(
        findings,
        vec![GapFinding {
            missing_skill: "Solar Maintenance".to_string(),
            reasoning: "Solar installation exists but no maintenance expertise".to_string(),
            suggested_action: "Train an existing installer as maintenance lead".to_string(),
        }]
    );

    let findings = analyzer.analyze(&skills(&["Solar Installation", "Solar Maintenance"]));
    assert!(findings.is_empty());
}

#[test]
fn test_all_matching_rules_reported_in_table_order() {
    let analyzer = GapAnalyzer::default();
    // Snapshot order is the reverse of table order.
    let findings = analyzer.analyze(&skills(&["Basic Math", "Solar Installation"]));

    let missing: Vec<&str> = findings.iter().map(|f| f.missing_skill.as_str()).collect();
    assert_eq!(missing, vec!["Solar Maintenance", "Advanced Math"]);
}

#[test]
fn test_analysis_is_deterministic() {
    let analyzer = GapAnalyzer::default();
    let mut snapshot = skills(&["Basic Math", "Solar Installation", "Welding"]);
    snapshot.push(NodeRecord::person("p1", props! { "name" => "Ali" }).unwrap());

    let first = analyzer.analyze(&snapshot);
    for _ in 0..10 {
        assert_eq!(analyzer.analyze(&snapshot), first);
    }
}

#[test]
fn test_person_named_like_skill_does_not_count() {
    let snapshot = vec![
        NodeRecord::person("p1", props! { "name" => "Solar Installation" }).unwrap(),
        NodeRecord::need("Basic Math").unwrap(),
    ];
    let analyzer = GapAnalyzer::default();

    assert!(analyzer.analyze(&snapshot).is_empty());
    let summary = analyzer.summarize(&snapshot);
    assert!(summary.skills.is_empty());
    assert_eq!(summary.people.len(), 1);
}

#[test]
fn test_custom_rule_table() {
    let rules = RuleTable::empty().with_rule(PrerequisiteRule::new(
        "Welding",
        "Metal Fabrication",
        "Welders but nobody to design parts",
        "Pair welders with the vocational school",
    ));
    let findings = GapAnalyzer::new(rules).analyze(&skills(&["Welding", "Solar Installation"]));

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].missing_skill, "Metal Fabrication");
}

#[test]
fn test_finding_serializes_camel_case() {
    let findings = GapAnalyzer::default().analyze(&skills(&["Basic Math"]));
    let json = serde_json::to_value(&findings).unwrap();
    assert_eq!(
        json,
        json!([{
            "missingSkill": "Advanced Math",
            "reasoning": "Only foundational math skills present",
            "suggestedAction": "Upskill senior students or teachers",
        }])
    );
}

#[test]
fn test_loose_values_accept_several_shapes() {
    let nodes = vec![
        json!({ "label": "Skill", "properties": { "name": "Solar Installation" } }),
        json!({ "labels": ["Skill"], "name": "Basic Math" }),
        json!({ "labels": "Person", "name": "Ali" }),
    ];
    let analyzer = GapAnalyzer::default();

    let summary = analyzer.summarize_values(&nodes);
    assert_eq!(summary.skills.len(), 2);
    assert_eq!(summary.people.len(), 1);
    assert_eq!(analyzer.analyze_values(&nodes).len(), 2);
}

#[test]
fn test_malformed_values_are_treated_as_absent() {
    let nodes = vec![
        json!(null),
        json!(42),
        json!({ "properties": { "name": "Solar Installation" } }),
        json!({ "label": "Skill" }),
        json!({ "label": "Skill", "properties": { "name": 7 } }),
        json!({ "label": ["NotALabel"], "name": "Basic Math" }),
    ];

    let analyzer = GapAnalyzer::default();
    assert_eq!(analyzer.summarize_values(&nodes), SnapshotSummary::default());
    assert!(analyzer.analyze_values(&nodes).is_empty());
}
