// SPDX-License-Identifier: MIT

//! Test scenario document types
//!
//! Serialized with camelCase keys so books saved by older tooling load
//! unchanged.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use crate::concept::ConceptChange;
use crate::concept::ConceptSnapshot;
use crate::config::TargetKind;

/// A named group of test paths against one configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestScenario {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub paths: Vec<TestPath>,
    /// Hierarchical sub-scenarios whose concepts are inherited downwards
    #[serde(rename = "scenarios", default, skip_serializing_if = "Vec::is_empty")]
    pub sub_scenarios: Vec<TestSubScenario>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestScenario {
    pub fn path(&self, path_id: &str) -> Option<&TestPath> {
        self.paths.iter().find(|p| p.id == path_id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// An ordered sequence of steps with the visibility expected after each one
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestPath {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<TestStep>,
    #[serde(default)]
    pub expected_results: Vec<ExpectedResult>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub concept_changes: Vec<ConceptChange>,
    /// Position within the path, assigned on insertion
    pub order: usize,
}

/// Visibility an element should have after a step
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedResult {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub target: String,
    pub expected_visibility: bool,
    #[serde(default)]
    pub description: String,
}

impl ExpectedResult {
    pub fn new(kind: TargetKind, target: impl Into<String>, expected_visibility: bool) -> Self {
        Self {
            kind,
            target: target.into(),
            expected_visibility,
            description: String::new(),
        }
    }

    pub fn visible(kind: TargetKind, target: impl Into<String>) -> Self {
        Self::new(kind, target, true)
    }

    pub fn hidden(kind: TargetKind, target: impl Into<String>) -> Self {
        Self::new(kind, target, false)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Result of running one path
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub scenario_id: String,
    pub path_id: String,
    pub timestamp: DateTime<Utc>,
    pub steps: Vec<TestStepResult>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestStepResult {
    pub step_id: String,
    /// Concept state after the step's changes were applied
    pub concept_states: ConceptSnapshot,
    pub results: Vec<ExpectedResultOutcome>,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedResultOutcome {
    pub expected_result: ExpectedResult,
    pub actual_visibility: bool,
    pub success: bool,
}

/// A node in a tree of scenarios that share concept settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestSubScenario {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub concepts: Vec<ConceptChange>,
    #[serde(default)]
    pub children: Vec<TestSubScenario>,
    #[serde(default)]
    pub expected_results: Vec<ExpectedResult>,
}

impl TestSubScenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            parent_id: None,
            level: 0,
            concepts: Vec::new(),
            children: Vec::new(),
            expected_results: Vec::new(),
        }
    }

    /// Attach a child, fixing up its parent id and level
    pub fn add_child(&mut self, mut child: TestSubScenario) -> &mut TestSubScenario {
        child.parent_id = Some(self.id.clone());
        child.level = self.level + 1;
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expected_result_uses_type_key() {
        let expected = ExpectedResult::visible(TargetKind::Section, "POTASSIUM:Oral")
            .with_description("oral replacement offered");
        let value = serde_json::to_value(&expected).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "section",
                "target": "POTASSIUM:Oral",
                "expectedVisibility": true,
                "description": "oral replacement offered"
            })
        );
    }

    #[test]
    fn test_deserialize_scenario() {
        let scenario: TestScenario = serde_json::from_value(json!({
            "id": "s1",
            "name": "Low potassium",
            "description": "",
            "paths": [{
                "id": "p1",
                "name": "Path 1",
                "description": "",
                "steps": [{
                    "id": "st1",
                    "name": "Set K low",
                    "conceptChanges": [{ "conceptName": "K_LOW", "value": true, "isActive": true }],
                    "order": 0
                }],
                "expectedResults": [{
                    "type": "tab", "target": "POTASSIUM",
                    "expectedVisibility": true, "description": ""
                }],
                "parentId": null
            }],
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-01T10:00:00Z"
        }))
        .unwrap();

        let path = scenario.path("p1").unwrap();
        assert_eq!(path.steps[0].concept_changes[0].concept_name, "K_LOW");
        assert_eq!(path.expected_results[0].kind, TargetKind::Tab);
        assert!(scenario.sub_scenarios.is_empty());
        assert!(scenario.path("p2").is_none());
    }

    #[test]
    fn test_add_child_sets_parent_and_level() {
        let mut root = TestSubScenario::new("Potassium");
        let root_id = root.id.clone();
        let child = root.add_child(TestSubScenario::new("Renal impairment"));
        assert_eq!(child.parent_id.as_deref(), Some(root_id.as_str()));
        assert_eq!(child.level, 1);
    }
}
