// SPDX-License-Identifier: MIT

//! Concept values and point-in-time snapshots

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The value carried by a concept
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum ConceptValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl ConceptValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConceptValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl Default for ConceptValue {
    fn default() -> Self {
        ConceptValue::Boolean(false)
    }
}

impl From<bool> for ConceptValue {
    fn from(b: bool) -> Self {
        ConceptValue::Boolean(b)
    }
}

impl From<f64> for ConceptValue {
    fn from(n: f64) -> Self {
        ConceptValue::Number(n)
    }
}

impl From<i64> for ConceptValue {
    fn from(n: i64) -> Self {
        ConceptValue::Number(n as f64)
    }
}

impl From<&str> for ConceptValue {
    fn from(s: &str) -> Self {
        ConceptValue::Text(s.to_string())
    }
}

impl From<String> for ConceptValue {
    fn from(s: String) -> Self {
        ConceptValue::Text(s)
    }
}

impl fmt::Display for ConceptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConceptValue::Boolean(b) => write!(f, "{}", b),
            ConceptValue::Number(n) => write!(f, "{}", n),
            ConceptValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A named clinical fact with a value and an active flag
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    pub value: ConceptValue,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Concept {
    pub fn new(value: impl Into<ConceptValue>, is_active: bool) -> Self {
        Self {
            value: value.into(),
            is_active,
            description: None,
        }
    }

    pub fn active(value: impl Into<ConceptValue>) -> Self {
        Self::new(value, true)
    }

    pub fn inactive(value: impl Into<ConceptValue>) -> Self {
        Self::new(value, false)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Immutable point-in-time copy of concept state, keyed by name
///
/// Names are case-sensitive. Iteration is ordered by name so traces and
/// serialized snapshots are stable.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct ConceptSnapshot {
    concepts: BTreeMap<String, Concept>,
}

impl ConceptSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly useful in tests and fixtures
    pub fn with(mut self, name: impl Into<String>, concept: Concept) -> Self {
        self.concepts.insert(name.into(), concept);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Concept> {
        self.concepts.get(name)
    }

    /// Active state of a concept; unknown concepts are inactive
    pub fn is_active(&self, name: &str) -> bool {
        self.concepts.get(name).is_some_and(|c| c.is_active)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.concepts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Concept)> {
        self.concepts.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.concepts.keys()
    }
}

/// A change to one concept, as recorded by a scenario step
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConceptChange {
    pub concept_name: String,
    pub value: ConceptValue,
    pub is_active: bool,
    /// Set when the change was pulled in from a parent sub-scenario
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inherited: bool,
}

impl ConceptChange {
    pub fn new(
        concept_name: impl Into<String>,
        value: impl Into<ConceptValue>,
        is_active: bool,
    ) -> Self {
        Self {
            concept_name: concept_name.into(),
            value: value.into(),
            is_active,
            inherited: false,
        }
    }
}

impl ConceptSnapshot {
    /// Apply changes in order, keeping any existing description
    pub fn apply_changes(&mut self, changes: &[ConceptChange]) {
        for change in changes {
            let description = self
                .concepts
                .get(&change.concept_name)
                .and_then(|c| c.description.clone());
            self.concepts.insert(
                change.concept_name.clone(),
                Concept {
                    value: change.value.clone(),
                    is_active: change.is_active,
                    description,
                },
            );
        }
    }
}

impl FromIterator<(String, Concept)> for ConceptSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, Concept)>>(iter: I) -> Self {
        Self {
            concepts: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ConceptSnapshot {
    type Item = (&'a String, &'a Concept);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Concept>;

    fn into_iter(self) -> Self::IntoIter {
        self.concepts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_original_layout() {
        let snapshot: ConceptSnapshot = serde_json::from_value(json!({
            "K_LOW": { "value": true, "isActive": true },
            "MG_LEVEL": { "value": 1.6, "isActive": false, "description": "Serum Mg" },
            "ROUTE": { "value": "IV", "isActive": true }
        }))
        .unwrap();

        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.is_active("K_LOW"));
        assert!(!snapshot.is_active("MG_LEVEL"));
        assert_eq!(
            snapshot.get("MG_LEVEL").unwrap().value,
            ConceptValue::Number(1.6)
        );
        assert_eq!(
            snapshot.get("ROUTE").unwrap().value,
            ConceptValue::Text("IV".to_string())
        );
    }

    #[test]
    fn test_unknown_concept_is_inactive() {
        let snapshot = ConceptSnapshot::new();
        assert!(!snapshot.is_active("NOPE"));
        assert!(snapshot.get("NOPE").is_none());
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let snapshot = ConceptSnapshot::new().with("k_low", Concept::active(true));
        assert!(snapshot.is_active("k_low"));
        assert!(!snapshot.is_active("K_LOW"));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(ConceptValue::Boolean(true).to_string(), "true");
        assert_eq!(ConceptValue::Number(1.0).to_string(), "1");
        assert_eq!(ConceptValue::Number(2.5).to_string(), "2.5");
        assert_eq!(ConceptValue::Text("abc".into()).to_string(), "abc");
    }

    #[test]
    fn test_apply_changes_keeps_description() {
        let mut snapshot = ConceptSnapshot::new().with(
            "K_LOW",
            Concept::inactive(false).with_description("Potassium below range"),
        );
        snapshot.apply_changes(&[
            ConceptChange::new("K_LOW", true, true),
            ConceptChange::new("NEW_ONE", 3.0, false),
        ]);

        let k_low = snapshot.get("K_LOW").unwrap();
        assert!(k_low.is_active);
        assert_eq!(k_low.value, ConceptValue::Boolean(true));
        assert_eq!(k_low.description.as_deref(), Some("Potassium below range"));
        assert!(snapshot.contains("NEW_ONE"));
    }

    #[test]
    fn test_serialize_camel_case() {
        let value = serde_json::to_value(Concept::active(false)).unwrap();
        assert_eq!(value, json!({ "value": false, "isActive": true }));
    }
}
