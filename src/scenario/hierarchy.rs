// SPDX-License-Identifier: MIT

//! Sub-scenario trees and concept inheritance

use std::collections::{BTreeMap, HashSet};

use super::types::{ConceptChange, TestSubScenario};

/// Concepts in effect for a sub-scenario
///
/// The sub-scenario's own concepts come first. Concepts from each ancestor
/// follow, marked as inherited, unless a nearer scenario already sets them.
pub fn active_concepts(
    sub_scenario: &TestSubScenario,
    roots: &[TestSubScenario],
) -> Vec<ConceptChange> {
    let mut concepts = sub_scenario.concepts.clone();
    let mut visited = HashSet::from([sub_scenario.id.as_str()]);
    let mut parent_id = sub_scenario.parent_id.as_deref();

    while let Some(id) = parent_id {
        if !visited.insert(id) {
            log::warn!("Sub-scenario parent cycle at {}", id);
            break;
        }
        let Some(parent) = find_by_id(id, roots) else {
            break;
        };

        for concept in &parent.concepts {
            if !concepts.iter().any(|c| c.concept_name == concept.concept_name) {
                concepts.push(ConceptChange {
                    inherited: true,
                    ..concept.clone()
                });
            }
        }
        parent_id = parent.parent_id.as_deref();
    }

    concepts
}

/// Depth-first search through a forest of sub-scenarios
pub fn find_by_id<'a>(id: &str, scenarios: &'a [TestSubScenario]) -> Option<&'a TestSubScenario> {
    for scenario in scenarios {
        if scenario.id == id {
            return Some(scenario);
        }
        if let Some(found) = find_by_id(id, &scenario.children) {
            return Some(found);
        }
    }
    None
}

/// Group changes by the part of the concept name before the first `.`
pub fn group_by_category(changes: &[ConceptChange]) -> BTreeMap<String, Vec<ConceptChange>> {
    let mut grouped: BTreeMap<String, Vec<ConceptChange>> = BTreeMap::new();
    for change in changes {
        let category = match change.concept_name.split('.').next() {
            Some(prefix) if !prefix.is_empty() => prefix,
            _ => "Other",
        };
        grouped
            .entry(category.to_string())
            .or_default()
            .push(change.clone());
    }
    grouped
}
