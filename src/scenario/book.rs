// SPDX-License-Identifier: MIT

//! Scenario book - authoring and persistence of test scenarios

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use super::types::{ConceptChange, ExpectedResult, TestPath, TestResult, TestScenario, TestStep};
use crate::concept::ConceptSnapshot;
use crate::error::{Result, ScenarioError};

/// Largest concept list accepted by [`ScenarioBook::generate_paths`]
pub const MAX_GENERATED_CONCEPTS: usize = 12;

/// Number of run results a book keeps; older ones are dropped first
pub const MAX_RECORDED_RESULTS: usize = 200;

/// All scenarios for one configuration, the values new steps start from, and
/// the results of past runs
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioBook {
    #[serde(default)]
    pub scenarios: Vec<TestScenario>,
    #[serde(default)]
    pub default_concept_values: ConceptSnapshot,
    #[serde(default)]
    pub results: Vec<TestResult>,
}

impl ScenarioBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a book from a `.json`, `.yaml` or `.yml` file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let book: ScenarioBook = match extension(path) {
            "json" => serde_json::from_str(&content)?,
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            other => return Err(ScenarioError::UnsupportedFormat(other.to_string()).into()),
        };
        log::info!(
            "Loaded {} scenario(s) from {}",
            book.scenarios.len(),
            path.display()
        );
        Ok(book)
    }

    /// Save the book, picking the format from the file extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match extension(path) {
            "json" => serde_json::to_string_pretty(self)?,
            "yaml" | "yml" => serde_yaml::to_string(self)?,
            other => return Err(ScenarioError::UnsupportedFormat(other.to_string()).into()),
        };
        fs::write(path, content)?;
        log::info!(
            "Saved {} scenario(s) to {}",
            self.scenarios.len(),
            path.display()
        );
        Ok(())
    }

    pub fn create_scenario(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> &TestScenario {
        let now = Utc::now();
        self.scenarios.push(TestScenario {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            paths: Vec::new(),
            sub_scenarios: Vec::new(),
            created_at: now,
            updated_at: now,
        });
        let last = self.scenarios.len() - 1;
        &self.scenarios[last]
    }

    pub fn scenario(&self, scenario_id: &str) -> Result<&TestScenario> {
        self.scenarios
            .iter()
            .find(|s| s.id == scenario_id)
            .ok_or_else(|| ScenarioError::ScenarioNotFound(scenario_id.to_string()).into())
    }

    pub fn scenario_mut(&mut self, scenario_id: &str) -> Result<&mut TestScenario> {
        self.scenarios
            .iter_mut()
            .find(|s| s.id == scenario_id)
            .ok_or_else(|| ScenarioError::ScenarioNotFound(scenario_id.to_string()).into())
    }

    pub fn path(&self, scenario_id: &str, path_id: &str) -> Result<&TestPath> {
        self.scenario(scenario_id)?.path(path_id).ok_or_else(|| {
            ScenarioError::PathNotFound {
                scenario_id: scenario_id.to_string(),
                path_id: path_id.to_string(),
            }
            .into()
        })
    }

    fn path_mut(&mut self, scenario_id: &str, path_id: &str) -> Result<&mut TestPath> {
        let scenario = self.scenario_mut(scenario_id)?;
        scenario.touch();
        scenario
            .paths
            .iter_mut()
            .find(|p| p.id == path_id)
            .ok_or_else(|| {
                ScenarioError::PathNotFound {
                    scenario_id: scenario_id.to_string(),
                    path_id: path_id.to_string(),
                }
                .into()
            })
    }

    /// Add a path, optionally nested under another path of the same scenario
    pub fn add_path(
        &mut self,
        scenario_id: &str,
        name: impl Into<String>,
        description: impl Into<String>,
        parent_id: Option<String>,
    ) -> Result<&TestPath> {
        let scenario = self.scenario_mut(scenario_id)?;
        scenario.paths.push(TestPath {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            steps: Vec::new(),
            expected_results: Vec::new(),
            parent_id,
        });
        scenario.touch();
        let last = scenario.paths.len() - 1;
        Ok(&scenario.paths[last])
    }

    /// Append a step to a path
    ///
    /// With `use_defaults`, every default concept value the changes do not
    /// mention is appended to the step as well.
    pub fn add_step(
        &mut self,
        scenario_id: &str,
        path_id: &str,
        name: impl Into<String>,
        mut concept_changes: Vec<ConceptChange>,
        use_defaults: bool,
    ) -> Result<&TestStep> {
        if use_defaults {
            let defaults: Vec<ConceptChange> = self
                .default_concept_values
                .iter()
                .filter(|(name, _)| !concept_changes.iter().any(|c| &c.concept_name == *name))
                .map(|(name, concept)| {
                    ConceptChange::new(name.clone(), concept.value.clone(), concept.is_active)
                })
                .collect();
            concept_changes.extend(defaults);
        }

        let path = self.path_mut(scenario_id, path_id)?;
        let order = path.steps.len();
        path.steps.push(TestStep {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            concept_changes,
            order,
        });
        Ok(&path.steps[order])
    }

    /// Attach an expected result to a path after checking its target layout
    pub fn add_expected_result(
        &mut self,
        scenario_id: &str,
        path_id: &str,
        expected: ExpectedResult,
    ) -> Result<()> {
        let parts: Vec<&str> = expected.target.split(':').collect();
        if parts.len() != expected.kind.arity() || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(ScenarioError::MalformedTarget {
                kind: expected.kind.as_str(),
                target: expected.target,
            }
            .into());
        }

        self.path_mut(scenario_id, path_id)?
            .expected_results
            .push(expected);
        Ok(())
    }

    /// Add one path per combination of true/false values over `concept_names`
    ///
    /// Path `i` takes its values from the binary digits of `i`, the first
    /// concept being the most significant bit. Every concept is set active.
    pub fn generate_paths(
        &mut self,
        scenario_id: &str,
        concept_names: &[String],
        prefix: &str,
        use_defaults: bool,
    ) -> Result<Vec<TestPath>> {
        let count = concept_names.len();
        if count > MAX_GENERATED_CONCEPTS {
            return Err(ScenarioError::TooManyConcepts {
                count,
                max: MAX_GENERATED_CONCEPTS,
            }
            .into());
        }
        self.scenario(scenario_id)?;

        let combinations = 1usize << count;
        let mut generated = Vec::with_capacity(combinations);

        for i in 0..combinations {
            let changes: Vec<ConceptChange> = concept_names
                .iter()
                .enumerate()
                .map(|(index, name)| {
                    let bit = (i >> (count - 1 - index)) & 1 == 1;
                    ConceptChange::new(name.clone(), bit, true)
                })
                .collect();

            let description = changes
                .iter()
                .map(|c| format!("{}={}", c.concept_name, c.value))
                .collect::<Vec<_>>()
                .join(", ");

            let path_id = self
                .add_path(
                    scenario_id,
                    format!("{} {}", prefix, i + 1),
                    format!("Test with {}", description),
                    None,
                )?
                .id
                .clone();
            self.add_step(
                scenario_id,
                &path_id,
                "Set concept values",
                changes,
                use_defaults,
            )?;
            generated.push(self.path(scenario_id, &path_id)?.clone());
        }

        log::info!(
            "Generated {} path(s) for scenario {}",
            generated.len(),
            scenario_id
        );
        Ok(generated)
    }

    pub fn record_result(&mut self, result: TestResult) {
        self.results.push(result);
        if self.results.len() > MAX_RECORDED_RESULTS {
            let excess = self.results.len() - MAX_RECORDED_RESULTS;
            self.results.drain(..excess);
            log::debug!("Dropped {} old result(s)", excess);
        }
    }

    /// Forget every recorded result, returning how many there were
    pub fn clear_results(&mut self) -> usize {
        let cleared = self.results.len();
        self.results.clear();
        cleared
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Concept;
    use crate::config::TargetKind;
    use crate::error::ConceptRulesError;

    fn book_with_path() -> (ScenarioBook, String, String) {
        let mut book = ScenarioBook::new();
        let scenario_id = book.create_scenario("Potassium", "").id.clone();
        let path_id = book
            .add_path(&scenario_id, "Low K", "", None)
            .unwrap()
            .id
            .clone();
        (book, scenario_id, path_id)
    }

    #[test]
    fn test_add_step_assigns_order() {
        let (mut book, scenario_id, path_id) = book_with_path();
        book.add_step(&scenario_id, &path_id, "first", vec![], false)
            .unwrap();
        let second = book
            .add_step(&scenario_id, &path_id, "second", vec![], false)
            .unwrap();
        assert_eq!(second.order, 1);
    }

    #[test]
    fn test_add_step_fills_defaults() {
        let (mut book, scenario_id, path_id) = book_with_path();
        book.default_concept_values = ConceptSnapshot::new()
            .with("K_LOW", Concept::active(false))
            .with("RENAL", Concept::inactive(true));

        let step = book
            .add_step(
                &scenario_id,
                &path_id,
                "Set K low",
                vec![ConceptChange::new("K_LOW", true, true)],
                true,
            )
            .unwrap();

        assert_eq!(
            step.concept_changes,
            vec![
                ConceptChange::new("K_LOW", true, true),
                ConceptChange::new("RENAL", true, false),
            ]
        );
    }

    #[test]
    fn test_unknown_scenario_and_path() {
        let (mut book, scenario_id, _) = book_with_path();
        assert!(matches!(
            book.add_path("nope", "x", "", None),
            Err(ConceptRulesError::Scenario(ScenarioError::ScenarioNotFound(_)))
        ));
        assert!(matches!(
            book.add_step(&scenario_id, "nope", "x", vec![], false),
            Err(ConceptRulesError::Scenario(ScenarioError::PathNotFound { .. }))
        ));
    }

    #[test]
    fn test_add_expected_result_checks_target() {
        let (mut book, scenario_id, path_id) = book_with_path();
        book.add_expected_result(
            &scenario_id,
            &path_id,
            ExpectedResult::visible(TargetKind::Order, "POTASSIUM:Oral:KCL_PO"),
        )
        .unwrap();

        let result = book.add_expected_result(
            &scenario_id,
            &path_id,
            ExpectedResult::visible(TargetKind::Order, "POTASSIUM:Oral"),
        );
        assert!(matches!(
            result,
            Err(ConceptRulesError::Scenario(ScenarioError::MalformedTarget { kind: "order", .. }))
        ));
        assert_eq!(
            book.path(&scenario_id, &path_id).unwrap().expected_results.len(),
            1
        );
    }

    #[test]
    fn test_generate_paths() {
        let mut book = ScenarioBook::new();
        let scenario_id = book.create_scenario("Generated", "").id.clone();
        let names = vec!["A".to_string(), "B".to_string()];

        let paths = book
            .generate_paths(&scenario_id, &names, "Auto-generated path", false)
            .unwrap();

        assert_eq!(paths.len(), 4);
        assert_eq!(paths[0].name, "Auto-generated path 1");
        assert_eq!(paths[0].description, "Test with A=false, B=false");
        assert_eq!(paths[1].description, "Test with A=false, B=true");
        assert_eq!(paths[2].description, "Test with A=true, B=false");
        assert_eq!(paths[3].name, "Auto-generated path 4");

        let step = &paths[2].steps[0];
        assert_eq!(step.name, "Set concept values");
        assert!(step.concept_changes.iter().all(|c| c.is_active));
        assert_eq!(book.scenario(&scenario_id).unwrap().paths.len(), 4);
    }

    #[test]
    fn test_generate_paths_rejects_large_sets() {
        let mut book = ScenarioBook::new();
        let scenario_id = book.create_scenario("Too many", "").id.clone();
        let names: Vec<String> = (0..=MAX_GENERATED_CONCEPTS)
            .map(|i| format!("C{}", i))
            .collect();
        assert!(matches!(
            book.generate_paths(&scenario_id, &names, "p", false),
            Err(ConceptRulesError::Scenario(ScenarioError::TooManyConcepts { .. }))
        ));
    }

    #[test]
    fn test_record_result_keeps_latest() {
        let (mut book, scenario_id, path_id) = book_with_path();
        for i in 0..MAX_RECORDED_RESULTS + 50 {
            book.record_result(TestResult {
                scenario_id: scenario_id.clone(),
                path_id: path_id.clone(),
                timestamp: Utc::now(),
                steps: Vec::new(),
                success: true,
                failure_reason: Some(format!("run {}", i)),
            });
        }

        assert_eq!(book.results.len(), MAX_RECORDED_RESULTS);
        assert_eq!(book.results[0].failure_reason.as_deref(), Some("run 50"));
        assert_eq!(
            book.results.last().unwrap().failure_reason,
            Some(format!("run {}", MAX_RECORDED_RESULTS + 49))
        );

        assert_eq!(book.clear_results(), MAX_RECORDED_RESULTS);
        assert!(book.results.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let (mut book, scenario_id, path_id) = book_with_path();
        book.add_step(
            &scenario_id,
            &path_id,
            "Set K low",
            vec![ConceptChange::new("K_LOW", true, true)],
            false,
        )
        .unwrap();

        let dir = std::env::temp_dir().join(format!("concept-rules-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();

        for file in ["book.json", "book.yaml"] {
            let path = dir.join(file);
            book.save(&path).unwrap();
            assert_eq!(ScenarioBook::load(&path).unwrap(), book);
        }

        assert!(matches!(
            book.save(dir.join("book.txt")),
            Err(ConceptRulesError::Scenario(ScenarioError::UnsupportedFormat(_)))
        ));

        fs::remove_dir_all(&dir).unwrap();
    }
}
