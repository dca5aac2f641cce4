// SPDX-License-Identifier: MIT

//! Scenario runner - replays test paths against a configuration
//!
//! Each run works on its own copy of the baseline snapshot. The live concept
//! store is never touched, so runs can happen while the store is in use.

use chrono::Utc;

use super::book::ScenarioBook;
use super::hierarchy::active_concepts;
use super::types::{
    ExpectedResult, ExpectedResultOutcome, TestResult, TestStepResult, TestSubScenario,
};
use crate::concept::ConceptSnapshot;
use crate::config::{is_visible, RuleConfig};
use crate::error::Result;

/// Runs test paths and sub-scenarios against one configuration
pub struct ScenarioRunner<'a> {
    config: &'a RuleConfig,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(config: &'a RuleConfig) -> Self {
        Self { config }
    }

    /// Run every step of a path and compare visibility after each one
    pub fn execute_path(
        &self,
        book: &ScenarioBook,
        scenario_id: &str,
        path_id: &str,
        baseline: &ConceptSnapshot,
    ) -> Result<TestResult> {
        self.execute_path_with(book, scenario_id, path_id, baseline, |_| {})
    }

    /// Like [`execute_path`](Self::execute_path), calling `on_step` as soon as
    /// each step has been evaluated
    pub fn execute_path_with<F>(
        &self,
        book: &ScenarioBook,
        scenario_id: &str,
        path_id: &str,
        baseline: &ConceptSnapshot,
        mut on_step: F,
    ) -> Result<TestResult>
    where
        F: FnMut(&TestStepResult),
    {
        let path = book.path(scenario_id, path_id)?;
        log::info!(
            "Running path '{}' ({} step(s), {} expected result(s))",
            path.name,
            path.steps.len(),
            path.expected_results.len()
        );

        let mut concepts = baseline.clone();
        let mut steps = Vec::with_capacity(path.steps.len());
        let mut failure_reason = None;

        let mut ordered: Vec<_> = path.steps.iter().collect();
        ordered.sort_by_key(|step| step.order);

        for step in ordered {
            concepts.apply_changes(&step.concept_changes);

            let results = self.evaluate_expected_results(&path.expected_results, &concepts);
            let success = results.iter().all(|r| r.success);
            if let Some(reason) = failure_reason_for(&results) {
                log::debug!("Step '{}' failed: {}", step.name, reason);
                failure_reason = Some(format!("Step \"{}\" failed: {}", step.name, reason));
            }

            let step_result = TestStepResult {
                step_id: step.id.clone(),
                concept_states: concepts.clone(),
                results,
                success,
            };
            on_step(&step_result);
            steps.push(step_result);
        }

        let success = steps.iter().all(|s| s.success);
        log::info!(
            "Path '{}' {}",
            path.name,
            if success { "passed" } else { "failed" }
        );

        Ok(TestResult {
            scenario_id: scenario_id.to_string(),
            path_id: path_id.to_string(),
            timestamp: Utc::now(),
            steps,
            success,
            failure_reason,
        })
    }

    /// Compare each expected result with the actual visibility
    pub fn evaluate_expected_results(
        &self,
        expected: &[ExpectedResult],
        concepts: &ConceptSnapshot,
    ) -> Vec<ExpectedResultOutcome> {
        expected
            .iter()
            .map(|expected_result| {
                let actual_visibility = is_visible(
                    self.config,
                    expected_result.kind,
                    &expected_result.target,
                    concepts,
                );
                ExpectedResultOutcome {
                    success: actual_visibility == expected_result.expected_visibility,
                    expected_result: expected_result.clone(),
                    actual_visibility,
                }
            })
            .collect()
    }

    /// Evaluate a sub-scenario with its inherited concepts applied
    pub fn execute_sub_scenario(
        &self,
        roots: &[TestSubScenario],
        sub_scenario: &TestSubScenario,
        baseline: &ConceptSnapshot,
    ) -> TestStepResult {
        let mut concepts = baseline.clone();
        concepts.apply_changes(&active_concepts(sub_scenario, roots));

        let results = self.evaluate_expected_results(&sub_scenario.expected_results, &concepts);
        TestStepResult {
            step_id: sub_scenario.id.clone(),
            concept_states: concepts,
            success: results.iter().all(|r| r.success),
            results,
        }
    }
}

/// Explanation of every failed outcome, or `None` when all passed
pub fn failure_reason_for(results: &[ExpectedResultOutcome]) -> Option<String> {
    let reasons: Vec<String> = results
        .iter()
        .filter(|r| !r.success)
        .map(|r| {
            format!(
                "{} \"{}\" expected to be {} but was {}.",
                r.expected_result.kind,
                r.expected_result.target,
                visibility_word(r.expected_result.expected_visibility),
                visibility_word(r.actual_visibility)
            )
        })
        .collect();

    if reasons.is_empty() {
        None
    } else {
        Some(reasons.join(" "))
    }
}

fn visibility_word(visible: bool) -> &'static str {
    if visible {
        "visible"
    } else {
        "hidden"
    }
}
