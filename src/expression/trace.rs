// SPDX-License-Identifier: MIT

//! Evaluation trace

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::concept::ConceptValue;

/// Prefix of the explanation recorded when the residual expression fails
pub const ERROR_PREFIX: &str = "Error evaluating expression: ";

/// One entry in the evaluation trace
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationStep {
    pub expression: String,
    /// `None` for purely textual transformations
    pub result: Option<bool>,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_sub_expression: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_value: Option<ConceptValue>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub warning: bool,
}

impl EvaluationStep {
    /// A step that only rewrote the expression text
    pub fn transform(expression: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            result: None,
            explanation: explanation.into(),
            is_sub_expression: None,
            concept_name: None,
            concept_value: None,
            warning: false,
        }
    }

    /// A step that produced a boolean result
    pub fn resolved(
        expression: impl Into<String>,
        result: bool,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            result: Some(result),
            ..Self::transform(expression, explanation)
        }
    }

    /// A concept reference replaced by its derived value
    pub fn substitution(
        matched: impl Into<String>,
        concept_name: impl Into<String>,
        substituted: ConceptValue,
        is_active: bool,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            is_sub_expression: Some(true),
            concept_name: Some(concept_name.into()),
            concept_value: Some(substituted),
            ..Self::resolved(matched, is_active, explanation)
        }
    }

    pub fn flagged(mut self) -> Self {
        self.warning = true;
        self
    }
}

/// Result of evaluating an expression, with the steps that produced it
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct EvaluationOutcome {
    pub result: bool,
    pub steps: Vec<EvaluationStep>,
}

impl EvaluationOutcome {
    /// Explanation of the evaluation error, if the last step recorded one
    pub fn error(&self) -> Option<&str> {
        self.steps
            .last()
            .and_then(|step| step.explanation.strip_prefix(ERROR_PREFIX))
    }

    /// Steps that carry a warning
    pub fn warnings(&self) -> impl Iterator<Item = &EvaluationStep> {
        self.steps.iter().filter(|step| step.warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transform_step_serializes_null_result() {
        let step = EvaluationStep::transform("{A} && {B}", "Replaced logical operators");
        assert_eq!(
            serde_json::to_value(&step).unwrap(),
            json!({
                "expression": "{A} && {B}",
                "result": null,
                "explanation": "Replaced logical operators"
            })
        );
    }

    #[test]
    fn test_substitution_step_fields() {
        let step = EvaluationStep::substitution(
            "{K_LOW.COUNT}",
            "K_LOW",
            ConceptValue::Number(1.0),
            true,
            "Concept K_LOW is active",
        );
        assert_eq!(
            serde_json::to_value(&step).unwrap(),
            json!({
                "expression": "{K_LOW.COUNT}",
                "result": true,
                "explanation": "Concept K_LOW is active",
                "isSubExpression": true,
                "conceptName": "K_LOW",
                "conceptValue": 1.0
            })
        );
    }

    #[test]
    fn test_error_reads_last_step() {
        let outcome = EvaluationOutcome {
            result: false,
            steps: vec![EvaluationStep::resolved(
                "true &&",
                false,
                format!("{}unexpected end of expression", ERROR_PREFIX),
            )],
        };
        assert_eq!(outcome.error(), Some("unexpected end of expression"));

        let clean = EvaluationOutcome {
            result: false,
            steps: vec![EvaluationStep::resolved("false", false, "Evaluated to false")],
        };
        assert_eq!(clean.error(), None);
    }
}
