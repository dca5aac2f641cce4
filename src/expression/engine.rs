// SPDX-License-Identifier: MIT

//! Concept expression evaluation with a step-by-step trace

use super::ast::{number_source, Literal};
use super::normalizer::{self, ReferenceMatch};
use super::trace::{EvaluationOutcome, EvaluationStep, ERROR_PREFIX};
use super::{evaluator, parser};
use crate::concept::{ConceptSnapshot, ConceptSource, ConceptValue};

/// Evaluate a concept expression against a snapshot
///
/// Never fails: an expression that cannot be evaluated yields `false` and a
/// final step whose explanation starts with [`ERROR_PREFIX`].
pub fn evaluate(expression: &str, concepts: &ConceptSnapshot) -> EvaluationOutcome {
    let mut steps = vec![EvaluationStep::transform(expression, "Original expression")];
    let mut text = expression.trim().to_string();

    if let Some(stripped) = normalizer::strip_delimiters(&text) {
        text = stripped;
        steps.push(EvaluationStep::transform(&text, "Removed [% %] delimiters"));
    }

    let (replaced, fired) = normalizer::replace_word_operators(&text);
    if !fired.is_empty() {
        text = replaced;
        steps.push(EvaluationStep::transform(
            &text,
            format!("Replaced logical operators: {}", fired.join(", ")),
        ));
    }

    let references = normalizer::find_references(&text);
    if !references.is_empty() {
        let mut substituted = String::with_capacity(text.len());
        let mut cursor = 0;
        for reference in &references {
            let (replacement, step) = substitute(reference, concepts);
            substituted.push_str(&text[cursor..reference.span.start]);
            substituted.push_str(&replacement);
            cursor = reference.span.end;
            steps.push(step);
        }
        substituted.push_str(&text[cursor..]);
        let count = references.len();
        text = substituted;
        steps.push(EvaluationStep::transform(
            &text,
            format!("Substituted {} concept reference(s)", count),
        ));
    }

    let normalized = normalizer::normalize_assignment(&text);
    if normalized != text {
        text = normalized;
        steps.push(EvaluationStep::transform(&text, "Converted = to =="));
    }

    let text = text.trim();
    let result = if text.is_empty() {
        steps.push(EvaluationStep::resolved(
            text,
            false,
            "Expression is empty; treated as false",
        ));
        false
    } else {
        match parser::parse(text) {
            Ok(ast) => {
                let value = evaluator::evaluate(&ast);
                let result = value == Literal::Boolean(true);
                let explanation = match value {
                    Literal::Boolean(b) => format!("Expression evaluated to {}", b),
                    other => format!(
                        "Expression evaluated to non-boolean value {}; treated as false",
                        other
                    ),
                };
                steps.push(EvaluationStep::resolved(text, result, explanation));
                result
            }
            Err(e) => {
                log::debug!("Failed to evaluate '{}': {}", expression, e);
                steps.push(EvaluationStep::resolved(
                    text,
                    false,
                    format!("{}{}", ERROR_PREFIX, e),
                ));
                false
            }
        }
    };

    for (index, step) in steps.iter().enumerate() {
        log::trace!("step {}: {} => {}", index, step.expression, step.explanation);
    }

    EvaluationOutcome { result, steps }
}

/// Evaluate and keep only the boolean
pub fn evaluate_simple(expression: &str, concepts: &ConceptSnapshot) -> bool {
    evaluate(expression, concepts).result
}

/// Snapshot a live source, then evaluate against the copy
pub async fn evaluate_live<S>(source: &S, expression: &str) -> EvaluationOutcome
where
    S: ConceptSource + ?Sized,
{
    let snapshot = source.snapshot().await;
    evaluate(expression, &snapshot)
}

/// Derive the replacement text and trace step for one reference
fn substitute(
    reference: &ReferenceMatch<'_>,
    concepts: &ConceptSnapshot,
) -> (String, EvaluationStep) {
    let concept = concepts.get(reference.name);
    let is_active = concept.is_some_and(|c| c.is_active);
    let state = match concept {
        None => "is not defined (inactive)",
        Some(_) if is_active => "is active",
        Some(_) => "is inactive",
    };

    let (value, explanation, warning) = match reference.property {
        None => (
            ConceptValue::Boolean(is_active),
            format!("Concept {} {}; substituted {}", reference.name, state, is_active),
            false,
        ),
        Some("COUNT") => {
            let count = if is_active { 1.0 } else { 0.0 };
            (
                ConceptValue::Number(count),
                format!(
                    "Concept {} {}; COUNT substituted {}",
                    reference.name, state, count
                ),
                false,
            )
        }
        Some("VALUE") => {
            let value = match concept {
                Some(c) if is_active => c.value.clone(),
                _ => ConceptValue::Boolean(false),
            };
            (
                value.clone(),
                format!(
                    "Concept {} {}; VALUE substituted {}",
                    reference.name,
                    state,
                    to_literal(&value)
                ),
                false,
            )
        }
        Some(property) => {
            log::warn!(
                "Unknown property '{}' on concept '{}'; substituting false",
                property,
                reference.name
            );
            (
                ConceptValue::Boolean(false),
                format!(
                    "Warning: unknown property {} on concept {} ({}); substituted false",
                    property,
                    reference.name,
                    state.trim_start_matches("is ")
                ),
                true,
            )
        }
    };

    let replacement = to_literal(&value);
    let mut step = EvaluationStep::substitution(
        reference.matched,
        reference.name,
        value,
        is_active && !warning,
        explanation,
    );
    if warning {
        step = step.flagged();
    }
    (replacement, step)
}

/// Render a concept value as residual-expression source text
fn to_literal(value: &ConceptValue) -> String {
    match value {
        ConceptValue::Boolean(b) => b.to_string(),
        ConceptValue::Number(n) => number_source(*n),
        ConceptValue::Text(s) => {
            let mut quoted = String::with_capacity(s.len() + 2);
            quoted.push('"');
            for c in s.chars() {
                match c {
                    '"' => quoted.push_str("\\\""),
                    '\\' => quoted.push_str("\\\\"),
                    '\n' => quoted.push_str("\\n"),
                    '\t' => quoted.push_str("\\t"),
                    other => quoted.push(other),
                }
            }
            quoted.push('"');
            quoted
        }
    }
}
