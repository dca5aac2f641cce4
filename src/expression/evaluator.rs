// SPDX-License-Identifier: MIT

//! Residual expression evaluator
//!
//! Coercion rules:
//! - `&&` and `||` short-circuit on truthiness and yield the operand that
//!   decided the result, not a forced boolean.
//! - `false`, `0`, `NaN` and `""` are falsy; every other value is truthy.
//! - `!` always yields a boolean.
//! - `==` and `!=` are strict: values of different types are never equal.
//! - `<`, `>`, `<=`, `>=` order numbers numerically and strings
//!   lexicographically; any other pairing compares false.

use super::ast::{CompareOp, Expression, Literal};
use std::cmp::Ordering;

/// Evaluate a residual expression to a value
pub fn evaluate(expr: &Expression) -> Literal {
    match expr {
        Expression::Literal(lit) => lit.clone(),
        Expression::Not(inner) => Literal::Boolean(!is_truthy(&evaluate(inner))),
        Expression::And(operands) => evaluate_run(operands, false),
        Expression::Or(operands) => evaluate_run(operands, true),
        Expression::Compare { left, op, right } => {
            Literal::Boolean(evaluate_compare(&evaluate(left), *op, &evaluate(right)))
        }
    }
}

/// Evaluate `&&` or `||` operands left to right, stopping at the first
/// operand whose truthiness equals `stop_when`
fn evaluate_run(operands: &[Expression], stop_when: bool) -> Literal {
    let mut value = Literal::Boolean(!stop_when);
    for operand in operands {
        value = evaluate(operand);
        if is_truthy(&value) == stop_when {
            break;
        }
    }
    value
}

/// Truthiness used by `!`, `&&` and `||`
pub fn is_truthy(value: &Literal) -> bool {
    match value {
        Literal::Boolean(b) => *b,
        Literal::Number(n) => *n != 0.0 && !n.is_nan(),
        Literal::String(s) => !s.is_empty(),
    }
}

fn evaluate_compare(left: &Literal, op: CompareOp, right: &Literal) -> bool {
    match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::NotEq => !values_equal(left, right),
        CompareOp::Gt => compare_ordered(left, right, |o| o == Ordering::Greater),
        CompareOp::Gte => compare_ordered(left, right, |o| o != Ordering::Less),
        CompareOp::Lt => compare_ordered(left, right, |o| o == Ordering::Less),
        CompareOp::Lte => compare_ordered(left, right, |o| o != Ordering::Greater),
    }
}

fn values_equal(left: &Literal, right: &Literal) -> bool {
    match (left, right) {
        (Literal::String(a), Literal::String(b)) => a == b,
        (Literal::Number(a), Literal::Number(b)) => a == b,
        (Literal::Boolean(a), Literal::Boolean(b)) => a == b,
        _ => false,
    }
}

fn compare_ordered<F>(left: &Literal, right: &Literal, accept: F) -> bool
where
    F: Fn(Ordering) -> bool,
{
    let ordering = match (left, right) {
        (Literal::Number(a), Literal::Number(b)) => a.partial_cmp(b),
        (Literal::String(a), Literal::String(b)) => Some(a.cmp(b)),
        _ => None,
    };
    ordering.is_some_and(accept)
}
