// SPDX-License-Identifier: MIT

//! Concept expression evaluation
//!
//! Expressions reference concepts by name and combine them with logical and
//! comparison operators:
//! - `{K_LOW}` - true when the concept is active
//! - `{K_LOW} AND NOT {RENAL_IMPAIRMENT}`
//! - `[%{MG_LOW.COUNT} > 0 OR {ROUTE.VALUE} = 'IV'%]`
//!
//! Evaluation rewrites the text step by step, substitutes every reference,
//! then parses and evaluates what is left. Every rewrite is recorded in the
//! returned trace.

mod ast;
mod engine;
mod evaluator;
pub mod normalizer;
mod parser;
mod trace;

pub use ast::{CompareOp, Expression, Literal};
pub use engine::{evaluate, evaluate_live, evaluate_simple};
pub use parser::{parse, ExpressionError};
pub use trace::{EvaluationOutcome, EvaluationStep, ERROR_PREFIX};
