// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree for residual expressions
//!
//! A residual expression is what is left once every concept reference has
//! been substituted: literals joined by logical and comparison operators.

use std::fmt;

/// A residual expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Comparison expression: left op right
    Compare {
        left: Box<Expression>,
        op: CompareOp,
        right: Box<Expression>,
    },
    /// Logical AND over a run of two or more operands
    And(Vec<Expression>),
    /// Logical OR over a run of two or more operands
    Or(Vec<Expression>),
    /// Logical NOT
    Not(Box<Expression>),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompareOp {
    /// ==
    Eq,
    /// !=
    NotEq,
    /// >
    Gt,
    /// >=
    Gte,
    /// <
    Lt,
    /// <=
    Lte,
}

/// Literal values, also the result of evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Expression {
    pub fn boolean(value: bool) -> Self {
        Expression::Literal(Literal::Boolean(value))
    }

    pub fn number(value: f64) -> Self {
        Expression::Literal(Literal::Number(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::Literal(Literal::String(value.into()))
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::NotEq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}

/// Render a number as source text the parser reads back to the same value
pub fn number_source(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Number(n) => write!(f, "{}", number_source(*n)),
            Literal::Boolean(b) => write!(f, "{}", b),
        }
    }
}
