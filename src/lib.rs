// SPDX-License-Identifier: MIT

//! Concept-expression evaluation for electrolyte-management rule sets.
//!
//! The [`expression`] module is the core: it evaluates boolean expressions
//! over named concepts and explains every step it took. The remaining modules
//! load rule configurations, gate their visibility, and run test scenarios
//! against hypothetical concept states.

pub mod concept;
pub mod config;
pub mod error;
pub mod expression;
pub mod scenario;
pub mod server;

pub use error::{ConceptRulesError, Result};
