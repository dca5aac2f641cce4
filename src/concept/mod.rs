// SPDX-License-Identifier: MIT

//! Concept state
//!
//! This module provides:
//! - `Concept` / `ConceptValue` - a named clinical fact and its value
//! - `ConceptSnapshot` - immutable copy of concept state used for one evaluation
//! - `ConceptStore` - live shared state, read only through `ConceptSource`

mod store;
mod types;

pub use store::{ConceptSource, ConceptStore};
pub use types::{Concept, ConceptChange, ConceptSnapshot, ConceptValue};
