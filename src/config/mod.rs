// SPDX-License-Identifier: MIT

//! Rule configuration documents
//!
//! This module provides:
//! - `RuleConfig` - tabs, criteria, order sections and orders
//! - `ConfigLoader` - loading and validating JSON or YAML documents
//! - concept extraction and the usage report
//! - visibility checks for every gated element

pub mod extraction;
mod loader;
mod types;
pub mod visibility;

pub use extraction::{extract_concepts, usage_report, ConceptReference};
pub use loader::ConfigLoader;
pub use types::{
    ConceptItem, Criterion, Order, OrderSection, RConfig, Resource, RuleConfig, TabConfig,
};
pub use visibility::{is_visible, visibility_report, TargetKind, VisibilityEntry};
