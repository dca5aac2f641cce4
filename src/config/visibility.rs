// SPDX-License-Identifier: MIT

//! Visibility of tabs, order sections, orders and criteria
//!
//! Targets are addressed with colon-separated paths:
//! - tab: `TAB_KEY`
//! - section: `TAB_KEY:SECTION_NAME`
//! - order: `TAB_KEY:SECTION_NAME:MNEMONIC`
//! - criterion: `TAB_KEY:LABEL`

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::RuleConfig;
use crate::concept::ConceptSnapshot;
use crate::expression;

static BARE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").expect("bare name pattern"));

/// Kind of configuration element a visibility check targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Tab,
    Section,
    Order,
    Criterion,
}

impl TargetKind {
    /// Number of colon-separated parts a target of this kind has
    pub fn arity(self) -> usize {
        match self {
            TargetKind::Tab => 1,
            TargetKind::Section | TargetKind::Criterion => 2,
            TargetKind::Order => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Tab => "tab",
            TargetKind::Section => "section",
            TargetKind::Order => "order",
            TargetKind::Criterion => "criterion",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility of one element
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct VisibilityEntry {
    pub kind: TargetKind,
    pub target: String,
    pub visible: bool,
}

/// Whether a gate lets its element through
///
/// A missing or blank gate is open. A gate holding a bare concept name is
/// read as a reference to that concept.
pub fn gate_open(gate: Option<&str>, concepts: &ConceptSnapshot) -> bool {
    let gate = match gate.map(str::trim) {
        None | Some("") => return true,
        Some(g) => g,
    };

    let expression = if BARE_NAME.is_match(gate) {
        format!("{{{}}}", gate)
    } else {
        gate.to_string()
    };

    let outcome = expression::evaluate(&expression, concepts);
    if let Some(error) = outcome.error() {
        log::warn!("Error evaluating gate '{}': {}", gate, error);
    }
    outcome.result
}

pub fn is_tab_visible(config: &RuleConfig, tab_key: &str, concepts: &ConceptSnapshot) -> bool {
    match config.tab(tab_key) {
        Some(tab) => gate_open(tab.flag_on_concept.as_deref(), concepts),
        None => false,
    }
}

pub fn is_section_visible(
    config: &RuleConfig,
    section_path: &str,
    concepts: &ConceptSnapshot,
) -> bool {
    let mut parts = section_path.split(':');
    let (Some(tab_key), Some(section_name)) = (parts.next(), parts.next()) else {
        return false;
    };

    config
        .tab(tab_key)
        .and_then(|tab| tab.section(section_name))
        .is_some_and(|section| gate_open(section.concept_name.as_deref(), concepts))
}

/// An order is visible when its section is visible and the order exists
pub fn is_order_visible(config: &RuleConfig, order_path: &str, concepts: &ConceptSnapshot) -> bool {
    let mut parts = order_path.split(':');
    let (Some(tab_key), Some(section_name), Some(mnemonic)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    if !is_section_visible(config, &format!("{}:{}", tab_key, section_name), concepts) {
        return false;
    }

    config
        .tab(tab_key)
        .and_then(|tab| tab.section(section_name))
        .is_some_and(|section| section.order(mnemonic).is_some())
}

pub fn is_criterion_visible(
    config: &RuleConfig,
    criterion_path: &str,
    concepts: &ConceptSnapshot,
) -> bool {
    let mut parts = criterion_path.split(':');
    let (Some(tab_key), Some(label)) = (parts.next(), parts.next()) else {
        return false;
    };

    config
        .tab(tab_key)
        .and_then(|tab| tab.criterion(label))
        .is_some_and(|criterion| gate_open(criterion.concept_name.as_deref(), concepts))
}

/// Dispatch on target kind
pub fn is_visible(
    config: &RuleConfig,
    kind: TargetKind,
    target: &str,
    concepts: &ConceptSnapshot,
) -> bool {
    match kind {
        TargetKind::Tab => is_tab_visible(config, target, concepts),
        TargetKind::Section => is_section_visible(config, target, concepts),
        TargetKind::Order => is_order_visible(config, target, concepts),
        TargetKind::Criterion => is_criterion_visible(config, target, concepts),
    }
}

/// Visibility of every element in the configuration, in document order
pub fn visibility_report(config: &RuleConfig, concepts: &ConceptSnapshot) -> Vec<VisibilityEntry> {
    let mut entries = Vec::new();
    let mut push = |kind: TargetKind, target: String| {
        let visible = is_visible(config, kind, &target, concepts);
        entries.push(VisibilityEntry {
            kind,
            target,
            visible,
        });
    };

    for tab in config.tabs() {
        push(TargetKind::Tab, tab.tab_key.clone());
        for criterion in &tab.criteria {
            push(
                TargetKind::Criterion,
                format!("{}:{}", tab.tab_key, criterion.label),
            );
        }
        for section in &tab.order_sections {
            push(
                TargetKind::Section,
                format!("{}:{}", tab.tab_key, section.section_name),
            );
            for order in &section.orders {
                push(
                    TargetKind::Order,
                    format!(
                        "{}:{}:{}",
                        tab.tab_key, section.section_name, order.mnemonic
                    ),
                );
            }
        }
    }

    entries
}
