// SPDX-License-Identifier: MIT

//! Finding the concepts a configuration depends on

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

use super::types::RuleConfig;
use crate::expression::normalizer::find_references;

static TAB_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Tab\s+(\S+)").expect("tab section pattern"));

/// Where a concept is used in a configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConceptReference {
    pub name: String,
    /// Human-readable location, e.g. `Tab Potassium Criteria`
    pub section: String,
    /// Location as a document path, e.g. `RCONFIG.TABS[1].CRITERIA[0].CONCEPT_NAME`
    pub path: String,
    /// False when the field held a bare concept name
    pub is_expression: bool,
}

/// Collect every concept reference in the configuration, in document order
pub fn extract_concepts(config: &RuleConfig) -> Vec<ConceptReference> {
    let mut references = Vec::new();

    for (tab_index, tab) in config.tabs().iter().enumerate() {
        let tab_name = &tab.tab_name;
        let tab_path = format!("RCONFIG.TABS[{}]", tab_index);

        if let Some(flag) = &tab.flag_on_concept {
            references.extend(extract_from_expression(
                flag,
                &format!("Tab {} Flag", tab_name),
                &format!("{}.FLAG_ON_CONCEPT", tab_path),
            ));
        }

        if let Some(dismiss) = tab.concept_for_dismiss.as_deref() {
            if !dismiss.trim().is_empty() {
                references.push(ConceptReference {
                    name: dismiss.trim().to_string(),
                    section: format!("Tab {} Dismiss", tab_name),
                    path: format!("{}.CONCEPT_FOR_DISMISS", tab_path),
                    is_expression: false,
                });
            }
        }

        for (index, item) in tab.concepts.iter().enumerate() {
            references.extend(extract_from_expression(
                &item.concept,
                &format!("Tab {} Concepts", tab_name),
                &format!("{}.CONCEPTS[{}].Concept", tab_path, index),
            ));
        }

        for (index, criterion) in tab.criteria.iter().enumerate() {
            if let Some(name) = &criterion.concept_name {
                references.extend(extract_from_expression(
                    name,
                    &format!("Tab {} Criteria", tab_name),
                    &format!("{}.CRITERIA[{}].CONCEPT_NAME", tab_path, index),
                ));
            }
        }

        for (index, section) in tab.order_sections.iter().enumerate() {
            if let Some(name) = &section.concept_name {
                references.extend(extract_from_expression(
                    name,
                    &format!("Tab {} Order Section: {}", tab_name, section.section_name),
                    &format!("{}.ORDER_SECTIONS[{}].CONCEPT_NAME", tab_path, index),
                ));
            }
        }
    }

    log::debug!("Extracted {} concept reference(s)", references.len());
    references
}

/// Concept references in a single expression field
///
/// A non-empty field without any `{...}` reference is taken to be a bare
/// concept name.
pub fn extract_from_expression(
    expression: &str,
    section: &str,
    path: &str,
) -> Vec<ConceptReference> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let found = find_references(trimmed);
    if found.is_empty() {
        return vec![ConceptReference {
            name: trimmed.to_string(),
            section: section.to_string(),
            path: path.to_string(),
            is_expression: false,
        }];
    }

    found
        .into_iter()
        .map(|reference| ConceptReference {
            name: reference.name.to_string(),
            section: section.to_string(),
            path: path.to_string(),
            is_expression: true,
        })
        .collect()
}

/// Distinct concept names, in order of first use
pub fn unique_names(references: &[ConceptReference]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for reference in references {
        if !names.contains(&reference.name) {
            names.push(reference.name.clone());
        }
    }
    names
}

/// Concept names grouped by tab name, then by section label
///
/// Sections that do not start with `Tab <name>` are grouped under `Other`.
pub fn group_by_tab_and_section(
    references: &[ConceptReference],
) -> BTreeMap<String, BTreeMap<String, Vec<String>>> {
    let mut grouped: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();

    for reference in references {
        let tab = TAB_SECTION
            .captures(&reference.section)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "Other".to_string());

        let names = grouped
            .entry(tab)
            .or_default()
            .entry(reference.section.clone())
            .or_default();
        if !names.contains(&reference.name) {
            names.push(reference.name.clone());
        }
    }

    grouped
}

/// Plain-text report of where each concept is used
pub fn usage_report(references: &[ConceptReference]) -> String {
    let mut usage: Vec<(&str, Vec<String>)> = Vec::new();
    for reference in references {
        let place = format!("{} ({})", reference.section, reference.path);
        let existing = usage.iter().position(|(name, _)| *name == reference.name);
        match existing {
            Some(index) => usage[index].1.push(place),
            None => usage.push((reference.name.as_str(), vec![place])),
        }
    }

    let mut report = String::from("Concept Usage Report:\n\n");
    for (name, places) in usage {
        let _ = writeln!(report, "Concept: {}", name);
        let _ = writeln!(report, "Used in {} place(s):", places.len());
        for place in places {
            let _ = writeln!(report, "  - {}", place);
        }
        report.push('\n');
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;

    fn sample_config() -> RuleConfig {
        ConfigLoader::parse_json(
            r#"{
            "RCONFIG": { "TABS": [
                {
                    "TAB_KEY": "POTASSIUM",
                    "TAB_NAME": "Potassium",
                    "FLAG_ON_CONCEPT": "[%{K_LOW} OR {K_HIGH}%]",
                    "CONCEPT_FOR_DISMISS": "K_DISMISSED",
                    "CONCEPTS": [ { "Concept": "{K_LEVEL.VALUE}" } ],
                    "CRITERIA": [
                        { "CONCEPT_NAME": "{K_LOW}", "LABEL": "Low potassium" },
                        { "LABEL": "No gate" }
                    ],
                    "ORDER_SECTIONS": [
                        { "SECTION_NAME": "Oral", "CONCEPT_NAME": "PO_OK", "ORDERS": [] }
                    ]
                }
            ] }
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_extract_concepts() {
        let references = extract_concepts(&sample_config());
        let names: Vec<&str> = references.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["K_LOW", "K_HIGH", "K_DISMISSED", "K_LEVEL", "K_LOW", "PO_OK"]
        );

        assert_eq!(references[0].section, "Tab Potassium Flag");
        assert_eq!(references[0].path, "RCONFIG.TABS[0].FLAG_ON_CONCEPT");
        assert!(references[0].is_expression);

        assert_eq!(references[2].section, "Tab Potassium Dismiss");
        assert!(!references[2].is_expression);

        assert_eq!(references[3].path, "RCONFIG.TABS[0].CONCEPTS[0].Concept");
        assert_eq!(references[4].path, "RCONFIG.TABS[0].CRITERIA[0].CONCEPT_NAME");

        assert_eq!(references[5].section, "Tab Potassium Order Section: Oral");
        assert!(!references[5].is_expression);
    }

    #[test]
    fn test_extract_from_empty_expression() {
        assert!(extract_from_expression("  ", "s", "p").is_empty());
    }

    #[test]
    fn test_unique_names_keep_first_use_order() {
        let references = extract_concepts(&sample_config());
        assert_eq!(
            unique_names(&references),
            vec!["K_LOW", "K_HIGH", "K_DISMISSED", "K_LEVEL", "PO_OK"]
        );
    }

    #[test]
    fn test_group_by_tab_and_section() {
        let mut references = extract_concepts(&sample_config());
        references.push(ConceptReference {
            name: "ADHOC".to_string(),
            section: "Test Evaluation".to_string(),
            path: "runtime".to_string(),
            is_expression: true,
        });

        let grouped = group_by_tab_and_section(&references);
        assert_eq!(
            grouped["Potassium"]["Tab Potassium Flag"],
            vec!["K_LOW", "K_HIGH"]
        );
        assert_eq!(grouped["Potassium"]["Tab Potassium Criteria"], vec!["K_LOW"]);
        assert_eq!(grouped["Other"]["Test Evaluation"], vec!["ADHOC"]);
    }

    #[test]
    fn test_usage_report() {
        let references = vec![
            ConceptReference {
                name: "K_LOW".to_string(),
                section: "Tab Potassium Flag".to_string(),
                path: "RCONFIG.TABS[0].FLAG_ON_CONCEPT".to_string(),
                is_expression: true,
            },
            ConceptReference {
                name: "K_LOW".to_string(),
                section: "Tab Potassium Criteria".to_string(),
                path: "RCONFIG.TABS[0].CRITERIA[0].CONCEPT_NAME".to_string(),
                is_expression: true,
            },
        ];

        assert_eq!(
            usage_report(&references),
            "Concept Usage Report:\n\n\
             Concept: K_LOW\n\
             Used in 2 place(s):\n  \
             - Tab Potassium Flag (RCONFIG.TABS[0].FLAG_ON_CONCEPT)\n  \
             - Tab Potassium Criteria (RCONFIG.TABS[0].CRITERIA[0].CONCEPT_NAME)\n\n"
        );
    }
}
