// SPDX-License-Identifier: MIT

//! Rule configuration document types
//!
//! Field names follow the upper-case keys of the configuration files, so
//! existing documents deserialize without conversion.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level configuration document
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RuleConfig {
    #[serde(rename = "RCONFIG")]
    pub rconfig: RConfig,
    /// Anything else in the document, preserved as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RConfig {
    #[serde(rename = "TABS")]
    pub tabs: Vec<TabConfig>,
    #[serde(rename = "SETTINGS", default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One electrolyte tab
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TabConfig {
    pub tab_key: String,
    pub tab_name: String,
    /// Gate controlling whether the tab is shown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_on_concept: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_for_dismiss: Option<String>,
    #[serde(default)]
    pub concepts: Vec<ConceptItem>,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    #[serde(default)]
    pub order_sections: Vec<OrderSection>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ConceptItem {
    #[serde(rename = "Concept")]
    pub concept: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Criterion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_name: Option<String>,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct OrderSection {
    pub section_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_name: Option<String>,
    #[serde(default)]
    pub single_select: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_inactive_duplicates: Option<u8>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Order {
    pub mnemonic: String,
    #[serde(default)]
    pub order_sentence: String,
    #[serde(default)]
    pub asc_short_description: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Resource {
    pub url: String,
    #[serde(default)]
    pub description: String,
}

impl RuleConfig {
    pub fn tabs(&self) -> &[TabConfig] {
        &self.rconfig.tabs
    }

    pub fn tab(&self, tab_key: &str) -> Option<&TabConfig> {
        self.rconfig.tabs.iter().find(|t| t.tab_key == tab_key)
    }
}

impl TabConfig {
    pub fn section(&self, section_name: &str) -> Option<&OrderSection> {
        self.order_sections
            .iter()
            .find(|s| s.section_name == section_name)
    }

    pub fn criterion(&self, label: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.label == label)
    }
}

impl OrderSection {
    pub fn order(&self, mnemonic: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.mnemonic == mnemonic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_tab() {
        let tab: TabConfig = serde_json::from_value(json!({
            "TAB_KEY": "POTASSIUM",
            "TAB_NAME": "Potassium",
            "FLAG_ON_CONCEPT": "[%{K_LOW}%]",
            "CONCEPTS": [{ "Concept": "{K_LEVEL}" }],
            "CRITERIA": [{ "CONCEPT_NAME": "{K_LOW}", "LABEL": "K < 3.5" }],
            "ORDER_SECTIONS": [{
                "SECTION_NAME": "Oral",
                "CONCEPT_NAME": "{PO_OK}",
                "SINGLE_SELECT": 1,
                "ORDERS": [{ "MNEMONIC": "KCL_PO", "ORDER_SENTENCE": "20 mEq PO" }]
            }]
        }))
        .unwrap();

        assert_eq!(tab.tab_key, "POTASSIUM");
        assert_eq!(tab.flag_on_concept.as_deref(), Some("[%{K_LOW}%]"));
        assert_eq!(tab.concepts[0].concept, "{K_LEVEL}");
        assert!(tab.criterion("K < 3.5").is_some());

        let section = tab.section("Oral").unwrap();
        assert_eq!(section.single_select, 1);
        assert_eq!(section.order("KCL_PO").unwrap().order_sentence, "20 mEq PO");
        assert!(section.order("KCL_IV").is_none());
        assert!(tab.resources.is_empty());
    }

    #[test]
    fn test_unknown_keys_are_preserved() {
        let config: RuleConfig = serde_json::from_value(json!({
            "RCONFIG": {
                "TABS": [{ "TAB_KEY": "MAGNESIUM", "TAB_NAME": "Magnesium" }],
                "SETTINGS": { "theme": "light" },
                "VERSION": 3
            },
            "PATIENT": { "id": "p1" }
        }))
        .unwrap();

        assert_eq!(config.tabs().len(), 1);
        assert!(config.tab("MAGNESIUM").is_some());
        assert_eq!(config.rconfig.extra["VERSION"], json!(3));
        assert_eq!(config.extra["PATIENT"], json!({ "id": "p1" }));
        assert_eq!(config.rconfig.settings, Some(json!({ "theme": "light" })));
    }
}
