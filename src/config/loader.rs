// SPDX-License-Identifier: MIT

//! Configuration loader - JSON and YAML file loading and validation

use super::types::RuleConfig;
use crate::error::{ConfigError, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Loads rule configuration documents
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a configuration from a `.json`, `.yaml` or `.yml` file
    pub fn load_config<P: AsRef<Path>>(&self, path: P) -> Result<RuleConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::parse_json(&content)?,
            Some("yaml") | Some("yml") => Self::parse_yaml(&content)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or_default().to_string(),
                )
                .into())
            }
        };
        log::info!(
            "Loaded configuration from {} with {} tab(s)",
            path.display(),
            config.tabs().len()
        );
        Ok(config)
    }

    /// Parse and validate a configuration from a JSON string
    pub fn parse_json(content: &str) -> Result<RuleConfig> {
        let config: RuleConfig = serde_json::from_str(content)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Parse and validate a configuration from a YAML string
    pub fn parse_yaml(content: &str) -> Result<RuleConfig> {
        let config: RuleConfig = serde_yaml::from_str(content)?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &RuleConfig) -> std::result::Result<(), ConfigError> {
        if config.tabs().is_empty() {
            return Err(ConfigError::NoTabs);
        }

        let mut seen = HashSet::new();
        for (index, tab) in config.tabs().iter().enumerate() {
            if tab.tab_key.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    index,
                    field: "TAB_KEY",
                });
            }
            if tab.tab_name.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    index,
                    field: "TAB_NAME",
                });
            }
            if !seen.insert(tab.tab_key.as_str()) {
                return Err(ConfigError::DuplicateTab(tab.tab_key.clone()));
            }
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConceptRulesError;
    use std::io::Write;

    #[test]
    fn test_parse_json_config() {
        let json = r#"{
            "RCONFIG": {
                "TABS": [
                    { "TAB_KEY": "MAGNESIUM", "TAB_NAME": "Magnesium", "FLAG_ON_CONCEPT": "{MG_LOW}" },
                    { "TAB_KEY": "POTASSIUM", "TAB_NAME": "Potassium" }
                ]
            }
        }"#;
        let config = ConfigLoader::parse_json(json).unwrap();
        assert_eq!(config.tabs().len(), 2);
        assert_eq!(
            config.tab("MAGNESIUM").unwrap().flag_on_concept.as_deref(),
            Some("{MG_LOW}")
        );
    }

    #[test]
    fn test_parse_yaml_config() {
        let yaml = r#"
RCONFIG:
  TABS:
    - TAB_KEY: PHOSPHATE
      TAB_NAME: Phosphate
      ORDER_SECTIONS:
        - SECTION_NAME: IV Replacement
          CONCEPT_NAME: "{PHOS_LOW} AND {IV_ACCESS}"
          ORDERS:
            - MNEMONIC: NAPHOS_IV
"#;
        let config = ConfigLoader::parse_yaml(yaml).unwrap();
        let tab = config.tab("PHOSPHATE").unwrap();
        assert_eq!(
            tab.section("IV Replacement").unwrap().concept_name.as_deref(),
            Some("{PHOS_LOW} AND {IV_ACCESS}")
        );
    }

    #[test]
    fn test_no_tabs_rejected() {
        let result = ConfigLoader::parse_json(r#"{ "RCONFIG": { "TABS": [] } }"#);
        assert!(matches!(
            result,
            Err(ConceptRulesError::Config(ConfigError::NoTabs))
        ));
    }

    #[test]
    fn test_duplicate_tab_rejected() {
        let json = r#"{ "RCONFIG": { "TABS": [
            { "TAB_KEY": "K", "TAB_NAME": "One" },
            { "TAB_KEY": "K", "TAB_NAME": "Two" }
        ] } }"#;
        let result = ConfigLoader::parse_json(json);
        assert!(matches!(
            result,
            Err(ConceptRulesError::Config(ConfigError::DuplicateTab(key))) if key == "K"
        ));
    }

    #[test]
    fn test_blank_tab_name_rejected() {
        let json = r#"{ "RCONFIG": { "TABS": [ { "TAB_KEY": "K", "TAB_NAME": " " } ] } }"#;
        let result = ConfigLoader::parse_json(json);
        assert!(matches!(
            result,
            Err(ConceptRulesError::Config(ConfigError::MissingField {
                index: 0,
                field: "TAB_NAME"
            }))
        ));
    }

    #[test]
    fn test_invalid_json_returns_error() {
        let result = ConfigLoader::parse_json("{ not json");
        assert!(matches!(result, Err(ConceptRulesError::Json(_))));
    }

    #[test]
    fn test_load_from_file_by_extension() {
        let dir = std::env::temp_dir().join(format!("concept-rules-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let json_path = dir.join("config.json");
        let mut file = std::fs::File::create(&json_path).unwrap();
        write!(
            file,
            r#"{{ "RCONFIG": {{ "TABS": [ {{ "TAB_KEY": "K", "TAB_NAME": "Potassium" }} ] }} }}"#
        )
        .unwrap();
        assert!(ConfigLoader::new().load_config(&json_path).is_ok());

        let txt_path = dir.join("config.txt");
        std::fs::write(&txt_path, "").unwrap();
        assert!(matches!(
            ConfigLoader::new().load_config(&txt_path),
            Err(ConceptRulesError::Config(ConfigError::UnsupportedFormat(ext))) if ext == "txt"
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
