// SPDX-License-Identifier: MIT

//! Typed error handling for concept-rules
//!
//! The expression evaluator never returns these: evaluation failures are
//! folded into the trace. They cover everything around it, loading
//! configuration and scenario files and looking things up in them.

use thiserror::Error;

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ConceptRulesError>;

/// Top-level error type for concept-rules
#[derive(Debug, Error)]
pub enum ConceptRulesError {
    /// Configuration document errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scenario authoring and execution errors
    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Configuration document errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File extension is neither JSON nor YAML
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// The document defines no tabs
    #[error("Configuration must define at least one tab")]
    NoTabs,

    /// A tab is missing its key or name
    #[error("Tab {index} must have a non-empty {field}")]
    MissingField { index: usize, field: &'static str },

    /// Two tabs share a key
    #[error("Duplicate tab key: {0}")]
    DuplicateTab(String),
}

/// Scenario-specific errors
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Scenario id not present in the book
    #[error("Scenario with ID {0} not found")]
    ScenarioNotFound(String),

    /// Path id not present in the scenario
    #[error("Path with ID {path_id} not found in scenario {scenario_id}")]
    PathNotFound {
        scenario_id: String,
        path_id: String,
    },

    /// Expected-result target that does not follow the `a:b:c` layout
    #[error("Malformed {kind} target: {target}")]
    MalformedTarget { kind: &'static str, target: String },

    /// Path generation would produce too many combinations
    #[error("Cannot generate paths for {count} concepts (at most {max})")]
    TooManyConcepts { count: usize, max: usize },

    /// Scenario book file extension is neither JSON nor YAML
    #[error("Unsupported scenario file format: {0}")]
    UnsupportedFormat(String),
}

impl ConceptRulesError {
    /// Create from a generic message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<String> for ConceptRulesError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}
