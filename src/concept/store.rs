// SPDX-License-Identifier: MIT

//! Live, shared concept state
//!
//! The evaluator never reads this directly. Callers take a [`ConceptSnapshot`]
//! through [`ConceptSource::snapshot`] and pass it in, so an evaluation only
//! ever sees a copy made before it started.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::types::{Concept, ConceptChange, ConceptSnapshot, ConceptValue};

/// Anything that can hand out a point-in-time copy of concept state
#[async_trait]
pub trait ConceptSource: Send + Sync {
    async fn snapshot(&self) -> ConceptSnapshot;
}

/// Process-wide concept state shared between the CLI, server, and runners
#[derive(Clone, Default)]
pub struct ConceptStore {
    concepts: Arc<RwLock<BTreeMap<String, Concept>>>,
}

impl ConceptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded from a snapshot
    pub fn from_snapshot(snapshot: ConceptSnapshot) -> Self {
        Self {
            concepts: Arc::new(RwLock::new(
                snapshot
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            )),
        }
    }

    pub async fn get(&self, name: &str) -> Option<Concept> {
        let concepts = self.concepts.read().await;
        concepts.get(name).cloned()
    }

    pub async fn set(&self, name: &str, concept: Concept) {
        let mut concepts = self.concepts.write().await;
        concepts.insert(name.to_string(), concept);
    }

    /// Set a concept's value, creating it inactive if it does not exist
    pub async fn set_value(&self, name: &str, value: impl Into<ConceptValue>) {
        let mut concepts = self.concepts.write().await;
        concepts.entry(name.to_string()).or_default().value = value.into();
    }

    /// Flip a concept's active flag; a missing concept becomes active
    pub async fn toggle_active(&self, name: &str) {
        let mut concepts = self.concepts.write().await;
        let concept = concepts.entry(name.to_string()).or_default();
        concept.is_active = !concept.is_active;
    }

    pub async fn apply_changes(&self, changes: &[ConceptChange]) {
        let mut concepts = self.concepts.write().await;
        for change in changes {
            let entry = concepts.entry(change.concept_name.clone()).or_default();
            entry.value = change.value.clone();
            entry.is_active = change.is_active;
        }
    }

    /// Replace the whole state with a snapshot
    pub async fn replace(&self, snapshot: ConceptSnapshot) {
        let mut concepts = self.concepts.write().await;
        *concepts = snapshot
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
    }

    /// Add every name not yet known as `{ value: false, isActive: true }`
    ///
    /// Returns how many concepts were added.
    pub async fn initialize<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut concepts = self.concepts.write().await;
        let mut added = 0;
        for name in names {
            let name = name.into();
            if !concepts.contains_key(&name) {
                concepts.insert(name, Concept::active(false));
                added += 1;
            }
        }
        added
    }

    pub async fn len(&self) -> usize {
        self.concepts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.concepts.read().await.is_empty()
    }
}

#[async_trait]
impl ConceptSource for ConceptStore {
    async fn snapshot(&self) -> ConceptSnapshot {
        let concepts = self.concepts.read().await;
        concepts
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[async_trait]
impl ConceptSource for ConceptSnapshot {
    async fn snapshot(&self) -> ConceptSnapshot {
        self.clone()
    }
}
