// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Dependencies: YAML sub-trees still waiting to be expanded

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{PlanflowError, PlanflowResult};

/// How nodes produced under a dependency behave in a rollback run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RollbackModeBehaviour {
    /// Recreate as usual
    #[default]
    None,
    /// Reuse the previously executed nodes
    Preserve,
    /// Recreate in undo mode
    Undo,
}

impl std::fmt::Display for RollbackModeBehaviour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Preserve => write!(f, "preserve"),
            Self::Undo => write!(f, "undo"),
        }
    }
}

impl std::str::FromStr for RollbackModeBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "preserve" => Ok(Self::Preserve),
            "undo" => Ok(Self::Undo),
            _ => Err(format!("Unknown rollback mode behaviour: {}", s)),
        }
    }
}

/// Metadata attached to one dependency key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(default)]
    pub rollback_mode_behaviour: RollbackModeBehaviour,

    /// Service that owns resolution of this dependency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distributed_affinity: Option<String>,

    /// Free-form data a parent creator hands to the child it discovered
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub node_metadata: serde_json::Map<String, serde_json::Value>,
}

impl Dependency {
    pub fn with_rollback(mut self, behaviour: RollbackModeBehaviour) -> Self {
        self.rollback_mode_behaviour = behaviour;
        self
    }

    pub fn with_affinity(mut self, service: impl Into<String>) -> Self {
        self.distributed_affinity = Some(service.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.node_metadata.insert(key.into(), value);
        self
    }

    /// String value stored under `key` in the node metadata
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.node_metadata.get(key).and_then(|v| v.as_str())
    }
}

/// A frontier: dependency keys mapped to the YAML paths they stand for
///
/// Every key in `metadata` must also be a key in `entries`; the mutators keep
/// that true and [`Dependencies::validate`] checks it for data that arrived
/// from outside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dependencies {
    /// Document the paths refer to
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub yaml: String,

    #[serde(default)]
    pub entries: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, Dependency>,
}

impl Dependencies {
    /// Empty dependencies over the given document
    pub fn new(yaml: impl Into<String>) -> Self {
        Self {
            yaml: yaml.into(),
            ..Default::default()
        }
    }

    /// Builder-style [`Dependencies::insert`]
    pub fn with_entry(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.insert(key, path);
        self
    }

    /// Builder-style [`Dependencies::insert_with`]
    pub fn with_dependency(
        mut self,
        key: impl Into<String>,
        path: impl Into<String>,
        dependency: Dependency,
    ) -> Self {
        self.insert_with(key, path, dependency);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, path: impl Into<String>) {
        self.entries.insert(key.into(), path.into());
    }

    pub fn insert_with(
        &mut self,
        key: impl Into<String>,
        path: impl Into<String>,
        dependency: Dependency,
    ) {
        let key = key.into();
        self.entries.insert(key.clone(), path.into());
        self.metadata.insert(key, dependency);
    }

    /// Attach metadata to an existing key; returns false for unknown keys
    pub fn set_metadata(&mut self, key: &str, dependency: Dependency) -> bool {
        if !self.entries.contains_key(key) {
            return false;
        }
        self.metadata.insert(key.to_string(), dependency);
        true
    }

    /// Metadata for `key`, created empty if it has none yet
    pub fn metadata_mut(&mut self, key: &str) -> Option<&mut Dependency> {
        if !self.entries.contains_key(key) {
            return None;
        }
        Some(self.metadata.entry(key.to_string()).or_default())
    }

    pub fn metadata_for(&self, key: &str) -> Option<&Dependency> {
        self.metadata.get(key)
    }

    pub fn path_for(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a key together with its metadata
    pub fn remove(&mut self, key: &str) -> Option<(String, Option<Dependency>)> {
        let path = self.entries.shift_remove(key)?;
        Some((path, self.metadata.shift_remove(key)))
    }

    /// Keep only the keys for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|k, _| keep(k));
        let entries = &self.entries;
        self.metadata.retain(|k, _| entries.contains_key(k));
    }

    /// Fold `other` into `self`; `other` wins on key collisions
    pub fn extend(&mut self, other: Dependencies) {
        self.entries.extend(other.entries);
        self.metadata.extend(other.metadata);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate `(key, path, metadata)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, Option<&Dependency>)> {
        self.entries
            .iter()
            .map(|(k, p)| (k.as_str(), p.as_str(), self.metadata.get(k)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check data that arrived from a caller
    pub fn validate(&self) -> PlanflowResult<()> {
        if let Some(orphan) = self.metadata.keys().find(|k| !self.entries.contains_key(*k)) {
            return Err(PlanflowError::InvalidRequest {
                reason: format!("metadata for unknown dependency '{}'", orphan),
                help: Some("Every metadata key must also appear in the dependency entries".into()),
            });
        }
        if let Some((key, _)) = self.entries.iter().find(|(_, path)| path.trim().is_empty()) {
            return Err(PlanflowError::invalid_request(format!(
                "dependency '{}' has an empty path",
                key
            )));
        }
        Ok(())
    }
}
