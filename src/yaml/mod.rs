// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! YAML field access
//!
//! A [`YamlDocument`] is one snapshot of the pipeline YAML. Creators never see
//! the document mutate under them: rewrites are applied by the driver to a
//! fresh copy between batches.

mod path;

pub use path::{construct_kind, format_path, parse_path, PathSegment, Resolved};

use serde_yaml::Value;

use crate::errors::{PlanflowError, PlanflowResult};

/// Construct kind that marks a stage boundary
pub const STAGE_KIND: &str = "stage";

/// Document version assumed when the YAML does not declare one
pub const DEFAULT_VERSION: &str = "0";

/// A parsed pipeline document
#[derive(Debug, Clone, PartialEq)]
pub struct YamlDocument {
    root: Value,
}

impl YamlDocument {
    /// Parse a document from YAML text
    pub fn parse(yaml: &str) -> PlanflowResult<Self> {
        let root: Value = serde_yaml::from_str(yaml)?;
        Ok(Self { root })
    }

    /// Wrap an already parsed value
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Root node of the document
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Serialize the document back to YAML
    pub fn to_yaml(&self) -> PlanflowResult<String> {
        serde_yaml::to_string(&self.root).map_err(Into::into)
    }

    /// Schema version declared by the document (`version:` at the root)
    pub fn version(&self) -> String {
        match self.root.get("version") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => DEFAULT_VERSION.to_string(),
        }
    }

    /// Whether a node exists at `path`
    pub fn contains(&self, path: &str) -> bool {
        self.field(path).is_ok()
    }

    /// Resolve the field at `path`
    pub fn field(&self, path: &str) -> PlanflowResult<YamlField> {
        let mut current = &self.root;
        let mut resolved = Vec::new();
        let mut fqn_parts: Vec<String> = Vec::new();
        let mut stage_fqn = None;

        for segment in parse_path(path) {
            let not_found = || PlanflowError::YamlPathNotFound {
                path: path.to_string(),
            };

            current = match current {
                Value::Sequence(seq) => {
                    let index = segment.index().ok_or_else(not_found)?;
                    let element = seq.get(index).ok_or_else(not_found)?;
                    resolved.push(Resolved::Index(index));
                    fqn_parts.push(element_name(element, index));
                    element
                }
                Value::Mapping(map) => {
                    let child = map.get(segment.key()).ok_or_else(not_found)?;
                    resolved.push(Resolved::Key(segment.key().to_string()));
                    fqn_parts.push(segment.key().to_string());
                    child
                }
                _ => return Err(not_found()),
            };

            if construct_kind(&resolved) == STAGE_KIND {
                stage_fqn = Some(fqn_parts.join("."));
            }
        }

        Ok(YamlField {
            version: self.version(),
            path: format_path(&resolved),
            name: construct_kind(&resolved),
            fqn: fqn_parts.join("."),
            stage_fqn,
            node: current.clone(),
        })
    }

    /// Find the canonical path of the node whose fully qualified name is `fqn`
    pub fn find_path_by_fqn(&self, fqn: &str) -> Option<String> {
        let mut resolved = Vec::new();
        let mut parts = Vec::new();
        find_fqn(&self.root, fqn, &mut resolved, &mut parts)
    }

    /// Replace the node at `fqn` with the YAML in `snippet`
    pub fn apply_rewrite(&mut self, fqn: &str, snippet: &str) -> PlanflowResult<()> {
        let path = self
            .find_path_by_fqn(fqn)
            .ok_or_else(|| PlanflowError::FqnNotFound { fqn: fqn.to_string() })?;

        let replacement: Value =
            serde_yaml::from_str(snippet).map_err(|e| PlanflowError::RewriteFailed {
                fqn: fqn.to_string(),
                message: e.to_string(),
            })?;

        let mut current = &mut self.root;
        for segment in parse_path(&path) {
            let next = match current {
                Value::Sequence(seq) => segment.index().and_then(|i| seq.get_mut(i)),
                Value::Mapping(map) => map.get_mut(segment.key()),
                _ => None,
            };
            current = next.ok_or_else(|| PlanflowError::RewriteFailed {
                fqn: fqn.to_string(),
                message: format!("path '{}' vanished while rewriting", path),
            })?;
        }

        *current = replacement;
        Ok(())
    }
}

fn element_name(element: &Value, index: usize) -> String {
    ["identifier", "id"]
        .iter()
        .find_map(|key| element.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| index.to_string())
}

fn find_fqn(
    value: &Value,
    target: &str,
    resolved: &mut Vec<Resolved>,
    parts: &mut Vec<String>,
) -> Option<String> {
    if !parts.is_empty() && parts.join(".") == target {
        return Some(format_path(resolved));
    }

    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                let Some(key) = key.as_str() else {
                    continue;
                };
                resolved.push(Resolved::Key(key.to_string()));
                parts.push(key.to_string());
                let found = find_fqn(child, target, resolved, parts);
                resolved.pop();
                parts.pop();
                if found.is_some() {
                    return found;
                }
            }
            None
        }
        Value::Sequence(seq) => {
            for (index, child) in seq.iter().enumerate() {
                resolved.push(Resolved::Index(index));
                parts.push(element_name(child, index));
                let found = find_fqn(child, target, resolved, parts);
                resolved.pop();
                parts.pop();
                if found.is_some() {
                    return found;
                }
            }
            None
        }
        _ => None,
    }
}

/// One resolved position in a document snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct YamlField {
    /// Schema version of the document the field came from
    pub version: String,
    /// Canonical path (`/stages/0/steps/1`)
    pub path: String,
    /// Construct kind (`stage`, `step`, ...)
    pub name: String,
    /// Fully qualified name (`pipeline.stages.build.steps.compile`)
    pub fqn: String,
    /// FQN of the enclosing stage, if any
    pub stage_fqn: Option<String>,
    /// Node content
    pub node: Value,
}

impl YamlField {
    /// The node's `type`, used to pick between creators for the same kind
    pub fn node_type(&self) -> Option<&str> {
        self.str_field("type")
    }

    pub fn identifier(&self) -> Option<&str> {
        self.str_field("identifier")
    }

    /// String value of a direct child key
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.node.get(key).and_then(Value::as_str)
    }

    /// Whether this position is a stage boundary
    pub fn is_stage(&self) -> bool {
        self.name == STAGE_KIND
    }

    /// Path of the direct child `key`
    pub fn child_path(&self, key: &str) -> String {
        format!("{}/{}", self.path.trim_end_matches('/'), key)
    }

    /// Paths of every element of the sequence under `key`
    pub fn sequence_paths(&self, key: &str) -> Vec<String> {
        let len = self
            .node
            .get(key)
            .and_then(Value::as_sequence)
            .map(|s| s.len())
            .unwrap_or(0);
        let base = self.child_path(key);
        (0..len).map(|i| format!("{}/{}", base, i)).collect()
    }

    /// Path of the element after this one, when this field is a sequence element
    ///
    /// Does not check that the sibling exists.
    pub fn next_sibling_path(&self) -> Option<String> {
        let (parent, last) = self.path.rsplit_once('/')?;
        let index: usize = last.parse().ok()?;
        Some(format!("{}/{}", parent, index + 1))
    }
}
