// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Creator output, the driver accumulator and the final request result

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use super::{Dependencies, Dependency, GraphLayout, PlanNode};

/// Output of one creator invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialResult {
    #[serde(default)]
    pub nodes: IndexMap<String, PlanNode>,

    /// Sub-trees discovered but not expanded by this creator
    #[serde(default)]
    pub dependencies: Dependencies,

    /// FQN -> replacement YAML
    #[serde(default)]
    pub yaml_rewrites: IndexMap<String, String>,

    #[serde(default)]
    pub errors: Vec<String>,

    #[serde(default)]
    pub layout: GraphLayout,

    #[serde(default)]
    pub starting_node_id: Option<String>,

    #[serde(default)]
    pub execution_input_template: Option<String>,
}

impl PartialResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// A result that carries only an error
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
            ..Default::default()
        }
    }

    /// A result carrying a single node
    pub fn with_node(node: PlanNode) -> Self {
        let mut result = Self::new();
        result.add_node(node);
        result
    }

    pub fn add_node(&mut self, node: PlanNode) {
        self.nodes.insert(node.uuid.clone(), node);
    }

    pub fn add_dependency(&mut self, key: impl Into<String>, path: impl Into<String>) {
        self.dependencies.insert(key, path);
    }

    pub fn add_dependency_with(
        &mut self,
        key: impl Into<String>,
        path: impl Into<String>,
        dependency: Dependency,
    ) {
        self.dependencies.insert_with(key, path, dependency);
    }

    pub fn add_rewrite(&mut self, fqn: impl Into<String>, snippet: impl Into<String>) {
        self.yaml_rewrites.insert(fqn.into(), snippet.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Fold another result into this one
    ///
    /// Used by composite creators to accumulate the results of their children.
    pub fn absorb(&mut self, other: PartialResult) {
        self.nodes.extend(other.nodes);
        self.dependencies.extend(other.dependencies);
        self.yaml_rewrites.extend(other.yaml_rewrites);
        self.errors.extend(other.errors);
        self.layout.absorb(other.layout);
        if self.starting_node_id.is_none() {
            self.starting_node_id = other.starting_node_id;
        }
        if self.execution_input_template.is_none() {
            self.execution_input_template = other.execution_input_template;
        }
    }
}

/// Accumulated state of one top-level resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedResult {
    pub nodes: IndexMap<String, PlanNode>,

    /// Dependencies no creator here could resolve
    pub outstanding: Dependencies,

    pub yaml_rewrites: IndexMap<String, String>,

    pub errors: Vec<String>,

    pub layout: GraphLayout,

    pub starting_node_id: Option<String>,

    /// Execution-input templates keyed by the FQN they were produced for
    pub execution_input_templates: IndexMap<String, String>,

    /// Dependency key -> owning service
    pub distributed_affinity: IndexMap<String, String>,

    /// Nodes to reuse rather than recreate in a rollback run
    pub preserved_node_ids: IndexSet<String>,

    /// Dependencies that matched no creator
    pub unmatched: usize,
}

impl MergedResult {
    pub fn is_fatal(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Why a request produced no plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// One or more constructs could not be expanded
    NodeErrors,
    /// Timeouts and other failures unrelated to the YAML; resubmit to retry
    Unexpected,
}

/// Error form of a plan creation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFailure {
    pub kind: FailureKind,
    pub messages: Vec<String>,
}

/// Complete plan produced for one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub nodes: IndexMap<String, PlanNode>,

    /// Dependencies left for other owners
    pub remaining: Dependencies,

    pub layout: GraphLayout,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_node_id: Option<String>,

    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub preserved_node_ids: IndexSet<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub distributed_affinity: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub yaml_updates: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub execution_input_templates: IndexMap<String, String>,

    /// Document after all rewrites
    pub yaml: String,

    pub unmatched: usize,

    pub iterations: usize,
}

impl PlanOutcome {
    /// Nodes grouped by the stage they belong to, in emission order
    pub fn nodes_by_stage(&self) -> IndexMap<Option<&str>, Vec<&PlanNode>> {
        let mut groups: IndexMap<Option<&str>, Vec<&PlanNode>> = IndexMap::new();
        for node in self.nodes.values() {
            groups.entry(node.stage_fqn.as_deref()).or_default().push(node);
        }
        groups
    }
}

/// Result of `CreatePlan`: a complete plan or a flat list of errors, never both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanCreationResult {
    Success(PlanOutcome),
    Failure(PlanFailure),
}

impl PlanCreationResult {
    pub fn failure(kind: FailureKind, messages: Vec<String>) -> Self {
        Self::Failure(PlanFailure { kind, messages })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn outcome(&self) -> Option<&PlanOutcome> {
        match self {
            Self::Success(outcome) => Some(outcome),
            Self::Failure(_) => None,
        }
    }

    pub fn error_messages(&self) -> &[String] {
        match self {
            Self::Success(_) => &[],
            Self::Failure(failure) => &failure.messages,
        }
    }

    /// Number of nodes in the plan; zero for failures
    pub fn node_count(&self) -> usize {
        self.outcome().map(|o| o.nodes.len()).unwrap_or(0)
    }
}
