// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Per-invocation context handed to creators

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::engine::Dispatcher;
use crate::plan::{Dependency, PartialResult};
use crate::yaml::{YamlDocument, YamlField};

/// Metadata key under which parents pass their node uuid to children
pub const PARENT_ID_KEY: &str = "parentId";

/// Request context key that turns on execution-input materialisation
pub const EXECUTION_INPUT_KEY: &str = "executionInputEnabled";

/// Everything a creator may consult while building nodes
///
/// Metadata that has to flow down the recursion (rollback behaviour, affinity)
/// travels here explicitly rather than through shared state.
#[derive(Clone)]
pub struct PlanCreationContext {
    /// Request-scoped identity (account, org, project, execution id, ...)
    pub request: Arc<HashMap<String, String>>,

    /// Metadata of the dependency being resolved
    pub dependency: Option<Dependency>,

    /// Service that owns this part of the pipeline
    pub affinity: Option<String>,

    /// Document snapshot for the current iteration
    pub document: Arc<YamlDocument>,

    /// Field being resolved
    pub field: YamlField,

    pub execution_input_enabled: bool,

    pub(crate) dispatcher: Dispatcher,
}

impl PlanCreationContext {
    /// Value from the request context
    pub fn request_value(&self, key: &str) -> Option<&str> {
        self.request.get(key).map(String::as_str)
    }

    /// Uuid of the parent node, when the parent passed one down
    pub fn parent_id(&self) -> Option<String> {
        self.dependency
            .as_ref()
            .and_then(|d| d.metadata_str(PARENT_ID_KEY))
            .map(str::to_string)
    }

    /// Resolve a child construct in-process, within this invocation
    ///
    /// The child is matched and built exactly as a frontier entry would be,
    /// inheriting this context's rollback behaviour and affinity. Node
    /// metadata is not inherited: it was addressed to this construct, not to
    /// its children. A child no creator matches comes back as a dependency
    /// keyed by its path, so the driver carries it forward like any other
    /// unresolved sub-tree.
    pub fn resolve_child<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = PartialResult> + Send + 'a>> {
        Box::pin(async move {
            let inherited = self.dependency.as_ref().map(|d| Dependency {
                rollback_mode_behaviour: d.rollback_mode_behaviour,
                distributed_affinity: d.distributed_affinity.clone(),
                node_metadata: Default::default(),
            });

            let dispatched = self
                .dispatcher
                .dispatch(
                    self.document.clone(),
                    path,
                    inherited.clone(),
                    self.affinity.clone(),
                )
                .await;

            match dispatched {
                Some(dispatched) => dispatched.partial,
                None => {
                    let mut deferred = PartialResult::new();
                    deferred.add_dependency_with(path, path, inherited.unwrap_or_default());
                    deferred
                }
            }
        })
    }
}

impl std::fmt::Debug for PlanCreationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanCreationContext")
            .field("field", &self.field.fqn)
            .field("dependency", &self.dependency)
            .field("affinity", &self.affinity)
            .field("execution_input_enabled", &self.execution_input_enabled)
            .finish()
    }
}
