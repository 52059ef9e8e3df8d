// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Per-node dispatch: match a field to a creator and run it in isolation

use std::collections::HashMap;
use std::sync::Arc;

use super::propagation::{resolve_affinity, tag_affinity, tag_stage_fqn};
use crate::config::EngineConfig;
use crate::creators::{CreatorRegistry, PlanCreationContext, EXECUTION_INPUT_KEY};
use crate::plan::{Dependency, PartialResult};
use crate::yaml::YamlDocument;

/// Result of dispatching one frontier entry
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub partial: PartialResult,
    /// FQN of the resolved field, or the raw path when it did not resolve
    pub fqn: String,
    /// Affinity the entry was resolved under
    pub affinity: Option<String>,
}

/// Matches fields to creators and runs them
///
/// Cheap to clone; one instance is shared by every task of a request.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<CreatorRegistry>,
    service_name: Arc<str>,
    execution_input_enabled: bool,
    request: Arc<HashMap<String, String>>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<CreatorRegistry>,
        config: &EngineConfig,
        request: Arc<HashMap<String, String>>,
    ) -> Self {
        let execution_input_enabled = config.execution_input_enabled
            || request
                .get(EXECUTION_INPUT_KEY)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false);

        Self {
            registry,
            service_name: Arc::from(config.service_name.as_str()),
            execution_input_enabled,
            request,
        }
    }

    /// Dispatcher with the default engine configuration and an empty request
    pub fn for_registry(registry: Arc<CreatorRegistry>) -> Self {
        Self::new(registry, &EngineConfig::default(), Arc::new(HashMap::new()))
    }

    pub fn registry(&self) -> &CreatorRegistry {
        &self.registry
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Resolve the field at `path` with the first matching creator
    ///
    /// Returns `None` when no creator accepts the field. Every failure after
    /// that point, including a path that does not resolve, comes back as a
    /// partial result carrying a single error.
    ///
    /// The execution-input template is applied to the field before the
    /// creator runs, so typed creators decode the rewritten node.
    pub async fn dispatch(
        &self,
        document: Arc<YamlDocument>,
        path: &str,
        dependency: Option<Dependency>,
        affinity_hint: Option<String>,
    ) -> Option<Dispatched> {
        let mut field = match document.field(path) {
            Ok(field) => field,
            Err(e) => {
                return Some(Dispatched {
                    partial: PartialResult::from_error(e.to_string()),
                    fqn: path.to_string(),
                    affinity: affinity_hint,
                })
            }
        };

        let creator = self.registry.find(&field, &field.version)?;
        let affinity = resolve_affinity(affinity_hint, &field, &self.service_name);

        tracing::debug!(
            creator = creator.name(),
            fqn = %field.fqn,
            affinity = ?affinity,
            "dispatching"
        );

        let template = if self.execution_input_enabled {
            match creator.execution_input_template(&mut field) {
                Ok(template) => template,
                Err(e) => {
                    return Some(Dispatched {
                        partial: PartialResult::from_error(e.to_string()),
                        fqn: field.fqn,
                        affinity,
                    })
                }
            }
        } else {
            None
        };

        let ctx = PlanCreationContext {
            request: self.request.clone(),
            dependency,
            affinity: affinity.clone(),
            document,
            field: field.clone(),
            execution_input_enabled: self.execution_input_enabled,
            dispatcher: self.clone(),
        };

        let mut partial = match creator.create_plan_for_field(&ctx, &field).await {
            Ok(mut partial) => {
                if partial.starting_node_id.is_none() {
                    partial.starting_node_id = creator.starting_node_id(&field, &partial);
                }
                let layout = creator.layout_node_info(&ctx, &field, &partial);
                partial.layout.absorb(layout);
                if partial.execution_input_template.is_none() {
                    partial.execution_input_template = template;
                }
                partial
            }
            Err(e) => {
                tracing::debug!(fqn = %field.fqn, error = %e, "creator failed");
                PartialResult::from_error(e.to_string())
            }
        };

        tag_stage_fqn(&mut partial, field.stage_fqn.as_deref());
        tag_affinity(&mut partial, affinity.as_deref());

        Some(Dispatched {
            partial,
            fqn: field.fqn,
            affinity,
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("service_name", &self.service_name)
            .field("execution_input_enabled", &self.execution_input_enabled)
            .finish()
    }
}
