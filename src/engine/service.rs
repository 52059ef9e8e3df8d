// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! The `CreatePlan` entry point

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::driver::{DriverState, FrontierResolver};
use crate::config::EngineConfig;
use crate::creators::{default_registry, CreatorRegistry};
use crate::plan::{Dependencies, FailureKind, PlanCreationResult, PlanOutcome};

/// One top-level plan creation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatePlanRequest {
    /// Dependencies to resolve, together with the document they point into
    pub dependencies: Dependencies,

    /// Request-scoped identity handed to creators untouched
    #[serde(default)]
    pub context: HashMap<String, String>,

    /// Dependency key -> owning service, as known to the caller
    #[serde(default)]
    pub affinity: IndexMap<String, String>,
}

impl CreatePlanRequest {
    pub fn new(dependencies: Dependencies) -> Self {
        Self {
            dependencies,
            ..Default::default()
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_affinity(mut self, key: impl Into<String>, service: impl Into<String>) -> Self {
        self.affinity.insert(key.into(), service.into());
        self
    }
}

/// Plan creation service: a creator registry plus engine settings
#[derive(Debug, Clone)]
pub struct PlanCreatorService {
    registry: Arc<CreatorRegistry>,
    config: EngineConfig,
}

impl Default for PlanCreatorService {
    fn default() -> Self {
        Self::new(default_registry(), EngineConfig::default())
    }
}

impl PlanCreatorService {
    pub fn new(registry: CreatorRegistry, config: EngineConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
        }
    }

    pub fn registry(&self) -> &CreatorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Expand the requested dependencies into a complete plan
    ///
    /// Either every construct expands or the caller gets the error messages
    /// and no nodes at all.
    #[tracing::instrument(skip_all, fields(dependencies = request.dependencies.len()))]
    pub async fn create_plan(&self, request: CreatePlanRequest) -> PlanCreationResult {
        let resolver = FrontierResolver::new(
            self.registry.clone(),
            self.config.clone(),
            Arc::new(request.context),
        );

        let resolution = match resolver
            .resolve(&request.dependencies, &request.affinity)
            .await
        {
            Ok(resolution) => resolution,
            Err(e) => {
                let kind = if e.is_unexpected() {
                    FailureKind::Unexpected
                } else {
                    FailureKind::NodeErrors
                };
                tracing::warn!(error = %e, ?kind, "plan creation aborted");
                return PlanCreationResult::failure(kind, vec![e.to_string()]);
            }
        };

        if resolution.state == DriverState::DrainingError {
            tracing::warn!(errors = resolution.merged.errors.len(), "plan creation failed");
            return PlanCreationResult::failure(FailureKind::NodeErrors, resolution.merged.errors);
        }

        let merged = resolution.merged;
        let yaml = if merged.yaml_rewrites.is_empty() {
            request.dependencies.yaml
        } else {
            match resolution.document.to_yaml() {
                Ok(yaml) => yaml,
                Err(e) => {
                    return PlanCreationResult::failure(FailureKind::Unexpected, vec![e.to_string()])
                }
            }
        };

        let mut remaining = merged.outstanding;
        remaining.yaml = yaml.clone();

        tracing::info!(
            nodes = merged.nodes.len(),
            remaining = remaining.len(),
            unmatched = merged.unmatched,
            iterations = resolution.iterations,
            "plan created"
        );

        PlanCreationResult::Success(PlanOutcome {
            nodes: merged.nodes,
            remaining,
            layout: merged.layout,
            starting_node_id: merged.starting_node_id,
            preserved_node_ids: merged.preserved_node_ids,
            distributed_affinity: merged.distributed_affinity,
            yaml_updates: merged.yaml_rewrites,
            execution_input_templates: merged.execution_input_templates,
            yaml,
            unmatched: merged.unmatched,
            iterations: resolution.iterations,
        })
    }
}
