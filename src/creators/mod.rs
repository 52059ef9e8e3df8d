// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Plan creators
//!
//! This module provides the creator contract, the registry that matches YAML
//! fields to creators, and the built-in creators for pipelines, stages and
//! steps.

mod composite;
mod context;
mod group;
mod parallel;
mod pipeline;
mod registry;
mod stage;
mod step;
mod typed;

pub use composite::{ChildrenCreator, Composite};
pub use context::{PlanCreationContext, EXECUTION_INPUT_KEY, PARENT_ID_KEY};
pub use group::StepGroupCreator;
pub use parallel::ParallelCreator;
pub use pipeline::PipelineCreator;
pub use registry::CreatorRegistry;
pub use stage::{StageConfig, StageCreator};
pub use step::{StepConfig, StepCreator, EXECUTION_INPUT_MARKER};
pub use typed::{Typed, TypedCreator};

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::errors::PlanflowResult;
use crate::plan::{GraphLayout, PartialResult};
use crate::yaml::YamlField;

/// Wildcard accepted in a creator's type set
pub const ANY_TYPE: &str = "__any__";

/// YAML versions a creator handles unless it says otherwise
pub const DEFAULT_YAML_VERSIONS: &[&str] = &["0", "1"];

/// Construct kind -> accepted `type` values
pub type SupportedTypes = HashMap<String, HashSet<String>>;

/// Build a [`SupportedTypes`] table for a single construct kind
pub fn supported_types(kind: &str, types: &[&str]) -> SupportedTypes {
    let mut table = SupportedTypes::new();
    table.insert(
        kind.to_string(),
        types.iter().map(|t| t.to_string()).collect(),
    );
    table
}

/// Trait for plan creators
///
/// A creator turns the YAML of one construct into plan nodes. Sub-trees it
/// does not expand itself are returned as dependencies for the driver.
#[async_trait]
pub trait Creator: Send + Sync {
    /// Name used in logs and listings
    fn name(&self) -> &str;

    /// Construct kinds and types this creator accepts
    fn supported_types(&self) -> SupportedTypes;

    /// Document versions this creator accepts
    fn supported_yaml_versions(&self) -> &[&str] {
        DEFAULT_YAML_VERSIONS
    }

    /// Build the plan for one field
    async fn create_plan_for_field(
        &self,
        ctx: &PlanCreationContext,
        field: &YamlField,
    ) -> PlanflowResult<PartialResult>;

    /// Rewrite the field's execution-input template before the node is built
    ///
    /// Only called when execution inputs are enabled for the request.
    fn execution_input_template(&self, _field: &mut YamlField) -> PlanflowResult<Option<String>> {
        Ok(None)
    }

    /// Node the execution should start from, if this construct defines one
    fn starting_node_id(&self, _field: &YamlField, _result: &PartialResult) -> Option<String> {
        None
    }

    /// Layout hints for the pipeline graph view
    fn layout_node_info(
        &self,
        _ctx: &PlanCreationContext,
        _field: &YamlField,
        _result: &PartialResult,
    ) -> GraphLayout {
        GraphLayout::default()
    }
}

/// Whether `creator` accepts `field` in a document of version `version`
pub fn accepts(creator: &dyn Creator, field: &YamlField, version: &str) -> bool {
    if !creator.supported_yaml_versions().contains(&version) {
        return false;
    }

    let types = creator.supported_types();
    let Some(accepted) = types.get(&field.name) else {
        return false;
    };

    accepted.contains(ANY_TYPE)
        || field
            .node_type()
            .map(|t| accepted.contains(t))
            .unwrap_or(false)
}

/// Create the standard registry with all built-in creators
///
/// Registration order is match priority: the type-specific step creators come
/// before the catch-all step creator.
pub fn default_registry() -> CreatorRegistry {
    let mut registry = CreatorRegistry::new();
    registry.register(PipelineCreator);
    registry.register(Typed(StageCreator));
    registry.register(ParallelCreator);
    registry.register(Composite(StepGroupCreator));
    registry.register(Typed(StepCreator));
    registry
}
