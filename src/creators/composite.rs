// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Creators that expand their children in-process

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::json;

use super::{Creator, PlanCreationContext, SupportedTypes, DEFAULT_YAML_VERSIONS, PARENT_ID_KEY};
use crate::errors::PlanflowResult;
use crate::plan::{GraphLayout, PartialResult, PlanNode};
use crate::yaml::YamlField;

/// A creator built from two phases: children first, then the parent node
///
/// Wrap implementations in [`Composite`] to register them. The adapter
/// unions every child result into one and hands the ids of the children that
/// were built to [`ChildrenCreator::create_plan_for_parent`] in the order they
/// were returned. A child keyed by a dependency of the merged result was
/// deferred instead; its dependency is given the parent's uuid under
/// [`PARENT_ID_KEY`] so whoever resolves it later links it back.
#[async_trait]
pub trait ChildrenCreator: Send + Sync {
    fn name(&self) -> &str;

    fn supported_types(&self) -> SupportedTypes;

    fn supported_yaml_versions(&self) -> &[&str] {
        DEFAULT_YAML_VERSIONS
    }

    /// Child id -> the child's partial result
    ///
    /// A child that could not be expanded here is keyed by the dependency
    /// key it was deferred under.
    async fn create_plan_for_children(
        &self,
        ctx: &PlanCreationContext,
        field: &YamlField,
    ) -> PlanflowResult<IndexMap<String, PartialResult>>;

    /// Build the parent node once every child has been expanded
    async fn create_plan_for_parent(
        &self,
        ctx: &PlanCreationContext,
        field: &YamlField,
        child_ids: &[String],
    ) -> PlanflowResult<PlanNode>;

    fn starting_node_id(&self, _field: &YamlField, _result: &PartialResult) -> Option<String> {
        None
    }

    fn layout_node_info(
        &self,
        _ctx: &PlanCreationContext,
        _field: &YamlField,
        _result: &PartialResult,
    ) -> GraphLayout {
        GraphLayout::default()
    }
}

/// Adapter registering a [`ChildrenCreator`] as a [`Creator`]
pub struct Composite<C>(pub C);

#[async_trait]
impl<C: ChildrenCreator> Creator for Composite<C> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn supported_types(&self) -> SupportedTypes {
        self.0.supported_types()
    }

    fn supported_yaml_versions(&self) -> &[&str] {
        self.0.supported_yaml_versions()
    }

    async fn create_plan_for_field(
        &self,
        ctx: &PlanCreationContext,
        field: &YamlField,
    ) -> PlanflowResult<PartialResult> {
        let children = self.0.create_plan_for_children(ctx, field).await?;

        let mut result = PartialResult::new();
        let mut child_ids = Vec::with_capacity(children.len());
        let mut deferred = Vec::new();
        for (id, child) in children {
            if child.nodes.contains_key(&id) {
                child_ids.push(id);
            } else if child.dependencies.contains_key(&id) {
                deferred.push(id);
            }
            result.absorb(child);
        }

        // A failed child fails the whole construct; skip building the parent
        if result.has_errors() {
            return Ok(result);
        }

        let parent = self.0.create_plan_for_parent(ctx, field, &child_ids).await?;
        for key in &deferred {
            if let Some(meta) = result.dependencies.metadata_mut(key) {
                meta.node_metadata
                    .insert(PARENT_ID_KEY.to_string(), json!(parent.uuid));
            }
        }
        result.add_node(parent);
        Ok(result)
    }

    fn starting_node_id(&self, field: &YamlField, result: &PartialResult) -> Option<String> {
        self.0.starting_node_id(field, result)
    }

    fn layout_node_info(
        &self,
        ctx: &PlanCreationContext,
        field: &YamlField,
        result: &PartialResult,
    ) -> GraphLayout {
        self.0.layout_node_info(ctx, field, result)
    }
}
