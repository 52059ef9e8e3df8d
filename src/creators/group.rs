// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Step group creator

use async_trait::async_trait;
use indexmap::IndexMap;

use super::{supported_types, ChildrenCreator, PlanCreationContext, SupportedTypes};
use crate::errors::{PlanflowError, PlanflowResult};
use crate::plan::{PartialResult, PlanNode};
use crate::yaml::YamlField;

/// Expands `type: group` steps in one invocation, children before the group node
pub struct StepGroupCreator;

#[async_trait]
impl ChildrenCreator for StepGroupCreator {
    fn name(&self) -> &str {
        "StepGroupCreator"
    }

    fn supported_types(&self) -> SupportedTypes {
        supported_types("step", &["group"])
    }

    async fn create_plan_for_children(
        &self,
        ctx: &PlanCreationContext,
        field: &YamlField,
    ) -> PlanflowResult<IndexMap<String, PartialResult>> {
        let paths = field.sequence_paths("steps");
        if paths.is_empty() {
            return Err(PlanflowError::creation(&field.fqn, "step group has no steps"));
        }

        let mut children = IndexMap::new();
        for path in paths {
            let child_fqn = ctx.document.field(&path)?.fqn;
            let partial = ctx.resolve_child(&path).await;

            // A deferred child has no node yet and stays keyed by its dependency
            let id = partial
                .nodes
                .values()
                .find(|n| n.fqn == child_fqn)
                .map(|n| n.uuid.clone())
                .unwrap_or(path);
            children.insert(id, partial);
        }
        Ok(children)
    }

    async fn create_plan_for_parent(
        &self,
        ctx: &PlanCreationContext,
        field: &YamlField,
        child_ids: &[String],
    ) -> PlanflowResult<PlanNode> {
        Ok(PlanNode::for_field(field)
            .with_parent(ctx.parent_id())
            .with_children(child_ids.to_vec()))
    }
}
