// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Parallel step creator

use async_trait::async_trait;
use serde_json::json;

use super::{supported_types, Creator, PlanCreationContext, SupportedTypes, PARENT_ID_KEY};
use crate::errors::{PlanflowError, PlanflowResult};
use crate::plan::{Dependency, PartialResult, PlanNode};
use crate::yaml::YamlField;

/// Creates a fork node for `type: parallel` steps; branches go to the frontier
pub struct ParallelCreator;

#[async_trait]
impl Creator for ParallelCreator {
    fn name(&self) -> &str {
        "ParallelCreator"
    }

    fn supported_types(&self) -> SupportedTypes {
        supported_types("step", &["parallel"])
    }

    async fn create_plan_for_field(
        &self,
        ctx: &PlanCreationContext,
        field: &YamlField,
    ) -> PlanflowResult<PartialResult> {
        let branches = field.sequence_paths("steps");
        if branches.is_empty() {
            return Err(PlanflowError::creation(&field.fqn, "parallel step has no branches"));
        }

        let node = PlanNode::for_field(field).with_parent(ctx.parent_id());
        let uuid = node.uuid.clone();

        let mut result = PartialResult::with_node(node);
        for path in branches {
            let dependency = Dependency::default().with_metadata(PARENT_ID_KEY, json!(uuid));
            result.add_dependency_with(path.clone(), path, dependency);
        }
        Ok(result)
    }
}
