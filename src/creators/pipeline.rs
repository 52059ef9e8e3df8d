// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Pipeline creator: the root node plus one dependency per stage

use async_trait::async_trait;
use serde_json::json;

use super::{supported_types, Creator, PlanCreationContext, SupportedTypes, ANY_TYPE, PARENT_ID_KEY};
use crate::errors::PlanflowResult;
use crate::plan::{Dependency, GraphLayout, PartialResult, PlanNode};
use crate::yaml::YamlField;

/// Creates the `pipeline` node and defers every stage to the frontier
pub struct PipelineCreator;

#[async_trait]
impl Creator for PipelineCreator {
    fn name(&self) -> &str {
        "PipelineCreator"
    }

    fn supported_types(&self) -> SupportedTypes {
        supported_types("pipeline", &[ANY_TYPE])
    }

    async fn create_plan_for_field(
        &self,
        ctx: &PlanCreationContext,
        field: &YamlField,
    ) -> PlanflowResult<PartialResult> {
        let node = PlanNode::for_field(field).with_parent(ctx.parent_id());
        let uuid = node.uuid.clone();

        let mut result = PartialResult::with_node(node);
        for path in field.sequence_paths("stages") {
            let dependency = Dependency::default().with_metadata(PARENT_ID_KEY, json!(uuid));
            result.add_dependency_with(path.clone(), path, dependency);
        }

        tracing::debug!(
            fqn = %field.fqn,
            stages = result.dependencies.len(),
            "pipeline node created"
        );
        Ok(result)
    }

    fn starting_node_id(&self, _field: &YamlField, result: &PartialResult) -> Option<String> {
        result
            .nodes
            .values()
            .find(|n| n.kind == "pipeline")
            .map(|n| n.uuid.clone())
    }

    fn layout_node_info(
        &self,
        _ctx: &PlanCreationContext,
        field: &YamlField,
        _result: &PartialResult,
    ) -> GraphLayout {
        let first_stage = field
            .node
            .get("stages")
            .and_then(|s| s.get(0))
            .and_then(|s| s.get("identifier"))
            .and_then(|id| id.as_str());

        GraphLayout {
            starting_node_ids: first_stage.map(|id| vec![id.to_string()]).unwrap_or_default(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creators::CreatorRegistry;
    use crate::engine::Dispatcher;
    use crate::yaml::YamlDocument;
    use std::sync::Arc;

    const DOC: &str = r#"
pipeline:
  identifier: demo
  stages:
    - identifier: build
      steps:
        - identifier: compile
    - identifier: deploy
      steps:
        - identifier: ship
"#;

    #[tokio::test]
    async fn test_pipeline_defers_stages() {
        let registry = CreatorRegistry::new().with(PipelineCreator);
        let dispatcher = Dispatcher::for_registry(Arc::new(registry));
        let doc = Arc::new(YamlDocument::parse(DOC).unwrap());

        let dispatched = dispatcher.dispatch(doc, "/pipeline", None, None).await.unwrap();
        let partial = dispatched.partial;

        assert_eq!(partial.nodes.len(), 1);
        let pipeline = partial.nodes.values().next().unwrap();
        assert_eq!(pipeline.fqn, "pipeline");

        assert_eq!(
            partial.dependencies.keys().collect::<Vec<_>>(),
            vec!["/pipeline/stages/0", "/pipeline/stages/1"]
        );
        let meta = partial.dependencies.metadata_for("/pipeline/stages/1").unwrap();
        assert_eq!(meta.metadata_str(PARENT_ID_KEY), Some(pipeline.uuid.as_str()));

        assert_eq!(partial.starting_node_id.as_deref(), Some(pipeline.uuid.as_str()));
        assert_eq!(partial.layout.starting_node_ids, vec!["build"]);
    }
}
