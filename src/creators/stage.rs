// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Stage creator

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{supported_types, PlanCreationContext, SupportedTypes, TypedCreator, ANY_TYPE, PARENT_ID_KEY};
use crate::errors::{PlanflowError, PlanflowResult};
use crate::plan::{Dependency, GraphLayout, LayoutNode, PartialResult, PlanNode, RollbackModeBehaviour};
use crate::yaml::{YamlField, STAGE_KIND};

/// Decoded `stage` construct
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    pub identifier: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "type")]
    pub stage_type: Option<String>,

    #[serde(default)]
    pub timeout: Option<String>,

    /// Raw steps; each one becomes its own dependency
    #[serde(default)]
    pub steps: Vec<serde_yaml::Value>,

    /// Rollback behaviour for the nodes under this stage
    #[serde(default)]
    pub rollback: Option<RollbackModeBehaviour>,
}

/// Creates the stage node and defers every step to the frontier
pub struct StageCreator;

#[async_trait]
impl TypedCreator for StageCreator {
    type Config = StageConfig;

    fn name(&self) -> &str {
        "StageCreator"
    }

    fn supported_types(&self) -> SupportedTypes {
        supported_types(STAGE_KIND, &[ANY_TYPE])
    }

    async fn create_plan_for_config(
        &self,
        ctx: &PlanCreationContext,
        field: &YamlField,
        config: StageConfig,
    ) -> PlanflowResult<PartialResult> {
        if config.steps.is_empty() {
            return Err(PlanflowError::creation(
                &field.fqn,
                format!("stage '{}' has no steps", config.identifier),
            ));
        }

        let node = PlanNode::for_field(field)
            .with_parent(ctx.parent_id())
            .with_timeout(config.timeout.clone());
        let uuid = node.uuid.clone();

        let mut result = PartialResult::with_node(node);
        for path in field.sequence_paths("steps") {
            let mut dependency = Dependency::default().with_metadata(PARENT_ID_KEY, json!(uuid));
            if let Some(behaviour) = config.rollback {
                dependency = dependency.with_rollback(behaviour);
            }
            result.add_dependency_with(path.clone(), path, dependency);
        }

        Ok(result)
    }

    fn layout_node_info(
        &self,
        ctx: &PlanCreationContext,
        field: &YamlField,
        result: &PartialResult,
    ) -> GraphLayout {
        let Some(node) = result.nodes.values().find(|n| n.fqn == field.fqn) else {
            return GraphLayout::default();
        };

        let next = field
            .next_sibling_path()
            .and_then(|path| ctx.document.field(&path).ok())
            .and_then(|sibling| sibling.identifier().map(str::to_string));

        let mut layout = GraphLayout::default();
        layout.nodes.insert(
            node.identifier.clone(),
            LayoutNode {
                node_uuid: node.uuid.clone(),
                node_type: node.node_type.clone().unwrap_or_else(|| STAGE_KIND.to_string()),
                name: node.name.clone(),
                identifier: node.identifier.clone(),
                edges: next.into_iter().collect(),
            },
        );
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creators::{CreatorRegistry, Typed};
    use crate::engine::Dispatcher;
    use crate::yaml::YamlDocument;
    use std::sync::Arc;

    const DOC: &str = r#"
stages:
  - identifier: build
    type: ci
    rollback: PRESERVE
    steps:
      - identifier: compile
      - identifier: test
  - identifier: deploy
    steps: []
"#;

    fn dispatcher() -> Dispatcher {
        Dispatcher::for_registry(Arc::new(CreatorRegistry::new().with(Typed(StageCreator))))
    }

    #[tokio::test]
    async fn test_stage_defers_steps() {
        let doc = Arc::new(YamlDocument::parse(DOC).unwrap());
        let dispatched = dispatcher().dispatch(doc, "/stages/0", None, None).await.unwrap();
        let partial = dispatched.partial;
        assert!(!partial.has_errors());

        let stage = partial.nodes.values().next().unwrap();
        assert_eq!(stage.stage_fqn.as_deref(), Some("stages.build"));
        assert_eq!(partial.dependencies.len(), 2);

        let meta = partial.dependencies.metadata_for("/stages/0/steps/1").unwrap();
        assert_eq!(meta.metadata_str(PARENT_ID_KEY), Some(stage.uuid.as_str()));
        assert_eq!(meta.rollback_mode_behaviour, RollbackModeBehaviour::Preserve);

        let layout = &partial.layout.nodes["build"];
        assert_eq!(layout.node_type, "ci");
        assert_eq!(layout.edges, vec!["deploy"]);
    }

    #[tokio::test]
    async fn test_stage_without_steps_fails() {
        let doc = Arc::new(YamlDocument::parse(DOC).unwrap());
        let dispatched = dispatcher().dispatch(doc, "/stages/1", None, None).await.unwrap();
        assert!(dispatched.partial.nodes.is_empty());
        assert!(dispatched.partial.errors[0].contains("has no steps"));
    }

    #[tokio::test]
    async fn test_stage_missing_identifier_is_decode_error() {
        let doc = Arc::new(YamlDocument::parse("stages:\n  - steps: [a]\n").unwrap());
        let dispatched = dispatcher().dispatch(doc, "/stages/0", None, None).await.unwrap();
        assert!(dispatched.partial.errors[0].starts_with("Failed to decode '/stages/0'"));
    }
}
