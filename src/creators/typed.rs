// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Creators that work on a decoded config struct instead of raw YAML

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{Creator, PlanCreationContext, SupportedTypes, DEFAULT_YAML_VERSIONS};
use crate::errors::{PlanflowError, PlanflowResult};
use crate::plan::{GraphLayout, PartialResult};
use crate::yaml::YamlField;

/// A creator whose field is decoded into `Config` before plan creation
///
/// Wrap implementations in [`Typed`] to register them. A field that does not
/// decode fails that invocation with [`PlanflowError::Decode`].
#[async_trait]
pub trait TypedCreator: Send + Sync {
    type Config: DeserializeOwned + Send + Sync;

    fn name(&self) -> &str;

    fn supported_types(&self) -> SupportedTypes;

    fn supported_yaml_versions(&self) -> &[&str] {
        DEFAULT_YAML_VERSIONS
    }

    async fn create_plan_for_config(
        &self,
        ctx: &PlanCreationContext,
        field: &YamlField,
        config: Self::Config,
    ) -> PlanflowResult<PartialResult>;

    fn execution_input_template(&self, _field: &mut YamlField) -> PlanflowResult<Option<String>> {
        Ok(None)
    }

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

/// Adapter registering a [`TypedCreator`] as a [`Creator`]
pub struct Typed<C>(pub C);

/// Decode a field's node into `T`
pub fn decode<T: DeserializeOwned>(field: &YamlField) -> PlanflowResult<T> {
    serde_yaml::from_value(field.node.clone()).map_err(|e| PlanflowError::Decode {
        path: field.path.clone(),
        message: e.to_string(),
    })
}

#[async_trait]
impl<C: TypedCreator> Creator for Typed<C> {
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
        let config: C::Config = decode(field)?;
        self.0.create_plan_for_config(ctx, field, config).await
    }

    fn execution_input_template(&self, field: &mut YamlField) -> PlanflowResult<Option<String>> {
        self.0.execution_input_template(field)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::YamlDocument;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Retry {
        attempts: u32,
    }

    #[test]
    fn test_decode() {
        let doc = YamlDocument::parse("retry:\n  attempts: 3\n").unwrap();
        let retry: Retry = decode(&doc.field("/retry").unwrap()).unwrap();
        assert_eq!(retry.attempts, 3);
    }

    #[test]
    fn test_decode_error_names_path() {
        let doc = YamlDocument::parse("retry:\n  attempts: many\n").unwrap();
        let err = decode::<Retry>(&doc.field("/retry").unwrap()).unwrap_err();
        match err {
            PlanflowError::Decode { path, .. } => assert_eq!(path, "/retry"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_typed_adapter_reports_decode_failure() {
        use crate::creators::{CreatorRegistry, StageCreator};
        use crate::engine::Dispatcher;
        use std::sync::Arc;

        let dispatcher =
            Dispatcher::for_registry(Arc::new(CreatorRegistry::new().with(Typed(StageCreator))));
        let doc = Arc::new(YamlDocument::parse("stages:\n  - identifier: [1, 2]\n").unwrap());

        let dispatched =
            tokio_test::block_on(dispatcher.dispatch(doc, "/stages/0", None, None)).unwrap();
        assert!(dispatched.partial.nodes.is_empty());
        assert!(dispatched.partial.errors[0].contains("Failed to decode '/stages/0'"));
    }
}
