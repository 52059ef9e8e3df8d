// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Fallback step creator

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use super::{supported_types, PlanCreationContext, SupportedTypes, TypedCreator, ANY_TYPE};
use crate::errors::{PlanflowError, PlanflowResult};
use crate::plan::{PartialResult, PlanNode};
use crate::yaml::YamlField;

/// Runtime input expression rewritten when execution inputs are enabled
pub const EXECUTION_INPUT_MARKER: &str = "<+input>";

const EXECUTION_INPUT_EXPRESSION: &str = "<+input>.executionInput()";

/// Decoded `step` construct
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "type")]
    pub step_type: Option<String>,

    /// Duration such as `10m` or `1h30m`
    #[serde(default)]
    pub timeout: Option<String>,

    /// Type-specific settings, carried as the node payload
    #[serde(default)]
    pub spec: Option<serde_json::Value>,
}

fn timeout_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+(ms|s|m|h|d|w))+$").expect("timeout pattern is valid"))
}

/// Creates a leaf node for any step no more specific creator claimed
pub struct StepCreator;

#[async_trait]
impl TypedCreator for StepCreator {
    type Config = StepConfig;

    fn name(&self) -> &str {
        "StepCreator"
    }

    fn supported_types(&self) -> SupportedTypes {
        supported_types("step", &[ANY_TYPE])
    }

    async fn create_plan_for_config(
        &self,
        ctx: &PlanCreationContext,
        field: &YamlField,
        config: StepConfig,
    ) -> PlanflowResult<PartialResult> {
        if let Some(ref timeout) = config.timeout {
            if !timeout_pattern().is_match(timeout) {
                return Err(PlanflowError::creation(
                    &field.fqn,
                    format!("invalid timeout '{}'", timeout),
                ));
            }
        }

        let node = PlanNode::for_field(field)
            .with_parent(ctx.parent_id())
            .with_timeout(config.timeout)
            .with_payload(config.spec.unwrap_or_default());

        Ok(PartialResult::with_node(node))
    }

    fn execution_input_template(&self, field: &mut YamlField) -> PlanflowResult<Option<String>> {
        let yaml = serde_yaml::to_string(&field.node)?;
        if !yaml.contains(EXECUTION_INPUT_MARKER) {
            return Ok(None);
        }

        let template = yaml
            .replace(EXECUTION_INPUT_EXPRESSION, EXECUTION_INPUT_MARKER)
            .replace(EXECUTION_INPUT_MARKER, EXECUTION_INPUT_EXPRESSION);
        field.node = serde_yaml::from_str(&template).map_err(|e| PlanflowError::RewriteFailed {
            fqn: field.fqn.clone(),
            message: e.to_string(),
        })?;

        Ok(Some(template))
    }
}
