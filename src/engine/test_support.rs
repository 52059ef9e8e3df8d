// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Scriptable creators for engine tests

use async_trait::async_trait;
use std::time::Duration;

use crate::creators::{supported_types, Creator, PlanCreationContext, SupportedTypes, ANY_TYPE};
use crate::errors::{PlanflowError, PlanflowResult};
use crate::plan::{PartialResult, PlanNode};
use crate::yaml::YamlField;

#[derive(Clone, Copy)]
pub(crate) enum Behaviour {
    Emit,
    Fail,
    Panic,
    Sleep(Duration),
}

/// Emits one node per field and defers the sequence under `defer`
pub(crate) struct Stub {
    kind: &'static str,
    defer: Option<&'static str>,
    behaviour: Behaviour,
}

impl Stub {
    pub(crate) fn emit(kind: &'static str) -> Self {
        Self {
            kind,
            defer: None,
            behaviour: Behaviour::Emit,
        }
    }

    pub(crate) fn deferring(kind: &'static str, key: &'static str) -> Self {
        Self {
            defer: Some(key),
            ..Self::emit(kind)
        }
    }

    pub(crate) fn with(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }
}

#[async_trait]
impl Creator for Stub {
    fn name(&self) -> &str {
        "Stub"
    }

    fn supported_types(&self) -> SupportedTypes {
        supported_types(self.kind, &[ANY_TYPE])
    }

    async fn create_plan_for_field(
        &self,
        ctx: &PlanCreationContext,
        field: &YamlField,
    ) -> PlanflowResult<PartialResult> {
        match self.behaviour {
            Behaviour::Emit => {}
            Behaviour::Fail => {
                return Err(PlanflowError::creation(&field.fqn, "stub failure"));
            }
            Behaviour::Panic => panic!("stub panicked at {}", field.path),
            Behaviour::Sleep(duration) => tokio::time::sleep(duration).await,
        }

        let mut result =
            PartialResult::with_node(PlanNode::for_field(field).with_parent(ctx.parent_id()));
        if let Some(key) = self.defer {
            for path in field.sequence_paths(key) {
                result.add_dependency(path.clone(), path);
            }
        }
        Ok(result)
    }
}
