// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Frontier resolution driver
//!
//! Resolves a set of dependencies by dispatching the whole frontier as one
//! batch, merging the results, and repeating with whatever the batch
//! discovered until nothing new turns up or a batch fails.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinError;

use super::dispatcher::{Dispatched, Dispatcher};
use super::merger::{merge_batch, FrontierEntry};
use crate::config::EngineConfig;
use crate::creators::CreatorRegistry;
use crate::errors::{PlanflowError, PlanflowResult};
use crate::plan::{Dependencies, MergedResult, PartialResult};
use crate::yaml::YamlDocument;

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Frontier is non-empty
    Active,
    /// A batch reported errors; nothing further is scheduled
    DrainingError,
    /// Frontier is empty and no batch failed
    Done,
}

/// Outcome of driving one request to completion
#[derive(Debug)]
pub struct Resolution {
    pub merged: MergedResult,
    /// Document after every rewrite
    pub document: Arc<YamlDocument>,
    pub iterations: usize,
    pub state: DriverState,
}

/// Runs the frontier loop for one request
pub struct FrontierResolver {
    dispatcher: Dispatcher,
    config: EngineConfig,
}

impl FrontierResolver {
    pub fn new(
        registry: Arc<CreatorRegistry>,
        config: EngineConfig,
        request: Arc<HashMap<String, String>>,
    ) -> Self {
        let dispatcher = Dispatcher::new(registry, &config, request);
        Self { dispatcher, config }
    }

    /// Resolve `initial` until the frontier is empty or a batch fails
    ///
    /// `affinity` seeds the dependency -> owner map with what the caller
    /// already knows. Timeouts and runaway expansion are returned as errors;
    /// creator failures end in [`DriverState::DrainingError`] with the messages
    /// in `merged.errors`. An invalid engine configuration is rejected before
    /// anything is dispatched.
    pub async fn resolve(
        &self,
        initial: &Dependencies,
        affinity: &IndexMap<String, String>,
    ) -> PlanflowResult<Resolution> {
        self.config.validate()?;
        initial.validate()?;
        let mut document = Arc::new(YamlDocument::parse(&initial.yaml)?);

        let mut merged = MergedResult::default();
        merged.distributed_affinity.extend(affinity.clone());

        // Keys the caller claimed are never resolved a second time
        let claimed: HashSet<String> = initial.keys().map(str::to_string).collect();
        let mut seen: HashSet<String> = HashSet::new();

        let mut frontier = initial.clone();
        let mut iterations = 0;
        let mut state = if frontier.is_empty() {
            DriverState::Done
        } else {
            DriverState::Active
        };

        while state == DriverState::Active {
            if iterations >= self.config.max_iterations {
                return Err(PlanflowError::IterationLimitExceeded {
                    limit: self.config.max_iterations,
                });
            }
            iterations += 1;

            let entries: Vec<FrontierEntry> = frontier
                .iter()
                .map(|(key, path, meta)| FrontierEntry {
                    key: key.to_string(),
                    path: path.to_string(),
                    dependency: meta.cloned(),
                })
                .collect();
            seen.extend(entries.iter().map(|e| e.key.clone()));

            tracing::debug!(iteration = iterations, entries = entries.len(), "dispatching batch");

            let batch = self
                .run_batch(iterations, &document, entries, &merged.distributed_affinity)
                .await?;
            let merge = merge_batch(&mut merged, &mut document, batch);

            if merge.is_fatal() {
                tracing::debug!(
                    iteration = iterations,
                    errors = merge.errors.len(),
                    "batch failed"
                );
                merged.errors = merge.errors;
                state = DriverState::DrainingError;
                continue;
            }

            let mut next = merge.next;
            next.retain(|key| !claimed.contains(key) && !seen.contains(key));
            state = if next.is_empty() {
                DriverState::Done
            } else {
                DriverState::Active
            };
            frontier = next;
        }

        tracing::debug!(
            iterations,
            nodes = merged.nodes.len(),
            outstanding = merged.outstanding.len(),
            "frontier resolved"
        );

        Ok(Resolution {
            merged,
            document,
            iterations,
            state,
        })
    }

    /// Dispatch one frontier on a bounded pool and wait for every entry
    async fn run_batch(
        &self,
        iteration: usize,
        document: &Arc<YamlDocument>,
        entries: Vec<FrontierEntry>,
        affinity: &IndexMap<String, String>,
    ) -> PlanflowResult<Vec<(FrontierEntry, Option<Dispatched>)>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut handles = Vec::with_capacity(entries.len());

        for entry in &entries {
            let hint = entry
                .dependency
                .as_ref()
                .and_then(|d| d.distributed_affinity.clone())
                .or_else(|| affinity.get(&entry.key).cloned());
            let dispatcher = self.dispatcher.clone();
            let document = document.clone();
            let semaphore = semaphore.clone();
            let path = entry.path.clone();
            let dependency = entry.dependency.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                dispatcher.dispatch(document, &path, dependency, hint).await
            }));
        }

        let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        let collect = async move {
            let mut results = Vec::with_capacity(entries.len());
            for (entry, handle) in entries.into_iter().zip(handles) {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        let error = PlanflowError::WorkerPanicked {
                            fqn: entry.path.clone(),
                            message: panic_message(e),
                        };
                        tracing::error!(path = %entry.path, error = %error, "creator task failed");
                        Some(Dispatched {
                            partial: PartialResult::from_error(error.to_string()),
                            fqn: entry.path.clone(),
                            affinity: None,
                        })
                    }
                };
                results.push((entry, result));
            }
            results
        };

        match tokio::time::timeout(self.config.batch_timeout(), collect).await {
            Ok(results) => Ok(results),
            Err(_) => {
                for handle in abort_handles {
                    handle.abort();
                }
                tracing::error!(
                    iteration,
                    seconds = self.config.batch_timeout_secs,
                    "batch timed out"
                );
                Err(PlanflowError::ResolutionTimeout {
                    iteration,
                    seconds: self.config.batch_timeout_secs,
                })
            }
        }
    }
}

fn panic_message(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{Behaviour, Stub};
    use crate::plan::{Dependency, RollbackModeBehaviour};
    use std::time::Duration;

    const DOC: &str = r#"
stages:
  - identifier: build
    steps:
      - identifier: compile
      - identifier: test
  - identifier: deploy
    steps:
      - identifier: ship
"#;

    fn resolver(registry: CreatorRegistry) -> FrontierResolver {
        FrontierResolver::new(
            Arc::new(registry),
            EngineConfig::default(),
            Arc::new(HashMap::new()),
        )
    }

    fn deps() -> Dependencies {
        Dependencies::new(DOC).with_entry("k1", "/stages/0")
    }

    #[tokio::test]
    async fn test_single_node_no_dependencies() {
        let resolution = resolver(CreatorRegistry::new().with(Stub::emit("stage")))
            .resolve(&deps(), &IndexMap::new())
            .await
            .unwrap();

        assert_eq!(resolution.state, DriverState::Done);
        assert_eq!(resolution.iterations, 1);
        assert_eq!(resolution.merged.nodes.len(), 1);
        assert!(resolution.merged.outstanding.is_empty());
    }

    #[tokio::test]
    async fn test_stage_then_step_takes_two_iterations() {
        let registry = CreatorRegistry::new()
            .with(Stub::deferring("stage", "steps"))
            .with(Stub::emit("step"));

        let resolution = resolver(registry)
            .resolve(&deps(), &IndexMap::new())
            .await
            .unwrap();

        assert_eq!(resolution.state, DriverState::Done);
        assert_eq!(resolution.iterations, 2);
        // build, compile, test
        assert_eq!(resolution.merged.nodes.len(), 3);
        let stages: HashSet<_> = resolution
            .merged
            .nodes
            .values()
            .map(|n| n.stage_fqn.clone())
            .collect();
        assert_eq!(stages, HashSet::from([Some("stages.build".to_string())]));
    }

    #[tokio::test]
    async fn test_step_error_drains() {
        let registry = CreatorRegistry::new()
            .with(Stub::deferring("stage", "steps"))
            .with(Stub::emit("step").with(Behaviour::Fail));

        let resolution = resolver(registry)
            .resolve(&deps(), &IndexMap::new())
            .await
            .unwrap();

        assert_eq!(resolution.state, DriverState::DrainingError);
        // one message per failed step, none dropped
        assert_eq!(
            resolution.merged.errors,
            vec![
                "Failed to create plan for 'stages.build.steps.compile': stub failure",
                "Failed to create plan for 'stages.build.steps.test': stub failure",
            ]
        );
    }

    #[tokio::test]
    async fn test_preserve_marks_nodes() {
        let registry = CreatorRegistry::new()
            .with(Stub::deferring("stage", "steps"))
            .with(Stub::emit("step"));
        let deps = Dependencies::new(DOC)
            .with_dependency(
                "k1",
                "/stages/0",
                Dependency::default().with_rollback(RollbackModeBehaviour::Preserve),
            )
            .with_entry("k2", "/stages/1");

        let resolution = resolver(registry)
            .resolve(&deps, &IndexMap::new())
            .await
            .unwrap();
        let merged = resolution.merged;

        let preserved_fqns: HashSet<&str> = merged
            .nodes
            .values()
            .filter(|n| merged.preserved_node_ids.contains(&n.uuid))
            .map(|n| n.fqn.as_str())
            .collect();
        assert_eq!(
            preserved_fqns,
            HashSet::from([
                "stages.build",
                "stages.build.steps.compile",
                "stages.build.steps.test"
            ])
        );
        assert_eq!(merged.nodes.len(), 5);
    }

    #[tokio::test]
    async fn test_zero_creators_leaves_everything_outstanding() {
        let deps = Dependencies::new(DOC)
            .with_dependency("k1", "/stages/0", Dependency::default().with_affinity("svc-a"))
            .with_entry("k2", "/stages/1/steps/0");

        let resolution = resolver(CreatorRegistry::new())
            .resolve(&deps, &IndexMap::new())
            .await
            .unwrap();

        assert_eq!(resolution.state, DriverState::Done);
        assert!(resolution.merged.nodes.is_empty());
        assert_eq!(resolution.merged.outstanding.entries, deps.entries);
        assert_eq!(resolution.merged.outstanding.metadata, deps.metadata);
        assert_eq!(resolution.merged.unmatched, 2);
    }

    #[tokio::test]
    async fn test_affinity_reaches_grandchildren() {
        const NESTED: &str = r#"
stages:
  - identifier: build
    steps:
      - identifier: outer
        steps:
          - identifier: inner
            steps:
              - identifier: leaf
"#;
        let registry = CreatorRegistry::new()
            .with(Stub::deferring("stage", "steps"))
            .with(Stub::deferring("step", "steps"));
        let deps = Dependencies::new(NESTED).with_entry("k1", "/stages/0");
        let mut affinity = IndexMap::new();
        affinity.insert("k1".to_string(), "svc-a".to_string());

        let resolution = resolver(registry).resolve(&deps, &affinity).await.unwrap();
        let map = &resolution.merged.distributed_affinity;

        assert_eq!(resolution.iterations, 4);
        for key in [
            "k1",
            "/stages/0/steps/0",
            "/stages/0/steps/0/steps/0",
            "/stages/0/steps/0/steps/0/steps/0",
        ] {
            assert_eq!(map.get(key).map(String::as_str), Some("svc-a"), "{key}");
        }
    }

    /// Stage creator that hands its steps to another service
    struct Handoff;

    #[async_trait::async_trait]
    impl crate::creators::Creator for Handoff {
        fn name(&self) -> &str {
            "Handoff"
        }

        fn supported_types(&self) -> crate::creators::SupportedTypes {
            crate::creators::supported_types("stage", &["remote"])
        }

        async fn create_plan_for_field(
            &self,
            _ctx: &crate::creators::PlanCreationContext,
            field: &crate::yaml::YamlField,
        ) -> PlanflowResult<PartialResult> {
            let mut result = PartialResult::with_node(crate::plan::PlanNode::for_field(field));
            for path in field.sequence_paths("steps") {
                result.add_dependency_with(
                    path.clone(),
                    path,
                    Dependency::default().with_affinity("svc-b"),
                );
            }
            Ok(result)
        }
    }

    #[tokio::test]
    async fn test_inherited_affinity_crosses_stage_until_creator_overrides() {
        const OWNED: &str = r#"
pipeline:
  stages:
    - identifier: build
      steps:
        - identifier: compile
    - identifier: deploy
      type: remote
      steps:
        - identifier: ship
          steps:
            - identifier: verify
"#;
        let registry = CreatorRegistry::new()
            .with(Stub::deferring("pipeline", "stages"))
            .with(Handoff)
            .with(Stub::deferring("stage", "steps"))
            .with(Stub::deferring("step", "steps"));
        let config = EngineConfig::default().with_service_name("ci-service");
        let resolver = FrontierResolver::new(Arc::new(registry), config, Arc::new(HashMap::new()));

        let deps = Dependencies::new(OWNED).with_entry("/pipeline", "/pipeline");
        let mut affinity = IndexMap::new();
        affinity.insert("/pipeline".to_string(), "svc-a".to_string());

        let resolution = resolver.resolve(&deps, &affinity).await.unwrap();
        let map = &resolution.merged.distributed_affinity;

        assert_eq!(resolution.state, DriverState::Done);
        // The hint outranks the stage boundary's claim by the local service
        for key in [
            "/pipeline",
            "/pipeline/stages/0",
            "/pipeline/stages/0/steps/0",
            "/pipeline/stages/1",
        ] {
            assert_eq!(map.get(key).map(String::as_str), Some("svc-a"), "{key}");
        }
        // An owner set by a creator holds for everything below it
        for key in ["/pipeline/stages/1/steps/0", "/pipeline/stages/1/steps/0/steps/0"] {
            assert_eq!(map.get(key).map(String::as_str), Some("svc-b"), "{key}");
        }
        assert!(!map.values().any(|owner| owner == "ci-service"));
    }

    #[tokio::test]
    async fn test_stage_without_hint_claimed_by_service() {
        let registry = CreatorRegistry::new()
            .with(Stub::deferring("stage", "steps"))
            .with(Stub::emit("step"));
        let config = EngineConfig::default().with_service_name("ci-service");
        let resolver = FrontierResolver::new(Arc::new(registry), config, Arc::new(HashMap::new()));

        let resolution = resolver.resolve(&deps(), &IndexMap::new()).await.unwrap();
        let map = &resolution.merged.distributed_affinity;
        assert_eq!(map["k1"], "ci-service");
        assert_eq!(map["/stages/0/steps/1"], "ci-service");
    }

    #[tokio::test]
    async fn test_claimed_keys_are_not_resolved_again() {
        // The stage rediscovers a step the caller already claimed
        let registry = CreatorRegistry::new()
            .with(Stub::deferring("stage", "steps"))
            .with(Stub::emit("step"));
        let deps = deps().with_entry("/stages/0/steps/0", "/stages/0/steps/0");

        let resolution = resolver(registry)
            .resolve(&deps, &IndexMap::new())
            .await
            .unwrap();

        let compiles = resolution
            .merged
            .nodes
            .values()
            .filter(|n| n.fqn == "stages.build.steps.compile")
            .count();
        assert_eq!(compiles, 1);
        assert_eq!(resolution.merged.nodes.len(), 3);
    }

    #[tokio::test]
    async fn test_panic_is_isolated_to_its_entry() {
        let registry = CreatorRegistry::new()
            .with(Stub::deferring("stage", "steps"))
            .with(Stub::emit("step").with(Behaviour::Panic));

        let resolution = resolver(registry)
            .resolve(&deps(), &IndexMap::new())
            .await
            .unwrap();

        assert_eq!(resolution.state, DriverState::DrainingError);
        assert_eq!(resolution.merged.errors.len(), 2);
        assert!(resolution.merged.errors[0].contains("panicked"));
        assert!(resolution.merged.errors[0].contains("stub panicked at /stages/0/steps/0"));
    }

    #[tokio::test]
    async fn test_batch_timeout() {
        let registry = CreatorRegistry::new()
            .with(Stub::emit("stage").with(Behaviour::Sleep(Duration::from_secs(30))));
        let config = EngineConfig {
            batch_timeout_secs: 1,
            ..Default::default()
        };
        let resolver = FrontierResolver::new(Arc::new(registry), config, Arc::new(HashMap::new()));

        let result = resolver.resolve(&deps(), &IndexMap::new()).await;
        assert!(matches!(
            result,
            Err(PlanflowError::ResolutionTimeout { iteration: 1, seconds: 1 })
        ));
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let registry = CreatorRegistry::new()
            .with(Stub::deferring("stage", "steps"))
            .with(Stub::emit("step"));
        let config = EngineConfig {
            max_iterations: 1,
            ..Default::default()
        };
        let resolver = FrontierResolver::new(Arc::new(registry), config, Arc::new(HashMap::new()));

        let result = resolver.resolve(&deps(), &IndexMap::new()).await;
        assert!(matches!(
            result,
            Err(PlanflowError::IterationLimitExceeded { limit: 1 })
        ));
    }

    #[tokio::test]
    async fn test_single_permit_still_completes() {
        let registry = CreatorRegistry::new()
            .with(Stub::deferring("stage", "steps"))
            .with(Stub::emit("step"));
        let config = EngineConfig::default().with_max_concurrency(1);
        let resolver = FrontierResolver::new(Arc::new(registry), config, Arc::new(HashMap::new()));
        let deps = deps().with_entry("k2", "/stages/1");

        let resolution = resolver.resolve(&deps, &IndexMap::new()).await.unwrap();
        assert_eq!(resolution.merged.nodes.len(), 5);
    }

    #[tokio::test]
    async fn test_zero_permits_rejected_before_dispatch() {
        let config = EngineConfig {
            batch_timeout_secs: 2,
            ..Default::default()
        }
        .with_max_concurrency(0);
        let resolver = FrontierResolver::new(
            Arc::new(CreatorRegistry::new().with(Stub::emit("stage"))),
            config,
            Arc::new(HashMap::new()),
        );

        let start = std::time::Instant::now();
        let result = resolver.resolve(&deps(), &IndexMap::new()).await;

        assert!(start.elapsed() < Duration::from_secs(1));
        match result {
            Err(PlanflowError::InvalidConfig { reason }) => {
                assert!(reason.contains("max_concurrency"))
            }
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_request_is_done() {
        let resolution = resolver(CreatorRegistry::new())
            .resolve(&Dependencies::new(DOC), &IndexMap::new())
            .await
            .unwrap();
        assert_eq!(resolution.state, DriverState::Done);
        assert_eq!(resolution.iterations, 0);
    }

    #[tokio::test]
    async fn test_invalid_yaml_rejected() {
        let deps = Dependencies::new("stages: [unclosed").with_entry("k1", "/stages/0");
        let result = resolver(CreatorRegistry::new())
            .resolve(&deps, &IndexMap::new())
            .await;
        assert!(matches!(result, Err(PlanflowError::Yaml { .. })));
    }
}
