// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Folding one batch of dispatch results into the request accumulator

use std::sync::Arc;

use super::dispatcher::Dispatched;
use super::propagation::propagate_rollback;
use crate::plan::{Dependencies, Dependency, MergedResult};
use crate::yaml::YamlDocument;

/// One dependency taken off the frontier
#[derive(Debug, Clone, PartialEq)]
pub struct FrontierEntry {
    pub key: String,
    pub path: String,
    pub dependency: Option<Dependency>,
}

/// What a merged batch hands back to the driver
#[derive(Debug, Default)]
pub struct BatchMerge {
    /// Dependencies discovered in this batch
    pub next: Dependencies,
    /// Every error of the batch; non-empty means the request has failed
    pub errors: Vec<String>,
}

impl BatchMerge {
    pub fn is_fatal(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Merge a batch, in frontier order
///
/// A batch with any error is not folded in at all: the errors of every entry
/// are collected and returned. Rewrites are applied to `document` one after
/// another, so a later entry overwrites an earlier one on the same FQN.
pub fn merge_batch(
    merged: &mut MergedResult,
    document: &mut Arc<YamlDocument>,
    batch: Vec<(FrontierEntry, Option<Dispatched>)>,
) -> BatchMerge {
    let errors: Vec<String> = batch
        .iter()
        .filter_map(|(_, result)| result.as_ref())
        .flat_map(|d| d.partial.errors.iter().cloned())
        .collect();
    if !errors.is_empty() {
        return BatchMerge {
            next: Dependencies::default(),
            errors,
        };
    }

    let mut merge = BatchMerge::default();

    for (entry, result) in batch {
        let Some(dispatched) = result else {
            tracing::warn!(key = %entry.key, path = %entry.path, "no creator matched dependency");
            match entry.dependency {
                Some(dependency) => merged
                    .outstanding
                    .insert_with(entry.key, entry.path, dependency),
                None => merged.outstanding.insert(entry.key, entry.path),
            }
            merged.unmatched += 1;
            continue;
        };

        let mut partial = dispatched.partial;

        let preserved = propagate_rollback(&mut partial, entry.dependency.as_ref());
        merged.preserved_node_ids.extend(preserved);

        if let Some(affinity) = dispatched.affinity {
            merged.distributed_affinity.insert(entry.key.clone(), affinity);
        }
        for (key, _, meta) in partial.dependencies.iter() {
            if let Some(affinity) = meta.and_then(|m| m.distributed_affinity.as_ref()) {
                merged
                    .distributed_affinity
                    .insert(key.to_string(), affinity.clone());
            }
        }

        merged.nodes.extend(partial.nodes);
        merged.layout.absorb(partial.layout);
        if merged.starting_node_id.is_none() {
            merged.starting_node_id = partial.starting_node_id;
        }
        if let Some(template) = partial.execution_input_template {
            merged
                .execution_input_templates
                .insert(dispatched.fqn.clone(), template);
        }

        for (fqn, snippet) in partial.yaml_rewrites {
            match Arc::make_mut(document).apply_rewrite(&fqn, &snippet) {
                Ok(()) => {
                    tracing::debug!(fqn = %fqn, "applied yaml rewrite");
                    merged.yaml_rewrites.insert(fqn, snippet);
                }
                Err(e) => merge.errors.push(e.to_string()),
            }
        }

        merge.next.extend(partial.dependencies);
    }

    if merge.is_fatal() {
        merge.next = Dependencies::default();
    }
    merge
}
