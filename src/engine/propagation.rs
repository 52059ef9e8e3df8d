// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Metadata propagation
//!
//! Stage ownership, distributed affinity and rollback behaviour are applied to
//! every partial result before it is merged. Each rule only fills values that
//! are still unset, so anything a creator set explicitly wins.

use crate::plan::{Dependency, PartialResult, RollbackModeBehaviour};
use crate::yaml::YamlField;

/// Tag every untagged node with the stage the entry belongs to
pub fn tag_stage_fqn(partial: &mut PartialResult, stage_fqn: Option<&str>) {
    let Some(stage_fqn) = stage_fqn else {
        return;
    };
    for node in partial.nodes.values_mut() {
        if node.stage_fqn.is_none() {
            node.stage_fqn = Some(stage_fqn.to_string());
        }
    }
}

/// Affinity an entry is resolved under
///
/// An inherited hint always wins. Without one, only a stage boundary is
/// claimed by the resolving service.
pub fn resolve_affinity(
    hint: Option<String>,
    field: &YamlField,
    service_name: &str,
) -> Option<String> {
    hint.or_else(|| field.is_stage().then(|| service_name.to_string()))
}

/// Give every new dependency without an owner the entry's affinity
pub fn tag_affinity(partial: &mut PartialResult, affinity: Option<&str>) {
    let Some(affinity) = affinity else {
        return;
    };
    let keys: Vec<String> = partial.dependencies.keys().map(str::to_string).collect();
    for key in keys {
        if let Some(meta) = partial.dependencies.metadata_mut(&key) {
            if meta.distributed_affinity.is_none() {
                meta.distributed_affinity = Some(affinity.to_string());
            }
        }
    }
}

/// Carry `PRESERVE` from the entry's dependency to everything it produced
///
/// Returns the uuids of the nodes to preserve. Other behaviours are not
/// inherited, so the result is empty for them.
pub fn propagate_rollback(partial: &mut PartialResult, parent: Option<&Dependency>) -> Vec<String> {
    let preserve = parent
        .map(|d| d.rollback_mode_behaviour == RollbackModeBehaviour::Preserve)
        .unwrap_or(false);
    if !preserve {
        return Vec::new();
    }

    let keys: Vec<String> = partial.dependencies.keys().map(str::to_string).collect();
    for key in keys {
        if let Some(meta) = partial.dependencies.metadata_mut(&key) {
            meta.rollback_mode_behaviour = RollbackModeBehaviour::Preserve;
        }
    }

    partial.nodes.keys().cloned().collect()
}
