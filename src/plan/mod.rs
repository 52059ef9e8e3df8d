// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Plan data model
//!
//! Dependencies flow into the engine, partial results flow out of creators,
//! and a [`PlanCreationResult`] leaves the service boundary.

mod dependency;
mod graph;
mod node;
mod response;

pub use dependency::{Dependencies, Dependency, RollbackModeBehaviour};
pub use graph::PlanGraph;
pub use node::{GraphLayout, LayoutNode, PlanNode};
pub use response::{
    FailureKind, MergedResult, PartialResult, PlanCreationResult, PlanFailure, PlanOutcome,
};
