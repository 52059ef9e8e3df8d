// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! # planflow - Dependency-Frontier Plan Creation
//!
//! `planflow` expands a versioned YAML pipeline into an execution plan.
//!
//! ## Features
//!
//! - **Frontier resolution** - Unresolved sub-trees are dispatched in bounded parallel batches
//! - **Pluggable creators** - An ordered registry matches each construct to the creator that expands it
//! - **Metadata propagation** - Stage ownership, distributed affinity and rollback behaviour flow down the recursion
//! - **All-or-nothing results** - A request yields a complete plan or the list of what failed
//!
//! ## Quick Start
//!
//! ```bash
//! # Plan ./pipeline.yaml
//! planflow plan
//!
//! # Plan a single stage, as JSON
//! planflow plan ci.yaml -d k1=/stages/0 --format json
//!
//! # Render the plan graph
//! planflow graph --format mermaid
//! ```

pub mod cli;
pub mod config;
pub mod creators;
pub mod engine;
pub mod errors;
pub mod plan;
pub mod utils;
pub mod yaml;

// Re-export commonly used types
pub use config::EngineConfig;
pub use creators::{default_registry, Creator, CreatorRegistry, PlanCreationContext};
pub use engine::{CreatePlanRequest, PlanCreatorService};
pub use errors::{PlanflowError, PlanflowResult};
pub use plan::{Dependencies, Dependency, PartialResult, PlanCreationResult, PlanNode};
pub use yaml::{YamlDocument, YamlField};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
