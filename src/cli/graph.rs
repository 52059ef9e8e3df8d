// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Graph command - visualize the created plan as a graph

use miette::Result;
use std::path::PathBuf;

use super::plan::report_failure;
use super::{build_request, load_config, GraphFormat, PlanArgs};
use crate::creators::default_registry;
use crate::engine::PlanCreatorService;
use crate::plan::PlanGraph;

/// Run the graph command
pub async fn run(
    args: PlanArgs,
    format: GraphFormat,
    config_path: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let request = build_request(&args)?;
    let result = PlanCreatorService::new(default_registry(), config)
        .create_plan(request)
        .await;

    report_failure(&result)?;
    let Some(outcome) = result.outcome() else {
        return Ok(());
    };

    let graph = PlanGraph::build(&outcome.nodes)?;

    // Output in requested format
    let output = match format {
        GraphFormat::Text => graph.to_text()?,
        GraphFormat::Dot => graph.to_dot(),
        GraphFormat::Mermaid => graph.to_mermaid(),
    };

    println!("{}", output);
    if verbose {
        eprintln!("fingerprint: {}", graph.fingerprint());
    }

    Ok(())
}
