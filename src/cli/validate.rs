// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Validate command - check that a pipeline expands cleanly

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::plan::report_failure;
use super::{build_request, load_config, PlanArgs};
use crate::creators::default_registry;
use crate::engine::PlanCreatorService;
use crate::plan::PlanGraph;

/// Run the validate command
pub async fn run(args: PlanArgs, config_path: Option<PathBuf>, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    let config = load_config(config_path.as_deref())?;
    let request = match build_request(&args) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("  {} Failed to load pipeline", "✗".red());
            eprintln!();
            return Err(e);
        }
    };

    println!("  {} Pipeline file is valid YAML", "✓".green());

    let result = PlanCreatorService::new(default_registry(), config)
        .create_plan(request)
        .await;
    report_failure(&result)?;

    let Some(outcome) = result.outcome() else {
        return Ok(());
    };
    println!(
        "  {} Expanded into {} node(s)",
        "✓".green(),
        outcome.nodes.len()
    );

    let graph = PlanGraph::build(&outcome.nodes)?;
    println!("  {} Plan graph is acyclic", "✓".green());

    if outcome.unmatched > 0 {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for (key, path, _) in outcome.remaining.iter() {
            println!("  {} no creator for {} ({})", "⚠".yellow(), key, path);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Plan summary".bold());
        println!("  Iterations: {}", outcome.iterations);
        println!("  Roots: {}", graph.roots().len());
        println!("  Edges: {}", graph.edge_count());
        println!("  Fingerprint: {}", graph.fingerprint().dimmed());
    }

    println!();
    if outcome.unmatched > 0 {
        println!(
            "{}",
            "Pipeline is valid but has unmatched constructs.".yellow().bold()
        );
    } else {
        println!("{}", "Pipeline is valid!".green().bold());
    }
    Ok(())
}
