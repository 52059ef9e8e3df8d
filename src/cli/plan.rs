// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Plan command - expand a pipeline into an execution plan

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{build_request, load_config, OutputFormat, PlanArgs};
use crate::creators::default_registry;
use crate::engine::PlanCreatorService;
use crate::plan::{PlanCreationResult, PlanOutcome};
use crate::utils::create_spinner;

/// Run the plan command
pub async fn run(
    args: PlanArgs,
    format: OutputFormat,
    config_path: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let request = build_request(&args)?;
    let service = PlanCreatorService::new(default_registry(), config);

    let spinner = (format == OutputFormat::Text).then(|| create_spinner("Creating plan..."));
    let result = service.create_plan(request).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| miette::miette!("Failed to serialize plan: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&result)
                .map_err(|e| miette::miette!("Failed to serialize plan: {}", e))?;
            print!("{}", yaml);
        }
        OutputFormat::Text => match &result {
            PlanCreationResult::Success(outcome) => print_outcome(outcome, verbose),
            PlanCreationResult::Failure(_) => {}
        },
    }

    report_failure(&result)
}

/// Print errors of a failed plan and turn them into the command's error
pub(crate) fn report_failure(result: &PlanCreationResult) -> Result<()> {
    let PlanCreationResult::Failure(failure) = result else {
        return Ok(());
    };

    eprintln!("{}", "Plan creation failed:".red().bold());
    for message in &failure.messages {
        eprintln!("  {} {}", "✗".red(), message);
    }
    Err(miette::miette!(
        "{} error(s) while creating the plan",
        failure.messages.len()
    ))
}

fn print_outcome(outcome: &PlanOutcome, verbose: bool) {
    println!(
        "{} {} node(s) in {} iteration(s)",
        "Plan created:".green().bold(),
        outcome.nodes.len(),
        outcome.iterations
    );
    println!();

    for (stage, nodes) in outcome.nodes_by_stage() {
        println!("{}", stage.unwrap_or("(no stage)").bold());
        for node in nodes {
            let node_type = node
                .node_type
                .as_deref()
                .map(|t| format!(":{}", t))
                .unwrap_or_default();
            let preserved = if outcome.preserved_node_ids.contains(&node.uuid) {
                " [preserved]".dimmed().to_string()
            } else {
                String::new()
            };
            println!(
                "  {} {} ({}{}){}",
                "•".cyan(),
                node.fqn,
                node.kind,
                node_type,
                preserved
            );
            if verbose {
                println!("      {}", node.uuid.dimmed());
            }
        }
    }

    if !outcome.remaining.is_empty() {
        println!();
        println!("{}:", "Outstanding dependencies".yellow().bold());
        for (key, path, meta) in outcome.remaining.iter() {
            let owner = meta
                .and_then(|m| m.distributed_affinity.as_deref())
                .map(|s| format!(" -> {}", s))
                .unwrap_or_default();
            println!("  {} {} = {}{}", "⚠".yellow(), key, path, owner.dimmed());
        }
    }

    if verbose && !outcome.yaml_updates.is_empty() {
        println!();
        println!("{}:", "YAML updates".bold());
        for fqn in outcome.yaml_updates.keys() {
            println!("  {}", fqn);
        }
    }
}
