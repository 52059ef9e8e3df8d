// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Watch command - re-plan on file changes

use colored::Colorize;
use miette::Result;
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::time::Duration;

use super::{build_request, load_config, PlanArgs};
use crate::creators::default_registry;
use crate::engine::PlanCreatorService;
use crate::plan::PlanCreationResult;

/// Run the watch command
pub async fn run(
    args: PlanArgs,
    debounce_ms: u64,
    config_path: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    if !args.pipeline.exists() {
        return Err(miette::miette!(
            "Pipeline file not found: {}",
            args.pipeline.display()
        ));
    }

    let config = load_config(config_path.as_deref())?;
    let service = PlanCreatorService::new(default_registry(), config);

    println!("{}", "Starting watch mode...".bold());
    println!("Watching {} (debounce: {}ms)", args.pipeline.display(), debounce_ms);
    println!("Press {} to exit.", "Ctrl+C".cyan());
    println!();

    let (tx, rx) = channel();

    let mut debouncer = new_debouncer(Duration::from_millis(debounce_ms), tx)
        .map_err(|e| miette::miette!("Failed to create file watcher: {}", e))?;

    debouncer
        .watcher()
        .watch(&args.pipeline, RecursiveMode::NonRecursive)
        .map_err(|e| miette::miette!("Failed to start watching: {}", e))?;

    // Initial run
    replan(&service, &args, verbose).await;

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant = events
                    .iter()
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                    .count();

                if relevant > 0 {
                    println!();
                    println!("{}", "─".repeat(50).dimmed());
                    println!("{}", "Change detected".yellow());
                    println!();
                    replan(&service, &args, verbose).await;
                }
            }
            Ok(Err(e)) => {
                eprintln!("{}: {:?}", "Watch error".red(), e);
            }
            Err(e) => {
                // Channel closed
                eprintln!("{}: {}", "Channel error".red(), e);
                break;
            }
        }
    }

    Ok(())
}

async fn replan(service: &PlanCreatorService, args: &PlanArgs, verbose: bool) {
    let start = std::time::Instant::now();

    let request = match build_request(args) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("{}: {}", "Failed to load pipeline".red(), e);
            return;
        }
    };

    let result = service.create_plan(request).await;
    let elapsed = start.elapsed().as_secs_f64();

    match result {
        PlanCreationResult::Success(outcome) => {
            println!(
                "{} {} node(s), {} outstanding ({:.2}s)",
                "Plan created:".green(),
                outcome.nodes.len(),
                outcome.remaining.len(),
                elapsed
            );
            if verbose {
                for (stage, nodes) in outcome.nodes_by_stage() {
                    println!("  {} ({})", stage.unwrap_or("(no stage)"), nodes.len());
                }
            }
        }
        PlanCreationResult::Failure(failure) => {
            println!("{} ({:.2}s)", "Plan creation failed".red(), elapsed);
            for message in &failure.messages {
                println!("  {} {}", "✗".red(), message);
            }
        }
    }
}
