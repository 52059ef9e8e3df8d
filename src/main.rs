// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! planflow - dependency-frontier plan creation
//!
//! Expand versioned YAML pipelines into execution plans.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use planflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planflow=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Plan { args, format } => {
            planflow::cli::plan::run(args, format, cli.config, cli.verbose).await
        }
        Commands::Graph { args, format } => {
            planflow::cli::graph::run(args, format, cli.config, cli.verbose).await
        }
        Commands::Validate { args } => {
            planflow::cli::validate::run(args, cli.config, cli.verbose).await
        }
        Commands::Watch { args, debounce } => {
            planflow::cli::watch::run(args, debounce, cli.config, cli.verbose).await
        }
        Commands::Creators => planflow::cli::creators::run(cli.verbose).await,
    }
}
