// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for planflow.

pub mod creators;
pub mod graph;
pub mod plan;
pub mod validate;
pub mod watch;

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::creators::EXECUTION_INPUT_KEY;
use crate::engine::CreatePlanRequest;
use crate::errors::PlanflowError;
use crate::plan::Dependencies;
use crate::yaml::YamlDocument;

/// Pipeline file used when none is given
pub const DEFAULT_PIPELINE_FILE: &str = "pipeline.yaml";

/// Dependency-frontier plan creation for YAML pipelines
#[derive(Parser, Debug)]
#[clap(
    name = "planflow",
    version,
    about = "Expand versioned YAML pipelines into execution plans",
    long_about = None,
    after_help = "Examples:\n\
        planflow plan                         Plan ./pipeline.yaml\n\
        planflow plan ci.yaml -d k1=/stages/0 Plan one stage of ci.yaml\n\
        planflow graph -f mermaid             Show the plan as a Mermaid diagram\n\
        planflow watch                        Re-plan on file changes\n\n\
        See 'planflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Engine configuration file (YAML or TOML)
    #[clap(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Inputs shared by every command that creates a plan
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PlanArgs {
    /// Pipeline file
    #[clap(default_value = DEFAULT_PIPELINE_FILE)]
    pub pipeline: PathBuf,

    /// Dependency to resolve, as KEY=PATH or PATH (repeatable)
    #[clap(short, long = "dependency", value_name = "KEY=PATH")]
    pub dependencies: Vec<String>,

    /// Request context entry, as KEY=VALUE (repeatable)
    #[clap(short, long = "context", value_name = "KEY=VALUE")]
    pub context: Vec<String>,

    /// Known owner of a dependency, as KEY=SERVICE (repeatable)
    #[clap(short, long = "affinity", value_name = "KEY=SERVICE")]
    pub affinity: Vec<String>,

    /// Materialise execution-input templates
    #[clap(long)]
    pub execution_inputs: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a plan for a pipeline
    Plan {
        #[clap(flatten)]
        args: PlanArgs,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the created plan as a graph
    Graph {
        #[clap(flatten)]
        args: PlanArgs,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },

    /// Check that a pipeline expands without errors
    Validate {
        #[clap(flatten)]
        args: PlanArgs,
    },

    /// Watch mode - re-plan on file changes
    Watch {
        #[clap(flatten)]
        args: PlanArgs,

        /// Debounce delay in milliseconds
        #[clap(long, default_value = "500")]
        debounce: u64,
    },

    /// List registered plan creators
    Creators,
}

/// Output format for the plan command
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// Graph output format
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

/// Load the engine configuration for this invocation
pub fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    let config = match explicit {
        Some(path) => EngineConfig::from_file(path)?,
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
            EngineConfig::discover(&cwd)?
        }
    };
    Ok(config)
}

/// Read the pipeline file and build the plan request the arguments describe
pub fn build_request(args: &PlanArgs) -> Result<CreatePlanRequest> {
    if !args.pipeline.exists() {
        return Err(PlanflowError::PipelineNotFound {
            path: args.pipeline.clone(),
        }
        .into());
    }

    let yaml = std::fs::read_to_string(&args.pipeline).map_err(|e| PlanflowError::FileReadError {
        path: args.pipeline.clone(),
        error: e.to_string(),
    })?;
    let document = YamlDocument::parse(&yaml)?;

    let mut dependencies = Dependencies::new(yaml.clone());
    for entry in &args.dependencies {
        let (key, path) = split_pair(entry).unwrap_or((entry.as_str(), entry.as_str()));
        dependencies.insert(key, path);
    }
    if dependencies.is_empty() {
        dependencies = default_dependencies(yaml, &document);
    }

    let mut request = CreatePlanRequest::new(dependencies);
    for entry in &args.context {
        let (key, value) = split_pair(entry)
            .ok_or_else(|| miette::miette!("Context entry '{}' is not KEY=VALUE", entry))?;
        request = request.with_context(key, value);
    }
    for entry in &args.affinity {
        let (key, service) = split_pair(entry)
            .ok_or_else(|| miette::miette!("Affinity entry '{}' is not KEY=SERVICE", entry))?;
        request = request.with_affinity(key, service);
    }
    if args.execution_inputs {
        request = request.with_context(EXECUTION_INPUT_KEY, "true");
    }

    Ok(request)
}

/// Dependencies for a whole document: its pipeline, or failing that each stage
pub fn default_dependencies(yaml: String, document: &YamlDocument) -> Dependencies {
    let mut dependencies = Dependencies::new(yaml);
    if document.contains("/pipeline") {
        dependencies.insert("/pipeline", "/pipeline");
        return dependencies;
    }

    if let Ok(root) = document.field("/") {
        for path in root.sequence_paths("stages") {
            dependencies.insert(path.clone(), path);
        }
    }
    dependencies
}

fn split_pair(spec: &str) -> Option<(&str, &str)> {
    spec.split_once('=')
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
}
