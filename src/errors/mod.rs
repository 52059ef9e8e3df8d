// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Error types for plan creation
//!
//! Node-level errors end up as plain strings inside a partial result, so every
//! variant is written to read well on its own in a flat error list.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for planflow operations
pub type PlanflowResult<T> = Result<T, PlanflowError>;

/// Main error type for planflow
#[derive(Error, Debug, Diagnostic)]
pub enum PlanflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Request Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid plan request: {reason}")]
    #[diagnostic(code(planflow::invalid_request))]
    InvalidRequest {
        reason: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Document Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("No YAML node at path '{path}'")]
    #[diagnostic(
        code(planflow::yaml_path_not_found),
        help("Paths are '/'-separated keys and sequence indices, e.g. /stages/0/steps/[1]")
    )]
    YamlPathNotFound { path: String },

    #[error("No YAML node with fully qualified name '{fqn}'")]
    #[diagnostic(code(planflow::fqn_not_found))]
    FqnNotFound { fqn: String },

    #[error("Failed to decode '{path}': {message}")]
    #[diagnostic(
        code(planflow::decode_failed),
        help("Check the construct at '{path}' against the fields its creator expects")
    )]
    Decode { path: String, message: String },

    #[error("Failed to rewrite '{fqn}': {message}")]
    #[diagnostic(code(planflow::rewrite_failed))]
    RewriteFailed { fqn: String, message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Creation Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to create plan for '{fqn}': {message}")]
    #[diagnostic(code(planflow::creation_failed))]
    CreationFailed { fqn: String, message: String },

    #[error("Plan creation for '{fqn}' panicked: {message}")]
    #[diagnostic(code(planflow::worker_panicked))]
    WorkerPanicked { fqn: String, message: String },

    #[error("Plan creation batch {iteration} did not finish within {seconds}s")]
    #[diagnostic(
        code(planflow::resolution_timeout),
        help("This is not a YAML authoring problem; resubmit the request")
    )]
    ResolutionTimeout { iteration: usize, seconds: u64 },

    #[error("Plan creation did not converge after {limit} iterations")]
    #[diagnostic(
        code(planflow::iteration_limit),
        help("A creator is probably re-emitting dependencies it already produced")
    )]
    IterationLimitExceeded { limit: usize },

    #[error("Plan graph contains a cycle")]
    #[diagnostic(
        code(planflow::circular_plan),
        help("Review parent/child links emitted by the creators involved")
    )]
    CircularPlan { nodes: Vec<String> },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid engine configuration: {reason}")]
    #[diagnostic(code(planflow::invalid_config))]
    InvalidConfig { reason: String },

    #[error("Pipeline file not found: {path}")]
    #[diagnostic(
        code(planflow::pipeline_not_found),
        help("Pass the path of a pipeline YAML document")
    )]
    PipelineNotFound { path: PathBuf },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(planflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(planflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(planflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(planflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(planflow::toml_error))]
    Toml { message: String },
}

impl From<std::io::Error> for PlanflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for PlanflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for PlanflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for PlanflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl PlanflowError {
    /// Create a creation failure for the construct at `fqn`
    pub fn creation(fqn: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CreationFailed {
            fqn: fqn.into(),
            message: message.into(),
        }
    }

    /// Create an invalid request error without extra help
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
            help: None,
        }
    }

    /// Whether this error belongs to the "unexpected" category.
    ///
    /// Unexpected failures say nothing about the YAML that was submitted and
    /// callers may retry by resubmitting the same request.
    pub fn is_unexpected(&self) -> bool {
        matches!(
            self,
            Self::ResolutionTimeout { .. }
                | Self::IterationLimitExceeded { .. }
                | Self::WorkerPanicked { .. }
                | Self::Io { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_classification() {
        assert!(PlanflowError::ResolutionTimeout {
            iteration: 2,
            seconds: 180
        }
        .is_unexpected());
        assert!(PlanflowError::IterationLimitExceeded { limit: 4 }.is_unexpected());
        assert!(!PlanflowError::creation("pipeline.stages.s1", "boom").is_unexpected());
        assert!(!PlanflowError::Decode {
            path: "/stages/0".into(),
            message: "missing field `identifier`".into()
        }
        .is_unexpected());
    }

    #[test]
    fn test_messages_carry_context() {
        let err = PlanflowError::Decode {
            path: "/stages/0/steps/1".into(),
            message: "invalid type".into(),
        };
        assert_eq!(err.to_string(), "Failed to decode '/stages/0/steps/1': invalid type");

        let err = PlanflowError::creation("stages.build", "no steps");
        assert!(err.to_string().contains("stages.build"));
    }

    #[test]
    fn test_from_yaml_error() {
        let parsed: Result<serde_yaml::Value, _> = serde_yaml::from_str("a: [1, 2");
        let err: PlanflowError = parsed.unwrap_err().into();
        assert!(matches!(err, PlanflowError::Yaml { .. }));
    }
}
