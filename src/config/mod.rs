// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Engine configuration
//!
//! Loaded from `.planflow.yaml` (or any YAML/TOML file passed explicitly),
//! falling back to `config.toml` in the user configuration directory.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{PlanflowError, PlanflowResult};

/// Default project-local configuration file name
pub const DEFAULT_CONFIG_FILE: &str = ".planflow.yaml";

/// Settings for the frontier resolution engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Name of this service, used to claim stage boundaries for distributed affinity
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Maximum number of creator invocations in flight per batch
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Hard ceiling for a single batch, in seconds
    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,

    /// Maximum number of driver iterations before giving up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Let creators materialise execution-input templates during dispatch
    #[serde(default)]
    pub execution_input_enabled: bool,
}

fn default_service_name() -> String {
    "planflow".to_string()
}

fn default_max_concurrency() -> usize {
    8
}

fn default_batch_timeout_secs() -> u64 {
    180
}

fn default_max_iterations() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            max_concurrency: default_max_concurrency(),
            batch_timeout_secs: default_batch_timeout_secs(),
            max_iterations: default_max_iterations(),
            execution_input_enabled: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML or TOML file, chosen by extension
    pub fn from_file(path: &Path) -> PlanflowResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PlanflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Find and load configuration for the given working directory
    ///
    /// Looks for `.planflow.yaml` in `dir`, then the user configuration
    /// directory, and falls back to defaults.
    pub fn discover(dir: &Path) -> PlanflowResult<Self> {
        let local = dir.join(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            tracing::debug!(path = %local.display(), "loading engine config");
            return Self::from_file(&local);
        }

        if let Some(user) = user_config_path() {
            if user.is_file() {
                tracing::debug!(path = %user.display(), "loading user engine config");
                return Self::from_file(&user);
            }
        }

        Ok(Self::default())
    }

    /// Reject settings the driver cannot run with
    pub fn validate(&self) -> PlanflowResult<()> {
        if self.service_name.trim().is_empty() {
            return Err(PlanflowError::InvalidConfig {
                reason: "service_name must not be empty".into(),
            });
        }
        if self.max_concurrency == 0 {
            return Err(PlanflowError::InvalidConfig {
                reason: "max_concurrency must be at least 1".into(),
            });
        }
        if self.batch_timeout_secs == 0 {
            return Err(PlanflowError::InvalidConfig {
                reason: "batch_timeout_secs must be at least 1".into(),
            });
        }
        if self.max_iterations == 0 {
            return Err(PlanflowError::InvalidConfig {
                reason: "max_iterations must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Batch ceiling as a duration
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_max_concurrency(mut self, permits: usize) -> Self {
        self.max_concurrency = permits;
        self
    }
}

/// `config.toml` in the platform configuration directory, if one exists
fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "planflow").map(|dirs| dirs.config_dir().join("config.toml"))
}
