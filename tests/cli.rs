// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! CLI integration tests for the planflow command-line interface.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PIPELINE: &str = r#"
version: 1
pipeline:
  identifier: demo
  stages:
    - identifier: build
      type: ci
      steps:
        - identifier: compile
          type: shell
          timeout: 10m
        - identifier: fanout
          type: parallel
          steps:
            - identifier: unit
            - identifier: lint
    - identifier: deploy
      type: cd
      steps:
        - identifier: ship
"#;

/// Get a command for the planflow binary, run inside `dir`.
fn planflow(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("planflow").unwrap();
    cmd.current_dir(dir.path()).env("NO_COLOR", "1");
    cmd
}

fn workspace(pipeline: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("pipeline.yaml"), pipeline).unwrap();
    dir
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    planflow(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("graph"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("creators"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    planflow(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("planflow"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Plan Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_plan_text() {
    let dir = workspace(PIPELINE);
    planflow(&dir)
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan created:"))
        .stdout(predicate::str::contains("8 node(s) in 4 iteration(s)"))
        .stdout(predicate::str::contains("pipeline.stages.build"))
        .stdout(predicate::str::contains("pipeline.stages.deploy.steps.ship (step)"));
}

#[test]
fn test_plan_json() {
    let dir = workspace(PIPELINE);
    let output = planflow(&dir)
        .args(["plan", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["nodes"].as_object().unwrap().len(), 8);
    assert_eq!(json["iterations"], 4);
    assert_eq!(json["layout"]["starting_node_ids"][0], "build");
}

#[test]
fn test_plan_single_dependency_leaves_unmatched_outstanding() {
    let dir = workspace("stages:\n  - identifier: s\n    steps:\n      - identifier: a\nnotes:\n  - text: hi\n");
    let output = planflow(&dir)
        .args([
            "plan",
            "-d",
            "k1=/stages/0",
            "-d",
            "extra=/notes/0",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["nodes"].as_object().unwrap().len(), 2);
    assert_eq!(json["unmatched"], 1);
    assert_eq!(json["remaining"]["entries"]["extra"], "/notes/0");
}

#[test]
fn test_plan_failure_exits_nonzero() {
    let dir = workspace("stages:\n  - identifier: empty\n    steps: []\n");
    planflow(&dir)
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Plan creation failed"))
        .stderr(predicate::str::contains("stage 'empty' has no steps"));
}

#[test]
fn test_plan_missing_pipeline() {
    let dir = TempDir::new().unwrap();
    planflow(&dir)
        .args(["plan", "nope.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Pipeline file not found"));
}

#[test]
fn test_plan_rejects_bad_context() {
    let dir = workspace(PIPELINE);
    planflow(&dir)
        .args(["plan", "-c", "novalue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not KEY=VALUE"));
}

#[test]
fn test_plan_with_config_file() {
    let dir = workspace(PIPELINE);
    std::fs::write(dir.path().join("engine.toml"), "service_name = \"ci-service\"\n").unwrap();

    let output = planflow(&dir)
        .args(["--config", "engine.toml", "plan", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["distributed_affinity"]["/pipeline/stages/0"], "ci-service");
}

#[test]
fn test_invalid_config_rejected() {
    let dir = workspace(PIPELINE);
    std::fs::write(dir.path().join(".planflow.yaml"), "max_concurrency: 0\n").unwrap();

    planflow(&dir)
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_concurrency"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Graph, Validate and Creators Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_graph_dot() {
    let dir = workspace(PIPELINE);
    planflow(&dir)
        .args(["graph", "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph plan {"))
        .stdout(predicate::str::contains(
            "\"pipeline.stages.build\" -> \"pipeline.stages.build.steps.compile\";",
        ));
}

#[test]
fn test_graph_mermaid() {
    let dir = workspace(PIPELINE);
    planflow(&dir)
        .args(["graph", "-f", "mermaid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("graph TD"));
}

#[test]
fn test_validate() {
    let dir = workspace(PIPELINE);
    planflow(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Expanded into 8 node(s)"))
        .stdout(predicate::str::contains("Pipeline is valid!"));
}

#[test]
fn test_validate_reports_invalid_timeout() {
    let dir = workspace(
        "stages:\n  - identifier: s\n    steps:\n      - identifier: a\n        timeout: soon\n",
    );
    planflow(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid timeout 'soon'"));
}

#[test]
fn test_creators_listing() {
    let dir = TempDir::new().unwrap();
    planflow(&dir)
        .arg("creators")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. PipelineCreator pipeline[*]"))
        .stdout(predicate::str::contains("ParallelCreator step[parallel]"))
        .stdout(predicate::str::contains("5. StepCreator step[*]"));
}
