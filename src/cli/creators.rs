// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Creators command - list the built-in plan creators in match order

use colored::Colorize;
use miette::Result;

use crate::creators::{default_registry, ANY_TYPE};

/// Run the creators command
pub async fn run(verbose: bool) -> Result<()> {
    let registry = default_registry();

    println!("{}", "Registered creators (first match wins):".bold());
    println!();

    for (i, creator) in registry.creators().enumerate() {
        let mut kinds: Vec<String> = creator
            .supported_types()
            .into_iter()
            .map(|(kind, types)| {
                let mut types: Vec<String> = types
                    .into_iter()
                    .map(|t| if t == ANY_TYPE { "*".to_string() } else { t })
                    .collect();
                types.sort();
                format!("{}[{}]", kind, types.join(", "))
            })
            .collect();
        kinds.sort();

        println!("  {}. {} {}", i + 1, creator.name().cyan(), kinds.join(" "));
        if verbose {
            println!(
                "     versions: {}",
                creator.supported_yaml_versions().join(", ").dimmed()
            );
        }
    }

    Ok(())
}
