// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Utility modules
//!
//! Terminal helpers for the planflow CLI.

pub mod spinner;

pub use spinner::*;
