// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Plan creation engine
//!
//! The dispatcher runs one creator for one field, the driver runs the
//! frontier loop over batches of dispatches, and the service wraps both into
//! the all-or-nothing `CreatePlan` call.

mod dispatcher;
mod driver;
mod merger;
pub mod propagation;
mod service;

#[cfg(test)]
pub(crate) mod test_support;

pub use dispatcher::{Dispatched, Dispatcher};
pub use driver::{DriverState, FrontierResolver, Resolution};
pub use merger::{merge_batch, BatchMerge, FrontierEntry};
pub use service::{CreatePlanRequest, PlanCreatorService};
