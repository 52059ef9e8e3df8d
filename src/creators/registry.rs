// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Creator registry
//!
//! An ordered list of creators. Lookup is a linear scan and the first creator
//! that accepts the field wins, so specific creators must be registered
//! before general fallbacks.

use std::sync::Arc;

use super::{accepts, Creator};
use crate::yaml::YamlField;

/// Ordered set of registered creators
#[derive(Clone, Default)]
pub struct CreatorRegistry {
    creators: Vec<Arc<dyn Creator>>,
}

impl CreatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a creator at the lowest priority
    pub fn register(&mut self, creator: impl Creator + 'static) {
        self.creators.push(Arc::new(creator));
    }

    /// Register an already shared creator at the lowest priority
    pub fn register_shared(&mut self, creator: Arc<dyn Creator>) {
        self.creators.push(creator);
    }

    /// Builder-style [`CreatorRegistry::register`]
    pub fn with(mut self, creator: impl Creator + 'static) -> Self {
        self.register(creator);
        self
    }

    /// First creator accepting `field` in a document of `version`
    pub fn find(&self, field: &YamlField, version: &str) -> Option<Arc<dyn Creator>> {
        self.creators
            .iter()
            .find(|c| accepts(c.as_ref(), field, version))
            .cloned()
    }

    /// Registered creators in priority order
    pub fn creators(&self) -> impl Iterator<Item = &Arc<dyn Creator>> {
        self.creators.iter()
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }
}

impl std::fmt::Debug for CreatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.creators.iter().map(|c| c.name()))
            .finish()
    }
}
