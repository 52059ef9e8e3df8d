// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Plan nodes and layout hints

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::yaml::YamlField;

/// One unit of the produced execution graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub uuid: String,

    pub identifier: String,

    pub name: String,

    /// Construct kind (`stage`, `step`, ...)
    pub kind: String,

    /// Construct type (`shell`, `parallel`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    pub fqn: String,

    /// FQN of the stage this node belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_fqn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Ordered child node ids
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,

    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl PlanNode {
    /// Start a node for the construct at `field`, with a fresh uuid
    pub fn for_field(field: &YamlField) -> Self {
        let identifier = field
            .identifier()
            .map(str::to_string)
            .or_else(|| field.fqn.rsplit('.').next().map(str::to_string))
            .unwrap_or_default();
        let name = field
            .str_field("name")
            .map(str::to_string)
            .unwrap_or_else(|| identifier.clone());

        Self {
            uuid: Uuid::new_v4().to_string(),
            identifier,
            name,
            kind: field.name.clone(),
            node_type: field.node_type().map(str::to_string),
            fqn: field.fqn.clone(),
            stage_fqn: None,
            timeout: None,
            parent_id: None,
            children: Vec::new(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_children(mut self, children: Vec<String>) -> Self {
        self.children = children;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<String>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Display information for one node of the pipeline graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub node_uuid: String,
    pub node_type: String,
    pub name: String,
    pub identifier: String,
    /// Layout keys of the nodes that follow this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<String>,
}

/// Layout hints collected from creators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLayout {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub starting_node_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub nodes: IndexMap<String, LayoutNode>,
}

impl GraphLayout {
    pub fn is_empty(&self) -> bool {
        self.starting_node_ids.is_empty() && self.nodes.is_empty()
    }

    /// Union `other` into `self`, keeping the first occurrence of each start id
    pub fn absorb(&mut self, other: GraphLayout) {
        for id in other.starting_node_ids {
            if !self.starting_node_ids.contains(&id) {
                self.starting_node_ids.push(id);
            }
        }
        self.nodes.extend(other.nodes);
    }
}
