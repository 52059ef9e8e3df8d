// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! Graph view of a created plan
//!
//! Builds a petgraph DAG from parent/child links between plan nodes and
//! renders it as text, Graphviz DOT or Mermaid.

use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

use crate::errors::PlanflowError;
use crate::plan::PlanNode;

/// Directed graph over plan nodes, parent -> child
pub struct PlanGraph {
    graph: DiGraph<String, ()>,
    uuid_to_index: HashMap<String, NodeIndex>,
    nodes: IndexMap<String, PlanNode>,
}

impl PlanGraph {
    /// Build the graph from a plan's node table
    pub fn build(nodes: &IndexMap<String, PlanNode>) -> Result<Self, PlanflowError> {
        let mut graph = DiGraph::new();
        let mut uuid_to_index = HashMap::new();

        for uuid in nodes.keys() {
            let index = graph.add_node(uuid.clone());
            uuid_to_index.insert(uuid.clone(), index);
        }

        for node in nodes.values() {
            let this = uuid_to_index[&node.uuid];

            // Explicit children
            for child in &node.children {
                if let Some(&child_idx) = uuid_to_index.get(child) {
                    if !graph.contains_edge(this, child_idx) {
                        graph.add_edge(this, child_idx, ());
                    }
                }
            }

            // Back-links from frontier-resolved children
            if let Some(parent) = node.parent_id.as_ref().and_then(|p| uuid_to_index.get(p)) {
                if !graph.contains_edge(*parent, this) {
                    graph.add_edge(*parent, this, ());
                }
            }
        }

        let plan = Self {
            graph,
            uuid_to_index,
            nodes: nodes.clone(),
        };
        plan.topological_order()?;
        Ok(plan)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Nodes in parent-before-child order
    pub fn topological_order(&self) -> Result<Vec<&PlanNode>, PlanflowError> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|i| &self.nodes[&self.graph[i]]).collect())
            .map_err(|cycle| {
                let start = &self.graph[cycle.node_id()];
                PlanflowError::CircularPlan {
                    nodes: vec![self.nodes[start].fqn.clone()],
                }
            })
    }

    /// Nodes without a parent
    pub fn roots(&self) -> Vec<&PlanNode> {
        self.graph
            .node_indices()
            .filter(|&i| {
                self.graph
                    .neighbors_directed(i, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|i| &self.nodes[&self.graph[i]])
            .collect()
    }

    /// Direct children of a node
    pub fn children(&self, uuid: &str) -> Option<Vec<&PlanNode>> {
        let index = self.uuid_to_index.get(uuid)?;
        Some(
            self.graph
                .neighbors_directed(*index, Direction::Outgoing)
                .map(|i| &self.nodes[&self.graph[i]])
                .collect(),
        )
    }

    /// Structural fingerprint, independent of node uuids
    ///
    /// Two plans expanded from the same YAML hash equal even though every
    /// node received a fresh uuid.
    pub fn fingerprint(&self) -> String {
        let fqn_of = |uuid: &str| {
            self.nodes
                .get(uuid)
                .map(|n| n.fqn.as_str())
                .unwrap_or("")
        };

        let mut lines: Vec<String> = self
            .nodes
            .values()
            .map(|node| {
                let mut children: Vec<&str> = self
                    .graph
                    .neighbors_directed(self.uuid_to_index[&node.uuid], Direction::Outgoing)
                    .map(|i| fqn_of(&self.graph[i]))
                    .collect();
                children.sort_unstable();

                format!(
                    "{}|{}|{}|{}|{}",
                    node.kind,
                    node.node_type.as_deref().unwrap_or(""),
                    node.fqn,
                    node.stage_fqn.as_deref().unwrap_or(""),
                    children.join(",")
                )
            })
            .collect();
        lines.sort_unstable();

        let mut hasher = blake3::Hasher::new();
        for line in &lines {
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Generate text listing grouped by stage
    pub fn to_text(&self) -> Result<String, PlanflowError> {
        let order = self.topological_order()?;
        let mut groups: IndexMap<&str, Vec<&PlanNode>> = IndexMap::new();
        for node in order {
            groups
                .entry(node.stage_fqn.as_deref().unwrap_or("(no stage)"))
                .or_default()
                .push(node);
        }

        let mut out = String::new();
        for (stage, nodes) in groups {
            out.push_str(&format!("{}\n", stage));
            for (i, node) in nodes.iter().enumerate() {
                out.push_str(&format!("  {}. {} ({}", i + 1, node.fqn, node.kind));
                if let Some(ref node_type) = node.node_type {
                    out.push_str(&format!(":{}", node_type));
                }
                out.push(')');
                if !node.children.is_empty() {
                    out.push_str(&format!(" [children: {}]", node.children.len()));
                }
                out.push('\n');
            }
        }

        Ok(out)
    }

    /// Generate Mermaid diagram of the plan
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for index in self.graph.node_indices() {
            let node = &self.nodes[&self.graph[index]];
            out.push_str(&format!("    n{}[\"{}\"]\n", index.index(), node.fqn));
        }

        for edge in self.graph.raw_edges() {
            out.push_str(&format!(
                "    n{} --> n{}\n",
                edge.source().index(),
                edge.target().index()
            ));
        }

        out
    }

    /// Generate DOT diagram of the plan
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph plan {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for edge in self.graph.raw_edges() {
            let from = &self.nodes[&self.graph[edge.source()]];
            let to = &self.nodes[&self.graph[edge.target()]];
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", from.fqn, to.fqn));
        }

        // Isolated nodes (no edges)
        for index in self.graph.node_indices() {
            if self.graph.neighbors_undirected(index).next().is_none() {
                let node = &self.nodes[&self.graph[index]];
                out.push_str(&format!("    \"{}\";\n", node.fqn));
            }
        }

        out.push_str("}\n");
        out
    }
}
