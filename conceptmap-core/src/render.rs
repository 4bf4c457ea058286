// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Drawable description of a dependency graph
//!
//! Produces a node list (with a root flag) and an edge list oriented
//! prerequisite -> concept, plus a Graphviz DOT rendering of the same.

use crate::graph::DependencyGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write;

const ROOT_FILL: &str = "lightcoral";
const NODE_FILL: &str = "lightblue";
const EDGE_COLOR: &str = "gray50";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedNode {
    pub id: String,
    pub label: String,
    /// No prerequisites inside the graph
    pub root: bool,
}

/// Directed edge; `from` must be learned before `to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedGraph {
    pub nodes: Vec<RenderedNode>,
    pub edges: Vec<RenderedEdge>,
}

/// Lay out every vertex of `graph` and one edge per (concept, prerequisite).
///
/// Roots are recomputed here on every call. Prerequisites that are not keys
/// are rendered as ordinary vertices with no prerequisites of their own.
pub fn render(graph: &DependencyGraph) -> RenderedGraph {
    let roots: HashSet<&str> = graph.roots().into_iter().map(|c| c.as_str()).collect();

    let nodes = graph
        .vertices()
        .into_iter()
        .map(|concept| RenderedNode {
            id: concept.to_string(),
            label: concept.to_string(),
            root: roots.contains(concept.as_str()),
        })
        .collect();

    let edges = graph
        .edges()
        .map(|edge| RenderedEdge {
            from: edge.prerequisite.into_string(),
            to: edge.concept.into_string(),
        })
        .collect();

    RenderedGraph { nodes, edges }
}

impl RenderedGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = &RenderedNode> {
        self.nodes.iter().filter(|n| n.root)
    }

    /// Graphviz DOT, top to bottom, roots highlighted
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(dot, "digraph concepts {{");
        let _ = writeln!(dot, "    rankdir=TB;");
        let _ = writeln!(
            dot,
            "    node [shape=rectangle, style=\"rounded,filled\", fillcolor={NODE_FILL}, fontname=\"Arial\", fontsize=12, margin=0.2];"
        );
        let _ = writeln!(dot, "    edge [color={EDGE_COLOR}, arrowsize=0.8];");

        for node in &self.nodes {
            if node.root {
                let _ = writeln!(
                    dot,
                    "    {} [label={}, fillcolor={ROOT_FILL}];",
                    quote(&node.id),
                    quote(&node.label)
                );
            } else {
                let _ = writeln!(dot, "    {} [label={}];", quote(&node.id), quote(&node.label));
            }
        }

        for edge in &self.edges {
            let _ = writeln!(dot, "    {} -> {};", quote(&edge.from), quote(&edge.to));
        }

        dot.push_str("}\n");
        dot
    }
}

fn quote(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 2);
    out.push('"');
    for ch in id.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}
