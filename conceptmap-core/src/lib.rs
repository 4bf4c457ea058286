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

//! Conceptmap Core
//!
//! Data model shared by every stage of the concept map pipeline:
//! - **Concepts**: trimmed canonical phrases and the set accumulated during extraction
//! - **Dependency graph**: concept -> ordered prerequisites, with root detection,
//!   merging and learning order
//! - **Graph store**: the durable JSON artifact handed between runs
//! - **Renderer**: node/edge description and Graphviz DOT output
//!
//! # Example
//!
//! ```rust
//! use conceptmap_core::{render, Concept, DependencyGraph};
//!
//! let mut graph = DependencyGraph::new();
//! let work = Concept::new("Work").unwrap();
//! let energy = Concept::new("Energy").unwrap();
//! graph.add_concept(energy.clone());
//! graph.add_dependency(work, energy);
//!
//! let rendered = render(&graph);
//! assert_eq!(rendered.roots().count(), 1);
//! ```

pub mod concept;
pub mod error;
pub mod graph;
pub mod render;
pub mod store;

// Re-exports
pub use concept::{BlankConcept, Concept, ConceptSet};
pub use error::{StoreError, StoreResult};
pub use graph::{CycleReport, DependencyEdge, DependencyGraph, EdgeInsert};
pub use render::{render, RenderedEdge, RenderedGraph, RenderedNode};
pub use store::{GraphStore, WriteMode};
