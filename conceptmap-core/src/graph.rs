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

//! Concept dependency graph
//!
//! The graph maps every concept to the ordered list of concepts it requires.
//! Keys are the explicit vertex set. A prerequisite that never appears as a
//! key is an *implicit* vertex: it exists for rendering and ordering, with no
//! prerequisites of its own.

use crate::concept::Concept;
use indexmap::{IndexMap, IndexSet};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// "`concept` requires `prerequisite` to be understood first"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub concept: Concept,
    pub prerequisite: Concept,
}

/// What happened when an edge was offered to the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeInsert {
    Added,
    Duplicate,
    SelfLoop,
}

/// Mapping from concept to its ordered, duplicate-free prerequisites.
///
/// Serializes as a plain JSON object (`{"Work": ["Energy"], "Energy": []}`),
/// preserving key insertion order. Deserialized artifacts are rebuilt edge
/// by edge, so self-loops and repeated prerequisites are dropped on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencyGraph {
    entries: IndexMap<Concept, Vec<Concept>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of explicit (key) concepts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, concept: &str) -> bool {
        self.entries.contains_key(concept)
    }

    /// Ensure `concept` is a key. Existing prerequisites are left untouched.
    pub fn add_concept(&mut self, concept: Concept) {
        self.entries.entry(concept).or_default();
    }

    /// Record that `concept` depends on `prerequisite`.
    ///
    /// The concept becomes a key even when the edge is rejected, so a model
    /// statement like "X depends on X" still yields the vertex X.
    pub fn add_dependency(&mut self, concept: Concept, prerequisite: Concept) -> EdgeInsert {
        if concept == prerequisite {
            self.add_concept(concept);
            return EdgeInsert::SelfLoop;
        }
        let prerequisites = self.entries.entry(concept).or_default();
        if prerequisites.contains(&prerequisite) {
            EdgeInsert::Duplicate
        } else {
            prerequisites.push(prerequisite);
            EdgeInsert::Added
        }
    }

    pub fn prerequisites(&self, concept: &str) -> Option<&[Concept]> {
        self.entries.get(concept).map(Vec::as_slice)
    }

    /// Iterate keys and their prerequisite lists in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Concept, &[Concept])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn concepts(&self) -> impl Iterator<Item = &Concept> {
        self.entries.keys()
    }

    /// Every vertex: keys in insertion order, then prerequisite-only concepts
    /// in order of first appearance.
    pub fn vertices(&self) -> Vec<&Concept> {
        let mut seen: IndexSet<&Concept> = self.entries.keys().collect();
        for prerequisites in self.entries.values() {
            seen.extend(prerequisites.iter());
        }
        seen.into_iter().collect()
    }

    /// Vertices that appear only as prerequisites, never as keys
    pub fn implicit_vertices(&self) -> Vec<&Concept> {
        self.vertices()
            .into_iter()
            .filter(|c| !self.entries.contains_key(c.as_str()))
            .collect()
    }

    pub fn edges(&self) -> impl Iterator<Item = DependencyEdge> + '_ {
        self.entries.iter().flat_map(|(concept, prerequisites)| {
            prerequisites.iter().map(move |p| DependencyEdge {
                concept: concept.clone(),
                prerequisite: p.clone(),
            })
        })
    }

    pub fn edge_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Concepts with no prerequisites inside the graph: the entry points a
    /// learner can start from. Implicit vertices are always roots.
    pub fn roots(&self) -> Vec<&Concept> {
        self.vertices()
            .into_iter()
            .filter(|c| {
                self.entries
                    .get(c.as_str())
                    .map_or(true, |prerequisites| prerequisites.is_empty())
            })
            .collect()
    }

    /// Concepts that no other concept depends on
    pub fn capstones(&self) -> Vec<&Concept> {
        let required: IndexSet<&Concept> = self.entries.values().flatten().collect();
        self.vertices()
            .into_iter()
            .filter(|c| !required.contains(c))
            .collect()
    }

    /// Union `other` into this graph. Keys keep their first position and
    /// prerequisite lists are unioned preserving order. Self-loops carried in
    /// `other` are dropped.
    pub fn merge(&mut self, other: DependencyGraph) {
        for (concept, prerequisites) in other.entries {
            self.add_concept(concept.clone());
            for prerequisite in prerequisites {
                self.add_dependency(concept.clone(), prerequisite);
            }
        }
    }

    /// Keep only the edges for which `keep` returns true, returning the
    /// removed edges in order.
    pub fn retain_edges<F>(&mut self, mut keep: F) -> Vec<DependencyEdge>
    where
        F: FnMut(&Concept, &Concept) -> bool,
    {
        let mut removed = Vec::new();
        for (concept, prerequisites) in self.entries.iter_mut() {
            prerequisites.retain(|p| {
                if keep(concept, p) {
                    true
                } else {
                    removed.push(DependencyEdge {
                        concept: concept.clone(),
                        prerequisite: p.clone(),
                    });
                    false
                }
            });
        }
        removed
    }

    /// Order every vertex so that prerequisites come before the concepts
    /// that need them.
    ///
    /// The graph is not required to be acyclic; when it is not, the cycles
    /// are returned instead of an order.
    pub fn learning_order(&self) -> Result<Vec<Concept>, CycleReport> {
        let (graph, _) = self.to_petgraph();

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(|ix| graph[ix].clone()).collect()),
            Err(_) => {
                let cycles = tarjan_scc(&graph)
                    .into_iter()
                    .filter(|component| component.len() > 1)
                    .map(|component| {
                        let mut members: Vec<Concept> =
                            component.into_iter().map(|ix| graph[ix].clone()).collect();
                        members.sort();
                        members
                    })
                    .collect();
                Err(CycleReport { cycles })
            }
        }
    }

    /// Edges run prerequisite -> concept
    fn to_petgraph(&self) -> (DiGraph<Concept, ()>, HashMap<&Concept, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for vertex in self.vertices() {
            index.insert(vertex, graph.add_node(vertex.clone()));
        }
        for (concept, prerequisites) in &self.entries {
            for prerequisite in prerequisites {
                graph.add_edge(index[prerequisite], index[concept], ());
            }
        }
        (graph, index)
    }
}

impl FromIterator<(Concept, Vec<Concept>)> for DependencyGraph {
    fn from_iter<I: IntoIterator<Item = (Concept, Vec<Concept>)>>(iter: I) -> Self {
        let mut graph = DependencyGraph::new();
        for (concept, prerequisites) in iter {
            graph.add_concept(concept.clone());
            for prerequisite in prerequisites {
                graph.add_dependency(concept.clone(), prerequisite);
            }
        }
        graph
    }
}

impl<'de> Deserialize<'de> for DependencyGraph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = IndexMap::<Concept, Vec<Concept>>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

/// Strongly connected components that prevent a learning order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Each cycle's members, sorted
    pub cycles: Vec<Vec<Concept>>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn c(name: &str) -> Concept {
        Concept::new(name).unwrap()
    }

    pub(crate) fn graph(entries: &[(&str, &[&str])]) -> DependencyGraph {
        entries
            .iter()
            .map(|(k, deps)| (c(k), deps.iter().map(|d| c(d)).collect()))
            .collect()
    }

    fn names(concepts: Vec<&Concept>) -> Vec<&str> {
        concepts.into_iter().map(Concept::as_str).collect()
    }

    #[test]
    fn test_roots_are_concepts_without_prerequisites() {
        let g = graph(&[
            ("Energy", &[]),
            ("Work", &["Energy"]),
            ("Power", &["Work", "Energy"]),
        ]);
        assert_eq!(names(g.roots()), vec!["Energy"]);
        assert_eq!(names(g.capstones()), vec!["Power"]);
    }

    #[test]
    fn test_implicit_vertices_are_roots() {
        let g = graph(&[("Acceleration", &["Force", "Mass"]), ("Force", &[])]);
        assert_eq!(
            names(g.vertices()),
            vec!["Acceleration", "Force", "Mass"]
        );
        assert_eq!(names(g.implicit_vertices()), vec!["Mass"]);
        assert_eq!(names(g.roots()), vec!["Force", "Mass"]);
    }

    #[test]
    fn test_add_dependency_rejects_self_loops_and_duplicates() {
        let mut g = DependencyGraph::new();
        assert_eq!(g.add_dependency(c("Work"), c("Work")), EdgeInsert::SelfLoop);
        assert!(g.contains_key("Work"));
        assert_eq!(g.add_dependency(c("Work"), c("Energy")), EdgeInsert::Added);
        assert_eq!(g.add_dependency(c("Work"), c("Energy")), EdgeInsert::Duplicate);
        assert_eq!(g.prerequisites("Work").unwrap(), &[c("Energy")]);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_merge_unions_preserving_order() {
        let mut a = graph(&[("Work", &["Energy"]), ("Energy", &[])]);
        let b = graph(&[("Work", &["Force", "Energy"]), ("Power", &["Work"])]);
        a.merge(b);

        let keys: Vec<&str> = a.concepts().map(Concept::as_str).collect();
        assert_eq!(keys, vec!["Work", "Energy", "Power"]);
        assert_eq!(a.prerequisites("Work").unwrap(), &[c("Energy"), c("Force")]);
    }

    #[test]
    fn test_retain_edges_reports_removed() {
        let mut g = graph(&[("Work", &["Energy", "Ghost"]), ("Energy", &[])]);
        let removed = g.retain_edges(|_, p| p.as_str() != "Ghost");
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].prerequisite.as_str(), "Ghost");
        assert_eq!(g.prerequisites("Work").unwrap(), &[c("Energy")]);
    }

    #[test]
    fn test_learning_order_puts_prerequisites_first() {
        let g = graph(&[
            ("Power", &["Work", "Energy"]),
            ("Work", &["Energy"]),
            ("Energy", &[]),
        ]);
        let order = g.learning_order().unwrap();
        let pos = |name: &str| order.iter().position(|c| c.as_str() == name).unwrap();
        assert_eq!(order.len(), 3);
        assert!(pos("Energy") < pos("Work"));
        assert!(pos("Work") < pos("Power"));
    }

    #[test]
    fn test_learning_order_reports_cycles() {
        let g = graph(&[("A", &["B"]), ("B", &["A"]), ("C", &[])]);
        let report = g.learning_order().unwrap_err();
        assert_eq!(report.cycles, vec![vec![c("A"), c("B")]]);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let g = graph(&[("Work", &["Energy"]), ("Energy", &[])]);
        let json = serde_json::to_string(&g).unwrap();
        assert_eq!(json, r#"{"Work":["Energy"],"Energy":[]}"#);
    }
}
