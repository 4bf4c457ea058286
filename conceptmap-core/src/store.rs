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

//! Durable JSON artifact for the dependency graph
//!
//! The artifact is the only hand-off between pipeline stages that run in
//! different processes. It is a pretty-printed JSON object mapping each
//! concept to its prerequisite array, written to a sibling temp file and
//! renamed into place so a reader never observes a partial write.

use crate::error::{StoreError, StoreResult};
use crate::graph::DependencyGraph;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How `save_with` treats an artifact that already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Replace the artifact
    #[default]
    Overwrite,
    /// Load the existing artifact (if any) and merge the new graph into it
    Merge,
}

/// File-backed graph store
#[derive(Debug, Clone)]
pub struct GraphStore {
    path: PathBuf,
}

impl GraphStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Overwrite the artifact with `graph`
    pub fn save(&self, graph: &DependencyGraph) -> StoreResult<()> {
        self.write_atomic(graph)
    }

    /// Write `graph` according to `mode`, returning what was written
    pub fn save_with(&self, graph: &DependencyGraph, mode: WriteMode) -> StoreResult<DependencyGraph> {
        let to_write = match mode {
            WriteMode::Overwrite => graph.clone(),
            WriteMode::Merge => match self.load() {
                Ok(mut existing) => {
                    debug!(
                        existing = existing.len(),
                        incoming = graph.len(),
                        "Merging into existing graph artifact"
                    );
                    existing.merge(graph.clone());
                    existing
                }
                Err(StoreError::NotFound(_)) => graph.clone(),
                Err(e) => return Err(e),
            },
        };

        self.write_atomic(&to_write)?;
        Ok(to_write)
    }

    /// Reload the artifact.
    ///
    /// A missing file is `NotFound` and an unparseable one is `Corrupt`;
    /// neither degrades to an empty graph.
    pub fn load(&self) -> StoreResult<DependencyGraph> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(self.path.clone()))
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        let graph: DependencyGraph =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        debug!(
            path = %self.path.display(),
            concepts = graph.len(),
            "Loaded graph artifact"
        );
        Ok(graph)
    }

    fn write_atomic(&self, graph: &DependencyGraph) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(graph)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp_path = self.tmp_path();
        std::fs::write(&tmp_path, content)?;
        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        info!(
            path = %self.path.display(),
            concepts = graph.len(),
            edges = graph.edge_count(),
            "Saved graph artifact"
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("graph.json"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::graph;
    use crate::Concept;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path().join("deps.json"));
        let g = graph(&[
            ("Power", &["Work", "Energy"]),
            ("Work", &["Energy"]),
            ("Energy", &[]),
        ]);

        store.save(&g).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded, g);
        let keys: Vec<&str> = loaded.concepts().map(Concept::as_str).collect();
        assert_eq!(keys, vec!["Power", "Work", "Energy"]);
    }

    #[test]
    fn test_artifact_is_pretty_printed_object() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path().join("deps.json"));
        store.save(&graph(&[("Work", &["Energy"])])).unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value, serde_json::json!({"Work": ["Energy"]}));
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path().join("missing.json"));
        let err = store.load().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_load_garbage_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deps.json");
        std::fs::write(&path, "not json at all").unwrap();
        assert!(GraphStore::new(&path).load().unwrap_err().is_corrupt());

        std::fs::write(&path, r#"{"Work": "Energy"}"#).unwrap();
        assert!(GraphStore::new(&path).load().unwrap_err().is_corrupt());
    }

    #[test]
    fn test_load_rebuilds_graph_without_self_loops_or_duplicates() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path().join("deps.json"));
        std::fs::write(
            store.path(),
            r#"{"Work": ["Work", "Energy", "Energy", " Force "], "Energy": []}"#,
        )
        .unwrap();

        let loaded = store.load().unwrap();

        assert_eq!(loaded, graph(&[("Work", &["Energy", "Force"]), ("Energy", &[])]));
        assert_eq!(loaded.edge_count(), 2);
        assert!(loaded.learning_order().is_ok());
    }

    #[test]
    fn test_load_blank_concept_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path().join("deps.json"));
        std::fs::write(store.path(), r#"{"Work": ["Energy"], "   ": ["Mass"]}"#).unwrap();
        assert!(store.load().unwrap_err().is_corrupt());

        std::fs::write(store.path(), r#"{"Work": [""]}"#).unwrap();
        assert!(store.load().unwrap_err().is_corrupt());
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("deps.json");
        // a non-empty directory in the way makes the rename fail
        std::fs::create_dir_all(target.join("occupied")).unwrap();
        let store = GraphStore::new(&target);

        let err = store.save(&graph(&[("Work", &["Energy"])])).unwrap_err();

        assert!(matches!(err, StoreError::Io(_)));
        assert!(!store.tmp_path().exists());
        assert!(target.is_dir());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path().join("nested/run/deps.json"));
        store.save(&DependencyGraph::new()).unwrap();
        assert!(store.exists());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_merge_mode_unions_with_existing() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path().join("deps.json"));
        store.save(&graph(&[("Work", &["Energy"]), ("Energy", &[])])).unwrap();

        let written = store
            .save_with(&graph(&[("Power", &["Work"])]), WriteMode::Merge)
            .unwrap();

        assert_eq!(written.len(), 3);
        assert_eq!(store.load().unwrap(), written);
    }

    #[test]
    fn test_merge_mode_without_existing_writes_graph() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path().join("deps.json"));
        let g = graph(&[("Power", &["Work"])]);
        assert_eq!(store.save_with(&g, WriteMode::Merge).unwrap(), g);
    }

    #[test]
    fn test_overwrite_mode_replaces() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path().join("deps.json"));
        store.save(&graph(&[("Work", &["Energy"])])).unwrap();
        let g = graph(&[("Power", &[])]);
        store.save_with(&g, WriteMode::Overwrite).unwrap();
        assert_eq!(store.load().unwrap(), g);
    }

    fn concept_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z ]{0,12}[A-Za-z]"
    }

    proptest! {
        #[test]
        fn prop_save_load_round_trip(
            entries in proptest::collection::vec(
                (concept_name(), proptest::collection::vec(concept_name(), 0..4)),
                0..8,
            )
        ) {
            let g: DependencyGraph = entries
                .into_iter()
                .filter_map(|(k, deps)| {
                    Some((Concept::new(k)?, deps.into_iter().filter_map(Concept::new).collect()))
                })
                .collect();

            let dir = tempdir().unwrap();
            let store = GraphStore::new(dir.path().join("deps.json"));
            store.save(&g).unwrap();
            let loaded = store.load().unwrap();

            prop_assert_eq!(&loaded, &g);
            let original: Vec<_> = g.iter().collect();
            let reloaded: Vec<_> = loaded.iter().collect();
            prop_assert_eq!(original, reloaded);
        }
    }
}
