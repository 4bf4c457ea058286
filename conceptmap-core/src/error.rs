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

//! Graph store error types

use std::path::PathBuf;
use thiserror::Error;

/// Result type for graph store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised when persisting or reloading a graph artifact.
///
/// These are workflow failures, not model noise, so they always propagate.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No artifact at the configured path
    #[error("Graph artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Artifact exists but is not a concept -> prerequisites mapping
    #[error("Graph artifact {} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. })
    }
}
