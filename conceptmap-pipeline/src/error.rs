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

//! Pipeline error types
//!
//! Only structural failures live here. Model noise (a failed extraction
//! batch under the skip policy, unparseable dependency JSON) is recorded in
//! the stage outcomes instead of being raised.

use crate::config::Provider;
use crate::llm_client::LLMError;
use conceptmap_core::StoreError;
use thiserror::Error;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A batch failed while the extraction policy is `Abort`
    #[error("Extraction failed for batch {batch}: {source}")]
    ExtractionBatch {
        batch: usize,
        #[source]
        source: LLMError,
    },

    #[error("LLM client error: {0}")]
    Llm(#[from] LLMError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Document error: {0}")]
    Document(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Batch size must be at least 1")]
    InvalidBatchSize,

    #[error("Extraction concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("Chunk overlap {overlap} must be smaller than chunk size {size}")]
    InvalidChunking { size: usize, overlap: usize },

    #[error("Request timeout must be greater than zero")]
    InvalidTimeout,

    #[error("No API key configured for provider {0}")]
    MissingApiKey(Provider),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(String),
}
