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

//! Conceptmap Pipeline
//!
//! LLM-driven stages that turn a document into a concept dependency graph:
//!
//! 1. **Chunking** - load text or PDF and split it into overlapping chunks
//! 2. **Extraction** - candidate concepts per batch of chunks
//! 3. **Normalization** - reduce candidates to fundamental concepts
//! 4. **Inference** - free-text prerequisite statements per concept
//! 5. **Parsing** - restate the statements as JSON and build the graph
//!
//! [`ConceptMapPipeline`] runs them in order and persists the result through
//! a [`conceptmap_core::GraphStore`].
//!
//! # Example
//!
//! ```rust,no_run
//! use conceptmap_core::GraphStore;
//! use conceptmap_pipeline::{build_client, ConceptMapConfig, ConceptMapPipeline};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConceptMapConfig::load(None)?;
//! let client = build_client(&config.llm)?;
//! let pipeline = ConceptMapPipeline::new(client, &config)?;
//!
//! let chunks = pipeline.chunk_document(Path::new("physics.pdf"))?;
//! let store = GraphStore::new(&config.store.graph_path);
//! let run = pipeline.run_and_save(&chunks, &store, config.store.write_mode).await?;
//! println!("{} concepts", run.report.concepts);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod chunker;
pub mod config;
pub mod error;
pub mod extractor;
pub mod inferrer;
pub mod llm_client;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod response;

// Re-exports
pub use cache::{CacheStats, CachedClient};
pub use chunker::{load_document, TextSplitter};
pub use config::{
    ConceptMapConfig, ExtractionFailurePolicy, LlmConfig, PipelineConfig, Provider, StoreConfig,
    UnknownPrerequisitePolicy,
};
pub use error::{ConfigError, PipelineError, PipelineResult};
pub use extractor::{BatchFailure, ConceptExtractor, ExtractionOutcome};
pub use inferrer::DependencyInferrer;
pub use llm_client::{
    build_client, AnthropicClient, LLMClient, LLMError, LLMResponse, OpenAIClient, TokenUsage,
};
pub use normalizer::ConceptNormalizer;
pub use parser::{parse_graph_json, DependencyParser, GraphParseFailure, ParseFailureKind, ParsedGraph};
pub use pipeline::{ConceptMapPipeline, PipelineReport, PipelineRun};
