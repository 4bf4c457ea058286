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

//! Pipeline orchestration
//!
//! Runs extract -> normalize -> infer -> parse for one document and reports
//! what happened along the way. Empty intermediate results are not errors:
//! later stages skip their model call and the run finishes with an empty
//! graph and a degraded report.

use crate::chunker::{load_document, TextSplitter};
use crate::config::ConceptMapConfig;
use crate::error::{ConfigError, PipelineResult};
use crate::extractor::{BatchFailure, ConceptExtractor};
use crate::inferrer::DependencyInferrer;
use crate::llm_client::LLMClient;
use crate::normalizer::ConceptNormalizer;
use crate::parser::{DependencyParser, GraphParseFailure};
use chrono::{DateTime, Utc};
use conceptmap_core::{Concept, DependencyGraph, GraphStore, WriteMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Summary of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Extraction batches attempted
    pub batches: usize,
    pub failed_batches: Vec<BatchFailure>,
    /// Distinct candidates before normalization
    pub raw_concepts: usize,
    /// Concepts after normalization
    pub concepts: usize,
    pub dependency_lines: usize,
    pub parse_failure: Option<GraphParseFailure>,
    pub dropped_edges: usize,
    pub edges: usize,
    /// Vertices in the final graph
    pub graph_concepts: usize,
    /// Set when a batch failed, parsing degraded, or the run ended with no graph
    pub degraded: bool,
}

impl PipelineReport {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            batches: 0,
            failed_batches: Vec::new(),
            raw_concepts: 0,
            concepts: 0,
            dependency_lines: 0,
            parse_failure: None,
            dropped_edges: 0,
            edges: 0,
            graph_concepts: 0,
            degraded: false,
        }
    }

    fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        // Concepts that never reach the graph are as lost as an empty extraction
        let lost_concepts = self.concepts > 0 && (self.dependency_lines == 0 || self.graph_concepts == 0);
        self.degraded = !self.failed_batches.is_empty()
            || self.concepts == 0
            || self.parse_failure.is_some()
            || lost_concepts;
        self
    }
}

#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub concepts: Vec<Concept>,
    pub graph: DependencyGraph,
    pub report: PipelineReport,
}

pub struct ConceptMapPipeline {
    splitter: TextSplitter,
    batch_size: usize,
    extractor: ConceptExtractor,
    normalizer: ConceptNormalizer,
    inferrer: DependencyInferrer,
    parser: DependencyParser,
}

impl ConceptMapPipeline {
    /// Wire every stage to `client` using the settings in `config`.
    pub fn new(client: Arc<dyn LLMClient>, config: &ConceptMapConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pipeline = &config.pipeline;
        let timeout = config.llm.request_timeout();

        Ok(Self {
            splitter: TextSplitter::new(pipeline.chunk_size, pipeline.chunk_overlap)?,
            batch_size: pipeline.batch_size,
            extractor: ConceptExtractor::new(client.clone())
                .with_failure_policy(pipeline.extraction_failure)
                .with_concurrency(pipeline.extraction_concurrency)
                .with_timeout(timeout),
            normalizer: ConceptNormalizer::new(client.clone()).with_timeout(timeout),
            inferrer: DependencyInferrer::new(client.clone()).with_timeout(timeout),
            parser: DependencyParser::new(client)
                .with_timeout(timeout)
                .with_unknown_policy(pipeline.unknown_prerequisites),
        })
    }

    /// Load `path` and split it into chunks
    pub fn chunk_document(&self, path: &Path) -> PipelineResult<Vec<String>> {
        let text = load_document(path)?;
        Ok(self.splitter.split(&text))
    }

    pub async fn run(&self, chunks: &[String]) -> PipelineResult<PipelineRun> {
        let report = PipelineReport::start();
        let run_span = info_span!("concept_map_run", run_id = %report.run_id, chunks = chunks.len());
        self.run_stages(chunks, report).instrument(run_span).await
    }

    async fn run_stages(&self, chunks: &[String], mut report: PipelineReport) -> PipelineResult<PipelineRun> {
        if chunks.is_empty() {
            warn!("No chunks to process");
        }

        let outcome = self
            .extractor
            .extract(chunks, self.batch_size)
            .instrument(info_span!("extract", batch_size = self.batch_size))
            .await?;
        report.batches = outcome.batches;
        report.raw_concepts = outcome.concepts.len();
        report.failed_batches = outcome.failed_batches;

        let concepts = self
            .normalizer
            .normalize(&outcome.concepts)
            .instrument(info_span!("normalize", candidates = report.raw_concepts))
            .await?;
        report.concepts = concepts.len();

        let lines = self
            .inferrer
            .infer(&concepts)
            .instrument(info_span!("infer", concepts = concepts.len()))
            .await?;
        report.dependency_lines = lines.len();

        let parsed = self
            .parser
            .to_graph(&lines)
            .instrument(info_span!("parse", lines = lines.len()))
            .await;
        report.parse_failure = parsed.failure;
        report.dropped_edges = parsed.dropped_edges;
        report.edges = parsed.graph.edge_count();
        report.graph_concepts = parsed.graph.len();

        let report = report.finish();
        info!(
            batches = report.batches,
            failed_batches = report.failed_batches.len(),
            raw_concepts = report.raw_concepts,
            concepts = report.concepts,
            edges = report.edges,
            degraded = report.degraded,
            "Concept map run finished"
        );

        Ok(PipelineRun {
            concepts,
            graph: parsed.graph,
            report,
        })
    }

    /// Run and persist the graph with `mode`. A degraded empty graph never
    /// replaces an existing artifact.
    pub async fn run_and_save(
        &self,
        chunks: &[String],
        store: &GraphStore,
        mode: WriteMode,
    ) -> PipelineResult<PipelineRun> {
        let run = self.run(chunks).await?;
        if run.report.degraded && run.graph.is_empty() && store.exists() {
            warn!(
                path = %store.path().display(),
                run_id = %run.report.run_id,
                "Degraded run produced no graph; keeping existing artifact"
            );
            return Ok(run);
        }
        let written = store.save_with(&run.graph, mode)?;
        info!(
            path = %store.path().display(),
            concepts = written.len(),
            mode = ?mode,
            "Saved concept graph"
        );
        Ok(run)
    }
}
