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

//! Concept extraction over batches of chunks
//!
//! Chunks are grouped into contiguous batches and each batch is sent as the
//! context of one extraction request. Every non-empty reply line becomes a
//! candidate concept in the running [`ConceptSet`].

use crate::config::ExtractionFailurePolicy;
use crate::error::{ConfigError, PipelineError, PipelineResult};
use crate::llm_client::{complete_with_timeout, LLMClient, LLMError};
use crate::prompts;
use crate::response::concept_lines;
use conceptmap_core::ConceptSet;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A batch whose model call failed and was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub batch: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub concepts: ConceptSet,
    /// Number of batches attempted
    pub batches: usize,
    pub failed_batches: Vec<BatchFailure>,
}

impl ExtractionOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.failed_batches.is_empty()
    }
}

pub struct ConceptExtractor {
    llm_client: Arc<dyn LLMClient>,
    prompt: String,
    failure_policy: ExtractionFailurePolicy,
    concurrency: usize,
    timeout: Duration,
}

impl ConceptExtractor {
    pub fn new(llm_client: Arc<dyn LLMClient>) -> Self {
        Self {
            llm_client,
            prompt: prompts::CONCEPT_EXTRACTION.to_string(),
            failure_policy: ExtractionFailurePolicy::default(),
            concurrency: 1,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_prompt(mut self, prompt: String) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_failure_policy(mut self, policy: ExtractionFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Batches in flight at once. Results are still folded in chunk order.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extract candidate concepts from `chunks`, `batch_size` chunks per
    /// request.
    pub async fn extract(&self, chunks: &[String], batch_size: usize) -> PipelineResult<ExtractionOutcome> {
        if batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize.into());
        }

        let batches: Vec<(usize, String)> = chunks
            .chunks(batch_size)
            .map(|batch| batch.join(" "))
            .enumerate()
            .collect();

        let mut outcome = ExtractionOutcome {
            batches: batches.len(),
            ..ExtractionOutcome::default()
        };

        // Abort returns before any later batch is requested
        let mut results = stream::iter(batches)
            .map(|(index, text)| async move { (index, self.extract_batch(index, &text).await) })
            .buffered(self.concurrency);

        while let Some((index, result)) = results.next().await {
            match result {
                Ok(concepts) => {
                    let added = outcome.concepts.union_with(concepts);
                    debug!(batch = index, new_concepts = added, "Merged batch concepts");
                }
                Err(e) => match self.failure_policy {
                    ExtractionFailurePolicy::SkipBatch => {
                        warn!(batch = index, error = %e, "Extraction batch failed; skipping");
                        outcome.failed_batches.push(BatchFailure {
                            batch: index,
                            error: e.to_string(),
                        });
                    }
                    ExtractionFailurePolicy::Abort => {
                        return Err(PipelineError::ExtractionBatch {
                            batch: index,
                            source: e,
                        });
                    }
                },
            }
        }

        Ok(outcome)
    }

    async fn extract_batch(&self, index: usize, text: &str) -> Result<ConceptSet, LLMError> {
        let response =
            complete_with_timeout(self.llm_client.as_ref(), &self.prompt, Some(text), self.timeout).await?;
        let concepts: ConceptSet = concept_lines(&response.content).into_iter().collect();
        debug!(
            batch = index,
            chars = text.len(),
            concepts = concepts.len(),
            "Extracted batch"
        );
        Ok(concepts)
    }
}
