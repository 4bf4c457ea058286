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

//! Concept normalization
//!
//! Reduces the raw extracted set to a list of fundamental concepts with a
//! single model call.

use crate::error::PipelineResult;
use crate::llm_client::{complete_with_timeout, LLMClient};
use crate::prompts;
use crate::response::concept_lines;
use conceptmap_core::{Concept, ConceptSet};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct ConceptNormalizer {
    llm_client: Arc<dyn LLMClient>,
    prompt: String,
    timeout: Duration,
}

impl ConceptNormalizer {
    pub fn new(llm_client: Arc<dyn LLMClient>) -> Self {
        Self {
            llm_client,
            prompt: prompts::CONCEPT_NORMALIZATION.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Custom template; must contain `{concepts}`
    pub fn with_prompt(mut self, prompt: String) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Normalize `concepts` into fundamental concepts, in reply order with
    /// duplicates removed. An empty input makes no request.
    pub async fn normalize(&self, concepts: &ConceptSet) -> PipelineResult<Vec<Concept>> {
        if concepts.is_empty() {
            return Ok(Vec::new());
        }

        // The set iterates in sorted order, so the prompt is deterministic
        let listing = concepts
            .iter()
            .map(Concept::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = prompts::fill(&self.prompt, "concepts", &listing);

        let response = complete_with_timeout(self.llm_client.as_ref(), &prompt, None, self.timeout).await?;

        let mut seen = HashSet::new();
        let normalized: Vec<Concept> = concept_lines(&response.content)
            .into_iter()
            .filter(|c| seen.insert(c.clone()))
            .collect();

        debug!(
            input = concepts.len(),
            output = normalized.len(),
            "Normalized concepts"
        );
        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::llm_client::mock::ScriptedClient;

    fn set(names: &[&str]) -> ConceptSet {
        names.iter().filter_map(Concept::new).collect()
    }

    #[tokio::test]
    async fn test_prompt_lists_sorted_candidates() {
        let client = Arc::new(ScriptedClient::new().reply("most fundamental concepts", "Energy\nWork"));
        let normalizer = ConceptNormalizer::new(client.clone());

        normalizer
            .normalize(&set(&["work and energy", "Energy", "Work"]))
            .await
            .unwrap();

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.ends_with("Concepts:\nEnergy\nWork\nwork and energy"));
        assert!(calls[0].1.is_none());
    }

    #[tokio::test]
    async fn test_reply_order_kept_and_duplicates_dropped() {
        let client = Arc::new(
            ScriptedClient::new().reply("most fundamental concepts", "Work\n\n  Energy \n- Work\nPower"),
        );
        let normalized = ConceptNormalizer::new(client)
            .normalize(&set(&["Work", "Energy", "Power"]))
            .await
            .unwrap();

        let names: Vec<&str> = normalized.iter().map(Concept::as_str).collect();
        assert_eq!(names, vec!["Work", "Energy", "Power"]);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_request() {
        let client = Arc::new(ScriptedClient::new());
        let normalized = ConceptNormalizer::new(client.clone())
            .normalize(&ConceptSet::new())
            .await
            .unwrap();
        assert!(normalized.is_empty());
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_failure_is_an_error() {
        let client = Arc::new(ScriptedClient::new().fail("most fundamental concepts", "overloaded"));
        let err = ConceptNormalizer::new(client)
            .normalize(&set(&["Work"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Llm(_)));
    }
}
