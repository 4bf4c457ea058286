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

//! Dependency inference: free-text prerequisite statements per concept

use crate::error::PipelineResult;
use crate::llm_client::{complete_with_timeout, LLMClient};
use crate::prompts;
use crate::response::response_lines;
use conceptmap_core::Concept;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct DependencyInferrer {
    llm_client: Arc<dyn LLMClient>,
    prompt: String,
    timeout: Duration,
}

impl DependencyInferrer {
    pub fn new(llm_client: Arc<dyn LLMClient>) -> Self {
        Self {
            llm_client,
            prompt: prompts::DEPENDENCY_INFERENCE.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_prompt(mut self, prompt: String) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ask for the prerequisites of each concept. The reply lines are
    /// returned as-is (trimmed, blanks removed); no structure is imposed here.
    pub async fn infer(&self, concepts: &[Concept]) -> PipelineResult<Vec<String>> {
        if concepts.is_empty() {
            return Ok(Vec::new());
        }

        let listing = concepts
            .iter()
            .map(Concept::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = prompts::fill(&self.prompt, "concepts", &listing);

        let response = complete_with_timeout(self.llm_client.as_ref(), &prompt, None, self.timeout).await?;
        let lines = response_lines(&response.content);

        debug!(concepts = concepts.len(), lines = lines.len(), "Inferred dependencies");
        Ok(lines)
    }
}
