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

//! Response cache for model calls
//!
//! Re-running the pipeline over the same document issues the same prompts;
//! caching the replies keeps those re-runs cheap and their output stable.

use crate::llm_client::{LLMClient, LLMError, LLMResponse};
use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Client wrapper that memoizes successful replies by (model, prompt, context)
pub struct CachedClient {
    inner: Arc<dyn LLMClient>,
    cache: Cache<u64, LLMResponse>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl CachedClient {
    pub fn new(inner: Arc<dyn LLMClient>, max_capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::builder().max_capacity(max_capacity).build(),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    fn key(&self, prompt: &str, context: Option<&str>) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.inner.model_name().hash(&mut hasher);
        prompt.hash(&mut hasher);
        context.hash(&mut hasher);
        hasher.finish()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

#[async_trait]
impl LLMClient for CachedClient {
    async fn complete(&self, prompt: &str, context: Option<&str>) -> Result<LLMResponse, LLMError> {
        let key = self.key(prompt, context);
        if let Some(cached) = self.cache.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        // Failures are not cached so a retry reaches the service again
        let response = self.inner.complete(prompt, context).await?;
        self.cache.insert(key, response.clone()).await;
        Ok(response)
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}
