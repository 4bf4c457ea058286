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

//! Concept map configuration
//!
//! Built once at process start (file, then environment overlay) and passed
//! explicitly to the client factory and the pipeline.

use crate::error::ConfigError;
use conceptmap_core::WriteMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConceptMapConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Model service provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAI,
    Anthropic,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAI => f.write_str("openai"),
            Provider::Anthropic => f.write_str("anthropic"),
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: Provider,

    #[serde(default = "default_model")]
    pub model: String,

    /// Falls back to OPENAI_API_KEY / ANTHROPIC_API_KEY
    #[serde(default)]
    pub api_key: Option<String>,

    /// Override the provider's API base URL (proxies, local gateways)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Upper bound on every model request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_cache_responses")]
    pub cache_responses: bool,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl LlmConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: default_model(),
            api_key: None,
            base_url: None,
            request_timeout_secs: default_request_timeout(),
            max_tokens: default_max_tokens(),
            cache_responses: default_cache_responses(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// What the extractor does when a batch's model call fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionFailurePolicy {
    /// Log the failure, record it in the outcome and continue
    #[default]
    SkipBatch,
    /// Stop the run with the first batch error
    Abort,
}

/// What the dependency parser does with prerequisites that are not keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPrerequisitePolicy {
    /// Keep them as implicit vertices
    #[default]
    Admit,
    /// Drop the edge and log it
    Reject,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Chunks per extraction request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Extraction batches in flight at once (1 = sequential)
    #[serde(default = "default_extraction_concurrency")]
    pub extraction_concurrency: usize,

    #[serde(default)]
    pub extraction_failure: ExtractionFailurePolicy,

    #[serde(default)]
    pub unknown_prerequisites: UnknownPrerequisitePolicy,

    /// Maximum characters per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters carried over between consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            extraction_concurrency: default_extraction_concurrency(),
            extraction_failure: ExtractionFailurePolicy::default(),
            unknown_prerequisites: UnknownPrerequisitePolicy::default(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Location of the graph artifact
    #[serde(default = "default_graph_path")]
    pub graph_path: PathBuf,

    #[serde(default)]
    pub write_mode: WriteMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            graph_path: default_graph_path(),
            write_mode: WriteMode::default(),
        }
    }
}

// Default values
fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_cache_responses() -> bool {
    true
}

fn default_cache_capacity() -> u64 {
    1_000
}

fn default_batch_size() -> usize {
    5
}

fn default_extraction_concurrency() -> usize {
    1
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_graph_path() -> PathBuf {
    PathBuf::from("concept_dependencies.json")
}

impl ConceptMapConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// File (if given) or defaults, then environment overlay, then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables.
    ///
    /// Supported environment variables:
    /// - CONCEPTMAP_PROVIDER: openai | anthropic
    /// - CONCEPTMAP_MODEL: model name
    /// - CONCEPTMAP_BASE_URL: API base URL override
    /// - CONCEPTMAP_TIMEOUT_SECS: per-request timeout
    /// - CONCEPTMAP_BATCH_SIZE: chunks per extraction request
    /// - CONCEPTMAP_GRAPH_PATH: graph artifact location
    /// - OPENAI_API_KEY / ANTHROPIC_API_KEY: used when no key is configured
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = var("CONCEPTMAP_PROVIDER") {
            self.llm.provider = provider.parse()?;
        }

        if let Some(model) = var("CONCEPTMAP_MODEL") {
            self.llm.model = model;
        }

        if let Some(base_url) = var("CONCEPTMAP_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }

        if let Some(timeout) = var("CONCEPTMAP_TIMEOUT_SECS") {
            self.llm.request_timeout_secs = parse_var("CONCEPTMAP_TIMEOUT_SECS", &timeout)?;
        }

        if let Some(batch_size) = var("CONCEPTMAP_BATCH_SIZE") {
            self.pipeline.batch_size = parse_var("CONCEPTMAP_BATCH_SIZE", &batch_size)?;
        }

        if let Some(path) = var("CONCEPTMAP_GRAPH_PATH") {
            self.store.graph_path = PathBuf::from(path);
        }

        if self.llm.api_key.is_none() {
            let key_var = match self.llm.provider {
                Provider::OpenAI => "OPENAI_API_KEY",
                Provider::Anthropic => "ANTHROPIC_API_KEY",
            };
            self.llm.api_key = var(key_var);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        if self.pipeline.extraction_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        if self.pipeline.chunk_size == 0 || self.pipeline.chunk_overlap >= self.pipeline.chunk_size {
            return Err(ConfigError::InvalidChunking {
                size: self.pipeline.chunk_size,
                overlap: self.pipeline.chunk_overlap,
            });
        }
        if self.llm.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::Parse(format!("{}={:?}: {}", name, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ConceptMapConfig::default();
        assert_eq!(config.pipeline.batch_size, 5);
        assert_eq!(config.pipeline.chunk_size, 1000);
        assert_eq!(config.pipeline.chunk_overlap, 200);
        assert_eq!(config.pipeline.extraction_failure, ExtractionFailurePolicy::SkipBatch);
        assert_eq!(config.pipeline.unknown_prerequisites, UnknownPrerequisitePolicy::Admit);
        assert_eq!(config.store.graph_path, PathBuf::from("concept_dependencies.json"));
        assert_eq!(config.store.write_mode, WriteMode::Overwrite);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: ConceptMapConfig = toml::from_str(
            r#"
            [llm]
            provider = "anthropic"
            model = "claude-3-5-sonnet-20241022"

            [pipeline]
            batch_size = 3
            unknown_prerequisites = "reject"
            extraction_failure = "abort"

            [store]
            graph_path = "out/graph.json"
            write_mode = "merge"
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.provider, Provider::Anthropic);
        assert_eq!(config.llm.request_timeout_secs, 60);
        assert_eq!(config.pipeline.batch_size, 3);
        assert_eq!(config.pipeline.chunk_size, 1000);
        assert_eq!(config.pipeline.unknown_prerequisites, UnknownPrerequisitePolicy::Reject);
        assert_eq!(config.pipeline.extraction_failure, ExtractionFailurePolicy::Abort);
        assert_eq!(config.store.write_mode, WriteMode::Merge);
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("CONCEPTMAP_PROVIDER", "anthropic"),
            ("CONCEPTMAP_BATCH_SIZE", "8"),
            ("CONCEPTMAP_GRAPH_PATH", "/tmp/g.json"),
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("OPENAI_API_KEY", "wrong-provider"),
        ]);

        let mut config = ConceptMapConfig::default();
        config
            .apply_vars(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.llm.provider, Provider::Anthropic);
        assert_eq!(config.pipeline.batch_size, 8);
        assert_eq!(config.store.graph_path, PathBuf::from("/tmp/g.json"));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_malformed_numeric_vars_are_errors() {
        let mut config = ConceptMapConfig::default();
        let err = config
            .apply_vars(|name| (name == "CONCEPTMAP_BATCH_SIZE").then(|| "five".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(msg) if msg.contains("CONCEPTMAP_BATCH_SIZE")));
        assert_eq!(config.pipeline.batch_size, 5);

        let mut config = ConceptMapConfig::default();
        let err = config
            .apply_vars(|name| (name == "CONCEPTMAP_TIMEOUT_SECS").then(|| "-3".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(msg) if msg.contains("CONCEPTMAP_TIMEOUT_SECS")));
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let mut config = ConceptMapConfig::default();
        let err = config
            .apply_vars(|name| (name == "CONCEPTMAP_PROVIDER").then(|| "bard".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProvider(p) if p == "bard"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ConceptMapConfig::default();
        config.pipeline.batch_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBatchSize)));

        let mut config = ConceptMapConfig::default();
        config.pipeline.chunk_overlap = 1000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidChunking { size: 1000, overlap: 1000 })
        ));

        let mut config = ConceptMapConfig::default();
        config.llm.request_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimeout)));
    }
}
