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

//! Dependency parsing
//!
//! Turns free-text dependency statements into a [`DependencyGraph`] by asking
//! the model to restate them as a JSON object and then reading that object
//! strictly. Anything the model gets wrong degrades to an empty graph with a
//! recorded [`GraphParseFailure`]; the run itself keeps going.

use crate::config::UnknownPrerequisitePolicy;
use crate::llm_client::{complete_with_timeout, LLMClient};
use crate::prompts;
use crate::response::{json_object_span, strip_code_fence};
use conceptmap_core::{Concept, DependencyGraph, EdgeInsert};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Literal the model uses for "no prerequisites"
const NONE_MARKER: &str = "None";

/// Longest slice of the raw reply kept in a failure record
const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFailureKind {
    /// The reformatting request itself failed
    ModelCall,
    /// The reply was not valid JSON
    Json,
    /// Valid JSON, but not an object of concept -> prerequisites
    Shape,
}

/// Why a parse degraded to an empty graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphParseFailure {
    pub kind: ParseFailureKind,
    pub message: String,
    pub raw_excerpt: String,
}

impl GraphParseFailure {
    fn new(kind: ParseFailureKind, message: impl Into<String>, raw: &str) -> Self {
        Self {
            kind,
            message: message.into(),
            raw_excerpt: raw.chars().take(EXCERPT_CHARS).collect(),
        }
    }
}

impl fmt::Display for GraphParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ParseFailureKind::ModelCall => "model call failed",
            ParseFailureKind::Json => "invalid JSON",
            ParseFailureKind::Shape => "unexpected JSON shape",
        };
        write!(f, "{}: {}", kind, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedGraph {
    pub graph: DependencyGraph,
    pub failure: Option<GraphParseFailure>,
    /// Self-loops, duplicates and rejected prerequisites removed while reading
    pub dropped_edges: usize,
}

impl ParsedGraph {
    fn degraded(failure: GraphParseFailure) -> Self {
        Self {
            graph: DependencyGraph::new(),
            failure: Some(failure),
            dropped_edges: 0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

pub struct DependencyParser {
    llm_client: Arc<dyn LLMClient>,
    prompt: String,
    timeout: Duration,
    unknown_policy: UnknownPrerequisitePolicy,
}

impl DependencyParser {
    pub fn new(llm_client: Arc<dyn LLMClient>) -> Self {
        Self {
            llm_client,
            prompt: prompts::DEPENDENCY_JSON_CONVERSION.to_string(),
            timeout: Duration::from_secs(60),
            unknown_policy: UnknownPrerequisitePolicy::default(),
        }
    }

    /// Custom template; must contain `{dependencies}`
    pub fn with_prompt(mut self, prompt: String) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_unknown_policy(mut self, policy: UnknownPrerequisitePolicy) -> Self {
        self.unknown_policy = policy;
        self
    }

    /// Build the dependency graph for `lines`. Never fails: model errors and
    /// malformed replies come back as an empty graph with `failure` set.
    pub async fn to_graph(&self, lines: &[String]) -> ParsedGraph {
        if lines.is_empty() {
            return ParsedGraph::default();
        }

        let prompt = prompts::fill(&self.prompt, "dependencies", &lines.join("\n"));
        let parsed = match complete_with_timeout(self.llm_client.as_ref(), &prompt, None, self.timeout).await {
            Ok(response) => parse_graph_json(&response.content, self.unknown_policy),
            Err(e) => ParsedGraph::degraded(GraphParseFailure::new(
                ParseFailureKind::ModelCall,
                e.to_string(),
                "",
            )),
        };

        match &parsed.failure {
            Some(failure) => {
                warn!(error = %failure, "Dependency parsing degraded to an empty graph");
            }
            None => {
                debug!(
                    concepts = parsed.graph.len(),
                    edges = parsed.graph.edge_count(),
                    dropped = parsed.dropped_edges,
                    "Parsed dependency graph"
                );
            }
        }
        parsed
    }
}

/// Read a model reply as a concept -> prerequisites object.
pub fn parse_graph_json(text: &str, policy: UnknownPrerequisitePolicy) -> ParsedGraph {
    let body = strip_code_fence(text);
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(first) => match json_object_span(body).map(serde_json::from_str::<Value>) {
            Some(Ok(value)) => value,
            _ => {
                return ParsedGraph::degraded(GraphParseFailure::new(
                    ParseFailureKind::Json,
                    first.to_string(),
                    text,
                ))
            }
        },
    };

    let Value::Object(object) = value else {
        return ParsedGraph::degraded(GraphParseFailure::new(
            ParseFailureKind::Shape,
            "top level is not an object",
            text,
        ));
    };

    let mut graph = DependencyGraph::new();
    let mut dropped_edges = 0;

    for (key, value) in object {
        let prerequisites = match prerequisite_names(&value) {
            Some(names) => names,
            None => {
                return ParsedGraph::degraded(GraphParseFailure::new(
                    ParseFailureKind::Shape,
                    format!("prerequisites of {:?} are neither a list nor a string", key),
                    text,
                ))
            }
        };

        let Some(concept) = concept_name(&key) else {
            continue;
        };
        graph.add_concept(concept.clone());

        for name in prerequisites {
            let Some(prerequisite) = concept_name(name) else {
                continue;
            };
            match graph.add_dependency(concept.clone(), prerequisite) {
                EdgeInsert::Added => {}
                EdgeInsert::Duplicate | EdgeInsert::SelfLoop => dropped_edges += 1,
            }
        }
    }

    if policy == UnknownPrerequisitePolicy::Reject {
        let known: HashSet<Concept> = graph.concepts().cloned().collect();
        let rejected = graph.retain_edges(|_, prerequisite| known.contains(prerequisite));
        for edge in &rejected {
            warn!(
                concept = %edge.concept,
                prerequisite = %edge.prerequisite,
                "Dropping prerequisite that is not a known concept"
            );
        }
        dropped_edges += rejected.len();
    }

    ParsedGraph {
        graph,
        failure: None,
        dropped_edges,
    }
}

/// Prerequisite names of one entry, or `None` when the value has the wrong shape
fn prerequisite_names(value: &Value) -> Option<Vec<&str>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(Value::as_str).collect()),
        Value::String(s) => Some(vec![s.as_str()]),
        Value::Null => Some(Vec::new()),
        _ => None,
    }
}

fn concept_name(raw: &str) -> Option<Concept> {
    Concept::new(raw).filter(|c| c.as_str() != NONE_MARKER)
}
