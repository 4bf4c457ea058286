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

//! Conceptmap CLI
//!
//! Build a concept dependency map from a document and inspect stored maps.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use conceptmap_core::{render, DependencyGraph, GraphStore, WriteMode};
use conceptmap_pipeline::{build_client, ConceptMapConfig, ConceptMapPipeline};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "conceptmap")]
#[command(about = "Conceptmap - prerequisite maps of the concepts in a document", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract concepts from a document and store their dependency graph
    Run {
        /// Text or PDF document
        document: PathBuf,

        /// Graph artifact path (defaults to the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Merge into an existing artifact instead of overwriting it
        #[arg(long)]
        merge: bool,

        /// Also write a Graphviz DOT rendering
        #[arg(long)]
        dot: Option<PathBuf>,
    },

    /// Render a stored graph
    Render {
        /// Graph artifact path
        #[arg(short, long)]
        graph: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "dot")]
        format: RenderFormat,
    },

    /// List root concepts (no prerequisites)
    Roots {
        #[arg(short, long)]
        graph: Option<PathBuf>,
    },

    /// Print a learning order, prerequisites first
    Order {
        #[arg(short, long)]
        graph: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RenderFormat {
    Dot,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let config = ConceptMapConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Run {
            document,
            output,
            merge,
            dot,
        } => {
            let client = build_client(&config.llm).context("Failed to configure model client")?;
            let pipeline = ConceptMapPipeline::new(client, &config)?;
            let store = GraphStore::new(output.unwrap_or_else(|| config.store.graph_path.clone()));
            let mode = if merge {
                WriteMode::Merge
            } else {
                config.store.write_mode
            };

            let chunks = pipeline
                .chunk_document(&document)
                .with_context(|| format!("Failed to read document {}", document.display()))?;
            info!(document = %document.display(), chunks = chunks.len(), "Chunked document");

            let run = pipeline
                .run_and_save(&chunks, &store, mode)
                .await
                .context("Concept map run failed")?;

            if let Some(dot_path) = dot {
                let stored = load_graph(&store)?;
                std::fs::write(&dot_path, render(&stored).to_dot())
                    .with_context(|| format!("Failed to write {}", dot_path.display()))?;
                info!(path = %dot_path.display(), "Wrote DOT rendering");
            }

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&run.report)?);
            } else {
                let report = &run.report;
                println!("✓ Concept map saved to {}", store.path().display());
                println!("  Run: {}", report.run_id);
                println!(
                    "  Batches: {} ({} failed)",
                    report.batches,
                    report.failed_batches.len()
                );
                println!(
                    "  Concepts: {} raw, {} normalized",
                    report.raw_concepts, report.concepts
                );
                println!(
                    "  Dependencies: {} edges ({} dropped)",
                    report.edges, report.dropped_edges
                );
                if let Some(failure) = &report.parse_failure {
                    println!("  ✗ Dependency parsing degraded: {}", failure);
                }
                if report.degraded {
                    println!("  ⚠ Result is degraded; see the log for details");
                }
            }
        }

        Commands::Render { graph, format } => {
            let store = store_for(graph, &config);
            let rendered = render(&load_graph(&store)?);
            match format {
                RenderFormat::Dot => print!("{}", rendered.to_dot()),
                RenderFormat::Json => println!("{}", serde_json::to_string_pretty(&rendered)?),
            }
        }

        Commands::Roots { graph } => {
            let store = store_for(graph, &config);
            let graph = load_graph(&store)?;
            let roots = graph.roots();

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&roots)?);
            } else {
                println!("Root concepts: {}", roots.len());
                for root in roots {
                    println!("  {}", root);
                }
            }
        }

        Commands::Order { graph } => {
            let store = store_for(graph, &config);
            let graph = load_graph(&store)?;

            match graph.learning_order() {
                Ok(order) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&order)?);
                    } else {
                        for (step, concept) in order.iter().enumerate() {
                            println!("{:>4}. {}", step + 1, concept);
                        }
                    }
                }
                Err(report) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    } else {
                        println!("✗ No learning order: {} cycle(s)", report.cycles.len());
                        for cycle in &report.cycles {
                            let names: Vec<&str> = cycle.iter().map(|c| c.as_str()).collect();
                            println!("  {}", names.join(" <-> "));
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays clean for `--json` and DOT output
fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn store_for(graph: Option<PathBuf>, config: &ConceptMapConfig) -> GraphStore {
    GraphStore::new(graph.unwrap_or_else(|| config.store.graph_path.clone()))
}

fn load_graph(store: &GraphStore) -> Result<DependencyGraph> {
    store
        .load()
        .with_context(|| format!("Failed to load graph from {}", store.path().display()))
}
