//! ctxgraph core library: assembles per-file extraction records into one
//! cross-file relationship graph.
//!
//! The pipeline loads records into a [`RecordStore`](indexer::records::RecordStore),
//! indexes every declared name in a [`SymbolIndex`](indexer::symbols::SymbolIndex),
//! then emits nodes and resolves `inherits_from`, `implements`, `uses`,
//! `calls_or_uses` and `imports` edges into a [`CodeGraph`](graph::CodeGraph).
//!
//! ```no_run
//! use std::path::Path;
//! use ctxgraph_core::config::BuildOptions;
//! use ctxgraph_core::indexer::pipeline::build_from_dir;
//!
//! let options = BuildOptions::default();
//! let (graph, stats) = build_from_dir(Path::new("analysis"), &options)?;
//! println!("{} nodes, {} edges", stats.nodes, stats.edges);
//! graph.write_json(std::io::stdout())?;
//! # Ok::<(), ctxgraph_core::errors::GraphError>(())
//! ```

pub mod config;
pub mod errors;
pub mod graph;
pub mod indexer;
pub mod models;

pub use config::BuildOptions;
pub use errors::{GraphError, GraphResult};
pub use graph::{CodeGraph, GraphDocument, GraphNode, Relation};
pub use indexer::identifiers::{identify, EntityKind};
pub use indexer::pipeline::{build_from_dir, build_from_records, build_graph, BuildStats};
pub use models::{ClassEntry, ExtractionRecord, FunctionEntry, InterfaceEntry};
