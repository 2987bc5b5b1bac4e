//! Build pipeline: load records, index symbols, construct the graph.
//!
//! Each stage finishes completely before the next starts. The symbol index is
//! a value owned by one build, so concurrent or repeated builds never share
//! resolution state.

use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::config::BuildOptions;
use crate::errors::{GraphError, GraphResult};
use crate::graph::CodeGraph;
use crate::indexer::builder::{GraphBuilder, ResolutionStats};
use crate::indexer::imports::ImportResolver;
use crate::indexer::records::RecordStore;
use crate::indexer::symbols::SymbolIndex;
use crate::models::ExtractionRecord;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub records: usize,
    pub rejected_records: usize,
    pub symbol_keys: usize,
    pub nodes: usize,
    pub edges: usize,
    pub resolution: ResolutionStats,
    pub elapsed_ms: u128,
}

/// Build a graph from records already in a store.
pub fn build_graph(
    store: &RecordStore,
    options: &BuildOptions,
) -> GraphResult<(CodeGraph, BuildStats)> {
    let started = Instant::now();
    let index = SymbolIndex::build(store.all());
    info!("Indexed {} symbol keys from {} records", index.len(), store.len());

    let resolver = ImportResolver::from_options(store, options);
    let (graph, resolution) = GraphBuilder::new(store, &index, &resolver, options).build()?;

    let stats = BuildStats {
        records: store.len(),
        rejected_records: 0,
        symbol_keys: index.len(),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        resolution,
        elapsed_ms: started.elapsed().as_millis(),
    };
    Ok((graph, stats))
}

/// Build a graph from in-memory records.
pub fn build_from_records<I>(
    records: I,
    options: &BuildOptions,
) -> GraphResult<(CodeGraph, BuildStats)>
where
    I: IntoIterator<Item = ExtractionRecord>,
{
    let mut store = RecordStore::new(options.root_str().as_deref());
    let mut offered = 0usize;
    let loaded = store.load_all(records.into_iter().inspect(|_| offered += 1));
    let (graph, mut stats) = build_graph(&store, options)?;
    stats.rejected_records = offered - loaded;
    Ok((graph, stats))
}

/// Load every record file under `dir` and build the graph.
///
/// Fails with `NoRecords` when nothing under `dir` could be loaded.
pub fn build_from_dir(
    dir: &Path,
    options: &BuildOptions,
) -> GraphResult<(CodeGraph, BuildStats)> {
    let started = Instant::now();
    let mut store = RecordStore::new(options.root_str().as_deref());
    let report = store.load_dir(dir, options.workers)?;
    if store.is_empty() {
        return Err(GraphError::NoRecords(dir.display().to_string()));
    }

    let (graph, mut stats) = build_graph(&store, options)?;
    stats.rejected_records = report.rejected;
    stats.elapsed_ms = started.elapsed().as_millis();
    info!(
        "Graph for {} ready in {} ms: {} nodes, {} edges",
        dir.display(),
        stats.elapsed_ms,
        stats.nodes,
        stats.edges
    );
    Ok((graph, stats))
}
