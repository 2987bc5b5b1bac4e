//! Graph construction from loaded records.
//!
//! Runs in two phases over the whole record store. Phase A emits every node
//! (files, types, functions, methods) with its containment edges. Phase B
//! resolves declared relationships through the symbol index and import
//! resolver; it only reads the graph, so records are resolved in parallel and
//! the resulting edges are applied afterwards by a single writer, in record
//! order.
//!
//! Resolution links every plausible candidate: a name declared by several
//! entities produces one edge per candidate node, whatever its kind. Names
//! with no candidate, and candidates that are not nodes, degrade to missing
//! edges. No relation ever links an entity to itself, and a file including
//! itself gets no `imports` edge.

use std::ops::AddAssign;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::BuildOptions;
use crate::errors::{GraphError, GraphResult};
use crate::graph::{CodeGraph, EdgeInsert, GraphNode, Relation};
use crate::indexer::identifiers::{external_id, file_id, member_id, method_id, EntityKind};
use crate::indexer::imports::{ImportResolver, ImportTarget};
use crate::indexer::records::RecordStore;
use crate::indexer::symbols::SymbolIndex;
use crate::models::{ClassEntry, ExtractionRecord};

/// Counters for everything that degraded to a missing or extra edge.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Class, interface or function entries without a usable name.
    pub skipped_entries: usize,
    /// Names with no entry in the symbol index.
    pub unresolved_symbols: usize,
    /// Names that produced edges to more than one node.
    pub ambiguous_symbols: usize,
    /// Self-references suppressed.
    pub self_references: usize,
    /// Include lines whose target was never loaded.
    pub unresolved_imports: usize,
    /// Edges dropped because an endpoint was not a node.
    pub dropped_edges: usize,
}

impl AddAssign for ResolutionStats {
    fn add_assign(&mut self, other: Self) {
        self.skipped_entries += other.skipped_entries;
        self.unresolved_symbols += other.unresolved_symbols;
        self.ambiguous_symbols += other.ambiguous_symbols;
        self.self_references += other.self_references;
        self.unresolved_imports += other.unresolved_imports;
        self.dropped_edges += other.dropped_edges;
    }
}

/// An edge computed in phase B, applied once all records are resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
enum PendingEdge {
    Link {
        source: String,
        target: String,
        relation: Relation,
    },
    External {
        source: String,
        literal: String,
    },
}

pub struct GraphBuilder<'a> {
    store: &'a RecordStore,
    index: &'a SymbolIndex,
    resolver: &'a ImportResolver<'a>,
    options: &'a BuildOptions,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        store: &'a RecordStore,
        index: &'a SymbolIndex,
        resolver: &'a ImportResolver<'a>,
        options: &'a BuildOptions,
    ) -> Self {
        Self {
            store,
            index,
            resolver,
            options,
        }
    }

    /// Build the graph. Fails only when the store holds no records.
    pub fn build(&self) -> GraphResult<(CodeGraph, ResolutionStats)> {
        if self.store.is_empty() {
            return Err(GraphError::NoRecords("record store".to_string()));
        }
        let mut graph = CodeGraph::new();
        let mut stats = ResolutionStats::default();

        for record in self.store.all() {
            emit_nodes(&mut graph, record, &mut stats);
        }
        debug!(
            "Phase A: {} nodes, {} containment edges",
            graph.node_count(),
            graph.edge_count()
        );

        let records: Vec<&ExtractionRecord> = self.store.all().collect();
        let resolved: Vec<(Vec<PendingEdge>, ResolutionStats)> = records
            .par_iter()
            .map(|record| self.resolve_record(&graph, record))
            .collect();

        for (pending, local) in resolved {
            stats += local;
            for edge in pending {
                self.apply(&mut graph, edge, &mut stats);
            }
        }

        info!(
            "Built graph: {} nodes, {} edges ({} unresolved symbols, {} ambiguous, {} unresolved imports)",
            graph.node_count(),
            graph.edge_count(),
            stats.unresolved_symbols,
            stats.ambiguous_symbols,
            stats.unresolved_imports
        );
        Ok((graph, stats))
    }

    fn apply(&self, graph: &mut CodeGraph, edge: PendingEdge, stats: &mut ResolutionStats) {
        let (source, target, relation) = match edge {
            PendingEdge::Link {
                source,
                target,
                relation,
            } => (source, target, relation),
            PendingEdge::External { source, literal } => {
                let id = external_id(&literal);
                graph.add_node(GraphNode {
                    id: id.clone(),
                    kind: EntityKind::External,
                    label: literal.clone(),
                    file: literal,
                });
                (source, id, Relation::Imports)
            }
        };
        if graph.add_edge(&source, &target, relation) == EdgeInsert::Dangling {
            debug!("Dropping {relation} edge {source} -> {target}: endpoint is not a node");
            stats.dropped_edges += 1;
        }
    }

    // -----------------------------------------------------------------------
    // Phase B
    // -----------------------------------------------------------------------

    fn resolve_record(
        &self,
        graph: &CodeGraph,
        record: &ExtractionRecord,
    ) -> (Vec<PendingEdge>, ResolutionStats) {
        let mut ctx = Resolution {
            graph,
            index: self.index,
            edges: Vec::new(),
            stats: ResolutionStats::default(),
        };
        let path = record.source_path.as_str();

        for entry in record.classes.iter().chain(record.interfaces.iter()) {
            let Some(class_name) = entry.declared_name() else {
                continue;
            };
            let source = member_id(path, class_name);
            for parent in &entry.extends {
                ctx.link(&source, parent, Relation::InheritsFrom);
            }
            for iface in &entry.implements {
                ctx.link(&source, iface, Relation::Implements);
            }
            for dep in &entry.dependencies {
                ctx.link(&source, dep, Relation::Uses);
            }
            for method in &entry.methods {
                if let Some(name) = method.declared_name() {
                    let method_source = method_id(path, class_name, name);
                    for dep in &method.dependencies {
                        ctx.link(&method_source, dep, Relation::CallsOrUses);
                    }
                }
            }
        }

        for function in &record.functions {
            let Some(name) = function.declared_name() else {
                continue;
            };
            let source = match function.declared_parent() {
                Some(parent) => method_id(path, parent, name),
                None => member_id(path, name),
            };
            for dep in &function.dependencies {
                ctx.link(&source, dep, Relation::CallsOrUses);
            }
        }

        if let Some(imports) = &record.imports {
            self.resolve_imports(&mut ctx, path, imports);
        }

        (ctx.edges, ctx.stats)
    }

    fn resolve_imports(&self, ctx: &mut Resolution<'_>, path: &str, imports: &str) {
        for line in imports.lines() {
            match self.resolver.classify(line, path) {
                None => {}
                Some(ImportTarget::Resolved(target)) => {
                    if target != path {
                        ctx.edges.push(PendingEdge::Link {
                            source: file_id(path),
                            target: file_id(&target),
                            relation: Relation::Imports,
                        });
                    }
                }
                Some(ImportTarget::Unresolved(literal)) => {
                    if self.options.represent_external_imports {
                        ctx.edges.push(PendingEdge::External {
                            source: file_id(path),
                            literal,
                        });
                    } else {
                        debug!("Include {literal:?} in {path} is outside the loaded records");
                        ctx.stats.unresolved_imports += 1;
                    }
                }
            }
        }
    }
}

/// Per-record phase B state.
struct Resolution<'g> {
    graph: &'g CodeGraph,
    index: &'g SymbolIndex,
    edges: Vec<PendingEdge>,
    stats: ResolutionStats,
}

impl Resolution<'_> {
    /// Queue one edge per candidate node of `name`.
    fn link(&mut self, source: &str, name: &str, relation: Relation) {
        let candidates = self.index.resolve_lenient(name);
        if candidates.is_empty() {
            self.stats.unresolved_symbols += 1;
            return;
        }
        let mut linked = 0usize;
        for target in candidates {
            if target == source {
                self.stats.self_references += 1;
                continue;
            }
            if !self.graph.contains_node(target) {
                self.stats.dropped_edges += 1;
                continue;
            }
            self.edges.push(PendingEdge::Link {
                source: source.to_string(),
                target: target.to_string(),
                relation,
            });
            linked += 1;
        }
        if linked > 1 {
            self.stats.ambiguous_symbols += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Phase A
// ---------------------------------------------------------------------------

fn file_label(path: &str) -> String {
    path.rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or(path)
        .to_string()
}

fn emit_nodes(graph: &mut CodeGraph, record: &ExtractionRecord, stats: &mut ResolutionStats) {
    let path = record.source_path.as_str();
    let file = file_id(path);
    graph.add_node(GraphNode {
        id: file.clone(),
        kind: EntityKind::File,
        label: file_label(path),
        file: path.to_string(),
    });

    for entry in &record.classes {
        emit_type(graph, path, entry, EntityKind::Class, stats);
    }
    for entry in &record.interfaces {
        emit_type(graph, path, entry, EntityKind::Interface, stats);
    }

    for function in &record.functions {
        let Some(name) = function.declared_name() else {
            warn!("Skipping unnamed function entry in {path}");
            stats.skipped_entries += 1;
            continue;
        };
        match function.declared_parent() {
            None => {
                let id = member_id(path, name);
                graph.add_node(GraphNode {
                    id: id.clone(),
                    kind: EntityKind::Function,
                    label: name.to_string(),
                    file: path.to_string(),
                });
                graph.add_edge(&file, &id, Relation::ContainsFunction);
            }
            Some(parent) => {
                let id = method_id(path, parent, name);
                graph.add_node(GraphNode {
                    id: id.clone(),
                    kind: EntityKind::Method,
                    label: format!("{parent}::{name}"),
                    file: path.to_string(),
                });
                // Only classes declared in this same record own the method.
                let class = member_id(path, parent);
                if graph.contains_node(&class) {
                    graph.add_edge(&class, &id, Relation::ContainsMethod);
                }
            }
        }
    }
}

fn emit_type(
    graph: &mut CodeGraph,
    path: &str,
    entry: &ClassEntry,
    kind: EntityKind,
    stats: &mut ResolutionStats,
) {
    let Some(name) = entry.declared_name() else {
        warn!("Skipping unnamed {kind} entry in {path}");
        stats.skipped_entries += 1;
        return;
    };
    let id = member_id(path, name);
    graph.add_node(GraphNode {
        id: id.clone(),
        kind,
        label: name.to_string(),
        file: path.to_string(),
    });
    graph.add_edge(&file_id(path), &id, Relation::Contains);

    for method in &entry.methods {
        let Some(method_name) = method.declared_name() else {
            stats.skipped_entries += 1;
            continue;
        };
        let method_node = method_id(path, name, method_name);
        graph.add_node(GraphNode {
            id: method_node.clone(),
            kind: EntityKind::Method,
            label: format!("{name}::{method_name}"),
            file: path.to_string(),
        });
        graph.add_edge(&id, &method_node, Relation::ContainsMethod);
    }
}
