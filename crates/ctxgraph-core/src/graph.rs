//! The cross-file relationship graph and its interchange form.
//!
//! Nodes are keyed by qualified identifier. Edges are keyed by
//! `(source, target, relation)`, so two different relations between the same
//! ordered pair are both kept, while repeating the same triple is a no-op.

use std::collections::HashSet;
use std::fmt;
use std::io::Write;

use indexmap::{IndexMap, IndexSet};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::GraphResult;
use crate::indexer::identifiers::EntityKind;

// ---------------------------------------------------------------------------
// Node and edge types
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Contains,
    ContainsMethod,
    ContainsFunction,
    InheritsFrom,
    Implements,
    Uses,
    CallsOrUses,
    Imports,
}

impl Relation {
    pub const ALL: [Relation; 8] = [
        Relation::Contains,
        Relation::ContainsMethod,
        Relation::ContainsFunction,
        Relation::InheritsFrom,
        Relation::Implements,
        Relation::Uses,
        Relation::CallsOrUses,
        Relation::Imports,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Contains => "contains",
            Relation::ContainsMethod => "contains_method",
            Relation::ContainsFunction => "contains_function",
            Relation::InheritsFrom => "inherits_from",
            Relation::Implements => "implements",
            Relation::Uses => "uses",
            Relation::CallsOrUses => "calls_or_uses",
            Relation::Imports => "imports",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: EntityKind,
    pub label: String,
    /// Declaring file; for external nodes, the include literal.
    pub file: String,
}

/// Borrowed view of one edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeView<'a> {
    pub source: &'a str,
    pub target: &'a str,
    pub relation: Relation,
}

/// What happened to an `add_edge` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeInsert {
    Added,
    /// The same `(source, target, relation)` triple already exists.
    Duplicate,
    /// One endpoint is not a node; nothing was added.
    Dangling,
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct CodeGraph {
    graph: DiGraph<GraphNode, Relation>,
    node_index: IndexMap<String, NodeIndex>,
    edge_keys: HashSet<(NodeIndex, NodeIndex, Relation)>,
}

impl CodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node unless its id is already present; the first insert wins.
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.node_index.insert(id, idx);
        idx
    }

    /// Add a typed edge between two existing nodes.
    pub fn add_edge(&mut self, source: &str, target: &str, relation: Relation) -> EdgeInsert {
        let (Some(&from), Some(&to)) = (self.node_index.get(source), self.node_index.get(target))
        else {
            return EdgeInsert::Dangling;
        };
        if !self.edge_keys.insert((from, to, relation)) {
            return EdgeInsert::Duplicate;
        }
        self.graph.add_edge(from, to, relation);
        EdgeInsert::Added
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index
            .get(id)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn has_edge(&self, source: &str, target: &str, relation: Relation) -> bool {
        match (self.node_index.get(source), self.node_index.get(target)) {
            (Some(&from), Some(&to)) => self.edge_keys.contains(&(from, to, relation)),
            _ => false,
        }
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'_>> {
        self.graph.edge_references().map(move |e| EdgeView {
            source: &self.graph[e.source()].id,
            target: &self.graph[e.target()].id,
            relation: *e.weight(),
        })
    }

    /// Targets of outgoing edges from `id`, optionally filtered by relation.
    pub fn neighbors(&self, id: &str, relation: Option<Relation>) -> Vec<&GraphNode> {
        self.adjacent(id, relation, Direction::Outgoing)
    }

    /// Sources of incoming edges into `id`, optionally filtered by relation.
    pub fn incoming(&self, id: &str, relation: Option<Relation>) -> Vec<&GraphNode> {
        self.adjacent(id, relation, Direction::Incoming)
    }

    fn adjacent(&self, id: &str, relation: Option<Relation>, dir: Direction) -> Vec<&GraphNode> {
        let Some(&idx) = self.node_index.get(id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, dir)
            .filter(|e| relation.map_or(true, |r| *e.weight() == r))
            .map(|e| {
                let other = if e.source() == idx {
                    e.target()
                } else {
                    e.source()
                };
                (e.id(), other)
            })
            .collect();
        edges.sort_by_key(|(edge, _)| *edge);
        let unique: IndexSet<NodeIndex> = edges.into_iter().map(|(_, other)| other).collect();
        unique.into_iter().map(|other| &self.graph[other]).collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn count_relation(&self, relation: Relation) -> usize {
        self.graph
            .edge_weights()
            .filter(|r| **r == relation)
            .count()
    }

    /// SHA-256 over the sorted node and edge sets. Equal for graphs with the
    /// same content regardless of insertion order.
    pub fn fingerprint(&self) -> String {
        let mut lines: Vec<String> = self
            .nodes()
            .map(|n| format!("N\t{}\t{}\t{}\t{}", n.id, n.kind, n.label, n.file))
            .chain(
                self.edges()
                    .map(|e| format!("E\t{}\t{}\t{}", e.source, e.target, e.relation)),
            )
            .collect();
        lines.sort();
        let mut hasher = Sha256::new();
        for line in &lines {
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    // -----------------------------------------------------------------------
    // Interchange
    // -----------------------------------------------------------------------

    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            nodes: self.nodes().cloned().collect(),
            edges: self
                .edges()
                .map(|e| EdgeRecord {
                    source: e.source.to_string(),
                    target: e.target.to_string(),
                    relation: e.relation,
                })
                .collect(),
        }
    }

    /// Rebuild a graph from its interchange form. Edges whose endpoints are
    /// not listed as nodes are dropped.
    pub fn from_document(doc: GraphDocument) -> Self {
        let mut graph = CodeGraph::new();
        for node in doc.nodes {
            graph.add_node(node);
        }
        for edge in &doc.edges {
            graph.add_edge(&edge.source, &edge.target, edge.relation);
        }
        graph
    }

    pub fn write_json<W: Write>(&self, writer: W) -> GraphResult<()> {
        serde_json::to_writer_pretty(writer, &self.to_document())?;
        Ok(())
    }
}

/// Generic node/edge list consumed by rendering and reporting tools.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<EdgeRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub relation: Relation,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, kind: EntityKind) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            kind,
            label: id.rsplit("::").next().unwrap_or(id).to_string(),
            file: id.split("::").next().unwrap_or(id).to_string(),
        }
    }

    fn sample() -> CodeGraph {
        let mut g = CodeGraph::new();
        g.add_node(node("/a.h", EntityKind::File));
        g.add_node(node("/a.h::A", EntityKind::Class));
        g.add_node(node("/a.h::B", EntityKind::Class));
        g.add_edge("/a.h", "/a.h::A", Relation::Contains);
        g.add_edge("/a.h", "/a.h::B", Relation::Contains);
        g.add_edge("/a.h::A", "/a.h::B", Relation::InheritsFrom);
        g
    }

    #[test]
    fn test_first_node_wins() {
        let mut g = CodeGraph::new();
        let first = g.add_node(node("/a.h::X", EntityKind::Class));
        let second = g.add_node(node("/a.h::X", EntityKind::Function));
        assert_eq!(first, second);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.node("/a.h::X").unwrap().kind, EntityKind::Class);
    }

    #[test]
    fn test_parallel_relations_kept() {
        let mut g = sample();
        assert_eq!(g.add_edge("/a.h::A", "/a.h::B", Relation::Uses), EdgeInsert::Added);
        assert_eq!(
            g.add_edge("/a.h::A", "/a.h::B", Relation::Uses),
            EdgeInsert::Duplicate
        );
        assert!(g.has_edge("/a.h::A", "/a.h::B", Relation::InheritsFrom));
        assert!(g.has_edge("/a.h::A", "/a.h::B", Relation::Uses));
        assert_eq!(g.edge_count(), 4);
    }

    #[test]
    fn test_dangling_edge_dropped() {
        let mut g = sample();
        assert_eq!(
            g.add_edge("/a.h::A", "/missing.h::Z", Relation::Uses),
            EdgeInsert::Dangling
        );
        assert_eq!(g.edge_count(), 3);
        assert!(!g.contains_node("/missing.h::Z"));
    }

    #[test]
    fn test_neighbors_filtering() {
        let mut g = sample();
        g.add_edge("/a.h::A", "/a.h::B", Relation::Uses);
        let all: Vec<_> = g.neighbors("/a.h", None).iter().map(|n| n.id.as_str()).collect();
        assert_eq!(all, vec!["/a.h::A", "/a.h::B"]);
        let from_a = g.neighbors("/a.h::A", None);
        assert_eq!(from_a.len(), 1);
        assert!(g.neighbors("/a.h::A", Some(Relation::Implements)).is_empty());
        let into_b: Vec<_> = g
            .incoming("/a.h::B", Some(Relation::InheritsFrom))
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(into_b, vec!["/a.h::A"]);
        assert!(g.neighbors("/nope", None).is_empty());
    }

    #[test]
    fn test_fingerprint_ignores_insertion_order() {
        let a = sample();
        let mut b = CodeGraph::new();
        b.add_node(node("/a.h::B", EntityKind::Class));
        b.add_node(node("/a.h::A", EntityKind::Class));
        b.add_node(node("/a.h", EntityKind::File));
        b.add_edge("/a.h::A", "/a.h::B", Relation::InheritsFrom);
        b.add_edge("/a.h", "/a.h::B", Relation::Contains);
        b.add_edge("/a.h", "/a.h::A", Relation::Contains);
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.add_edge("/a.h::A", "/a.h::B", Relation::Uses);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_document_json_shape() {
        let g = sample();
        let mut buf = Vec::new();
        g.write_json(&mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["nodes"][1]["kind"], "class");
        assert_eq!(value["nodes"][1]["id"], "/a.h::A");
        assert_eq!(value["edges"][2]["relation"], "inherits_from");
        assert_eq!(value["edges"][2]["source"], "/a.h::A");

        let doc: GraphDocument = serde_json::from_slice(&buf).unwrap();
        let rebuilt = CodeGraph::from_document(doc);
        assert_eq!(rebuilt.fingerprint(), g.fingerprint());
    }

    #[test]
    fn test_relation_names() {
        let names: Vec<_> = Relation::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "contains",
                "contains_method",
                "contains_function",
                "inherits_from",
                "implements",
                "uses",
                "calls_or_uses",
                "imports"
            ]
        );
        for r in Relation::ALL {
            let json = serde_json::to_string(&r).unwrap();
            assert_eq!(json, format!("\"{}\"", r.as_str()));
        }
    }
}
