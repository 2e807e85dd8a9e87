//! Graph assembly.
//!
//! Turns the stored edge list into the nodes and edges that should be drawn,
//! given a `VisibilitySet`. An edge is drawn when either endpoint is expanded
//! (or expand-all is on); its endpoints become nodes.

use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schema::{Point, RecordKind, RecordRef, RelationKind, RelationshipEdge};
use crate::storage::RecordStore;
use crate::visibility::VisibilitySet;

/// A node of the assembled graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Stable id, `"{kind}_{record id}"`
    pub id: String,
    pub record: RecordRef,
    pub display_name: String,
    /// Birth date or founding date, used by the timeline layout
    pub date: Option<NaiveDate>,
}

impl GraphNode {
    pub fn kind(&self) -> RecordKind {
        self.record.kind
    }
}

/// An edge of the assembled graph, endpoints given as node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: u64,
    pub source: String,
    pub target: String,
    pub kind: RelationKind,
    pub description: String,
    pub automatic: bool,
    pub curve: Option<Point>,
}

/// The visible part of the relationship graph.
#[derive(Debug, Clone, Default)]
pub struct AssembledGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    node_index: HashMap<String, usize>,
}

impl AssembledGraph {
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub fn edge(&self, id: u64) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Edges as `(source index, target index, kind)`.
    pub fn links(&self) -> Vec<(usize, usize, RelationKind)> {
        self.edges
            .iter()
            .filter_map(|e| Some((self.index_of(&e.source)?, self.index_of(&e.target)?, e.kind)))
            .collect()
    }

    /// Incident edge count per node index.
    pub fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.nodes.len()];
        for (s, t, _) in self.links() {
            degrees[s] += 1;
            degrees[t] += 1;
        }
        degrees
    }

    /// Build a graph directly from nodes and edges. Edges with unknown
    /// endpoints are dropped.
    pub fn from_parts(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        let mut graph = Self::default();
        for node in nodes {
            graph.push_node(node);
        }
        graph.edges = edges
            .into_iter()
            .filter(|e| graph.node_index.contains_key(&e.source) && graph.node_index.contains_key(&e.target))
            .collect();
        graph
    }

    /// Update one edge's curve in place. Returns false for an edge not shown.
    pub(crate) fn set_curve(&mut self, id: u64, curve: Option<Point>) -> bool {
        match self.edges.iter_mut().find(|e| e.id == id) {
            Some(edge) => {
                edge.curve = curve;
                true
            }
            None => false,
        }
    }

    fn push_node(&mut self, node: GraphNode) {
        if !self.node_index.contains_key(&node.id) {
            self.node_index.insert(node.id.clone(), self.nodes.len());
            self.nodes.push(node);
        }
    }
}

/// Assemble the visible graph in one pass over `edges`.
///
/// Display names come from the store; a missing record degrades to
/// `"{kind} #{id}"` rather than dropping the node.
pub fn assemble<S: RecordStore>(
    store: &S,
    edges: &[RelationshipEdge],
    visibility: &VisibilitySet,
) -> Result<AssembledGraph> {
    let mut graph = AssembledGraph::default();

    for edge in edges {
        let source_id = edge.source.node_id();
        let target_id = edge.target.node_id();
        if !(visibility.is_expanded(&source_id) || visibility.is_expanded(&target_id)) {
            continue;
        }
        for (record, id) in [(edge.source, &source_id), (edge.target, &target_id)] {
            if graph.node_index.contains_key(id) {
                continue;
            }
            let node = match store.get_by_id(record)? {
                Some(found) => GraphNode {
                    id: id.clone(),
                    record,
                    display_name: found.display_name().to_string(),
                    date: found.date(),
                },
                None => {
                    debug!(%record, "Record missing from store, using placeholder name");
                    GraphNode {
                        id: id.clone(),
                        record,
                        display_name: format!("{} #{}", record.kind.as_str(), record.id),
                        date: None,
                    }
                }
            };
            graph.push_node(node);
        }
        graph.edges.push(GraphEdge {
            id: edge.id,
            source: source_id,
            target: target_id,
            kind: edge.kind,
            description: edge.description.clone(),
            automatic: edge.automatic,
            curve: edge.manual_curve,
        });
    }

    debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "Assembled graph"
    );
    Ok(graph)
}
