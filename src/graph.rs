use std::collections::HashMap;
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConvertError, Result};
use crate::resolve::Role;
use crate::table::Table;

/// Attribute value after coercion. Only integers are recognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Str(String),
}

impl AttrValue {
    /// Base-10 integer if the trimmed value parses as one, the raw text otherwise.
    pub fn coerce(raw: &str) -> AttrValue {
        match raw.trim().parse::<i64>() {
            Ok(n) => AttrValue::Int(n),
            Err(_) => AttrValue::Str(raw.to_string()),
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, AttrValue::Int(_))
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(n) => write!(f, "{n}"),
            AttrValue::Str(s) => f.write_str(s),
        }
    }
}

/// Attributes in column order.
pub type Attributes = Vec<(String, AttrValue)>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    pub label: String,
    pub attributes: Attributes,
}

impl NodeRecord {
    fn new(label: &str) -> Self {
        NodeRecord {
            label: label.to_string(),
            attributes: Vec::new(),
        }
    }

    fn merge(&mut self, attributes: Attributes) {
        for (name, value) in attributes {
            match self.attributes.iter_mut().find(|(n, _)| *n == name) {
                Some(slot) => slot.1 = value,
                None => self.attributes.push((name, value)),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeRecord {
    /// Row index in the edges table; tells parallel edges apart.
    pub key: usize,
    pub source: String,
    pub target: String,
    pub attributes: Attributes,
}

/// What to do with an edge endpoint missing from an explicit nodes table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DanglingPolicy {
    /// Add a node without attributes.
    #[default]
    Create,
    /// Fail with `DanglingEdgeReference`.
    Reject,
}

/// Resolved columns the builder works from.
#[derive(Debug, Clone)]
pub struct BuildSpec {
    pub source: String,
    pub target: String,
    /// Required when a nodes table is given.
    pub label: Option<String>,
    pub attributes: Vec<String>,
    pub dangling: DanglingPolicy,
}

/// Directed multigraph keyed by node label.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    graph: DiGraph<NodeRecord, EdgeRecord>,
    index: HashMap<String, NodeIndex>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, or merge `attributes` into the existing one with this label.
    pub fn add_node(&mut self, label: &str, attributes: Attributes) -> NodeIndex {
        match self.index.get(label) {
            Some(&idx) => {
                self.graph[idx].merge(attributes);
                idx
            }
            None => {
                let mut node = NodeRecord::new(label);
                node.merge(attributes);
                let idx = self.graph.add_node(node);
                self.index.insert(label.to_string(), idx);
                idx
            }
        }
    }

    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, edge: EdgeRecord) {
        self.graph.add_edge(source, target, edge);
    }

    pub fn node_index(&self, label: &str) -> Option<NodeIndex> {
        self.index.get(label).copied()
    }

    pub fn node(&self, label: &str) -> Option<&NodeRecord> {
        self.node_index(label).map(|idx| &self.graph[idx])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.graph.node_weights()
    }

    /// Edges in insertion order, i.e. edges-table row order.
    pub fn edges(&self) -> impl Iterator<Item = &EdgeRecord> {
        self.graph.edge_weights()
    }

    /// All parallel edges from `source` to `target`.
    pub fn edges_between(&self, source: &str, target: &str) -> Vec<&EdgeRecord> {
        match (self.node_index(source), self.node_index(target)) {
            (Some(a), Some(b)) => self.graph.edges_connecting(a, b).map(|e| e.weight()).collect(),
            _ => Vec::new(),
        }
    }
}

/// Build the graph from an optional nodes table and the edges table.
pub fn build(nodes: Option<&Table>, edges: &Table, spec: &BuildSpec) -> Result<Graph> {
    let mut graph = Graph::new();

    if let Some(nodes) = nodes {
        let label = spec
            .label
            .as_deref()
            .ok_or(ConvertError::UnresolvedColumn { role: Role::Label })?;
        add_nodes(&mut graph, nodes, label)?;
    }

    let source_idx = edges.require_column(&spec.source)?;
    let target_idx = edges.require_column(&spec.target)?;
    let attr_idx = spec
        .attributes
        .iter()
        .map(|name| edges.require_column(name).map(|idx| (name.as_str(), idx)))
        .collect::<Result<Vec<_>>>()?;

    for key in 0..edges.row_count() {
        let source = edges.value(key, source_idx);
        let target = edges.value(key, target_idx);

        let a = endpoint(&mut graph, nodes.is_some(), spec.dangling, key, source, Role::Source)?;
        let b = endpoint(&mut graph, nodes.is_some(), spec.dangling, key, target, Role::Target)?;

        let attributes = attr_idx
            .iter()
            .filter(|(_, idx)| !edges.value(key, *idx).is_empty())
            .map(|(name, idx)| (name.to_string(), AttrValue::coerce(edges.value(key, *idx))))
            .collect();

        graph.add_edge(
            a,
            b,
            EdgeRecord {
                key,
                source: source.to_string(),
                target: target.to_string(),
                attributes,
            },
        );
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built graph"
    );
    Ok(graph)
}

fn add_nodes(graph: &mut Graph, nodes: &Table, label: &str) -> Result<()> {
    let label_idx = nodes.require_column(label)?;

    for row in 0..nodes.row_count() {
        let name = nodes.value(row, label_idx);
        if name.is_empty() {
            return Err(ConvertError::EmptyEndpoint {
                row,
                role: Role::Label,
            });
        }

        let attributes = nodes
            .columns()
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != label_idx && !nodes.value(row, *idx).is_empty())
            .map(|(idx, column)| (column.clone(), AttrValue::coerce(nodes.value(row, idx))))
            .collect();
        graph.add_node(name, attributes);
    }

    Ok(())
}

fn endpoint(
    graph: &mut Graph,
    explicit_nodes: bool,
    policy: DanglingPolicy,
    row: usize,
    label: &str,
    role: Role,
) -> Result<NodeIndex> {
    if label.is_empty() {
        return Err(ConvertError::EmptyEndpoint { row, role });
    }
    if let Some(idx) = graph.node_index(label) {
        return Ok(idx);
    }

    if explicit_nodes {
        match policy {
            DanglingPolicy::Reject => {
                return Err(ConvertError::DanglingEdgeReference {
                    row,
                    label: label.to_string(),
                });
            }
            DanglingPolicy::Create => {
                warn!(row, node = label, "node missing from nodes file, adding it");
            }
        }
    }

    Ok(graph.add_node(label, Vec::new()))
}
