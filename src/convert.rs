//! One conversion request, start to finish.
//!
//! The caller owns any multi-step selection state; everything here is a pure
//! function of the request.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConvertError, Result};
use crate::graph::{build, BuildSpec, DanglingPolicy};
use crate::resolve::{find_column, remaining_columns, ColumnChoice, Role};
use crate::serialize::{serialize, Format};
use crate::table::{Delimiter, Table, TableKind};

/// Which edge columns become attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeSelection {
    /// Every column except source and target.
    #[default]
    All,
    Only(Vec<String>),
}

/// Column choices made by the user. `None` means "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selections {
    pub source: Option<String>,
    pub target: Option<String>,
    pub label: Option<String>,
    pub attributes: AttributeSelection,
}

#[derive(Debug, Clone, Default)]
pub struct ConversionRequest {
    pub edges: Option<Vec<u8>>,
    pub nodes: Option<Vec<u8>>,
    pub delimiter: Delimiter,
    pub selections: Selections,
    pub format: Format,
    pub dangling: DanglingPolicy,
}

#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub body: String,
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub node_count: usize,
    pub edge_count: usize,
}

pub fn convert(request: &ConversionRequest) -> Result<ConversionOutput> {
    let raw_edges = request
        .edges
        .as_deref()
        .ok_or(ConvertError::MissingRelationsFile)?;
    let edges = Table::load(TableKind::Edges, raw_edges, request.delimiter)?;

    let selections = &request.selections;
    let source = ColumnChoice::select(Role::Source, edges.columns(), selections.source.as_deref())?
        .require(Role::Source)?;
    let target = ColumnChoice::select(Role::Target, edges.columns(), selections.target.as_deref())?
        .require(Role::Target)?;

    let attributes = match &selections.attributes {
        AttributeSelection::All => remaining_columns(edges.columns(), &source, &target),
        AttributeSelection::Only(columns) => columns
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(|c| find_column(TableKind::Edges, edges.columns(), c))
            .collect::<Result<Vec<_>>>()?,
    };
    debug!(%source, %target, ?attributes, "resolved edge columns");

    let nodes = request
        .nodes
        .as_deref()
        .map(|raw| Table::load(TableKind::Nodes, raw, request.delimiter))
        .transpose()?;
    let label = match &nodes {
        Some(nodes) => Some(
            ColumnChoice::select(Role::Label, nodes.columns(), selections.label.as_deref())?
                .require(Role::Label)?,
        ),
        None => None,
    };

    let spec = BuildSpec {
        source,
        target,
        label,
        attributes,
        dangling: request.dangling,
    };
    let graph = build(nodes.as_ref(), &edges, &spec)?;
    let body = serialize(&graph, request.format)?;

    info!(
        format = %request.format,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "converted"
    );
    Ok(ConversionOutput {
        body,
        file_name: request.format.file_name(),
        content_type: request.format.content_type(),
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
    })
}
