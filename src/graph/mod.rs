//! Identity resolution and adjacency indexing shared by every diagram type.
//!
//! Nodes live in one arena (`ResolvedGraph::nodes`); links and adjacency
//! lists refer to them by index.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::LayoutError;
use crate::ir::{LinkKeys, Record, value_to_f32, value_to_id};
use crate::layout::ShapeKind;

mod adjacency;
mod resolve;

pub use adjacency::{Adjacency, resolve_links};
pub use resolve::{MergePolicy, NodeSet, ResolveOptions, parse_links, resolve_nodes};

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    /// Dataset row for this id, if any.
    pub data: Option<Record>,
    /// Explicit node record for this id, if any.
    pub node: Option<Record>,
    pub index: usize,
}

impl Node {
    /// Display values prefer the dataset row.
    pub fn display_field(&self, name: &str) -> Option<&Value> {
        self.data
            .as_ref()
            .and_then(|d| d.get(name))
            .or_else(|| self.node.as_ref().and_then(|n| n.get(name)))
    }

    /// Positional and size hints prefer the explicit node record.
    pub fn hint_field(&self, name: &str) -> Option<&Value> {
        self.node
            .as_ref()
            .and_then(|n| n.get(name))
            .or_else(|| self.data.as_ref().and_then(|d| d.get(name)))
    }

    pub fn hint_f32(&self, name: &str) -> Option<f32> {
        self.hint_field(name).and_then(value_to_f32)
    }

    pub fn label(&self, field: Option<&str>) -> String {
        field
            .and_then(|name| self.display_field(name))
            .and_then(value_to_id)
            .unwrap_or_else(|| self.id.clone())
    }

    pub(crate) fn shape_or(&self, fallback: ShapeKind) -> ShapeKind {
        self.display_field("shape")
            .and_then(Value::as_str)
            .and_then(ShapeKind::from_name)
            .unwrap_or(fallback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    /// Position of the link in the caller's link array.
    pub index: usize,
    pub source: usize,
    pub target: usize,
    pub value: f32,
}

impl Link {
    /// The endpoint opposite `node`.
    pub fn other(&self, node: usize) -> usize {
        if self.source == node {
            self.target
        } else {
            self.source
        }
    }

    pub fn touches(&self, node: usize) -> bool {
        self.source == node || self.target == node
    }
}

/// Output of one resolution pass: canonical nodes, resolved links and the
/// lookup tables derived from them.
#[derive(Debug, Clone)]
pub struct ResolvedGraph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub lookup: HashMap<String, usize>,
    pub adjacency: Adjacency,
}

impl ResolvedGraph {
    pub fn resolve(
        data: &[Record],
        nodes: &[Record],
        links: &[Record],
        keys: &LinkKeys,
        options: &ResolveOptions<'_>,
    ) -> Result<Self, LayoutError> {
        let raw_links = parse_links(links, keys)?;
        let set = resolve_nodes(data, nodes, &raw_links, options);
        let links = resolve_links(&raw_links, &set, options.id)?;
        let adjacency = Adjacency::build(set.nodes.len(), &links);
        tracing::debug!(
            nodes = set.nodes.len(),
            links = links.len(),
            "resolved graph"
        );
        Ok(Self {
            nodes: set.nodes,
            links,
            lookup: set.lookup,
            adjacency,
        })
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.lookup.get(id).map(|&idx| &self.nodes[idx])
    }

    /// Neighbor node indices of `id`; unknown ids have no neighbors.
    pub fn neighbors_of(&self, id: &str) -> &[usize] {
        match self.lookup.get(id) {
            Some(&idx) => self.adjacency.neighbors(idx),
            None => &[],
        }
    }
}
