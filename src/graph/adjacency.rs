// Endpoint resolution and bidirectional adjacency tables.
//
// Links are indexed twice: once per incident node (for layouts that walk
// edges, such as the rings claim pass) and once as plain neighbor lists
// (for hover/focus correlation in the renderer).

use crate::error::{LayoutError, LinkEnd};
use crate::ir::{Endpoint, IdAccessor, RawLink};

use super::{Link, NodeSet};

#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    incident: Vec<Vec<usize>>,
    neighbors: Vec<Vec<usize>>,
}

impl Adjacency {
    pub fn build(node_count: usize, links: &[Link]) -> Self {
        let mut incident = vec![Vec::new(); node_count];
        let mut neighbors = vec![Vec::new(); node_count];
        for (idx, link) in links.iter().enumerate() {
            incident[link.source].push(idx);
            neighbors[link.source].push(link.target);
            if link.target != link.source {
                incident[link.target].push(idx);
                neighbors[link.target].push(link.source);
            }
        }
        Self {
            incident,
            neighbors,
        }
    }

    /// Indices (into the resolved link list) of links touching `node`.
    pub fn incident(&self, node: usize) -> &[usize] {
        self.incident.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn neighbors(&self, node: usize) -> &[usize] {
        self.neighbors.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn degree(&self, node: usize) -> usize {
        self.incident(node).len()
    }
}

/// Resolves every link endpoint against the canonical node set.
///
/// Numeric endpoints index the caller's node array (not the canonical
/// order) and are then mapped through that record's id. A missing value
/// defaults to 1.
pub fn resolve_links(
    links: &[RawLink],
    set: &NodeSet,
    id: &IdAccessor,
) -> Result<Vec<Link>, LayoutError> {
    links
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            let source = resolve_endpoint(&raw.source, set, id, idx, LinkEnd::Source)?;
            let target = resolve_endpoint(&raw.target, set, id, idx, LinkEnd::Target)?;
            let value = raw.value.unwrap_or(1.0);
            if !value.is_finite() {
                return Err(LayoutError::InvalidValue { link: idx, value });
            }
            Ok(Link {
                index: idx,
                source,
                target,
                value,
            })
        })
        .collect()
}

fn resolve_endpoint(
    endpoint: &Endpoint,
    set: &NodeSet,
    id: &IdAccessor,
    link: usize,
    end: LinkEnd,
) -> Result<usize, LayoutError> {
    let missing = |reference: String| LayoutError::MissingNode {
        link,
        end,
        reference,
    };
    let key = match endpoint {
        Endpoint::Index(pos) => set
            .explicit
            .get(*pos)
            .and_then(|record| id.id_of(record, *pos))
            .ok_or_else(|| missing(format!("#{pos}")))?,
        Endpoint::Id(key) => key.clone(),
        Endpoint::Node(record) => id
            .id_of(record, link)
            .ok_or_else(|| missing("<node without id>".to_string()))?,
    };
    set.lookup.get(&key).copied().ok_or_else(|| missing(key))
}
