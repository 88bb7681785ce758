use std::fmt;

use crate::ir::DiagramKind;

/// Which side of a link an endpoint error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEnd {
    Source,
    Target,
}

impl fmt::Display for LinkEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkEnd::Source => f.write_str("source"),
            LinkEnd::Target => f.write_str("target"),
        }
    }
}

/// Failure of a single layout pass.
///
/// Every variant names the node, link or id that caused it. Degenerate
/// extents in the network layout are recovered with configured defaults
/// and never show up here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("link {link}: {end} `{reference}` does not match any node")]
    MissingNode {
        link: usize,
        end: LinkEnd,
        reference: String,
    },
    #[error("link {link}: {end} field `{field}` is missing or not an index, id or node object")]
    MalformedLink {
        link: usize,
        end: LinkEnd,
        field: String,
    },
    #[error("rings layout requires a center node id")]
    MissingCenter,
    #[error("center node `{0}` does not exist")]
    UnknownCenter(String),
    #[error("center node `{0}` has no incident links")]
    DegenerateCenter(String),
    #[error("{0} layout needs at least one node")]
    EmptyGraph(DiagramKind),
    #[error("link {link}: invalid value {value}")]
    InvalidValue { link: usize, value: f32 },
    #[error("flow links form a cycle through `{0}`")]
    CircularFlow(String),
    #[error("viewport {width}x{height} leaves no drawable area")]
    InvalidViewport { width: f32, height: f32 },
}
