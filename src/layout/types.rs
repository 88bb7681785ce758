use std::collections::BTreeMap;

use serde::Serialize;

use super::scale::{LinearScale, SizeScale};
use crate::ir::DiagramKind;

/// Primitive a renderer draws for a node or edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Circle,
    Rect,
    Path,
}

impl ShapeKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "circle" => Some(Self::Circle),
            "rect" | "rectangle" | "square" => Some(Self::Rect),
            "path" => Some(Self::Path),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

/// Label box relative to the owning node's center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelBounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelPlacement {
    pub text: TextBlock,
    pub bounds: LabelBounds,
    /// Degrees.
    pub rotate: f32,
    pub anchor: TextAnchor,
    pub font_size: f32,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChordGroup {
    pub index: usize,
    pub id: String,
    pub label: String,
    pub start_angle: f32,
    pub end_angle: f32,
    pub value: f32,
    pub shape: ShapeKind,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChordEnd {
    pub index: usize,
    pub id: String,
    pub start_angle: f32,
    pub end_angle: f32,
    pub value: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChordRibbon {
    /// `"{source}-{target}"` node indices.
    pub key: String,
    pub source: ChordEnd,
    pub target: ChordEnd,
    pub value: f32,
    pub shape: ShapeKind,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChordLayout {
    /// Paths are relative to this point.
    pub center: (f32, f32),
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub groups: Vec<ChordGroup>,
    pub ribbons: Vec<ChordRibbon>,
    pub matrix: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RingTier {
    Center,
    Primary,
    Secondary,
}

/// Angular range owned by a primary node and shared with its children.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sector {
    pub start: f32,
    pub end: f32,
}

impl Sector {
    pub fn width(&self) -> f32 {
        self.end - self.start
    }

    pub fn contains(&self, angle: f32) -> bool {
        angle >= self.start - 1e-4 && angle <= self.end + 1e-4
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RingNode {
    pub id: String,
    pub index: usize,
    pub ring: RingTier,
    pub radians: f32,
    pub x: f32,
    pub y: f32,
    pub r: f32,
    pub shape: ShapeKind,
    pub label: LabelPlacement,
    /// Primaries own a sector; center and secondaries do not.
    pub sector: Option<Sector>,
    /// Node index of the owning primary for secondaries.
    pub parent: Option<usize>,
    /// Indices into `RingsLayout::edges`.
    pub edges: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SplineEdge {
    pub source_x: f32,
    pub source_y: f32,
    pub source_bisect_x: f32,
    pub source_bisect_y: f32,
    pub target_bisect_x: f32,
    pub target_bisect_y: f32,
    pub target_x: f32,
    pub target_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EdgeGeometry {
    Straight { x1: f32, y1: f32, x2: f32, y2: f32 },
    Spline(SplineEdge),
}

#[derive(Debug, Clone, Serialize)]
pub struct RingEdge {
    /// Position of the link in the caller's link array.
    pub link: usize,
    pub source: String,
    pub target: String,
    pub geometry: EdgeGeometry,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RingsLayout {
    pub center: String,
    pub ring_width: f32,
    pub primary_ring: f32,
    pub secondary_ring: f32,
    pub nodes: Vec<RingNode>,
    pub edges: Vec<RingEdge>,
    /// Neighbor ids per placed node, for hover/focus correlation.
    pub neighbors: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkNode {
    pub id: String,
    pub index: usize,
    pub label: String,
    /// Raw data coordinates.
    pub data_x: f32,
    pub data_y: f32,
    pub x: f32,
    pub y: f32,
    pub r: f32,
    pub width: f32,
    pub height: f32,
    pub shape: ShapeKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkLink {
    pub link: usize,
    pub source: String,
    pub target: String,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub path: String,
}

/// Scales used for the final projection, kept for renderers that zoom or
/// add overlays in data space.
#[derive(Debug, Clone, Serialize)]
pub struct ViewportFit {
    pub x: LinearScale,
    pub y: LinearScale,
    pub r: SizeScale,
    /// Upper radius before the containment re-fit.
    pub provisional_r_max: f32,
    pub r_max: f32,
    pub r_min: f32,
    /// Factor applied to the radius range by the re-fit.
    pub ratio: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkLayout {
    pub nodes: Vec<NetworkNode>,
    pub links: Vec<NetworkLink>,
    pub fit: ViewportFit,
    pub neighbors: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowNode {
    pub id: String,
    pub index: usize,
    pub label: String,
    pub x0: f32,
    pub x1: f32,
    pub y0: f32,
    pub y1: f32,
    pub value: f32,
    pub depth: usize,
    pub shape: ShapeKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowLink {
    pub link: usize,
    pub source: String,
    pub target: String,
    pub value: f32,
    /// Band center where the link leaves its source.
    pub y0: f32,
    /// Band center where the link enters its target.
    pub y1: f32,
    pub width: f32,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowLayout {
    pub node_width: f32,
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DiagramData {
    Chord(ChordLayout),
    Rings(RingsLayout),
    Network(NetworkLayout),
    Sankey(FlowLayout),
}

#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub kind: DiagramKind,
    /// Usable area after margins; all coordinates are relative to it.
    pub width: f32,
    pub height: f32,
    pub diagram: DiagramData,
}

impl Layout {
    pub fn chord(&self) -> Option<&ChordLayout> {
        match &self.diagram {
            DiagramData::Chord(data) => Some(data),
            _ => None,
        }
    }

    pub fn rings(&self) -> Option<&RingsLayout> {
        match &self.diagram {
            DiagramData::Rings(data) => Some(data),
            _ => None,
        }
    }

    pub fn network(&self) -> Option<&NetworkLayout> {
        match &self.diagram {
            DiagramData::Network(data) => Some(data),
            _ => None,
        }
    }

    pub fn flow(&self) -> Option<&FlowLayout> {
        match &self.diagram {
            DiagramData::Sankey(data) => Some(data),
            _ => None,
        }
    }
}
