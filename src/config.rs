use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ir::LinkKeys;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Margin {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margin {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub width: f32,
    pub height: f32,
    pub margin: Margin,
}

impl ViewportConfig {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            margin: Margin::default(),
        }
    }

    /// Drawable area once the margins are taken off.
    pub fn inner_size(&self) -> (f32, f32) {
        (
            self.width - self.margin.left - self.margin.right,
            self.height - self.margin.top - self.margin.bottom,
        )
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    pub font_size: f32,
    pub line_height: f32,
    /// Maximum label width in pixels before wrapping.
    pub wrap_width: f32,
    pub font_family: String,
    /// Use the calibrated character-width tables instead of system fonts.
    pub fast_text_metrics: bool,
    /// Record field used for display text; the node id otherwise.
    pub label_field: Option<String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            font_size: 11.0,
            line_height: 1.4,
            wrap_width: 200.0,
            font_family: "sans-serif".to_string(),
            fast_text_metrics: true,
            label_field: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubgroupOrder {
    #[default]
    Descending,
    Ascending,
    /// Keep matrix column order.
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChordMode {
    /// Groups count both outgoing and incoming flow; one ribbon per cell.
    #[default]
    Directed,
    /// Groups count outgoing flow only; one ribbon per node pair.
    Undirected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChordConfig {
    pub pad_angle: f32,
    pub sort_subgroups: SubgroupOrder,
    pub mode: ChordMode,
    /// Thickness of the outer group arcs.
    pub node_width: f32,
    /// Sort explicit nodes by id before building the matrix.
    pub sort_nodes: bool,
}

impl Default for ChordConfig {
    fn default() -> Self {
        Self {
            pad_angle: 0.05,
            sort_subgroups: SubgroupOrder::Descending,
            mode: ChordMode::Directed,
            node_width: 15.0,
            sort_nodes: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingsConfig {
    pub size_field: Option<String>,
    pub min_radius: f32,
    pub max_radius: f32,
    /// Gap between a node circle and its label.
    pub label_padding: f32,
    /// Labels are hidden above this many placed nodes.
    pub label_cutoff: usize,
}

impl Default for RingsConfig {
    fn default() -> Self {
        Self {
            size_field: None,
            min_radius: 0.0,
            max_radius: f32::INFINITY,
            label_padding: 15.0,
            label_cutoff: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum SizeScaleKind {
    Linear,
    #[default]
    Sqrt,
    Pow {
        exponent: f32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub x_field: String,
    pub y_field: String,
    pub size_field: Option<String>,
    pub size_min: f32,
    /// Fixed upper radius; derived from the closest node pair otherwise.
    pub size_max: Option<f32>,
    pub size_scale: SizeScaleKind,
    /// Width given to a flat data extent.
    pub default_extent: f32,
    /// Radius used when no node pair bounds it.
    pub default_radius: f32,
    /// Coordinate for nodes without a position hint.
    pub default_position: f32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            x_field: "x".to_string(),
            y_field: "y".to_string(),
            size_field: None,
            size_min: 5.0,
            size_max: None,
            size_scale: SizeScaleKind::Sqrt,
            default_extent: 1.0,
            default_radius: 10.0,
            default_position: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    pub node_width: f32,
    pub node_padding: f32,
    /// Relaxation passes of the default flow algorithm.
    pub iterations: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            node_width: 30.0,
            node_padding: 8.0,
            iterations: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub id_field: String,
    pub link_keys: LinkKeys,
    pub label: LabelConfig,
    pub chord: ChordConfig,
    pub rings: RingsConfig,
    pub network: NetworkConfig,
    pub flow: FlowConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            link_keys: LinkKeys::default(),
            label: LabelConfig::default(),
            chord: ChordConfig::default(),
            rings: RingsConfig::default(),
            network: NetworkConfig::default(),
            flow: FlowConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub viewport: ViewportConfig,
    pub layout: LayoutConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ViewportConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    margin: Option<MarginFile>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MarginFile {
    Uniform(f32),
    Sides(Margin),
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LabelConfigFile {
    font_size: Option<f32>,
    line_height: Option<f32>,
    wrap_width: Option<f32>,
    font_family: Option<String>,
    fast_text_metrics: Option<bool>,
    label_field: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ChordConfigFile {
    pad_angle: Option<f32>,
    sort_subgroups: Option<SubgroupOrder>,
    mode: Option<ChordMode>,
    node_width: Option<f32>,
    sort_nodes: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RingsConfigFile {
    size_field: Option<String>,
    min_radius: Option<f32>,
    max_radius: Option<f32>,
    label_padding: Option<f32>,
    label_cutoff: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct NetworkConfigFile {
    x_field: Option<String>,
    y_field: Option<String>,
    size_field: Option<String>,
    size_min: Option<f32>,
    size_max: Option<f32>,
    size_scale: Option<SizeScaleKind>,
    default_extent: Option<f32>,
    default_radius: Option<f32>,
    default_position: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FlowConfigFile {
    node_width: Option<f32>,
    node_padding: Option<f32>,
    iterations: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    id_field: Option<String>,
    link_keys: Option<LinkKeys>,
    viewport: Option<ViewportConfigFile>,
    label: Option<LabelConfigFile>,
    chord: Option<ChordConfigFile>,
    rings: Option<RingsConfigFile>,
    network: Option<NetworkConfigFile>,
    flow: Option<FlowConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&contents)
}

/// Merges a camelCase JSON config document over the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(v) = parsed.id_field {
        config.layout.id_field = v;
    }
    if let Some(v) = parsed.link_keys {
        config.layout.link_keys = v;
    }

    if let Some(viewport) = parsed.viewport {
        if let Some(v) = viewport.width {
            config.viewport.width = v;
        }
        if let Some(v) = viewport.height {
            config.viewport.height = v;
        }
        match viewport.margin {
            Some(MarginFile::Uniform(v)) => config.viewport.margin = Margin::uniform(v),
            Some(MarginFile::Sides(m)) => config.viewport.margin = m,
            None => {}
        }
    }

    if let Some(label) = parsed.label {
        let target = &mut config.layout.label;
        if let Some(v) = label.font_size {
            target.font_size = v;
        }
        if let Some(v) = label.line_height {
            target.line_height = v;
        }
        if let Some(v) = label.wrap_width {
            target.wrap_width = v;
        }
        if let Some(v) = label.font_family {
            target.font_family = v;
        }
        if let Some(v) = label.fast_text_metrics {
            target.fast_text_metrics = v;
        }
        if label.label_field.is_some() {
            target.label_field = label.label_field;
        }
    }

    if let Some(chord) = parsed.chord {
        let target = &mut config.layout.chord;
        if let Some(v) = chord.pad_angle {
            target.pad_angle = v;
        }
        if let Some(v) = chord.sort_subgroups {
            target.sort_subgroups = v;
        }
        if let Some(v) = chord.mode {
            target.mode = v;
        }
        if let Some(v) = chord.node_width {
            target.node_width = v;
        }
        if let Some(v) = chord.sort_nodes {
            target.sort_nodes = v;
        }
    }

    if let Some(rings) = parsed.rings {
        let target = &mut config.layout.rings;
        if rings.size_field.is_some() {
            target.size_field = rings.size_field;
        }
        if let Some(v) = rings.min_radius {
            target.min_radius = v;
        }
        if let Some(v) = rings.max_radius {
            target.max_radius = v;
        }
        if let Some(v) = rings.label_padding {
            target.label_padding = v;
        }
        if let Some(v) = rings.label_cutoff {
            target.label_cutoff = v;
        }
    }

    if let Some(network) = parsed.network {
        let target = &mut config.layout.network;
        if let Some(v) = network.x_field {
            target.x_field = v;
        }
        if let Some(v) = network.y_field {
            target.y_field = v;
        }
        if network.size_field.is_some() {
            target.size_field = network.size_field;
        }
        if let Some(v) = network.size_min {
            target.size_min = v;
        }
        if network.size_max.is_some() {
            target.size_max = network.size_max;
        }
        if let Some(v) = network.size_scale {
            target.size_scale = v;
        }
        if let Some(v) = network.default_extent {
            target.default_extent = v;
        }
        if let Some(v) = network.default_radius {
            target.default_radius = v;
        }
        if let Some(v) = network.default_position {
            target.default_position = v;
        }
    }

    if let Some(flow) = parsed.flow {
        let target = &mut config.layout.flow;
        if let Some(v) = flow.node_width {
            target.node_width = v;
        }
        if let Some(v) = flow.node_padding {
            target.node_padding = v;
        }
        if let Some(v) = flow.iterations {
            target.iterations = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_keeps_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.viewport.width, 800.0);
        assert_eq!(config.layout.chord.pad_angle, 0.05);
        assert_eq!(config.layout.flow.iterations, 6);
        assert_eq!(config.layout.network.size_scale, SizeScaleKind::Sqrt);
    }

    #[test]
    fn sections_merge_over_defaults() {
        let config = parse_config(
            r#"{
                "viewport": {"width": 400, "margin": 10},
                "chord": {"padAngle": 0.1, "mode": "undirected", "sortSubgroups": "input"},
                "network": {"sizeScale": {"type": "pow", "exponent": 2}, "sizeMax": 30},
                "rings": {"sizeField": "weight"},
                "linkKeys": {"source": "from", "target": "to"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.viewport.width, 400.0);
        assert_eq!(config.viewport.height, 600.0);
        assert_eq!(config.viewport.inner_size(), (380.0, 580.0));
        assert_eq!(config.layout.chord.mode, ChordMode::Undirected);
        assert_eq!(config.layout.chord.sort_subgroups, SubgroupOrder::Input);
        assert_eq!(
            config.layout.network.size_scale,
            SizeScaleKind::Pow { exponent: 2.0 }
        );
        assert_eq!(config.layout.network.size_max, Some(30.0));
        assert_eq!(config.layout.rings.size_field.as_deref(), Some("weight"));
        assert_eq!(config.layout.link_keys.source, "from");
        assert_eq!(config.layout.link_keys.value, "value");
    }

    #[test]
    fn margin_accepts_per_side_values() {
        let config =
            parse_config(r#"{"viewport": {"margin": {"top": 5, "left": 20}}}"#).unwrap();
        assert_eq!(config.viewport.margin.top, 5.0);
        assert_eq!(config.viewport.margin.left, 20.0);
        assert_eq!(config.viewport.margin.right, 0.0);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(parse_config("{\"chord\": {\"mode\": \"sideways\"}}").is_err());
    }
}
