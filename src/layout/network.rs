use std::collections::BTreeMap;

use crate::config::{LabelConfig, NetworkConfig};
use crate::error::LayoutError;
use crate::graph::ResolvedGraph;

use super::path::line;
use super::scale::{LinearScale, SizeScale, extent};
use super::{NetworkLayout, NetworkLink, NetworkNode, ShapeKind, ViewportFit};

const MAX_REFIT_PASSES: usize = 8;
const CONTAIN_EPS: f32 = 1e-3;

struct Point {
    fx: f32,
    fy: f32,
    size: f32,
}

/// Widens a flat extent `[a, a]` to `[a - e/2, a + e/2]`.
fn padded_extent(values: impl IntoIterator<Item = f32>, default_extent: f32, axis: &str) -> [f32; 2] {
    let e = if default_extent > 0.0 {
        default_extent
    } else {
        1.0
    };
    match extent(values) {
        Some([lo, hi]) if lo < hi => [lo, hi],
        Some([a, _]) => {
            tracing::debug!(axis, value = a, "flat extent, widening");
            [a - e / 2.0, a + e / 2.0]
        }
        None => [-e / 2.0, e / 2.0],
    }
}

/// Linear scales onto the viewport that keep one data unit the same
/// length on both axes; the slack axis is centered.
pub(crate) fn fit_scales(
    x_domain: [f32; 2],
    y_domain: [f32; 2],
    width: f32,
    height: f32,
) -> (LinearScale, LinearScale) {
    let mut x = LinearScale::new(x_domain, [0.0, width]);
    let mut y = LinearScale::new(y_domain, [0.0, height]);
    let node_ratio = (x_domain[1] - x_domain[0]) / (y_domain[1] - y_domain[0]);
    let screen_ratio = width / height;
    if node_ratio > screen_ratio {
        let h = height * screen_ratio / node_ratio;
        y.range = [(height - h) / 2.0, height - (height - h) / 2.0];
    } else {
        let w = width * node_ratio / screen_ratio;
        x.range = [(width - w) / 2.0, width - (width - w) / 2.0];
    }
    (x, y)
}

fn closest_pair_distance(pixels: &[(f32, f32)]) -> Option<f32> {
    let mut best: Option<f32> = None;
    for (i, a) in pixels.iter().enumerate() {
        for b in &pixels[i + 1..] {
            let d = ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt();
            best = Some(best.map_or(d, |cur| cur.min(d)));
        }
    }
    best
}

pub fn compute_network_layout(
    graph: &ResolvedGraph,
    config: &NetworkConfig,
    labels: &LabelConfig,
    width: f32,
    height: f32,
) -> Result<NetworkLayout, LayoutError> {
    let points: Vec<Point> = graph
        .nodes
        .iter()
        .map(|node| Point {
            fx: node
                .hint_f32(&config.x_field)
                .unwrap_or(config.default_position),
            fy: node
                .hint_f32(&config.y_field)
                .unwrap_or(config.default_position),
            size: config
                .size_field
                .as_deref()
                .and_then(|field| node.hint_f32(field))
                .unwrap_or(1.0),
        })
        .collect();

    let x_domain = padded_extent(points.iter().map(|p| p.fx), config.default_extent, "x");
    let y_domain = padded_extent(points.iter().map(|p| p.fy), config.default_extent, "y");
    let (x, y) = fit_scales(x_domain, y_domain, width, height);

    let pixels: Vec<(f32, f32)> = points.iter().map(|p| (x.apply(p.fx), y.apply(p.fy))).collect();

    let provisional_r_max = match config.size_max {
        Some(max) => max,
        None => match closest_pair_distance(&pixels) {
            Some(d) if d > 0.0 && d.is_finite() => d / 2.0,
            _ => {
                tracing::debug!(
                    nodes = points.len(),
                    radius = config.default_radius,
                    "no node pair bounds the radius, using default"
                );
                config.default_radius
            }
        },
    };
    let size_domain = extent(points.iter().map(|p| p.size)).unwrap_or([1.0, 1.0]);
    let flat_sizes = size_domain[0] == size_domain[1];
    let radius_range = |r_max: f32| {
        let r_min = if flat_sizes {
            r_max
        } else {
            (r_max / 2.0).min(config.size_min)
        };
        [r_min, r_max]
    };
    let mut r = SizeScale::new(config.size_scale, size_domain, radius_range(provisional_r_max));

    // Grow the data domains until every circle fits its axis range, then
    // rebuild the radius range from the shrunk maximum. The letterbox is
    // redone on the grown domains and both axes shrink by the x factor,
    // unlike a per-axis min(old/new span), so the aspect ratio survives.
    // The rebuilt lower bound can outgrow the margin reserved for it, so
    // another pass runs only while some circle still crosses its range.
    let base_factor = x.factor();
    let (mut x, mut y) = (x, y);
    let mut ratio = 1.0f32;
    for pass in 0..MAX_REFIT_PASSES {
        let mut x_fit = x.domain;
        let mut y_fit = y.domain;
        let mut crossing = false;
        for point in &points {
            let (px, py) = (x.apply(point.fx), y.apply(point.fy));
            let s = r.apply(point.size);
            crossing |= px - s < x.range[0] - CONTAIN_EPS
                || px + s > x.range[1] + CONTAIN_EPS
                || py - s < y.range[0] - CONTAIN_EPS
                || py + s > y.range[1] + CONTAIN_EPS;
            x_fit[0] = x_fit[0].min(x.invert(px - s));
            x_fit[1] = x_fit[1].max(x.invert(px + s));
            y_fit[0] = y_fit[0].min(y.invert(py - s));
            y_fit[1] = y_fit[1].max(y.invert(py + s));
        }
        if !crossing {
            break;
        }
        (x, y) = fit_scales(x_fit, y_fit, width, height);
        ratio = if base_factor > 0.0 {
            x.factor() / base_factor
        } else {
            1.0
        };
        r.range = radius_range(provisional_r_max * ratio);
        tracing::trace!(pass, ratio, "network refit pass");
    }

    let label_field = labels.label_field.as_deref();
    let nodes: Vec<NetworkNode> = graph
        .nodes
        .iter()
        .zip(&points)
        .map(|(node, point)| {
            let radius = r.apply(point.size);
            NetworkNode {
                id: node.id.clone(),
                index: node.index,
                label: node.label(label_field),
                data_x: point.fx,
                data_y: point.fy,
                x: x.apply(point.fx),
                y: y.apply(point.fy),
                r: radius,
                width: radius * 2.0,
                height: radius * 2.0,
                shape: node.shape_or(ShapeKind::Circle),
            }
        })
        .collect();

    let links = graph
        .links
        .iter()
        .map(|link| {
            let (a, b) = (&nodes[link.source], &nodes[link.target]);
            NetworkLink {
                link: link.index,
                source: a.id.clone(),
                target: b.id.clone(),
                x1: a.x,
                y1: a.y,
                x2: b.x,
                y2: b.y,
                path: line(a.x, a.y, b.x, b.y),
            }
        })
        .collect();

    let neighbors: BTreeMap<String, Vec<String>> = graph
        .nodes
        .iter()
        .map(|node| {
            let ids = graph
                .adjacency
                .neighbors(node.index)
                .iter()
                .map(|&n| graph.nodes[n].id.clone())
                .collect();
            (node.id.clone(), ids)
        })
        .collect();

    tracing::debug!(
        nodes = nodes.len(),
        provisional_r_max,
        ratio,
        "network layout"
    );

    Ok(NetworkLayout {
        nodes,
        links,
        fit: ViewportFit {
            x,
            y,
            r,
            provisional_r_max,
            r_max: r.range[1],
            r_min: r.range[0],
            ratio,
        },
        neighbors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SizeScaleKind;
    use crate::graph::ResolveOptions;
    use crate::ir::{IdAccessor, LinkKeys, Record};
    use serde_json::{Value, json};

    fn graph(nodes: Value, links: Value) -> ResolvedGraph {
        let to_records = |v: Value| -> Vec<Record> {
            v.as_array()
                .map(|items| items.iter().filter_map(|i| i.as_object().cloned()).collect())
                .unwrap_or_default()
        };
        let id = IdAccessor::default();
        ResolvedGraph::resolve(
            &[],
            &to_records(nodes),
            &to_records(links),
            &LinkKeys::default(),
            &ResolveOptions::new(&id),
        )
        .expect("graph resolves")
    }

    fn layout(graph: &ResolvedGraph, config: &NetworkConfig, w: f32, h: f32) -> NetworkLayout {
        compute_network_layout(graph, config, &LabelConfig::default(), w, h)
            .expect("network layout")
    }

    fn assert_contained(out: &NetworkLayout, w: f32, h: f32) {
        for n in &out.nodes {
            assert!(n.x - n.r >= -1e-3 && n.x + n.r <= w + 1e-3, "{} escapes x", n.id);
            assert!(n.y - n.r >= -1e-3 && n.y + n.r <= h + 1e-3, "{} escapes y", n.id);
        }
    }

    #[test]
    fn two_nodes_on_a_line_are_centered_and_shrunk() {
        let g = graph(
            json!([{"id": "a", "x": 0, "y": 0}, {"id": "b", "x": 10, "y": 0}]),
            json!([{"source": "a", "target": "b"}]),
        );
        let out = layout(&g, &NetworkConfig::default(), 100.0, 100.0);
        assert!((out.fit.provisional_r_max - 50.0).abs() < 1e-3);
        let (a, b) = (&out.nodes[0], &out.nodes[1]);
        assert!((a.y - 50.0).abs() < 1e-3 && (b.y - 50.0).abs() < 1e-3);
        assert!(a.r < out.fit.provisional_r_max);
        assert!((a.r - 25.0).abs() < 1e-3);
        assert!((a.x - 25.0).abs() < 1e-3 && (b.x - 75.0).abs() < 1e-3);
        assert_eq!(out.links[0].path, "M25,50L75,50");
        assert_contained(&out, 100.0, 100.0);
    }

    #[test]
    fn aspect_ratio_is_preserved() {
        let g = graph(
            json!([
                {"id": "a", "x": 0, "y": 0},
                {"id": "b", "x": 4, "y": 1},
                {"id": "c", "x": 2, "y": 3}
            ]),
            json!([]),
        );
        let out = layout(&g, &NetworkConfig::default(), 400.0, 200.0);
        assert!((out.fit.x.factor() - out.fit.y.factor()).abs() < 1e-3);
        assert_contained(&out, 400.0, 200.0);
    }

    #[test]
    fn single_node_uses_default_radius_and_extent() {
        let g = graph(json!([{"id": "solo", "x": 3, "y": 3}]), json!([]));
        let out = layout(&g, &NetworkConfig::default(), 200.0, 100.0);
        let solo = &out.nodes[0];
        assert!((out.fit.provisional_r_max - 10.0).abs() < 1e-5);
        assert!((solo.x - 100.0).abs() < 1e-3);
        assert!((solo.y - 50.0).abs() < 1e-3);
        assert_contained(&out, 200.0, 100.0);
    }

    #[test]
    fn size_field_spreads_radii_between_bounds() {
        let g = graph(
            json!([
                {"id": "a", "x": 0, "y": 0, "size": 1},
                {"id": "b", "x": 10, "y": 10, "size": 100},
                {"id": "c", "x": 10, "y": 0, "size": 25}
            ]),
            json!([]),
        );
        let config = NetworkConfig {
            size_field: Some("size".to_string()),
            size_scale: SizeScaleKind::Linear,
            ..NetworkConfig::default()
        };
        let out = layout(&g, &config, 300.0, 300.0);
        let (a, b, c) = (&out.nodes[0], &out.nodes[1], &out.nodes[2]);
        assert!(a.r < c.r && c.r < b.r);
        assert!((b.r - out.fit.r_max).abs() < 1e-3);
        assert!((a.r - out.fit.r_min).abs() < 1e-3);
        assert_contained(&out, 300.0, 300.0);
    }

    #[test]
    fn refit_rebuilds_min_radius_from_shrunk_max() {
        let g = graph(
            json!([
                {"id": "a", "x": 0, "y": 0, "size": 1},
                {"id": "b", "x": 10, "y": 0, "size": 100}
            ]),
            json!([]),
        );
        let config = NetworkConfig {
            size_field: Some("size".to_string()),
            size_scale: SizeScaleKind::Linear,
            ..NetworkConfig::default()
        };
        let out = layout(&g, &config, 100.0, 100.0);
        assert!((out.fit.provisional_r_max - 50.0).abs() < 1e-3);
        assert!(out.fit.r_max < out.fit.provisional_r_max);
        let expected = (out.fit.r_max / 2.0).min(config.size_min);
        assert!((out.fit.r_min - expected).abs() < 1e-4, "r_min {}", out.fit.r_min);
        assert!((out.nodes[0].r - out.fit.r_min).abs() < 1e-4);
        assert_contained(&out, 100.0, 100.0);
    }

    #[test]
    fn fixed_size_max_is_respected_before_refit() {
        let g = graph(
            json!([{"id": "a", "x": 0, "y": 0}, {"id": "b", "x": 1, "y": 1}]),
            json!([]),
        );
        let config = NetworkConfig {
            size_max: Some(4.0),
            ..NetworkConfig::default()
        };
        let out = layout(&g, &config, 100.0, 100.0);
        assert_eq!(out.fit.provisional_r_max, 4.0);
        assert!(out.nodes.iter().all(|n| n.r <= 4.0 + 1e-4));
    }

    #[test]
    fn missing_positions_fall_back_to_default() {
        let g = graph(json!([{"id": "a"}, {"id": "b", "x": 1, "y": 1}]), json!([]));
        let out = layout(&g, &NetworkConfig::default(), 100.0, 100.0);
        assert_eq!(out.nodes[0].data_x, 1.0);
        assert!(out.neighbors["a"].is_empty());
        assert_contained(&out, 100.0, 100.0);
    }
}
