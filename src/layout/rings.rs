use std::collections::{BTreeMap, HashSet};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::config::{LabelConfig, RingsConfig};
use crate::error::LayoutError;
use crate::graph::ResolvedGraph;

use super::path::{line, spline};
use super::scale::{LinearScale, extent};
use super::text::measure_label;
use super::{
    EdgeGeometry, LabelBounds, LabelPlacement, RingEdge, RingNode, RingTier, RingsLayout, Sector,
    ShapeKind, SplineEdge, TextAnchor,
};

const CENTER_RADIUS_FACTOR: f32 = 0.65;
const MIDDLE_RING_DIVISOR: f32 = 1.75;

struct Primary {
    node: usize,
    /// First link joining this primary to the center.
    link: usize,
    candidates: Vec<usize>,
    /// `(link, child)` pairs this primary won during claiming.
    children: Vec<(usize, usize)>,
}

impl Primary {
    fn units(&self) -> usize {
        self.children.len().max(1)
    }
}

struct Placement {
    ring: RingTier,
    radians: f32,
    x: f32,
    y: f32,
    r: f32,
    sector: Option<Sector>,
    parent: Option<usize>,
}

/// Upper radius for primary and secondary nodes given the ring spacing.
pub(crate) fn tier_radii(ring_width: f32) -> (f32, f32) {
    let primary_distance = ring_width / 2.0;
    let secondary_distance = ring_width / 4.0;

    let mut primary_max = primary_distance / 2.0 - 4.0;
    if primary_max < 8.0 {
        primary_max = (primary_distance / 2.0).min(8.0);
    }
    let mut secondary_max = secondary_distance / 2.0 - 4.0;
    if secondary_max < 4.0 {
        secondary_max = (secondary_distance / 2.0).min(4.0);
    }
    if secondary_max > ring_width / 10.0 {
        secondary_max = ring_width / 10.0;
    }
    if secondary_max > primary_max && secondary_max > 10.0 {
        secondary_max = primary_max * 0.75;
    }
    if primary_max > secondary_max * 1.5 {
        primary_max = secondary_max * 1.5;
    }
    (primary_max.floor(), secondary_max.floor())
}

fn select_primaries(graph: &ResolvedGraph, center: usize) -> Vec<Primary> {
    let mut primaries: Vec<Primary> = Vec::new();
    for &link_idx in graph.adjacency.incident(center) {
        let other = graph.links[link_idx].other(center);
        if other == center || primaries.iter().any(|p| p.node == other) {
            continue;
        }
        let candidates = graph
            .adjacency
            .incident(other)
            .iter()
            .copied()
            .filter(|&idx| !graph.links[idx].touches(center))
            .collect();
        primaries.push(Primary {
            node: other,
            link: link_idx,
            candidates,
            children: Vec::new(),
        });
    }
    // Primaries with fewer candidates claim first so that busy nodes do
    // not starve sparse ones.
    primaries.sort_by(|a, b| {
        a.candidates
            .len()
            .cmp(&b.candidates.len())
            .then_with(|| graph.nodes[a.node].id.cmp(&graph.nodes[b.node].id))
    });
    primaries
}

fn claim_children(graph: &ResolvedGraph, center: usize, primaries: &mut [Primary]) {
    let mut claimed: HashSet<usize> = primaries.iter().map(|p| p.node).collect();
    claimed.insert(center);
    for primary in primaries.iter_mut() {
        for &link_idx in &primary.candidates {
            let child = graph.links[link_idx].other(primary.node);
            if claimed.insert(child) {
                primary.children.push((link_idx, child));
            }
        }
    }
}

pub fn compute_rings_layout(
    graph: &ResolvedGraph,
    center_id: &str,
    config: &RingsConfig,
    labels: &LabelConfig,
    width: f32,
    height: f32,
) -> Result<RingsLayout, LayoutError> {
    let center = *graph
        .lookup
        .get(center_id)
        .ok_or_else(|| LayoutError::UnknownCenter(center_id.to_string()))?;

    let mut primaries = select_primaries(graph, center);
    if primaries.is_empty() {
        return Err(LayoutError::DegenerateCenter(center_id.to_string()));
    }
    claim_children(graph, center, &mut primaries);

    let radius = width.min(height) / 2.0;
    let ring_width = radius / 3.0;
    let primary_ring = ring_width;
    let secondary_ring = ring_width * 2.0;
    let (cx, cy) = (width / 2.0, height / 2.0);

    let total: usize = primaries.iter().map(Primary::units).sum();
    let step = TAU / total as f32;

    let mut placements: Vec<(usize, Placement)> = Vec::new();
    placements.push((
        center,
        Placement {
            ring: RingTier::Center,
            radians: 0.0,
            x: cx,
            y: cy,
            r: primary_ring * CENTER_RADIUS_FACTOR,
            sector: None,
            parent: None,
        },
    ));
    let mut secondaries = Vec::new();
    let mut offset = 0.0f32;
    for (i, primary) in primaries.iter().enumerate() {
        let units = primary.units() as f32;
        let space = step * units;
        if i == 0 {
            offset -= space / 2.0;
        }
        let angle = offset + space / 2.0 - FRAC_PI_2;
        offset += space;
        placements.push((
            primary.node,
            Placement {
                ring: RingTier::Primary,
                radians: angle,
                x: cx + primary_ring * angle.cos(),
                y: cy + primary_ring * angle.sin(),
                r: 0.0,
                sector: Some(Sector {
                    start: angle - space / 2.0,
                    end: angle + space / 2.0,
                }),
                parent: None,
            },
        ));
        for (slot, &(_, child)) in primary.children.iter().enumerate() {
            let a = angle - step * units / 2.0 + step / 2.0 + step * slot as f32;
            secondaries.push((
                child,
                Placement {
                    ring: RingTier::Secondary,
                    radians: a,
                    x: cx + secondary_ring * a.cos(),
                    y: cy + secondary_ring * a.sin(),
                    r: 0.0,
                    sector: None,
                    parent: Some(primary.node),
                },
            ));
        }
    }
    placements.extend(secondaries);

    assign_radii(graph, config, ring_width, &mut placements);

    let slot_of: BTreeMap<usize, usize> = placements
        .iter()
        .enumerate()
        .map(|(slot, (node, _))| (*node, slot))
        .collect();

    let edges = route_edges(
        graph,
        center,
        &primaries,
        &placements,
        &slot_of,
        (cx, cy),
        (primary_ring + secondary_ring) / MIDDLE_RING_DIVISOR,
    );

    let visible = placements.len() <= config.label_cutoff;
    let label_field = labels.label_field.as_deref();
    let nodes = placements
        .iter()
        .map(|(node_idx, place)| {
            let node = &graph.nodes[*node_idx];
            let text = node.label(label_field);
            let label = if place.ring == RingTier::Center {
                center_label(&text, primary_ring, labels, visible)
            } else {
                radial_label(&text, place, config.label_padding, labels, visible)
            };
            RingNode {
                id: node.id.clone(),
                index: *node_idx,
                ring: place.ring,
                radians: place.radians,
                x: place.x,
                y: place.y,
                r: place.r,
                shape: node.shape_or(ShapeKind::Circle),
                label,
                sector: place.sector,
                parent: place.parent,
                edges: edges
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.source == node.id || e.target == node.id)
                    .map(|(idx, _)| idx)
                    .collect(),
            }
        })
        .collect::<Vec<_>>();

    let neighbors = graph
        .nodes
        .iter()
        .filter(|node| !graph.adjacency.neighbors(node.index).is_empty())
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
        center = %center_id,
        primaries = primaries.len(),
        placed = nodes.len(),
        edges = edges.len(),
        total_units = total,
        "rings layout"
    );

    Ok(RingsLayout {
        center: center_id.to_string(),
        ring_width,
        primary_ring,
        secondary_ring,
        nodes,
        edges,
        neighbors,
    })
}

fn assign_radii(
    graph: &ResolvedGraph,
    config: &RingsConfig,
    ring_width: f32,
    placements: &mut [(usize, Placement)],
) {
    let (primary_max, secondary_max) = tier_radii(ring_width);
    let size_of = |node: usize| {
        config
            .size_field
            .as_deref()
            .and_then(|field| graph.nodes[node].hint_f32(field))
    };
    let size_scale = config.size_field.as_ref().and_then(|_| {
        let [lo, hi] = extent(placements.iter().filter_map(|(node, _)| size_of(*node)))?;
        let lo = if lo == hi { 0.0 } else { lo };
        Some(LinearScale::new(
            [lo, hi],
            [3.0, primary_max.min(secondary_max)],
        ))
    });

    for (node, place) in placements.iter_mut() {
        let fallback = match place.ring {
            RingTier::Center => place.r,
            RingTier::Primary => primary_max,
            RingTier::Secondary => secondary_max,
        };
        let r = match (&size_scale, size_of(*node)) {
            (Some(scale), Some(size)) => scale.apply_round(size),
            _ => fallback,
        };
        place.r = r.max(config.min_radius).min(config.max_radius);
    }
}

/// Endpoint on a node's rim; secondaries face inward.
fn rim_point(place: &Placement) -> (f32, f32) {
    let theta = if place.ring == RingTier::Secondary {
        place.radians + PI
    } else {
        place.radians
    };
    (
        place.x + theta.cos() * place.r,
        place.y + theta.sin() * place.r,
    )
}

fn route_edges(
    graph: &ResolvedGraph,
    center: usize,
    primaries: &[Primary],
    placements: &[(usize, Placement)],
    slot_of: &BTreeMap<usize, usize>,
    (cx, cy): (f32, f32),
    middle_ring: f32,
) -> Vec<RingEdge> {
    let place = |node: usize| slot_of.get(&node).map(|&slot| &placements[slot].1);
    let mut seen: HashSet<usize> = HashSet::new();
    let mut edges = Vec::new();
    for primary in primaries {
        let spoke = &graph.links[primary.link];
        if seen.insert(primary.link)
            && let (Some(a), Some(b)) = (place(spoke.source), place(spoke.target))
        {
            edges.push(RingEdge {
                link: spoke.index,
                source: graph.nodes[spoke.source].id.clone(),
                target: graph.nodes[spoke.target].id.clone(),
                geometry: EdgeGeometry::Straight {
                    x1: a.x,
                    y1: a.y,
                    x2: b.x,
                    y2: b.y,
                },
                path: line(a.x, a.y, b.x, b.y),
            });
        }

        for &link_idx in graph.adjacency.incident(primary.node) {
            let link = &graph.links[link_idx];
            let other = link.other(primary.node);
            if other == center || other == primary.node || seen.contains(&link_idx) {
                continue;
            }
            let (Some(source), Some(target)) = (place(link.source), place(link.target)) else {
                continue;
            };
            seen.insert(link_idx);
            let (source_x, source_y) = rim_point(source);
            let (target_x, target_y) = rim_point(target);
            let geometry = SplineEdge {
                source_x,
                source_y,
                source_bisect_x: cx + middle_ring * source.radians.cos(),
                source_bisect_y: cy + middle_ring * source.radians.sin(),
                target_bisect_x: cx + middle_ring * target.radians.cos(),
                target_bisect_y: cy + middle_ring * target.radians.sin(),
                target_x,
                target_y,
            };
            edges.push(RingEdge {
                link: link.index,
                source: graph.nodes[link.source].id.clone(),
                target: graph.nodes[link.target].id.clone(),
                path: spline(&geometry),
                geometry: EdgeGeometry::Spline(geometry),
            });
        }
    }
    edges
}

fn center_label(text: &str, primary_ring: f32, labels: &LabelConfig, visible: bool) -> LabelPlacement {
    LabelPlacement {
        text: measure_label(text, labels),
        bounds: LabelBounds {
            x: -primary_ring / 2.0,
            y: -primary_ring / 2.0,
            width: primary_ring,
            height: primary_ring,
        },
        rotate: 0.0,
        anchor: TextAnchor::Middle,
        font_size: labels.font_size,
        visible,
    }
}

/// Places a label outside its node, reading away from the center.
fn radial_label(
    text: &str,
    place: &Placement,
    padding: f32,
    labels: &LabelConfig,
    visible: bool,
) -> LabelPlacement {
    let block = measure_label(text, labels);
    let half_width = block.width;
    let half_height = block.lines.len() as f32 * labels.line_height * labels.font_size;
    let reach = place.r + padding;
    let xv = (place.radians + PI).cos() * reach;
    let yv = (place.radians + PI).sin() * reach;

    let mut rotate = place.radians.to_degrees();
    let mut x = -half_width - xv;
    let y = -place.r - yv;
    let rounded = rotate.round();
    let anchor = if rounded == 90.0 || rounded == -90.0 {
        if rotate < 0.0 {
            x += half_height / 6.0;
        } else {
            x -= half_height / 6.0;
        }
        TextAnchor::End
    } else if rotate.abs() > 90.0 {
        rotate -= 180.0;
        TextAnchor::Start
    } else {
        TextAnchor::End
    };

    LabelPlacement {
        text: block,
        bounds: LabelBounds {
            x,
            y,
            width: half_width * 2.0,
            height: half_height * 2.0,
        },
        rotate,
        anchor,
        font_size: labels.font_size,
        visible,
    }
}
