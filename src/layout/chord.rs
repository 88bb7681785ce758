use std::cmp::Ordering;
use std::f32::consts::TAU;

use crate::config::{ChordConfig, ChordMode, LabelConfig, SubgroupOrder};
use crate::error::LayoutError;
use crate::graph::ResolvedGraph;
use crate::ir::DiagramKind;

use super::path::{annulus_arc, ribbon};
use super::{ChordEnd, ChordGroup, ChordLayout, ChordRibbon, ShapeKind};

/// Square weight matrix; `matrix[s][t]` holds the value of the last link
/// from `s` to `t`. Repeated links overwrite rather than accumulate.
pub fn build_matrix(graph: &ResolvedGraph) -> Vec<Vec<f32>> {
    let n = graph.nodes.len();
    let mut matrix = vec![vec![0.0f32; n]; n];
    for link in &graph.links {
        matrix[link.source][link.target] = link.value;
    }
    matrix
}

#[derive(Debug, Clone, Copy)]
struct Span {
    index: usize,
    start: f32,
    end: f32,
    value: f32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Pending {
    source: Option<Span>,
    target: Option<Span>,
}

struct ChordAngles {
    groups: Vec<Span>,
    /// Keyed by `source * n + target`, in key order.
    chords: Vec<(Span, Span)>,
}

fn compare(order: SubgroupOrder, a: f32, b: f32) -> Ordering {
    match order {
        SubgroupOrder::Descending => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        SubgroupOrder::Ascending => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        SubgroupOrder::Input => Ordering::Equal,
    }
}

fn chord_angles(matrix: &[Vec<f32>], config: &ChordConfig) -> ChordAngles {
    let n = matrix.len();
    let directed = config.mode == ChordMode::Directed;
    let cell = |i: usize, j: usize| matrix[i][j];

    let sums: Vec<f32> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| cell(i, j) + if directed { cell(j, i) } else { 0.0 })
                .sum()
        })
        .collect();
    let total: f32 = sums.iter().sum();
    let k = if total > 0.0 {
        (TAU - config.pad_angle * n as f32).max(0.0) / total
    } else {
        0.0
    };
    let dx = if k > 0.0 {
        config.pad_angle
    } else {
        TAU / n.max(1) as f32
    };

    let mut pending = vec![Pending::default(); n * n];
    let mut groups = Vec::with_capacity(n);
    let mut x = 0.0f32;
    for i in 0..n {
        let x0 = x;
        if directed {
            // Incoming subgroups carry negative keys (`-1 - source`), in
            // the same order as outgoing ones but sorted by negated value.
            let mut subgroups: Vec<isize> = (-(n as isize)..n as isize)
                .filter(|&j| {
                    if j < 0 {
                        cell((-1 - j) as usize, i) != 0.0
                    } else {
                        cell(i, j as usize) != 0.0
                    }
                })
                .collect();
            let key = |j: isize| {
                if j < 0 {
                    -cell((-1 - j) as usize, i)
                } else {
                    cell(i, j as usize)
                }
            };
            subgroups.sort_by(|&a, &b| compare(config.sort_subgroups, key(a), key(b)));
            for j in subgroups {
                if j < 0 {
                    let source = (-1 - j) as usize;
                    let value = cell(source, i);
                    let start = x;
                    x += value * k;
                    pending[source * n + i].target = Some(Span {
                        index: i,
                        start,
                        end: x,
                        value,
                    });
                } else {
                    let target = j as usize;
                    let value = cell(i, target);
                    let start = x;
                    x += value * k;
                    pending[i * n + target].source = Some(Span {
                        index: i,
                        start,
                        end: x,
                        value,
                    });
                }
            }
        } else {
            let mut subgroups: Vec<usize> = (0..n)
                .filter(|&j| cell(i, j) != 0.0 || cell(j, i) != 0.0)
                .collect();
            subgroups.sort_by(|&a, &b| compare(config.sort_subgroups, cell(i, a), cell(i, b)));
            for j in subgroups {
                let value = cell(i, j);
                let start = x;
                x += value * k;
                let span = Span {
                    index: i,
                    start,
                    end: x,
                    value,
                };
                let slot = if i < j {
                    let slot = &mut pending[i * n + j];
                    slot.source = Some(span);
                    slot
                } else {
                    let slot = &mut pending[j * n + i];
                    slot.target = Some(span);
                    if i == j {
                        slot.source = Some(span);
                    }
                    slot
                };
                if let (Some(s), Some(t)) = (slot.source, slot.target)
                    && s.value < t.value
                {
                    slot.source = Some(t);
                    slot.target = Some(s);
                }
            }
        }
        groups.push(Span {
            index: i,
            start: x0,
            end: x,
            value: sums[i],
        });
        x += dx;
    }

    let chords = pending
        .into_iter()
        .filter_map(|slot| match (slot.source, slot.target) {
            (Some(s), Some(t)) => Some((s, t)),
            _ => None,
        })
        .collect();
    ChordAngles { groups, chords }
}

pub fn compute_chord_layout(
    graph: &ResolvedGraph,
    config: &ChordConfig,
    labels: &LabelConfig,
    width: f32,
    height: f32,
) -> Result<ChordLayout, LayoutError> {
    if graph.nodes.is_empty() {
        return Err(LayoutError::EmptyGraph(DiagramKind::Chord));
    }
    let matrix = build_matrix(graph);
    let angles = chord_angles(&matrix, config);

    let inner_radius = ((width - 2.0 * config.node_width).min(height - 2.0 * config.node_width)
        / 2.0)
        .max(0.0);
    let outer_radius = inner_radius + config.node_width;

    let label_field = labels.label_field.as_deref();
    let groups = angles
        .groups
        .iter()
        .map(|span| {
            let node = &graph.nodes[span.index];
            ChordGroup {
                index: span.index,
                id: node.id.clone(),
                label: node.label(label_field),
                start_angle: span.start,
                end_angle: span.end,
                value: span.value,
                shape: ShapeKind::Path,
                path: annulus_arc(inner_radius, outer_radius, span.start, span.end),
            }
        })
        .collect();

    let end = |span: &Span| ChordEnd {
        index: span.index,
        id: graph.nodes[span.index].id.clone(),
        start_angle: span.start,
        end_angle: span.end,
        value: span.value,
    };
    let ribbons = angles
        .chords
        .iter()
        .map(|(source, target)| ChordRibbon {
            key: format!("{}-{}", source.index, target.index),
            source: end(source),
            target: end(target),
            value: source.value,
            shape: ShapeKind::Path,
            path: ribbon(
                inner_radius,
                (source.start, source.end),
                (target.start, target.end),
            ),
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        groups = graph.nodes.len(),
        ribbons = ribbons.len(),
        inner_radius,
        "chord layout"
    );

    Ok(ChordLayout {
        center: (width / 2.0, height / 2.0),
        inner_radius,
        outer_radius,
        groups,
        ribbons,
        matrix,
    })
}
