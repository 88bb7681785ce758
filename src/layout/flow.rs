use std::collections::VecDeque;

use crate::config::{FlowConfig, LabelConfig};
use crate::error::LayoutError;
use crate::graph::ResolvedGraph;
use crate::ir::DiagramKind;

use super::path::flow_link;
use super::{FlowLayout, FlowLink, FlowNode, ShapeKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowEdge {
    pub source: usize,
    pub target: usize,
    pub value: f32,
}

/// What a flow algorithm sees: node ids by index, weighted edges and the
/// drawing extent.
#[derive(Debug, Clone)]
pub struct FlowInput {
    pub nodes: Vec<String>,
    pub links: Vec<FlowEdge>,
    pub node_width: f32,
    pub node_padding: f32,
    pub size: (f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowNodeBox {
    pub x0: f32,
    pub x1: f32,
    pub y0: f32,
    pub y1: f32,
    pub value: f32,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowBand {
    pub y0: f32,
    pub y1: f32,
    pub width: f32,
}

/// Geometry indexed like the input nodes and links.
#[derive(Debug, Clone, Default)]
pub struct FlowOutput {
    pub nodes: Vec<FlowNodeBox>,
    pub links: Vec<FlowBand>,
}

pub trait FlowAlgorithm {
    fn layout(&self, input: &FlowInput) -> Result<FlowOutput, LayoutError>;
}

/// Longest-path columns, value-proportional heights and iterative
/// relaxation toward linked neighbours.
#[derive(Debug, Clone, Copy)]
pub struct RankedFlow {
    pub iterations: usize,
}

impl Default for RankedFlow {
    fn default() -> Self {
        Self { iterations: 6 }
    }
}

impl RankedFlow {
    pub fn new(iterations: usize) -> Self {
        Self { iterations }
    }
}

struct Graph<'a> {
    links: &'a [FlowEdge],
    incoming: Vec<Vec<usize>>,
    outgoing: Vec<Vec<usize>>,
}

impl<'a> Graph<'a> {
    fn new(n: usize, links: &'a [FlowEdge]) -> Self {
        let mut incoming = vec![Vec::new(); n];
        let mut outgoing = vec![Vec::new(); n];
        for (idx, link) in links.iter().enumerate() {
            outgoing[link.source].push(idx);
            incoming[link.target].push(idx);
        }
        Self {
            links,
            incoming,
            outgoing,
        }
    }

    fn topological_order(&self, ids: &[String]) -> Result<Vec<usize>, LayoutError> {
        let n = self.incoming.len();
        let mut indegree: Vec<usize> = self.incoming.iter().map(Vec::len).collect();
        let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &edge in &self.outgoing[node] {
                let target = self.links[edge].target;
                indegree[target] -= 1;
                if indegree[target] == 0 {
                    queue.push_back(target);
                }
            }
        }
        if order.len() < n {
            let stuck = (0..n).find(|&i| indegree[i] > 0).unwrap_or(0);
            return Err(LayoutError::CircularFlow(ids[stuck].clone()));
        }
        Ok(order)
    }
}

impl FlowAlgorithm for RankedFlow {
    fn layout(&self, input: &FlowInput) -> Result<FlowOutput, LayoutError> {
        let n = input.nodes.len();
        let (width, height) = input.size;
        let graph = Graph::new(n, &input.links);
        let order = graph.topological_order(&input.nodes)?;

        let mut nodes = vec![FlowNodeBox::default(); n];
        for (i, node) in nodes.iter_mut().enumerate() {
            let sum = |edges: &Vec<usize>| edges.iter().map(|&e| input.links[e].value).sum::<f32>();
            node.value = sum(&graph.incoming[i]).max(sum(&graph.outgoing[i]));
        }

        for &node in &order {
            for &edge in &graph.outgoing[node] {
                let target = input.links[edge].target;
                nodes[target].depth = nodes[target].depth.max(nodes[node].depth + 1);
            }
        }
        let last = nodes.iter().map(|b| b.depth).max().unwrap_or(0);
        for (i, node) in nodes.iter_mut().enumerate() {
            if graph.outgoing[i].is_empty() {
                node.depth = last;
            }
        }

        let mut columns: Vec<Vec<usize>> = vec![Vec::new(); last + 1];
        for i in 0..n {
            columns[nodes[i].depth].push(i);
        }
        let kx = if last > 0 {
            (width - input.node_width) / last as f32
        } else {
            0.0
        };
        for node in nodes.iter_mut() {
            node.x0 = node.depth as f32 * kx;
            node.x1 = node.x0 + input.node_width;
        }

        let tallest = columns.iter().map(Vec::len).max().unwrap_or(1);
        let py = if tallest > 1 {
            input.node_padding.min(height / (tallest - 1) as f32)
        } else {
            input.node_padding
        };
        let ky = columns
            .iter()
            .filter_map(|column| {
                let total: f32 = column.iter().map(|&i| nodes[i].value).sum();
                (total > 0.0).then(|| (height - (column.len() as f32 - 1.0) * py) / total)
            })
            .fold(f32::INFINITY, f32::min);
        let ky = if ky.is_finite() { ky.max(0.0) } else { 0.0 };

        for column in &columns {
            let mut y = 0.0;
            for &i in column {
                nodes[i].y0 = y;
                nodes[i].y1 = y + nodes[i].value * ky;
                y = nodes[i].y1 + py;
            }
            let slack = (height - y + py) / (column.len() + 1) as f32;
            for (k, &i) in column.iter().enumerate() {
                let shift = slack * (k + 1) as f32;
                nodes[i].y0 += shift;
                nodes[i].y1 += shift;
            }
        }

        let mut bands = link_bands(&graph, &nodes, ky);
        for iteration in 0..self.iterations {
            let alpha = 0.99f32.powi(iteration as i32);
            let beta = (1.0 - alpha).max((iteration + 1) as f32 / self.iterations as f32);
            for column in columns.iter_mut().rev().skip(1) {
                relax(column, &mut nodes, &graph.outgoing, &bands, alpha, |band| band.y1);
                column.sort_by(|a, b| nodes[*a].y0.total_cmp(&nodes[*b].y0).then(a.cmp(b)));
                resolve_collisions(column, &mut nodes, py, height, beta);
                bands = link_bands(&graph, &nodes, ky);
            }
            for column in columns.iter_mut().skip(1) {
                relax(column, &mut nodes, &graph.incoming, &bands, alpha, |band| band.y0);
                column.sort_by(|a, b| nodes[*a].y0.total_cmp(&nodes[*b].y0).then(a.cmp(b)));
                resolve_collisions(column, &mut nodes, py, height, beta);
                bands = link_bands(&graph, &nodes, ky);
            }
        }

        Ok(FlowOutput {
            nodes,
            links: bands,
        })
    }
}

/// Moves each node toward the value-weighted center of the link ends
/// across `edges`.
fn relax(
    column: &[usize],
    nodes: &mut [FlowNodeBox],
    edges: &[Vec<usize>],
    bands: &[FlowBand],
    alpha: f32,
    far_end: impl Fn(&FlowBand) -> f32,
) {
    for &i in column {
        let (mut weighted, mut total) = (0.0f32, 0.0f32);
        for &edge in &edges[i] {
            let band = &bands[edge];
            weighted += far_end(band) * band.width;
            total += band.width;
        }
        if total <= 0.0 {
            continue;
        }
        let center = (nodes[i].y0 + nodes[i].y1) / 2.0;
        let dy = (weighted / total - center) * alpha;
        nodes[i].y0 += dy;
        nodes[i].y1 += dy;
    }
}

fn resolve_collisions(column: &[usize], nodes: &mut [FlowNodeBox], py: f32, height: f32, alpha: f32) {
    if column.is_empty() {
        return;
    }
    let mid = column.len() / 2;
    let subject = nodes[column[mid]];
    push_up(column, nodes, subject.y0 - py, mid as isize - 1, py, alpha);
    push_down(column, nodes, subject.y1 + py, mid + 1, py, alpha);
    push_up(column, nodes, height, column.len() as isize - 1, py, alpha);
    push_down(column, nodes, 0.0, 0, py, alpha);
}

fn push_down(column: &[usize], nodes: &mut [FlowNodeBox], mut y: f32, from: usize, py: f32, alpha: f32) {
    for &i in column.iter().skip(from) {
        let dy = (y - nodes[i].y0) * alpha;
        if dy > 1e-6 {
            nodes[i].y0 += dy;
            nodes[i].y1 += dy;
        }
        y = nodes[i].y1 + py;
    }
}

fn push_up(column: &[usize], nodes: &mut [FlowNodeBox], mut y: f32, from: isize, py: f32, alpha: f32) {
    let mut k = from;
    while k >= 0 {
        let i = column[k as usize];
        let dy = (nodes[i].y1 - y) * alpha;
        if dy > 1e-6 {
            nodes[i].y0 -= dy;
            nodes[i].y1 -= dy;
        }
        y = nodes[i].y0 - py;
        k -= 1;
    }
}

/// Stacks link bands on both ends, ordered by the position of the node at
/// the other end.
fn link_bands(graph: &Graph<'_>, nodes: &[FlowNodeBox], ky: f32) -> Vec<FlowBand> {
    let mut bands: Vec<FlowBand> = graph
        .links
        .iter()
        .map(|link| FlowBand {
            width: link.value * ky,
            ..FlowBand::default()
        })
        .collect();
    for (i, node) in nodes.iter().enumerate() {
        let mut out = graph.outgoing[i].clone();
        out.sort_by(|&a, &b| {
            let (ta, tb) = (graph.links[a].target, graph.links[b].target);
            nodes[ta].y0.total_cmp(&nodes[tb].y0).then(a.cmp(&b))
        });
        let mut y = node.y0;
        for edge in out {
            bands[edge].y0 = y + bands[edge].width / 2.0;
            y += bands[edge].width;
        }

        let mut inc = graph.incoming[i].clone();
        inc.sort_by(|&a, &b| {
            let (sa, sb) = (graph.links[a].source, graph.links[b].source);
            nodes[sa].y0.total_cmp(&nodes[sb].y0).then(a.cmp(&b))
        });
        let mut y = node.y0;
        for edge in inc {
            bands[edge].y1 = y + bands[edge].width / 2.0;
            y += bands[edge].width;
        }
    }
    bands
}

pub fn compute_flow_layout(
    graph: &ResolvedGraph,
    config: &FlowConfig,
    labels: &LabelConfig,
    width: f32,
    height: f32,
    algorithm: &dyn FlowAlgorithm,
) -> Result<FlowLayout, LayoutError> {
    if graph.nodes.is_empty() {
        return Err(LayoutError::EmptyGraph(DiagramKind::Sankey));
    }
    let links = graph
        .links
        .iter()
        .map(|link| {
            if link.value > 0.0 && link.value.is_finite() {
                Ok(FlowEdge {
                    source: link.source,
                    target: link.target,
                    value: link.value,
                })
            } else {
                Err(LayoutError::InvalidValue {
                    link: link.index,
                    value: link.value,
                })
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let input = FlowInput {
        nodes: graph.nodes.iter().map(|n| n.id.clone()).collect(),
        links,
        node_width: config.node_width,
        node_padding: config.node_padding,
        size: (width, height),
    };
    let output = algorithm.layout(&input)?;

    let label_field = labels.label_field.as_deref();
    let nodes: Vec<FlowNode> = graph
        .nodes
        .iter()
        .zip(&output.nodes)
        .map(|(node, b)| FlowNode {
            id: node.id.clone(),
            index: node.index,
            label: node.label(label_field),
            x0: b.x0,
            x1: b.x1,
            y0: b.y0,
            y1: b.y1,
            value: b.value,
            depth: b.depth,
            shape: ShapeKind::Rect,
        })
        .collect();
    let links: Vec<FlowLink> = graph
        .links
        .iter()
        .zip(&output.links)
        .map(|(link, band)| {
            let (source, target) = (&nodes[link.source], &nodes[link.target]);
            FlowLink {
                link: link.index,
                source: source.id.clone(),
                target: target.id.clone(),
                value: link.value,
                y0: band.y0,
                y1: band.y1,
                width: band.width,
                path: flow_link(source.x1, band.y0, target.x0, band.y1),
            }
        })
        .collect();

    tracing::debug!(nodes = nodes.len(), links = links.len(), "flow layout");

    Ok(FlowLayout {
        node_width: config.node_width,
        nodes,
        links,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{MergePolicy, ResolveOptions};
    use crate::ir::{IdAccessor, LinkKeys, Record};
    use serde_json::{Value, json};

    fn graph(links: Value) -> ResolvedGraph {
        let links: Vec<Record> = links
            .as_array()
            .map(|items| items.iter().filter_map(|i| i.as_object().cloned()).collect())
            .unwrap_or_default();
        let id = IdAccessor::default();
        let options = ResolveOptions::new(&id).with_policy(MergePolicy::ExplicitOnly);
        ResolvedGraph::resolve(&[], &[], &links, &LinkKeys::default(), &options)
            .expect("graph resolves")
    }

    fn layout(graph: &ResolvedGraph, w: f32, h: f32) -> Result<FlowLayout, LayoutError> {
        compute_flow_layout(
            graph,
            &FlowConfig::default(),
            &LabelConfig::default(),
            w,
            h,
            &RankedFlow::default(),
        )
    }

    #[test]
    fn chain_fills_each_column() {
        let g = graph(json!([
            {"source": "A", "target": "B", "value": 10},
            {"source": "B", "target": "C", "value": 10}
        ]));
        let out = layout(&g, 300.0, 100.0).expect("flow layout");
        let xs: Vec<f32> = out.nodes.iter().map(|n| n.x0).collect();
        assert_eq!(xs, vec![0.0, 135.0, 270.0]);
        for node in &out.nodes {
            assert!((node.y0 - 0.0).abs() < 1e-3 && (node.y1 - 100.0).abs() < 1e-3);
            assert_eq!(node.shape, ShapeKind::Rect);
        }
        let link = &out.links[0];
        assert!((link.width - 100.0).abs() < 1e-3);
        assert!((link.y0 - 50.0).abs() < 1e-3 && (link.y1 - 50.0).abs() < 1e-3);
        assert_eq!(link.path, "M30,50C82.5,50 82.5,50 135,50");
    }

    #[test]
    fn sinks_are_justified_to_the_last_column() {
        let g = graph(json!([
            {"source": "A", "target": "B", "value": 1},
            {"source": "A", "target": "C", "value": 1},
            {"source": "C", "target": "D", "value": 1}
        ]));
        let out = layout(&g, 400.0, 200.0).expect("flow layout");
        let depth = |id: &str| out.nodes.iter().find(|n| n.id == id).map(|n| n.depth);
        assert_eq!(depth("A"), Some(0));
        assert_eq!(depth("C"), Some(1));
        assert_eq!(depth("B"), Some(2));
        assert_eq!(depth("D"), Some(2));
    }

    #[test]
    fn merged_column_nodes_stay_inside_and_apart() {
        let g = graph(json!([
            {"source": "A", "target": "C", "value": 2},
            {"source": "B", "target": "C", "value": 2},
            {"source": "C", "target": "D", "value": 1},
            {"source": "C", "target": "E", "value": 3}
        ]));
        let out = layout(&g, 500.0, 200.0).expect("flow layout");
        for node in &out.nodes {
            assert!(node.y0 >= -1e-3 && node.y1 <= 200.0 + 1e-3, "{} out of bounds", node.id);
            assert!((node.y1 - node.y0) > 0.0);
        }
        let c = out.nodes.iter().find(|n| n.id == "C").expect("C");
        assert_eq!(c.value, 4.0);
        let mut first = out
            .nodes
            .iter()
            .filter(|n| n.depth == 0)
            .collect::<Vec<_>>();
        first.sort_by(|a, b| a.y0.total_cmp(&b.y0));
        assert!(first[0].y1 <= first[1].y0 + 1e-3);
    }

    #[test]
    fn cycles_are_rejected() {
        let g = graph(json!([
            {"source": "A", "target": "B", "value": 1},
            {"source": "B", "target": "A", "value": 1}
        ]));
        assert!(matches!(layout(&g, 100.0, 100.0), Err(LayoutError::CircularFlow(_))));
    }

    #[test]
    fn non_positive_values_are_rejected() {
        let g = graph(json!([{"source": "A", "target": "B", "value": 0}]));
        assert_eq!(
            layout(&g, 100.0, 100.0).unwrap_err(),
            LayoutError::InvalidValue { link: 0, value: 0.0 }
        );
    }

    struct Fixed;

    impl FlowAlgorithm for Fixed {
        fn layout(&self, input: &FlowInput) -> Result<FlowOutput, LayoutError> {
            Ok(FlowOutput {
                nodes: input
                    .nodes
                    .iter()
                    .enumerate()
                    .map(|(i, _)| FlowNodeBox {
                        x0: i as f32 * 10.0,
                        x1: i as f32 * 10.0 + 5.0,
                        y0: 0.0,
                        y1: 1.0,
                        value: 1.0,
                        depth: i,
                    })
                    .collect(),
                links: input
                    .links
                    .iter()
                    .map(|_| FlowBand {
                        y0: 0.5,
                        y1: 0.5,
                        width: 1.0,
                    })
                    .collect(),
            })
        }
    }

    #[test]
    fn custom_algorithms_plug_in() {
        let g = graph(json!([{"source": "A", "target": "B", "value": 3}]));
        let out = compute_flow_layout(
            &g,
            &FlowConfig::default(),
            &LabelConfig::default(),
            100.0,
            100.0,
            &Fixed,
        )
        .expect("flow layout");
        assert_eq!(out.nodes[1].x0, 10.0);
        assert_eq!(out.links[0].path, "M5,0.5C7.5,0.5 7.5,0.5 10,0.5");
    }
}
