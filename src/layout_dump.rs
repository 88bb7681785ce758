use crate::layout::{DiagramData, Layout, ShapeKind};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// A flat view of one layout pass: one box per node and one path per
/// edge, followed by the full diagram geometry.
#[derive(Debug, Serialize)]
pub struct LayoutDump<'a> {
    pub kind: String,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub geometry: &'a DiagramData,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub shape: ShapeKind,
    /// Center of the node's box.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub source: String,
    pub target: String,
    pub path: String,
}

impl<'a> LayoutDump<'a> {
    pub fn from_layout(layout: &'a Layout) -> Self {
        let (nodes, edges) = match &layout.diagram {
            DiagramData::Chord(chord) => {
                let mid = (chord.inner_radius + chord.outer_radius) / 2.0;
                let band = chord.outer_radius - chord.inner_radius;
                let nodes = chord
                    .groups
                    .iter()
                    .map(|g| {
                        let a = (g.start_angle + g.end_angle) / 2.0;
                        NodeDump {
                            id: g.id.clone(),
                            shape: g.shape,
                            x: chord.center.0 + mid * a.sin(),
                            y: chord.center.1 - mid * a.cos(),
                            width: band,
                            height: band,
                        }
                    })
                    .collect();
                let edges = chord
                    .ribbons
                    .iter()
                    .map(|r| EdgeDump {
                        source: r.source.id.clone(),
                        target: r.target.id.clone(),
                        path: r.path.clone(),
                    })
                    .collect();
                (nodes, edges)
            }
            DiagramData::Rings(rings) => {
                let nodes = rings
                    .nodes
                    .iter()
                    .map(|n| NodeDump {
                        id: n.id.clone(),
                        shape: n.shape,
                        x: n.x,
                        y: n.y,
                        width: n.r * 2.0,
                        height: n.r * 2.0,
                    })
                    .collect();
                let edges = rings
                    .edges
                    .iter()
                    .map(|e| EdgeDump {
                        source: e.source.clone(),
                        target: e.target.clone(),
                        path: e.path.clone(),
                    })
                    .collect();
                (nodes, edges)
            }
            DiagramData::Network(network) => {
                let nodes = network
                    .nodes
                    .iter()
                    .map(|n| NodeDump {
                        id: n.id.clone(),
                        shape: n.shape,
                        x: n.x,
                        y: n.y,
                        width: n.width,
                        height: n.height,
                    })
                    .collect();
                let edges = network
                    .links
                    .iter()
                    .map(|l| EdgeDump {
                        source: l.source.clone(),
                        target: l.target.clone(),
                        path: l.path.clone(),
                    })
                    .collect();
                (nodes, edges)
            }
            DiagramData::Sankey(flow) => {
                let nodes = flow
                    .nodes
                    .iter()
                    .map(|n| NodeDump {
                        id: n.id.clone(),
                        shape: n.shape,
                        x: (n.x0 + n.x1) / 2.0,
                        y: (n.y0 + n.y1) / 2.0,
                        width: n.x1 - n.x0,
                        height: n.y1 - n.y0,
                    })
                    .collect();
                let edges = flow
                    .links
                    .iter()
                    .map(|l| EdgeDump {
                        source: l.source.clone(),
                        target: l.target.clone(),
                        path: l.path.clone(),
                    })
                    .collect();
                (nodes, edges)
            }
        };

        LayoutDump {
            kind: layout.kind.to_string(),
            width: layout.width,
            height: layout.height,
            nodes,
            edges,
            geometry: &layout.diagram,
        }
    }
}

/// Writes the dump as pretty JSON to `path`, or to stdout when `None`.
pub fn write_layout_dump(path: Option<&Path>, layout: &Layout) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout);
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ir::DiagramInput;
    use crate::layout::compute_layout;
    use serde_json::json;

    #[test]
    fn flow_dump_flattens_boxes() {
        let input: DiagramInput = serde_json::from_value(json!({
            "kind": "sankey",
            "links": [{"source": "a", "target": "b", "value": 1}]
        }))
        .expect("valid input");
        let layout = compute_layout(&input, &Config::default()).expect("layout");
        let dump = LayoutDump::from_layout(&layout);
        assert_eq!(dump.kind, "sankey");
        assert_eq!(dump.nodes.len(), 2);
        assert_eq!(dump.nodes[0].width, 30.0);
        assert_eq!(dump.edges[0].source, "a");

        let value = serde_json::to_value(&dump).expect("serializes");
        assert_eq!(value["geometry"]["type"], "sankey");
        assert_eq!(value["nodes"][0]["shape"], "rect");
    }

    #[test]
    fn dump_writes_to_file() {
        let input: DiagramInput = serde_json::from_value(json!({
            "kind": "network",
            "nodes": [{"id": "a", "x": 0, "y": 0}, {"id": "b", "x": 1, "y": 1}],
            "links": [{"source": "a", "target": "b"}]
        }))
        .expect("valid input");
        let layout = compute_layout(&input, &Config::default()).expect("layout");
        let path = std::env::temp_dir().join(format!("netlayout-dump-{}.json", std::process::id()));
        write_layout_dump(Some(&path), &layout).expect("dump written");
        let text = std::fs::read_to_string(&path).expect("dump readable");
        let _ = std::fs::remove_file(&path);
        let parsed: serde_json::Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(parsed["edges"][0]["target"], "b");
    }
}
