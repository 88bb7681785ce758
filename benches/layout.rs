use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use netlayout::config::Config;
use netlayout::ir::{DiagramInput, DiagramKind};
use netlayout::layout::compute_layout;
use serde_json::{Value, json};
use std::hint::black_box;

/// A hub with `nodes - 1` spokes plus a ladder of cross links, so every
/// kind has a center, secondaries and an acyclic flow.
fn dense_input(kind: DiagramKind, nodes: usize, extra_links: usize) -> DiagramInput {
    let mut node_records = Vec::with_capacity(nodes);
    let mut links = Vec::new();
    for i in 0..nodes {
        let angle = i as f32 * 0.7;
        node_records.push(json!({
            "id": format!("n{i}"),
            "x": angle.cos() * i as f32,
            "y": angle.sin() * i as f32,
            "size": (i % 7 + 1) as f32,
        }));
    }
    for i in 1..nodes.min(8) {
        links.push(json!({"source": "n0", "target": format!("n{i}"), "value": i}));
    }
    let mut count = 0usize;
    'outer: for i in 1..nodes {
        for j in (i + 1..nodes).step_by(3) {
            if count >= extra_links {
                break 'outer;
            }
            links.push(json!({"source": format!("n{i}"), "target": format!("n{j}"), "value": 1 + j % 4}));
            count += 1;
        }
    }
    let doc: Value = json!({
        "kind": kind,
        "center": "n0",
        "nodes": node_records,
        "links": links,
    });
    serde_json::from_value(doc).expect("bench input is valid")
}

fn bench_layout(c: &mut Criterion) {
    let config = Config::default();
    for kind in [
        DiagramKind::Chord,
        DiagramKind::Network,
        DiagramKind::Rings,
        DiagramKind::Sankey,
    ] {
        let mut group = c.benchmark_group(format!("layout_{kind}"));
        for (nodes, extra) in [(10, 10), (50, 120), (200, 600)] {
            let input = dense_input(kind, nodes, extra);
            group.bench_with_input(BenchmarkId::from_parameter(nodes), &input, |b, input| {
                b.iter(|| {
                    let layout = compute_layout(black_box(input), &config).expect("layout");
                    black_box(layout.width);
                });
            });
        }
        group.finish();
    }
}

fn bench_parse_and_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let config = Config::default();
    let source = serde_json::to_string(&dense_input(DiagramKind::Network, 100, 300))
        .expect("bench input serializes");
    group.bench_function("network_100", |b| {
        b.iter(|| {
            let input: DiagramInput = serde_json::from_str(black_box(&source)).expect("parse failed");
            let layout = compute_layout(&input, &config).expect("layout");
            let json = serde_json::to_string(&layout).expect("serializes");
            black_box(json.len());
        });
    });
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_layout, bench_parse_and_layout
);
criterion_main!(benches);
