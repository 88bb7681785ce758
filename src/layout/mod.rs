mod chord;
mod flow;
mod network;
mod path;
mod rings;
pub mod scale;
mod text;
pub(crate) mod types;

pub use chord::{build_matrix, compute_chord_layout};
pub use flow::{
    FlowAlgorithm, FlowBand, FlowEdge, FlowInput, FlowNodeBox, FlowOutput, RankedFlow,
    compute_flow_layout,
};
pub use network::compute_network_layout;
pub use rings::compute_rings_layout;
pub use types::*;

use crate::config::{Config, ViewportConfig};
use crate::error::LayoutError;
use crate::graph::{MergePolicy, ResolveOptions, ResolvedGraph};
use crate::ir::{DiagramInput, DiagramKind, IdAccessor};

/// Runs one layout pass, reading node ids from `config.layout.id_field`.
pub fn compute_layout(input: &DiagramInput, config: &Config) -> Result<Layout, LayoutError> {
    let id = IdAccessor::field(config.layout.id_field.clone());
    compute_layout_with(input, config, &id)
}

pub fn compute_layout_with(
    input: &DiagramInput,
    config: &Config,
    id: &IdAccessor,
) -> Result<Layout, LayoutError> {
    let span = tracing::debug_span!("layout", kind = %input.kind);
    let _enter = span.enter();

    let (width, height) = usable_area(&config.viewport)?;
    let layout = &config.layout;
    let options = match input.kind {
        DiagramKind::Network => ResolveOptions::new(id),
        DiagramKind::Chord => ResolveOptions::new(id)
            .with_policy(MergePolicy::ExplicitOnly)
            .with_sort_by_id(layout.chord.sort_nodes),
        DiagramKind::Rings | DiagramKind::Sankey => {
            ResolveOptions::new(id).with_policy(MergePolicy::ExplicitOnly)
        }
    };
    // The center is checked before resolving so a missing one is reported
    // as such rather than as a link problem.
    let center = match input.kind {
        DiagramKind::Rings => Some(input.center.as_deref().ok_or(LayoutError::MissingCenter)?),
        _ => None,
    };
    let graph = ResolvedGraph::resolve(
        &input.data,
        &input.nodes,
        &input.links,
        &layout.link_keys,
        &options,
    )?;

    let diagram = match input.kind {
        DiagramKind::Chord => DiagramData::Chord(compute_chord_layout(
            &graph,
            &layout.chord,
            &layout.label,
            width,
            height,
        )?),
        DiagramKind::Rings => DiagramData::Rings(compute_rings_layout(
            &graph,
            center.unwrap_or_default(),
            &layout.rings,
            &layout.label,
            width,
            height,
        )?),
        DiagramKind::Network => DiagramData::Network(compute_network_layout(
            &graph,
            &layout.network,
            &layout.label,
            width,
            height,
        )?),
        DiagramKind::Sankey => DiagramData::Sankey(compute_flow_layout(
            &graph,
            &layout.flow,
            &layout.label,
            width,
            height,
            &RankedFlow::new(layout.flow.iterations),
        )?),
    };

    Ok(Layout {
        kind: input.kind,
        width,
        height,
        diagram,
    })
}

/// Viewport size minus margins; fails when nothing drawable is left.
pub fn usable_area(viewport: &ViewportConfig) -> Result<(f32, f32), LayoutError> {
    let (width, height) = viewport.inner_size();
    if width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite() {
        Ok((width, height))
    } else {
        Err(LayoutError::InvalidViewport { width, height })
    }
}
