//! Geometry for relational diagrams: chord, network, rings and sankey.
//!
//! Input records are resolved into a node arena with adjacency tables,
//! then one of the layout strategies turns them into coordinates, radii,
//! angles and SVG path strings for an external renderer.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod text_metrics;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use error::{LayoutError, LinkEnd};
pub use ir::{DiagramInput, DiagramKind, IdAccessor};
pub use layout::{Layout, compute_layout, compute_layout_with};
