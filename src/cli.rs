use crate::config::{Config, load_config};
use crate::ir::{DiagramInput, DiagramKind};
use crate::layout::compute_layout;
use crate::layout_dump::write_layout_dump;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "netlayout",
    version,
    about = "Compute chord, network, rings and sankey layouts as JSON geometry"
)]
pub struct Args {
    /// Input document (.json / .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the layout dump. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Width, overriding the config file (default 800)
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Height, overriding the config file (default 600)
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Diagram kind, overriding the document's `kind`
    #[arg(short = 'k', long = "kind", value_parser = parse_kind)]
    pub kind: Option<DiagramKind>,

    /// Center node id for rings diagrams
    #[arg(long = "center")]
    pub center: Option<String>,

    /// Record field used for node labels
    #[arg(long = "label-field")]
    pub label_field: Option<String>,
}

fn parse_kind(token: &str) -> Result<DiagramKind, String> {
    DiagramKind::from_token(token)
        .ok_or_else(|| format!("unknown diagram kind `{token}` (chord, network, rings, sankey)"))
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = build_config(&args)?;

    let source = read_input(args.input.as_deref())?;
    let mut input = parse_input(&source)?;
    if let Some(kind) = args.kind {
        input.kind = kind;
    }
    if let Some(center) = args.center {
        input.center = Some(center);
    }

    tracing::info!(
        kind = %input.kind,
        nodes = input.nodes.len(),
        links = input.links.len(),
        "computing layout"
    );
    let layout = compute_layout(&input, &config)?;
    write_layout_dump(args.output.as_deref(), &layout)?;
    Ok(())
}

/// Loads the config file, then lets explicit flags win over it.
fn build_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.viewport.width = width;
    }
    if let Some(height) = args.height {
        config.viewport.height = height;
    }
    if let Some(field) = &args.label_field {
        config.layout.label.label_field = Some(field.clone());
    }
    Ok(config)
}

/// Logs go to stderr so the dump on stdout stays clean; `RUST_LOG`
/// overrides the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

/// Accepts strict JSON as well as JSON5 (comments, trailing commas).
pub fn parse_input(source: &str) -> Result<DiagramInput> {
    match serde_json::from_str(source) {
        Ok(input) => Ok(input),
        Err(_) => json5::from_str(source).context("input is neither valid JSON nor JSON5"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json5_documents() {
        let doc = r#"{
            // trailing commas and comments are fine
            kind: 'rings',
            center: 'hub',
            links: [{source: 'hub', target: 'a'},],
        }"#;
        let input = parse_input(doc).expect("json5 input");
        assert_eq!(input.kind, DiagramKind::Rings);
        assert_eq!(input.center.as_deref(), Some("hub"));
        assert_eq!(input.links.len(), 1);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_input("kind = chord").is_err());
    }

    #[test]
    fn kind_flag_accepts_aliases() {
        let args = Args::try_parse_from(["netlayout", "-k", "flow", "--center", "x"])
            .expect("args parse");
        assert_eq!(args.kind, Some(DiagramKind::Sankey));
        assert_eq!(args.center.as_deref(), Some("x"));
        assert_eq!(args.width, None);
        assert!(parse_kind("pie").is_err());
    }

    #[test]
    fn config_file_viewport_survives_without_flags() {
        let path = std::env::temp_dir().join(format!("netlayout-cli-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"viewport": {"width": 400, "height": 250}}"#)
            .expect("config written");
        let config_arg = path.to_string_lossy().into_owned();

        let args = Args::try_parse_from(["netlayout", "-c", config_arg.as_str()]).expect("args parse");
        let from_file = build_config(&args);
        let args = Args::try_parse_from(["netlayout", "-c", config_arg.as_str(), "-H", "120"])
            .expect("args parse");
        let overridden = build_config(&args);
        let _ = std::fs::remove_file(&path);

        let from_file = from_file.expect("config loads");
        assert_eq!((from_file.viewport.width, from_file.viewport.height), (400.0, 250.0));
        let overridden = overridden.expect("config loads");
        assert_eq!((overridden.viewport.width, overridden.viewport.height), (400.0, 120.0));
    }

    #[test]
    fn viewport_defaults_apply_without_file_or_flags() {
        let args = Args::try_parse_from(["netlayout"]).expect("args parse");
        let config = build_config(&args).expect("default config");
        assert_eq!((config.viewport.width, config.viewport.height), (800.0, 600.0));
    }
}
