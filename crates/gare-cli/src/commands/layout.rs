//! `gare layout` command - one-shot layout, run to rest and printed as a
//! render frame.

use std::path::PathBuf;

use anyhow::Result;
use gare_graph::{EngineConfig, GraphEngine, LayoutStrategy, MemoryStore, RenderFrame};

use super::open_snapshot;

/// Overrides on top of the config file.
#[derive(Debug, Default)]
pub struct LayoutArgs {
    pub strategy: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub link_distance: Option<f64>,
}

pub fn run(config: EngineConfig, snapshot: Option<PathBuf>, args: LayoutArgs) -> Result<()> {
    let (_, store) = open_snapshot(snapshot)?;
    let frame = compute(store, config, args)?;
    println!("{}", serde_json::to_string_pretty(&frame)?);
    Ok(())
}

pub fn compute(store: MemoryStore, mut config: EngineConfig, args: LayoutArgs) -> Result<RenderFrame> {
    if let Some(name) = &args.strategy {
        config.strategy = name.parse::<LayoutStrategy>()?;
    }
    if let Some(width) = args.width {
        config.canvas.width = width;
    }
    if let Some(height) = args.height {
        config.canvas.height = height;
    }
    if let Some(distance) = args.link_distance {
        config.layout.link_distance = distance;
    }

    let mut engine = GraphEngine::new(store, config)?;
    Ok(engine.settle()?)
}
