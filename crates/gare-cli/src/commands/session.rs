//! `gare session` command - stdio front end for the interactive engine.
//!
//! Reads one JSON message per stdin line. A message is either an
//! `InteractionEvent` (`{"type":"drag","node_id":"person_1","x":10,"y":20}`)
//! or a session command (`{"type":"infer_all"}`, `{"type":"locate","query":"ana"}`,
//! `{"type":"quit"}`, ...).
//! Frames are written while the layout moves and after every message.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use gare_graph::{EngineConfig, GraphEngine, InteractionEvent, MemoryStore, RecordRef, RelationKind};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use super::open_snapshot;
use crate::progress;

/// Commands that act on the store rather than the view.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionCommand {
    InferAll,
    AutoLink { node_id: String },
    Search {
        query: String,
        #[serde(default = "default_search_limit")]
        limit: usize,
    },
    Locate { query: String },
    CreateEdge {
        source: String,
        target: String,
        kind: RelationKind,
        #[serde(default)]
        description: String,
    },
    EditEdge {
        edge_id: u64,
        kind: RelationKind,
        #[serde(default)]
        description: String,
    },
    DeleteEdge { edge_id: u64 },
    ClearAutomatic,
    ClearAll,
    Resize { width: f64, height: f64 },
    Quit,
}

fn default_search_limit() -> usize {
    gare_graph::search::DEFAULT_LIMIT
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SessionInput {
    Event(InteractionEvent),
    Command(SessionCommand),
}

/// What the loop should do after a message.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub async fn run(config: EngineConfig, snapshot: Option<PathBuf>, fps: u32, write: bool) -> Result<()> {
    let (path, store) = open_snapshot(snapshot)?;
    let mut engine = GraphEngine::new(store, config)?;
    info!(path = %path.display(), nodes = engine.graph().node_count(), "Session started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut frames = tokio::time::interval(Duration::from_millis(1000 / u64::from(fps.max(1))));
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut dirty = true;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match handle_line(&mut engine, &line) {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => dirty = true,
                    Err(e) => {
                        warn!("Rejected session input: {:#}", e);
                        progress::emit(&progress::error_line(&format!("{:#}", e)));
                    }
                }
            }
            _ = frames.tick() => {
                let moving = engine.simulation().map_or(true, |s| !s.is_settled());
                if moving || dirty {
                    let frame = engine.tick()?;
                    progress::emit(&progress::frame_line(&frame)?);
                    dirty = false;
                }
            }
        }
    }

    if write {
        engine.store().save(&path)?;
        info!(path = %path.display(), "Snapshot saved");
    }
    Ok(())
}

/// Apply one stdin line to the engine.
pub fn handle_line(engine: &mut GraphEngine<MemoryStore>, line: &str) -> Result<Flow> {
    let input: SessionInput = serde_json::from_str(line)?;
    match input {
        SessionInput::Event(event) => engine.handle(event)?,
        SessionInput::Command(command) => return apply_command(engine, command),
    }
    Ok(Flow::Continue)
}

fn apply_command(engine: &mut GraphEngine<MemoryStore>, command: SessionCommand) -> Result<Flow> {
    match command {
        SessionCommand::InferAll => {
            let report = engine.infer_all()?;
            progress::emit(&progress::result_line("infer_all", &report)?);
        }
        SessionCommand::AutoLink { node_id } => {
            let report = engine.infer_for(parse_record(&node_id)?)?;
            progress::emit(&progress::result_line("auto_link", &report)?);
        }
        SessionCommand::Search { query, limit } => {
            let hits = engine.search(&query, limit)?;
            progress::emit(&progress::result_line("search", &hits)?);
        }
        SessionCommand::Locate { query } => {
            let located = engine.search_and_locate(&query)?;
            progress::emit(&progress::result_line("locate", &located)?);
        }
        SessionCommand::CreateEdge {
            source,
            target,
            kind,
            description,
        } => {
            let id = engine.create_edge(parse_record(&source)?, parse_record(&target)?, kind, description)?;
            progress::emit(&progress::result_line("create_edge", &id)?);
        }
        SessionCommand::EditEdge {
            edge_id,
            kind,
            description,
        } => engine.edit_edge(edge_id, kind, description)?,
        SessionCommand::DeleteEdge { edge_id } => {
            let deleted = engine.delete_edge(edge_id)?;
            progress::emit(&progress::result_line("delete_edge", &deleted)?);
        }
        SessionCommand::ClearAutomatic => {
            let removed = engine.clear_automatic()?;
            progress::emit(&progress::result_line("clear_automatic", &removed)?);
        }
        SessionCommand::ClearAll => {
            let removed = engine.clear_all()?;
            progress::emit(&progress::result_line("clear_all", &removed)?);
        }
        SessionCommand::Resize { width, height } => engine.set_canvas(width, height)?,
        SessionCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn parse_record(node_id: &str) -> Result<RecordRef> {
    RecordRef::parse_node_id(node_id)
        .ok_or_else(|| anyhow::anyhow!("Not a record id: {}", node_id))
}
