//! `gare search` command - find records by name, document, phone or address,
//! optionally locating the best hit.

use std::path::PathBuf;

use anyhow::Result;
use gare_graph::{EngineConfig, GraphEngine, InferenceReport, MemoryStore, SearchHit};
use serde::Serialize;

use super::open_snapshot;
use crate::ui;

#[derive(Debug, Default, Serialize)]
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    /// Set when `--locate` ran the single-record pass on the best hit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub located: Option<InferenceReport>,
}

pub fn run(
    config: EngineConfig,
    snapshot: Option<PathBuf>,
    query: &str,
    limit: usize,
    locate: bool,
    write: bool,
    json: bool,
) -> Result<()> {
    let (path, store) = open_snapshot(snapshot)?;
    let mut engine = GraphEngine::new(store, config)?;
    let outcome = find(&mut engine, query, limit, locate)?;

    let created = outcome.located.as_ref().map_or(0, |r| r.created);
    if write && created > 0 {
        engine.store().save(&path)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    if outcome.hits.is_empty() {
        ui::info(&format!("Nothing matches \"{}\".", query.trim()));
        return Ok(());
    }
    ui::header(&format!("{} matches", outcome.hits.len()));
    for hit in &outcome.hits {
        let fields: Vec<_> = hit.matched.iter().map(|f| f.as_str()).collect();
        ui::row(&hit.node_id, format!("{} ({})", hit.display_name, fields.join(", ")));
    }
    if let Some(report) = &outcome.located {
        println!();
        ui::success(&format!(
            "Located {}: {} new relationships.",
            outcome.hits[0].node_id, report.created
        ));
        if created > 0 && !write {
            ui::hint("Dry run. Pass --write to save the new edges.");
        }
    }
    Ok(())
}

pub fn find(
    engine: &mut GraphEngine<MemoryStore>,
    query: &str,
    limit: usize,
    locate: bool,
) -> Result<SearchOutcome> {
    let hits = engine.search(query, limit)?;
    let located = match hits.first() {
        Some(best) if locate => Some(engine.locate(best.record)?),
        _ => None,
    };
    Ok(SearchOutcome { hits, located })
}
