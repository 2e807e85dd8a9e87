//! `gare stats` command - record and edge counts for a snapshot.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use gare_graph::{MemoryStore, RecordStore};
use serde::Serialize;

use super::open_snapshot;
use crate::ui;

#[derive(Debug, Default, Serialize)]
pub struct SnapshotStats {
    pub persons: usize,
    pub entities: usize,
    pub edges: usize,
    pub automatic: usize,
    pub manual: usize,
    pub by_kind: BTreeMap<String, usize>,
}

pub fn run(snapshot: Option<PathBuf>, json: bool) -> Result<()> {
    let (path, store) = open_snapshot(snapshot)?;
    let stats = collect(&store)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    ui::header(&format!("Snapshot {}", path.display()));
    ui::row("persons", stats.persons);
    ui::row("entities", stats.entities);
    ui::row("edges", stats.edges);
    ui::row("  automatic", stats.automatic);
    ui::row("  manual", stats.manual);
    if !stats.by_kind.is_empty() {
        println!();
        for (kind, count) in &stats.by_kind {
            ui::row(kind, count);
        }
    } else if stats.persons + stats.entities > 1 {
        println!();
        ui::info("No relationships yet.");
        ui::hint("Run `gare infer --write` to derive them.");
    }
    Ok(())
}

pub fn collect(store: &MemoryStore) -> Result<SnapshotStats> {
    let mut stats = SnapshotStats {
        persons: store.persons()?.len(),
        entities: store.entities()?.len(),
        ..Default::default()
    };
    for edge in store.get_all_edges()? {
        stats.edges += 1;
        if edge.automatic {
            stats.automatic += 1;
        } else {
            stats.manual += 1;
        }
        *stats.by_kind.entry(edge.kind.as_str().to_string()).or_default() += 1;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::write_family_snapshot;
    use gare_graph::{InferenceEngine, NewEdge, RecordRef, RelationKind};

    #[test]
    fn test_counts_by_origin_and_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_family_snapshot(dir.path());
        let mut store = MemoryStore::load(&path).unwrap();

        let empty = collect(&store).unwrap();
        assert_eq!((empty.persons, empty.entities, empty.edges), (2, 0, 0));

        InferenceEngine::new().infer_all(&mut store).unwrap();
        store.add_person(gare_graph::PersonRecord::new(3, "Carla Souza"));
        store
            .insert_edge(NewEdge::manual(
                RecordRef::person(2),
                RecordRef::person(3),
                RelationKind::Spouse,
                "",
            ))
            .unwrap();

        let stats = collect(&store).unwrap();
        assert_eq!(stats.persons, 3);
        assert_eq!(stats.edges, 2);
        assert_eq!(stats.automatic, 1);
        assert_eq!(stats.manual, 1);
        assert_eq!(stats.by_kind.get("mae"), Some(&1));
        assert_eq!(stats.by_kind.get("conjuge"), Some(&1));
    }

    #[test]
    fn test_json_output_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_family_snapshot(dir.path());
        run(Some(path), true).unwrap();
    }
}
