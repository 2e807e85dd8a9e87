//! `gare infer` command - derive relationship edges from a snapshot.

use std::path::PathBuf;

use anyhow::{Context, Result};
use gare_graph::{EngineConfig, InferenceEngine, InferenceReport, RecordRef};

use super::open_snapshot;
use crate::ui;

pub fn run(
    config: EngineConfig,
    snapshot: Option<PathBuf>,
    record: Option<String>,
    write: bool,
    json: bool,
) -> Result<()> {
    let (path, mut store) = open_snapshot(snapshot)?;
    let engine = InferenceEngine::with_config(config.inference);

    let spinner = (!json).then(|| ui::spinner("Inferring relationships"));
    let report = match record {
        Some(node) => {
            let record = RecordRef::parse_node_id(&node).with_context(|| {
                format!("Not a record id: {} (expected person_12 or entity:3)", node)
            })?;
            engine.infer_for_record(&mut store, record)?
        }
        None => engine.infer_all(&mut store)?,
    };
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if write && report.created > 0 {
        store.save(&path)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_report(&report);
    if report.created > 0 {
        if write {
            ui::success(&format!("Saved to {}", path.display()));
        } else {
            ui::hint("Dry run. Pass --write to save the new edges.");
        }
    }
    Ok(())
}

fn print_report(report: &InferenceReport) {
    if report.created == 0 {
        ui::success("No new relationships found.");
    } else {
        ui::success(&format!("Found {} new relationships.", report.created));
    }
    println!();
    for (rule, count) in &report.by_rule {
        ui::row(rule.as_str(), count);
    }
    if report.duplicates > 0 {
        ui::row("already linked", report.duplicates);
    }
    if report.skipped_entries > 0 {
        ui::row("skipped entries", report.skipped_entries);
    }
    if report.failed_inserts > 0 {
        ui::error(&format!("{} edges could not be stored", report.failed_inserts));
    }
    ui::hint(&format!("took {}ms", report.duration_ms));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::write_family_snapshot;
    use gare_graph::{MemoryStore, RecordStore, RelationKind};

    #[test]
    fn test_write_persists_new_edges() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_family_snapshot(dir.path());

        run(EngineConfig::default(), Some(path.clone()), None, true, true).unwrap();
        let store = MemoryStore::load(&path).unwrap();
        let edges = store.get_all_edges().unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, RelationKind::Mother);
    }

    #[test]
    fn test_dry_run_leaves_snapshot_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_family_snapshot(dir.path());

        run(EngineConfig::default(), Some(path.clone()), Some("person_1".into()), false, true)
            .unwrap();
        assert_eq!(MemoryStore::load(&path).unwrap().edge_count(), 0);
    }

    #[test]
    fn test_bad_record_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_family_snapshot(dir.path());
        assert!(run(EngineConfig::default(), Some(path), Some("bruno".into()), false, true).is_err());
    }
}
