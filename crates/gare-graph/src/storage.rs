//! Record store for persons, entities and relationship edges.
//!
//! The engine consumes any `RecordStore`. `MemoryStore` keeps everything in
//! ordered maps plus a pair index, and round-trips through a JSON snapshot
//! for the CLI.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schema::{
    EntityRecord, NewEdge, PairKey, PersonRecord, Record, RecordKind, RecordRef, RelationshipEdge,
};

/// Storage backend the engine reads records from and appends edges to.
pub trait RecordStore {
    /// All records of one kind, ordered by id.
    fn get_all(&self, kind: RecordKind) -> Result<Vec<Record>>;

    fn get_by_id(&self, record: RecordRef) -> Result<Option<Record>>;

    /// Append an edge and return its assigned id.
    fn insert_edge(&mut self, edge: NewEdge) -> Result<u64>;

    /// Replace a stored edge's mutable fields (kind, description, curve).
    fn update_edge(&mut self, edge: &RelationshipEdge) -> Result<()>;

    /// Returns false if no edge had that id.
    fn delete_edge(&mut self, id: u64) -> Result<bool>;

    fn get_all_edges(&self) -> Result<Vec<RelationshipEdge>>;

    fn get_edge(&self, id: u64) -> Result<Option<RelationshipEdge>> {
        Ok(self.get_all_edges()?.into_iter().find(|e| e.id == id))
    }

    fn persons(&self) -> Result<Vec<PersonRecord>> {
        Ok(self
            .get_all(RecordKind::Person)?
            .into_iter()
            .filter_map(|r| match r {
                Record::Person(p) => Some(p),
                Record::Entity(_) => None,
            })
            .collect())
    }

    fn entities(&self) -> Result<Vec<EntityRecord>> {
        Ok(self
            .get_all(RecordKind::Entity)?
            .into_iter()
            .filter_map(|r| match r {
                Record::Entity(e) => Some(e),
                Record::Person(_) => None,
            })
            .collect())
    }
}

/// On-disk form of a `MemoryStore`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub persons: Vec<PersonRecord>,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
    #[serde(default)]
    pub edges: Vec<RelationshipEdge>,
}

/// In-memory record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    persons: BTreeMap<u64, PersonRecord>,
    entities: BTreeMap<u64, EntityRecord>,
    edges: BTreeMap<u64, RelationshipEdge>,
    pair_index: HashMap<PairKey, u64>,
    next_edge_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_edge_id: 1,
            ..Default::default()
        }
    }

    pub fn add_person(&mut self, person: PersonRecord) {
        self.persons.insert(person.id, person);
    }

    pub fn add_entity(&mut self, entity: EntityRecord) {
        self.entities.insert(entity.id, entity);
    }

    /// Build a store from a snapshot. Duplicate pairs in the snapshot are rejected.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        let mut store = Self::new();
        for person in snapshot.persons {
            store.add_person(person);
        }
        for entity in snapshot.entities {
            store.add_entity(entity);
        }
        for edge in snapshot.edges {
            let key = edge.pair_key();
            if let Some(existing) = store.pair_index.get(&key) {
                bail!(
                    "edge {} duplicates edge {} between {} and {}",
                    edge.id,
                    existing,
                    edge.source,
                    edge.target
                );
            }
            if store.edges.contains_key(&edge.id) {
                bail!("duplicate edge id {}", edge.id);
            }
            store.next_edge_id = store.next_edge_id.max(edge.id + 1);
            store.pair_index.insert(key, edge.id);
            store.edges.insert(edge.id, edge);
        }
        Ok(store)
    }

    pub fn to_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            persons: self.persons.values().cloned().collect(),
            entities: self.entities.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }

    /// Load a JSON snapshot from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let snapshot: StoreSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
        Self::from_snapshot(snapshot)
            .with_context(|| format!("Invalid snapshot {}", path.display()))
    }

    /// Write the store back as a JSON snapshot.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.to_snapshot())?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        Ok(())
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_between(&self, a: RecordRef, b: RecordRef) -> Option<&RelationshipEdge> {
        self.pair_index
            .get(&PairKey::new(a, b))
            .and_then(|id| self.edges.get(id))
    }
}

impl RecordStore for MemoryStore {
    fn get_all(&self, kind: RecordKind) -> Result<Vec<Record>> {
        Ok(match kind {
            RecordKind::Person => self.persons.values().cloned().map(Record::Person).collect(),
            RecordKind::Entity => self.entities.values().cloned().map(Record::Entity).collect(),
        })
    }

    fn get_by_id(&self, record: RecordRef) -> Result<Option<Record>> {
        Ok(match record.kind {
            RecordKind::Person => self.persons.get(&record.id).cloned().map(Record::Person),
            RecordKind::Entity => self.entities.get(&record.id).cloned().map(Record::Entity),
        })
    }

    fn insert_edge(&mut self, edge: NewEdge) -> Result<u64> {
        if edge.source == edge.target {
            bail!("self-edge on {}", edge.source);
        }
        let key = edge.pair_key();
        if let Some(existing) = self.pair_index.get(&key) {
            bail!(
                "edge between {} and {} already stored as {}",
                edge.source,
                edge.target,
                existing
            );
        }
        let id = self.next_edge_id.max(1);
        self.next_edge_id = id + 1;
        debug!(id, source = %edge.source, target = %edge.target, kind = %edge.kind, "Inserted edge");
        self.pair_index.insert(key, id);
        self.edges.insert(id, edge.into_edge(id, Utc::now()));
        Ok(id)
    }

    fn update_edge(&mut self, edge: &RelationshipEdge) -> Result<()> {
        let stored = self
            .edges
            .get_mut(&edge.id)
            .with_context(|| format!("No edge with id {}", edge.id))?;
        if stored.pair_key() != edge.pair_key() {
            bail!("edge {} endpoints cannot change", edge.id);
        }
        stored.kind = edge.kind;
        stored.description = edge.description.clone();
        stored.manual_curve = edge.manual_curve;
        Ok(())
    }

    fn delete_edge(&mut self, id: u64) -> Result<bool> {
        match self.edges.remove(&id) {
            Some(edge) => {
                self.pair_index.remove(&edge.pair_key());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn get_all_edges(&self) -> Result<Vec<RelationshipEdge>> {
        Ok(self.edges.values().cloned().collect())
    }

    fn get_edge(&self, id: u64) -> Result<Option<RelationshipEdge>> {
        Ok(self.edges.get(&id).cloned())
    }
}
