//! Gare Graph - relationship graph engine for persons and entities.
//!
//! Turns flat person/entity records into a relationship graph and lays it
//! out for display. It includes:
//!
//! - **Schema**: record, relation and edge types
//! - **Storage**: the `RecordStore` trait and an in-memory store
//! - **Matcher**: name, tax id, contact and surname heuristics
//! - **Inference**: full-population and single-record edge derivation
//! - **Visibility / Assembler**: which edges and nodes are drawn
//! - **Layout**: nine strategies plus a tickable force simulation
//! - **Search**: free-text lookup over names, documents and contacts
//! - **Engine**: event-driven facade for an interactive front end
//!
//! # Example
//!
//! ```ignore
//! use gare_graph::{EngineConfig, GraphEngine, InteractionEvent, MemoryStore};
//!
//! let store = MemoryStore::load(Path::new("records.json"))?;
//! let mut engine = GraphEngine::new(store, EngineConfig::default())?;
//! engine.infer_all()?;
//!
//! engine.handle(InteractionEvent::SetStrategy { name: "radial".into() })?;
//! let frame = engine.tick()?;
//! ```

pub mod assembler;
pub mod config;
pub mod engine;
pub mod error;
pub mod inference;
pub mod layout;
pub mod matcher;
pub mod schema;
pub mod search;
pub mod storage;
pub mod visibility;

// Re-export commonly used types
pub use assembler::{assemble, AssembledGraph, GraphEdge, GraphNode};
pub use config::EngineConfig;
pub use engine::{FrameEdge, FrameNode, GraphEngine, InteractionEvent, RenderFrame};
pub use error::{GraphError, Result};
pub use inference::{InferenceConfig, InferenceEngine, InferenceReport, InferenceRule};
pub use layout::{
    compute_layout, LayoutConfig, LayoutResult, LayoutStrategy, PriorPositions, Simulation,
};
pub use schema::{
    CompanyEntry, EntityRecord, NewEdge, PersonRecord, Point, Record, RecordKind, RecordRef,
    RelationKind, RelationshipEdge, RelativeEntry, Sex,
};
pub use search::{MatchField, SearchHit};
pub use storage::{MemoryStore, RecordStore, StoreSnapshot};
pub use visibility::VisibilitySet;
