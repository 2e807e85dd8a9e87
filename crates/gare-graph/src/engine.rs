//! Interactive graph engine.
//!
//! Owns a record store plus the view state (visibility, active strategy,
//! link distance, user pins and the live simulation). The presentation side
//! drives it with `InteractionEvent`s and pulls a `RenderFrame` per
//! animation frame via `tick()`.
//!
//! Re-assembling the graph or switching strategy discards the simulation;
//! the next `tick()` lays the graph out again, keeping user pins. Each
//! `tick()` advances the simulation by exactly one step.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::assembler::{assemble, AssembledGraph};
use crate::config::EngineConfig;
use crate::error::{GraphError, Result};
use crate::inference::{InferenceEngine, InferenceReport};
use crate::layout::{
    compute_layout, validate_link_distance, Canvas, LayoutStrategy, PriorPositions, Simulation,
};
use crate::schema::{NewEdge, Point, RecordKind, RecordRef, RelationKind};
use crate::search::{self, SearchHit};
use crate::storage::RecordStore;
use crate::visibility::VisibilitySet;

/// Events sent by the presentation side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionEvent {
    ToggleExpand { node_id: String },
    DragStart { node_id: String, x: f64, y: f64 },
    Drag { node_id: String, x: f64, y: f64 },
    DragEnd { node_id: String, x: f64, y: f64 },
    SetEdgeCurve { edge_id: u64, x: f64, y: f64 },
    ClearEdgeCurve { edge_id: u64 },
    SetStrategy { name: String },
    SetLinkDistance { value: f64 },
    ExpandAll,
    CollapseAll,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub kind: RecordKind,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEdge {
    pub id: u64,
    pub source_id: String,
    pub target_id: String,
    pub kind: RelationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<Point>,
}

/// Everything the presentation side needs to draw one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    pub nodes: Vec<FrameNode>,
    pub edges: Vec<FrameEdge>,
}

pub struct GraphEngine<S: RecordStore> {
    store: S,
    config: EngineConfig,
    inference: InferenceEngine,
    visibility: VisibilitySet,
    strategy: LayoutStrategy,
    canvas: Canvas,
    graph: AssembledGraph,
    simulation: Option<Simulation>,
    /// Pins set by dragging, kept across re-layouts
    pins: HashMap<String, Point>,
    last_positions: HashMap<String, Point>,
}

impl<S: RecordStore> GraphEngine<S> {
    /// Create an engine over `store` and assemble the initial graph.
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        let canvas = Canvas::new(config.canvas.width, config.canvas.height)?;
        config.layout.validate()?;
        let visibility = if config.engine.expand_all {
            VisibilitySet::default()
        } else {
            VisibilitySet::narrowed()
        };
        let mut engine = Self {
            store,
            inference: InferenceEngine::with_config(config.inference.clone()),
            strategy: config.strategy,
            config,
            visibility,
            canvas,
            graph: AssembledGraph::default(),
            simulation: None,
            pins: HashMap::new(),
            last_positions: HashMap::new(),
        };
        engine.reassemble()?;
        Ok(engine)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn graph(&self) -> &AssembledGraph {
        &self.graph
    }

    pub fn visibility(&self) -> &VisibilitySet {
        &self.visibility
    }

    pub fn strategy(&self) -> LayoutStrategy {
        self.strategy
    }

    pub fn link_distance(&self) -> f64 {
        self.config.layout.link_distance
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    /// Run the full-population pass and re-assemble.
    pub fn infer_all(&mut self) -> Result<InferenceReport> {
        let report = self.inference.infer_all(&mut self.store)?;
        if report.created > 0 {
            self.reassemble()?;
        }
        Ok(report)
    }

    /// Run the single-record pass ("auto-link") and re-assemble.
    pub fn infer_for(&mut self, record: RecordRef) -> Result<InferenceReport> {
        let report = self.inference.infer_for_record(&mut self.store, record)?;
        if report.created > 0 {
            self.reassemble()?;
        }
        Ok(report)
    }

    /// Records matching `query` by name, tax id, phone or address, best first.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let mut records = self.store.get_all(RecordKind::Person)?;
        records.extend(self.store.get_all(RecordKind::Entity)?);
        let hits = search::search(&records, query, limit);
        debug!(query, hits = hits.len(), "Search finished");
        Ok(hits)
    }

    /// Bring a record into view: run the single-record pass for it, expand
    /// it and re-assemble.
    #[instrument(skip(self))]
    pub fn locate(&mut self, record: RecordRef) -> Result<InferenceReport> {
        if self.store.get_by_id(record)?.is_none() {
            return Err(GraphError::UnknownNode(record.node_id()));
        }
        let report = self.inference.infer_for_record(&mut self.store, record)?;
        self.visibility.expand(&record.node_id());
        self.reassemble()?;
        info!(node_id = %record.node_id(), created = report.created, "Located record");
        Ok(report)
    }

    /// Search and locate the best hit, if any.
    pub fn search_and_locate(&mut self, query: &str) -> Result<Option<(SearchHit, InferenceReport)>> {
        let Some(hit) = self.search(query, 1)?.into_iter().next() else {
            return Ok(None);
        };
        let report = self.locate(hit.record)?;
        Ok(Some((hit, report)))
    }

    /// Apply one interaction event.
    #[instrument(skip(self))]
    pub fn handle(&mut self, event: InteractionEvent) -> Result<()> {
        match event {
            InteractionEvent::ToggleExpand { node_id } => {
                self.toggle_expand(&node_id)?;
            }
            InteractionEvent::DragStart { node_id, x, y } => {
                let at = Point::new(x, y);
                self.active_simulation()?.drag_start(&node_id, at)?;
                self.pins.insert(node_id, at);
            }
            InteractionEvent::Drag { node_id, x, y } => {
                let at = Point::new(x, y);
                self.active_simulation()?.drag(&node_id, at)?;
                self.pins.insert(node_id, at);
            }
            InteractionEvent::DragEnd { node_id, x, y } => {
                let at = Point::new(x, y);
                let sim = self.active_simulation()?;
                sim.pin(&node_id, at)?;
                sim.drag_end(&node_id)?;
                self.pins.insert(node_id, at);
            }
            InteractionEvent::SetEdgeCurve { edge_id, x, y } => {
                let at = Point::new(x, y);
                if !at.is_finite() {
                    return Err(GraphError::InvalidPoint(format!("edge {edge_id}")));
                }
                self.set_edge_curve(edge_id, Some(at))?;
            }
            InteractionEvent::ClearEdgeCurve { edge_id } => {
                self.set_edge_curve(edge_id, None)?;
            }
            InteractionEvent::SetStrategy { name } => {
                self.set_strategy(name.parse()?);
            }
            InteractionEvent::SetLinkDistance { value } => {
                self.set_link_distance(value)?;
            }
            InteractionEvent::ExpandAll => {
                self.visibility.expand_all();
                self.reassemble()?;
            }
            InteractionEvent::CollapseAll => {
                self.visibility.collapse_all();
                self.reassemble()?;
            }
        }
        Ok(())
    }

    /// Flip a node's expansion. Expanding runs the single-record pass when
    /// `infer_on_expand` is on. Returns the new state.
    pub fn toggle_expand(&mut self, node_id: &str) -> Result<bool> {
        let record = RecordRef::parse_node_id(node_id)
            .ok_or_else(|| GraphError::UnknownNode(node_id.to_string()))?;
        if self.graph.node(node_id).is_none() && self.store.get_by_id(record)?.is_none() {
            return Err(GraphError::UnknownNode(node_id.to_string()));
        }

        if self.visibility.is_expand_all() {
            // Leaving expand-all keeps everything on screen except this node
            for node in self.graph.nodes() {
                self.visibility.expand(&node.id);
            }
        }
        let expanded = self.visibility.toggle(node_id);
        if expanded && self.config.engine.infer_on_expand {
            let report = self.inference.infer_for_record(&mut self.store, record)?;
            debug!(node_id, created = report.created, "Inferred on expand");
        }
        self.reassemble()?;
        Ok(expanded)
    }

    pub fn set_strategy(&mut self, strategy: LayoutStrategy) {
        if strategy != self.strategy {
            info!(from = %self.strategy, to = %strategy, "Layout strategy changed");
        }
        self.strategy = strategy;
        self.simulation = None;
    }

    /// Change the global link distance (50..=300) and reheat the layout.
    pub fn set_link_distance(&mut self, value: f64) -> Result<()> {
        validate_link_distance(value)?;
        self.config.layout.link_distance = value;
        if let Some(sim) = self.simulation.as_mut() {
            sim.set_link_scale(self.config.layout.link_scale());
        }
        Ok(())
    }

    pub fn set_canvas(&mut self, width: f64, height: f64) -> Result<()> {
        self.canvas = Canvas::new(width, height)?;
        self.simulation = None;
        Ok(())
    }

    /// Advance the layout one step and return the frame to draw.
    pub fn tick(&mut self) -> Result<RenderFrame> {
        self.active_simulation()?.tick();
        Ok(self.render_frame())
    }

    /// Tick until the layout comes to rest and return the final frame.
    pub fn settle(&mut self) -> Result<RenderFrame> {
        let max_ticks = self.config.layout.force.max_ticks;
        let ticks = self.active_simulation()?.run_until_settled(max_ticks);
        debug!(ticks, "Layout settled");
        Ok(self.render_frame())
    }

    /// Current frame without advancing the simulation.
    pub fn render_frame(&mut self) -> RenderFrame {
        if let Some(sim) = &self.simulation {
            self.last_positions = sim.positions().into_iter().collect();
        }
        let nodes = self
            .graph
            .nodes()
            .iter()
            .map(|node| {
                let at = self
                    .last_positions
                    .get(&node.id)
                    .copied()
                    .unwrap_or_else(|| self.canvas.center());
                FrameNode {
                    id: node.id.clone(),
                    x: at.x,
                    y: at.y,
                    kind: node.kind(),
                    display_name: node.display_name.clone(),
                }
            })
            .collect();
        let edges = self
            .graph
            .edges()
            .iter()
            .map(|edge| FrameEdge {
                id: edge.id,
                source_id: edge.source.clone(),
                target_id: edge.target.clone(),
                kind: edge.kind,
                curve: edge.curve,
            })
            .collect();
        RenderFrame { nodes, edges }
    }

    /// Create an edge by hand. Returns `None` if the pair is already linked.
    pub fn create_edge(
        &mut self,
        source: RecordRef,
        target: RecordRef,
        kind: RelationKind,
        description: impl Into<String>,
    ) -> Result<Option<u64>> {
        for record in [source, target] {
            if self.store.get_by_id(record)?.is_none() {
                return Err(GraphError::UnknownNode(record.node_id()));
            }
        }
        if source == target {
            return Ok(None);
        }
        let exists = self
            .store
            .get_all_edges()?
            .iter()
            .any(|e| e.touches(source) && e.touches(target));
        if exists {
            debug!(%source, %target, "Edge already exists, not creating");
            return Ok(None);
        }
        let id = self
            .store
            .insert_edge(NewEdge::manual(source, target, kind, description))?;
        self.reassemble()?;
        Ok(Some(id))
    }

    /// Change an edge's kind and description.
    pub fn edit_edge(&mut self, id: u64, kind: RelationKind, description: impl Into<String>) -> Result<()> {
        let mut edge = self.store.get_edge(id)?.ok_or(GraphError::UnknownEdge(id))?;
        edge.kind = kind;
        edge.description = description.into();
        self.store.update_edge(&edge)?;
        self.reassemble()
    }

    pub fn delete_edge(&mut self, id: u64) -> Result<bool> {
        let deleted = self.store.delete_edge(id)?;
        if deleted {
            self.reassemble()?;
        }
        Ok(deleted)
    }

    /// Delete every inferred edge. Returns how many were removed.
    pub fn clear_automatic(&mut self) -> Result<usize> {
        self.clear_where(|automatic| automatic)
    }

    /// Delete every edge. Returns how many were removed.
    pub fn clear_all(&mut self) -> Result<usize> {
        self.clear_where(|_| true)
    }

    fn clear_where(&mut self, remove: impl Fn(bool) -> bool) -> Result<usize> {
        let ids: Vec<u64> = self
            .store
            .get_all_edges()?
            .into_iter()
            .filter(|e| remove(e.automatic))
            .map(|e| e.id)
            .collect();
        let mut removed = 0;
        for id in ids {
            if self.store.delete_edge(id)? {
                removed += 1;
            }
        }
        info!(removed, "Cleared edges");
        self.reassemble()?;
        Ok(removed)
    }

    fn set_edge_curve(&mut self, id: u64, curve: Option<Point>) -> Result<()> {
        let mut edge = self.store.get_edge(id)?.ok_or(GraphError::UnknownEdge(id))?;
        edge.manual_curve = curve;
        self.store.update_edge(&edge)?;
        self.graph.set_curve(id, curve);
        Ok(())
    }

    /// Rebuild the visible graph from the store and drop the simulation.
    fn reassemble(&mut self) -> Result<()> {
        let edges = self.store.get_all_edges()?;
        self.graph = assemble(&self.store, &edges, &self.visibility)?;
        self.simulation = None;
        Ok(())
    }

    /// The live simulation, laying the graph out first if there is none.
    fn active_simulation(&mut self) -> Result<&mut Simulation> {
        let simulation = match self.simulation.take() {
            Some(simulation) => simulation,
            None => {
                let prior = PriorPositions {
                    positions: self.last_positions.clone(),
                    pinned: self.pins.clone(),
                };
                let result = compute_layout(
                    &self.graph,
                    self.canvas.width,
                    self.canvas.height,
                    self.strategy,
                    &self.config.layout,
                    Some(&prior),
                )?;
                self.last_positions = result.positions.into_iter().collect();
                result.simulation
            }
        };
        Ok(self.simulation.insert(simulation))
    }
}
