//! Layout engine.
//!
//! `compute_layout` assigns a starting position to every node of an
//! assembled graph and hands back a live `Simulation`. Nothing is ticked
//! here: the caller advances it one `tick()` per frame. Strategies:
//!
//! - **Force**: full physical simulation seeded from prior positions
//! - **Hierarchical**: layered tree over mae/pai edges, falls back to Force
//! - **Circular**, **Radial**, **Grid**, **Clustered**, **Timeline**,
//!   **Spiral**: closed-form placements with a link-only simulation
//! - **Free**: jittered grid, pinned, with a low-alpha fast-decaying simulation

pub mod geometric;
pub mod hierarchical;
pub mod simulation;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::assembler::AssembledGraph;
use crate::error::{GraphError, Result};
use crate::schema::{Point, RelationKind};

pub use simulation::{ForceConfig, SimLink, SimNode, Simulation, SimulationMode};

/// Rest length every per-kind distance is relative to.
pub const DEFAULT_LINK_DISTANCE: f64 = 150.0;
pub const MIN_LINK_DISTANCE: f64 = 50.0;
pub const MAX_LINK_DISTANCE: f64 = 300.0;

/// Available layout strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutStrategy {
    #[default]
    Force,
    Hierarchical,
    Circular,
    Radial,
    Grid,
    #[serde(alias = "cluster")]
    Clustered,
    Timeline,
    Spiral,
    Free,
}

impl LayoutStrategy {
    pub const ALL: [LayoutStrategy; 9] = [
        LayoutStrategy::Force,
        LayoutStrategy::Hierarchical,
        LayoutStrategy::Circular,
        LayoutStrategy::Radial,
        LayoutStrategy::Grid,
        LayoutStrategy::Clustered,
        LayoutStrategy::Timeline,
        LayoutStrategy::Spiral,
        LayoutStrategy::Free,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutStrategy::Force => "force",
            LayoutStrategy::Hierarchical => "hierarchical",
            LayoutStrategy::Circular => "circular",
            LayoutStrategy::Radial => "radial",
            LayoutStrategy::Grid => "grid",
            LayoutStrategy::Clustered => "clustered",
            LayoutStrategy::Timeline => "timeline",
            LayoutStrategy::Spiral => "spiral",
            LayoutStrategy::Free => "free",
        }
    }
}

impl FromStr for LayoutStrategy {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "force" => Ok(LayoutStrategy::Force),
            "hierarchical" => Ok(LayoutStrategy::Hierarchical),
            "circular" => Ok(LayoutStrategy::Circular),
            "radial" => Ok(LayoutStrategy::Radial),
            "grid" => Ok(LayoutStrategy::Grid),
            "clustered" | "cluster" => Ok(LayoutStrategy::Clustered),
            "timeline" => Ok(LayoutStrategy::Timeline),
            "spiral" => Ok(LayoutStrategy::Spiral),
            "free" => Ok(LayoutStrategy::Free),
            _ => Err(GraphError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for LayoutStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rest length for a relation kind at the default link distance.
pub fn kind_distance(kind: RelationKind) -> f64 {
    match kind {
        RelationKind::Mother | RelationKind::Father | RelationKind::Child => 120.0,
        RelationKind::Sibling => 100.0,
        RelationKind::Spouse => 110.0,
        RelationKind::BusinessPartner | RelationKind::CoOwnedEntity => 150.0,
        RelationKind::SurnameMatch => 180.0,
        RelationKind::SharedAddress => 200.0,
        RelationKind::SharedPhone => 220.0,
        RelationKind::Other => DEFAULT_LINK_DISTANCE,
    }
}

/// Validated drawing area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Result<Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(GraphError::InvalidCanvas { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }
}

/// Layout tuning passed into every `compute_layout` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Global link distance, 50..=300 (default: 150)
    pub link_distance: f64,
    /// Circle radius inside each cluster (default: 80)
    pub cluster_radius: f64,
    /// Maximum jitter of the free layout (default: 25)
    pub free_jitter: f64,
    /// Seed for the free layout; random when unset
    pub seed: Option<u64>,
    pub force: ForceConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            link_distance: DEFAULT_LINK_DISTANCE,
            cluster_radius: 80.0,
            free_jitter: 25.0,
            seed: None,
            force: ForceConfig::default(),
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        validate_link_distance(self.link_distance)
    }

    /// Factor applied to every per-kind rest length.
    pub fn link_scale(&self) -> f64 {
        self.link_distance / DEFAULT_LINK_DISTANCE
    }
}

pub fn validate_link_distance(distance: f64) -> Result<()> {
    if !(MIN_LINK_DISTANCE..=MAX_LINK_DISTANCE).contains(&distance) {
        return Err(GraphError::InvalidLinkDistance(distance));
    }
    Ok(())
}

/// Positions from an earlier layout of the same graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorPositions {
    /// Last known positions, used to seed the force simulation
    #[serde(default)]
    pub positions: HashMap<String, Point>,
    /// User pins, re-applied after every strategy
    #[serde(default)]
    pub pinned: HashMap<String, Point>,
}

/// Output of `compute_layout`.
#[derive(Debug, Clone)]
pub struct LayoutResult {
    /// Strategy that actually produced the positions
    pub strategy: LayoutStrategy,
    /// Set when the requested strategy fell back to Force
    pub fallback_from: Option<LayoutStrategy>,
    /// Starting positions; the simulation moves on from here
    pub positions: BTreeMap<String, Point>,
    pub simulation: Simulation,
}

/// Compute positions for every node of `graph`.
///
/// Rejects a non-finite or non-positive canvas and a link distance outside
/// 50..=300. A hierarchical layout over a cyclic parent graph falls back to
/// Force and says so in `fallback_from`.
pub fn compute_layout(
    graph: &AssembledGraph,
    width: f64,
    height: f64,
    strategy: LayoutStrategy,
    config: &LayoutConfig,
    prior: Option<&PriorPositions>,
) -> Result<LayoutResult> {
    let canvas = Canvas::new(width, height)?;
    config.validate()?;
    let n = graph.node_count();

    let (strategy_used, fallback_from, placed) = match strategy {
        LayoutStrategy::Force => (LayoutStrategy::Force, None, None),
        LayoutStrategy::Hierarchical => match hierarchical::hierarchical(graph, canvas) {
            Ok(points) => (LayoutStrategy::Hierarchical, None, Some(points)),
            Err(hierarchical::TreeError::Cycle(node)) => {
                let id = graph.nodes().get(node).map(|n| n.id.as_str()).unwrap_or("?");
                warn!(node = id, "Parent edges form a cycle, falling back to force layout");
                (LayoutStrategy::Force, Some(LayoutStrategy::Hierarchical), None)
            }
        },
        LayoutStrategy::Circular => (strategy, None, Some(geometric::circular(n, canvas))),
        LayoutStrategy::Radial => (strategy, None, Some(geometric::radial(graph, canvas))),
        LayoutStrategy::Grid => (strategy, None, Some(geometric::grid(n, canvas))),
        LayoutStrategy::Clustered => (
            strategy,
            None,
            Some(geometric::clustered(graph, canvas, config.cluster_radius)),
        ),
        LayoutStrategy::Timeline => (
            strategy,
            None,
            Some(geometric::timeline(graph, canvas, chrono::Utc::now().year())),
        ),
        LayoutStrategy::Spiral => (strategy, None, Some(geometric::spiral(n, canvas))),
        LayoutStrategy::Free => (
            strategy,
            None,
            Some(geometric::free_grid(n, canvas, config.free_jitter, config.seed)),
        ),
    };

    let links = build_links(graph, config.link_scale());
    let center = canvas.center();
    let simulation = match (strategy_used, placed) {
        (LayoutStrategy::Force, _) | (_, None) => {
            force_simulation(graph, links, center, config, prior)?
        }
        (LayoutStrategy::Free, Some(points)) => {
            let mut sim = pinned_simulation(graph, &points, links, center, SimulationMode::Full, config, prior)?;
            sim.set_alpha(0.1);
            sim.set_alpha_decay(0.1);
            sim
        }
        (_, Some(points)) => {
            pinned_simulation(graph, &points, links, center, SimulationMode::LinkOnly, config, prior)?
        }
    };

    let positions = simulation.positions();
    info!(
        strategy = strategy_used.as_str(),
        nodes = n,
        alpha = simulation.alpha(),
        "Layout computed"
    );
    Ok(LayoutResult {
        strategy: strategy_used,
        fallback_from,
        positions,
        simulation,
    })
}

fn build_links(graph: &AssembledGraph, scale: f64) -> Vec<SimLink> {
    graph
        .links()
        .into_iter()
        .filter(|(s, t, _)| s != t)
        .map(|(s, t, kind)| SimLink::new(s, t, kind_distance(kind)).with_scale(scale))
        .collect()
}

fn force_simulation(
    graph: &AssembledGraph,
    links: Vec<SimLink>,
    center: Point,
    config: &LayoutConfig,
    prior: Option<&PriorPositions>,
) -> Result<Simulation> {
    let nodes = graph
        .nodes()
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let start = prior
                .and_then(|p| p.positions.get(&node.id))
                .filter(|p| p.is_finite())
                .copied()
                .unwrap_or_else(|| Simulation::phyllotaxis(i, center));
            SimNode::new(node.id.clone(), start)
        })
        .collect();
    let mut sim = Simulation::new(nodes, links, center, SimulationMode::Full, config.force.clone());
    apply_pins(&mut sim, prior)?;
    debug!(nodes = sim.nodes().len(), links = sim.links().len(), "Force simulation seeded");
    Ok(sim)
}

fn pinned_simulation(
    graph: &AssembledGraph,
    points: &[Point],
    links: Vec<SimLink>,
    center: Point,
    mode: SimulationMode,
    config: &LayoutConfig,
    prior: Option<&PriorPositions>,
) -> Result<Simulation> {
    let nodes = graph
        .nodes()
        .iter()
        .zip(points)
        .map(|(node, &at)| {
            let mut sim_node = SimNode::new(node.id.clone(), at);
            sim_node.fx = Some(at.x);
            sim_node.fy = Some(at.y);
            sim_node
        })
        .collect();
    let mut sim = Simulation::new(nodes, links, center, mode, config.force.clone());
    apply_pins(&mut sim, prior)?;
    Ok(sim)
}

/// Re-apply user pins. Pins for nodes no longer in the graph are skipped.
fn apply_pins(sim: &mut Simulation, prior: Option<&PriorPositions>) -> Result<()> {
    let Some(prior) = prior else {
        return Ok(());
    };
    for (id, &at) in &prior.pinned {
        if sim.node(id).is_some() {
            sim.pin(id, at)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{GraphEdge, GraphNode};
    use crate::schema::RecordRef;

    fn graph(n: u64, edges: &[(u64, u64, RelationKind)]) -> AssembledGraph {
        let nodes = (1..=n)
            .map(|i| {
                let record = RecordRef::person(i);
                GraphNode {
                    id: record.node_id(),
                    record,
                    display_name: format!("P{i}"),
                    date: None,
                }
            })
            .collect();
        let edges = edges
            .iter()
            .enumerate()
            .map(|(k, &(a, b, kind))| GraphEdge {
                id: k as u64 + 1,
                source: RecordRef::person(a).node_id(),
                target: RecordRef::person(b).node_id(),
                kind,
                description: String::new(),
                automatic: true,
                curve: None,
            })
            .collect();
        AssembledGraph::from_parts(nodes, edges)
    }

    #[test]
    fn test_strategy_names() {
        for strategy in LayoutStrategy::ALL {
            assert_eq!(strategy.as_str().parse::<LayoutStrategy>().unwrap(), strategy);
        }
        assert_eq!("cluster".parse::<LayoutStrategy>().unwrap(), LayoutStrategy::Clustered);
        assert!(matches!(
            "sunburst".parse::<LayoutStrategy>(),
            Err(GraphError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_invalid_canvas_rejected() {
        let g = graph(2, &[(1, 2, RelationKind::Sibling)]);
        let config = LayoutConfig::default();
        for (w, h) in [(0.0, 100.0), (100.0, -1.0), (f64::NAN, 100.0), (f64::INFINITY, 10.0)] {
            assert!(matches!(
                compute_layout(&g, w, h, LayoutStrategy::Grid, &config, None),
                Err(GraphError::InvalidCanvas { .. })
            ));
        }
    }

    #[test]
    fn test_link_distance_range() {
        let g = graph(2, &[(1, 2, RelationKind::Sibling)]);
        let config = LayoutConfig {
            link_distance: 400.0,
            ..Default::default()
        };
        assert!(matches!(
            compute_layout(&g, 400.0, 400.0, LayoutStrategy::Force, &config, None),
            Err(GraphError::InvalidLinkDistance(_))
        ));
    }

    #[test]
    fn test_grid_scenario() {
        let g = graph(4, &[]);
        let result =
            compute_layout(&g, 400.0, 400.0, LayoutStrategy::Grid, &LayoutConfig::default(), None)
                .unwrap();
        assert_eq!(result.positions["person_1"], Point::new(100.0, 100.0));
        assert_eq!(result.positions["person_2"], Point::new(300.0, 100.0));
        assert_eq!(result.positions["person_3"], Point::new(100.0, 300.0));
        assert_eq!(result.positions["person_4"], Point::new(300.0, 300.0));
        assert_eq!(result.simulation.mode(), SimulationMode::LinkOnly);
    }

    #[test]
    fn test_geometric_strategies_are_deterministic() {
        let edges: Vec<_> = (2..=12).map(|i| (1, i, RelationKind::Sibling)).collect();
        let g = graph(12, &edges);
        let config = LayoutConfig::default();
        for strategy in LayoutStrategy::ALL {
            if strategy == LayoutStrategy::Free {
                continue;
            }
            let a = compute_layout(&g, 800.0, 600.0, strategy, &config, None).unwrap();
            let b = compute_layout(&g, 800.0, 600.0, strategy, &config, None).unwrap();
            assert_eq!(a.positions, b.positions, "{strategy} is not deterministic");
        }
    }

    #[test]
    fn test_hierarchical_cycle_falls_back_to_force() {
        let g = graph(
            2,
            &[(1, 2, RelationKind::Mother)],
        );
        let ok = compute_layout(&g, 400.0, 400.0, LayoutStrategy::Hierarchical, &LayoutConfig::default(), None)
            .unwrap();
        assert_eq!(ok.strategy, LayoutStrategy::Hierarchical);

        let nodes = g.nodes().to_vec();
        let mut edges = g.edges().to_vec();
        edges.push(GraphEdge {
            id: 99,
            source: "person_2".into(),
            target: "person_1".into(),
            kind: RelationKind::Father,
            description: String::new(),
            automatic: false,
            curve: None,
        });
        let cyclic = AssembledGraph::from_parts(nodes, edges);
        let result = compute_layout(
            &cyclic,
            400.0,
            400.0,
            LayoutStrategy::Hierarchical,
            &LayoutConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(result.strategy, LayoutStrategy::Force);
        assert_eq!(result.fallback_from, Some(LayoutStrategy::Hierarchical));
        assert_eq!(result.positions.len(), 2);
    }

    #[test]
    fn test_force_collision_bound_on_larger_graph() {
        let edges: Vec<_> = (2..=120)
            .map(|i| (i / 2, i, RelationKind::Child))
            .collect();
        let g = graph(120, &edges);
        let config = LayoutConfig::default();
        let mut result =
            compute_layout(&g, 1200.0, 900.0, LayoutStrategy::Force, &config, None).unwrap();
        assert!(!result.simulation.is_settled());
        assert_eq!(result.simulation.ticks(), 0);

        result.simulation.run_until_settled(config.force.max_ticks);
        let min = result.simulation.min_separation().unwrap();
        assert!(min >= 50.0, "min separation {min}");
        assert!(result.simulation.is_settled());
    }

    #[test]
    fn test_force_layout_is_live() {
        let g = graph(3, &[(1, 2, RelationKind::Sibling), (2, 3, RelationKind::Sibling)]);
        let mut result =
            compute_layout(&g, 500.0, 500.0, LayoutStrategy::Force, &LayoutConfig::default(), None)
                .unwrap();
        assert_eq!(result.simulation.alpha(), 1.0);
        assert_eq!(result.positions, result.simulation.positions());

        assert!(result.simulation.tick());
        assert_eq!(result.simulation.ticks(), 1);
        assert!(!result.simulation.is_settled());
        assert_ne!(result.positions, result.simulation.positions());
    }

    #[test]
    fn test_non_finite_prior_pin_is_rejected() {
        let g = graph(2, &[(1, 2, RelationKind::Sibling)]);
        let mut prior = PriorPositions::default();
        prior.pinned.insert("person_1".into(), Point::new(f64::NAN, 0.0));
        assert!(compute_layout(&g, 500.0, 500.0, LayoutStrategy::Force, &LayoutConfig::default(), Some(&prior))
            .is_err());

        // A pin for a node outside the graph is ignored
        let mut prior = PriorPositions::default();
        prior.pinned.insert("person_9".into(), Point::new(1.0, 1.0));
        assert!(compute_layout(&g, 500.0, 500.0, LayoutStrategy::Grid, &LayoutConfig::default(), Some(&prior))
            .is_ok());
    }

    #[test]
    fn test_prior_pins_survive_strategy() {
        let g = graph(3, &[(1, 2, RelationKind::Sibling), (2, 3, RelationKind::Sibling)]);
        let mut prior = PriorPositions::default();
        prior.pinned.insert("person_2".into(), Point::new(12.0, 34.0));
        for strategy in [LayoutStrategy::Force, LayoutStrategy::Circular] {
            let result =
                compute_layout(&g, 500.0, 500.0, strategy, &LayoutConfig::default(), Some(&prior))
                    .unwrap();
            assert_eq!(result.positions["person_2"], Point::new(12.0, 34.0));
        }
    }

    #[test]
    fn test_free_layout_stays_near_grid() {
        let g = graph(9, &[(1, 2, RelationKind::Sibling)]);
        let config = LayoutConfig {
            seed: Some(42),
            ..Default::default()
        };
        let mut result = compute_layout(&g, 300.0, 300.0, LayoutStrategy::Free, &config, None).unwrap();
        assert_eq!(result.simulation.alpha(), 0.1);
        result.simulation.run_until_settled(config.force.max_ticks);
        let cells = geometric::grid(9, Canvas::new(300.0, 300.0).unwrap());
        for (i, cell) in cells.iter().enumerate() {
            let p = result.simulation.node(&format!("person_{}", i + 1)).unwrap().position();
            assert!((p.x - cell.x).abs() <= 25.0 && (p.y - cell.y).abs() <= 25.0);
        }
    }

    #[test]
    fn test_link_distances_follow_kind_and_scale() {
        let g = graph(2, &[(1, 2, RelationKind::SharedPhone)]);
        let config = LayoutConfig {
            link_distance: 300.0,
            ..Default::default()
        };
        let result = compute_layout(&g, 400.0, 400.0, LayoutStrategy::Grid, &config, None).unwrap();
        assert_eq!(result.simulation.links()[0].distance(), 440.0);
    }
}
