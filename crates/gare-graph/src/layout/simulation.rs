//! Force simulation behind the force and free layouts.
//!
//! One `tick()` performs one integration step, so the caller can drive it
//! from its own frame loop. Energy is tracked as `alpha`, which decays
//! towards `alpha_target` each tick; the simulation is idle once both are
//! below `alpha_min`.
//!
//! Forces applied in `Full` mode, in order:
//! - link springs with a per-link rest length
//! - many-body repulsion between every pair of nodes
//! - x/y pull towards the canvas center
//! - collision between node discs
//! - re-centering of the mean position
//!
//! `LinkOnly` mode applies only the link springs. Geometric layouts use it
//! with every node pinned so that dragging still animates edges.
//!
//! On the tick that brings a `Full` simulation to rest, a hard overlap pass
//! pushes apart any node centers still closer than the collision radius.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GraphError, Result};
use crate::schema::Point;

/// Tuning for the simulation. Defaults follow the interactive tree view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    /// Many-body strength, negative repels (default: -300)
    pub charge: f64,
    /// Radius of each node's collision disc (default: 50)
    pub collision_radius: f64,
    pub collision_strength: f64,
    /// Pull towards the canvas center on each axis (default: 0.05)
    pub position_strength: f64,
    pub alpha_min: f64,
    /// Per-tick decay; the default settles in about 300 ticks
    pub alpha_decay: f64,
    /// Fraction of velocity lost per tick (default: 0.4)
    pub velocity_decay: f64,
    /// Energy target while a node is dragged (default: 0.3)
    pub drag_alpha_target: f64,
    /// Upper bound for `run_until_settled`
    pub max_ticks: usize,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            charge: -300.0,
            collision_radius: 50.0,
            collision_strength: 1.0,
            position_strength: 0.05,
            alpha_min: 0.001,
            alpha_decay: 1.0 - 0.001_f64.powf(1.0 / 300.0),
            velocity_decay: 0.4,
            drag_alpha_target: 0.3,
            max_ticks: 600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationMode {
    /// All forces
    Full,
    /// Link springs only
    LinkOnly,
}

/// A node in the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    vx: f64,
    vy: f64,
    /// Pinned position, if any
    pub fx: Option<f64>,
    pub fy: Option<f64>,
}

impl SimNode {
    pub fn new(id: impl Into<String>, position: Point) -> Self {
        Self {
            id: id.into(),
            x: position.x,
            y: position.y,
            vx: 0.0,
            vy: 0.0,
            fx: None,
            fy: None,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_pinned(&self) -> bool {
        self.fx.is_some() && self.fy.is_some()
    }

    fn pin(&mut self, at: Point) {
        self.fx = Some(at.x);
        self.fy = Some(at.y);
        self.x = at.x;
        self.y = at.y;
        self.vx = 0.0;
        self.vy = 0.0;
    }
}

/// A spring between two node indices.
#[derive(Debug, Clone, PartialEq)]
pub struct SimLink {
    pub source: usize,
    pub target: usize,
    /// Rest length before scaling
    pub base_distance: f64,
    distance: f64,
    strength: f64,
    bias: f64,
}

impl SimLink {
    pub fn new(source: usize, target: usize, base_distance: f64) -> Self {
        Self {
            source,
            target,
            base_distance,
            distance: base_distance,
            strength: 1.0,
            bias: 0.5,
        }
    }

    /// Builder: scale the rest length.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.distance = self.base_distance * scale;
        self
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }
}

/// Re-entrant force simulation.
#[derive(Debug, Clone)]
pub struct Simulation {
    nodes: Vec<SimNode>,
    node_index: HashMap<String, usize>,
    links: Vec<SimLink>,
    config: ForceConfig,
    mode: SimulationMode,
    center: Point,
    alpha: f64,
    alpha_target: f64,
    alpha_decay: f64,
    ticks: u64,
}

impl Simulation {
    /// Create a simulation. Links whose endpoints are out of range are dropped.
    pub fn new(
        nodes: Vec<SimNode>,
        links: Vec<SimLink>,
        center: Point,
        mode: SimulationMode,
        config: ForceConfig,
    ) -> Self {
        let node_index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        let n = nodes.len();
        let mut sim = Self {
            nodes,
            node_index,
            links: links
                .into_iter()
                .filter(|l| l.source < n && l.target < n && l.source != l.target)
                .collect(),
            alpha_decay: config.alpha_decay,
            config,
            mode,
            center,
            alpha: 1.0,
            alpha_target: 0.0,
            ticks: 0,
        };
        sim.initialize_links();
        sim
    }

    /// Spread unpinned nodes on a phyllotaxis spiral around `center`.
    pub fn phyllotaxis(index: usize, center: Point) -> Point {
        let radius = 10.0 * (0.5 + index as f64).sqrt();
        let angle = index as f64 * std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
        Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
    }

    /// Link strength is 1 / min(endpoint degree); bias moves the
    /// lower-degree endpoint more.
    fn initialize_links(&mut self) {
        let mut count = vec![0usize; self.nodes.len()];
        for link in &self.links {
            count[link.source] += 1;
            count[link.target] += 1;
        }
        for link in &mut self.links {
            let (s, t) = (count[link.source] as f64, count[link.target] as f64);
            link.strength = 1.0 / s.min(t).max(1.0);
            link.bias = s / (s + t);
        }
    }

    pub fn mode(&self) -> SimulationMode {
        self.mode
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f64 {
        self.alpha_target
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[SimLink] {
        &self.links
    }

    pub fn node(&self, id: &str) -> Option<&SimNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    pub fn set_alpha_decay(&mut self, decay: f64) {
        self.alpha_decay = decay;
    }

    /// Idle once the energy and its target are both below `alpha_min`.
    pub fn is_settled(&self) -> bool {
        self.alpha < self.config.alpha_min && self.alpha_target < self.config.alpha_min
    }

    /// Boost energy so the layout moves again.
    pub fn reheat(&mut self, alpha: f64) {
        self.alpha = self.alpha.max(alpha);
    }

    /// Rescale every link's rest length and reheat.
    pub fn set_link_scale(&mut self, scale: f64) {
        for link in &mut self.links {
            link.distance = link.base_distance * scale;
        }
        self.reheat(self.config.drag_alpha_target);
        debug!(scale, "Link distances rescaled");
    }

    /// Current position of every node, keyed by id.
    pub fn positions(&self) -> BTreeMap<String, Point> {
        self.nodes
            .iter()
            .map(|n| (n.id.clone(), n.position()))
            .collect()
    }

    /// Advance one step. Returns false when already settled.
    pub fn tick(&mut self) -> bool {
        if self.is_settled() {
            return false;
        }
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        self.ticks += 1;

        self.apply_links();
        if self.mode == SimulationMode::Full {
            self.apply_many_body();
            self.apply_position();
            self.apply_collide();
        }

        let retain = 1.0 - self.config.velocity_decay;
        for node in &mut self.nodes {
            match node.fx {
                Some(fx) => {
                    node.x = fx;
                    node.vx = 0.0;
                }
                None => {
                    node.vx *= retain;
                    node.x += node.vx;
                }
            }
            match node.fy {
                Some(fy) => {
                    node.y = fy;
                    node.vy = 0.0;
                }
                None => {
                    node.vy *= retain;
                    node.y += node.vy;
                }
            }
        }

        if self.mode == SimulationMode::Full {
            self.apply_center();
            if self.is_settled() {
                self.separate();
            }
        }
        true
    }

    /// Tick until settled or `max_ticks` is reached. A run cut short still
    /// gets the overlap pass. Returns the number of ticks run.
    pub fn run_until_settled(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.tick() {
            ticks += 1;
        }
        if self.mode == SimulationMode::Full && !self.is_settled() {
            self.separate();
        }
        debug!(ticks, alpha = self.alpha, "Simulation run finished");
        ticks
    }

    fn separate(&mut self) -> bool {
        let min_distance = self.config.collision_radius;
        let resolved = self.resolve_overlaps(min_distance, 100);
        if !resolved {
            warn!(
                nodes = self.nodes.len(),
                min_separation = self.min_separation().unwrap_or(0.0),
                "Could not separate every node by {}",
                min_distance
            );
        }
        resolved
    }

    /// Pin a node and raise the energy target so neighbours react.
    pub fn drag_start(&mut self, id: &str, at: Point) -> Result<()> {
        let i = self.index(id, at)?;
        self.alpha_target = self.config.drag_alpha_target;
        self.nodes[i].pin(at);
        Ok(())
    }

    /// Move a dragged node's pin.
    pub fn drag(&mut self, id: &str, at: Point) -> Result<()> {
        let i = self.index(id, at)?;
        self.nodes[i].pin(at);
        if self.alpha_target < self.config.drag_alpha_target {
            self.alpha_target = self.config.drag_alpha_target;
        }
        Ok(())
    }

    /// Release a drag. The node stays pinned where it was dropped.
    pub fn drag_end(&mut self, id: &str) -> Result<()> {
        if !self.node_index.contains_key(id) {
            return Err(GraphError::UnknownNode(id.to_string()));
        }
        self.alpha_target = 0.0;
        Ok(())
    }

    pub fn pin(&mut self, id: &str, at: Point) -> Result<()> {
        let i = self.index(id, at)?;
        self.nodes[i].pin(at);
        Ok(())
    }

    fn index(&self, id: &str, at: Point) -> Result<usize> {
        if !at.is_finite() {
            return Err(GraphError::InvalidPoint(id.to_string()));
        }
        self.node_index
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))
    }

    fn apply_links(&mut self) {
        let alpha = self.alpha;
        for (k, link) in self.links.iter().enumerate() {
            let (s, t) = (&self.nodes[link.source], &self.nodes[link.target]);
            let mut dx = t.x + t.vx - s.x - s.vx;
            let mut dy = t.y + t.vy - s.y - s.vy;
            if dx == 0.0 {
                dx = jiggle(k);
            }
            if dy == 0.0 {
                dy = jiggle(k + 1);
            }
            let len = (dx * dx + dy * dy).sqrt();
            let l = (len - link.distance) / len * alpha * link.strength;
            dx *= l;
            dy *= l;
            let b = link.bias;
            self.nodes[link.target].vx -= dx * b;
            self.nodes[link.target].vy -= dy * b;
            self.nodes[link.source].vx += dx * (1.0 - b);
            self.nodes[link.source].vy += dy * (1.0 - b);
        }
    }

    fn apply_many_body(&mut self) {
        let n = self.nodes.len();
        let strength = self.config.charge * self.alpha;
        let mut dv = vec![(0.0, 0.0); n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let mut dx = self.nodes[j].x - self.nodes[i].x;
                let mut dy = self.nodes[j].y - self.nodes[i].y;
                if dx == 0.0 {
                    dx = jiggle(i * n + j);
                }
                if dy == 0.0 {
                    dy = jiggle(j * n + i);
                }
                let mut l = dx * dx + dy * dy;
                if l < 1.0 {
                    l = l.sqrt();
                }
                dv[i].0 += dx * strength / l;
                dv[i].1 += dy * strength / l;
            }
        }
        for (node, (vx, vy)) in self.nodes.iter_mut().zip(dv) {
            node.vx += vx;
            node.vy += vy;
        }
    }

    fn apply_position(&mut self) {
        let k = self.config.position_strength * self.alpha;
        for node in &mut self.nodes {
            node.vx += (self.center.x - node.x) * k;
            node.vy += (self.center.y - node.y) * k;
        }
    }

    fn apply_collide(&mut self) {
        let r = self.config.collision_radius;
        let min = 2.0 * r;
        let strength = self.config.collision_strength;
        let n = self.nodes.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (&self.nodes[i], &self.nodes[j]);
                let mut dx = a.x + a.vx - b.x - b.vx;
                let mut dy = a.y + a.vy - b.y - b.vy;
                let mut l = dx * dx + dy * dy;
                if l >= min * min {
                    continue;
                }
                if dx == 0.0 {
                    dx = jiggle(i + j);
                    l += dx * dx;
                }
                if dy == 0.0 {
                    dy = jiggle(i * j + 1);
                    l += dy * dy;
                }
                let len = l.sqrt();
                let push = (min - len) / len * strength * 0.5;
                self.nodes[i].vx += dx * push;
                self.nodes[i].vy += dy * push;
                self.nodes[j].vx -= dx * push;
                self.nodes[j].vy -= dy * push;
            }
        }
    }

    /// Shift all nodes so the mean position sits on the center. Skipped while
    /// anything is pinned, since pinned nodes would snap back.
    fn apply_center(&mut self) {
        if self.nodes.is_empty() || self.nodes.iter().any(SimNode::is_pinned) {
            return;
        }
        let n = self.nodes.len() as f64;
        let (sx, sy) = self
            .nodes
            .iter()
            .fold((0.0, 0.0), |(sx, sy), node| (sx + node.x, sy + node.y));
        let (ox, oy) = (sx / n - self.center.x, sy / n - self.center.y);
        for node in &mut self.nodes {
            node.x -= ox;
            node.y -= oy;
        }
    }

    /// Push overlapping node centers apart until every pair is at least
    /// `min_distance` apart or `max_rounds` is exhausted. Pinned nodes do not
    /// move.
    pub fn resolve_overlaps(&mut self, min_distance: f64, max_rounds: usize) -> bool {
        let n = self.nodes.len();
        for _ in 0..max_rounds {
            let mut moved = false;
            for i in 0..n {
                for j in (i + 1)..n {
                    let mut dx = self.nodes[j].x - self.nodes[i].x;
                    let mut dy = self.nodes[j].y - self.nodes[i].y;
                    let mut len = (dx * dx + dy * dy).sqrt();
                    if len >= min_distance {
                        continue;
                    }
                    if len == 0.0 {
                        dx = jiggle(i + j + 1).signum();
                        dy = 0.0;
                        len = 1.0;
                    }
                    let (pi, pj) = (self.nodes[i].is_pinned(), self.nodes[j].is_pinned());
                    if pi && pj {
                        continue;
                    }
                    // Small overshoot so the pair clears the bound after float rounding.
                    let gap = (min_distance - len) * 1.001;
                    let (ux, uy) = (dx / len, dy / len);
                    let (wi, wj) = match (pi, pj) {
                        (true, _) => (0.0, 1.0),
                        (_, true) => (1.0, 0.0),
                        _ => (0.5, 0.5),
                    };
                    self.nodes[i].x -= ux * gap * wi;
                    self.nodes[i].y -= uy * gap * wi;
                    self.nodes[j].x += ux * gap * wj;
                    self.nodes[j].y += uy * gap * wj;
                    moved = true;
                }
            }
            if !moved {
                return true;
            }
        }
        false
    }

    /// Smallest distance between any two node centers.
    pub fn min_separation(&self) -> Option<f64> {
        let n = self.nodes.len();
        let mut best: Option<f64> = None;
        for i in 0..n {
            for j in (i + 1)..n {
                let d = ((self.nodes[i].x - self.nodes[j].x).powi(2)
                    + (self.nodes[i].y - self.nodes[j].y).powi(2))
                .sqrt();
                best = Some(best.map_or(d, |b| b.min(d)));
            }
        }
        best
    }
}

/// Tiny deterministic nudge for coincident coordinates.
fn jiggle(seed: usize) -> f64 {
    let v = ((seed as f64 + 1.0) * 12.9898).sin() * 43758.5453;
    (v - v.floor() - 0.5) * 1e-6
}
