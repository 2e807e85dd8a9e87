//! Closed-form placements. Each function returns one point per node, in
//! node index order, and is deterministic except `free_grid`.

use std::f64::consts::TAU;

use chrono::Datelike;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::assembler::AssembledGraph;
use crate::schema::{Point, RelationGroup};

use super::Canvas;

/// Evenly spaced on one circle of radius min(w, h) / 3.
pub fn circular(n: usize, canvas: Canvas) -> Vec<Point> {
    let center = canvas.center();
    let radius = canvas.min_side() / 3.0;
    (0..n)
        .map(|i| {
            let angle = i as f64 / n as f64 * TAU;
            Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect()
}

/// Busiest node in the center, the rest on rings of eight fixed slots. A
/// partial outer ring leaves its remaining slots empty.
pub fn radial(graph: &AssembledGraph, canvas: Canvas) -> Vec<Point> {
    const SLOTS: usize = 8;
    let n = graph.node_count();
    let center = canvas.center();
    let mut positions = vec![center; n];
    if n == 0 {
        return positions;
    }

    let degrees = graph.degrees();
    let hub = degrees
        .iter()
        .enumerate()
        .fold(0, |best, (i, &d)| if d > degrees[best] { i } else { best });

    let step = canvas.min_side() / 2.5 / 3.0;
    let others: Vec<usize> = (0..n).filter(|&i| i != hub).collect();
    for (k, &node) in others.iter().enumerate() {
        let ring = k / SLOTS;
        let angle = (k % SLOTS) as f64 / SLOTS as f64 * TAU;
        let radius = step * (ring + 1) as f64;
        positions[node] = Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin());
    }
    positions
}

/// Row-major cell centers on a ceil(sqrt(n)) column grid.
pub fn grid(n: usize, canvas: Canvas) -> Vec<Point> {
    if n == 0 {
        return Vec::new();
    }
    let cols = (n as f64).sqrt().ceil() as usize;
    let rows = n.div_ceil(cols);
    let cell_w = canvas.width / cols as f64;
    let cell_h = canvas.height / rows as f64;
    (0..n)
        .map(|i| {
            let (row, col) = (i / cols, i % cols);
            Point::new((col as f64 + 0.5) * cell_w, (row as f64 + 0.5) * cell_h)
        })
        .collect()
}

/// Majority relation group of each node's incident edges. Ties go to the
/// earlier group; nodes without edges land in `Other`.
pub fn relation_groups(graph: &AssembledGraph) -> Vec<RelationGroup> {
    let mut votes = vec![[0usize; 4]; graph.node_count()];
    for (s, t, kind) in graph.links() {
        let g = kind.group().index();
        votes[s][g] += 1;
        votes[t][g] += 1;
    }
    votes
        .iter()
        .map(|v| {
            if v.iter().all(|&c| c == 0) {
                return RelationGroup::Other;
            }
            let mut best = RelationGroup::Family;
            for group in RelationGroup::ALL {
                if v[group.index()] > v[best.index()] {
                    best = group;
                }
            }
            best
        })
        .collect()
}

/// Quadrant center for each relation group.
pub fn group_center(group: RelationGroup, canvas: Canvas) -> Point {
    let (fx, fy) = match group {
        RelationGroup::Family => (0.25, 0.25),
        RelationGroup::Business => (0.75, 0.25),
        RelationGroup::Social => (0.25, 0.75),
        RelationGroup::Other => (0.75, 0.75),
    };
    Point::new(canvas.width * fx, canvas.height * fy)
}

/// Nodes on a small circle around their group's quadrant center.
pub fn clustered(graph: &AssembledGraph, canvas: Canvas, radius: f64) -> Vec<Point> {
    let groups = relation_groups(graph);
    let mut members: [Vec<usize>; 4] = Default::default();
    for (i, g) in groups.iter().enumerate() {
        members[g.index()].push(i);
    }

    let mut positions = vec![canvas.center(); graph.node_count()];
    for group in RelationGroup::ALL {
        let nodes = &members[group.index()];
        let center = group_center(group, canvas);
        for (k, &node) in nodes.iter().enumerate() {
            let angle = k as f64 / nodes.len() as f64 * TAU;
            positions[node] = Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin());
        }
    }
    positions
}

/// Youngest first, left to right, with a sine wave for vertical separation.
///
/// Age is whole years before `current_year`; undated nodes count as age 0 and
/// so lead the line. Equal ages keep node order.
pub fn timeline(graph: &AssembledGraph, canvas: Canvas, current_year: i32) -> Vec<Point> {
    let nodes = graph.nodes();
    let age = |i: usize| nodes[i].date.map_or(0, |d| current_year - d.year());
    let mut order: Vec<usize> = (0..nodes.len()).collect();
    order.sort_by_key(|&i| age(i));

    let n = order.len();
    let step = if n > 1 {
        (canvas.width - 200.0) / (n - 1) as f64
    } else {
        0.0
    };
    let mut positions = vec![canvas.center(); n];
    for (slot, &node) in order.iter().enumerate() {
        let x = 100.0 + step * slot as f64;
        let y = canvas.height / 2.0 + (slot as f64 * 0.5).sin() * 100.0;
        positions[node] = Point::new(x, y);
    }
    positions
}

/// Angle `0.5 * i`, radius growing linearly to min(w, h) / 3.
pub fn spiral(n: usize, canvas: Canvas) -> Vec<Point> {
    let center = canvas.center();
    let max_radius = canvas.min_side() / 3.0;
    (0..n)
        .map(|i| {
            let angle = i as f64 * 0.5;
            let radius = i as f64 / n as f64 * max_radius;
            Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect()
}

/// Grid cell centers with a uniform jitter of up to `jitter` on each axis.
pub fn free_grid(n: usize, canvas: Canvas, jitter: f64, seed: Option<u64>) -> Vec<Point> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    grid(n, canvas)
        .into_iter()
        .map(|p| {
            if jitter <= 0.0 {
                return p;
            }
            Point::new(
                p.x + rng.gen_range(-jitter..=jitter),
                p.y + rng.gen_range(-jitter..=jitter),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{GraphEdge, GraphNode};
    use crate::schema::{parse_record_date, RecordRef, RelationKind};

    fn canvas(w: f64, h: f64) -> Canvas {
        Canvas::new(w, h).unwrap()
    }

    fn node(id: u64, date: Option<&str>) -> GraphNode {
        let record = RecordRef::person(id);
        GraphNode {
            id: record.node_id(),
            record,
            display_name: format!("P{id}"),
            date: date.and_then(parse_record_date),
        }
    }

    fn edge(id: u64, a: u64, b: u64, kind: RelationKind) -> GraphEdge {
        GraphEdge {
            id,
            source: RecordRef::person(a).node_id(),
            target: RecordRef::person(b).node_id(),
            kind,
            description: String::new(),
            automatic: true,
            curve: None,
        }
    }

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn test_grid_four_nodes_on_square_canvas() {
        let points = grid(4, canvas(400.0, 400.0));
        let expected = [(100.0, 100.0), (300.0, 100.0), (100.0, 300.0), (300.0, 300.0)];
        for (p, (x, y)) in points.iter().zip(expected) {
            assert!(close(*p, Point::new(x, y)), "{p:?}");
        }
    }

    #[test]
    fn test_grid_partial_last_row() {
        let points = grid(5, canvas(300.0, 200.0));
        // 3 columns, 2 rows
        assert!(close(points[3], Point::new(50.0, 150.0)));
        assert!(close(points[4], Point::new(150.0, 150.0)));
    }

    #[test]
    fn test_circular_radius() {
        let c = canvas(900.0, 600.0);
        for p in circular(7, c) {
            let r = ((p.x - 450.0).powi(2) + (p.y - 300.0).powi(2)).sqrt();
            assert!((r - 200.0).abs() < 1e-9);
        }
        assert!(close(circular(1, c)[0], Point::new(650.0, 300.0)));
    }

    #[test]
    fn test_radial_hub_in_center() {
        let nodes = (1..=11).map(|i| node(i, None)).collect();
        let edges = (2..=11).map(|i| edge(i, 1, i, RelationKind::Sibling)).collect();
        let graph = AssembledGraph::from_parts(nodes, edges);
        let c = canvas(750.0, 750.0);
        let points = radial(&graph, c);
        assert!(close(points[0], c.center()));

        let step = 750.0 / 2.5 / 3.0;
        let r1 = ((points[1].x - 375.0).powi(2) + (points[1].y - 375.0).powi(2)).sqrt();
        let r9 = ((points[9].x - 375.0).powi(2) + (points[9].y - 375.0).powi(2)).sqrt();
        assert!((r1 - step).abs() < 1e-9);
        assert!((r9 - 2.0 * step).abs() < 1e-9);

        // Two nodes on the outer ring keep the fixed eighth-turn spacing
        assert!(close(points[9], Point::new(375.0 + 2.0 * step, 375.0)));
        let eighth = TAU / 8.0;
        let expected = Point::new(
            375.0 + 2.0 * step * eighth.cos(),
            375.0 + 2.0 * step * eighth.sin(),
        );
        assert!(close(points[10], expected));
    }

    #[test]
    fn test_groups_majority_and_ties() {
        let nodes = (1..=4).map(|i| node(i, None)).collect();
        let edges = vec![
            edge(1, 1, 2, RelationKind::Mother),
            edge(2, 1, 3, RelationKind::BusinessPartner),
            edge(3, 2, 3, RelationKind::CoOwnedEntity),
        ];
        let graph = AssembledGraph::from_parts(nodes, edges);
        let groups = relation_groups(&graph);
        // person 1: one family, one business -> tie -> family
        assert_eq!(groups[0], RelationGroup::Family);
        assert_eq!(groups[1], RelationGroup::Family);
        assert_eq!(groups[2], RelationGroup::Business);
        assert_eq!(groups[3], RelationGroup::Other);
    }

    #[test]
    fn test_clustered_single_member_sits_on_its_circle() {
        let nodes = (1..=3).map(|i| node(i, None)).collect();
        let edges = vec![edge(1, 1, 2, RelationKind::SharedPhone)];
        let graph = AssembledGraph::from_parts(nodes, edges);
        let c = canvas(800.0, 800.0);
        let points = clustered(&graph, c, 80.0);
        assert!(close(points[2], Point::new(680.0, 600.0)));
        let social = group_center(RelationGroup::Social, c);
        let r = ((points[0].x - social.x).powi(2) + (points[0].y - social.y).powi(2)).sqrt();
        assert!((r - 80.0).abs() < 1e-9);
    }

    fn x_order(points: &[Point]) -> Vec<usize> {
        let mut by_x: Vec<_> = (0..points.len()).collect();
        by_x.sort_by(|&a, &b| points[a].x.partial_cmp(&points[b].x).unwrap());
        by_x
    }

    #[test]
    fn test_timeline_youngest_first_undated_leading() {
        let nodes = vec![node(1, Some("1950-06-01")), node(2, Some("01/01/2000")), node(3, None)];
        let graph = AssembledGraph::from_parts(nodes, Vec::new());
        let points = timeline(&graph, canvas(600.0, 400.0), 2026);
        assert_eq!(x_order(&points), vec![2, 1, 0]);
        assert!(close(points[2], Point::new(100.0, 200.0)));
        assert!((points[1].x - 300.0).abs() < 1e-9);
        assert!((points[0].x - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_timeline_equal_ages_keep_node_order() {
        let nodes = vec![
            node(3, None),
            node(1, Some("10/05/1990")),
            node(2, Some("1975-01-01")),
            node(0, None),
        ];
        let graph = AssembledGraph::from_parts(nodes, Vec::new());
        let points = timeline(&graph, canvas(500.0, 400.0), 2026);
        assert_eq!(x_order(&points), vec![0, 3, 1, 2]);
    }

    #[test]
    fn test_spiral_radius_grows() {
        let c = canvas(600.0, 600.0);
        let points = spiral(10, c);
        assert!(close(points[0], c.center()));
        let r = |p: Point| ((p.x - 300.0).powi(2) + (p.y - 300.0).powi(2)).sqrt();
        assert!((r(points[5]) - 100.0).abs() < 1e-9);
        assert!(r(points[9]) > r(points[5]));
    }

    #[test]
    fn test_free_grid_jitter_is_bounded_and_seeded() {
        let c = canvas(400.0, 400.0);
        let a = free_grid(9, c, 25.0, Some(7));
        let b = free_grid(9, c, 25.0, Some(7));
        assert_eq!(a, b);
        for (p, g) in a.iter().zip(grid(9, c)) {
            assert!((p.x - g.x).abs() <= 25.0 && (p.y - g.y).abs() <= 25.0);
        }
    }
}
