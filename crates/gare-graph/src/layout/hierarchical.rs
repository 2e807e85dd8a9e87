//! Layered tree placement over parent edges.
//!
//! A node's parent is the source of the first incoming mae/pai edge. Nodes
//! without one are roots under a virtual root. Leaves get evenly spaced
//! columns and each parent sits centered over its children.

use thiserror::Error;

use crate::assembler::AssembledGraph;
use crate::schema::Point;

use super::Canvas;

const MARGIN: f64 = 50.0;

/// Why a parent structure could not be laid out as a tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Following parents from this node index loops back on itself.
    #[error("parent edges form a cycle at node index {0}")]
    Cycle(usize),
}

/// Parent index per node, `None` for roots.
pub fn parents(graph: &AssembledGraph) -> Vec<Option<usize>> {
    let mut parents = vec![None; graph.node_count()];
    for (source, target, kind) in graph.links() {
        if kind.is_parent() && parents[target].is_none() && source != target {
            parents[target] = Some(source);
        }
    }
    parents
}

/// Tree positions, or the node where a parent cycle was found.
pub fn hierarchical(graph: &AssembledGraph, canvas: Canvas) -> Result<Vec<Point>, TreeError> {
    let n = graph.node_count();
    let parents = parents(graph);

    let mut depth = vec![usize::MAX; n];
    for start in 0..n {
        let mut chain = Vec::new();
        let mut current = start;
        loop {
            if depth[current] != usize::MAX {
                break;
            }
            if chain.contains(&current) {
                return Err(TreeError::Cycle(current));
            }
            chain.push(current);
            match parents[current] {
                Some(p) => current = p,
                None => {
                    depth[current] = 0;
                    chain.pop();
                    break;
                }
            }
        }
        while let Some(node) = chain.pop() {
            if let Some(p) = parents[node] {
                depth[node] = depth[p] + 1;
            }
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut roots = Vec::new();
    for (node, parent) in parents.iter().enumerate() {
        match parent {
            Some(p) => children[*p].push(node),
            None => roots.push(node),
        }
    }

    let leaves = roots.iter().map(|&r| leaf_count(r, &children)).sum::<usize>().max(1);
    let levels = depth.iter().copied().max().map_or(1, |d| d + 1);
    let inner_w = (canvas.width - 2.0 * MARGIN).max(0.0);
    let inner_h = (canvas.height - 2.0 * MARGIN).max(0.0);
    let column = inner_w / leaves as f64;
    let row = inner_h / levels as f64;

    let mut xs = vec![0.0; n];
    let mut next_leaf = 0usize;
    for &root in &roots {
        place(root, &children, &mut xs, &mut next_leaf, column);
    }

    Ok((0..n)
        .map(|i| {
            Point::new(
                MARGIN + xs[i],
                MARGIN + (depth[i] as f64 + 0.5) * row,
            )
        })
        .collect())
}

fn leaf_count(node: usize, children: &[Vec<usize>]) -> usize {
    if children[node].is_empty() {
        1
    } else {
        children[node].iter().map(|&c| leaf_count(c, children)).sum()
    }
}

/// Post-order placement: leaves take the next column, parents center over
/// their first and last child.
fn place(node: usize, children: &[Vec<usize>], xs: &mut [f64], next_leaf: &mut usize, column: f64) {
    if children[node].is_empty() {
        xs[node] = (*next_leaf as f64 + 0.5) * column;
        *next_leaf += 1;
        return;
    }
    for &child in &children[node] {
        place(child, children, xs, next_leaf, column);
    }
    let first = children[node][0];
    let last = children[node][children[node].len() - 1];
    xs[node] = (xs[first] + xs[last]) / 2.0;
}
