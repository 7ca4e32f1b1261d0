//! Integrity checking and statistics for flat node arrays.
//!
//! Both functions work on raw node arrays so that hand-corrupted arrays can
//! be checked as easily as built ones. Neither is needed to answer queries.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::IntegrityError;
use crate::flatten::FlatNode;
use crate::wide::STACK_CAPACITY;

/// Float32 corner pair, as stored in the nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds32 {
    /// Minimum corner.
    pub min: [f32; 3],
    /// Maximum corner.
    pub max: [f32; 3],
}

impl Bounds32 {
    fn empty() -> Self {
        Self {
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
        }
    }
}

/// Summary of a hierarchy's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Length of the node array.
    pub node_count: usize,
    /// Length of the primitive array.
    pub primitive_count: usize,
    /// Nodes with at least one leaf slot.
    pub leaf_nodes: usize,
    /// Nodes with at least one inner slot.
    pub inner_nodes: usize,
    /// Sum of the primitive counts of all leaf slots.
    pub total_leaf_primitives: usize,
    /// Unused slots across all nodes.
    pub empty_slots: usize,
    /// Used slots of the root node.
    pub root_children: usize,
    /// Primitives per used slot.
    pub avg_primitives_per_slot: f64,
    /// Flat levels from the root to the deepest node.
    pub max_depth: usize,
    /// Union of the root's used slots.
    pub root_bounds: Bounds32,
}

/// Check a node array against a primitive array of `primitive_count`
/// entries.
///
/// Walks breadth-first from node 0 and reports every problem found rather
/// than stopping at the first. An empty result means every primitive is
/// reachable from exactly one leaf slot, every node from exactly one inner
/// slot, and no ray can overflow the traversal stack.
pub fn validate<const K: usize>(
    nodes: &[FlatNode<K>],
    primitive_count: usize,
) -> Vec<IntegrityError> {
    let mut errors = Vec::new();
    if nodes.is_empty() {
        errors.push(IntegrityError::NoNodes);
        return errors;
    }
    if primitive_count == 0 {
        errors.push(IntegrityError::NoPrimitives);
        return errors;
    }

    let mut visited = vec![false; nodes.len()];
    let mut referenced = vec![false; primitive_count];
    let mut queue = VecDeque::from([0usize]);
    visited[0] = true;

    while let Some(index) = queue.pop_front() {
        let node = &nodes[index];
        for slot in 0..K {
            let child = node.child_index[slot];
            let count = node.primitive_count[slot];

            if child == -1 && count == 0 {
                // Traversal relies on +inf bounds to keep unused slots out of
                // the slab mask.
                if !node.has_empty_bounds(slot) {
                    errors.push(IntegrityError::MalformedSlot { node: index, slot });
                }
                continue;
            }
            if child < 0 || count < 0 {
                errors.push(IntegrityError::MalformedSlot { node: index, slot });
                continue;
            }

            if count > 0 {
                let start = child as usize;
                let end = start + count as usize;
                if end > primitive_count {
                    errors.push(IntegrityError::InvalidPrimitiveRange {
                        node: index,
                        slot,
                        start: child,
                        count,
                        len: primitive_count,
                    });
                    continue;
                }
                for (offset, seen) in referenced[start..end].iter_mut().enumerate() {
                    if *seen {
                        errors.push(IntegrityError::PrimitiveReferencedTwice {
                            index: start + offset,
                        });
                    }
                    *seen = true;
                }
            } else {
                let target = child as usize;
                if target >= nodes.len() {
                    errors.push(IntegrityError::InvalidNodeIndex {
                        parent: index,
                        slot,
                        index: child,
                    });
                } else if visited[target] {
                    errors.push(IntegrityError::NodeVisitedTwice { index: target });
                } else {
                    visited[target] = true;
                    queue.push_back(target);
                }
            }
        }
    }

    let referenced = referenced.iter().filter(|&&seen| seen).count();
    if referenced != primitive_count {
        errors.push(IntegrityError::CountMismatch {
            referenced,
            total: primitive_count,
        });
    }

    if errors.is_empty() {
        let worst_case = worst_case_stack(nodes);
        if worst_case > STACK_CAPACITY {
            errors.push(IntegrityError::StackBoundExceeded {
                worst_case,
                bound: STACK_CAPACITY,
            });
        }
    }

    errors
}

/// Compute shape statistics.
pub fn stats<const K: usize>(nodes: &[FlatNode<K>], primitive_count: usize) -> Stats {
    let mut leaf_nodes = 0;
    let mut inner_nodes = 0;
    let mut total_leaf_primitives = 0;
    let mut empty_slots = 0;

    for node in nodes {
        let mut has_leaf = false;
        let mut has_inner = false;
        for slot in 0..K {
            if node.is_unused_slot(slot) {
                empty_slots += 1;
            } else if node.is_leaf_slot(slot) {
                has_leaf = true;
                total_leaf_primitives += node.primitive_count[slot] as usize;
            } else {
                has_inner = true;
            }
        }
        leaf_nodes += has_leaf as usize;
        inner_nodes += has_inner as usize;
    }

    let used_slots = nodes.len() * K - empty_slots;
    let avg_primitives_per_slot = if used_slots > 0 {
        primitive_count as f64 / used_slots as f64
    } else {
        0.0
    };

    let mut root_bounds = Bounds32::empty();
    let mut root_children = 0;
    if let Some(root) = nodes.first() {
        for slot in (0..K).filter(|&slot| !root.is_unused_slot(slot)) {
            root_children += 1;
            let mins = [root.min_x[slot], root.min_y[slot], root.min_z[slot]];
            let maxs = [root.max_x[slot], root.max_y[slot], root.max_z[slot]];
            for axis in 0..3 {
                root_bounds.min[axis] = root_bounds.min[axis].min(mins[axis]);
                root_bounds.max[axis] = root_bounds.max[axis].max(maxs[axis]);
            }
        }
    }

    Stats {
        node_count: nodes.len(),
        primitive_count,
        leaf_nodes,
        inner_nodes,
        total_leaf_primitives,
        empty_slots,
        root_children,
        avg_primitives_per_slot,
        max_depth: max_depth(nodes),
        root_bounds,
    }
}

/// Nodes reachable from the root, parents before children. Invalid and
/// repeated references are skipped.
fn reachable<const K: usize>(nodes: &[FlatNode<K>]) -> Vec<usize> {
    if nodes.is_empty() {
        return Vec::new();
    }
    let mut visited = vec![false; nodes.len()];
    let mut order = vec![0];
    visited[0] = true;

    let mut next = 0;
    while next < order.len() {
        let node = &nodes[order[next]];
        next += 1;
        for child in inner_children(node) {
            if child < nodes.len() && !visited[child] {
                visited[child] = true;
                order.push(child);
            }
        }
    }
    order
}

fn inner_children<const K: usize>(node: &FlatNode<K>) -> impl Iterator<Item = usize> + '_ {
    (0..K)
        .filter(|&slot| node.is_inner_slot(slot))
        .map(|slot| node.child_index[slot] as usize)
}

/// Fold a per-node quantity bottom-up over the reachable nodes.
fn fold_up<const K: usize>(
    nodes: &[FlatNode<K>],
    combine: impl Fn(&FlatNode<K>, usize) -> usize,
    children_best: impl Fn(&FlatNode<K>, &[usize]) -> usize,
) -> usize {
    let order = reachable(nodes);
    let mut value = vec![0; nodes.len()];
    for &index in order.iter().rev() {
        let node = &nodes[index];
        let best = children_best(node, &value);
        value[index] = combine(node, best);
    }
    order.first().map_or(0, |&root| value[root])
}

fn max_depth<const K: usize>(nodes: &[FlatNode<K>]) -> usize {
    fold_up(
        nodes,
        |_, deepest_child| 1 + deepest_child,
        |node, depth| {
            inner_children(node)
                .filter(|&c| c < depth.len())
                .map(|c| depth[c])
                .max()
                .unwrap_or(0)
        },
    )
}

/// Most entries the traversal stack can hold for any ray: at each node all
/// inner slots but the first may be pushed while the first is descended.
fn worst_case_stack<const K: usize>(nodes: &[FlatNode<K>]) -> usize {
    fold_up(
        nodes,
        |node, deepest_child| inner_children(node).count().saturating_sub(1) + deepest_child,
        |node, pending| {
            inner_children(node)
                .filter(|&c| c < pending.len())
                .map(|c| pending[c])
                .max()
                .unwrap_or(0)
        },
    )
}
