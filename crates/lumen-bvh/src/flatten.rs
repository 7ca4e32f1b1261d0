//! Collapsing binary trees into fixed fan-out flat nodes.

use bytemuck::{Pod, Zeroable};
use lumen_math::precision::{round_down_f32, round_up_f32};
use lumen_math::{Aabb, Point3};

use crate::build::BuildNode;

/// One K-wide node in structure-of-arrays layout.
///
/// Each slot is in one of three states:
///
/// - **leaf**: `primitive_count[i] > 0`; the slot covers
///   `primitive_count[i]` consecutive primitives starting at
///   `child_index[i]`
/// - **inner**: `primitive_count[i] == 0` and `child_index[i] >= 0`; the
///   slot points at another node
/// - **unused**: `child_index[i] == -1`, `primitive_count[i] == 0` and all
///   bounds `+inf`, so the slab test never selects it
///
/// Bounds are float32, rounded outward from the float64 boxes they were
/// built from.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatNode<const K: usize> {
    /// Minimum X of each slot.
    pub min_x: [f32; K],
    /// Minimum Y of each slot.
    pub min_y: [f32; K],
    /// Minimum Z of each slot.
    pub min_z: [f32; K],
    /// Maximum X of each slot.
    pub max_x: [f32; K],
    /// Maximum Y of each slot.
    pub max_y: [f32; K],
    /// Maximum Z of each slot.
    pub max_z: [f32; K],
    /// Node index (inner slot), first primitive (leaf slot) or -1 (unused).
    pub child_index: [i32; K],
    /// Number of primitives in a leaf slot, zero otherwise.
    pub primitive_count: [i32; K],
}

// SAFETY: eight arrays of 4-byte scalars, `repr(C)`, so there is no padding
// and every bit pattern is a valid value.
unsafe impl<const K: usize> Zeroable for FlatNode<K> {}
unsafe impl<const K: usize> Pod for FlatNode<K> {}

impl<const K: usize> FlatNode<K> {
    /// A node with every slot unused.
    pub fn empty() -> Self {
        Self {
            min_x: [f32::INFINITY; K],
            min_y: [f32::INFINITY; K],
            min_z: [f32::INFINITY; K],
            max_x: [f32::INFINITY; K],
            max_y: [f32::INFINITY; K],
            max_z: [f32::INFINITY; K],
            child_index: [-1; K],
            primitive_count: [0; K],
        }
    }

    /// Whether `slot` holds primitives.
    #[inline]
    pub fn is_leaf_slot(&self, slot: usize) -> bool {
        self.primitive_count[slot] > 0
    }

    /// Whether `slot` points at another node.
    #[inline]
    pub fn is_inner_slot(&self, slot: usize) -> bool {
        self.primitive_count[slot] == 0 && self.child_index[slot] >= 0
    }

    /// Whether `slot` is empty.
    #[inline]
    pub fn is_unused_slot(&self, slot: usize) -> bool {
        self.child_index[slot] == -1
    }

    /// Whether every bound of `slot` is `+inf`, as unused slots require.
    pub fn has_empty_bounds(&self, slot: usize) -> bool {
        [
            self.min_x[slot],
            self.min_y[slot],
            self.min_z[slot],
            self.max_x[slot],
            self.max_y[slot],
            self.max_z[slot],
        ]
        .iter()
        .all(|&bound| bound == f32::INFINITY)
    }

    /// Number of slots that are not unused.
    pub fn used_slots(&self) -> usize {
        (0..K).filter(|&slot| !self.is_unused_slot(slot)).count()
    }

    /// The stored (float32) bounds of `slot`, widened back to float64.
    pub fn slot_bounds(&self, slot: usize) -> Aabb {
        Aabb::new(
            Point3::new(
                self.min_x[slot] as f64,
                self.min_y[slot] as f64,
                self.min_z[slot] as f64,
            ),
            Point3::new(
                self.max_x[slot] as f64,
                self.max_y[slot] as f64,
                self.max_z[slot] as f64,
            ),
        )
    }

    /// Fill `slot`, rounding `bbox` outward to float32.
    pub fn set_slot(&mut self, slot: usize, bbox: &Aabb, child_index: i32, primitive_count: i32) {
        self.min_x[slot] = round_down_f32(bbox.min.x);
        self.min_y[slot] = round_down_f32(bbox.min.y);
        self.min_z[slot] = round_down_f32(bbox.min.z);
        self.max_x[slot] = round_up_f32(bbox.max.x);
        self.max_y[slot] = round_up_f32(bbox.max.y);
        self.max_z[slot] = round_up_f32(bbox.max.z);
        self.child_index[slot] = child_index;
        self.primitive_count[slot] = primitive_count;
    }
}

/// Flatten a binary tree into K-wide nodes.
///
/// Returns the node array (root at index 0) and the permutation applied to
/// primitives: entry `i` is the input index of the primitive that ends up
/// at position `i`, so every leaf slot covers a contiguous run.
///
/// Every leaf of the binary tree becomes its own node with one leaf slot
/// and `K - 1` unused slots; its parent points at it through an inner slot.
/// With `inline_leaves` set, leaf children are written straight into their
/// parent's slot instead and only a single-leaf tree produces a leaf node.
pub fn flatten<const K: usize>(
    root: &BuildNode,
    inline_leaves: bool,
) -> (Vec<FlatNode<K>>, Vec<usize>) {
    let mut flattener = Flattener {
        nodes: Vec::new(),
        order: Vec::with_capacity(root.primitive_count()),
        inline_leaves,
    };
    flattener.node(root);
    (flattener.nodes, flattener.order)
}

struct Flattener<const K: usize> {
    nodes: Vec<FlatNode<K>>,
    order: Vec<usize>,
    inline_leaves: bool,
}

impl<const K: usize> Flattener<K> {
    fn node(&mut self, node: &BuildNode) -> usize {
        // Reserve the index first so children land after their parent.
        let index = self.nodes.len();
        self.nodes.push(FlatNode::empty());

        let mut flat = FlatNode::empty();
        match node {
            BuildNode::Leaf { bbox, primitives } => {
                self.write_leaf(&mut flat, 0, bbox, primitives);
            }
            BuildNode::Inner { .. } => {
                for (slot, child) in collect_children(node, K).into_iter().enumerate() {
                    match child {
                        BuildNode::Leaf { bbox, primitives } if self.inline_leaves => {
                            self.write_leaf(&mut flat, slot, bbox, primitives);
                        }
                        _ => {
                            let child_index = self.node(child);
                            flat.set_slot(slot, child.bbox(), child_index as i32, 0);
                        }
                    }
                }
            }
        }

        self.nodes[index] = flat;
        index
    }

    fn write_leaf(
        &mut self,
        node: &mut FlatNode<K>,
        slot: usize,
        bbox: &Aabb,
        primitives: &[usize],
    ) {
        let start = self.order.len();
        self.order.extend_from_slice(primitives);
        node.set_slot(slot, bbox, start as i32, primitives.len() as i32);
    }
}

/// Gather up to `max_children` descendants of `node` that together cover
/// its subtree.
///
/// Starts from the two children and repeatedly replaces the first inner
/// node in the set with its two children while the set stays within
/// `max_children`. Leaves are never expanded.
pub fn collect_children(node: &BuildNode, max_children: usize) -> Vec<&BuildNode> {
    let BuildNode::Inner { children, .. } = node else {
        return vec![node];
    };

    let mut result: Vec<&BuildNode> = children.iter().collect();
    while result.len() < max_children {
        let Some(pos) = result.iter().position(|child| !child.is_leaf()) else {
            break;
        };
        let BuildNode::Inner { children, .. } = result.remove(pos) else {
            unreachable!("position() only matches inner nodes");
        };
        result.extend(children.iter());
    }
    result
}
