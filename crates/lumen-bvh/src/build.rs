//! Binary tree construction with a random split axis per node.
//!
//! The tree produced here is an intermediate: the wide hierarchies flatten
//! it into fixed fan-out nodes, and [`BinaryBvh`](crate::BinaryBvh) keeps it
//! as its permanent shape.

use std::sync::Arc;

use lumen_geom::Hitable;
use lumen_math::{Aabb, Axis};

use crate::error::{BuildError, Result};

/// A node of the binary build tree.
///
/// Primitives are referenced by their position in the input list.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildNode {
    /// A node holding primitives directly.
    Leaf {
        /// Union of the primitives' boxes.
        bbox: Aabb,
        /// Input indices of the primitives, in sorted order.
        primitives: Vec<usize>,
    },
    /// A node with exactly two children.
    Inner {
        /// Union of the children's boxes.
        bbox: Aabb,
        /// Left and right subtrees.
        children: Box<[BuildNode; 2]>,
    },
}

impl BuildNode {
    /// Bounding box of this subtree.
    pub fn bbox(&self) -> &Aabb {
        match self {
            BuildNode::Leaf { bbox, .. } | BuildNode::Inner { bbox, .. } => bbox,
        }
    }

    /// Whether this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, BuildNode::Leaf { .. })
    }

    /// Number of primitives beneath this node.
    pub fn primitive_count(&self) -> usize {
        match self {
            BuildNode::Leaf { primitives, .. } => primitives.len(),
            BuildNode::Inner { children, .. } => {
                children[0].primitive_count() + children[1].primitive_count()
            }
        }
    }

    /// Number of levels in this subtree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            BuildNode::Leaf { .. } => 1,
            BuildNode::Inner { children, .. } => {
                1 + children[0].depth().max(children[1].depth())
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Item {
    index: usize,
    bbox: Aabb,
}

/// Build a binary tree over `primitives`.
///
/// Each node draws one sample from `axis_source` (mapped with
/// [`Axis::from_unit`]), stable-sorts its range along that axis and splits
/// it at the midpoint. A range of at most `max_leaf_primitives` becomes a
/// leaf; a single primitive is always a leaf of its own.
pub fn build_tree(
    primitives: &[Arc<dyn Hitable>],
    time0: f64,
    time1: f64,
    max_leaf_primitives: usize,
    axis_source: &mut dyn FnMut() -> f64,
) -> Result<BuildNode> {
    if primitives.is_empty() {
        return Err(BuildError::EmptyPrimitiveList);
    }

    let mut items = primitives
        .iter()
        .enumerate()
        .map(|(index, primitive)| {
            primitive
                .bounding_box(time0, time1)
                .map(|bbox| Item { index, bbox })
                .ok_or(BuildError::UnboundedPrimitive { index })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(build_node(&mut items, max_leaf_primitives.max(1), axis_source))
}

fn build_node(
    items: &mut [Item],
    max_leaf_primitives: usize,
    axis_source: &mut dyn FnMut() -> f64,
) -> BuildNode {
    let axis = Axis::from_unit(axis_source());
    // Stable, so equal keys keep input order and builds stay reproducible.
    items.sort_by(|a, b| a.bbox.cmp_on_axis(&b.bbox, axis));

    if items.len() <= max_leaf_primitives {
        let bbox = items[1..]
            .iter()
            .fold(items[0].bbox, |acc, item| acc.union(&item.bbox));
        return BuildNode::Leaf {
            bbox,
            primitives: items.iter().map(|item| item.index).collect(),
        };
    }

    let mid = items.len() / 2;
    let (left_items, right_items) = items.split_at_mut(mid);
    let left = build_node(left_items, max_leaf_primitives, axis_source);
    let right = build_node(right_items, max_leaf_primitives, axis_source);

    BuildNode::Inner {
        bbox: left.bbox().union(right.bbox()),
        children: Box::new([left, right]),
    }
}
