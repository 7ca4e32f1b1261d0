//! Error types for hierarchy construction and validation.

use thiserror::Error;

/// Errors that abort construction. No partial hierarchy is ever returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// There was nothing to build over.
    #[error("cannot build a hierarchy over an empty primitive list")]
    EmptyPrimitiveList,

    /// A primitive reported no bounding box for the build interval.
    #[error("primitive {index} has no bounding box")]
    UnboundedPrimitive {
        /// Position of the primitive in the input list.
        index: usize,
    },

    /// More primitives than 32-bit slot offsets can address.
    #[error("{count} primitives exceed the addressable maximum of {max}")]
    TooManyPrimitives {
        /// Number of primitives supplied.
        count: usize,
        /// Largest supported count.
        max: usize,
    },

    /// Invalid build settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The finished hierarchy failed its integrity check.
    #[error("hierarchy failed validation with {} error(s)", .errors.len())]
    Corrupt {
        /// Every problem found.
        errors: Vec<IntegrityError>,
    },
}

/// A structural problem found by [`validate`](crate::validate).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// The node array is empty.
    #[error("hierarchy has no nodes")]
    NoNodes,

    /// The primitive array is empty.
    #[error("hierarchy has no primitives")]
    NoPrimitives,

    /// An inner slot points outside the node array.
    #[error("node {parent} slot {slot} references invalid node index {index}")]
    InvalidNodeIndex {
        /// Node holding the slot.
        parent: usize,
        /// Slot within the node.
        slot: usize,
        /// The offending index.
        index: i32,
    },

    /// A leaf slot's primitive run leaves the primitive array.
    #[error(
        "leaf at node {node} slot {slot} references primitives {start}..{start}+{count} \
         but only {len} exist"
    )]
    InvalidPrimitiveRange {
        /// Node holding the slot.
        node: usize,
        /// Slot within the node.
        slot: usize,
        /// First primitive of the run.
        start: i32,
        /// Length of the run.
        count: i32,
        /// Length of the primitive array.
        len: usize,
    },

    /// Two leaf slots cover the same primitive.
    #[error("primitive {index} is referenced by more than one leaf")]
    PrimitiveReferencedTwice {
        /// The primitive index.
        index: usize,
    },

    /// A node is reachable through more than one slot.
    #[error("node {index} is reachable more than once")]
    NodeVisitedTwice {
        /// The node index.
        index: usize,
    },

    /// A slot that is neither a valid leaf, a valid inner slot nor unused.
    #[error("node {node} slot {slot} is malformed")]
    MalformedSlot {
        /// Node holding the slot.
        node: usize,
        /// Slot within the node.
        slot: usize,
    },

    /// Leaves do not cover the primitive array exactly.
    #[error("{referenced} primitives referenced by leaves, {total} in the primitive array")]
    CountMismatch {
        /// Distinct primitives referenced by leaves.
        referenced: usize,
        /// Length of the primitive array.
        total: usize,
    },

    /// Traversal could need more stack entries than it has.
    #[error("worst-case traversal stack depth {worst_case} exceeds the bound of {bound}")]
    StackBoundExceeded {
        /// Deepest stack any ray could produce.
        worst_case: usize,
        /// Capacity of the traversal stack.
        bound: usize,
    },
}

/// Result type for hierarchy construction.
pub type Result<T> = std::result::Result<T, BuildError>;
