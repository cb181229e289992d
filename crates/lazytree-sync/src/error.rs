//! Error types for the sync module.

use thiserror::Error;

use lazytree_core::NodeId;

/// Errors reported by cache lookups, address resolution and validation.
///
/// None of these abort a reconciliation pass; the engine itself reports
/// boundary conditions as return values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    /// The source reported an item as its own parent.
    #[error("cyclic ancestry at item {item}")]
    CyclicAncestry { item: String },

    /// The ancestor chain did not reach the top level within the limit.
    #[error("ancestor chain longer than {limit}")]
    AncestryTooDeep { limit: usize },

    /// An item on the ancestor chain has no cached counterpart.
    #[error("item {item} not found at depth {depth}")]
    ItemNotFound { item: String, depth: usize },

    /// The node key no longer refers to a live node.
    #[error("stale node key: {0:?}")]
    StaleNode(NodeId),

    /// A child's recorded position differs from its slot.
    #[error("child {child:?} of {parent:?} sits at row {row} but records position {recorded}")]
    PositionMismatch {
        parent: NodeId,
        child: NodeId,
        row: usize,
        recorded: usize,
    },

    /// A child's back-reference does not point at its owner.
    #[error("child {child:?} is owned by {owner:?} but points at {recorded:?}")]
    ParentMismatch {
        owner: NodeId,
        child: NodeId,
        recorded: Option<NodeId>,
    },
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
