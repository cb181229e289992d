//! Strong type definitions for lazytree.
//!
//! Identifiers are newtypes so arena slots, sibling rows, and payload roles
//! cannot be mixed up at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generational key of a node in the shadow-tree arena.
///
/// The first field is the arena slot, the second the generation stored in
/// that slot when the node was created. A slot is reused after its node is
/// destroyed, but with a bumped generation, so a key issued for a destroyed
/// node never dereferences to its successor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32, pub u32);

impl NodeId {
    /// Create a key from slot and generation.
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self(slot, generation)
    }

    /// Arena slot index.
    pub const fn slot(&self) -> usize {
        self.0 as usize
    }

    /// Generation the slot had when this key was issued.
    pub const fn generation(&self) -> u32 {
        self.1
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.0, self.1)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.0, self.1)
    }
}

/// A stable handle to a cached node, handed out to the consumer.
///
/// Carries the node's sibling row at the time it was issued plus the arena
/// key, so dereferencing is a slot lookup and a generation check. The root
/// sentinel stands for the invisible top of the tree.
///
/// Equality and hashing include the row. An address issued before its node
/// shifted compares unequal to one issued afterwards, even though both
/// dereference to the same node; use [`same_node`](Address::same_node) to
/// compare identities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Address {
    /// The root sentinel. Its children mirror the source's top-level collection.
    #[default]
    Root,
    /// A cached, non-root node.
    Node {
        /// Row within the parent's children when the address was issued.
        row: usize,
        /// Arena key of the node.
        node: NodeId,
    },
}

impl Address {
    /// Whether this is the root sentinel.
    pub fn is_root(&self) -> bool {
        matches!(self, Address::Root)
    }

    /// Row carried by the address (`None` for the root).
    pub fn row(&self) -> Option<usize> {
        match self {
            Address::Root => None,
            Address::Node { row, .. } => Some(*row),
        }
    }

    /// Arena key carried by the address (`None` for the root).
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Address::Root => None,
            Address::Node { node, .. } => Some(*node),
        }
    }

    /// Whether both addresses name the same node, whatever rows they carry.
    pub fn same_node(&self, other: &Address) -> bool {
        self.node() == other.node()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Root => write!(f, "<root>"),
            Address::Node { row, node } => write!(f, "{}@{}", row, node),
        }
    }
}

/// Selects which payload a consumer wants for an item.
///
/// Opaque to the tree core; the source decides what each role means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Primary text shown for the item.
    #[default]
    Display,
    /// Icon or other decoration.
    Decoration,
    /// Hover text.
    ToolTip,
    /// Value used when editing.
    Edit,
    /// Application-defined role.
    User(u32),
}
