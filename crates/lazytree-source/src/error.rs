//! Error types for the source module.

use thiserror::Error;

use crate::memory::ItemId;

/// Errors raised by [`MemorySource`](crate::MemorySource) mutations.
///
/// Queries through the [`Source`](crate::Source) trait never fail; only the
/// mutation API of the in-memory hierarchy reports errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The item is not part of the hierarchy.
    #[error("unknown item: {0}")]
    UnknownItem(ItemId),

    /// Position is past the end of the parent's children.
    #[error("index {index} out of range for {len} children")]
    IndexOutOfRange { index: usize, len: usize },

    /// Moving the item would make it its own ancestor.
    #[error("moving {item} under {parent} would create a cycle")]
    WouldCreateCycle { item: ItemId, parent: ItemId },
}

/// Result type for source mutations.
pub type Result<T> = std::result::Result<T, SourceError>;
