//! Structural change notifications delivered to the consumer.
//!
//! Every insert and remove is bracketed: a `*Begin` event is emitted before
//! the shadow tree changes and the matching `*End` event right after, so a
//! view can snapshot state on one side and repaint on the other.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::types::Address;

/// An inclusive range of sibling rows, `first..=last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowRange {
    pub first: usize,
    pub last: usize,
}

impl RowRange {
    /// Create a range; `first` must not exceed `last`.
    pub fn new(first: usize, last: usize) -> Result<Self> {
        if first > last {
            return Err(CoreError::EmptyRange { first, last });
        }
        Ok(Self { first, last })
    }

    /// Create a range of `len` rows starting at `first`.
    pub fn with_len(first: usize, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(CoreError::ZeroLength(first));
        }
        Ok(Self {
            first,
            last: first + len - 1,
        })
    }

    /// A single row.
    pub const fn single(row: usize) -> Self {
        Self {
            first: row,
            last: row,
        }
    }

    /// Number of rows covered.
    pub const fn len(&self) -> usize {
        self.last - self.first + 1
    }

    /// Always false; ranges cover at least one row.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Whether `row` falls inside the range.
    pub const fn contains(&self, row: usize) -> bool {
        row >= self.first && row <= self.last
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.first, self.last)
    }
}

/// A notification from the tree model to its consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelEvent {
    /// Rows under `parent` are about to be destroyed.
    RemoveBegin { parent: Address, rows: RowRange },
    /// Rows under `parent` are gone; addresses into them no longer dereference.
    RemoveEnd { parent: Address, rows: RowRange },
    /// Rows are about to be created under `parent`.
    InsertBegin { parent: Address, rows: RowRange },
    /// Rows now exist under `parent`; their addresses are valid from here on.
    InsertEnd { parent: Address, rows: RowRange },
    /// Every cached payload is dirty. Previously issued addresses stay valid.
    FullRefresh,
}

impl ModelEvent {
    /// Parent address for structural events.
    pub fn parent(&self) -> Option<Address> {
        match self {
            ModelEvent::RemoveBegin { parent, .. }
            | ModelEvent::RemoveEnd { parent, .. }
            | ModelEvent::InsertBegin { parent, .. }
            | ModelEvent::InsertEnd { parent, .. } => Some(*parent),
            ModelEvent::FullRefresh => None,
        }
    }

    /// Row range for structural events.
    pub fn rows(&self) -> Option<RowRange> {
        match self {
            ModelEvent::RemoveBegin { rows, .. }
            | ModelEvent::RemoveEnd { rows, .. }
            | ModelEvent::InsertBegin { rows, .. }
            | ModelEvent::InsertEnd { rows, .. } => Some(*rows),
            ModelEvent::FullRefresh => None,
        }
    }

    /// Whether this opens a bracket.
    pub fn is_begin(&self) -> bool {
        matches!(
            self,
            ModelEvent::RemoveBegin { .. } | ModelEvent::InsertBegin { .. }
        )
    }

    /// Whether this closes a bracket.
    pub fn is_end(&self) -> bool {
        matches!(
            self,
            ModelEvent::RemoveEnd { .. } | ModelEvent::InsertEnd { .. }
        )
    }

    /// Whether this is part of a remove bracket.
    pub fn is_remove(&self) -> bool {
        matches!(
            self,
            ModelEvent::RemoveBegin { .. } | ModelEvent::RemoveEnd { .. }
        )
    }

    /// Whether this is part of an insert bracket.
    pub fn is_insert(&self) -> bool {
        matches!(
            self,
            ModelEvent::InsertBegin { .. } | ModelEvent::InsertEnd { .. }
        )
    }
}
