//! In-memory implementation of the Source trait.
//!
//! A mutable labelled hierarchy, used by tests, benchmarks and demos. It
//! answers every query of [`Source`] and adds a mutation API on top.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use lazytree_core::Role;

use crate::error::{Result, SourceError};
use crate::traits::{Source, UpdateSink};

/// Identity token of an item in a [`MemorySource`].
///
/// Ids are never reused within one source, so a removed item cannot be
/// confused with a later one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// In-memory hierarchy.
///
/// Single-threaded: interior mutability through `RefCell`, matching the
/// cooperative model that consumes it. No borrow is held across a call
/// into the attached [`UpdateSink`].
pub struct MemorySource {
    inner: RefCell<MemorySourceInner>,
    sink: RefCell<Option<Rc<dyn UpdateSink>>>,
}

#[derive(Default)]
struct MemorySourceInner {
    /// Top-level items, in order.
    top: Vec<ItemId>,

    /// Every live item.
    entries: HashMap<ItemId, Entry>,

    /// Next id to hand out.
    next_id: u64,
}

struct Entry {
    parent: Option<ItemId>,
    label: String,
    children: Vec<ItemId>,
}

impl MemorySourceInner {
    fn siblings(&self, parent: Option<ItemId>) -> Result<&Vec<ItemId>> {
        match parent {
            None => Ok(&self.top),
            Some(p) => self
                .entries
                .get(&p)
                .map(|e| &e.children)
                .ok_or(SourceError::UnknownItem(p)),
        }
    }

    fn siblings_mut(&mut self, parent: Option<ItemId>) -> Result<&mut Vec<ItemId>> {
        match parent {
            None => Ok(&mut self.top),
            Some(p) => self
                .entries
                .get_mut(&p)
                .map(|e| &mut e.children)
                .ok_or(SourceError::UnknownItem(p)),
        }
    }

    fn detach(&mut self, item: ItemId) -> Result<Option<ItemId>> {
        let parent = self
            .entries
            .get(&item)
            .ok_or(SourceError::UnknownItem(item))?
            .parent;
        self.siblings_mut(parent)?.retain(|&c| c != item);
        Ok(parent)
    }

    fn drop_subtree(&mut self, item: ItemId) {
        let mut pending = vec![item];
        while let Some(id) = pending.pop() {
            if let Some(entry) = self.entries.remove(&id) {
                pending.extend(entry.children);
            }
        }
    }

    fn is_ancestor(&self, ancestor: ItemId, mut item: ItemId) -> bool {
        loop {
            if item == ancestor {
                return true;
            }
            match self.entries.get(&item).and_then(|e| e.parent) {
                Some(p) => item = p,
                None => return false,
            }
        }
    }
}

impl MemorySource {
    /// Create an empty hierarchy.
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(MemorySourceInner::default()),
            sink: RefCell::new(None),
        }
    }

    /// Append a new item under `parent`.
    pub fn push(&self, parent: Option<ItemId>, label: impl Into<String>) -> Result<ItemId> {
        let len = self.inner.borrow().siblings(parent)?.len();
        self.insert(parent, len, label)
    }

    /// Insert a new item under `parent` at `index`.
    pub fn insert(
        &self,
        parent: Option<ItemId>,
        index: usize,
        label: impl Into<String>,
    ) -> Result<ItemId> {
        let mut inner = self.inner.borrow_mut();
        let id = ItemId(inner.next_id);
        let siblings = inner.siblings_mut(parent)?;
        if index > siblings.len() {
            return Err(SourceError::IndexOutOfRange {
                index,
                len: siblings.len(),
            });
        }
        siblings.insert(index, id);
        inner.next_id += 1;
        inner.entries.insert(
            id,
            Entry {
                parent,
                label: label.into(),
                children: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Remove `item` and everything below it.
    pub fn remove(&self, item: ItemId) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.detach(item)?;
        inner.drop_subtree(item);
        Ok(())
    }

    /// Move `item` (with its subtree) under `new_parent` at `index`.
    ///
    /// `index` is interpreted after `item` has been taken out of its old
    /// position.
    pub fn move_item(&self, item: ItemId, new_parent: Option<ItemId>, index: usize) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if !inner.entries.contains_key(&item) {
            return Err(SourceError::UnknownItem(item));
        }
        if let Some(p) = new_parent {
            if !inner.entries.contains_key(&p) {
                return Err(SourceError::UnknownItem(p));
            }
            if inner.is_ancestor(item, p) {
                return Err(SourceError::WouldCreateCycle { item, parent: p });
            }
        }

        let old_parent = inner.entries.get(&item).and_then(|e| e.parent);
        let mut len = inner.siblings(new_parent)?.len();
        if old_parent == new_parent {
            len -= 1;
        }
        if index > len {
            return Err(SourceError::IndexOutOfRange { index, len });
        }

        inner.detach(item)?;
        inner.siblings_mut(new_parent)?.insert(index, item);
        if let Some(entry) = inner.entries.get_mut(&item) {
            entry.parent = new_parent;
        }
        Ok(())
    }

    /// Replace the label of `item`.
    pub fn set_label(&self, item: ItemId, label: impl Into<String>) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        let entry = inner
            .entries
            .get_mut(&item)
            .ok_or(SourceError::UnknownItem(item))?;
        entry.label = label.into();
        Ok(())
    }

    /// Label of `item`, if it exists.
    pub fn label(&self, item: ItemId) -> Option<String> {
        self.inner
            .borrow()
            .entries
            .get(&item)
            .map(|e| e.label.clone())
    }

    /// Children of `parent` in order (empty for unknown parents).
    pub fn children(&self, parent: Option<ItemId>) -> Vec<ItemId> {
        self.inner
            .borrow()
            .siblings(parent)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `item` is part of the hierarchy.
    pub fn contains(&self, item: ItemId) -> bool {
        self.inner.borrow().entries.contains_key(&item)
    }

    /// Total number of items.
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Whether the hierarchy is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// First item in depth-first order carrying `label`.
    pub fn find(&self, label: &str) -> Option<ItemId> {
        let inner = self.inner.borrow();
        let mut pending: Vec<ItemId> = inner.top.iter().rev().copied().collect();
        while let Some(id) = pending.pop() {
            let entry = inner.entries.get(&id)?;
            if entry.label == label {
                return Some(id);
            }
            pending.extend(entry.children.iter().rev().copied());
        }
        None
    }

    /// Run `f` inside a mutation window on the attached model.
    ///
    /// Without an attached model this simply runs `f`.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let sink = self.sink.borrow().clone();
        if let Some(sink) = &sink {
            sink.begin_update();
        }
        let out = f(self);
        if let Some(sink) = &sink {
            sink.end_update();
        }
        out
    }

    /// Ask the attached model for a deferred reconciliation.
    pub fn notify_changed(&self) {
        let sink = self.sink.borrow().clone();
        match sink {
            Some(sink) => sink.queue_update(),
            None => tracing::trace!("notify_changed without an attached model"),
        }
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for MemorySource {
    type Item = ItemId;
    type Value = String;

    fn has_items(&self, parent: Option<&ItemId>) -> bool {
        self.inner
            .borrow()
            .siblings(parent.copied())
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    }

    fn item_count(&self, parent: Option<&ItemId>) -> usize {
        self.inner
            .borrow()
            .siblings(parent.copied())
            .map(|s| s.len())
            .unwrap_or(0)
    }

    fn item_at(&self, parent: Option<&ItemId>, index: usize) -> Option<ItemId> {
        self.inner
            .borrow()
            .siblings(parent.copied())
            .ok()
            .and_then(|s| s.get(index).copied())
    }

    fn index_of(&self, parent: Option<&ItemId>, item: &ItemId, from: usize) -> Option<usize> {
        let inner = self.inner.borrow();
        let siblings = inner.siblings(parent.copied()).ok()?;
        siblings
            .iter()
            .skip(from)
            .position(|c| c == item)
            .map(|p| p + from)
    }

    fn parent_of(&self, item: &ItemId) -> Option<ItemId> {
        self.inner.borrow().entries.get(item).and_then(|e| e.parent)
    }

    fn data(&self, item: &ItemId, role: Role) -> String {
        let inner = self.inner.borrow();
        let Some(entry) = inner.entries.get(item) else {
            return String::new();
        };
        match role {
            Role::Display | Role::Edit => entry.label.clone(),
            Role::ToolTip => format!("{} ({})", entry.label, item),
            Role::Decoration | Role::User(_) => String::new(),
        }
    }

    fn attach(&self, sink: Rc<dyn UpdateSink>) {
        *self.sink.borrow_mut() = Some(sink);
    }
}
