//! Source trait: the abstract interface over the live hierarchy.
//!
//! This trait keeps the model storage-agnostic. The model only ever asks
//! the questions below; it never owns or inspects the items it mirrors.

use std::fmt;
use std::rc::Rc;

use lazytree_core::Role;

/// Handle a source uses to tell the model that the hierarchy is changing.
///
/// Handed to the source by [`Source::attach`] when a model is built on it.
/// Calls must come from outside a reconciliation pass.
pub trait UpdateSink {
    /// Open a (possibly nested) mutation window.
    fn begin_update(&self);

    /// Close a mutation window; closing the outermost one reconciles.
    fn end_update(&self);

    /// Open a window now and close it from a deferred task, unless a
    /// window is already open or queued.
    fn queue_update(&self);
}

/// The live, externally-owned hierarchy a model mirrors.
///
/// `parent = None` addresses the top-level collection. All queries are
/// total: absence is reported with `None` or a default value.
///
/// # Design Notes
///
/// - **Identity**: `Item` equality defines "the same logical item" across
///   reconciliation passes. Items must be unique among siblings.
/// - **Cheap presence**: [`has_items`](Source::has_items) should be cheaper
///   than counting; the model calls it for nodes it has not loaded yet.
pub trait Source {
    /// Opaque identity token for one item.
    type Item: Clone + Eq + fmt::Debug;

    /// Payload returned by [`data`](Source::data).
    type Value: Default;

    /// Whether `parent` has any children, without materializing them.
    fn has_items(&self, parent: Option<&Self::Item>) -> bool;

    /// Number of live children under `parent`.
    fn item_count(&self, parent: Option<&Self::Item>) -> usize;

    /// Child of `parent` at `index`, or `None` past the end.
    fn item_at(&self, parent: Option<&Self::Item>, index: usize) -> Option<Self::Item>;

    /// First position at or after `from` under `parent` holding `item`.
    ///
    /// The default is a linear scan over [`item_at`](Source::item_at);
    /// sources with an index should override it.
    fn index_of(
        &self,
        parent: Option<&Self::Item>,
        item: &Self::Item,
        from: usize,
    ) -> Option<usize> {
        let count = self.item_count(parent);
        (from..count).find(|&i| self.item_at(parent, i).as_ref() == Some(item))
    }

    /// Parent of `item`, or `None` for top-level items.
    ///
    /// Returning `item` itself signals a cycle.
    fn parent_of(&self, item: &Self::Item) -> Option<Self::Item>;

    /// Payload of `item` for `role`.
    fn data(&self, item: &Self::Item, role: Role) -> Self::Value;

    /// Receive the model's update handle.
    fn attach(&self, _sink: Rc<dyn UpdateSink>) {}
}

/// Extension helpers available on every [`Source`].
pub trait SourceExt: Source {
    /// All live children of `parent`, in order.
    fn children_of(&self, parent: Option<&Self::Item>) -> Vec<Self::Item> {
        let count = self.item_count(parent);
        (0..count).filter_map(|i| self.item_at(parent, i)).collect()
    }
}

impl<S: Source + ?Sized> SourceExt for S {}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat source of `0..n`, each item being its own position.
    struct Flat(usize);

    impl Source for Flat {
        type Item = usize;
        type Value = String;

        fn has_items(&self, parent: Option<&usize>) -> bool {
            parent.is_none() && self.0 > 0
        }

        fn item_count(&self, parent: Option<&usize>) -> usize {
            if parent.is_none() {
                self.0
            } else {
                0
            }
        }

        fn item_at(&self, parent: Option<&usize>, index: usize) -> Option<usize> {
            (parent.is_none() && index < self.0).then_some(index)
        }

        fn parent_of(&self, _item: &usize) -> Option<usize> {
            None
        }

        fn data(&self, item: &usize, _role: Role) -> String {
            item.to_string()
        }
    }

    #[test]
    fn test_default_index_of_respects_floor() {
        let src = Flat(5);
        assert_eq!(src.index_of(None, &3, 0), Some(3));
        assert_eq!(src.index_of(None, &3, 3), Some(3));
        assert_eq!(src.index_of(None, &3, 4), None);
        assert_eq!(src.index_of(None, &9, 0), None);
    }

    #[test]
    fn test_children_of() {
        let src = Flat(3);
        assert_eq!(src.children_of(None), vec![0, 1, 2]);
        assert!(src.children_of(Some(&1)).is_empty());
    }
}
