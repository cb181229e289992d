//! Proptest generators for property-based testing.
//!
//! Mutations pick their targets by index into the current item set, so any
//! generated sequence applies to any source.

use proptest::prelude::*;

use lazytree_source::{ItemId, MemorySource, SourceExt};

use crate::fixtures::Outline;

/// One structural edit of a [`MemorySource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Append a new item.
    Push { parent: usize, label: String },
    /// Insert a new item at a chosen position.
    Insert {
        parent: usize,
        index: usize,
        label: String,
    },
    /// Remove an item and its subtree.
    Remove { target: usize },
    /// Move an item (with its subtree) to a new parent and position.
    Move {
        target: usize,
        parent: usize,
        index: usize,
    },
    /// Reverse the children of one parent.
    Reverse { parent: usize },
}

/// Generate a label.
pub fn label() -> impl Strategy<Value = String> {
    "[a-z]{1,6}".prop_map(String::from)
}

/// Generate one mutation.
pub fn mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        3 => (any::<usize>(), label()).prop_map(|(parent, label)| Mutation::Push { parent, label }),
        2 => (any::<usize>(), any::<usize>(), label())
            .prop_map(|(parent, index, label)| Mutation::Insert { parent, index, label }),
        2 => any::<usize>().prop_map(|target| Mutation::Remove { target }),
        2 => (any::<usize>(), any::<usize>(), any::<usize>())
            .prop_map(|(target, parent, index)| Mutation::Move { target, parent, index }),
        1 => any::<usize>().prop_map(|parent| Mutation::Reverse { parent }),
    ]
}

/// Generate up to `max` mutations.
pub fn mutations(max: usize) -> impl Strategy<Value = Vec<Mutation>> {
    prop::collection::vec(mutation(), 0..=max)
}

/// Generate a small outline, at most `depth` levels deep.
pub fn outline(depth: u32) -> impl Strategy<Value = Vec<Outline>> {
    let leaf = label().prop_map(Outline::leaf);
    let tree = leaf.prop_recursive(depth, 32, 4, |inner| {
        (label(), prop::collection::vec(inner, 0..4))
            .prop_map(|(label, children)| Outline::node(label, children))
    });
    prop::collection::vec(tree, 0..6)
}

/// Every item in `source`, in identity order.
fn all_items(source: &MemorySource) -> Vec<ItemId> {
    let mut all = Vec::new();
    let mut pending = source.children_of(None);
    while let Some(item) = pending.pop() {
        pending.extend(source.children_of(Some(&item)));
        all.push(item);
    }
    all.sort();
    all
}

/// Resolve a pick to an existing item, or to the top level when it lands
/// one past the end.
fn pick_parent(items: &[ItemId], pick: usize) -> Option<ItemId> {
    items.get(pick % (items.len() + 1)).copied()
}

fn pick_index(source: &MemorySource, parent: Option<ItemId>, pick: usize) -> usize {
    pick % (source.children(parent).len() + 1)
}

/// Apply `mutation` to `source`. Returns whether the source changed.
///
/// Edits the source rejects (cycles, missing targets) are skipped.
pub fn apply(source: &MemorySource, mutation: &Mutation) -> bool {
    let items = all_items(source);
    match mutation {
        Mutation::Push { parent, label } => source
            .push(pick_parent(&items, *parent), label.clone())
            .is_ok(),
        Mutation::Insert {
            parent,
            index,
            label,
        } => {
            let parent = pick_parent(&items, *parent);
            let index = pick_index(source, parent, *index);
            source.insert(parent, index, label.clone()).is_ok()
        }
        Mutation::Remove { target } => match items.get(target % items.len().max(1)) {
            Some(&item) => source.remove(item).is_ok(),
            None => false,
        },
        Mutation::Move {
            target,
            parent,
            index,
        } => {
            let Some(&item) = items.get(target % items.len().max(1)) else {
                return false;
            };
            let parent = pick_parent(&items, *parent);
            // Positions are counted after the item leaves its old place.
            let siblings = source.children(parent).len() - usize::from(source.children(parent).contains(&item));
            source.move_item(item, parent, index % (siblings + 1)).is_ok()
        }
        Mutation::Reverse { parent } => {
            let parent = pick_parent(&items, *parent);
            let children = source.children(parent);
            if children.len() < 2 {
                return false;
            }
            for (at, item) in children.into_iter().rev().enumerate() {
                if source.move_item(item, parent, at).is_err() {
                    return false;
                }
            }
            true
        }
    }
}

/// Apply every mutation in order. Returns how many changed the source.
pub fn apply_all(source: &MemorySource, mutations: &[Mutation]) -> usize {
    mutations.iter().filter(|m| apply(source, m)).count()
}
