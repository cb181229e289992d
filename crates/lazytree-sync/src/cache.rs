//! The shadow tree: a generational arena of cached nodes with lazy loading.
//!
//! Ownership runs strictly top-down through each node's `children` list;
//! the `parent` key is a non-owning back-reference. Destroying a node frees
//! its whole subtree and bumps the generation of every freed slot, so keys
//! held by the consumer stop dereferencing instead of aliasing new nodes.

use serde::{Deserialize, Serialize};

use lazytree_core::NodeId;
use lazytree_source::Source;

use crate::error::{Result, SyncError};

/// One cached mirror of one source item.
#[derive(Debug, Clone)]
pub struct Node<I> {
    generation: u32,
    parent: Option<NodeId>,
    position: usize,
    item: Option<I>,
    children: Vec<NodeId>,
    children_loaded: bool,
    presence_probed: bool,
    cached_presence: bool,
    force_reconcile: bool,
}

impl<I> Node<I> {
    fn new(generation: u32, parent: Option<NodeId>, item: Option<I>, position: usize) -> Self {
        Self {
            generation,
            parent,
            position,
            item,
            children: Vec::new(),
            children_loaded: false,
            presence_probed: false,
            cached_presence: false,
            force_reconcile: false,
        }
    }

    /// Owning node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Row within the parent's children.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Source identity, `None` for the root.
    pub fn item(&self) -> Option<&I> {
        self.item.as_ref()
    }

    /// Owned children, in cached order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether `children` mirrors the source.
    pub fn children_loaded(&self) -> bool {
        self.children_loaded
    }

    /// Whether a presence probe has been taken while unloaded.
    pub fn presence_probed(&self) -> bool {
        self.presence_probed
    }

    /// Result of the last presence probe.
    pub fn cached_presence(&self) -> bool {
        self.cached_presence
    }

    /// Whether the next pass must reconcile this node even though its
    /// children were never loaded.
    pub fn force_reconcile(&self) -> bool {
        self.force_reconcile
    }

    /// Whether a reconciliation pass descends into this node.
    pub fn is_reconcilable(&self) -> bool {
        self.children_loaded || self.force_reconcile
    }
}

/// Arena holding the shadow tree.
#[derive(Debug, Clone)]
pub struct NodeCache<I> {
    slots: Vec<Option<Node<I>>>,
    generations: Vec<u32>, // last generation per slot, kept across frees
    free_list: Vec<usize>,
    root: NodeId,
}

impl<I> Default for NodeCache<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> NodeCache<I> {
    /// Create a cache holding only the root sentinel.
    pub fn new() -> Self {
        let mut cache = Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: NodeId::new(0, 0),
        };
        cache.root = cache.alloc(None, None, 0);
        cache
    }

    /// Key of the root sentinel.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether `id` refers to a live node.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Live node for `id`.
    pub fn node(&self, id: NodeId) -> Option<&Node<I>> {
        self.slots
            .get(id.slot())
            .and_then(|s| s.as_ref())
            .filter(|n| n.generation == id.generation())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<I>> {
        self.slots
            .get_mut(id.slot())
            .and_then(|s| s.as_mut())
            .filter(|n| n.generation == id.generation())
    }

    /// Source identity of `id`.
    pub fn item(&self, id: NodeId) -> Option<&I> {
        self.node(id).and_then(|n| n.item.as_ref())
    }

    /// Number of cached children of `id`, without loading.
    pub fn children_len(&self, id: NodeId) -> usize {
        self.node(id).map(|n| n.children.len()).unwrap_or(0)
    }

    /// Cached child of `id` at `row`, without loading.
    pub fn child(&self, id: NodeId, row: usize) -> Option<NodeId> {
        self.node(id).and_then(|n| n.children.get(row).copied())
    }

    /// Number of live non-root nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count() - 1
    }

    /// Whether only the root is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn alloc(
        &mut self,
        parent: Option<NodeId>,
        item: Option<I>,
        position: usize,
    ) -> NodeId {
        let slot = if let Some(slot) = self.free_list.pop() {
            let generation = self.generations[slot].wrapping_add(1);
            self.generations[slot] = generation;
            self.slots[slot] = Some(Node::new(generation, parent, item, position));
            slot
        } else {
            self.slots.push(Some(Node::new(0, parent, item, position)));
            self.generations.push(0);
            self.slots.len() - 1
        };
        NodeId::new(slot as u32, self.generations[slot])
    }

    /// Free `id` and everything it owns. Returns the number of freed nodes.
    ///
    /// Does not unlink `id` from its parent's children list.
    pub(crate) fn free_subtree(&mut self, id: NodeId) -> usize {
        let mut freed = 0;
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            if !self.is_alive(id) {
                continue;
            }
            if let Some(node) = self.slots[id.slot()].take() {
                pending.extend(node.children);
                self.free_list.push(id.slot());
                freed += 1;
            }
        }
        freed
    }

    /// Reassign `position` for every child of `id` from `from` on.
    pub(crate) fn renumber(&mut self, id: NodeId, from: usize) {
        let tail: Vec<NodeId> = match self.node(id) {
            Some(n) => n.children.iter().skip(from).copied().collect(),
            None => return,
        };
        for (offset, child) in tail.into_iter().enumerate() {
            if let Some(node) = self.node_mut(child) {
                node.position = from + offset;
            }
        }
    }

    pub(crate) fn children_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        self.node_mut(id).map(|n| &mut n.children)
    }

    pub(crate) fn mark_loaded(&mut self, id: NodeId) {
        if let Some(node) = self.node_mut(id) {
            node.children_loaded = true;
            node.force_reconcile = false;
        }
    }

    /// Check the position invariant and back-references below the root.
    pub fn validate(&self) -> Result<()> {
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            let node = self.node(id).ok_or(SyncError::StaleNode(id))?;
            for (row, &child) in node.children.iter().enumerate() {
                let c = self.node(child).ok_or(SyncError::StaleNode(child))?;
                if c.position != row {
                    return Err(SyncError::PositionMismatch {
                        parent: id,
                        child,
                        row,
                        recorded: c.position,
                    });
                }
                if c.parent != Some(id) {
                    return Err(SyncError::ParentMismatch {
                        owner: id,
                        child,
                        recorded: c.parent,
                    });
                }
                pending.push(child);
            }
        }
        Ok(())
    }
}

impl<I: Clone> NodeCache<I> {
    /// Nested view of everything materialized below `id`.
    pub fn snapshot(&self, id: NodeId) -> Option<CacheSnapshot<I>> {
        let shell = |node: &Node<I>| CacheSnapshot {
            item: node.item.clone(),
            loaded: node.children_loaded,
            children: Vec::with_capacity(node.children.len()),
        };

        let node = self.node(id)?;
        let mut open = vec![(shell(node), node.children.iter())];
        loop {
            let (_, pending) = open.last_mut()?;
            match pending.next() {
                Some(&child) => {
                    if let Some(node) = self.node(child) {
                        open.push((shell(node), node.children.iter()));
                    }
                }
                None => {
                    let (done, _) = open.pop()?;
                    match open.last_mut() {
                        Some((parent, _)) => parent.children.push(done),
                        None => return Some(done),
                    }
                }
            }
        }
    }
}

impl<I: Clone + Eq> NodeCache<I> {
    /// Materialize the children of `id` from the source, once.
    pub fn load_children<S>(&mut self, source: &S, id: NodeId)
    where
        S: Source<Item = I> + ?Sized,
    {
        let parent_item = match self.node(id) {
            Some(node) if !node.children_loaded => node.item.clone(),
            _ => return,
        };

        let count = source.item_count(parent_item.as_ref());
        let mut children = Vec::with_capacity(count);
        for index in 0..count {
            if let Some(item) = source.item_at(parent_item.as_ref(), index) {
                let position = children.len();
                children.push(self.alloc(Some(id), Some(item), position));
            }
        }

        tracing::trace!(node = %id, count = children.len(), "loaded children");
        if let Some(node) = self.node_mut(id) {
            node.children = children;
        }
        self.mark_loaded(id);
    }

    /// Number of children of `id`, loading them first if needed.
    pub fn child_count<S>(&mut self, source: &S, id: NodeId) -> usize
    where
        S: Source<Item = I> + ?Sized,
    {
        self.load_children(source, id);
        self.children_len(id)
    }

    /// Whether `id` has children, probing the source cheaply if they are
    /// not loaded. The probe result is remembered.
    pub fn has_presence<S>(&mut self, source: &S, id: NodeId) -> bool
    where
        S: Source<Item = I> + ?Sized,
    {
        let item = match self.node(id) {
            Some(node) if node.children_loaded => return !node.children.is_empty(),
            Some(node) => node.item.clone(),
            None => return false,
        };

        let present = source.has_items(item.as_ref());
        if let Some(node) = self.node_mut(id) {
            node.presence_probed = true;
            node.cached_presence = present;
        }
        present
    }

    /// Whether a reconciliation pass must descend into `id`.
    ///
    /// Loaded nodes always qualify. An unloaded node qualifies when an
    /// earlier presence probe no longer matches the source; in that case
    /// the node is flagged so the pass discovers its new children instead
    /// of trusting the stale probe.
    pub fn needs_forced_reconciliation<S>(&mut self, source: &S, id: NodeId) -> bool
    where
        S: Source<Item = I> + ?Sized,
    {
        let item = match self.node(id) {
            Some(node) if node.is_reconcilable() => return true,
            Some(node) if node.presence_probed => node.item.clone(),
            _ => return false,
        };

        let cached = self.node(id).map(|n| n.cached_presence).unwrap_or(false);
        if source.has_items(item.as_ref()) == cached {
            return false;
        }
        if let Some(node) = self.node_mut(id) {
            node.force_reconcile = true;
        }
        true
    }

    /// First cached child of `id` whose identity equals `item`.
    pub fn find_child(&self, id: NodeId, item: &I) -> Option<NodeId> {
        let node = self.node(id)?;
        node.children
            .iter()
            .copied()
            .find(|&c| self.item(c) == Some(item))
    }
}

/// Serializable nested view of the materialized cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot<I> {
    /// Source identity (`None` for the root).
    pub item: Option<I>,
    /// Whether the node's children were materialized.
    pub loaded: bool,
    /// Materialized children, in cached order.
    pub children: Vec<CacheSnapshot<I>>,
}

impl<I: Clone> CacheSnapshot<I> {
    /// Identities of the direct children.
    pub fn child_items(&self) -> Vec<I> {
        self.children.iter().filter_map(|c| c.item.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazytree_source::{ItemId, MemorySource};

    fn sample() -> (MemorySource, ItemId, ItemId) {
        let src = MemorySource::new();
        let a = src.push(None, "a").unwrap();
        let b = src.push(None, "b").unwrap();
        src.push(Some(a), "a1").unwrap();
        src.push(Some(a), "a2").unwrap();
        (src, a, b)
    }

    #[test]
    fn test_new_cache_has_only_root() {
        let cache: NodeCache<ItemId> = NodeCache::new();
        assert!(cache.is_empty());
        assert!(cache.is_alive(cache.root()));
        assert_eq!(cache.item(cache.root()), None);
        assert!(cache.node(cache.root()).unwrap().parent().is_none());
    }

    #[test]
    fn test_load_children_once() {
        let (src, a, b) = sample();
        let mut cache = NodeCache::new();
        let root = cache.root();

        cache.load_children(&src, root);
        assert_eq!(cache.children_len(root), 2);
        let first = cache.child(root, 0).unwrap();
        assert_eq!(cache.item(first), Some(&a));
        assert_eq!(cache.item(cache.child(root, 1).unwrap()), Some(&b));
        assert_eq!(cache.node(first).unwrap().position(), 0);

        // Already loaded: a source change is not picked up by loading.
        src.push(None, "c").unwrap();
        cache.load_children(&src, root);
        assert_eq!(cache.children_len(root), 2);
        assert_eq!(cache.child_count(&src, root), 2);
        cache.validate().unwrap();
    }

    #[test]
    fn test_has_presence_probe_does_not_load() {
        let (src, _, _) = sample();
        let mut cache = NodeCache::new();
        let root = cache.root();
        cache.load_children(&src, root);
        let a = cache.child(root, 0).unwrap();
        let b = cache.child(root, 1).unwrap();

        assert!(cache.has_presence(&src, a));
        assert!(!cache.has_presence(&src, b));
        let node_a = cache.node(a).unwrap();
        assert!(node_a.presence_probed());
        assert!(node_a.cached_presence());
        assert!(!node_a.children_loaded());
        assert_eq!(cache.children_len(a), 0);
    }

    #[test]
    fn test_has_presence_uses_loaded_children() {
        let (src, a_item, _) = sample();
        let mut cache = NodeCache::new();
        let root = cache.root();
        cache.load_children(&src, root);
        let a = cache.child(root, 0).unwrap();
        assert_eq!(cache.child_count(&src, a), 2);

        // Source drops every child; the loaded cache still answers.
        for child in src.children(Some(a_item)) {
            src.remove(child).unwrap();
        }
        assert!(cache.has_presence(&src, a));
        assert!(!cache.node(a).unwrap().presence_probed());
    }

    #[test]
    fn test_forced_reconciliation_on_stale_probe() {
        let (src, _, b_item) = sample();
        let mut cache = NodeCache::new();
        let root = cache.root();
        cache.load_children(&src, root);
        let b = cache.child(root, 1).unwrap();

        // Never probed: nothing to correct.
        assert!(!cache.needs_forced_reconciliation(&src, b));

        assert!(!cache.has_presence(&src, b));
        assert!(!cache.needs_forced_reconciliation(&src, b));

        src.push(Some(b_item), "b1").unwrap();
        assert!(cache.needs_forced_reconciliation(&src, b));
        let node = cache.node(b).unwrap();
        assert!(node.force_reconcile());
        assert!(!node.children_loaded());
        // Stays flagged until a pass clears it.
        assert!(cache.needs_forced_reconciliation(&src, b));
    }

    #[test]
    fn test_loaded_nodes_always_reconcilable() {
        let (src, _, _) = sample();
        let mut cache = NodeCache::new();
        let root = cache.root();
        assert!(!cache.needs_forced_reconciliation(&src, root));
        cache.load_children(&src, root);
        assert!(cache.needs_forced_reconciliation(&src, root));
    }

    #[test]
    fn test_free_subtree_bumps_generation() {
        let (src, _, _) = sample();
        let mut cache = NodeCache::new();
        let root = cache.root();
        cache.load_children(&src, root);
        let a = cache.child(root, 0).unwrap();
        cache.load_children(&src, a);
        assert_eq!(cache.len(), 4);

        if let Some(children) = cache.children_mut(root) {
            children.remove(0);
        }
        assert_eq!(cache.free_subtree(a), 3);
        cache.renumber(root, 0);
        assert!(!cache.is_alive(a));
        assert_eq!(cache.len(), 1);
        cache.validate().unwrap();

        let reused = cache.alloc(Some(root), None, 1);
        assert_ne!(reused, a);
        assert!(!cache.is_alive(a));
    }

    #[test]
    fn test_validate_detects_position_mismatch() {
        let (src, _, _) = sample();
        let mut cache = NodeCache::new();
        let root = cache.root();
        cache.load_children(&src, root);
        let b = cache.child(root, 1).unwrap();
        cache.node_mut(b).unwrap().position = 5;
        assert!(matches!(
            cache.validate(),
            Err(SyncError::PositionMismatch { row: 1, recorded: 5, .. })
        ));
    }

    #[test]
    fn test_snapshot_reflects_materialized_prefix() {
        let (src, a, b) = sample();
        let mut cache = NodeCache::new();
        let root = cache.root();
        cache.load_children(&src, root);

        let snap = cache.snapshot(root).unwrap();
        assert!(snap.loaded);
        assert_eq!(snap.child_items(), vec![a, b]);
        assert!(snap.children.iter().all(|c| !c.loaded && c.children.is_empty()));

        let json = serde_json::to_string(&snap).unwrap();
        let back: CacheSnapshot<ItemId> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }

    /// Load a single-child chain from the top level down, without recursion.
    fn load_chain(cache: &mut NodeCache<ItemId>, src: &MemorySource) -> NodeId {
        let mut node = cache.root();
        loop {
            cache.load_children(src, node);
            match cache.child(node, 0) {
                Some(child) => node = child,
                None => return node,
            }
        }
    }

    #[test]
    fn test_snapshot_keeps_sibling_order_below_nested_nodes() {
        let (src, a, b) = sample();
        let mut cache = NodeCache::new();
        let root = cache.root();
        cache.load_children(&src, root);
        let a_node = cache.child(root, 0).unwrap();
        cache.load_children(&src, a_node);

        let snap = cache.snapshot(root).unwrap();
        assert_eq!(snap.child_items(), vec![a, b]);
        assert_eq!(snap.children[0].child_items(), src.children(Some(a)));
        assert!(snap.children[0].loaded);
        assert!(!snap.children[1].loaded);
    }

    #[test]
    fn test_snapshot_of_deep_chain() {
        const DEPTH: usize = 50_000;
        let src = MemorySource::new();
        let mut parent = None;
        for i in 0..DEPTH {
            parent = Some(src.push(parent, format!("n{}", i)).unwrap());
        }
        let mut cache = NodeCache::new();
        let deepest = load_chain(&mut cache, &src);
        assert_eq!(cache.item(deepest), parent.as_ref());

        // Unwind level by level so dropping the snapshot stays shallow too.
        let mut level = cache.snapshot(cache.root()).unwrap();
        let mut depth = 0;
        while let Some(next) = level.children.pop() {
            depth += 1;
            level = next;
        }
        assert_eq!(depth, DEPTH);
        assert_eq!(level.item, parent);
    }

    #[test]
    fn test_find_child_by_identity() {
        let (src, _, b) = sample();
        let mut cache = NodeCache::new();
        let root = cache.root();
        cache.load_children(&src, root);
        assert_eq!(cache.find_child(root, &b), cache.child(root, 1));
        assert_eq!(cache.find_child(root, &ItemId(999)), None);
    }
}
