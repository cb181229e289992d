//! Conversion between consumer addresses, cache nodes and source items.

use std::fmt;

use lazytree_core::{Address, NodeId};
use lazytree_source::Source;

use crate::cache::NodeCache;
use crate::error::{Result, SyncError};

/// Default bound on the ancestor walk in [`NodeCache::try_resolve_by_item`].
pub const DEFAULT_MAX_ANCESTOR_DEPTH: usize = 4096;

impl<I> NodeCache<I> {
    /// Address of `id`, or `None` if the key is stale.
    pub fn address_of(&self, id: NodeId) -> Option<Address> {
        if id == self.root() {
            return Some(Address::Root);
        }
        self.node(id).map(|n| Address::Node {
            row: n.position(),
            node: id,
        })
    }

    /// Dereference an address. `None` once the node has been destroyed.
    pub fn node_at(&self, address: Address) -> Option<NodeId> {
        match address {
            Address::Root => Some(self.root()),
            Address::Node { node, .. } => self.is_alive(node).then_some(node),
        }
    }

    /// Address of the parent of `id`; the root sentinel for top-level
    /// nodes and for the root itself.
    pub fn parent_address_of(&self, id: NodeId) -> Option<Address> {
        match self.node(id)?.parent() {
            Some(parent) => self.address_of(parent),
            None => Some(Address::Root),
        }
    }
}

impl<I: Clone + Eq + fmt::Debug> NodeCache<I> {
    /// Locate the cached node mirroring `item`, loading along the way.
    ///
    /// Walks the source's ancestor chain up to the top level, then back
    /// down through the cache by identity, materializing each level.
    pub fn try_resolve_by_item<S>(
        &mut self,
        source: &S,
        item: &I,
        max_depth: usize,
    ) -> Result<NodeId>
    where
        S: Source<Item = I> + ?Sized,
    {
        let mut chain = vec![item.clone()];
        let mut current = item.clone();
        while let Some(parent) = source.parent_of(&current) {
            if parent == current {
                return Err(SyncError::CyclicAncestry {
                    item: format!("{:?}", current),
                });
            }
            if chain.len() >= max_depth {
                return Err(SyncError::AncestryTooDeep { limit: max_depth });
            }
            chain.push(parent.clone());
            current = parent;
        }

        let mut node = self.root();
        for (depth, wanted) in chain.iter().rev().enumerate() {
            self.load_children(source, node);
            node = self
                .find_child(node, wanted)
                .ok_or_else(|| SyncError::ItemNotFound {
                    item: format!("{:?}", wanted),
                    depth,
                })?;
        }
        Ok(node)
    }

    /// Address of the cached node mirroring `item`, or `None` when the
    /// ancestry is cyclic or any level has no cached counterpart.
    pub fn resolve_by_item<S>(&mut self, source: &S, item: &I) -> Option<Address>
    where
        S: Source<Item = I> + ?Sized,
    {
        match self.try_resolve_by_item(source, item, DEFAULT_MAX_ANCESTOR_DEPTH) {
            Ok(id) => self.address_of(id),
            Err(e) => {
                tracing::debug!(error = %e, "item did not resolve");
                None
            }
        }
    }
}
