//! Incremental reconciliation of the shadow tree against the live source.
//!
//! One forward pass over a node's cached children, matching each entry
//! against the live order at or after a monotonically rising floor.
//! Unmatched cached runs are removed as one range; live items skipped over
//! by a match are inserted as one range. Already-materialized children are
//! reconciled recursively, so one call on the root propagates through the
//! whole loaded tree.
//!
//! Algorithm, per node:
//! 1. `unmatched_start` and `live_floor` start at 0.
//! 2. Walk cached rows `cur = 0..=len`; the one-past-end step flushes.
//! 3. Look the row's item up in the source at or after `live_floor`; the
//!    flush step behaves as a match at the live length.
//! 4. On a match, remove cached rows `[unmatched_start, cur)`, insert live
//!    items `[live_floor, live_pos)` in front of the match, raise the floor
//!    past it, and recurse into the match if it is reconcilable.
//! 5. On a miss, leave the row pending.
//!
//! An item that moved to a live position below the floor cannot match: it
//! is reported as removed and re-inserted, never as a move.

use serde::{Deserialize, Serialize};

use lazytree_core::{Address, ModelEvent, NodeId, RowRange};
use lazytree_source::Source;

use crate::cache::NodeCache;
use crate::observer::Observer;

/// Counters from one reconciliation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Nodes whose children were reconciled.
    pub visited_nodes: usize,
    /// Remove brackets emitted.
    pub removed_ranges: usize,
    /// Insert brackets emitted.
    pub inserted_ranges: usize,
    /// Nodes destroyed, including owned subtrees.
    pub removed_nodes: usize,
    /// Nodes created.
    pub inserted_nodes: usize,
}

impl ReconcileStats {
    /// Whether the pass changed nothing structurally.
    pub fn is_noop(&self) -> bool {
        self.removed_ranges == 0 && self.inserted_ranges == 0
    }
}

/// Make the children of `node` match the live children of its item, by
/// identity and order, recursing into every reconcilable child.
///
/// Marks `node` loaded afterwards. A stale `node` is a no-op.
pub fn reconcile<S, O>(
    cache: &mut NodeCache<S::Item>,
    source: &S,
    node: NodeId,
    observer: &mut O,
) -> ReconcileStats
where
    S: Source + ?Sized,
    O: Observer<S::Item> + ?Sized,
{
    let mut stats = ReconcileStats::default();
    reconcile_node(cache, source, node, observer, &mut stats);
    tracing::debug!(
        visited = stats.visited_nodes,
        removed_ranges = stats.removed_ranges,
        inserted_ranges = stats.inserted_ranges,
        removed_nodes = stats.removed_nodes,
        inserted_nodes = stats.inserted_nodes,
        "reconciled"
    );
    stats
}

/// Per-node pass state, kept on an explicit stack so deep chains of
/// materialized nodes do not grow the call stack.
struct Frame<I> {
    node: NodeId,
    address: Address,
    item: Option<I>,
    unmatched_start: usize,
    live_floor: usize,
    cur: usize,
}

impl<I: Clone> Frame<I> {
    fn open(cache: &NodeCache<I>, node: NodeId, stats: &mut ReconcileStats) -> Option<Self> {
        let address = cache.address_of(node)?;
        stats.visited_nodes += 1;
        Some(Self {
            node,
            address,
            item: cache.item(node).cloned(),
            unmatched_start: 0,
            live_floor: 0,
            cur: 0,
        })
    }
}

/// Where a frame stopped: a matched child to reconcile before resuming, or
/// the end of its rows.
enum Step {
    Descend(NodeId),
    Done,
}

fn reconcile_node<S, O>(
    cache: &mut NodeCache<S::Item>,
    source: &S,
    node: NodeId,
    observer: &mut O,
    stats: &mut ReconcileStats,
) where
    S: Source + ?Sized,
    O: Observer<S::Item> + ?Sized,
{
    let Some(mut frame) = Frame::open(cache, node, stats) else {
        tracing::debug!(node = %node, "skipping stale node");
        return;
    };
    let mut suspended = Vec::new();
    loop {
        match advance(cache, source, &mut frame, observer, stats) {
            Step::Descend(child) => {
                if let Some(child_frame) = Frame::open(cache, child, stats) {
                    suspended.push(std::mem::replace(&mut frame, child_frame));
                }
            }
            Step::Done => {
                cache.mark_loaded(frame.node);
                match suspended.pop() {
                    Some(parent) => frame = parent,
                    None => break,
                }
            }
        }
    }
}

/// Run one frame's scan until it matches a reconcilable child or finishes.
fn advance<S, O>(
    cache: &mut NodeCache<S::Item>,
    source: &S,
    frame: &mut Frame<S::Item>,
    observer: &mut O,
    stats: &mut ReconcileStats,
) -> Step
where
    S: Source + ?Sized,
    O: Observer<S::Item> + ?Sized,
{
    loop {
        let len = cache.children_len(frame.node);
        if frame.cur > len {
            return Step::Done;
        }
        let flushing = frame.cur == len;

        let live_pos = if flushing {
            Some(source.item_count(frame.item.as_ref()).max(frame.live_floor))
        } else {
            cache
                .child(frame.node, frame.cur)
                .and_then(|c| cache.item(c))
                .and_then(|item| source.index_of(frame.item.as_ref(), item, frame.live_floor))
        };
        let Some(live_pos) = live_pos else {
            frame.cur += 1;
            continue;
        };

        if frame.cur > frame.unmatched_start {
            remove_rows(
                cache,
                frame.node,
                frame.address,
                frame.unmatched_start,
                frame.cur - 1,
                observer,
                stats,
            );
            frame.cur = frame.unmatched_start;
        }

        if live_pos > frame.live_floor {
            let items: Vec<S::Item> = (frame.live_floor..live_pos)
                .filter_map(|i| source.item_at(frame.item.as_ref(), i))
                .collect();
            frame.cur += insert_rows(cache, frame.node, frame.address, frame.cur, items, observer, stats);
        }
        frame.live_floor = live_pos + 1;

        let mut descend = None;
        if !flushing {
            if let Some(matched) = cache.child(frame.node, frame.cur) {
                if cache.needs_forced_reconciliation(source, matched) {
                    descend = Some(matched);
                }
            }
        }

        frame.unmatched_start = frame.cur + 1;
        frame.cur += 1;
        if let Some(child) = descend {
            return Step::Descend(child);
        }
    }
}

/// Destroy cached rows `first..=last` of `node` inside a remove bracket.
fn remove_rows<I, O>(
    cache: &mut NodeCache<I>,
    node: NodeId,
    parent: Address,
    first: usize,
    last: usize,
    observer: &mut O,
    stats: &mut ReconcileStats,
) where
    O: Observer<I> + ?Sized,
{
    let rows = RowRange { first, last };
    tracing::trace!(parent = %parent, rows = %rows, "removing rows");
    observer.on_event(&ModelEvent::RemoveBegin { parent, rows }, cache);

    let removed: Vec<NodeId> = match cache.children_mut(node) {
        Some(children) => children.drain(first..=last).collect(),
        None => Vec::new(),
    };
    for id in removed {
        stats.removed_nodes += cache.free_subtree(id);
    }
    cache.renumber(node, first);

    observer.on_event(&ModelEvent::RemoveEnd { parent, rows }, cache);
    stats.removed_ranges += 1;
}

/// Create fresh, unloaded nodes for `items` at row `at` of `node` inside an
/// insert bracket. Returns the number of rows inserted.
fn insert_rows<I, O>(
    cache: &mut NodeCache<I>,
    node: NodeId,
    parent: Address,
    at: usize,
    items: Vec<I>,
    observer: &mut O,
    stats: &mut ReconcileStats,
) -> usize
where
    O: Observer<I> + ?Sized,
{
    let count = items.len();
    if count == 0 {
        return 0;
    }
    let rows = RowRange {
        first: at,
        last: at + count - 1,
    };
    tracing::trace!(parent = %parent, rows = %rows, "inserting rows");
    observer.on_event(&ModelEvent::InsertBegin { parent, rows }, cache);

    let created: Vec<NodeId> = items
        .into_iter()
        .enumerate()
        .map(|(offset, item)| cache.alloc(Some(node), Some(item), at + offset))
        .collect();
    if let Some(children) = cache.children_mut(node) {
        children.splice(at..at, created);
    }
    cache.renumber(node, at + count);

    observer.on_event(&ModelEvent::InsertEnd { parent, rows }, cache);
    stats.inserted_ranges += 1;
    stats.inserted_nodes += count;
    count
}
