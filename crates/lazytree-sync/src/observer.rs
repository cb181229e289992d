//! Observer seam: how structural notifications reach the consumer.
//!
//! An observer sees each [`ModelEvent`] together with a read-only view of
//! the cache at that instant, so a view can inspect the shadow tree between
//! the two halves of a bracket without calling back into the model.

use lazytree_core::ModelEvent;

use crate::cache::NodeCache;

/// Receiver of model notifications.
///
/// Implementations must not call back into the model; everything they may
/// need is reachable through the `cache` argument.
pub trait Observer<I> {
    /// Handle one event.
    fn on_event(&mut self, event: &ModelEvent, cache: &NodeCache<I>);
}

impl<I, F> Observer<I> for F
where
    F: FnMut(&ModelEvent, &NodeCache<I>),
{
    fn on_event(&mut self, event: &ModelEvent, cache: &NodeCache<I>) {
        self(event, cache)
    }
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl<I> Observer<I> for NoopObserver {
    fn on_event(&mut self, _event: &ModelEvent, _cache: &NodeCache<I>) {}
}

/// Fan-out to any number of observers, in subscription order.
pub struct ObserverSet<I> {
    observers: Vec<Box<dyn Observer<I>>>,
}

impl<I> ObserverSet<I> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Add an observer.
    pub fn subscribe(&mut self, observer: Box<dyn Observer<I>>) {
        self.observers.push(observer);
    }

    /// Move every observer of `other` to the end of this set.
    pub fn append(&mut self, mut other: ObserverSet<I>) {
        self.observers.append(&mut other.observers);
    }

    /// Number of subscribed observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl<I> Default for ObserverSet<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> Observer<I> for ObserverSet<I> {
    fn on_event(&mut self, event: &ModelEvent, cache: &NodeCache<I>) {
        for observer in &mut self.observers {
            observer.on_event(event, cache);
        }
    }
}
