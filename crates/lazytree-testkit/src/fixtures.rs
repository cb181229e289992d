//! Test fixtures and helpers.
//!
//! Common setup code for unit and integration tests.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use lazytree_core::{ModelEvent, Role};
use lazytree_source::{ItemId, MemorySource, Source, SourceExt};
use lazytree_sync::{NodeCache, Observer};

/// Install a fmt subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// A labelled subtree, used to describe source contents declaratively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Outline>,
}

impl Outline {
    /// A childless entry.
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    /// An entry with children.
    pub fn node(label: impl Into<String>, children: Vec<Outline>) -> Self {
        Self {
            label: label.into(),
            children,
        }
    }
}

/// Append `outline` under `parent`, depth first.
///
/// # Panics
///
/// Panics if `parent` is not in `source`.
pub fn populate(source: &MemorySource, parent: Option<ItemId>, outline: &[Outline]) {
    for entry in outline {
        let id = source
            .push(parent, entry.label.clone())
            .expect("outline parent exists");
        populate(source, Some(id), &entry.children);
    }
}

/// Read the current source contents back as an outline.
pub fn outline_of(source: &MemorySource, parent: Option<ItemId>) -> Vec<Outline> {
    source
        .children(parent)
        .into_iter()
        .map(|id| Outline {
            label: source.label(id).unwrap_or_default(),
            children: outline_of(source, Some(id)),
        })
        .collect()
}

/// A source plus label lookups.
pub struct TestFixture {
    pub source: MemorySource,
}

impl TestFixture {
    /// An empty source.
    pub fn new() -> Self {
        Self {
            source: MemorySource::new(),
        }
    }

    /// A source holding `outline` at the top level.
    pub fn from_outline(outline: &[Outline]) -> Self {
        let fixture = Self::new();
        populate(&fixture.source, None, outline);
        fixture
    }

    /// A flat top level with one item per label.
    pub fn flat(labels: &[&str]) -> Self {
        let outline: Vec<Outline> = labels.iter().map(|l| Outline::leaf(*l)).collect();
        Self::from_outline(&outline)
    }

    /// Identity of the first item labelled `label`.
    ///
    /// # Panics
    ///
    /// Panics if no item carries the label.
    pub fn item(&self, label: &str) -> ItemId {
        self.source
            .find(label)
            .unwrap_or_else(|| panic!("no item labelled {:?}", label))
    }

    /// Labels of the live children of `parent`.
    pub fn live_labels(&self, parent: Option<&str>) -> Vec<String> {
        let parent = parent.map(|l| self.item(l));
        self.source
            .children_of(parent.as_ref())
            .into_iter()
            .filter_map(|id| self.source.label(id))
            .collect()
    }

    /// A cache with every level of the current source materialized.
    pub fn loaded_cache(&self) -> NodeCache<ItemId> {
        let mut cache = NodeCache::new();
        let root = cache.root();
        load_all(&mut cache, &self.source, root);
        cache
    }

    /// Labels of the cached children of the node mirroring `parent`.
    pub fn cached_labels(&self, cache: &NodeCache<ItemId>, parent: Option<&str>) -> Vec<String> {
        cached_labels(cache, &self.source, parent.map(|l| self.item(l)))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Materialize every level below `id`.
pub fn load_all<S>(cache: &mut NodeCache<S::Item>, source: &S, id: lazytree_core::NodeId)
where
    S: Source + ?Sized,
{
    cache.load_children(source, id);
    for row in 0..cache.children_len(id) {
        if let Some(child) = cache.child(id, row) {
            load_all(cache, source, child);
        }
    }
}

/// Labels of the cached children of the node mirroring `parent`, or of the
/// root for `None`. Empty when the node is not cached.
pub fn cached_labels(
    cache: &NodeCache<ItemId>,
    source: &MemorySource,
    parent: Option<ItemId>,
) -> Vec<String> {
    let node = match parent {
        None => Some(cache.root()),
        Some(item) => find_cached(cache, cache.root(), &item),
    };
    let Some(node) = node else {
        return Vec::new();
    };
    (0..cache.children_len(node))
        .filter_map(|row| cache.child(node, row))
        .filter_map(|c| cache.item(c))
        .map(|item| source.data(item, Role::Display))
        .collect()
}

fn find_cached(
    cache: &NodeCache<ItemId>,
    from: lazytree_core::NodeId,
    item: &ItemId,
) -> Option<lazytree_core::NodeId> {
    (0..cache.children_len(from))
        .filter_map(|row| cache.child(from, row))
        .find_map(|c| {
            if cache.item(c) == Some(item) {
                Some(c)
            } else {
                find_cached(cache, c, item)
            }
        })
}

/// Recording observer. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<ModelEvent>>>,
}

impl EventLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<ModelEvent> {
        self.events.borrow().clone()
    }

    /// Drain the log.
    pub fn take(&self) -> Vec<ModelEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Recorded structural events, full refreshes left out.
    pub fn structural(&self) -> Vec<ModelEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|e| **e != ModelEvent::FullRefresh)
            .cloned()
            .collect()
    }

    /// Number of full refreshes recorded.
    pub fn refreshes(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| **e == ModelEvent::FullRefresh)
            .count()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Whether every begin is directly followed by its matching end.
    pub fn is_balanced(&self) -> bool {
        let events = self.structural();
        events.chunks(2).all(|pair| match pair {
            [ModelEvent::RemoveBegin { parent: p, rows: r }, ModelEvent::RemoveEnd { parent, rows }]
            | [ModelEvent::InsertBegin { parent: p, rows: r }, ModelEvent::InsertEnd { parent, rows }] => {
                p == parent && r == rows
            }
            _ => false,
        })
    }
}

impl<I> Observer<I> for EventLog {
    fn on_event(&mut self, event: &ModelEvent, _cache: &NodeCache<I>) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Source wrapper that reports one item as its own parent.
pub struct SelfParent<S: Source> {
    pub inner: S,
    pub looped: S::Item,
}

impl<S: Source> SelfParent<S> {
    pub fn new(inner: S, looped: S::Item) -> Self {
        Self { inner, looped }
    }
}

impl<S: Source> Source for SelfParent<S> {
    type Item = S::Item;
    type Value = S::Value;

    fn has_items(&self, parent: Option<&S::Item>) -> bool {
        self.inner.has_items(parent)
    }

    fn item_count(&self, parent: Option<&S::Item>) -> usize {
        self.inner.item_count(parent)
    }

    fn item_at(&self, parent: Option<&S::Item>, index: usize) -> Option<S::Item> {
        self.inner.item_at(parent, index)
    }

    fn index_of(&self, parent: Option<&S::Item>, item: &S::Item, from: usize) -> Option<usize> {
        self.inner.index_of(parent, item, from)
    }

    fn parent_of(&self, item: &S::Item) -> Option<S::Item> {
        if *item == self.looped {
            Some(item.clone())
        } else {
            self.inner.parent_of(item)
        }
    }

    fn data(&self, item: &S::Item, role: Role) -> S::Value {
        self.inner.data(item, role)
    }
}

/// Build a source of `size` items with a seeded random shape.
///
/// Each new item lands under a uniformly chosen existing item or at the
/// top level, at a random position among its siblings.
pub fn random_tree(seed: u64, size: usize) -> MemorySource {
    let mut rng = StdRng::seed_from_u64(seed);
    let source = MemorySource::new();
    let mut items: Vec<ItemId> = Vec::with_capacity(size);
    for n in 0..size {
        let pick = rng.gen_range(0..=items.len());
        let parent = items.get(pick).copied();
        let index = rng.gen_range(0..=source.item_count(parent.as_ref()));
        if let Ok(id) = source.insert(parent, index, format!("n{}", n)) {
            items.push(id);
        }
    }
    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazytree_core::{Address, RowRange};

    #[test]
    fn test_outline_round_trip() {
        let outline = vec![
            Outline::node("a", vec![Outline::leaf("a1"), Outline::leaf("a2")]),
            Outline::leaf("b"),
        ];
        let fixture = TestFixture::from_outline(&outline);
        assert_eq!(outline_of(&fixture.source, None), outline);
        assert_eq!(fixture.live_labels(Some("a")), vec!["a1", "a2"]);

        let json = serde_json::to_string(&outline).unwrap();
        let back: Vec<Outline> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outline);
    }

    #[test]
    fn test_loaded_cache_mirrors_everything() {
        let fixture = TestFixture::from_outline(&[
            Outline::node("a", vec![Outline::node("a1", vec![Outline::leaf("a11")])]),
            Outline::leaf("b"),
        ]);
        let cache = fixture.loaded_cache();
        assert_eq!(cache.len(), 4);
        assert_eq!(fixture.cached_labels(&cache, None), vec!["a", "b"]);
        assert_eq!(fixture.cached_labels(&cache, Some("a1")), vec!["a11"]);
        cache.validate().unwrap();
    }

    #[test]
    fn test_event_log_balance() {
        let log = EventLog::new();
        let mut observer = log.clone();
        let cache: NodeCache<ItemId> = NodeCache::new();
        let rows = RowRange::single(0);
        let parent = Address::Root;
        observer.on_event(&ModelEvent::InsertBegin { parent, rows }, &cache);
        assert!(!log.is_balanced());
        observer.on_event(&ModelEvent::InsertEnd { parent, rows }, &cache);
        observer.on_event(&ModelEvent::FullRefresh, &cache);
        assert!(log.is_balanced());
        assert_eq!(log.refreshes(), 1);
        assert_eq!(log.take().len(), 3);
        assert!(log.is_empty());
    }

    #[test]
    fn test_random_tree_is_deterministic() {
        let a = random_tree(7, 40);
        let b = random_tree(7, 40);
        assert_eq!(a.len(), 40);
        assert_eq!(outline_of(&a, None), outline_of(&b, None));
        assert_ne!(outline_of(&a, None), outline_of(&random_tree(8, 40), None));
    }

    #[test]
    fn test_self_parent_wrapper() {
        let fixture = TestFixture::flat(&["a"]);
        let a = fixture.item("a");
        let src = SelfParent::new(fixture.source, a);
        assert_eq!(src.parent_of(&a), Some(a));
        assert_eq!(src.item_count(None), 1);
    }
}
