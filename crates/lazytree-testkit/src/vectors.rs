//! Named reconciliation scenarios with their expected event streams.
//!
//! Each scenario starts from a fully materialized cache over `initial`,
//! applies `steps` to the source, reconciles once from the root and
//! compares the emitted ranges. Parents are named by label so vectors stay
//! independent of arena keys, which makes them serializable as JSON.

use serde::{Deserialize, Serialize};

use lazytree_core::{Address, ModelEvent};
use lazytree_source::{ItemId, MemorySource};
use lazytree_sync::{reconcile, NodeCache};

use crate::fixtures::{outline_of, EventLog, Outline, TestFixture};

/// A source edit addressed by label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Insert {
        parent: Option<String>,
        index: usize,
        label: String,
    },
    Remove {
        label: String,
    },
    Move {
        label: String,
        parent: Option<String>,
        index: usize,
    },
}

/// Kind of an emitted range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeOp {
    Remove,
    Insert,
}

/// One bracketed range, with its parent named by label (`None` = root).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRecord {
    pub op: RangeOp,
    pub parent: Option<String>,
    pub first: usize,
    pub last: usize,
}

impl RangeRecord {
    pub fn remove(parent: Option<&str>, first: usize, last: usize) -> Self {
        Self {
            op: RangeOp::Remove,
            parent: parent.map(String::from),
            first,
            last,
        }
    }

    pub fn insert(parent: Option<&str>, first: usize, last: usize) -> Self {
        Self {
            op: RangeOp::Insert,
            parent: parent.map(String::from),
            first,
            last,
        }
    }
}

/// A reconciliation scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Human-readable name.
    pub name: String,
    pub initial: Vec<Outline>,
    pub steps: Vec<Step>,
    /// Ranges in emission order.
    pub expected: Vec<RangeRecord>,
    /// Source contents after the steps.
    pub result: Vec<Outline>,
}

fn leaves(labels: &[&str]) -> Vec<Outline> {
    labels.iter().map(|l| Outline::leaf(*l)).collect()
}

/// All scenarios.
pub fn all_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "remove middle".into(),
            initial: leaves(&["A", "B", "C"]),
            steps: vec![Step::Remove { label: "B".into() }],
            expected: vec![RangeRecord::remove(None, 1, 1)],
            result: leaves(&["A", "C"]),
        },
        Scenario {
            name: "insert at front".into(),
            initial: leaves(&["A", "B"]),
            steps: vec![Step::Insert {
                parent: None,
                index: 0,
                label: "X".into(),
            }],
            expected: vec![RangeRecord::insert(None, 0, 0)],
            result: leaves(&["X", "A", "B"]),
        },
        Scenario {
            name: "swap is insert then remove".into(),
            initial: leaves(&["A", "B"]),
            steps: vec![Step::Move {
                label: "B".into(),
                parent: None,
                index: 0,
            }],
            expected: vec![
                RangeRecord::insert(None, 0, 0),
                RangeRecord::remove(None, 2, 2),
            ],
            result: leaves(&["B", "A"]),
        },
        Scenario {
            name: "replace tail".into(),
            initial: leaves(&["A", "B", "C"]),
            steps: vec![
                Step::Remove { label: "B".into() },
                Step::Remove { label: "C".into() },
                Step::Insert {
                    parent: None,
                    index: 1,
                    label: "D".into(),
                },
            ],
            expected: vec![
                RangeRecord::remove(None, 1, 2),
                RangeRecord::insert(None, 1, 1),
            ],
            result: leaves(&["A", "D"]),
        },
        Scenario {
            name: "interleaved gaps".into(),
            initial: leaves(&["A", "B", "C", "D"]),
            steps: vec![
                Step::Remove { label: "B".into() },
                Step::Insert {
                    parent: None,
                    index: 2,
                    label: "X".into(),
                },
                Step::Insert {
                    parent: None,
                    index: 4,
                    label: "Y".into(),
                },
            ],
            expected: vec![
                RangeRecord::remove(None, 1, 1),
                RangeRecord::insert(None, 2, 2),
                RangeRecord::insert(None, 4, 4),
            ],
            result: leaves(&["A", "C", "X", "D", "Y"]),
        },
        Scenario {
            name: "nested change below kept parent".into(),
            initial: vec![
                Outline::node("A", leaves(&["A1", "A2"])),
                Outline::leaf("B"),
            ],
            steps: vec![
                Step::Remove { label: "A1".into() },
                Step::Insert {
                    parent: Some("A".into()),
                    index: 1,
                    label: "A3".into(),
                },
            ],
            expected: vec![
                RangeRecord::remove(Some("A"), 0, 0),
                RangeRecord::insert(Some("A"), 1, 1),
            ],
            result: vec![
                Outline::node("A", leaves(&["A2", "A3"])),
                Outline::leaf("B"),
            ],
        },
        Scenario {
            name: "reparent across siblings".into(),
            initial: vec![
                Outline::node("A", leaves(&["A1"])),
                Outline::node("B", Vec::new()),
            ],
            steps: vec![Step::Move {
                label: "A1".into(),
                parent: Some("B".into()),
                index: 0,
            }],
            expected: vec![
                RangeRecord::remove(Some("A"), 0, 0),
                RangeRecord::insert(Some("B"), 0, 0),
            ],
            result: vec![
                Outline::leaf("A"),
                Outline::node("B", leaves(&["A1"])),
            ],
        },
    ]
}

fn resolve(fixture: &TestFixture, label: &Option<String>) -> Option<ItemId> {
    label.as_deref().map(|l| fixture.item(l))
}

/// Apply one step.
///
/// # Panics
///
/// Panics if the source rejects the step; vectors only hold valid edits.
pub fn apply_step(fixture: &TestFixture, step: &Step) {
    let source: &MemorySource = &fixture.source;
    let outcome = match step {
        Step::Insert {
            parent,
            index,
            label,
        } => source
            .insert(resolve(fixture, parent), *index, label.clone())
            .map(|_| ()),
        Step::Remove { label } => source.remove(fixture.item(label)),
        Step::Move {
            label,
            parent,
            index,
        } => source.move_item(fixture.item(label), resolve(fixture, parent), *index),
    };
    if let Err(e) = outcome {
        panic!("step {:?} rejected: {}", step, e);
    }
}

/// Describe structural events by label, reading parents from `cache`.
///
/// Only begin halves are reported; the log is expected to be balanced.
pub fn describe(
    events: &[ModelEvent],
    cache: &NodeCache<ItemId>,
    source: &MemorySource,
) -> Vec<RangeRecord> {
    events
        .iter()
        .filter(|e| e.is_begin())
        .filter_map(|e| {
            let op = if e.is_remove() {
                RangeOp::Remove
            } else {
                RangeOp::Insert
            };
            let parent = match e.parent()? {
                Address::Root => None,
                address => cache
                    .node_at(address)
                    .and_then(|n| cache.item(n))
                    .and_then(|item| source.label(*item)),
            };
            let rows = e.rows()?;
            Some(RangeRecord {
                op,
                parent,
                first: rows.first,
                last: rows.last,
            })
        })
        .collect()
}

/// Outcome of running one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub ranges: Vec<RangeRecord>,
    pub result: Vec<Outline>,
    pub cache: NodeCache<ItemId>,
    pub log: EventLog,
}

/// Run `scenario` from a fully materialized cache.
pub fn run_scenario(scenario: &Scenario) -> ScenarioRun {
    let fixture = TestFixture::from_outline(&scenario.initial);
    let mut cache = fixture.loaded_cache();
    for step in &scenario.steps {
        apply_step(&fixture, step);
    }

    let mut log = EventLog::new();
    let root = cache.root();
    reconcile(&mut cache, &fixture.source, root, &mut log);

    ScenarioRun {
        ranges: describe(&log.events(), &cache, &fixture.source),
        result: outline_of(&fixture.source, None),
        cache,
        log,
    }
}

/// Run every scenario. Returns name, whether it matched, and the ranges
/// actually emitted.
pub fn verify_all_scenarios() -> Vec<(String, bool, Vec<RangeRecord>)> {
    all_scenarios()
        .iter()
        .map(|s| {
            let run = run_scenario(s);
            let matches = run.ranges == s.expected && run.result == s.result && run.log.is_balanced();
            (s.name.clone(), matches, run.ranges)
        })
        .collect()
}
