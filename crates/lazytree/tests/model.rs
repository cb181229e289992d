//! End-to-end behaviour of the tree model over an in-memory source.

use std::rc::Rc;

use lazytree::{
    Address, ManualScheduler, MemorySource, ModelConfig, ModelError, ModelEvent, Role, RowRange,
    TreeModel,
};
use lazytree::sync::SyncError;
use lazytree_testkit::fixtures::outline_of;
use lazytree_testkit::vectors::{RangeOp, Step};
use lazytree_testkit::{
    all_scenarios, apply_all, init_tracing, mutations, random_tree, EventLog, Outline,
    RangeRecord, SelfParent, TestFixture,
};
use proptest::prelude::*;

fn model(source: MemorySource) -> (TreeModel<MemorySource>, ManualScheduler, EventLog) {
    init_tracing();
    let scheduler = ManualScheduler::new();
    let model = TreeModel::new(source, Rc::new(scheduler.clone()));
    let log = EventLog::new();
    model.subscribe(log.clone());
    (model, scheduler, log)
}

fn insert(first: usize, last: usize) -> Vec<ModelEvent> {
    let rows = RowRange { first, last };
    vec![
        ModelEvent::InsertBegin {
            parent: Address::Root,
            rows,
        },
        ModelEvent::InsertEnd {
            parent: Address::Root,
            rows,
        },
    ]
}

fn remove(first: usize, last: usize) -> Vec<ModelEvent> {
    let rows = RowRange { first, last };
    vec![
        ModelEvent::RemoveBegin {
            parent: Address::Root,
            rows,
        },
        ModelEvent::RemoveEnd {
            parent: Address::Root,
            rows,
        },
    ]
}

fn labels(model: &TreeModel<MemorySource>, parent: Address) -> Vec<String> {
    (0..model.row_count(parent))
        .filter_map(|row| model.index(row, parent))
        .map(|a| model.data(a, Role::Display))
        .collect()
}

#[test]
fn test_initial_population_inserts_whole_range() {
    init_tracing();
    let fixture = TestFixture::flat(&["A", "B", "C"]);
    let config = ModelConfig {
        initial_sync: false,
        ..ModelConfig::default()
    };
    let model = TreeModel::with_config(fixture.source, Rc::new(ManualScheduler::new()), config);
    let log = EventLog::new();
    model.subscribe(log.clone());

    let stats = model.sync_tree();
    assert_eq!(log.events(), insert(0, 2));
    assert_eq!(stats.inserted_nodes, 3);
    assert_eq!(labels(&model, Address::Root), vec!["A", "B", "C"]);
}

#[test]
fn test_middle_removal_through_update_window() {
    let fixture = TestFixture::flat(&["A", "B", "C"]);
    let b = fixture.item("B");
    let (model, _, log) = model(fixture.source);
    let a = model.index(0, Address::Root).unwrap();
    let c = model.index(2, Address::Root).unwrap();

    model.begin_update();
    model.source().remove(b).unwrap();
    model.end_update();

    let mut expected = remove(1, 1);
    expected.push(ModelEvent::FullRefresh);
    assert_eq!(log.events(), expected);
    // Surviving nodes keep their keys; the row moves with them.
    assert_eq!(model.data(a, Role::Display), "A");
    assert_eq!(model.data(c, Role::Display), "C");
    assert_eq!(model.index(1, Address::Root).and_then(|x| x.node()), c.node());
}

#[test]
fn test_front_insertion_shifts_rows() {
    let fixture = TestFixture::flat(&["A", "B"]);
    let (model, _, log) = model(fixture.source);

    model.source().insert(None, 0, "X").unwrap();
    model.sync_tree();

    assert_eq!(log.structural(), insert(0, 0));
    assert_eq!(labels(&model, Address::Root), vec!["X", "A", "B"]);
    model.validate().unwrap();
}

#[test]
fn test_swap_reports_delete_and_insert() {
    let fixture = TestFixture::flat(&["A", "B"]);
    let b = fixture.item("B");
    let (model, _, log) = model(fixture.source);
    let a_before = model.index(0, Address::Root).unwrap();

    model.source().move_item(b, None, 0).unwrap();
    model.sync_tree();

    let mut expected = insert(0, 0);
    expected.extend(remove(2, 2));
    assert_eq!(log.structural(), expected);
    assert_eq!(labels(&model, Address::Root), vec!["B", "A"]);
    assert_eq!(
        model.index(1, Address::Root).and_then(|x| x.node()),
        a_before.node()
    );
}

#[test]
fn test_scenario_vectors_through_model() {
    for scenario in all_scenarios() {
        let fixture = TestFixture::from_outline(&scenario.initial);
        let (model, _, log) = model(fixture.source);
        // Materialize every level, as the vectors assume.
        outline_of_model(&model, Address::Root);
        log.take();

        for step in &scenario.steps {
            apply_step(&model, step);
        }
        model.begin_update();
        model.end_update();

        assert!(log.is_balanced(), "scenario '{}'", scenario.name);
        assert_eq!(ranges(&model, &log), scenario.expected, "scenario '{}'", scenario.name);
        assert_eq!(log.refreshes(), 1);
        assert_eq!(outline_of_model(&model, Address::Root), scenario.result);
        model.validate().unwrap();
    }
}

/// The model's view of the tree, loading every level on the way.
fn outline_of_model(model: &TreeModel<MemorySource>, parent: Address) -> Vec<Outline> {
    (0..model.row_count(parent))
        .filter_map(|row| model.index(row, parent))
        .map(|child| Outline {
            label: model.data(child, Role::Display),
            children: outline_of_model(model, child),
        })
        .collect()
}

/// Recorded ranges, with parents named by their display label.
fn ranges(model: &TreeModel<MemorySource>, log: &EventLog) -> Vec<RangeRecord> {
    log.structural()
        .iter()
        .filter(|e| e.is_begin())
        .filter_map(|e| {
            let rows = e.rows()?;
            let parent = match e.parent()? {
                Address::Root => None,
                address => Some(model.data(address, Role::Display)),
            };
            let op = if e.is_remove() { RangeOp::Remove } else { RangeOp::Insert };
            Some(RangeRecord {
                op,
                parent,
                first: rows.first,
                last: rows.last,
            })
        })
        .collect()
}

/// Replays a vector step against the model's own source, by label.
fn apply_step(model: &TreeModel<MemorySource>, step: &Step) {
    let source = model.source();
    let find = |label: &str| source.find(label).unwrap();
    match step {
        Step::Insert {
            parent,
            index,
            label,
        } => {
            source
                .insert(parent.as_deref().map(find), *index, label.clone())
                .unwrap();
        }
        Step::Remove { label } => source.remove(find(label.as_str())).unwrap(),
        Step::Move {
            label,
            parent,
            index,
        } => source
            .move_item(find(label.as_str()), parent.as_deref().map(find), *index)
            .unwrap(),
    }
}

#[test]
fn test_nested_windows_collapse_into_one_pass() {
    let fixture = TestFixture::flat(&["A"]);
    let (model, _, log) = model(fixture.source);
    let before = model.reconciliations();

    for _ in 0..4 {
        model.begin_update();
    }
    model.source().push(None, "B").unwrap();
    for _ in 0..3 {
        model.end_update();
        assert_eq!(model.reconciliations(), before);
        assert!(log.is_empty());
    }
    model.end_update();

    assert_eq!(model.reconciliations(), before + 1);
    assert_eq!(log.structural(), insert(1, 1));
    assert_eq!(log.refreshes(), 1);
}

#[test]
fn test_queued_requests_coalesce() {
    let fixture = TestFixture::flat(&["A"]);
    let (model, scheduler, log) = model(fixture.source);
    let before = model.reconciliations();

    for n in 0..10 {
        model.source().push(None, format!("n{}", n)).unwrap();
        model.source().notify_changed();
    }
    assert_eq!(scheduler.pending(), 1);
    // Reads are suppressed while the queued window is open.
    let a = model.index(0, Address::Root).unwrap();
    assert_eq!(model.data(a, Role::Display), "");

    scheduler.run_pending();
    assert_eq!(model.reconciliations(), before + 1);
    assert_eq!(log.structural(), insert(1, 10));
    assert_eq!(model.data(a, Role::Display), "A");
}

#[test]
fn test_queue_inside_open_window_is_absorbed() {
    let fixture = TestFixture::flat(&["A"]);
    let (model, scheduler, _) = model(fixture.source);
    model.begin_update();
    model.queue_update();
    assert_eq!(scheduler.pending(), 0);
    assert_eq!(model.update_depth(), 1);
    model.end_update();
    assert!(!model.is_updating());
}

#[test]
fn test_presence_correction() {
    let fixture = TestFixture::flat(&["A", "B"]);
    let b = fixture.item("B");
    let (model, _, log) = model(fixture.source);
    let b_addr = model.index(1, Address::Root).unwrap();
    assert!(!model.has_children(b_addr));

    model.source().push(Some(b), "B1").unwrap();
    model.sync_tree();

    let rows = RowRange::single(0);
    assert_eq!(
        log.structural(),
        vec![
            ModelEvent::InsertBegin {
                parent: b_addr,
                rows
            },
            ModelEvent::InsertEnd {
                parent: b_addr,
                rows
            },
        ]
    );
    assert!(model.index(0, b_addr).is_some());
    assert!(model.has_children(b_addr));
}

#[test]
fn test_removed_rows_stop_resolving() {
    let fixture = TestFixture::from_outline(&[Outline::node("A", vec![Outline::leaf("A1")])]);
    let a = fixture.item("A");
    let (model, _, _) = model(fixture.source);
    let a_addr = model.index(0, Address::Root).unwrap();
    model.row_count(a_addr);
    let a1_addr = model.index(0, a_addr).unwrap();

    model.source().remove(a).unwrap();
    model.sync_tree();

    for stale in [a_addr, a1_addr] {
        assert_eq!(model.item(stale), None);
        assert_eq!(model.parent(stale), None);
        assert_eq!(model.row_count(stale), 0);
        assert!(!model.has_children(stale));
    }
    assert_eq!(model.cached_nodes(), 0);
}

#[test]
fn test_cyclic_ancestry_does_not_resolve() -> anyhow::Result<()> {
    init_tracing();
    let fixture = TestFixture::from_outline(&[Outline::node("A", vec![Outline::leaf("A1")])]);
    let a = fixture.item("A");
    let a1 = fixture.item("A1");
    let source = SelfParent::new(fixture.source, a);
    let model = TreeModel::new(source, Rc::new(ManualScheduler::new()));

    assert_eq!(model.address_of_item(&a1), None);
    assert!(matches!(
        model.try_address_of_item(&a1),
        Err(ModelError::Sync(SyncError::CyclicAncestry { .. }))
    ));
    // Reconciliation is unaffected.
    model.sync_tree();
    model.validate()?;
    Ok(())
}

#[test]
fn test_address_of_item_materializes_path() -> anyhow::Result<()> {
    let fixture = TestFixture::from_outline(&[
        Outline::leaf("A"),
        Outline::node(
            "B",
            vec![Outline::node("B1", vec![Outline::leaf("B11"), Outline::leaf("B12")])],
        ),
    ]);
    let b12 = fixture.item("B12");
    let (model, _, _) = model(fixture.source);
    assert_eq!(model.cached_nodes(), 2);

    let addr = model.try_address_of_item(&b12)?;
    assert_eq!(addr.row(), Some(1));
    assert_eq!(model.data(addr, Role::Display), "B12");
    let parent = model.parent(addr).unwrap();
    assert_eq!(model.data(parent, Role::Display), "B1");
    assert_eq!(model.cached_nodes(), 5);
    model.validate()?;
    Ok(())
}

#[test]
fn test_snapshot_serializes() -> anyhow::Result<()> {
    let fixture = TestFixture::flat(&["A", "B"]);
    let (model, _, _) = model(fixture.source);
    let snapshot = model.snapshot();
    assert_eq!(snapshot.children.len(), 2);
    let json = serde_json::to_value(&snapshot)?;
    assert_eq!(json["loaded"], serde_json::Value::Bool(true));
    Ok(())
}

#[test]
fn test_random_tree_full_materialization() {
    let (model, _, _) = model(random_tree(42, 200));
    outline_of_model(&model, Address::Root);
    assert_eq!(model.cached_nodes(), 200);
    model.validate().unwrap();
    assert!(model.sync_tree().is_noop());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_model_follows_source(seed in 0u64..1000, ops in mutations(24)) {
        let (model, _, log) = model(random_tree(seed, 30));
        outline_of_model(&model, Address::Root);
        log.take();

        apply_all(model.source(), &ops);
        model.begin_update();
        model.end_update();

        prop_assert!(log.is_balanced());
        model.validate().unwrap();
        prop_assert_eq!(outline_of_model(&model, Address::Root), outline_of(model.source(), None));

        log.take();
        model.begin_update();
        model.end_update();
        prop_assert_eq!(log.structural(), Vec::<ModelEvent>::new());
    }
}
