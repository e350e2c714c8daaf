mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use common::{init_tracing, scripted};
use ticktree::behaviors::SetBlackboard;
use ticktree::blackboard::{ActivityKind, Blackboard};
use ticktree::{Behavior, BehaviorTree, Outcome, SetupError, SnapshotVisitor, Status};

struct SlowSetup {
    delay: Duration,
}

impl Behavior for SlowSetup {
    fn setup(&mut self, _timeout: Duration) -> Result<(), SetupError> {
        thread::sleep(self.delay);
        Ok(())
    }

    fn update(&mut self) -> Outcome {
        Outcome::success()
    }
}

struct BrokenSetup;

impl Behavior for BrokenSetup {
    fn setup(&mut self, _timeout: Duration) -> Result<(), SetupError> {
        Err(SetupError::failed("no port"))
    }

    fn update(&mut self) -> Outcome {
        Outcome::success()
    }
}

#[test]
fn setup_attaches_the_failing_node_name() {
    let mut tree = BehaviorTree::new();
    let radio = tree.add_leaf("radio", BrokenSetup);
    let (other, _) = scripted(vec![Status::Success]);
    let other = tree.add_leaf("other", other);
    let root = tree.add_sequence("root", vec![radio, other]);
    tree.set_root(root);

    let err = tree.setup(Duration::from_secs(1)).unwrap_err();
    match err {
        SetupError::Failed { node, reason } => {
            assert_eq!(node, "radio");
            assert_eq!(reason, "no port");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn setup_aborts_when_the_budget_is_exhausted() {
    let mut tree = BehaviorTree::new();
    let slow = tree.add_leaf(
        "slow",
        SlowSetup {
            delay: Duration::from_millis(25),
        },
    );
    let (next, _) = scripted(vec![Status::Success]);
    let next = tree.add_leaf("next", next);
    let root = tree.add_sequence("root", vec![slow, next]);
    tree.set_root(root);

    let err = tree.setup(Duration::from_millis(1)).unwrap_err();
    assert!(matches!(err, SetupError::Timeout { .. }));
}

#[test]
fn snapshot_visitor_diffs_consecutive_cycles() {
    init_tracing();
    let mut tree = BehaviorTree::new();
    let (a, _) = scripted(vec![Status::Failure]);
    let (b, _) = scripted(vec![Status::Running, Status::Success]);
    let a = tree.add_leaf("a", a);
    let b = tree.add_leaf("b", b);
    let root = tree.add_selector("root", vec![a, b]);
    tree.set_root(root);

    let visitor = Rc::new(RefCell::new(SnapshotVisitor::new()));
    tree.add_visitor(visitor.clone());

    tree.tick_once();
    {
        let snap = visitor.borrow();
        assert_eq!(snap.visited().get(&a), Some(&Status::Failure));
        assert_eq!(snap.visited().get(&b), Some(&Status::Running));
        assert_eq!(snap.visited().get(&root), Some(&Status::Running));
        assert!(snap.previously_visited().is_empty());
    }

    tree.tick_once();
    {
        let snap = visitor.borrow();
        assert_eq!(snap.previously_visited().get(&b), Some(&Status::Running));
        assert_eq!(snap.visited().get(&b), Some(&Status::Success));
        assert!(snap.changed());
    }
}

#[test]
fn activity_stream_captures_tree_writes() {
    let bb = Blackboard::new_shared();
    let mut tree = BehaviorTree::new();
    let set = tree.add_leaf(
        "set",
        SetBlackboard::new(&bb, "pose", 3i64, true).unwrap(),
    );
    tree.set_root(set);

    bb.borrow_mut().enable_activity_stream(8);
    tree.tick_once();
    tree.tick_once();

    let bb = bb.borrow();
    let records: Vec<_> = bb.activity_stream().collect();
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|r| matches!(r.kind, ActivityKind::Write { .. })));
    assert!(records.iter().all(|r| r.key == "/pose"));
    assert!(records[0].sequence < records[1].sequence);
}

#[test]
fn tick_tock_drives_a_fixed_number_of_cycles() {
    let mut tree = BehaviorTree::new();
    let (leaf, probe) = scripted(vec![Status::Running]);
    let leaf = tree.add_leaf("leaf", leaf);
    tree.set_root(leaf);

    let last = tree.tick_tock(Duration::from_millis(1), Some(4));
    assert_eq!(last, Status::Running);
    assert_eq!(probe.ticks.get(), 4);
}

#[test]
fn post_tick_handler_sees_the_finished_tick() {
    let mut tree = BehaviorTree::new();
    let (leaf, _) = scripted(vec![Status::Running, Status::Success]);
    let leaf = tree.add_leaf("leaf", leaf);
    tree.set_root(leaf);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    tree.add_post_tick_handler(move |tree| {
        let root = tree.root().expect("root is set");
        sink.borrow_mut().push(tree.status(root));
    });

    tree.tick_once();
    tree.tick_once();
    assert_eq!(*seen.borrow(), vec![Status::Running, Status::Success]);
}
