//! Node arena and tick driver.
//!
//! The tree is an arena of nodes addressed by stable [`NodeId`] indices;
//! parent/child relationships are index lists, so subtree insertion and
//! removal never chase pointers. The same struct is the driver: it owns the
//! root, runs pre/post tick handlers and visitors, and exposes tick-once and
//! tick-tock looping.
//!
//! Execution is single-threaded and cooperative. A node reporting RUNNING
//! yields back to its parent and ultimately to the caller; suspension happens
//! only at tick granularity and cancellation is synchronous. Tree surgery
//! mid-tick is impossible by construction (`&mut` exclusivity).

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use crate::behavior::Behavior;
use crate::blackboard::Value;
use crate::composite::{CompositePolicy, CompositeState, ParallelPolicy, SequenceResume};
use crate::decorator::Decorator;
use crate::visitor::Visitor;
use crate::{SetupError, Status};

/// Stable handle to a node in the arena.
///
/// Ids stay valid for the life of the tree; removal detaches a node without
/// reusing its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

enum NodeKind {
    Leaf(Box<dyn Behavior>),
    Composite(CompositeState),
    Decorator(Decorator),
}

/// A node shell: identity, current status, feedback and wiring.
pub struct Node {
    name: String,
    status: Status,
    feedback: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    kind: NodeKind,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

type Handler = Box<dyn FnMut(&mut BehaviorTree)>;

/// Visitors are shared so callers can keep a handle and inspect state
/// between ticks.
pub type SharedVisitor = Rc<RefCell<dyn Visitor>>;

/// The tree: arena, root and driving loop in one place.
#[derive(Default)]
pub struct BehaviorTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    pre_tick: Vec<Handler>,
    post_tick: Vec<Handler>,
    visitors: Vec<SharedVisitor>,
    tick_count: u64,
    interrupted: bool,
}

impl BehaviorTree {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Add a leaf node wrapping a user behavior.
    pub fn add_leaf(&mut self, name: impl Into<String>, behavior: impl Behavior + 'static) -> NodeId {
        self.push(name.into(), NodeKind::Leaf(Box::new(behavior)), Vec::new())
    }

    /// Add a composite governing the given children.
    ///
    /// # Panics
    ///
    /// Panics if `children` is empty or any child already has a parent.
    pub fn add_composite(
        &mut self,
        name: impl Into<String>,
        policy: CompositePolicy,
        children: Vec<NodeId>,
    ) -> NodeId {
        let name = name.into();
        assert!(
            !children.is_empty(),
            "composite '{name}' must have at least one child"
        );
        let id = self.push(
            name,
            NodeKind::Composite(CompositeState::new(policy)),
            children.clone(),
        );
        for child in children {
            self.claim(child, id);
        }
        id
    }

    /// Shorthand for a sequence with the default resume rule.
    pub fn add_sequence(&mut self, name: impl Into<String>, children: Vec<NodeId>) -> NodeId {
        self.add_composite(name, CompositePolicy::sequence(), children)
    }

    /// Sequence with an explicit resume rule.
    pub fn add_sequence_with(
        &mut self,
        name: impl Into<String>,
        resume: SequenceResume,
        children: Vec<NodeId>,
    ) -> NodeId {
        self.add_composite(name, CompositePolicy::Sequence { resume }, children)
    }

    pub fn add_selector(&mut self, name: impl Into<String>, children: Vec<NodeId>) -> NodeId {
        self.add_composite(name, CompositePolicy::Selector, children)
    }

    pub fn add_parallel(
        &mut self,
        name: impl Into<String>,
        policy: ParallelPolicy,
        children: Vec<NodeId>,
    ) -> NodeId {
        self.add_composite(name, CompositePolicy::Parallel { policy }, children)
    }

    /// Add a single-child decorator.
    ///
    /// # Panics
    ///
    /// Panics if the child already has a parent.
    pub fn add_decorator(
        &mut self,
        name: impl Into<String>,
        decorator: Decorator,
        child: NodeId,
    ) -> NodeId {
        let id = self.push(name.into(), NodeKind::Decorator(decorator), vec![child]);
        self.claim(child, id);
        id
    }

    /// Designate the root node.
    ///
    /// # Panics
    ///
    /// Panics if the node already has a parent.
    pub fn set_root(&mut self, id: NodeId) {
        assert!(
            self.nodes[id.0].parent.is_none(),
            "root '{}' must not have a parent",
            self.nodes[id.0].name
        );
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    // ------------------------------------------------------------------
    // Tree surgery
    // ------------------------------------------------------------------

    /// Insert an existing (unparented) node under a composite at `index`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        assert!(
            matches!(self.nodes[parent.0].kind, NodeKind::Composite(_)),
            "only composites accept inserted children"
        );
        self.claim(child, parent);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        if let NodeKind::Composite(state) = &mut self.nodes[parent.0].kind {
            state.current = None;
        }
    }

    /// Detach a child from its parent, stopping the subtree with INVALID.
    ///
    /// Returns `false` when `child` is not a child of `parent`, or when it is
    /// the parent's only child: composites and decorators never go childless,
    /// so the last child stays put and the parent itself must be detached
    /// instead. The removed node's slot stays allocated; its id remains valid
    /// for re-insertion.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.nodes[parent.0].children.len() == 1 {
            return false;
        }
        let Some(position) = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == child)
        else {
            return false;
        };
        self.nodes[parent.0].children.remove(position);
        self.nodes[child.0].parent = None;
        self.stop_recursive(child, Status::Invalid);
        if let NodeKind::Composite(state) = &mut self.nodes[parent.0].kind {
            state.current = None;
        }
        true
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn status(&self, id: NodeId) -> Status {
        self.nodes[id.0].status
    }

    pub fn feedback(&self, id: NodeId) -> &str {
        &self.nodes[id.0].feedback
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ------------------------------------------------------------------
    // Driver
    // ------------------------------------------------------------------

    /// One-time recursive setup, pre-order from the root.
    ///
    /// The whole pass shares one `timeout` budget; the first leaf failure or
    /// budget overrun aborts. Must succeed before the first tick.
    pub fn setup(&mut self, timeout: Duration) -> Result<(), SetupError> {
        let Some(root) = self.root else {
            return Ok(());
        };
        let started = Instant::now();
        self.setup_node(root, timeout, started)
    }

    fn setup_node(
        &mut self,
        id: NodeId,
        budget: Duration,
        started: Instant,
    ) -> Result<(), SetupError> {
        let elapsed = started.elapsed();
        if elapsed > budget {
            return Err(SetupError::Timeout {
                node: self.nodes[id.0].name.clone(),
                budget,
                elapsed,
            });
        }
        let node = &mut self.nodes[id.0];
        if let NodeKind::Leaf(behavior) = &mut node.kind {
            let remaining = budget.saturating_sub(elapsed);
            if let Err(err) = behavior.setup(remaining) {
                return Err(err.with_node(&node.name));
            }
        }
        let children = self.nodes[id.0].children.clone();
        for child in children {
            self.setup_node(child, budget, started)?;
        }
        Ok(())
    }

    /// Tick the root once, running handlers and visitors around it.
    pub fn tick_once(&mut self) -> Status {
        let Some(root) = self.root else {
            tracing::warn!("tick requested on a tree without a root");
            return Status::Invalid;
        };
        self.run_pre_tick_handlers();
        let visitors = mem::take(&mut self.visitors);
        for visitor in &visitors {
            visitor.borrow_mut().initialise();
        }
        let status = self.tick_node(root, &visitors);
        self.visitors = visitors;
        self.run_post_tick_handlers();
        self.tick_count += 1;
        status
    }

    /// Tick repeatedly, sleeping `period` between ticks.
    ///
    /// `iterations` of `None` runs until [`interrupt`](Self::interrupt) is
    /// called from a handler. Returns the last root status.
    pub fn tick_tock(&mut self, period: Duration, iterations: Option<usize>) -> Status {
        self.interrupted = false;
        let mut last = Status::Invalid;
        let mut remaining = iterations;
        while remaining != Some(0) {
            last = self.tick_once();
            if self.interrupted {
                break;
            }
            if let Some(n) = remaining.as_mut() {
                *n -= 1;
                if *n == 0 {
                    break;
                }
            }
            thread::sleep(period);
        }
        last
    }

    /// Request that a running [`tick_tock`](Self::tick_tock) loop stops
    /// after the current tick.
    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    /// Externally force a subtree out of execution.
    ///
    /// Routes through `terminate` synchronously, children first, before
    /// returning. Parents use this with [`Status::Invalid`] to preempt a
    /// running branch.
    pub fn stop(&mut self, id: NodeId, new_status: Status) {
        self.stop_recursive(id, new_status);
    }

    pub fn add_pre_tick_handler(&mut self, handler: impl FnMut(&mut BehaviorTree) + 'static) {
        self.pre_tick.push(Box::new(handler));
    }

    pub fn add_post_tick_handler(&mut self, handler: impl FnMut(&mut BehaviorTree) + 'static) {
        self.post_tick.push(Box::new(handler));
    }

    pub fn add_visitor(&mut self, visitor: SharedVisitor) {
        self.visitors.push(visitor);
    }

    // ------------------------------------------------------------------
    // Tick state machines
    // ------------------------------------------------------------------

    fn tick_node(&mut self, id: NodeId, visitors: &[SharedVisitor]) -> Status {
        let previous = self.nodes[id.0].status;
        enum Dispatch {
            Leaf,
            Composite(CompositePolicy),
            Decorator,
        }
        let dispatch = match &self.nodes[id.0].kind {
            NodeKind::Leaf(_) => Dispatch::Leaf,
            NodeKind::Composite(state) => Dispatch::Composite(state.policy),
            NodeKind::Decorator(_) => Dispatch::Decorator,
        };
        let new_status = match dispatch {
            Dispatch::Leaf => self.tick_leaf(id, previous),
            Dispatch::Composite(policy) => self.tick_composite(id, previous, policy, visitors),
            Dispatch::Decorator => self.tick_decorator(id, previous, visitors),
        };
        {
            let node = &mut self.nodes[id.0];
            if new_status != previous {
                tracing::debug!(node = %node.name, from = %previous, to = %new_status, "status");
            }
            node.status = new_status;
        }
        for visitor in visitors {
            visitor.borrow_mut().run(id, &self.nodes[id.0]);
        }
        new_status
    }

    fn tick_leaf(&mut self, id: NodeId, previous: Status) -> Status {
        let node = &mut self.nodes[id.0];
        let NodeKind::Leaf(behavior) = &mut node.kind else {
            unreachable!("dispatched as leaf")
        };
        if previous != Status::Running {
            tracing::debug!(node = %node.name, "initialise");
            behavior.initialise();
        }
        let outcome = behavior.update();
        node.feedback = outcome.feedback;
        if outcome.status != previous && outcome.status != Status::Running {
            behavior.terminate(outcome.status);
        }
        outcome.status
    }

    fn tick_composite(
        &mut self,
        id: NodeId,
        previous: Status,
        policy: CompositePolicy,
        visitors: &[SharedVisitor],
    ) -> Status {
        if previous != Status::Running {
            tracing::debug!(node = %self.nodes[id.0].name, "initialise");
            if matches!(policy, CompositePolicy::Parallel { .. }) {
                // A fresh Parallel invocation wipes leftover child state,
                // including synchronise memory.
                let children = self.nodes[id.0].children.clone();
                for child in children {
                    if self.nodes[child.0].status != Status::Invalid {
                        self.stop_recursive(child, Status::Invalid);
                    }
                }
            }
        }
        let children = self.nodes[id.0].children.clone();
        match policy {
            CompositePolicy::Sequence { resume } => {
                self.tick_sequence(id, resume, &children, visitors)
            }
            CompositePolicy::Selector => self.tick_selector(id, &children, visitors),
            CompositePolicy::Parallel { policy } => {
                self.tick_parallel(id, policy, &children, visitors)
            }
        }
    }

    fn tick_sequence(
        &mut self,
        id: NodeId,
        resume: SequenceResume,
        children: &[NodeId],
        visitors: &[SharedVisitor],
    ) -> Status {
        let start = self
            .composite_state(id)
            .current
            .unwrap_or(0)
            .min(children.len() - 1);
        for (offset, &child) in children[start..].iter().enumerate() {
            let index = start + offset;
            match self.tick_node(child, visitors) {
                Status::Running => {
                    self.composite_state_mut(id).current = Some(index);
                    self.adopt_feedback(id, child);
                    return Status::Running;
                }
                Status::Failure => {
                    // Later children were never ticked this round; any still
                    // active from an earlier pass must not linger.
                    for &later in &children[index + 1..] {
                        if self.nodes[later.0].status == Status::Running {
                            self.stop_recursive(later, Status::Invalid);
                        }
                    }
                    self.composite_state_mut(id).current = match resume {
                        SequenceResume::KeepOnFailure => Some(index),
                        SequenceResume::RestartOnFailure => None,
                    };
                    self.adopt_feedback(id, child);
                    return Status::Failure;
                }
                _ => {}
            }
        }
        self.composite_state_mut(id).current = None;
        Status::Success
    }

    fn tick_selector(
        &mut self,
        id: NodeId,
        children: &[NodeId],
        visitors: &[SharedVisitor],
    ) -> Status {
        for (index, &child) in children.iter().enumerate() {
            let status = self.tick_node(child, visitors);
            if status == Status::Failure {
                continue;
            }
            // Preemption: a higher-priority success or running cancels any
            // lower-priority branch still active from a previous tick.
            for &lower in &children[index + 1..] {
                if self.nodes[lower.0].status == Status::Running {
                    self.stop_recursive(lower, Status::Invalid);
                }
            }
            self.adopt_feedback(id, child);
            return status;
        }
        Status::Failure
    }

    fn tick_parallel(
        &mut self,
        id: NodeId,
        policy: ParallelPolicy,
        children: &[NodeId],
        visitors: &[SharedVisitor],
    ) -> Status {
        let mut statuses = Vec::with_capacity(children.len());
        for &child in children {
            let prior = self.nodes[child.0].status;
            let skip = matches!(
                policy,
                ParallelPolicy::SuccessOnAll { synchronise: true }
            ) && prior == Status::Success;
            let status = if skip {
                Status::Success
            } else {
                self.tick_node(child, visitors)
            };
            statuses.push(status);
        }
        match policy {
            ParallelPolicy::SuccessOnAll { .. } => {
                if let Some(index) = statuses.iter().position(|s| *s == Status::Failure) {
                    self.halt_running_children(children);
                    self.adopt_feedback(id, children[index]);
                    Status::Failure
                } else if statuses.iter().all(|s| *s == Status::Success) {
                    Status::Success
                } else {
                    Status::Running
                }
            }
            ParallelPolicy::SuccessOnOne => {
                if let Some(index) = statuses.iter().position(|s| *s == Status::Success) {
                    self.halt_running_children(children);
                    self.adopt_feedback(id, children[index]);
                    Status::Success
                } else if statuses.iter().all(|s| *s == Status::Failure) {
                    Status::Failure
                } else {
                    Status::Running
                }
            }
        }
    }

    fn tick_decorator(
        &mut self,
        id: NodeId,
        previous: Status,
        visitors: &[SharedVisitor],
    ) -> Status {
        if previous != Status::Running {
            tracing::debug!(node = %self.nodes[id.0].name, "initialise");
        }
        let child = self.nodes[id.0].children[0];
        let child_status = self.tick_node(child, visitors);
        let (new_status, error_feedback) = {
            let NodeKind::Decorator(decorator) = &self.nodes[id.0].kind else {
                unreachable!("dispatched as decorator")
            };
            match decorator.transform(child_status) {
                Some(status) => (status, None),
                None => {
                    let Decorator::StatusToBlackboard { client, variable } = decorator else {
                        unreachable!("only the blackboard variant is stateful")
                    };
                    match client.set(variable, Value::Status(child_status)) {
                        Ok(()) => (child_status, None),
                        Err(err) => (Status::Failure, Some(err.to_string())),
                    }
                }
            }
        };
        match error_feedback {
            Some(message) => self.nodes[id.0].feedback = message,
            None => self.adopt_feedback(id, child),
        }
        new_status
    }

    fn stop_recursive(&mut self, id: NodeId, new_status: Status) {
        let children = self.nodes[id.0].children.clone();
        for child in children {
            if self.nodes[child.0].status != Status::Invalid {
                self.stop_recursive(child, Status::Invalid);
            }
        }
        let node = &mut self.nodes[id.0];
        match &mut node.kind {
            NodeKind::Leaf(behavior) => behavior.terminate(new_status),
            NodeKind::Composite(state) => {
                // Pinned policy: resume memory survives invalidation only
                // under KeepOnFailure.
                let keep = matches!(
                    state.policy,
                    CompositePolicy::Sequence {
                        resume: SequenceResume::KeepOnFailure
                    }
                );
                if !keep {
                    state.current = None;
                }
            }
            NodeKind::Decorator(_) => {}
        }
        tracing::debug!(node = %node.name, to = %new_status, "stop");
        node.status = new_status;
    }

    fn halt_running_children(&mut self, children: &[NodeId]) {
        for &child in children {
            if self.nodes[child.0].status == Status::Running {
                self.stop_recursive(child, Status::Invalid);
            }
        }
    }

    fn adopt_feedback(&mut self, id: NodeId, child: NodeId) {
        let feedback = self.nodes[child.0].feedback.clone();
        self.nodes[id.0].feedback = feedback;
    }

    fn composite_state(&self, id: NodeId) -> &CompositeState {
        match &self.nodes[id.0].kind {
            NodeKind::Composite(state) => state,
            _ => unreachable!("node is not a composite"),
        }
    }

    fn composite_state_mut(&mut self, id: NodeId) -> &mut CompositeState {
        match &mut self.nodes[id.0].kind {
            NodeKind::Composite(state) => state,
            _ => unreachable!("node is not a composite"),
        }
    }

    fn push(&mut self, name: String, kind: NodeKind, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name,
            status: Status::Invalid,
            feedback: String::new(),
            children,
            parent: None,
            kind,
        });
        id
    }

    fn claim(&mut self, child: NodeId, parent: NodeId) {
        let node = &mut self.nodes[child.0];
        assert!(
            node.parent.is_none(),
            "node '{}' already has a parent",
            node.name
        );
        node.parent = Some(parent);
    }

    fn run_pre_tick_handlers(&mut self) {
        let mut handlers = mem::take(&mut self.pre_tick);
        for handler in handlers.iter_mut() {
            handler(self);
        }
        handlers.append(&mut self.pre_tick);
        self.pre_tick = handlers;
    }

    fn run_post_tick_handlers(&mut self) {
        let mut handlers = mem::take(&mut self.post_tick);
        for handler in handlers.iter_mut() {
            handler(self);
        }
        handlers.append(&mut self.post_tick);
        self.post_tick = handlers;
    }
}
