//! Per-node tick instrumentation.

use std::collections::HashMap;
use std::mem;

use crate::Status;
use crate::tree::{Node, NodeId};

/// Runs against every node as it is ticked, read-only.
///
/// Visitors observe; they never influence control flow. `initialise` fires
/// once at the start of each full tree tick.
pub trait Visitor {
    fn initialise(&mut self) {}

    fn run(&mut self, id: NodeId, node: &Node);
}

/// Records which nodes were ticked this cycle and with what status, keeping
/// the previous cycle's snapshot for diffing.
#[derive(Debug, Default)]
pub struct SnapshotVisitor {
    visited: HashMap<NodeId, Status>,
    previously_visited: HashMap<NodeId, Status>,
}

impl SnapshotVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes ticked during the current (or just-finished) cycle.
    pub fn visited(&self) -> &HashMap<NodeId, Status> {
        &self.visited
    }

    /// The snapshot from the cycle before.
    pub fn previously_visited(&self) -> &HashMap<NodeId, Status> {
        &self.previously_visited
    }

    /// Whether anything changed between the last two cycles.
    pub fn changed(&self) -> bool {
        self.visited != self.previously_visited
    }
}

impl Visitor for SnapshotVisitor {
    fn initialise(&mut self) {
        self.previously_visited = mem::take(&mut self.visited);
    }

    fn run(&mut self, id: NodeId, node: &Node) {
        self.visited.insert(id, node.status());
    }
}
