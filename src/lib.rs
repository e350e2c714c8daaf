//! Tick-driven behavior tree engine with a shared blackboard.
//!
//! Trees are arenas of nodes ticked from the root: composites route control
//! flow, decorators reshape a single child's result, and leaves carry user
//! logic behind the [`Behavior`] trait. A tick is cheap and side-effect free
//! outside the nodes it reaches, so trees are ticked at a steady cadence and
//! higher-priority branches preempt lower ones between ticks, not inside
//! them.
//!
//! Coordination happens over a [`blackboard::Blackboard`]: a shared key/value
//! store with per-client access declarations, namespaces and an optional
//! activity stream for debugging.
//!
//! # Example
//!
//! ```
//! use ticktree::behaviors::{CheckBlackboardExists, SetBlackboard};
//! use ticktree::blackboard::Blackboard;
//! use ticktree::{BehaviorTree, Status};
//!
//! # fn main() -> Result<(), ticktree::AccessError> {
//! let bb = Blackboard::new_shared();
//! let mut tree = BehaviorTree::new();
//! let set = tree.add_leaf("set", SetBlackboard::new(&bb, "flag", true, true)?);
//! let check = tree.add_leaf("check", CheckBlackboardExists::new(&bb, "flag")?);
//! let root = tree.add_sequence("root", vec![set, check]);
//! tree.set_root(root);
//!
//! assert_eq!(tree.tick_once(), Status::Success);
//! # Ok(())
//! # }
//! ```

pub mod behavior;
pub mod behaviors;
pub mod blackboard;
pub mod composite;
pub mod decorator;
pub mod error;
pub mod idioms;
pub mod status;
pub mod tree;
pub mod visitor;

pub use behavior::{Behavior, Outcome};
pub use composite::{CompositePolicy, ParallelPolicy, SequenceResume};
pub use decorator::Decorator;
pub use error::{AccessError, ConstructionError, KeyError, SetupError};
pub use status::Status;
pub use tree::{BehaviorTree, Node, NodeId, SharedVisitor};
pub use visitor::{SnapshotVisitor, Visitor};
