//! Core behavior trait.
//!
//! This module defines the [`Behavior`] trait, which is the contract every
//! leaf node implements. Composites and decorators are closed variant sets
//! owned by the tree; only leaves carry user logic, so only leaves implement
//! this trait.

use std::time::Duration;

use crate::{SetupError, Status};

/// A leaf node's lifecycle contract.
///
/// The tick engine drives the lifecycle: when a node is entered from a
/// non-RUNNING state, [`initialise`](Behavior::initialise) runs first, then
/// [`update`](Behavior::update) computes the new status. When the status
/// changes away from the previous one, or the node is invalidated from
/// outside, [`terminate`](Behavior::terminate) runs for cleanup.
///
/// Side effects are confined to the node's own state and its registered
/// blackboard keys.
pub trait Behavior {
    /// One-time, fallible resource acquisition.
    ///
    /// `timeout` is the remaining budget for the whole tree's setup pass.
    /// The tree must not be ticked before every node reports success here.
    fn setup(&mut self, _timeout: Duration) -> Result<(), SetupError> {
        Ok(())
    }

    /// Reset per-task volatile state.
    ///
    /// Called exactly when the node transitions from a non-RUNNING state into
    /// active execution, never while it stays RUNNING across ticks.
    fn initialise(&mut self) {}

    /// Compute the new status and feedback for this tick.
    fn update(&mut self) -> Outcome;

    /// Cleanup on completion or invalidation.
    ///
    /// `new_status` is the status the node is transitioning to; it is
    /// [`Status::Invalid`] when a parent preempts this node.
    fn terminate(&mut self, _new_status: Status) {}
}

/// The result of a single [`Behavior::update`] call: the new status plus a
/// human-readable feedback message for observability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: Status,
    pub feedback: String,
}

impl Outcome {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            feedback: String::new(),
        }
    }

    pub fn success() -> Self {
        Self::new(Status::Success)
    }

    pub fn failure() -> Self {
        Self::new(Status::Failure)
    }

    pub fn running() -> Self {
        Self::new(Status::Running)
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = feedback.into();
        self
    }
}

impl From<Status> for Outcome {
    fn from(status: Status) -> Self {
        Outcome::new(status)
    }
}
