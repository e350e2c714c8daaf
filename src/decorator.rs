//! Decorator node kinds.
//!
//! Decorators wrap a single child and either transform its status or
//! side-channel it to the blackboard. The set is closed; the tick engine in
//! [`crate::tree`] applies the transforms.

use crate::blackboard::{Access, BlackboardHandle, Client};
use crate::{AccessError, Status};

/// A single-child wrapper.
pub enum Decorator {
    /// SUCCESS becomes FAILURE and vice versa; RUNNING passes through.
    Inverter,

    /// Any completed child status becomes SUCCESS; RUNNING passes through.
    ///
    /// Useful for optional work that must not fail an enclosing sequence.
    AlwaysSucceed,

    /// FAILURE becomes RUNNING, turning a flaky condition into a wait.
    FailureIsRunning,

    /// Mirrors the child's status onto a blackboard variable every tick,
    /// then passes the status through unchanged. A denied write degrades to
    /// FAILURE with feedback rather than panicking.
    StatusToBlackboard { client: Client, variable: String },
}

impl Decorator {
    /// Build a [`Decorator::StatusToBlackboard`], registering write access
    /// for the target variable.
    pub fn status_to_blackboard(
        handle: &BlackboardHandle,
        variable: impl Into<String>,
    ) -> Result<Self, AccessError> {
        let variable = variable.into();
        let client = Client::new(handle, format!("status_to_bb:{variable}"));
        client.register_key(&variable, Access::Write)?;
        Ok(Decorator::StatusToBlackboard { client, variable })
    }

    /// Pure status transform for the stateless variants.
    ///
    /// Returns `None` for variants that need blackboard access; the tick
    /// engine handles those itself.
    pub(crate) fn transform(&self, child_status: Status) -> Option<Status> {
        match self {
            Decorator::Inverter => Some(match child_status {
                Status::Success => Status::Failure,
                Status::Failure => Status::Success,
                other => other,
            }),
            Decorator::AlwaysSucceed => Some(match child_status {
                Status::Running => Status::Running,
                _ => Status::Success,
            }),
            Decorator::FailureIsRunning => Some(match child_status {
                Status::Failure => Status::Running,
                other => other,
            }),
            Decorator::StatusToBlackboard { .. } => None,
        }
    }
}
