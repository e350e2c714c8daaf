//! Error types raised by the engine.
//!
//! Only setup-time and construction-time errors are allowed to abort a tree;
//! anything that goes wrong inside a single node's `update()` is reported as
//! [`Status::Failure`](crate::Status) with a feedback message instead.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced when reading from the blackboard.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KeyError {
    #[error("key '{key}' does not yet exist on the blackboard")]
    Missing { key: String },

    #[error("client '{client}' is not registered to read key '{key}'")]
    ReadDenied { key: String, client: String },

    #[error("key '{key}' exists, but its value has no nested attribute '{attribute}'")]
    AttributeNotFound { key: String, attribute: String },
}

/// Access-mode conflicts on the blackboard.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccessError {
    #[error("client '{client}' is not registered to write key '{key}'")]
    WriteDenied { key: String, client: String },

    #[error("key '{key}' is exclusively owned by client '{owner}'")]
    ExclusiveOwnerExists { key: String, owner: String },

    #[error("cannot grant exclusive write on '{key}': other clients already hold write access")]
    WritersExist { key: String },
}

/// Errors surfaced during one-time tree setup.
///
/// Setup failures must be visible before any tick is attempted; they indicate
/// the tree is unusable rather than merely unsuccessful this cycle.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("setup timed out at node '{node}': {elapsed:?} elapsed of a {budget:?} budget")]
    Timeout {
        node: String,
        budget: Duration,
        elapsed: Duration,
    },

    #[error("setup failed at node '{node}': {reason}")]
    Failed { node: String, reason: String },
}

impl SetupError {
    /// Failure originating inside a behavior's own `setup()`.
    ///
    /// The node name is attached by the tree while unwinding.
    pub fn failed(reason: impl Into<String>) -> Self {
        SetupError::Failed {
            node: String::new(),
            reason: reason.into(),
        }
    }

    pub(crate) fn with_node(self, name: &str) -> Self {
        match self {
            SetupError::Failed { node, reason } if node.is_empty() => SetupError::Failed {
                node: name.to_string(),
                reason,
            },
            other => other,
        }
    }
}

/// An idiom's invariants cannot be satisfied from its inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError {
    #[error("idiom '{idiom}' requires at least one task")]
    NoTasks { idiom: &'static str },

    #[error("idiom '{idiom}' was given {conditions} conditions but {variables} blackboard variables")]
    CountMismatch {
        idiom: &'static str,
        conditions: usize,
        variables: usize,
    },

    #[error("derived blackboard key '{key}' collides with another task in idiom '{idiom}'")]
    DuplicateKey { idiom: &'static str, key: String },

    #[error("blackboard registration failed: {0}")]
    Blackboard(#[from] AccessError),
}
