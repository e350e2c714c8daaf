//! Composite policies.
//!
//! Control flow over ordered children is dispatched by an explicit policy
//! field rather than a class hierarchy: exactly one [`CompositePolicy`]
//! variant governs a node for its lifetime. The tick state machines that
//! interpret these policies live in [`crate::tree`].

/// What a Sequence does with its resume index when it stops being RUNNING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceResume {
    /// Forget progress on failure and on external invalidation; the next
    /// pass restarts from the first child.
    #[default]
    RestartOnFailure,

    /// Keep the resume index across a child failure, and across external
    /// invalidation (preemption by a higher-priority branch). Used by idioms
    /// that rely on partial-completion memory.
    KeepOnFailure,
}

/// Aggregation rule for a Parallel composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelPolicy {
    /// Fail immediately if any child fails; succeed once every child has
    /// reported SUCCESS. With `synchronise`, successes accumulate across
    /// ticks of the same invocation and finished children are not re-ticked;
    /// without it, every child is re-evaluated every round.
    SuccessOnAll { synchronise: bool },

    /// Succeed as soon as any one child succeeds, cancelling the rest.
    SuccessOnOne,
}

/// The combination rule governing a composite node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositePolicy {
    /// Logical AND, ordered, with memory: resumes from the last RUNNING
    /// child; the first FAILURE short-circuits.
    Sequence { resume: SequenceResume },

    /// Logical OR, priority-ordered: re-scans from the first child every
    /// tick; the first non-FAILURE child decides the result and preempts any
    /// lower-priority child still RUNNING from an earlier tick.
    Selector,

    /// Ticks every child each cycle and aggregates per [`ParallelPolicy`].
    Parallel { policy: ParallelPolicy },
}

impl CompositePolicy {
    /// Sequence with the default restart-on-failure resume rule.
    pub fn sequence() -> Self {
        CompositePolicy::Sequence {
            resume: SequenceResume::default(),
        }
    }

    pub fn selector() -> Self {
        CompositePolicy::Selector
    }

    pub fn parallel(policy: ParallelPolicy) -> Self {
        CompositePolicy::Parallel { policy }
    }
}

/// Per-node composite state interpreted by the tick engine.
#[derive(Debug)]
pub(crate) struct CompositeState {
    pub(crate) policy: CompositePolicy,
    /// Resume index for sequences; bookkeeping only for other policies.
    pub(crate) current: Option<usize>,
}

impl CompositeState {
    pub(crate) fn new(policy: CompositePolicy) -> Self {
        Self {
            policy,
            current: None,
        }
    }
}
