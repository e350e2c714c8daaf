//! Subtree factories for common patterns.
//!
//! Each factory wires stock leaves, decorators and composites into a subtree
//! inside a caller-supplied tree and returns the subtree's root id. The
//! blackboard keys they coordinate through are explicit inputs; nothing is
//! derived from hidden global state, so construction can fail loudly on
//! conflicts instead of silently renaming.

use std::collections::HashSet;

use crate::ConstructionError;
use crate::Status;
use crate::behaviors::{
    CheckBlackboardExists, CheckBlackboardValue, Failure, SetBlackboard, UnsetBlackboard,
};
use crate::blackboard::{BlackboardHandle, SEPARATOR};
use crate::composite::ParallelPolicy;
use crate::decorator::Decorator;
use crate::tree::{BehaviorTree, NodeId};

/// When a oneshot latches its completion flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneShotPolicy {
    /// Latch only on SUCCESS; a failed attempt may be retried on a later
    /// tick.
    OnSuccessfulCompletion,

    /// Latch on either terminal status; one attempt, ever.
    OnCompletion,
}

/// Run `worker` to completion exactly once, then replay its result forever.
///
/// After completion every subsequent tick short-circuits on the recorded
/// result without re-entering the worker. The flag lives under `variable` on
/// the blackboard and holds the completion [`Status`].
pub fn oneshot(
    tree: &mut BehaviorTree,
    blackboard: &BlackboardHandle,
    name: &str,
    variable: &str,
    policy: OneShotPolicy,
    worker: NodeId,
) -> Result<NodeId, ConstructionError> {
    let completed = tree.add_leaf(
        "Completed?",
        CheckBlackboardExists::new(blackboard, variable)?,
    );
    let not_completed = tree.add_decorator("Not Completed?", Decorator::Inverter, completed);

    let mark_success = tree.add_leaf(
        "Mark Done [SUCCESS]",
        SetBlackboard::new(blackboard, variable, Status::Success, true)?,
    );
    let work = tree.add_sequence("Oneshot", vec![worker, mark_success]);

    let attempt = match policy {
        OneShotPolicy::OnSuccessfulCompletion => work,
        OneShotPolicy::OnCompletion => {
            let mark_failure = tree.add_leaf(
                "Mark Done [FAILURE]",
                SetBlackboard::new(blackboard, variable, Status::Failure, true)?,
            );
            let fail = tree.add_leaf("Failure", Failure);
            let bookkeeping = tree.add_sequence("Bookkeeping", vec![mark_failure, fail]);
            tree.add_selector("Oneshot Handler", vec![work, bookkeeping])
        }
    };
    let guarded = tree.add_sequence("Oneshot w/ Guard", vec![not_completed, attempt]);

    let result = tree.add_leaf(
        "Oneshot Result",
        CheckBlackboardValue::new(blackboard, variable, Status::Success)?,
    );
    Ok(tree.add_selector(name, vec![guarded, result]))
}

/// Guard `subtree` continuously, not just on entry.
///
/// The conditions are re-evaluated every tick alongside the guarded work;
/// the moment any of them fails, the work is aborted. Each condition mirrors
/// its status onto the paired blackboard variable, which the abort triggers
/// watch.
pub fn eternal_guard(
    tree: &mut BehaviorTree,
    blackboard: &BlackboardHandle,
    name: &str,
    conditions: Vec<NodeId>,
    variables: Vec<String>,
    subtree: NodeId,
) -> Result<NodeId, ConstructionError> {
    const IDIOM: &str = "eternal_guard";
    if conditions.is_empty() {
        return Err(ConstructionError::NoTasks { idiom: IDIOM });
    }
    if conditions.len() != variables.len() {
        return Err(ConstructionError::CountMismatch {
            idiom: IDIOM,
            conditions: conditions.len(),
            variables: variables.len(),
        });
    }
    let mut seen = HashSet::new();
    for variable in &variables {
        if !seen.insert(variable.as_str()) {
            return Err(ConstructionError::DuplicateKey {
                idiom: IDIOM,
                key: variable.clone(),
            });
        }
    }

    let mut children = Vec::with_capacity(conditions.len() + 1);
    let mut abort_triggers = Vec::with_capacity(conditions.len() + 1);
    for (condition, variable) in conditions.into_iter().zip(&variables) {
        let condition_name = tree.name(condition).to_string();
        let decorated = tree.add_decorator(
            "StatusToBB",
            Decorator::status_to_blackboard(blackboard, variable.clone())?,
            condition,
        );
        children.push(decorated);
        abort_triggers.push(tree.add_leaf(
            format!("Abort on {condition_name}"),
            CheckBlackboardValue::new(blackboard, variable.as_str(), Status::Failure)?,
        ));
    }
    abort_triggers.push(subtree);
    let guarded_tasks = tree.add_selector("Guarded Tasks", abort_triggers);
    children.push(guarded_tasks);

    Ok(tree.add_parallel(
        name,
        ParallelPolicy::SuccessOnAll { synchronise: false },
        children,
    ))
}

/// Derives the blackboard key that marks a task as done.
///
/// Injected into [`pick_up_where_you_left_off`] so callers control the key
/// space instead of inheriting a fixed naming scheme.
pub trait KeyStrategy {
    fn done_key(&self, task_name: &str) -> String;
}

/// Lowercased, underscore-joined task names under a fixed prefix:
/// `"Task One"` becomes `/<prefix>/task_one_done`.
#[derive(Debug, Clone)]
pub struct SlugKeys {
    prefix: String,
}

impl SlugKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_matches(SEPARATOR).to_string(),
        }
    }
}

impl KeyStrategy for SlugKeys {
    fn done_key(&self, task_name: &str) -> String {
        let slug = task_name.to_lowercase().replace(' ', "_");
        if self.prefix.is_empty() {
            format!("{SEPARATOR}{slug}_done")
        } else {
            format!("{SEPARATOR}{}{SEPARATOR}{slug}_done", self.prefix)
        }
    }
}

/// Run `tasks` in order, skipping any already marked done on a previous
/// (possibly interrupted) pass.
///
/// Each task is wrapped so that completing it latches a done flag; if the
/// whole sequence is preempted partway, the next pass rebounds off the flags
/// straight to the unfinished work. The flags are cleared only after every
/// task has completed, so a fresh pass starts clean.
pub fn pick_up_where_you_left_off(
    tree: &mut BehaviorTree,
    blackboard: &BlackboardHandle,
    name: &str,
    tasks: Vec<NodeId>,
    keys: &dyn KeyStrategy,
) -> Result<NodeId, ConstructionError> {
    const IDIOM: &str = "pick_up_where_you_left_off";
    if tasks.is_empty() {
        return Err(ConstructionError::NoTasks { idiom: IDIOM });
    }

    let done_keys: Vec<String> = tasks
        .iter()
        .map(|&task| keys.done_key(tree.name(task)))
        .collect();
    let mut seen = HashSet::new();
    for key in &done_keys {
        if !seen.insert(key.as_str()) {
            return Err(ConstructionError::DuplicateKey {
                idiom: IDIOM,
                key: key.clone(),
            });
        }
    }

    let mut children = Vec::with_capacity(tasks.len() * 2);
    for (task, key) in tasks.into_iter().zip(&done_keys) {
        let task_name = tree.name(task).to_string();
        let guard = tree.add_leaf(
            "Done?",
            CheckBlackboardValue::new(blackboard, key.as_str(), true)?,
        );
        let mark_done = tree.add_leaf(
            format!("Mark {task_name} Done"),
            SetBlackboard::new(blackboard, key.as_str(), true, true)?,
        );
        let worker = tree.add_sequence("Worker", vec![task, mark_done]);
        children.push(tree.add_selector("Do or Don't", vec![guard, worker]));
    }
    for key in &done_keys {
        children.push(tree.add_leaf(
            format!("Clear {key}"),
            UnsetBlackboard::new(blackboard, key.as_str())?,
        ));
    }
    Ok(tree.add_sequence(name, children))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors;
    use crate::blackboard::Blackboard;

    #[test]
    fn slug_keys_derive_prefixed_done_flags() {
        let keys = SlugKeys::new("pickup");
        assert_eq!(keys.done_key("Task One"), "/pickup/task_one_done");

        let bare = SlugKeys::new("");
        assert_eq!(bare.done_key("Task One"), "/task_one_done");
    }

    #[test]
    fn eternal_guard_rejects_mismatched_inputs() {
        let mut tree = BehaviorTree::new();
        let bb = Blackboard::new_shared();
        let condition = tree.add_leaf("battery ok", behaviors::Success);
        let work = tree.add_leaf("work", behaviors::Running);

        let err = eternal_guard(
            &mut tree,
            &bb,
            "guard",
            vec![condition],
            vec!["a".to_string(), "b".to_string()],
            work,
        )
        .unwrap_err();
        assert!(matches!(err, ConstructionError::CountMismatch { .. }));
    }

    #[test]
    fn eternal_guard_rejects_duplicate_variables() {
        let mut tree = BehaviorTree::new();
        let bb = Blackboard::new_shared();
        let c1 = tree.add_leaf("c1", behaviors::Success);
        let c2 = tree.add_leaf("c2", behaviors::Success);
        let work = tree.add_leaf("work", behaviors::Running);

        let err = eternal_guard(
            &mut tree,
            &bb,
            "guard",
            vec![c1, c2],
            vec!["same".to_string(), "same".to_string()],
            work,
        )
        .unwrap_err();
        assert!(matches!(err, ConstructionError::DuplicateKey { .. }));
    }

    #[test]
    fn pick_up_requires_tasks_and_distinct_keys() {
        let mut tree = BehaviorTree::new();
        let bb = Blackboard::new_shared();
        let keys = SlugKeys::new("pickup");

        let err =
            pick_up_where_you_left_off(&mut tree, &bb, "chores", vec![], &keys).unwrap_err();
        assert!(matches!(err, ConstructionError::NoTasks { .. }));

        // Two tasks whose names slug to the same key.
        let a = tree.add_leaf("Task One", behaviors::Success);
        let b = tree.add_leaf("task one", behaviors::Success);
        let err = pick_up_where_you_left_off(&mut tree, &bb, "chores", vec![a, b], &keys)
            .unwrap_err();
        assert!(matches!(err, ConstructionError::DuplicateKey { .. }));
    }
}
