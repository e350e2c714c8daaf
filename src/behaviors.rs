//! Stock leaf behaviors.
//!
//! Constants and counters for wiring up tests and skeleton trees, plus the
//! blackboard conditions and writers that most idioms are built from. Each
//! blackboard leaf owns its own [`Client`] and declares its access up front,
//! so construction fails early on conflicts; at tick time a denied or missing
//! read degrades to a status with feedback instead of aborting the tree.

use crate::behavior::{Behavior, Outcome};
use crate::blackboard::{Access, BlackboardHandle, Client, Value};
use crate::{AccessError, Status};

/// Always returns SUCCESS.
#[derive(Debug, Default)]
pub struct Success;

impl Behavior for Success {
    fn update(&mut self) -> Outcome {
        Outcome::success()
    }
}

/// Always returns FAILURE.
#[derive(Debug, Default)]
pub struct Failure;

impl Behavior for Failure {
    fn update(&mut self) -> Outcome {
        Outcome::failure()
    }
}

/// Always returns RUNNING.
#[derive(Debug, Default)]
pub struct Running;

impl Behavior for Running {
    fn update(&mut self) -> Outcome {
        Outcome::running()
    }
}

/// Rotates RUNNING, SUCCESS, FAILURE, holding each for `period` ticks.
///
/// The rotation survives re-initialisation; it models an external process
/// whose phase the tree does not control.
#[derive(Debug)]
pub struct Periodic {
    period: usize,
    count: usize,
    response: Status,
}

impl Periodic {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "period must be positive");
        Self {
            period,
            count: 0,
            response: Status::Running,
        }
    }
}

impl Behavior for Periodic {
    fn update(&mut self) -> Outcome {
        self.count += 1;
        if self.count > self.period {
            self.count = 1;
            self.response = match self.response {
                Status::Running => Status::Success,
                Status::Success => Status::Failure,
                _ => Status::Running,
            };
        }
        Outcome::new(self.response)
    }
}

/// SUCCESS on every `n`th tick, FAILURE otherwise.
///
/// The tick tally is cumulative across invocations.
#[derive(Debug)]
pub struct SuccessEveryN {
    n: usize,
    count: usize,
}

impl SuccessEveryN {
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "n must be positive");
        Self { n, count: 0 }
    }
}

impl Behavior for SuccessEveryN {
    fn update(&mut self) -> Outcome {
        self.count += 1;
        if self.count % self.n == 0 {
            Outcome::success().with_feedback(format!("tick {}", self.count))
        } else {
            Outcome::failure().with_feedback(format!("tick {}", self.count))
        }
    }
}

/// Walks FAILURE, then RUNNING, then SUCCESS as its tick count grows.
///
/// Ticks `1..=fail_until` report FAILURE, ticks up to `running_until` report
/// RUNNING, ticks up to `success_until` report SUCCESS, and everything after
/// is FAILURE for good. With `reset_on_invalid`, an external invalidation
/// rewinds the counter so the next invocation replays the whole progression.
#[derive(Debug)]
pub struct Count {
    fail_until: usize,
    running_until: usize,
    success_until: usize,
    reset_on_invalid: bool,
    count: usize,
}

impl Count {
    pub fn new(
        fail_until: usize,
        running_until: usize,
        success_until: usize,
        reset_on_invalid: bool,
    ) -> Self {
        assert!(
            fail_until <= running_until && running_until <= success_until,
            "thresholds must be ordered: fail_until <= running_until <= success_until"
        );
        Self {
            fail_until,
            running_until,
            success_until,
            reset_on_invalid,
            count: 0,
        }
    }
}

impl Behavior for Count {
    fn update(&mut self) -> Outcome {
        self.count += 1;
        let status = if self.count <= self.fail_until {
            Status::Failure
        } else if self.count <= self.running_until {
            Status::Running
        } else if self.count <= self.success_until {
            Status::Success
        } else {
            Status::Failure
        };
        Outcome::new(status).with_feedback(format!("count {}", self.count))
    }

    fn terminate(&mut self, new_status: Status) {
        if self.reset_on_invalid && new_status == Status::Invalid {
            self.count = 0;
        }
    }
}

/// SUCCESS when the variable exists, FAILURE otherwise.
#[derive(Debug)]
pub struct CheckBlackboardExists {
    client: Client,
    variable: String,
}

impl CheckBlackboardExists {
    pub fn new(
        handle: &BlackboardHandle,
        variable: impl Into<String>,
    ) -> Result<Self, AccessError> {
        let variable = variable.into();
        let client = Client::new(handle, format!("check_exists:{variable}"));
        client.register_key(&variable, Access::Read)?;
        Ok(Self { client, variable })
    }
}

impl Behavior for CheckBlackboardExists {
    fn update(&mut self) -> Outcome {
        match self.client.get(&self.variable) {
            Ok(_) => Outcome::success(),
            Err(err) => Outcome::failure().with_feedback(err.to_string()),
        }
    }
}

/// RUNNING until the variable exists, then SUCCESS.
#[derive(Debug)]
pub struct WaitForBlackboard {
    client: Client,
    variable: String,
}

impl WaitForBlackboard {
    pub fn new(
        handle: &BlackboardHandle,
        variable: impl Into<String>,
    ) -> Result<Self, AccessError> {
        let variable = variable.into();
        let client = Client::new(handle, format!("wait_for:{variable}"));
        client.register_key(&variable, Access::Read)?;
        Ok(Self { client, variable })
    }
}

impl Behavior for WaitForBlackboard {
    fn update(&mut self) -> Outcome {
        match self.client.get(&self.variable) {
            Ok(_) => Outcome::success(),
            Err(err) => Outcome::running().with_feedback(err.to_string()),
        }
    }
}

/// SUCCESS when the variable equals the expected value, FAILURE otherwise.
///
/// A missing key or attribute counts as a mismatch, not an abort.
#[derive(Debug)]
pub struct CheckBlackboardValue {
    client: Client,
    variable: String,
    expected: Value,
}

impl CheckBlackboardValue {
    pub fn new(
        handle: &BlackboardHandle,
        variable: impl Into<String>,
        expected: impl Into<Value>,
    ) -> Result<Self, AccessError> {
        let variable = variable.into();
        let client = Client::new(handle, format!("check_value:{variable}"));
        client.register_key(&variable, Access::Read)?;
        Ok(Self {
            client,
            variable,
            expected: expected.into(),
        })
    }
}

impl Behavior for CheckBlackboardValue {
    fn update(&mut self) -> Outcome {
        match self.client.get(&self.variable) {
            Ok(value) if value == self.expected => Outcome::success(),
            Ok(value) => Outcome::failure()
                .with_feedback(format!("'{}' is {value}, wanted {}", self.variable, self.expected)),
            Err(err) => Outcome::failure().with_feedback(err.to_string()),
        }
    }
}

/// RUNNING until the variable equals the expected value, then SUCCESS.
#[derive(Debug)]
pub struct WaitForBlackboardValue {
    client: Client,
    variable: String,
    expected: Value,
}

impl WaitForBlackboardValue {
    pub fn new(
        handle: &BlackboardHandle,
        variable: impl Into<String>,
        expected: impl Into<Value>,
    ) -> Result<Self, AccessError> {
        let variable = variable.into();
        let client = Client::new(handle, format!("wait_for_value:{variable}"));
        client.register_key(&variable, Access::Read)?;
        Ok(Self {
            client,
            variable,
            expected: expected.into(),
        })
    }
}

impl Behavior for WaitForBlackboardValue {
    fn update(&mut self) -> Outcome {
        match self.client.get(&self.variable) {
            Ok(value) if value == self.expected => Outcome::success(),
            Ok(_) | Err(_) => Outcome::running(),
        }
    }
}

/// Writes a value to the blackboard each tick.
///
/// With `overwrite` off, an already-present value is left alone and the tick
/// reports FAILURE, making one-time initialization observable.
#[derive(Debug)]
pub struct SetBlackboard {
    client: Client,
    variable: String,
    value: Value,
    overwrite: bool,
}

impl SetBlackboard {
    pub fn new(
        handle: &BlackboardHandle,
        variable: impl Into<String>,
        value: impl Into<Value>,
        overwrite: bool,
    ) -> Result<Self, AccessError> {
        let variable = variable.into();
        let client = Client::new(handle, format!("set:{variable}"));
        client.register_key(&variable, Access::Write)?;
        Ok(Self {
            client,
            variable,
            value: value.into(),
            overwrite,
        })
    }
}

impl Behavior for SetBlackboard {
    fn update(&mut self) -> Outcome {
        if self.overwrite {
            return match self.client.set(&self.variable, self.value.clone()) {
                Ok(()) => Outcome::success(),
                Err(err) => Outcome::failure().with_feedback(err.to_string()),
            };
        }
        match self.client.set_if_absent(&self.variable, self.value.clone()) {
            Ok(true) => Outcome::success(),
            Ok(false) => Outcome::failure()
                .with_feedback(format!("'{}' already set", self.variable)),
            Err(err) => Outcome::failure().with_feedback(err.to_string()),
        }
    }
}

/// Removes a variable; SUCCESS whether or not it was present.
#[derive(Debug)]
pub struct UnsetBlackboard {
    client: Client,
    variable: String,
}

impl UnsetBlackboard {
    pub fn new(
        handle: &BlackboardHandle,
        variable: impl Into<String>,
    ) -> Result<Self, AccessError> {
        let variable = variable.into();
        let client = Client::new(handle, format!("unset:{variable}"));
        client.register_key(&variable, Access::Write)?;
        Ok(Self { client, variable })
    }
}

impl Behavior for UnsetBlackboard {
    fn update(&mut self) -> Outcome {
        match self.client.unset(&self.variable) {
            Ok(present) => Outcome::success().with_feedback(if present {
                "cleared"
            } else {
                "was not set"
            }),
            Err(err) => Outcome::failure().with_feedback(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::Blackboard;

    fn tick(behavior: &mut impl Behavior) -> Status {
        behavior.update().status
    }

    #[test]
    fn periodic_rotates_through_all_three_states() {
        let mut periodic = Periodic::new(2);
        let statuses: Vec<Status> = (0..6).map(|_| tick(&mut periodic)).collect();
        assert_eq!(
            statuses,
            vec![
                Status::Running,
                Status::Running,
                Status::Success,
                Status::Success,
                Status::Failure,
                Status::Failure,
            ]
        );
    }

    #[test]
    fn success_every_n_counts_cumulatively() {
        let mut leaf = SuccessEveryN::new(3);
        assert_eq!(tick(&mut leaf), Status::Failure);
        assert_eq!(tick(&mut leaf), Status::Failure);
        assert_eq!(tick(&mut leaf), Status::Success);
        assert_eq!(tick(&mut leaf), Status::Failure);
    }

    #[test]
    fn count_walks_failure_running_success() {
        let mut count = Count::new(1, 2, 4, false);
        assert_eq!(tick(&mut count), Status::Failure);
        assert_eq!(tick(&mut count), Status::Running);
        assert_eq!(tick(&mut count), Status::Success);
        assert_eq!(tick(&mut count), Status::Success);
    }

    #[test]
    fn count_fails_for_good_past_its_success_window() {
        let mut count = Count::new(0, 0, 2, false);
        assert_eq!(tick(&mut count), Status::Success);
        assert_eq!(tick(&mut count), Status::Success);
        assert_eq!(tick(&mut count), Status::Failure);
        assert_eq!(tick(&mut count), Status::Failure);
    }

    #[test]
    fn count_rewinds_on_invalidation_when_asked() {
        let mut count = Count::new(1, 1, 2, true);
        assert_eq!(tick(&mut count), Status::Failure);
        assert_eq!(tick(&mut count), Status::Success);
        count.terminate(Status::Invalid);
        assert_eq!(tick(&mut count), Status::Failure);
    }

    #[test]
    fn existence_checks_report_missing_keys_as_status() {
        let bb = Blackboard::new_shared();
        let mut check = CheckBlackboardExists::new(&bb, "flag").unwrap();
        let mut wait = WaitForBlackboard::new(&bb, "flag").unwrap();

        assert_eq!(tick(&mut check), Status::Failure);
        assert_eq!(tick(&mut wait), Status::Running);

        let mut set = SetBlackboard::new(&bb, "flag", true, true).unwrap();
        assert_eq!(tick(&mut set), Status::Success);

        assert_eq!(tick(&mut check), Status::Success);
        assert_eq!(tick(&mut wait), Status::Success);
    }

    #[test]
    fn value_check_distinguishes_mismatch_from_absence_in_feedback() {
        let bb = Blackboard::new_shared();
        let mut check = CheckBlackboardValue::new(&bb, "mode", "auto").unwrap();
        assert_eq!(tick(&mut check), Status::Failure);

        let mut set = SetBlackboard::new(&bb, "mode", "manual", true).unwrap();
        tick(&mut set);
        let outcome = check.update();
        assert_eq!(outcome.status, Status::Failure);
        assert!(outcome.feedback.contains("manual"));

        let mut set_auto = SetBlackboard::new(&bb, "mode", "auto", true).unwrap();
        tick(&mut set_auto);
        assert_eq!(tick(&mut check), Status::Success);
    }

    #[test]
    fn wait_for_value_runs_until_match() {
        let bb = Blackboard::new_shared();
        let mut wait =
            WaitForBlackboardValue::new(&bb, "result", Value::Status(Status::Success)).unwrap();
        assert_eq!(tick(&mut wait), Status::Running);

        let mut set =
            SetBlackboard::new(&bb, "result", Value::Status(Status::Success), true).unwrap();
        tick(&mut set);
        assert_eq!(tick(&mut wait), Status::Success);
    }

    #[test]
    fn set_without_overwrite_fails_on_second_write() {
        let bb = Blackboard::new_shared();
        let mut set = SetBlackboard::new(&bb, "once", 1i64, false).unwrap();
        assert_eq!(tick(&mut set), Status::Success);
        assert_eq!(tick(&mut set), Status::Failure);
    }

    #[test]
    fn unset_succeeds_regardless_of_presence() {
        let bb = Blackboard::new_shared();
        let mut set = SetBlackboard::new(&bb, "tmp", 1i64, true).unwrap();
        let mut unset = UnsetBlackboard::new(&bb, "tmp").unwrap();

        assert_eq!(tick(&mut unset), Status::Success);
        tick(&mut set);
        assert_eq!(tick(&mut unset), Status::Success);
        assert!(!bb.borrow().contains("/tmp"));
    }
}
