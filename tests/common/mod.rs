#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ticktree::{Behavior, Outcome, Status};

/// Shared observation point for a [`Scripted`] leaf.
#[derive(Default)]
pub struct Probe {
    pub ticks: Cell<usize>,
    pub initialisations: Cell<usize>,
    pub terminations: RefCell<Vec<Status>>,
}

/// Replays a fixed status sequence, clamping at the last entry.
///
/// The cursor survives re-initialisation, so a preempted leaf models work
/// that really did make progress before the interruption.
pub struct Scripted {
    steps: Vec<Status>,
    cursor: usize,
    probe: Rc<Probe>,
}

pub fn scripted(steps: Vec<Status>) -> (Scripted, Rc<Probe>) {
    let probe = Rc::new(Probe::default());
    (
        Scripted {
            steps,
            cursor: 0,
            probe: probe.clone(),
        },
        probe,
    )
}

impl Behavior for Scripted {
    fn initialise(&mut self) {
        self.probe
            .initialisations
            .set(self.probe.initialisations.get() + 1);
    }

    fn update(&mut self) -> Outcome {
        self.probe.ticks.set(self.probe.ticks.get() + 1);
        let step = self.cursor.min(self.steps.len() - 1);
        self.cursor += 1;
        Outcome::new(self.steps[step])
    }

    fn terminate(&mut self, new_status: Status) {
        self.probe.terminations.borrow_mut().push(new_status);
    }
}

/// Route engine tracing into the test harness; `RUST_LOG` filters as usual.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
