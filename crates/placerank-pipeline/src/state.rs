//! Run state machine: `Idle -> Running -> {Succeeded, Failed} -> Idle`.
//!
//! Only one run may hold the machine at a time; a trigger that arrives while
//! a run is in progress is refused rather than queued. Settling a run returns
//! the machine to `Idle` in the same step, so [`RunStateMachine::state`] only
//! ever reports `Idle` or `Running`; the terminal state of the last run is
//! kept in [`RunStateMachine::last_outcome`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::report::RunOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug)]
struct Inner {
    state: RunState,
    last_outcome: Option<RunState>,
    completed_runs: u64,
}

#[derive(Debug, Clone)]
pub struct RunStateMachine {
    inner: Arc<Mutex<Inner>>,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: RunState::Idle,
                last_outcome: None,
                completed_runs: 0,
            })),
        }
    }
}

impl RunStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.lock().state
    }

    /// Terminal state of the most recent run, if any has finished.
    #[must_use]
    pub fn last_outcome(&self) -> Option<RunState> {
        self.lock().last_outcome
    }

    #[must_use]
    pub fn completed_runs(&self) -> u64 {
        self.lock().completed_runs
    }

    /// Moves `Idle -> Running`. Returns `None` while another run holds the
    /// machine.
    #[must_use]
    pub fn try_begin(&self) -> Option<RunGuard> {
        let mut inner = self.lock();
        if inner.state != RunState::Idle {
            return None;
        }
        inner.state = RunState::Running;
        Some(RunGuard {
            machine: self.clone(),
            settled: false,
        })
    }

    fn settle(&self, terminal: RunState) {
        let mut inner = self.lock();
        tracing::debug!(state = ?terminal, "run settled");
        inner.last_outcome = Some(terminal);
        inner.completed_runs += 1;
        inner.state = RunState::Idle;
    }
}

/// Proof that a run holds the machine. Dropping it without calling
/// [`RunGuard::finish`] records the run as failed.
#[derive(Debug)]
pub struct RunGuard {
    machine: RunStateMachine,
    settled: bool,
}

impl RunGuard {
    pub fn finish(mut self, outcome: RunOutcome) {
        let terminal = match outcome {
            RunOutcome::Succeeded => RunState::Succeeded,
            RunOutcome::Failed => RunState::Failed,
        };
        self.machine.settle(terminal);
        self.settled = true;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("run ended without reporting an outcome; recording failure");
            self.machine.settle(RunState::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_refused_while_running() {
        let machine = RunStateMachine::new();
        let guard = machine.try_begin().expect("idle machine should start");

        assert_eq!(machine.state(), RunState::Running);
        assert!(machine.try_begin().is_none());

        guard.finish(RunOutcome::Succeeded);
        assert_eq!(machine.state(), RunState::Idle);
        assert_eq!(machine.last_outcome(), Some(RunState::Succeeded));
        assert!(machine.try_begin().is_some());
    }

    #[test]
    fn failed_run_returns_to_idle() {
        let machine = RunStateMachine::new();
        machine.try_begin().unwrap().finish(RunOutcome::Failed);

        assert_eq!(machine.state(), RunState::Idle);
        assert_eq!(machine.last_outcome(), Some(RunState::Failed));
    }

    #[test]
    fn observed_state_is_never_terminal() {
        let machine = RunStateMachine::new();
        let mut seen = vec![machine.state()];
        let guard = machine.try_begin().unwrap();
        seen.push(machine.state());
        guard.finish(RunOutcome::Succeeded);
        seen.push(machine.state());

        assert_eq!(seen, vec![RunState::Idle, RunState::Running, RunState::Idle]);
        assert_eq!(machine.last_outcome(), Some(RunState::Succeeded));
        assert_eq!(machine.completed_runs(), 1);
    }

    #[test]
    fn dropped_guard_records_failure() {
        let machine = RunStateMachine::new();
        {
            let _guard = machine.try_begin().unwrap();
        }

        assert_eq!(machine.state(), RunState::Idle);
        assert_eq!(machine.last_outcome(), Some(RunState::Failed));
        assert_eq!(machine.completed_runs(), 1);
    }
}
