//! Worker lifecycle state machine.
//!
//! ```text
//! Parsed ──install──▶ Installing ──ok──▶ Installed ──activate──▶ Activating ──▶ Active
//!                         │
//!                         └──err──▶ Redundant
//! ```
//!
//! Transitions are explicit methods on [`WorkerState`]; an event arriving in a
//! state that cannot accept it yields `Error::Lifecycle`.

use std::time::Instant;

use ephone_core::Error;
use serde::Serialize;

/// Activation state of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Loaded, no install attempted yet.
    #[default]
    Parsed,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    /// Controlling clients and intercepting fetches.
    Active,
    /// Install failed; this version will never activate.
    Redundant,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Redundant => "redundant",
        }
    }
}

/// Explicit lifecycle state plus the skip-waiting flag.
#[derive(Debug, Clone)]
pub struct WorkerState {
    state: LifecycleState,
    skip_waiting: bool,
    changed_at: Instant,
}

impl Default for WorkerState {
    fn default() -> Self {
        Self { state: LifecycleState::Parsed, skip_waiting: false, changed_at: Instant::now() }
    }
}

impl WorkerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting
    }

    /// Installed but held back until clients close.
    pub fn is_waiting(&self) -> bool {
        self.state == LifecycleState::Installed && !self.skip_waiting
    }

    pub fn is_active(&self) -> bool {
        self.state == LifecycleState::Active
    }

    /// Time since the last transition.
    pub fn elapsed_ms(&self) -> u64 {
        self.changed_at.elapsed().as_millis() as u64
    }

    fn set(&mut self, state: LifecycleState) {
        tracing::debug!(from = self.state.as_str(), to = state.as_str(), "lifecycle transition");
        self.state = state;
        self.changed_at = Instant::now();
    }

    fn refuse(&self, event: &str) -> Error {
        Error::Lifecycle(format!("cannot {event} while {}", self.state.as_str()))
    }

    /// `Parsed | Redundant → Installing`. A redundant worker may retry.
    pub fn begin_install(&mut self) -> Result<(), Error> {
        match self.state {
            LifecycleState::Parsed | LifecycleState::Redundant => {
                self.skip_waiting = false;
                self.set(LifecycleState::Installing);
                Ok(())
            }
            _ => Err(self.refuse("install")),
        }
    }

    /// `Installing → Installed`.
    pub fn install_succeeded(&mut self) -> Result<(), Error> {
        match self.state {
            LifecycleState::Installing => {
                self.set(LifecycleState::Installed);
                Ok(())
            }
            _ => Err(self.refuse("finish install")),
        }
    }

    /// `Installing → Redundant`.
    pub fn install_failed(&mut self) {
        if self.state == LifecycleState::Installing {
            self.set(LifecycleState::Redundant);
        }
    }

    /// Record a skip-waiting request.
    ///
    /// Returns true when the worker is installed and should activate now.
    pub fn skip_waiting(&mut self) -> bool {
        self.skip_waiting = true;
        self.state == LifecycleState::Installed
    }

    /// `Installed → Activating`.
    pub fn begin_activate(&mut self) -> Result<(), Error> {
        match self.state {
            LifecycleState::Installed => {
                self.set(LifecycleState::Activating);
                Ok(())
            }
            _ => Err(self.refuse("activate")),
        }
    }

    /// `Activating → Active`.
    pub fn activated(&mut self) -> Result<(), Error> {
        match self.state {
            LifecycleState::Activating => {
                self.set(LifecycleState::Active);
                Ok(())
            }
            _ => Err(self.refuse("finish activation")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = WorkerState::new();
        assert_eq!(state.state(), LifecycleState::Parsed);

        state.begin_install().unwrap();
        assert_eq!(state.state(), LifecycleState::Installing);
        state.install_succeeded().unwrap();
        assert!(state.is_waiting());

        state.begin_activate().unwrap();
        assert_eq!(state.state(), LifecycleState::Activating);
        state.activated().unwrap();
        assert!(state.is_active());
    }

    #[test]
    fn test_failed_install_blocks_activation() {
        let mut state = WorkerState::new();
        state.begin_install().unwrap();
        state.install_failed();

        assert_eq!(state.state(), LifecycleState::Redundant);
        assert!(matches!(state.begin_activate(), Err(Error::Lifecycle(_))));
    }

    #[test]
    fn test_redundant_may_retry_install() {
        let mut state = WorkerState::new();
        state.begin_install().unwrap();
        state.install_failed();
        assert!(state.begin_install().is_ok());
    }

    #[test]
    fn test_activate_before_install_refused() {
        let mut state = WorkerState::new();
        let err = state.begin_activate().unwrap_err();
        assert!(err.to_string().contains("parsed"));
    }

    #[test]
    fn test_double_install_refused() {
        let mut state = WorkerState::new();
        state.begin_install().unwrap();
        assert!(state.begin_install().is_err());
    }

    #[test]
    fn test_skip_waiting_while_installing_only_flags() {
        let mut state = WorkerState::new();
        state.begin_install().unwrap();
        assert!(!state.skip_waiting());
        state.install_succeeded().unwrap();

        assert!(state.skip_waiting_requested());
        assert!(!state.is_waiting());
    }

    #[test]
    fn test_skip_waiting_when_installed_requests_activation() {
        let mut state = WorkerState::new();
        state.begin_install().unwrap();
        state.install_succeeded().unwrap();
        assert!(state.skip_waiting());
    }

    #[test]
    fn test_install_failed_outside_installing_is_ignored() {
        let mut state = WorkerState::new();
        state.install_failed();
        assert_eq!(state.state(), LifecycleState::Parsed);
    }
}
