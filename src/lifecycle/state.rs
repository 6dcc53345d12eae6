//! Process lifecycle state machine.
//!
//! # States
//! ```text
//! INIT → STARTED → STOPPED
//! INIT → INIT_FAILURE → STOPPED
//! ```
//!
//! # Design Decisions
//! - Forward-only: every state is entered at most once per monitor
//! - The full event history is kept in a watch channel, so a waiter that
//!   subscribes late still sees events that already fired
//! - `INIT_FAILURE` always carries a human-readable cause

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;

use crate::observability::metrics;

/// Externally observable lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Init,
    Started,
    InitFailure,
    Stopped,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Init => "INIT",
            LifecycleState::Started => "STARTED",
            LifecycleState::InitFailure => "INIT_FAILURE",
            LifecycleState::Stopped => "STOPPED",
        }
    }

    /// Whether `next` is a legal single step from this state.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        matches!(
            (self, next),
            (LifecycleState::Init, LifecycleState::Started)
                | (LifecycleState::Init, LifecycleState::InitFailure)
                | (LifecycleState::Started, LifecycleState::Stopped)
                | (LifecycleState::InitFailure, LifecycleState::Stopped)
        )
    }

    /// Whether `target` can still be entered from this state.
    pub fn can_reach(self, target: LifecycleState) -> bool {
        match self {
            LifecycleState::Init => target != LifecycleState::Init,
            LifecycleState::Started | LifecycleState::InitFailure => {
                target == LifecycleState::Stopped
            }
            LifecycleState::Stopped => false,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub state: LifecycleState,
    /// Diagnostic attached to the transition (always set for `INIT_FAILURE`).
    pub cause: Option<String>,
    pub at: Instant,
}

/// Result of waiting for a lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The requested state was entered.
    Reached(LifecycleEvent),
    /// The requested state can no longer be entered; carries the latest event.
    Superseded(LifecycleEvent),
    TimedOut,
}

impl WaitOutcome {
    pub fn event(&self) -> Option<&LifecycleEvent> {
        match self {
            WaitOutcome::Reached(event) | WaitOutcome::Superseded(event) => Some(event),
            WaitOutcome::TimedOut => None,
        }
    }

    pub fn is_reached(&self) -> bool {
        matches!(self, WaitOutcome::Reached(_))
    }
}

/// Lifecycle misuse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("illegal lifecycle transition {from} -> {to}")]
    IllegalTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("INIT_FAILURE requires a cause")]
    MissingCause,
}

/// Per-process lifecycle monitor.
///
/// Cheap to clone; all clones observe the same history.
#[derive(Debug, Clone)]
pub struct ProcessMonitor {
    history: Arc<watch::Sender<Vec<LifecycleEvent>>>,
}

impl ProcessMonitor {
    /// Create a monitor in the `INIT` state.
    pub fn new() -> Self {
        let init = LifecycleEvent {
            state: LifecycleState::Init,
            cause: None,
            at: Instant::now(),
        };
        let (tx, _) = watch::channel(vec![init]);
        Self {
            history: Arc::new(tx),
        }
    }

    /// Move the process forward.
    pub fn transition(
        &self,
        state: LifecycleState,
        cause: Option<String>,
    ) -> Result<(), LifecycleError> {
        if state == LifecycleState::InitFailure && cause.is_none() {
            return Err(LifecycleError::MissingCause);
        }

        let mut result = Ok(());
        let mut cause = cause;
        self.history.send_if_modified(|history| {
            let current = current_of(history);
            if !current.can_transition_to(state) {
                result = Err(LifecycleError::IllegalTransition {
                    from: current,
                    to: state,
                });
                return false;
            }
            history.push(LifecycleEvent {
                state,
                cause: cause.take(),
                at: Instant::now(),
            });
            true
        });

        match &result {
            Ok(()) => {
                tracing::info!(state = %state, "Lifecycle transition");
                metrics::record_lifecycle_event(state.as_str());
            }
            Err(e) => tracing::error!(error = %e, "Rejected lifecycle transition"),
        }
        result
    }

    /// The state most recently entered.
    pub fn current(&self) -> LifecycleState {
        current_of(&self.history.borrow())
    }

    /// Every event so far, oldest first.
    pub fn history(&self) -> Vec<LifecycleEvent> {
        self.history.borrow().clone()
    }

    /// Wait until `target` is entered, becomes unreachable, or `timeout`
    /// elapses. Events that already fired are returned immediately.
    pub async fn wait_for_event(&self, target: LifecycleState, timeout: Duration) -> WaitOutcome {
        let mut rx = self.history.subscribe();
        let waited = tokio::time::timeout(timeout, async {
            match rx.wait_for(|history| settle(history, target).is_some()).await {
                Ok(history) => settle(&history, target),
                Err(_) => None,
            }
        })
        .await;

        match waited {
            Ok(Some(outcome)) => outcome,
            Ok(None) | Err(_) => WaitOutcome::TimedOut,
        }
    }
}

impl Default for ProcessMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn current_of(history: &[LifecycleEvent]) -> LifecycleState {
    history
        .last()
        .map(|event| event.state)
        .unwrap_or(LifecycleState::Init)
}

fn settle(history: &[LifecycleEvent], target: LifecycleState) -> Option<WaitOutcome> {
    if let Some(event) = history.iter().find(|event| event.state == target) {
        return Some(WaitOutcome::Reached(event.clone()));
    }
    let latest = history.last()?;
    if latest.state.can_reach(target) {
        None
    } else {
        Some(WaitOutcome::Superseded(latest.clone()))
    }
}
