//! Per-run state machine.
//!
//! Idle → Extracting → (Delegating(s) → AwaitingMemberResults(s))* → Aggregating → Done
//! Failed is reachable from Extracting, Delegating and AwaitingMemberResults.
//! There is no retry edge.

use std::fmt;

use serde::Serialize;

use crate::pipeline::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Extracting,
    Delegating(Stage),
    AwaitingMemberResults(Stage),
    Aggregating,
    Done,
    Failed,
}

impl RunState {
    pub fn can_transition(self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Idle, Extracting) => true,
            (Extracting, Delegating(_)) => true,
            (Delegating(a), AwaitingMemberResults(b)) => a == b,
            (AwaitingMemberResults(a), Delegating(b)) => b > a,
            (AwaitingMemberResults(_), Aggregating) => true,
            (Aggregating, Done) => true,
            (Extracting | Delegating(_) | AwaitingMemberResults(_), Failed) => true,
            _ => false,
        }
    }

    #[cfg(test)]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Extracting => write!(f, "extracting"),
            RunState::Delegating(s) => write!(f, "delegating({s})"),
            RunState::AwaitingMemberResults(s) => write!(f, "awaiting({s})"),
            RunState::Aggregating => write!(f, "aggregating"),
            RunState::Done => write!(f, "done"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("illegal pipeline transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: RunState,
    pub to: RunState,
}

/// Tracks the current state and every state visited.
#[derive(Debug, Clone)]
pub struct RunTracker {
    current: RunState,
    history: Vec<RunState>,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self {
            current: RunState::Idle,
            history: vec![RunState::Idle],
        }
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn current(&self) -> RunState {
        self.current
    }

    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn advance(&mut self, next: RunState) -> Result<(), IllegalTransition> {
        if !self.current.can_transition(next) {
            return Err(IllegalTransition {
                from: self.current,
                to: next,
            });
        }
        self.current = next;
        self.history.push(next);
        Ok(())
    }
}
