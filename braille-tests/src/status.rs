//! Fixture lifecycle states and the transitions allowed between them

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a single fixture.
///
/// ```text
/// Ready -> Running -> Complete -> Passed | Failed
///                  \-> Error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Loaded and validated, not yet run
    Ready,
    /// The translator is being driven for this fixture
    Running,
    /// Every direction exited cleanly and its output was captured
    Complete,
    /// The fixture could not be judged
    Error,
    /// Received output matched the expected output in every direction
    Passed,
    /// At least one direction produced different output
    Failed,
}

/// Misuse of a fixture or fixture set lifecycle
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition { from: Status, to: Status },

    #[error("fixture '{name}' is {status}, only READY fixtures can be run")]
    NotReady { name: String, status: Status },

    #[error("fixture set has already been run")]
    Sealed,
}

impl Status {
    /// Whether `self -> next` is one of the allowed lifecycle edges
    pub fn can_transition(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Ready, Status::Running)
                | (Status::Running, Status::Error)
                | (Status::Running, Status::Complete)
                | (Status::Complete, Status::Passed)
                | (Status::Complete, Status::Failed)
        )
    }

    /// Move to `next`, rejecting edges outside the lifecycle
    pub fn transition(self, next: Status) -> Result<Status, StateError> {
        if self.can_transition(next) {
            Ok(next)
        } else {
            Err(StateError::InvalidTransition { from: self, to: next })
        }
    }

    /// Terminal states end a fixture's run
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Error | Status::Passed | Status::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ready => "READY",
            Status::Running => "RUNNING",
            Status::Complete => "COMPLETE",
            Status::Error => "ERROR",
            Status::Passed => "PASSED",
            Status::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
