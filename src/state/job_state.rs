//! Job state machine
//!
//! Job states: BUILT → SUBMITTED → RUNNING → {FINISHED | ERROR}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{now_utc, TerminalState};

/// Job state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Request payload assembled, not yet sent
    Built,
    /// Request accepted, awaiting the first status
    Submitted,
    /// Remote process executing; polling
    Running,
    /// Remote process completed and outputs were collected
    Finished,
    /// Remote process reported a failure
    Error,
}

impl TerminalState for JobState {
    fn is_terminal(&self) -> bool {
        matches!(self, JobState::Finished | JobState::Error)
    }
}

impl JobState {
    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: JobState) -> bool {
        match (self, target) {
            // From BUILT
            (JobState::Built, JobState::Submitted) => true,

            // From SUBMITTED: the first status may already be terminal
            (JobState::Submitted, JobState::Running) => true,
            (JobState::Submitted, JobState::Finished) => true,
            (JobState::Submitted, JobState::Error) => true,

            // From RUNNING
            (JobState::Running, JobState::Running) => true,
            (JobState::Running, JobState::Finished) => true,
            (JobState::Running, JobState::Error) => true,

            // Terminal states cannot transition
            _ => false,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Built => "BUILT",
            JobState::Submitted => "SUBMITTED",
            JobState::Running => "RUNNING",
            JobState::Finished => "FINISHED",
            JobState::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Errors for job state operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStateError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: JobState, to: JobState },
}

/// Current state plus when it was entered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLifecycle {
    /// Current state
    pub state: JobState,

    /// When the lifecycle started
    pub created_at: DateTime<Utc>,

    /// When the state was last updated
    pub updated_at: DateTime<Utc>,

    /// Number of transitions taken
    pub transitions: u32,
}

impl JobLifecycle {
    /// Lifecycle for a freshly built request
    pub fn built() -> Self {
        Self::starting_at(JobState::Built)
    }

    /// Lifecycle for a client attached to a job submitted elsewhere
    pub fn observing() -> Self {
        Self::starting_at(JobState::Running)
    }

    fn starting_at(state: JobState) -> Self {
        let now = now_utc();
        Self {
            state,
            created_at: now,
            updated_at: now,
            transitions: 0,
        }
    }

    /// Transition to a new state
    pub fn transition(&mut self, new_state: JobState) -> Result<(), JobStateError> {
        if !self.state.can_transition_to(new_state) {
            return Err(JobStateError::InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }

        self.state = new_state;
        self.updated_at = now_utc();
        self.transitions += 1;

        Ok(())
    }

    /// Check if job is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
