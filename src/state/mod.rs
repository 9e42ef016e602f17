//! Job lifecycle state machine
//!
//! States: BUILT → SUBMITTED → RUNNING → {FINISHED | ERROR}
//! A client attached to an existing status URL starts in RUNNING.

mod job_state;

pub use job_state::{JobLifecycle, JobState, JobStateError};

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Check if a state is terminal (no further transitions possible)
pub trait TerminalState {
    fn is_terminal(&self) -> bool;
}
