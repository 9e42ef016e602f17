//! Stable exit codes

use serde::{Deserialize, Serialize};

/// Stable exit codes of the `wps-client` binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExitCode {
    /// Job finished (and published, when requested)
    Success = 0,
    /// Job description rejected before sending
    InvalidJob = 10,
    /// Request could not be sent or was not acknowledged
    SubmissionFailed = 20,
    /// Status document could not be retrieved
    Transport = 30,
    /// Remote process reported a failure
    ProcessFailed = 40,
    /// Map file could not be written
    PublishFailed = 50,
    /// Operation not valid in the current job state
    InvalidState = 60,
    /// Configuration could not be loaded
    Config = 70,
    /// Polling stopped before the job settled (signal or poll limit)
    Cancelled = 80,
}

impl ExitCode {
    /// Get the integer value of the exit code
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Create from integer value
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(ExitCode::Success),
            10 => Some(ExitCode::InvalidJob),
            20 => Some(ExitCode::SubmissionFailed),
            30 => Some(ExitCode::Transport),
            40 => Some(ExitCode::ProcessFailed),
            50 => Some(ExitCode::PublishFailed),
            60 => Some(ExitCode::InvalidState),
            70 => Some(ExitCode::Config),
            80 => Some(ExitCode::Cancelled),
            _ => None,
        }
    }

    /// Check if this exit code indicates success
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}
