//! Client error taxonomy

use thiserror::Error;

use crate::job::JobError;
use crate::map::PublishError;
use crate::state::{JobState, JobStateError};
use crate::summary::ExitCode;

/// Errors returned by [`JobClient`](super::JobClient) operations
///
/// A remote process that fails is not an error here; it is reported as
/// [`JobStatus::Error`](super::JobStatus::Error).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("different number of input names ({names}) and values ({values})")]
    InputArityMismatch { names: usize, values: usize },

    #[error("process identifier is empty")]
    EmptyProcess,

    #[error("submission failed: {reason}")]
    SubmissionFailed { reason: String },

    #[error("no status location to poll")]
    NoStatusLocator,

    #[error("status request failed: {reason}")]
    TransportFailure { reason: String },

    #[error(transparent)]
    InvalidTransition(#[from] JobStateError),

    #[error("job has not finished (state {state})")]
    NotFinished { state: JobState },

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl From<JobError> for ClientError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::InputArityMismatch { names, values } => {
                ClientError::InputArityMismatch { names, values }
            }
            JobError::EmptyProcess => ClientError::EmptyProcess,
        }
    }
}

impl ClientError {
    /// Stable exit code for the CLI
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ClientError::InputArityMismatch { .. } | ClientError::EmptyProcess => {
                ExitCode::InvalidJob
            }
            ClientError::SubmissionFailed { .. } => ExitCode::SubmissionFailed,
            ClientError::NoStatusLocator | ClientError::TransportFailure { .. } => {
                ExitCode::Transport
            }
            ClientError::InvalidTransition(_) | ClientError::NotFinished { .. } => {
                ExitCode::InvalidState
            }
            ClientError::Publish(_) => ExitCode::PublishFailed,
        }
    }
}
