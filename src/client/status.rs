//! Remote job status as seen by the client

use std::fmt;

use serde::{Deserialize, Serialize};

/// Remote job status, recomputed on every poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    Running {
        #[serde(skip_serializing_if = "Option::is_none")]
        percent: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Finished,
    /// The remote process failed
    Error { code: String, message: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running { .. })
    }

    /// Running status from a new observation; missing fields keep their prior values.
    pub(crate) fn running_after(
        previous: Option<&JobStatus>,
        percent: Option<u8>,
        message: Option<String>,
    ) -> JobStatus {
        let (prior_percent, prior_message) = match previous {
            Some(JobStatus::Running { percent, message }) => (*percent, message.clone()),
            _ => (None, None),
        };
        JobStatus::Running {
            percent: percent.or(prior_percent),
            message: message.or(prior_message),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running { percent, message } => {
                write!(f, "running")?;
                if let Some(p) = percent {
                    write!(f, " ({}%)", p)?;
                }
                if let Some(m) = message {
                    write!(f, ": {}", m)?;
                }
                Ok(())
            }
            JobStatus::Finished => write!(f, "finished"),
            JobStatus::Error { code, message } => write!(f, "error [{}]: {}", code, message),
        }
    }
}

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOutcome {
    pub status: JobStatus,
    /// No further poll will change anything
    pub terminal: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_keeps_prior_fields() {
        let first = JobStatus::running_after(None, Some(20), Some("reading".to_string()));
        let second = JobStatus::running_after(Some(&first), None, None);
        assert_eq!(second, first);

        let third = JobStatus::running_after(Some(&second), Some(60), None);
        assert_eq!(
            third,
            JobStatus::Running { percent: Some(60), message: Some("reading".to_string()) }
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            JobStatus::Running { percent: Some(40), message: Some("slope".to_string()) }.to_string(),
            "running (40%): slope"
        );
        assert_eq!(
            JobStatus::Error { code: "NoApplicableCode".to_string(), message: "boom".to_string() }
                .to_string(),
            "error [NoApplicableCode]: boom"
        );
        assert!(JobStatus::Finished.is_terminal());
    }
}
