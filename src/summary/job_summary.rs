//! Job summary (summary.json)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::failure::ExitCode;
use crate::client::{JobClient, JobStatus};
use crate::output::{Output, OutputWarning};
use crate::state::JobState;

/// Schema version for summary.json
pub const SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for summary.json
pub const SUMMARY_SCHEMA_ID: &str = "wps-client/summary@1";

/// One output as reported in the summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSummary {
    pub title: String,
    #[serde(flatten)]
    pub output: Output,
}

/// Job summary (summary.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// Process identifier derived from the status location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<String>,

    /// Status document URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_location: Option<String>,

    /// When the summary was created
    pub created_at: DateTime<Utc>,

    /// Client lifecycle state
    pub state: JobState,

    /// Last observed remote status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,

    /// Stable exit code
    pub exit_code: i32,

    /// Collected outputs, literals first
    pub outputs: Vec<OutputSummary>,

    /// Per-output faults
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<OutputWarning>,

    /// Mapfile written by publication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_file: Option<PathBuf>,

    /// Human-readable message of the last outcome
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
}

impl JobSummary {
    /// Snapshot a client
    pub fn from_client(client: &JobClient) -> Self {
        let exit_code = match client.status() {
            Some(JobStatus::Error { .. }) => ExitCode::ProcessFailed,
            _ => ExitCode::Success,
        };
        let titles = client.output_titles();
        let outputs = client
            .results()
            .iter()
            .map(|output| OutputSummary {
                title: titles.title_for(output.name()).to_string(),
                output,
            })
            .collect();

        Self {
            schema_version: SUMMARY_SCHEMA_VERSION,
            schema_id: SUMMARY_SCHEMA_ID.to_string(),
            process_id: client.process_id().map(str::to_string),
            status_location: client.handle().map(|h| h.status_location().to_string()),
            created_at: Utc::now(),
            state: client.state(),
            status: client.status().cloned(),
            exit_code: exit_code.as_i32(),
            outputs,
            warnings: client.warnings().to_vec(),
            map_file: client.map_file_path().map(Path::to_path_buf),
            last_message: client.last_message().map(str::to_string),
        }
    }

    /// Override the exit code (cancellation, client errors)
    pub fn with_exit_code(mut self, code: ExitCode) -> Self {
        self.exit_code = code.as_i32();
        self
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Write to file (write-then-rename)
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, path)
    }

    /// Load from file
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))
    }

    /// Get the exit code as ExitCode enum
    pub fn exit_code_enum(&self) -> Option<ExitCode> {
        ExitCode::from_i32(self.exit_code)
    }
}
