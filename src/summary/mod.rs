//! Job summary and exit codes
//!
//! A summary is a serializable snapshot of one client after its last
//! operation, printed by the CLI with `--json` and optionally persisted next
//! to the mapfile.

mod failure;
mod job_summary;

pub use failure::ExitCode;
pub use job_summary::{JobSummary, OutputSummary, SUMMARY_SCHEMA_ID, SUMMARY_SCHEMA_VERSION};
