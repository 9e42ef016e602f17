//! Job descriptor and handle
//!
//! A `JobDescriptor` is what the caller asks for: a process, its inputs and
//! the outputs to collect. A `JobHandle` is what the server hands back: the
//! status document URL and the process identifier derived from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wps_protocol::{build_execute_request, ExecuteRequest, RequestError};

/// Logged when output titles cannot be paired with output names
pub const WARN_TITLES_INCOMPLETE: &str = "Output titles missing or incomplete, using names.";

/// Errors for job construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("different number of input names ({names}) and values ({values})")]
    InputArityMismatch { names: usize, values: usize },

    #[error("process identifier is empty")]
    EmptyProcess,
}

impl From<RequestError> for JobError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::InputArityMismatch { names, values } => {
                JobError::InputArityMismatch { names, values }
            }
            RequestError::EmptyProcess => JobError::EmptyProcess,
        }
    }
}

/// Output name → display title
///
/// Always total over the output names it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTitles {
    titles: BTreeMap<String, String>,
    /// Titles were missing or mismatched and names are used instead
    fell_back: bool,
}

impl OutputTitles {
    /// Pair names with titles by position.
    ///
    /// When the counts differ every output is titled with its own name.
    pub fn new(output_names: &[String], output_titles: &[String]) -> Self {
        if output_names.len() != output_titles.len() {
            tracing::warn!("{}", WARN_TITLES_INCOMPLETE);
            return Self {
                titles: output_names
                    .iter()
                    .map(|n| (n.clone(), n.clone()))
                    .collect(),
                fell_back: true,
            };
        }

        Self {
            titles: output_names
                .iter()
                .cloned()
                .zip(output_titles.iter().cloned())
                .collect(),
            fell_back: false,
        }
    }

    /// Title for an output, or the name itself for outputs never declared.
    pub fn title_for<'a>(&'a self, name: &'a str) -> &'a str {
        self.titles.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Whether names had to stand in for titles
    pub fn fell_back(&self) -> bool {
        self.fell_back
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.titles.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// What to run on the remote server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    process: String,
    input_names: Vec<String>,
    input_values: Vec<String>,
    output_names: Vec<String>,
    titles: OutputTitles,
}

impl JobDescriptor {
    /// Create a descriptor from parallel name/value lists.
    ///
    /// Fails with [`JobError::InputArityMismatch`] when the input lists
    /// differ in length. Titles that do not match the outputs in count fall
    /// back to the output names.
    pub fn new(
        process: impl Into<String>,
        input_names: Vec<String>,
        input_values: Vec<String>,
        output_names: Vec<String>,
        output_titles: Vec<String>,
    ) -> Result<Self, JobError> {
        let process = process.into();
        if input_names.len() != input_values.len() {
            tracing::error!(
                names = input_names.len(),
                values = input_values.len(),
                "Different number of input names and values."
            );
            return Err(JobError::InputArityMismatch {
                names: input_names.len(),
                values: input_values.len(),
            });
        }
        if process.trim().is_empty() {
            return Err(JobError::EmptyProcess);
        }

        let titles = OutputTitles::new(&output_names, &output_titles);
        Ok(Self {
            process,
            input_names,
            input_values,
            output_names,
            titles,
        })
    }

    /// Create a descriptor from `(input, value)` and `(output, title)` pairs.
    pub fn from_pairs<I, O>(process: impl Into<String>, inputs: I, outputs: O) -> Result<Self, JobError>
    where
        I: IntoIterator<Item = (String, String)>,
        O: IntoIterator<Item = (String, String)>,
    {
        let (input_names, input_values) = inputs.into_iter().unzip();
        let (output_names, output_titles) = outputs.into_iter().unzip();
        Self::new(process, input_names, input_values, output_names, output_titles)
    }

    pub fn process(&self) -> &str {
        &self.process
    }

    pub fn inputs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.input_names
            .iter()
            .zip(&self.input_values)
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    pub fn titles(&self) -> &OutputTitles {
        &self.titles
    }

    /// Assemble the Execute request for this job.
    pub fn execute_request(&self) -> Result<ExecuteRequest, JobError> {
        Ok(build_execute_request(
            &self.process,
            &self.input_names,
            &self.input_values,
            &self.output_names,
        )?)
    }
}

/// Server-assigned job locator
///
/// Immutable: both fields are fixed when the handle is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    status_location: String,
    process_id: String,
}

impl JobHandle {
    /// Create a handle from a status document URL.
    pub fn from_status_location(url: impl Into<String>) -> Self {
        let status_location = url.into();
        let process_id = decode_process_id(&status_location);
        Self {
            status_location,
            process_id,
        }
    }

    pub fn status_location(&self) -> &str {
        &self.status_location
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }
}

/// Process identifier from a status URL: the last path segment up to its first `.`
///
/// `http://host/wpsoutputs/pywps-1234.xml` → `pywps-1234`
pub fn decode_process_id(url: &str) -> String {
    let segment = url.rsplit('/').next().unwrap_or(url);
    segment.split('.').next().unwrap_or(segment).to_string()
}
