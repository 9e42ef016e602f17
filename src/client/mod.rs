//! Job client
//!
//! Drives one remote job through its lifecycle:
//!
//! 1. `build` assembles the Execute payload (state BUILT)
//! 2. `submit` sends it and records the status location (SUBMITTED)
//! 3. `poll` reads the status document until the job is FINISHED or ERROR;
//!    on success every output is classified and complex outputs are
//!    materialized and inspected before the poll returns
//! 4. `publish` turns the inspected outputs into a map
//!
//! The client never sleeps and never retries; the caller owns the poll loop.
//! Each client keeps its own result set.

mod error;
mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use wps_protocol::{Markers, ResponseScanner, ScanOutcome};

pub use error::ClientError;
pub use status::{JobStatus, PollOutcome};

use crate::artifact::ArtifactStore;
use crate::dataset::SpatialDataset;
use crate::host::Transport;
use crate::job::{JobDescriptor, JobHandle, OutputTitles, WARN_TITLES_INCOMPLETE};
use crate::map::{MapAssembler, MapDescriptor, MapPublisher, PublishSettings};
use crate::output::{Output, OutputWarning, ResultSet};
use crate::state::{JobLifecycle, JobState, JobStateError};

pub const MSG_SERVER_ADDRESS: &str = "It wasn't possible to process the server address:\n";
pub const MSG_NO_STATUS_LOCATION: &str = "No status location URL found in response.";
pub const MSG_MISSING_URL: &str = "Incomplete request -- missing URL";
pub const MSG_PROCESS_FAILED: &str = "The process failed with the following message:\n";
pub const MSG_NOT_FINISHED: &str = "The process hasn't finished yet.";
pub const MSG_FINISHED: &str = "The process has finished successfully.\nProcessing the results...";
pub const MSG_MAP_WRITTEN: &str = "Wrote map file to disk:\n";

/// Collaborators shared by the clients of one application
#[derive(Clone)]
pub struct ClientContext {
    pub transport: Arc<dyn Transport>,
    pub dataset: Arc<dyn SpatialDataset>,
    pub artifacts: ArtifactStore,
    pub publish: PublishSettings,
    pub markers: Markers,
}

impl ClientContext {
    pub fn new(
        transport: Arc<dyn Transport>,
        dataset: Arc<dyn SpatialDataset>,
        artifacts: ArtifactStore,
        publish: PublishSettings,
    ) -> Self {
        Self {
            transport,
            dataset,
            artifacts,
            publish,
            markers: Markers::default(),
        }
    }

    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }
}

/// Client for a single remote job
pub struct JobClient {
    transport: Arc<dyn Transport>,
    dataset: Arc<dyn SpatialDataset>,
    artifacts: ArtifactStore,
    settings: PublishSettings,
    scanner: ResponseScanner,

    server_address: Option<String>,
    payload: Option<String>,
    titles: OutputTitles,

    lifecycle: JobLifecycle,
    handle: Option<JobHandle>,
    status: Option<JobStatus>,
    results: ResultSet,
    warnings: Vec<OutputWarning>,
    last_message: Option<String>,
    map: Option<MapDescriptor>,
    map_file: Option<PathBuf>,
}

impl JobClient {
    /// Assemble the request for `descriptor`; the job is not sent yet.
    pub fn build(
        ctx: &ClientContext,
        server_address: impl Into<String>,
        descriptor: &JobDescriptor,
    ) -> Result<Self, ClientError> {
        let payload = descriptor.execute_request()?.to_xml();
        let mut client = Self::with_context(ctx, descriptor.titles().clone(), JobLifecycle::built());
        client.server_address = Some(server_address.into());
        client.payload = Some(payload);
        if client.titles.fell_back() {
            client.last_message = Some(WARN_TITLES_INCOMPLETE.to_string());
        }
        tracing::debug!(process = descriptor.process(), "Built execute request");
        Ok(client)
    }

    /// Observe a job submitted elsewhere, starting from its status location.
    pub fn attach(
        ctx: &ClientContext,
        status_location: impl Into<String>,
        output_names: &[String],
        output_titles: &[String],
    ) -> Self {
        let titles = OutputTitles::new(output_names, output_titles);
        let mut client = Self::with_context(ctx, titles, JobLifecycle::observing());
        let handle = JobHandle::from_status_location(status_location);
        tracing::debug!(
            status_location = handle.status_location(),
            process_id = handle.process_id(),
            "Attached to job"
        );
        client.handle = Some(handle);
        if client.titles.fell_back() {
            client.last_message = Some(WARN_TITLES_INCOMPLETE.to_string());
        }
        client
    }

    fn with_context(ctx: &ClientContext, titles: OutputTitles, lifecycle: JobLifecycle) -> Self {
        Self {
            transport: Arc::clone(&ctx.transport),
            dataset: Arc::clone(&ctx.dataset),
            artifacts: ctx.artifacts.clone(),
            settings: ctx.publish.clone(),
            scanner: ResponseScanner::with_markers(ctx.markers.clone()),
            server_address: None,
            payload: None,
            titles,
            lifecycle,
            handle: None,
            status: None,
            results: ResultSet::new(),
            warnings: Vec::new(),
            last_message: None,
            map: None,
            map_file: None,
        }
    }

    /// Send the request and record the job handle.
    pub fn submit(&mut self) -> Result<&JobHandle, ClientError> {
        if !self.lifecycle.state.can_transition_to(JobState::Submitted) {
            let err = JobStateError::InvalidTransition {
                from: self.lifecycle.state,
                to: JobState::Submitted,
            };
            return Err(self.local_fault(err.into()));
        }

        let (Some(server), Some(payload)) = (self.server_address.clone(), self.payload.clone()) else {
            return Err(self.submission_failed(MSG_MISSING_URL.to_string()));
        };

        if let Err(reason) = check_server_address(&server) {
            tracing::error!("{}{} ({})", MSG_SERVER_ADDRESS, server, reason);
            return Err(self.submission_failed(format!("{}{}", MSG_SERVER_ADDRESS, server)));
        }

        let response = match self.transport.send(&server, &payload) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(server = %server, error = %e, "Request failed");
                return Err(self.submission_failed(e.to_string()));
            }
        };

        let Some(status_location) = self.scanner.status_location(&response) else {
            tracing::error!("{}", MSG_NO_STATUS_LOCATION);
            return Err(self.submission_failed(MSG_NO_STATUS_LOCATION.to_string()));
        };

        self.lifecycle.transition(JobState::Submitted)?;
        let handle = JobHandle::from_status_location(status_location);
        tracing::info!(
            status_location = handle.status_location(),
            process_id = handle.process_id(),
            "Job submitted"
        );
        self.last_message = Some(format!("Job submitted: {}", handle.status_location()));
        Ok(self.handle.insert(handle))
    }

    fn submission_failed(&mut self, reason: String) -> ClientError {
        self.last_message = Some(reason.clone());
        ClientError::SubmissionFailed { reason }
    }

    /// Read the status document once.
    ///
    /// After a terminal status has been observed this is a no-op returning
    /// that status again.
    pub fn poll(&mut self) -> Result<PollOutcome, ClientError> {
        if self.lifecycle.is_terminal() {
            if let Some(status) = &self.status {
                return Ok(PollOutcome {
                    status: status.clone(),
                    terminal: true,
                });
            }
        }

        let Some(handle) = self.handle.clone() else {
            tracing::error!("{}", MSG_MISSING_URL);
            self.last_message = Some(MSG_MISSING_URL.to_string());
            return Err(ClientError::NoStatusLocator);
        };

        let body = match self.transport.fetch(handle.status_location()) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(url = handle.status_location(), error = %e, "Status request failed");
                self.last_message = Some(e.to_string());
                return Err(ClientError::TransportFailure {
                    reason: e.to_string(),
                });
            }
        };
        let text = String::from_utf8_lossy(&body);

        let status = match self.scanner.scan(&text) {
            ScanOutcome::Failed { code, message } => {
                self.lifecycle.transition(JobState::Error)?;
                tracing::error!(code = %code, "{}{}", MSG_PROCESS_FAILED, message);
                self.last_message = Some(format!("{}{}", MSG_PROCESS_FAILED, message));
                JobStatus::Error { code, message }
            }
            ScanOutcome::Running { percent, message } => {
                self.lifecycle.transition(JobState::Running)?;
                let status = JobStatus::running_after(self.status.as_ref(), percent, message);
                if let JobStatus::Running { percent: Some(p), .. } = &status {
                    tracing::info!("{} % of the execution complete.", p);
                } else {
                    tracing::debug!("{}", MSG_NOT_FINISHED);
                }
                self.last_message = Some(match &status {
                    JobStatus::Running { message: Some(m), .. } => m.clone(),
                    _ => MSG_NOT_FINISHED.to_string(),
                });
                status
            }
            ScanOutcome::Succeeded { outputs } => {
                self.lifecycle.transition(JobState::Finished)?;
                tracing::info!("{}", MSG_FINISHED);
                self.last_message = Some(MSG_FINISHED.to_string());
                self.collect(outputs, handle.process_id());
                JobStatus::Finished
            }
        };

        self.status = Some(status.clone());
        Ok(PollOutcome {
            terminal: status.is_terminal(),
            status,
        })
    }

    /// Store every classified output, then fetch and inspect the complex ones.
    fn collect(
        &mut self,
        outputs: Vec<Result<wps_protocol::ClassifiedOutput, wps_protocol::OutputError>>,
        process_id: &str,
    ) {
        for output in outputs {
            match output {
                Ok(classified) => self.results.push(Output::from(classified)),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping output");
                    self.warnings.push(OutputWarning::Unclassifiable {
                        output: e.output_name().map(str::to_string),
                        detail: e.to_string(),
                    });
                }
            }
        }

        for output in self.results.complex_mut() {
            match self
                .artifacts
                .materialize(self.transport.as_ref(), output, process_id)
            {
                Ok(path) => {
                    output.dataset = self.dataset.inspect(&path);
                    if output.dataset.is_none() {
                        tracing::warn!(output = %output.name, path = %path.display(), "No dataset information");
                        self.warnings.push(OutputWarning::DatasetInspectionFailed {
                            output: output.name.clone(),
                        });
                    }
                    output.local_path = Some(path);
                }
                Err(e) => {
                    tracing::warn!(output = %output.name, error = %e, "Artifact not retrieved");
                    self.warnings.push(OutputWarning::ArtifactFetchFailed {
                        output: output.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            literal = self.results.literal().len(),
            complex = self.results.complex().len(),
            warnings = self.warnings.len(),
            "Collected outputs"
        );
    }

    /// Write a map publishing the inspected complex outputs.
    ///
    /// The descriptor is assembled once; later calls return the path
    /// already written without publishing again.
    pub fn publish(&mut self, publisher: &dyn MapPublisher) -> Result<PathBuf, ClientError> {
        if self.lifecycle.state != JobState::Finished {
            let err = ClientError::NotFinished {
                state: self.lifecycle.state,
            };
            return Err(self.local_fault(err));
        }
        if let Some(path) = &self.map_file {
            tracing::debug!(path = %path.display(), "Map already published");
            return Ok(path.clone());
        }
        let Some(process_id) = self.process_id().map(str::to_string) else {
            return Err(self.local_fault(ClientError::NoStatusLocator));
        };

        let descriptor = match self.map.take() {
            Some(descriptor) => descriptor,
            None => {
                let (descriptor, warnings) = MapAssembler::new(&self.settings).assemble(
                    &process_id,
                    &self.results,
                    &self.titles,
                );
                // one warning per output
                for warning in warnings {
                    if !self.warnings.iter().any(|w| w.output() == warning.output()) {
                        self.warnings.push(warning);
                    }
                }
                descriptor
            }
        };
        let published = publisher.publish(&descriptor, &self.settings);
        self.map = Some(descriptor);

        let path = match published {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(error = %e, "Map publication failed");
                self.last_message = Some(e.to_string());
                return Err(e.into());
            }
        };

        tracing::info!("{}{}", MSG_MAP_WRITTEN, path.display());
        self.last_message = Some(format!("{}{}", MSG_MAP_WRITTEN, path.display()));
        self.map_file = Some(path.clone());
        Ok(path)
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    /// Last observed status; `None` before the first poll
    pub fn status(&self) -> Option<&JobStatus> {
        self.status.as_ref()
    }

    pub fn state(&self) -> JobState {
        self.lifecycle.state
    }

    pub fn lifecycle(&self) -> &JobLifecycle {
        &self.lifecycle
    }

    pub fn handle(&self) -> Option<&JobHandle> {
        self.handle.as_ref()
    }

    pub fn process_id(&self) -> Option<&str> {
        self.handle.as_ref().map(JobHandle::process_id)
    }

    /// Per-output faults collected so far
    pub fn warnings(&self) -> &[OutputWarning] {
        &self.warnings
    }

    /// Message describing the most recent outcome, fit for display
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    pub fn output_titles(&self) -> &OutputTitles {
        &self.titles
    }

    /// Execute payload, for built clients
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    /// Mapfile written by `publish`
    pub fn map_file_path(&self) -> Option<&Path> {
        self.map_file.as_deref()
    }

    /// Descriptor assembled by the first `publish`
    pub fn map_descriptor(&self) -> Option<&MapDescriptor> {
        self.map.as_ref()
    }

    fn local_fault(&mut self, err: ClientError) -> ClientError {
        tracing::warn!(error = %err, "Request rejected");
        self.last_message = Some(err.to_string());
        err
    }
}

/// A server address needs a host followed by a path.
pub fn check_server_address(address: &str) -> Result<(), String> {
    let rest = address
        .strip_prefix("http://")
        .or_else(|| address.strip_prefix("https://"))
        .ok_or_else(|| "expected an http:// or https:// URL".to_string())?;
    let Some((host, _path)) = rest.split_once('/') else {
        return Err("missing path after host".to_string());
    };
    if host.is_empty() {
        return Err("missing host".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetInfo;
    use crate::host::MockTransport;

    struct NoDatasets;

    impl SpatialDataset for NoDatasets {
        fn inspect(&self, _path: &Path) -> Option<DatasetInfo> {
            None
        }
    }

    fn context(transport: MockTransport, dir: &Path) -> ClientContext {
        ClientContext::new(
            Arc::new(transport),
            Arc::new(NoDatasets),
            ArtifactStore::new(dir),
            PublishSettings::default(),
        )
    }

    fn descriptor() -> JobDescriptor {
        JobDescriptor::new(
            "ultimatequestionprocess",
            vec![],
            vec![],
            vec!["answer".to_string()],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_check_server_address() {
        assert!(check_server_address("http://localhost/cgi-bin/wps").is_ok());
        assert!(check_server_address("https://host/").is_ok());
        assert!(check_server_address("http://localhost").is_err());
        assert!(check_server_address("http:///wps").is_err());
        assert!(check_server_address("localhost/wps").is_err());
    }

    #[test]
    fn test_build_records_title_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(MockTransport::new(), dir.path());
        let client = JobClient::build(&ctx, "http://host/wps", &descriptor()).unwrap();
        assert_eq!(client.state(), JobState::Built);
        assert_eq!(client.last_message(), Some(WARN_TITLES_INCOMPLETE));
        assert!(client.payload().unwrap().contains("ultimatequestionprocess"));
        assert!(client.status().is_none());
    }

    #[test]
    fn test_bad_server_address_fails_submission() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(MockTransport::new().with_ack("ignored"), dir.path());
        let mut client = JobClient::build(&ctx, "http://localhost", &descriptor()).unwrap();
        let err = client.submit().unwrap_err();
        assert!(matches!(err, ClientError::SubmissionFailed { .. }));
        assert_eq!(client.state(), JobState::Built);
        assert!(client.last_message().unwrap().starts_with(MSG_SERVER_ADDRESS));
    }

    #[test]
    fn test_submit_twice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ack = r#"<wps:ExecuteResponse statusLocation="http://host/out/pywps-1.xml">"#;
        let ctx = context(MockTransport::new().with_ack(ack), dir.path());
        let mut client = JobClient::build(&ctx, "http://host/wps", &descriptor()).unwrap();
        assert_eq!(client.submit().unwrap().process_id(), "pywps-1");
        assert!(matches!(
            client.submit(),
            Err(ClientError::InvalidTransition(_))
        ));
        let message = client.last_message().unwrap();
        assert!(message.contains("SUBMITTED"), "{}", message);
    }

    #[test]
    fn test_publish_before_finish() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(MockTransport::new(), dir.path());
        let mut client = JobClient::attach(&ctx, "http://host/out/pywps-1.xml", &[], &[]);
        let publisher = crate::map::MapfilePublisher::new();
        assert!(matches!(
            client.publish(&publisher),
            Err(ClientError::NotFinished { state: JobState::Running })
        ));
        assert_eq!(client.last_message(), Some("job has not finished (state RUNNING)"));
        assert!(client.map_descriptor().is_none());
    }
}
