//! WPS client - drives remote geoprocessing jobs
//!
//! This crate submits asynchronous WPS 1.0.0 Execute requests, polls the
//! returned status document until the job settles, downloads the complex
//! outputs and publishes them as a MapServer map file.

pub mod artifact;
pub mod client;
pub mod config;
pub mod dataset;
pub mod host;
pub mod job;
pub mod logging;
pub mod map;
pub mod output;
pub mod signal;
pub mod state;
pub mod summary;

pub use artifact::{ArtifactError, ArtifactStore};
pub use client::{check_server_address, ClientContext, ClientError, JobClient, JobStatus, PollOutcome};
pub use config::{ClientConfig, ConfigError};
pub use dataset::{BoundingBox, DatasetInfo, DatasetKind, FileInspector, GeometryKind, SpatialDataset};
pub use host::{HttpTransport, HttpTransportConfig, MockTransport, Transport, TransportError};
pub use job::{JobDescriptor, JobError, JobHandle, OutputTitles};
pub use map::{MapAssembler, MapDescriptor, MapPublisher, MapfilePublisher, PublishError, PublishSettings};
pub use output::{ComplexOutput, LiteralOutput, Output, OutputWarning, ResultSet};
pub use signal::{SignalHandler, SignalState};
pub use state::{JobLifecycle, JobState, JobStateError};
pub use summary::{ExitCode, JobSummary};

pub use wps_protocol::Markers;
