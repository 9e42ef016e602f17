//! Host-Side Components
//!
//! Network access for the job client: submitting Execute requests and
//! fetching status documents and artifacts.

pub mod transport;

pub use transport::{HttpTransport, HttpTransportConfig, MockTransport, Transport, TransportError};
