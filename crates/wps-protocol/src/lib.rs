//! WPS Protocol Types
//!
//! Text-level view of the Web Processing Service 1.0.0 exchange used by the
//! job client: Execute request encoding, a marker-based scanner for
//! status documents, and per-output classification.
//!
//! Nothing in this crate performs I/O. Responses are scanned, not parsed:
//! some servers emit status documents that are not well-formed XML, so every
//! extraction is best-effort and falls back to a default instead of failing.

pub mod error;
pub mod markers;
pub mod output;
pub mod request;
pub mod response;

pub use error::{OutputError, RequestError};
pub use markers::Markers;
pub use output::{classify_fragment, ClassifiedOutput, ComplexData, ComplexSource, LiteralData};
pub use request::{build_execute_request, ExecuteRequest, InputArg, InputValue};
pub use response::{extract_status_location, ResponseScanner, ScanOutcome, UNKNOWN};

/// Protocol version spoken by this implementation.
pub const WPS_VERSION: &str = "1.0.0";

/// Service name placed in every request.
pub const WPS_SERVICE: &str = "WPS";
