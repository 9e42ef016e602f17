//! Tolerant scanning of Execute responses and status documents.
//!
//! The scanner never fails. A failure block without a readable exception
//! yields the [`UNKNOWN`] sentinel, a running status without progress
//! information yields `None` fields, and a malformed output fragment yields a
//! per-fragment error next to the fragments that did classify.

use regex_lite::Regex;

use crate::error::OutputError;
use crate::markers::{self, Markers};
use crate::output::{classify_fragment, ClassifiedOutput};

/// Sentinel for exception code and text that could not be read.
pub const UNKNOWN: &str = "Unknown";

/// Exception code and text inside a failure block; `(?s)` lets `.` span lines.
const EXCEPTION_PATTERN: &str =
    r#"(?s)<ows:Exception.+exceptionCode="([^"]+).+<ows:ExceptionText>(.+)</ows:ExceptionText>"#;

/// What one response says about the job.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Failure marker found.
    Failed { code: String, message: String },
    /// Success marker found; one entry per output fragment, in document order.
    Succeeded {
        outputs: Vec<Result<ClassifiedOutput, OutputError>>,
    },
    /// Neither marker found. Both fields are optional.
    Running {
        percent: Option<u8>,
        message: Option<String>,
    },
}

impl ScanOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScanOutcome::Running { .. })
    }
}

/// Marker-based scanner over immutable response text.
#[derive(Debug, Clone)]
pub struct ResponseScanner {
    markers: Markers,
    exception: Regex,
}

impl ResponseScanner {
    /// Scanner with the WPS 1.0.0 markers.
    pub fn new() -> Self {
        Self::with_markers(Markers::default())
    }

    /// Scanner with a custom marker set.
    pub fn with_markers(markers: Markers) -> Self {
        Self {
            markers,
            exception: Regex::new(EXCEPTION_PATTERN).expect("exception pattern is valid"),
        }
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// Scan a status document.
    ///
    /// Precedence: failure, then success, then running.
    pub fn scan(&self, text: &str) -> ScanOutcome {
        if text.contains(&self.markers.failed_start) {
            let (code, message) = self.exception(text);
            return ScanOutcome::Failed { code, message };
        }

        if text.contains(&self.markers.succeeded) {
            let outputs = self
                .output_fragments(text)
                .into_iter()
                .map(|fragment| classify_fragment(&self.markers, fragment))
                .collect();
            return ScanOutcome::Succeeded { outputs };
        }

        ScanOutcome::Running {
            percent: self.percent_completed(text),
            message: self.status_message(text),
        }
    }

    /// Status document URL from an Execute acknowledgement.
    pub fn status_location(&self, text: &str) -> Option<String> {
        markers::between(text, &self.markers.status_location, "\"")
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(markers::unescape)
    }

    /// Exception code and text of a failed process, or the sentinel pair.
    pub fn exception(&self, text: &str) -> (String, String) {
        let block = match text.find(&self.markers.failed_start) {
            Some(start) => {
                let rest = &text[start + self.markers.failed_start.len()..];
                match rest.find(&self.markers.failed_end) {
                    Some(end) => &rest[..end],
                    None => rest,
                }
            }
            None => text,
        };

        match self.exception.captures(block) {
            Some(caps) => {
                let code = caps.get(1).map(|m| m.as_str().trim()).unwrap_or(UNKNOWN);
                let message = caps
                    .get(2)
                    .map(|m| markers::unescape(m.as_str().trim()))
                    .unwrap_or_else(|| UNKNOWN.to_string());
                (code.to_string(), message)
            }
            None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
        }
    }

    /// Text of each output, without the preamble before the first output.
    pub fn output_fragments<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split(self.markers.output_start.as_str())
            .skip(1)
            .map(|fragment| match fragment.find(&self.markers.output_end) {
                Some(end) => &fragment[..end],
                None => fragment,
            })
            .collect()
    }

    fn percent_completed(&self, text: &str) -> Option<u8> {
        let raw = markers::between(text, &self.markers.percent_completed, "\"")?;
        let value: f64 = raw.trim().parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        Some(value.clamp(0.0, 100.0).round() as u8)
    }

    fn status_message(&self, text: &str) -> Option<String> {
        let message = if let Some(start) = text.find(&self.markers.percent_completed) {
            let rest = &text[start + self.markers.percent_completed.len()..];
            let body = &rest[rest.find("\">")? + 2..];
            // Other elements (e.g. ProcessPaused) carry the attribute too;
            // their message ends at the first closing tag.
            match body.find(&self.markers.started_end).or_else(|| body.find("</")) {
                Some(end) => &body[..end],
                None => body,
            }
        } else {
            markers::between(text, &self.markers.accepted_start, &self.markers.accepted_end)?
        };

        let message = markers::unescape(message.trim());
        (!message.is_empty()).then_some(message)
    }
}

/// Status document URL from an Execute acknowledgement, using the default markers.
pub fn extract_status_location(text: &str) -> Option<String> {
    ResponseScanner::new().status_location(text)
}

impl Default for ResponseScanner {
    fn default() -> Self {
        Self::new()
    }
}
