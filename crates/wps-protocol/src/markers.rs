//! Textual markers recognised in WPS status documents.
//!
//! The scanner locates these substrings instead of walking an XML tree.
//! The defaults match the `wps:`/`ows:` prefixes emitted by PyWPS and most
//! 1.0.0 servers; a server using other prefixes needs its own [`Markers`].

use serde::{Deserialize, Serialize};

/// Start of the failure block.
pub const PROCESS_FAILED_START: &str = "<wps:ProcessFailed";
/// End of the failure block.
pub const PROCESS_FAILED_END: &str = "</wps:ProcessFailed>";
/// Present once the process has completed successfully.
pub const PROCESS_SUCCEEDED: &str = "<wps:ProcessSucceeded";
/// Opens one output in the output section.
pub const OUTPUT_START: &str = "<wps:Output>";
/// Closes one output.
pub const OUTPUT_END: &str = "</wps:Output>";
/// Literal (scalar) output data.
pub const LITERAL_DATA: &str = "<wps:LiteralData";
/// Inline complex output data.
pub const COMPLEX_DATA: &str = "<wps:ComplexData";
/// Output returned by reference.
pub const REFERENCE: &str = "<wps:Reference";
/// MIME type attribute; its presence separates complex references from literal ones.
pub const MIME_TYPE: &str = "mimeType";
/// Progress attribute of `ProcessStarted`.
pub const PERCENT_COMPLETED: &str = "percentCompleted=\"";
/// Ends the status message of a started process.
pub const PROCESS_STARTED_END: &str = "</wps:ProcessStarted>";
/// Start of an accepted (queued) status.
pub const PROCESS_ACCEPTED_START: &str = "<wps:ProcessAccepted>";
/// End of an accepted status.
pub const PROCESS_ACCEPTED_END: &str = "</wps:ProcessAccepted>";
/// Attribute carrying the status document URL in the Execute acknowledgement.
pub const STATUS_LOCATION: &str = "statusLocation=\"";
/// Output identifier element.
pub const IDENTIFIER_START: &str = "<ows:Identifier>";
/// End of the output identifier element.
pub const IDENTIFIER_END: &str = "</ows:Identifier>";

/// Marker set used by [`crate::ResponseScanner`] and [`crate::classify_fragment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markers {
    pub failed_start: String,
    pub failed_end: String,
    pub succeeded: String,
    pub output_start: String,
    pub output_end: String,
    pub literal: String,
    pub complex: String,
    pub reference: String,
    pub mime_type: String,
    pub percent_completed: String,
    pub started_end: String,
    pub accepted_start: String,
    pub accepted_end: String,
    pub status_location: String,
    pub identifier_start: String,
    pub identifier_end: String,
}

impl Markers {
    /// Markers for WPS 1.0.0 documents with the conventional prefixes.
    pub fn wps_1_0() -> Self {
        Self {
            failed_start: PROCESS_FAILED_START.to_string(),
            failed_end: PROCESS_FAILED_END.to_string(),
            succeeded: PROCESS_SUCCEEDED.to_string(),
            output_start: OUTPUT_START.to_string(),
            output_end: OUTPUT_END.to_string(),
            literal: LITERAL_DATA.to_string(),
            complex: COMPLEX_DATA.to_string(),
            reference: REFERENCE.to_string(),
            mime_type: MIME_TYPE.to_string(),
            percent_completed: PERCENT_COMPLETED.to_string(),
            started_end: PROCESS_STARTED_END.to_string(),
            accepted_start: PROCESS_ACCEPTED_START.to_string(),
            accepted_end: PROCESS_ACCEPTED_END.to_string(),
            status_location: STATUS_LOCATION.to_string(),
            identifier_start: IDENTIFIER_START.to_string(),
            identifier_end: IDENTIFIER_END.to_string(),
        }
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::wps_1_0()
    }
}

/// Text between the first `start` and the following `end`.
///
/// Returns `None` when either delimiter is missing.
pub fn between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = text.find(start)? + start.len();
    let rest = &text[from..];
    let to = rest.find(end)?;
    Some(&rest[..to])
}

/// Value of the first `attr="..."` in `text`.
///
/// `attr` is matched as a suffix so that `href` also finds `xlink:href`.
pub fn attribute<'a>(text: &'a str, attr: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", attr);
    between(text, &needle, "\"")
}

/// Content of the element opened by `open` (a tag prefix such as
/// `<wps:LiteralData`), skipping any attributes on the opening tag.
pub fn element_text<'a>(text: &'a str, open: &str) -> Option<&'a str> {
    let from = text.find(open)? + open.len();
    let rest = &text[from..];
    let tag_end = rest.find('>')?;
    if rest[..tag_end].ends_with('/') {
        return Some("");
    }
    let body = &rest[tag_end + 1..];
    let name = open.trim_start_matches('<');
    let close = format!("</{}>", name);
    let to = body.find(&close)?;
    Some(&body[..to])
}

/// Undo the five predefined XML entities.
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
