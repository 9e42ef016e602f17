//! Error types for request encoding and output classification.

use thiserror::Error;

/// Errors raised while assembling an Execute request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Input names and values must pair up one to one.
    #[error("different number of input names ({names}) and values ({values})")]
    InputArityMismatch { names: usize, values: usize },

    #[error("process identifier is empty")]
    EmptyProcess,
}

/// Errors raised while classifying a single output fragment.
///
/// These are per-fragment: a scanner that hits one keeps going with the
/// remaining fragments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputError {
    /// Fragment carries none of the literal, complex or reference markers.
    #[error("unclassifiable output fragment: {excerpt}")]
    Unclassifiable {
        name: Option<String>,
        excerpt: String,
    },

    /// Fragment has a recognised marker but no output identifier.
    #[error("output fragment has no identifier: {excerpt}")]
    MissingIdentifier { excerpt: String },
}

impl OutputError {
    /// Name of the offending output, when one could be read.
    pub fn output_name(&self) -> Option<&str> {
        match self {
            OutputError::Unclassifiable { name, .. } => name.as_deref(),
            OutputError::MissingIdentifier { .. } => None,
        }
    }
}

/// Shorten a fragment for inclusion in an error message.
pub(crate) fn excerpt(fragment: &str) -> String {
    const MAX: usize = 80;
    let flat: String = fragment
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if flat.chars().count() <= MAX {
        flat
    } else {
        let cut: String = flat.chars().take(MAX).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_flattens_whitespace() {
        assert_eq!(excerpt("  <a>\n   b </a>  "), "<a> b </a>");
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(200);
        let short = excerpt(&long);
        assert!(short.ends_with("..."));
        assert_eq!(short.len(), 83);
    }

    #[test]
    fn test_unclassifiable_message_names_output() {
        let err = OutputError::Unclassifiable {
            name: Some("num".to_string()),
            excerpt: "<ows:Identifier>num</ows:Identifier>".to_string(),
        };
        assert!(err.to_string().starts_with("unclassifiable output fragment"));
        assert_eq!(err.output_name(), Some("num"));
    }
}
