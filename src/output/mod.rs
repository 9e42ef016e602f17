//! Job outputs and the per-client result set
//!
//! Classified fragments from the protocol layer become [`Output`] values
//! here. Complex outputs start out unmaterialized and gain a local artifact
//! path and dataset information once the client has fetched and inspected
//! them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wps_protocol::{ClassifiedOutput, ComplexData, ComplexSource, LiteralData};

use crate::dataset::DatasetInfo;

/// A scalar output value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralOutput {
    pub name: String,
    pub value: String,
}

/// An artifact output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexOutput {
    pub name: String,
    pub source: ComplexSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Local copy of the artifact, once fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    /// Dataset inspection result, once inspected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetInfo>,
}

impl ComplexOutput {
    /// Remote locator, for reference outputs
    pub fn reference(&self) -> Option<&str> {
        match &self.source {
            ComplexSource::Reference(url) => Some(url),
            ComplexSource::Inline(_) => None,
        }
    }

    pub fn is_materialized(&self) -> bool {
        self.local_path.is_some()
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }
}

impl From<ComplexData> for ComplexOutput {
    fn from(data: ComplexData) -> Self {
        Self {
            name: data.name,
            source: data.source,
            mime_type: data.mime_type,
            local_path: None,
            dataset: None,
        }
    }
}

/// One job output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Output {
    Literal(LiteralOutput),
    Complex(ComplexOutput),
}

impl Output {
    pub fn name(&self) -> &str {
        match self {
            Output::Literal(l) => &l.name,
            Output::Complex(c) => &c.name,
        }
    }
}

impl From<ClassifiedOutput> for Output {
    fn from(classified: ClassifiedOutput) -> Self {
        match classified {
            ClassifiedOutput::Literal(LiteralData { name, value }) => {
                Output::Literal(LiteralOutput { name, value })
            }
            ClassifiedOutput::Complex(data) => Output::Complex(data.into()),
        }
    }
}

/// Per-output fault that does not stop the rest of the batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputWarning {
    #[error("output could not be classified: {detail}")]
    Unclassifiable {
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
        detail: String,
    },

    #[error("output {output}: artifact could not be retrieved: {reason}")]
    ArtifactFetchFailed { output: String, reason: String },

    #[error("output {output}: no dataset information, not added to the map")]
    DatasetInspectionFailed { output: String },
}

impl OutputWarning {
    /// Output the warning refers to, when known
    pub fn output(&self) -> Option<&str> {
        match self {
            OutputWarning::Unclassifiable { output, .. } => output.as_deref(),
            OutputWarning::ArtifactFetchFailed { output, .. }
            | OutputWarning::DatasetInspectionFailed { output } => Some(output),
        }
    }
}

/// Outputs of one job, partitioned by variant
///
/// Append-only: entries are added when the job finishes and never removed.
/// Complex entries may be completed in place with their artifact path and
/// dataset information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    literal: Vec<LiteralOutput>,
    complex: Vec<ComplexOutput>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an output, keeping its variant partition.
    pub fn push(&mut self, output: Output) {
        match output {
            Output::Literal(l) => self.literal.push(l),
            Output::Complex(c) => self.complex.push(c),
        }
    }

    pub fn literal(&self) -> &[LiteralOutput] {
        &self.literal
    }

    pub fn complex(&self) -> &[ComplexOutput] {
        &self.complex
    }

    pub(crate) fn complex_mut(&mut self) -> &mut [ComplexOutput] {
        &mut self.complex
    }

    /// Literal value by output name
    pub fn literal_value(&self, name: &str) -> Option<&str> {
        self.literal
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }

    /// Complex output by name
    pub fn complex_output(&self, name: &str) -> Option<&ComplexOutput> {
        self.complex.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.literal_value(name).is_some() || self.complex_output(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.literal.len() + self.complex.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every output, literals first
    pub fn iter(&self) -> impl Iterator<Item = Output> + '_ {
        self.literal
            .iter()
            .cloned()
            .map(Output::Literal)
            .chain(self.complex.iter().cloned().map(Output::Complex))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(name: &str, value: &str) -> Output {
        Output::Literal(LiteralOutput {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    fn complex(name: &str, url: &str) -> Output {
        Output::Complex(ComplexOutput {
            name: name.to_string(),
            source: ComplexSource::Reference(url.to_string()),
            mime_type: Some("text/xml".to_string()),
            local_path: None,
            dataset: None,
        })
    }

    #[test]
    fn test_result_set_partitions_by_variant() {
        let mut results = ResultSet::new();
        results.push(literal("num", "7"));
        results.push(complex("region", "http://host/region.gml"));
        results.push(literal("rand", "0.5"));

        assert_eq!(results.len(), 3);
        assert_eq!(results.literal().len(), 2);
        assert_eq!(results.complex().len(), 1);
        assert_eq!(results.literal_value("num"), Some("7"));
        assert!(results.complex_output("region").is_some());
        assert!(results.contains("rand"));
        assert!(!results.contains("missing"));
    }

    #[test]
    fn test_iter_lists_literals_first() {
        let mut results = ResultSet::new();
        results.push(complex("region", "http://host/region.gml"));
        results.push(literal("num", "7"));
        let names: Vec<String> = results.iter().map(|o| o.name().to_string()).collect();
        assert_eq!(names, vec!["num", "region"]);
    }

    #[test]
    fn test_from_classified() {
        let output: Output = ClassifiedOutput::Complex(ComplexData {
            name: "buffer".to_string(),
            source: ComplexSource::Reference("http://host/b.gml".to_string()),
            mime_type: Some("text/xml".to_string()),
        })
        .into();
        match output {
            Output::Complex(c) => {
                assert_eq!(c.reference(), Some("http://host/b.gml"));
                assert!(!c.is_materialized());
            }
            other => panic!("expected complex, got {:?}", other),
        }
    }

    #[test]
    fn test_warning_output_name() {
        let warning = OutputWarning::DatasetInspectionFailed {
            output: "noise".to_string(),
        };
        assert_eq!(warning.output(), Some("noise"));
        assert!(warning.to_string().contains("noise"));
    }
}
