//! Output fragment classification.
//!
//! A fragment is the text of one `<wps:Output>` element as cut by the
//! scanner. Classification looks only for markers:
//!
//! 1. literal data marker → literal
//! 2. complex data marker → complex (inline payload)
//! 3. reference marker → complex when a MIME type is declared, literal otherwise
//!
//! Step 3 is a heuristic. Servers return literal outputs by reference when
//! every output is requested `asReference`, and those references carry no
//! MIME type. A fragment matching none of the markers is an error, never
//! silently dropped.

use serde::{Deserialize, Serialize};

use crate::error::{excerpt, OutputError};
use crate::markers::{self, Markers};

/// A scalar output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralData {
    pub name: String,
    pub value: String,
}

/// Where the content of a complex output lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ComplexSource {
    /// URL to fetch the artifact from.
    Reference(String),
    /// Artifact embedded in the status document.
    Inline(String),
}

/// An artifact output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexData {
    pub name: String,
    pub source: ComplexSource,
    pub mime_type: Option<String>,
}

/// Result of classifying one fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "lowercase")]
pub enum ClassifiedOutput {
    Literal(LiteralData),
    Complex(ComplexData),
}

impl ClassifiedOutput {
    pub fn name(&self) -> &str {
        match self {
            ClassifiedOutput::Literal(l) => &l.name,
            ClassifiedOutput::Complex(c) => &c.name,
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, ClassifiedOutput::Complex(_))
    }
}

/// Decide the variant of one output fragment and extract its fields.
pub fn classify_fragment(markers: &Markers, fragment: &str) -> Result<ClassifiedOutput, OutputError> {
    let name = identifier(markers, fragment);

    let has_literal = fragment.contains(&markers.literal);
    let has_complex = fragment.contains(&markers.complex);
    let has_reference = fragment.contains(&markers.reference);

    if !(has_literal || has_complex || has_reference) {
        return Err(OutputError::Unclassifiable {
            name,
            excerpt: excerpt(fragment),
        });
    }

    let Some(name) = name else {
        return Err(OutputError::MissingIdentifier {
            excerpt: excerpt(fragment),
        });
    };

    if has_literal {
        let value = markers::element_text(fragment, &markers.literal)
            .map(|v| markers::unescape(v.trim()))
            .unwrap_or_default();
        return Ok(ClassifiedOutput::Literal(LiteralData { name, value }));
    }

    if has_complex {
        let payload = markers::element_text(fragment, &markers.complex)
            .map(|p| p.trim().to_string())
            .unwrap_or_default();
        return Ok(ClassifiedOutput::Complex(ComplexData {
            name,
            source: ComplexSource::Inline(payload),
            mime_type: mime_type(markers, fragment),
        }));
    }

    let href = reference_href(markers, fragment).unwrap_or_default();
    if fragment.contains(&markers.mime_type) {
        Ok(ClassifiedOutput::Complex(ComplexData {
            name,
            source: ComplexSource::Reference(href),
            mime_type: mime_type(markers, fragment),
        }))
    } else {
        Ok(ClassifiedOutput::Literal(LiteralData { name, value: href }))
    }
}

fn identifier(markers: &Markers, fragment: &str) -> Option<String> {
    markers::between(fragment, &markers.identifier_start, &markers.identifier_end)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

fn mime_type(markers: &Markers, fragment: &str) -> Option<String> {
    markers::attribute(fragment, &markers.mime_type)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(markers::unescape)
}

fn reference_href(markers: &Markers, fragment: &str) -> Option<String> {
    let start = fragment.find(&markers.reference)?;
    let tag = &fragment[start..];
    let tag = &tag[..tag.find('>').map(|i| i + 1).unwrap_or(tag.len())];
    markers::attribute(tag, "href").map(|h| markers::unescape(h.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LITERAL: &str = r#"
        <ows:Identifier>num</ows:Identifier>
        <ows:Title>A number</ows:Title>
        <wps:Data>
          <wps:LiteralData dataType="integer">42</wps:LiteralData>
        </wps:Data>"#;

    const REFERENCE_WITH_MIME: &str = r#"
        <ows:Identifier>buffer</ows:Identifier>
        <wps:Reference href="http://host/wpsoutputs/buffer-1234.gml" mimeType="text/xml; subtype=gml/3.1.1" />"#;

    const REFERENCE_WITHOUT_MIME: &str = r#"
        <ows:Identifier>buffer</ows:Identifier>
        <wps:Reference href="http://host/wpsoutputs/buffer-1234.gml" />"#;

    const INLINE_COMPLEX: &str = r#"
        <ows:Identifier>region</ows:Identifier>
        <wps:Data>
          <wps:ComplexData mimeType="application/json">{"a":1}</wps:ComplexData>
        </wps:Data>"#;

    #[test]
    fn test_literal_output() {
        let out = classify_fragment(&Markers::default(), LITERAL).unwrap();
        assert_eq!(
            out,
            ClassifiedOutput::Literal(LiteralData {
                name: "num".to_string(),
                value: "42".to_string(),
            })
        );
    }

    #[test]
    fn test_reference_with_mime_is_complex() {
        let out = classify_fragment(&Markers::default(), REFERENCE_WITH_MIME).unwrap();
        match out {
            ClassifiedOutput::Complex(c) => {
                assert_eq!(c.name, "buffer");
                assert_eq!(
                    c.source,
                    ComplexSource::Reference("http://host/wpsoutputs/buffer-1234.gml".to_string())
                );
                assert_eq!(c.mime_type.as_deref(), Some("text/xml; subtype=gml/3.1.1"));
            }
            other => panic!("expected complex, got {:?}", other),
        }
    }

    #[test]
    fn test_reference_without_mime_is_literal() {
        let out = classify_fragment(&Markers::default(), REFERENCE_WITHOUT_MIME).unwrap();
        assert_eq!(
            out,
            ClassifiedOutput::Literal(LiteralData {
                name: "buffer".to_string(),
                value: "http://host/wpsoutputs/buffer-1234.gml".to_string(),
            })
        );
    }

    #[test]
    fn test_inline_complex() {
        let out = classify_fragment(&Markers::default(), INLINE_COMPLEX).unwrap();
        match out {
            ClassifiedOutput::Complex(c) => {
                assert_eq!(c.source, ComplexSource::Inline(r#"{"a":1}"#.to_string()));
                assert_eq!(c.mime_type.as_deref(), Some("application/json"));
            }
            other => panic!("expected complex, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_marker_wins_over_reference() {
        let fragment = format!("{}<wps:Reference href=\"http://x\" mimeType=\"a/b\"/>", LITERAL);
        let out = classify_fragment(&Markers::default(), &fragment).unwrap();
        assert!(!out.is_complex());
    }

    #[test]
    fn test_unmarked_fragment_is_reported() {
        let fragment = "<ows:Identifier>mystery</ows:Identifier><ows:Title>?</ows:Title>";
        let err = classify_fragment(&Markers::default(), fragment).unwrap_err();
        assert_eq!(err.output_name(), Some("mystery"));
        assert!(matches!(err, OutputError::Unclassifiable { .. }));
    }

    #[test]
    fn test_missing_identifier() {
        let fragment = r#"<wps:LiteralData>1</wps:LiteralData>"#;
        let err = classify_fragment(&Markers::default(), fragment).unwrap_err();
        assert!(matches!(err, OutputError::MissingIdentifier { .. }));
    }

    #[test]
    fn test_href_entities_are_decoded() {
        let fragment = r#"<ows:Identifier>o</ows:Identifier>
            <wps:Reference xlink:href="http://h/mapserv?map=a.map&amp;SERVICE=WCS" mimeType="image/tiff"/>"#;
        match classify_fragment(&Markers::default(), fragment).unwrap() {
            ClassifiedOutput::Complex(c) => assert_eq!(
                c.source,
                ComplexSource::Reference("http://h/mapserv?map=a.map&SERVICE=WCS".to_string())
            ),
            other => panic!("expected complex, got {:?}", other),
        }
    }

    #[test]
    fn test_classification_is_deterministic() {
        let markers = Markers::default();
        for fragment in [LITERAL, REFERENCE_WITH_MIME, REFERENCE_WITHOUT_MIME, INLINE_COMPLEX] {
            let first = classify_fragment(&markers, fragment);
            let second = classify_fragment(&markers, fragment);
            assert_eq!(first, second);
        }
    }
}
