//! Execute request encoding.
//!
//! Builds the XML body POSTed to the server. Every output is requested by
//! reference inside a stored, status-updating response document, which is
//! what makes the server answer immediately with a status location and run
//! the process asynchronously.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::{WPS_SERVICE, WPS_VERSION};

/// URL prefixes that turn an input value into a reference input.
pub const REFERENCE_PREFIXES: &[&str] = &["http://", "https://"];

/// How an input value is passed to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum InputValue {
    /// Inline scalar value.
    Literal(String),
    /// External resource the server fetches itself.
    Reference(String),
}

impl InputValue {
    /// Classify a raw value by its prefix.
    pub fn classify(value: &str) -> Self {
        if REFERENCE_PREFIXES.iter().any(|p| value.starts_with(p)) {
            InputValue::Reference(value.to_string())
        } else {
            InputValue::Literal(value.to_string())
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, InputValue::Reference(_))
    }
}

/// A named input argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputArg {
    pub name: String,
    pub value: InputValue,
}

/// A fully assembled Execute request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Process identifier on the server.
    pub process: String,
    /// Inputs in submission order.
    pub inputs: Vec<InputArg>,
    /// Requested outputs in submission order.
    pub outputs: Vec<String>,
}

impl ExecuteRequest {
    /// Encode as a WPS 1.0.0 Execute document.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);
        // Writing into a String cannot fail.
        let _ = self.write_xml(&mut xml);
        xml
    }

    fn write_xml(&self, xml: &mut String) -> std::fmt::Result {
        writeln!(xml, r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#)?;
        writeln!(
            xml,
            r#"<wps:Execute service="{}" version="{}" xmlns:wps="http://www.opengis.net/wps/1.0.0" xmlns:ows="http://www.opengis.net/ows/1.1" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.opengis.net/wps/1.0.0 http://schemas.opengis.net/wps/1.0.0/wpsExecute_request.xsd">"#,
            WPS_SERVICE, WPS_VERSION
        )?;
        writeln!(xml, "  <ows:Identifier>{}</ows:Identifier>", escape(&self.process))?;

        if !self.inputs.is_empty() {
            writeln!(xml, "  <wps:DataInputs>")?;
            for input in &self.inputs {
                writeln!(xml, "    <wps:Input>")?;
                writeln!(xml, "      <ows:Identifier>{}</ows:Identifier>", escape(&input.name))?;
                match &input.value {
                    InputValue::Reference(href) => {
                        writeln!(xml, r#"      <wps:Reference xlink:href="{}"/>"#, escape(href))?;
                    }
                    InputValue::Literal(value) => {
                        writeln!(xml, "      <wps:Data>")?;
                        writeln!(xml, "        <wps:LiteralData>{}</wps:LiteralData>", escape(value))?;
                        writeln!(xml, "      </wps:Data>")?;
                    }
                }
                writeln!(xml, "    </wps:Input>")?;
            }
            writeln!(xml, "  </wps:DataInputs>")?;
        }

        writeln!(xml, "  <wps:ResponseForm>")?;
        writeln!(
            xml,
            r#"    <wps:ResponseDocument storeExecuteResponse="true" status="true">"#
        )?;
        for output in &self.outputs {
            writeln!(xml, r#"      <wps:Output asReference="true">"#)?;
            writeln!(xml, "        <ows:Identifier>{}</ows:Identifier>", escape(output))?;
            writeln!(xml, "      </wps:Output>")?;
        }
        writeln!(xml, "    </wps:ResponseDocument>")?;
        writeln!(xml, "  </wps:ResponseForm>")?;
        writeln!(xml, "</wps:Execute>")
    }
}

/// Pair input names with values and assemble the request.
///
/// Fails with [`RequestError::InputArityMismatch`] when the two lists differ
/// in length; nothing is produced in that case.
pub fn build_execute_request(
    process: &str,
    input_names: &[String],
    input_values: &[String],
    output_names: &[String],
) -> Result<ExecuteRequest, RequestError> {
    if input_names.len() != input_values.len() {
        return Err(RequestError::InputArityMismatch {
            names: input_names.len(),
            values: input_values.len(),
        });
    }
    if process.trim().is_empty() {
        return Err(RequestError::EmptyProcess);
    }

    let inputs = input_names
        .iter()
        .zip(input_values)
        .map(|(name, value)| InputArg {
            name: name.clone(),
            value: InputValue::classify(value),
        })
        .collect();

    Ok(ExecuteRequest {
        process: process.to_string(),
        inputs,
        outputs: output_names.to_vec(),
    })
}

/// XML-escape text, leaving entity references that are already present alone.
///
/// Reference URLs are commonly written with `&amp;` separators; escaping them
/// again would send `&amp;amp;` to the server.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '&' if starts_entity(&text[i..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn starts_entity(text: &str) -> bool {
    let Some(end) = text.find(';') else {
        return false;
    };
    let name = &text[1..end];
    if name.is_empty() || name.len() > 8 {
        return false;
    }
    match name.strip_prefix('#') {
        Some(num) => {
            let digits = num.strip_prefix('x').unwrap_or(num);
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => name.chars().all(|c| c.is_ascii_alphanumeric()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_arity_mismatch_produces_nothing() {
        let result = build_execute_request(
            "buffer",
            &strings(&["size", "data"]),
            &strings(&["5"]),
            &strings(&["buffer"]),
        );
        assert_eq!(
            result,
            Err(RequestError::InputArityMismatch { names: 2, values: 1 })
        );
    }

    #[test]
    fn test_empty_process_rejected() {
        let result = build_execute_request(" ", &[], &[], &strings(&["answer"]));
        assert_eq!(result, Err(RequestError::EmptyProcess));
    }

    #[test]
    fn test_reference_detection() {
        assert!(InputValue::classify("http://host/data.gml").is_reference());
        assert!(InputValue::classify("https://host/dem.tif").is_reference());
        assert!(!InputValue::classify("5").is_reference());
        assert!(!InputValue::classify("see http://host").is_reference());
    }

    #[test]
    fn test_xml_encodes_literal_and_reference_inputs() {
        let request = build_execute_request(
            "buffer",
            &strings(&["size", "data"]),
            &strings(&["5", "http://host/lines.gml"]),
            &strings(&["buffer"]),
        )
        .unwrap();
        let xml = request.to_xml();

        assert!(xml.contains("<ows:Identifier>buffer</ows:Identifier>"));
        assert!(xml.contains("<wps:LiteralData>5</wps:LiteralData>"));
        assert!(xml.contains(r#"<wps:Reference xlink:href="http://host/lines.gml"/>"#));
        assert!(xml.contains(r#"storeExecuteResponse="true" status="true""#));
    }

    #[test]
    fn test_outputs_requested_in_order() {
        let request = build_execute_request(
            "test_rand_map",
            &strings(&["delay"]),
            &strings(&["1"]),
            &strings(&["rand", "region", "num"]),
        )
        .unwrap();
        let xml = request.to_xml();

        let rand = xml.find("<ows:Identifier>rand</ows:Identifier>").unwrap();
        let region = xml.find("<ows:Identifier>region</ows:Identifier>").unwrap();
        let num = xml.find("<ows:Identifier>num</ows:Identifier>").unwrap();
        assert!(rand < region && region < num);
        assert_eq!(xml.matches(r#"<wps:Output asReference="true">"#).count(), 3);
    }

    #[test]
    fn test_no_inputs_omits_data_inputs() {
        let request =
            build_execute_request("ultimatequestionprocess", &[], &[], &strings(&["answer"]))
                .unwrap();
        assert!(!request.to_xml().contains("<wps:DataInputs>"));
    }

    #[test]
    fn test_escape_preserves_existing_entities() {
        assert_eq!(
            escape("map=/a.map&amp;SERVICE=WFS&REQUEST=x"),
            "map=/a.map&amp;SERVICE=WFS&amp;REQUEST=x"
        );
        assert_eq!(escape("a<b>\"c\""), "a&lt;b&gt;&quot;c&quot;");
        assert_eq!(escape("&#38;&#x26;"), "&#38;&#x26;");
        assert_eq!(escape("fish & chips;"), "fish &amp; chips;");
    }
}
