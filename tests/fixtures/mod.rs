//! Canned WPS 1.0.0 documents and client wiring shared by the integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use wps_client::{
    ArtifactStore, ClientContext, FileInspector, MockTransport, PublishSettings,
};

pub const SERVER: &str = "http://wps.example.org/wps";
pub const STATUS_URL: &str = "http://wps.example.org/wpsoutputs/pywps-a1b2c3.xml";
pub const PROCESS_ID: &str = "pywps-a1b2c3";

/// Execute acknowledgement carrying the status location
pub fn ack() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<wps:ExecuteResponse xmlns:wps="http://www.opengis.net/wps/1.0.0" xmlns:ows="http://www.opengis.net/ows/1.1" service="WPS" version="1.0.0" statusLocation="{}">
  <wps:Process wps:processVersion="1.0"><ows:Identifier>ultimate_question</ows:Identifier></wps:Process>
  <wps:Status creationTime="2026-10-17T09:00:00Z">
    <wps:ProcessAccepted>Process ultimate_question accepted</wps:ProcessAccepted>
  </wps:Status>
</wps:ExecuteResponse>"#,
        STATUS_URL
    )
}

/// Status document of a job still running
pub fn started(percent: u32, message: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<wps:ExecuteResponse xmlns:wps="http://www.opengis.net/wps/1.0.0" xmlns:ows="http://www.opengis.net/ows/1.1" statusLocation="{}">
  <wps:Status creationTime="2026-10-17T09:00:05Z">
    <wps:ProcessStarted percentCompleted="{}">{}</wps:ProcessStarted>
  </wps:Status>
</wps:ExecuteResponse>"#,
        STATUS_URL, percent, message
    )
}

/// Status document of a failed job with an exception report
pub fn failed(code: &str, text: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<wps:ExecuteResponse xmlns:wps="http://www.opengis.net/wps/1.0.0" xmlns:ows="http://www.opengis.net/ows/1.1" statusLocation="{}">
  <wps:Status creationTime="2026-10-17T09:00:07Z">
    <wps:ProcessFailed>
      <wps:ExceptionReport>
        <ows:Exception exceptionCode="{}" locator="delay">
          <ows:ExceptionText>{}</ows:ExceptionText>
        </ows:Exception>
      </wps:ExceptionReport>
    </wps:ProcessFailed>
  </wps:Status>
</wps:ExecuteResponse>"#,
        STATUS_URL, code, text
    )
}

/// Failure marker with a truncated exception block
pub fn failed_malformed() -> String {
    r#"<wps:ExecuteResponse><wps:Status><wps:ProcessFailed><wps:ExceptionReport><ows:Exc"#
        .to_string()
}

/// Status document of a successful job
pub fn succeeded(outputs: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<wps:ExecuteResponse xmlns:wps="http://www.opengis.net/wps/1.0.0" xmlns:ows="http://www.opengis.net/ows/1.1" statusLocation="{}">
  <wps:Status creationTime="2026-10-17T09:00:10Z">
    <wps:ProcessSucceeded>PyWPS Process ultimate_question finished</wps:ProcessSucceeded>
  </wps:Status>
  <wps:ProcessOutputs>
{}
  </wps:ProcessOutputs>
</wps:ExecuteResponse>"#,
        STATUS_URL,
        outputs.join("\n")
    )
}

pub fn literal_output(name: &str, value: &str) -> String {
    format!(
        r#"    <wps:Output>
      <ows:Identifier>{}</ows:Identifier>
      <ows:Title>{}</ows:Title>
      <wps:Data><wps:LiteralData dataType="integer">{}</wps:LiteralData></wps:Data>
    </wps:Output>"#,
        name, name, value
    )
}

pub fn reference_output(name: &str, href: &str, mime_type: Option<&str>) -> String {
    let mime = mime_type
        .map(|m| format!(r#" mimeType="{}""#, m))
        .unwrap_or_default();
    format!(
        r#"    <wps:Output>
      <ows:Identifier>{}</ows:Identifier>
      <wps:Reference href="{}"{} />
    </wps:Output>"#,
        name, href, mime
    )
}

/// Output fragment matching none of the data markers
pub fn bare_output(name: &str) -> String {
    format!(
        r#"    <wps:Output>
      <ows:Identifier>{}</ows:Identifier>
      <ows:Title>no data</ows:Title>
    </wps:Output>"#,
        name
    )
}

/// GML feature collection with polygons in EPSG:28992
pub fn polygon_gml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs" xmlns:gml="http://www.opengis.net/gml">
  <gml:boundedBy>
    <gml:Envelope srsName="EPSG:28992">
      <gml:lowerCorner>120000 480000</gml:lowerCorner>
      <gml:upperCorner>125000 487000</gml:upperCorner>
    </gml:Envelope>
  </gml:boundedBy>
  <gml:featureMember>
    <ogr:buffer fid="buffer.0">
      <ogr:geometryProperty>
        <gml:Polygon srsName="EPSG:28992">
          <gml:outerBoundaryIs><gml:LinearRing>
            <gml:coordinates>120000,480000 125000,480000 125000,487000 120000,480000</gml:coordinates>
          </gml:LinearRing></gml:outerBoundaryIs>
        </gml:Polygon>
      </ogr:geometryProperty>
    </ogr:buffer>
  </gml:featureMember>
</wfs:FeatureCollection>"#
}

/// GML with coordinates but no recognisable geometry element or CRS
pub fn untyped_gml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs" xmlns:gml="http://www.opengis.net/gml">
  <gml:featureMember>
    <ogr:result fid="result.0">
      <ogr:geometryProperty>
        <gml:Geometry><gml:coordinates>4.5,52.0 5.0,52.3</gml:coordinates></gml:Geometry>
      </ogr:geometryProperty>
    </ogr:result>
  </gml:featureMember>
</wfs:FeatureCollection>"#
}

/// Publication settings rooted in a temporary directory
pub fn publish_settings(root: &Path) -> PublishSettings {
    PublishSettings {
        shape_path: root.join("data"),
        epsg: "4326".to_string(),
        other_projs: vec!["3857".to_string()],
        map_server_url: "http://maps.example.org/cgi-bin/mapserv".to_string(),
        map_files_path: root.join("maps"),
        ..Default::default()
    }
}

/// Client context backed by `transport`, storing artifacts under `root`
pub fn context(transport: Arc<MockTransport>, root: &Path) -> ClientContext {
    ClientContext::new(
        transport,
        Arc::new(FileInspector::new()),
        ArtifactStore::new(root.join("data")),
        publish_settings(root),
    )
}
