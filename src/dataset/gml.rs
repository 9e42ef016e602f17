//! GML vector inspection
//!
//! Text sniffing rather than a GML parser: the first geometry element gives
//! the geometry kind, the first `srsName` gives the EPSG code, and the extent
//! comes from the declared envelope or, failing that, from every coordinate
//! in the document.

use std::path::Path;

use regex_lite::Regex;

use super::{BoundingBox, DatasetInfo, DatasetKind, GeometryKind, SpatialDataset};

const GEOMETRY_PATTERN: &str = r"<(?:[A-Za-z0-9_]+:)?(MultiPoint|Point|MultiLineString|LineString|MultiCurve|Curve|MultiPolygon|Polygon|MultiSurface|Surface)[\s>/]";
const SRS_PATTERN: &str = r#"srsName="[^"]*[Ee][Pp][Ss][Gg][^"]*?(\d+)""#;
const ENVELOPE_PATTERN: &str = r"(?s)<(?:[A-Za-z0-9_]+:)?lowerCorner>([^<]+)</(?:[A-Za-z0-9_]+:)?lowerCorner>\s*<(?:[A-Za-z0-9_]+:)?upperCorner>([^<]+)</";
const COORDINATES_PATTERN: &str = r"<(?:[A-Za-z0-9_]+:)?(coordinates|pos|posList)(?:\s[^>]*)?>([^<]+)</";

/// Vector dataset inspector for GML documents
#[derive(Debug, Clone)]
pub struct GmlInspector {
    geometry: Regex,
    srs: Regex,
    envelope: Regex,
    coordinates: Regex,
}

impl GmlInspector {
    pub fn new() -> Self {
        Self {
            geometry: Regex::new(GEOMETRY_PATTERN).expect("geometry pattern is valid"),
            srs: Regex::new(SRS_PATTERN).expect("srs pattern is valid"),
            envelope: Regex::new(ENVELOPE_PATTERN).expect("envelope pattern is valid"),
            coordinates: Regex::new(COORDINATES_PATTERN).expect("coordinates pattern is valid"),
        }
    }

    /// Inspect GML text; `None` unless the text holds at least one coordinate.
    pub fn inspect_text(&self, text: &str) -> Option<DatasetInfo> {
        let text = text.trim_start_matches('\u{feff}');
        if !text.trim_start().starts_with('<') {
            return None;
        }

        let bbox = self.envelope(text).or_else(|| self.extent(text))?;
        let geometry = self
            .geometry
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| GeometryKind::from_type_name(m.as_str()));
        let epsg = self
            .srs
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        Some(DatasetInfo {
            kind: DatasetKind::Vector { geometry },
            epsg,
            bbox,
        })
    }

    fn envelope(&self, text: &str) -> Option<BoundingBox> {
        let caps = self.envelope.captures(text)?;
        let lower = parse_numbers(caps.get(1)?.as_str());
        let upper = parse_numbers(caps.get(2)?.as_str());
        match (lower.as_slice(), upper.as_slice()) {
            ([x1, y1, ..], [x2, y2, ..]) => {
                BoundingBox::from_points(vec![(*x1, *y1), (*x2, *y2)])
            }
            _ => None,
        }
    }

    fn extent(&self, text: &str) -> Option<BoundingBox> {
        let mut points = Vec::new();
        for caps in self.coordinates.captures_iter(text) {
            let (Some(element), Some(body)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            if element.as_str() == "coordinates" {
                // GML 2: "x,y x,y ..."
                for tuple in body.as_str().split_whitespace() {
                    let values = parse_numbers(&tuple.replace(',', " "));
                    if let [x, y, ..] = values.as_slice() {
                        points.push((*x, *y));
                    }
                }
            } else {
                // GML 3: "x y x y ...", two dimensions assumed
                let values = parse_numbers(body.as_str());
                points.extend(values.chunks_exact(2).map(|pair| (pair[0], pair[1])));
            }
        }
        BoundingBox::from_points(points)
    }
}

impl Default for GmlInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialDataset for GmlInspector {
    fn inspect(&self, path: &Path) -> Option<DatasetInfo> {
        let text = std::fs::read_to_string(path).ok()?;
        self.inspect_text(&text)
    }
}

fn parse_numbers(text: &str) -> Vec<f64> {
    text.split_whitespace()
        .filter_map(|v| v.parse::<f64>().ok())
        .collect()
}
