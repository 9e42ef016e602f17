//! Spatial dataset inspection
//!
//! The client needs three facts about a downloaded artifact before it can be
//! published: whether it is raster or vector, its coordinate system and its
//! extent. Inspection never fails loudly; anything unreadable yields `None`
//! and the caller records a warning.

mod geotiff;
mod gml;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use geotiff::GeoTiffInspector;
pub use gml::GmlInspector;

/// Dataset inspection capability
pub trait SpatialDataset: Send + Sync {
    /// Inspect the file at `path`; `None` when it is not a recognised dataset.
    fn inspect(&self, path: &Path) -> Option<DatasetInfo>;
}

/// Geometry kind of a vector layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

impl GeometryKind {
    /// Map a geometry type name (`MultiLineString`, `gml:Polygon`, ...) to a kind.
    pub fn from_type_name(name: &str) -> Option<Self> {
        if name.contains("Point") {
            Some(GeometryKind::Point)
        } else if name.contains("Line") || name.contains("Curve") {
            Some(GeometryKind::Line)
        } else if name.contains("Polygon") || name.contains("Surface") {
            Some(GeometryKind::Polygon)
        } else {
            None
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryKind::Point => write!(f, "Point"),
            GeometryKind::Line => write!(f, "Line"),
            GeometryKind::Polygon => write!(f, "Polygon"),
        }
    }
}

/// Minimum and maximum cell value of a raster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

/// Axis-aligned extent in dataset coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Smallest box containing every point, `None` for no points.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut points = points.into_iter();
        let (x, y) = points.next()?;
        let mut bbox = BoundingBox {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        };
        for (x, y) in points {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        Some(bbox)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// Raster or vector, with the kind-specific detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatasetKind {
    Raster { value_range: Option<ValueRange> },
    Vector { geometry: Option<GeometryKind> },
}

/// What inspection learned about a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub kind: DatasetKind,
    /// EPSG code, without the `EPSG:` prefix
    pub epsg: Option<String>,
    pub bbox: BoundingBox,
}

impl DatasetInfo {
    pub fn is_raster(&self) -> bool {
        matches!(self.kind, DatasetKind::Raster { .. })
    }
}

/// Inspector that picks a format by sniffing the file header.
///
/// TIFF magic bytes go to the GeoTIFF reader, anything else is tried as GML.
#[derive(Debug, Clone, Default)]
pub struct FileInspector {
    gml: GmlInspector,
    tiff: GeoTiffInspector,
}

impl FileInspector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpatialDataset for FileInspector {
    fn inspect(&self, path: &Path) -> Option<DatasetInfo> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Error importing dataset");
                return None;
            }
        };

        let info = if geotiff::is_tiff(&data) {
            self.tiff.inspect_bytes(&data)
        } else {
            self.gml.inspect_text(&String::from_utf8_lossy(&data))
        };

        match &info {
            Some(info) => tracing::debug!(
                path = %path.display(),
                kind = ?info.kind,
                epsg = ?info.epsg,
                bbox = %info.bbox,
                "Read a data set"
            ),
            None => tracing::debug!(path = %path.display(), "Not a recognised data set"),
        }
        info
    }
}
