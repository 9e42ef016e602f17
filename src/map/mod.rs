//! Map publication
//!
//! After a job finishes, every complex output with usable dataset
//! information becomes one layer of a [`MapDescriptor`]. A [`MapPublisher`]
//! turns the descriptor into whatever the map server reads; the bundled one
//! writes a MapServer mapfile.

mod mapfile;

use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::{BoundingBox, DatasetKind, GeometryKind, ValueRange};
use crate::job::OutputTitles;
use crate::output::{OutputWarning, ResultSet};
use crate::state::now_utc;

pub use mapfile::MapfilePublisher;

/// Logged for each complex output left out of the map
pub const WARN_UNKNOWN_COMPLEX_TYPE: &str = "Warning: couldn't determine the type of Complex output ";

/// Publication errors
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to write map file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("map file directory is not configured")]
    MissingMapFilesPath,
}

/// Map server settings, from the `[mapserver]` and `[data]` config sections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishSettings {
    /// Directory holding the layer data files
    pub shape_path: PathBuf,
    /// Primary EPSG code of the published map
    pub epsg: String,
    /// Extra EPSG codes advertised by the OGC services
    pub other_projs: Vec<String>,
    /// MapServer template file
    pub map_template: Option<String>,
    pub image_path: Option<String>,
    pub image_url: Option<String>,
    /// Base URL of the MapServer CGI
    pub map_server_url: String,
    /// Directory the mapfile is written to
    pub map_files_path: PathBuf,
}

impl PublishSettings {
    /// Where the mapfile of `process_id` is written
    pub fn map_file_path(&self, process_id: &str) -> PathBuf {
        self.map_files_path.join(format!("{}.map", process_id))
    }
}

/// RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Drawing style of a vector layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapStyle {
    pub color: Rgb,
    pub outline_color: Rgb,
    pub width: f64,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            color: Rgb(0, 153, 255),
            outline_color: Rgb(0, 0, 0),
            width: 1.0,
        }
    }
}

/// Raster or vector specifics of a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerKind {
    Vector {
        geometry: GeometryKind,
        styles: Vec<MapStyle>,
    },
    Raster {
        /// Scaling bounds for display
        value_range: Option<ValueRange>,
    },
}

/// One published output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLayer {
    pub name: String,
    pub title: String,
    pub source_path: PathBuf,
    pub bbox: BoundingBox,
    pub epsg: String,
    pub kind: LayerKind,
}

/// Everything needed to publish the outputs of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDescriptor {
    pub process_id: String,
    pub created_at: DateTime<Utc>,
    /// Map-level EPSG code
    pub epsg: String,
    pub layers: Vec<MapLayer>,
}

impl MapDescriptor {
    /// Union of the layer extents
    pub fn extent(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(
            self.layers
                .iter()
                .flat_map(|l| [(l.bbox.min_x, l.bbox.min_y), (l.bbox.max_x, l.bbox.max_y)]),
        )
    }
}

/// Map publication capability
pub trait MapPublisher: Send + Sync {
    /// Persist the descriptor and return the path written.
    fn publish(
        &self,
        descriptor: &MapDescriptor,
        settings: &PublishSettings,
    ) -> Result<PathBuf, PublishError>;
}

/// Builds a [`MapDescriptor`] from a finished job's results.
pub struct MapAssembler<'a> {
    settings: &'a PublishSettings,
}

impl<'a> MapAssembler<'a> {
    pub fn new(settings: &'a PublishSettings) -> Self {
        Self { settings }
    }

    /// One layer per materialized, inspected complex output.
    ///
    /// Outputs without dataset information are left out and reported.
    pub fn assemble(
        &self,
        process_id: &str,
        results: &ResultSet,
        titles: &OutputTitles,
    ) -> (MapDescriptor, Vec<OutputWarning>) {
        let mut layers = Vec::new();
        let mut warnings = Vec::new();

        for output in results.complex() {
            let (Some(path), Some(info)) = (&output.local_path, &output.dataset) else {
                tracing::warn!("{}{}", WARN_UNKNOWN_COMPLEX_TYPE, output.name);
                warnings.push(OutputWarning::DatasetInspectionFailed {
                    output: output.name.clone(),
                });
                continue;
            };

            let kind = match &info.kind {
                DatasetKind::Vector { geometry } => {
                    let geometry = geometry.unwrap_or(GeometryKind::Polygon);
                    tracing::debug!(layer = %output.name, geometry = %geometry, "The layer type");
                    LayerKind::Vector {
                        geometry,
                        styles: vec![MapStyle::default()],
                    }
                }
                DatasetKind::Raster { value_range } => LayerKind::Raster {
                    value_range: *value_range,
                },
            };

            layers.push(MapLayer {
                name: output.name.clone(),
                title: titles.title_for(&output.name).to_string(),
                source_path: path.clone(),
                bbox: info.bbox,
                epsg: info.epsg.clone().unwrap_or_else(|| self.settings.epsg.clone()),
                kind,
            });
        }

        let descriptor = MapDescriptor {
            process_id: process_id.to_string(),
            created_at: now_utc(),
            epsg: self.settings.epsg.clone(),
            layers,
        };
        (descriptor, warnings)
    }
}
