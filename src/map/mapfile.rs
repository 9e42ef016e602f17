//! MapServer mapfile rendering

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use super::{LayerKind, MapDescriptor, MapLayer, MapPublisher, MapStyle, PublishError, PublishSettings};
use crate::dataset::GeometryKind;

/// Extent used when the map has no layers
const WORLD_EXTENT: &str = "-180 -90 180 90";

/// Writes a MapServer mapfile exposing every layer over WMS, WFS and WCS.
#[derive(Debug, Clone, Default)]
pub struct MapfilePublisher;

impl MapfilePublisher {
    pub fn new() -> Self {
        Self
    }

    /// Mapfile text for `descriptor`
    pub fn render(&self, descriptor: &MapDescriptor, settings: &PublishSettings) -> String {
        let mut out = String::with_capacity(4096);
        // Writing into a String cannot fail.
        let _ = write_map(&mut out, descriptor, settings);
        out
    }
}

impl MapPublisher for MapfilePublisher {
    fn publish(
        &self,
        descriptor: &MapDescriptor,
        settings: &PublishSettings,
    ) -> Result<PathBuf, PublishError> {
        if settings.map_files_path.as_os_str().is_empty() {
            return Err(PublishError::MissingMapFilesPath);
        }
        let path = settings.map_file_path(&descriptor.process_id);
        let text = self.render(descriptor, settings);

        let io_err = |source| PublishError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&settings.map_files_path).map_err(io_err)?;

        let temp_path = path.with_extension("map.tmp");
        fs::write(&temp_path, text).map_err(io_err)?;
        fs::rename(&temp_path, &path).map_err(io_err)?;

        tracing::info!(path = %path.display(), layers = descriptor.layers.len(), "Wrote map file to disk");
        Ok(path)
    }
}

fn write_map(out: &mut String, map: &MapDescriptor, settings: &PublishSettings) -> std::fmt::Result {
    let map_file = settings.map_file_path(&map.process_id);
    let online_resource = format!(
        "{}?map={}&",
        settings.map_server_url,
        map_file.display()
    );
    let srs = srs_list(&map.epsg, &settings.other_projs);
    let extent = map
        .extent()
        .map(|b| b.to_string())
        .unwrap_or_else(|| WORLD_EXTENT.to_string());

    writeln!(out, "MAP")?;
    writeln!(out, "  NAME \"{}\"", quote(&map.process_id))?;
    writeln!(out, "  STATUS ON")?;
    writeln!(out, "  SIZE 800 600")?;
    writeln!(out, "  EXTENT {}", extent)?;
    writeln!(out, "  UNITS METERS")?;
    writeln!(out, "  IMAGECOLOR 255 255 255")?;
    if !settings.shape_path.as_os_str().is_empty() {
        writeln!(out, "  SHAPEPATH \"{}\"", quote_path(&settings.shape_path))?;
    }
    write_projection(out, "  ", &map.epsg)?;

    writeln!(out)?;
    writeln!(out, "  WEB")?;
    if let Some(template) = &settings.map_template {
        writeln!(out, "    TEMPLATE \"{}\"", quote(template))?;
    }
    if let Some(image_path) = &settings.image_path {
        writeln!(out, "    IMAGEPATH \"{}\"", quote(image_path))?;
    }
    if let Some(image_url) = &settings.image_url {
        writeln!(out, "    IMAGEURL \"{}\"", quote(image_url))?;
    }
    writeln!(out, "    METADATA")?;
    for service in ["wms", "wfs", "wcs"] {
        let title_key = if service == "wcs" { "label" } else { "title" };
        writeln!(out, "      \"{}_{}\" \"{}\"", service, title_key, quote(&map.process_id))?;
        writeln!(out, "      \"{}_onlineresource\" \"{}\"", service, quote(&online_resource))?;
        writeln!(out, "      \"{}_srs\" \"{}\"", service, srs)?;
    }
    writeln!(out, "      \"ows_enable_request\" \"*\"")?;
    writeln!(out, "    END")?;
    writeln!(out, "  END")?;

    for layer in &map.layers {
        writeln!(out)?;
        write_layer(out, layer)?;
    }

    writeln!(out, "END")
}

fn write_layer(out: &mut String, layer: &MapLayer) -> std::fmt::Result {
    writeln!(out, "  LAYER")?;
    writeln!(out, "    NAME \"{}\"", quote(&layer.name))?;
    writeln!(out, "    STATUS OFF")?;
    match &layer.kind {
        LayerKind::Vector { geometry, .. } => {
            writeln!(out, "    TYPE {}", layer_type(*geometry))?;
            writeln!(out, "    CONNECTIONTYPE OGR")?;
            writeln!(out, "    CONNECTION \"{}\"", quote_path(&layer.source_path))?;
        }
        LayerKind::Raster { value_range } => {
            writeln!(out, "    TYPE RASTER")?;
            writeln!(out, "    DATA \"{}\"", quote_path(&layer.source_path))?;
            if let Some(range) = value_range {
                writeln!(out, "    PROCESSING \"SCALE={},{}\"", range.min, range.max)?;
            }
        }
    }
    writeln!(out, "    EXTENT {}", layer.bbox)?;
    write_projection(out, "    ", &layer.epsg)?;

    writeln!(out, "    METADATA")?;
    match &layer.kind {
        LayerKind::Vector { .. } => {
            writeln!(out, "      \"wms_title\" \"{}\"", quote(&layer.title))?;
            writeln!(out, "      \"wfs_title\" \"{}\"", quote(&layer.title))?;
            writeln!(out, "      \"gml_include_items\" \"all\"")?;
        }
        LayerKind::Raster { .. } => {
            writeln!(out, "      \"wms_title\" \"{}\"", quote(&layer.title))?;
            writeln!(out, "      \"wcs_label\" \"{}\"", quote(&layer.title))?;
            writeln!(out, "      \"wcs_rangeset_name\" \"{}\"", quote(&layer.name))?;
        }
    }
    writeln!(out, "    END")?;

    if let LayerKind::Vector { styles, .. } = &layer.kind {
        writeln!(out, "    CLASS")?;
        for style in styles {
            write_style(out, style)?;
        }
        writeln!(out, "    END")?;
    }

    writeln!(out, "  END")
}

fn write_style(out: &mut String, style: &MapStyle) -> std::fmt::Result {
    let (c, o) = (style.color, style.outline_color);
    writeln!(out, "      STYLE")?;
    writeln!(out, "        COLOR {} {} {}", c.0, c.1, c.2)?;
    writeln!(out, "        OUTLINECOLOR {} {} {}", o.0, o.1, o.2)?;
    writeln!(out, "        WIDTH {}", style.width)?;
    writeln!(out, "      END")
}

fn write_projection(out: &mut String, indent: &str, epsg: &str) -> std::fmt::Result {
    writeln!(out, "{}PROJECTION", indent)?;
    writeln!(out, "{}  \"init=epsg:{}\"", indent, epsg)?;
    writeln!(out, "{}END", indent)
}

fn layer_type(geometry: GeometryKind) -> &'static str {
    match geometry {
        GeometryKind::Point => "POINT",
        GeometryKind::Line => "LINE",
        GeometryKind::Polygon => "POLYGON",
    }
}

/// `EPSG:<primary>` followed by the extra projections, without duplicates.
fn srs_list(epsg: &str, other_projs: &[String]) -> String {
    let mut codes: Vec<String> = vec![format!("EPSG:{}", strip_epsg(epsg))];
    for code in other_projs {
        let code = format!("EPSG:{}", strip_epsg(code));
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes.join(" ")
}

fn strip_epsg(code: &str) -> &str {
    let code = code.trim();
    code.strip_prefix("EPSG:")
        .or_else(|| code.strip_prefix("epsg:"))
        .unwrap_or(code)
}

fn quote(text: &str) -> String {
    text.replace('"', "\\\"")
}

fn quote_path(path: &Path) -> String {
    quote(&path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{BoundingBox, ValueRange};
    use crate::state::now_utc;

    fn descriptor() -> MapDescriptor {
        MapDescriptor {
            process_id: "pywps-42".to_string(),
            created_at: now_utc(),
            epsg: "3035".to_string(),
            layers: vec![
                MapLayer {
                    name: "buffer".to_string(),
                    title: "Buffered lines".to_string(),
                    source_path: PathBuf::from("/srv/gml/buffer-pywps-42.gml"),
                    bbox: BoundingBox { min_x: 0.0, min_y: 0.0, max_x: 10.0, max_y: 10.0 },
                    epsg: "3035".to_string(),
                    kind: LayerKind::Vector {
                        geometry: GeometryKind::Line,
                        styles: vec![MapStyle::default()],
                    },
                },
                MapLayer {
                    name: "slope".to_string(),
                    title: "Slope".to_string(),
                    source_path: PathBuf::from("/srv/gml/slope-pywps-42.tif"),
                    bbox: BoundingBox { min_x: 5.0, min_y: 5.0, max_x: 20.0, max_y: 20.0 },
                    epsg: "4326".to_string(),
                    kind: LayerKind::Raster {
                        value_range: Some(ValueRange { min: 0.0, max: 90.0 }),
                    },
                },
            ],
        }
    }

    fn settings(dir: &Path) -> PublishSettings {
        PublishSettings {
            shape_path: PathBuf::from("/srv/gml"),
            epsg: "3035".to_string(),
            other_projs: vec!["EPSG:4326".to_string(), "3035".to_string()],
            map_template: Some("/srv/templates/map.html".to_string()),
            image_path: Some("/tmp/ms_tmp/".to_string()),
            image_url: None,
            map_server_url: "http://host/cgi-bin/mapserv".to_string(),
            map_files_path: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_render_layers() {
        let text = MapfilePublisher::new().render(&descriptor(), &settings(Path::new("/srv/maps")));
        assert!(text.starts_with("MAP\n"));
        assert!(text.trim_end().ends_with("END"));
        assert!(text.contains("NAME \"pywps-42\""));
        assert!(text.contains("EXTENT 0 0 20 20"));
        assert!(text.contains("TYPE LINE"));
        assert!(text.contains("CONNECTION \"/srv/gml/buffer-pywps-42.gml\""));
        assert!(text.contains("TYPE RASTER"));
        assert!(text.contains("PROCESSING \"SCALE=0,90\""));
        assert!(text.contains("\"init=epsg:4326\""));
        assert!(text.contains("\"wms_title\" \"Buffered lines\""));
        assert!(text.contains("TEMPLATE \"/srv/templates/map.html\""));
        assert!(!text.contains("IMAGEURL"));
        assert!(text.contains("map=/srv/maps/pywps-42.map&"));
    }

    #[test]
    fn test_srs_list_deduplicates() {
        assert_eq!(
            srs_list("3035", &["EPSG:4326".to_string(), "3035".to_string()]),
            "EPSG:3035 EPSG:4326"
        );
    }

    #[test]
    fn test_empty_map_uses_world_extent() {
        let mut map = descriptor();
        map.layers.clear();
        let text = MapfilePublisher::new().render(&map, &settings(Path::new("/srv/maps")));
        assert!(text.contains(&format!("EXTENT {}", WORLD_EXTENT)));
        assert!(!text.contains("LAYER"));
    }

    #[test]
    fn test_publish_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let maps = dir.path().join("maps");
        let path = MapfilePublisher::new()
            .publish(&descriptor(), &settings(&maps))
            .unwrap();
        assert_eq!(path, maps.join("pywps-42.map"));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("LAYER"));
        assert!(!maps.join("pywps-42.map.tmp").exists());
    }

    #[test]
    fn test_publish_requires_directory() {
        let mut settings = settings(Path::new(""));
        settings.map_files_path = PathBuf::new();
        assert!(matches!(
            MapfilePublisher::new().publish(&descriptor(), &settings),
            Err(PublishError::MissingMapFilesPath)
        ));
    }
}
