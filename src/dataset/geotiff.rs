//! GeoTIFF raster inspection
//!
//! Reads the first image directory of a classic (non-Big) TIFF and picks out
//! the georeferencing tags. Pixel data is never decoded; the value range is
//! taken from the GDAL statistics metadata when the writer stored it.

use std::path::Path;

use super::{BoundingBox, DatasetInfo, DatasetKind, SpatialDataset, ValueRange};

const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_METADATA: u16 = 42112;

const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;
const KEY_USER_DEFINED: u16 = 32767;

const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_DOUBLE: u16 = 12;

/// Whether `data` starts with a classic TIFF header
pub(crate) fn is_tiff(data: &[u8]) -> bool {
    data.starts_with(b"II*\0") || data.starts_with(b"MM\0*")
}

/// Raster dataset inspector for GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffInspector;

impl GeoTiffInspector {
    pub fn new() -> Self {
        Self
    }

    /// Inspect an in-memory TIFF; `None` unless it is georeferenced.
    pub fn inspect_bytes(&self, data: &[u8]) -> Option<DatasetInfo> {
        if !is_tiff(data) {
            return None;
        }
        let tiff = Tiff {
            data,
            big_endian: data[0] == b'M',
        };
        let entries = tiff.first_directory()?;
        let find = |tag: u16| entries.iter().find(|e| e.tag == tag);

        let width = tiff.integers(find(TAG_IMAGE_WIDTH)?)?.first().copied()?;
        let height = tiff.integers(find(TAG_IMAGE_LENGTH)?)?.first().copied()?;
        let scale = tiff.doubles(find(TAG_MODEL_PIXEL_SCALE)?)?;
        let tiepoint = tiff.doubles(find(TAG_MODEL_TIEPOINT)?)?;
        let bbox = bounds(width, height, &scale, &tiepoint)?;

        let epsg = find(TAG_GEO_KEY_DIRECTORY)
            .and_then(|e| tiff.integers(e))
            .and_then(|keys| epsg_from_geo_keys(&keys));
        let value_range = find(TAG_GDAL_METADATA)
            .and_then(|e| tiff.ascii(e))
            .and_then(|xml| statistics_range(&xml));

        Some(DatasetInfo {
            kind: DatasetKind::Raster { value_range },
            epsg,
            bbox,
        })
    }
}

impl SpatialDataset for GeoTiffInspector {
    fn inspect(&self, path: &Path) -> Option<DatasetInfo> {
        let data = std::fs::read(path).ok()?;
        self.inspect_bytes(&data)
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    tag: u16,
    field_type: u16,
    count: u32,
    /// Offset of the 4-byte value/offset field
    value_at: usize,
}

struct Tiff<'a> {
    data: &'a [u8],
    big_endian: bool,
}

impl Tiff<'_> {
    fn bytes<const N: usize>(&self, at: usize) -> Option<[u8; N]> {
        self.data.get(at..at.checked_add(N)?)?.try_into().ok()
    }

    fn u16_at(&self, at: usize) -> Option<u16> {
        let b = self.bytes::<2>(at)?;
        Some(if self.big_endian { u16::from_be_bytes(b) } else { u16::from_le_bytes(b) })
    }

    fn u32_at(&self, at: usize) -> Option<u32> {
        let b = self.bytes::<4>(at)?;
        Some(if self.big_endian { u32::from_be_bytes(b) } else { u32::from_le_bytes(b) })
    }

    fn f64_at(&self, at: usize) -> Option<f64> {
        let b = self.bytes::<8>(at)?;
        Some(if self.big_endian { f64::from_be_bytes(b) } else { f64::from_le_bytes(b) })
    }

    fn first_directory(&self) -> Option<Vec<Entry>> {
        let ifd = self.u32_at(4)? as usize;
        let count = self.u16_at(ifd)? as usize;
        (0..count)
            .map(|i| {
                let at = ifd + 2 + i * 12;
                Some(Entry {
                    tag: self.u16_at(at)?,
                    field_type: self.u16_at(at + 2)?,
                    count: self.u32_at(at + 4)?,
                    value_at: at + 8,
                })
            })
            .collect()
    }

    /// Where an entry's values start: inline when they fit in four bytes.
    fn values_at(&self, entry: &Entry, unit: usize) -> Option<usize> {
        let size = unit.checked_mul(entry.count as usize)?;
        if size <= 4 {
            Some(entry.value_at)
        } else {
            Some(self.u32_at(entry.value_at)? as usize)
        }
    }

    fn integers(&self, entry: &Entry) -> Option<Vec<u32>> {
        match entry.field_type {
            TYPE_SHORT => {
                let start = self.values_at(entry, 2)?;
                (0..entry.count as usize)
                    .map(|i| self.u16_at(start + i * 2).map(u32::from))
                    .collect()
            }
            TYPE_LONG => {
                let start = self.values_at(entry, 4)?;
                (0..entry.count as usize)
                    .map(|i| self.u32_at(start + i * 4))
                    .collect()
            }
            _ => None,
        }
    }

    fn doubles(&self, entry: &Entry) -> Option<Vec<f64>> {
        if entry.field_type != TYPE_DOUBLE {
            return None;
        }
        let start = self.values_at(entry, 8)?;
        (0..entry.count as usize)
            .map(|i| self.f64_at(start + i * 8))
            .collect()
    }

    fn ascii(&self, entry: &Entry) -> Option<String> {
        if entry.field_type != TYPE_ASCII {
            return None;
        }
        let start = self.values_at(entry, 1)?;
        let raw = self.data.get(start..start.checked_add(entry.count as usize)?)?;
        Some(String::from_utf8_lossy(raw).trim_end_matches('\0').to_string())
    }
}

/// Extent from the raster size, pixel scale and the first tie point.
fn bounds(width: u32, height: u32, scale: &[f64], tiepoint: &[f64]) -> Option<BoundingBox> {
    let (sx, sy) = (*scale.first()?, *scale.get(1)?);
    let (i, j, x, y) = (*tiepoint.first()?, *tiepoint.get(1)?, *tiepoint.get(3)?, *tiepoint.get(4)?);
    let min_x = x - i * sx;
    let max_y = y + j * sy;
    Some(BoundingBox {
        min_x,
        min_y: max_y - f64::from(height) * sy,
        max_x: min_x + f64::from(width) * sx,
        max_y,
    })
}

/// Projected CRS code when present, geographic otherwise.
fn epsg_from_geo_keys(keys: &[u32]) -> Option<String> {
    let count = *keys.get(3)? as usize;
    let mut geographic = None;
    let mut projected = None;
    for key in keys.get(4..)?.chunks_exact(4).take(count) {
        let (id, location, value) = (key[0], key[1], key[3]);
        if location != 0 || value == u32::from(KEY_USER_DEFINED) {
            continue;
        }
        match u16::try_from(id).ok()? {
            KEY_PROJECTED_CS_TYPE => projected = Some(value),
            KEY_GEOGRAPHIC_TYPE => geographic = Some(value),
            _ => {}
        }
    }
    projected.or(geographic).map(|code| code.to_string())
}

fn statistics_range(metadata: &str) -> Option<ValueRange> {
    let item = |name: &str| -> Option<f64> {
        let marker = format!("name=\"{}\"", name);
        let rest = &metadata[metadata.find(&marker)? + marker.len()..];
        let value = &rest[rest.find('>')? + 1..];
        value[..value.find('<')?].trim().parse().ok()
    };
    Some(ValueRange {
        min: item("STATISTICS_MINIMUM")?,
        max: item("STATISTICS_MAXIMUM")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Little-endian TIFF with only the tags the inspector reads.
    fn geotiff(metadata: Option<&str>) -> Vec<u8> {
        let mut entries: Vec<(u16, u16, u32, Vec<u8>)> = vec![
            (TAG_IMAGE_WIDTH, TYPE_SHORT, 1, 100u16.to_le_bytes().to_vec()),
            (TAG_IMAGE_LENGTH, TYPE_SHORT, 1, 50u16.to_le_bytes().to_vec()),
            (
                TAG_MODEL_PIXEL_SCALE,
                TYPE_DOUBLE,
                3,
                [10.0f64, 10.0, 0.0].iter().flat_map(|v| v.to_le_bytes()).collect(),
            ),
            (
                TAG_MODEL_TIEPOINT,
                TYPE_DOUBLE,
                6,
                [0.0f64, 0.0, 0.0, 1000.0, 5000.0, 0.0]
                    .iter()
                    .flat_map(|v| v.to_le_bytes())
                    .collect(),
            ),
            (
                TAG_GEO_KEY_DIRECTORY,
                TYPE_SHORT,
                12,
                [1u16, 1, 0, 2, 2048, 0, 1, 4326, 3072, 0, 1, 3035]
                    .iter()
                    .flat_map(|v| v.to_le_bytes())
                    .collect(),
            ),
        ];
        if let Some(xml) = metadata {
            let mut bytes = xml.as_bytes().to_vec();
            bytes.push(0);
            entries.push((TAG_GDAL_METADATA, TYPE_ASCII, bytes.len() as u32, bytes));
        }

        let ifd_offset = 8u32;
        let ifd_len = 2 + entries.len() * 12 + 4;
        let mut data = b"II*\0".to_vec();
        data.extend(ifd_offset.to_le_bytes());
        data.extend((entries.len() as u16).to_le_bytes());

        let mut extra: Vec<u8> = Vec::new();
        let extra_start = ifd_offset as usize + ifd_len;
        for (tag, field_type, count, value) in &entries {
            data.extend(tag.to_le_bytes());
            data.extend(field_type.to_le_bytes());
            data.extend(count.to_le_bytes());
            if value.len() <= 4 {
                let mut inline = value.clone();
                inline.resize(4, 0);
                data.extend(inline);
            } else {
                data.extend(((extra_start + extra.len()) as u32).to_le_bytes());
                extra.extend(value);
            }
        }
        data.extend(0u32.to_le_bytes());
        data.extend(extra);
        data
    }

    #[test]
    fn test_georeferenced_tiff() {
        let info = GeoTiffInspector::new().inspect_bytes(&geotiff(None)).unwrap();
        assert!(info.is_raster());
        assert_eq!(info.kind, DatasetKind::Raster { value_range: None });
        assert_eq!(info.epsg.as_deref(), Some("3035"));
        assert_eq!(
            info.bbox,
            BoundingBox { min_x: 1000.0, min_y: 4500.0, max_x: 2000.0, max_y: 5000.0 }
        );
    }

    #[test]
    fn test_value_range_from_gdal_metadata() {
        let xml = r#"<GDALMetadata><Item name="STATISTICS_MAXIMUM" sample="0">87.5</Item><Item name="STATISTICS_MINIMUM" sample="0">-3</Item></GDALMetadata>"#;
        let info = GeoTiffInspector::new().inspect_bytes(&geotiff(Some(xml))).unwrap();
        assert_eq!(
            info.kind,
            DatasetKind::Raster { value_range: Some(ValueRange { min: -3.0, max: 87.5 }) }
        );
    }

    #[test]
    fn test_truncated_tiff_is_rejected() {
        let data = geotiff(None);
        assert!(GeoTiffInspector::new().inspect_bytes(&data[..20]).is_none());
        assert!(GeoTiffInspector::new().inspect_bytes(b"GIF89a").is_none());
    }

    #[test]
    fn test_geo_keys_prefer_projected() {
        assert_eq!(
            epsg_from_geo_keys(&[1, 1, 0, 1, 2048, 0, 1, 4326]).as_deref(),
            Some("4326")
        );
        assert_eq!(
            epsg_from_geo_keys(&[1, 1, 0, 2, 2048, 0, 1, 4326, 3072, 0, 1, 32767]).as_deref(),
            Some("4326")
        );
        assert_eq!(epsg_from_geo_keys(&[1, 1]), None);
    }
}
