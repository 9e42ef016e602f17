//! Artifact store for complex outputs
//!
//! Complex outputs are copied into a local directory so they can be inspected
//! and served. Files are named `<output>-<process_id>.<ext>`, the extension
//! following the declared MIME type. Every write goes to a temporary sibling
//! first and is renamed into place, so a reader never sees a partial file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use wps_protocol::ComplexSource;

use crate::host::{Transport, TransportError};
use crate::output::ComplexOutput;

/// Artifact errors
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// File extension for a MIME type
pub fn extension_for(mime_type: Option<&str>) -> &'static str {
    let Some(mime) = mime_type.map(str::to_ascii_lowercase) else {
        return "dat";
    };
    if mime.contains("tiff") {
        "tif"
    } else if mime.contains("gml") {
        "gml"
    } else if mime.contains("png") {
        "png"
    } else if mime.contains("jpeg") {
        "jpg"
    } else if mime.contains("json") {
        "json"
    } else if mime.contains("xml") {
        "xml"
    } else if mime.starts_with("text/plain") {
        "txt"
    } else {
        "dat"
    }
}

/// Directory holding materialized artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the artifact of `output` for `process_id` is stored
    pub fn path_for(&self, output: &ComplexOutput, process_id: &str) -> PathBuf {
        let ext = extension_for(output.mime_type.as_deref());
        self.root
            .join(format!("{}-{}.{}", file_stem(&output.name), file_stem(process_id), ext))
    }

    /// Copy an output locally: fetch a reference or write the inline payload.
    pub fn materialize(
        &self,
        transport: &dyn Transport,
        output: &ComplexOutput,
        process_id: &str,
    ) -> Result<PathBuf, ArtifactError> {
        let bytes = match &output.source {
            ComplexSource::Reference(url) => {
                tracing::debug!(output = %output.name, url = %url, "Fetching artifact");
                transport.fetch(url).map_err(|source| ArtifactError::Fetch {
                    url: url.clone(),
                    source,
                })?
            }
            ComplexSource::Inline(payload) => payload.as_bytes().to_vec(),
        };

        let path = self.path_for(output, process_id);
        write_atomic(&path, &bytes)?;
        tracing::debug!(output = %output.name, path = %path.display(), bytes = bytes.len(), "Saved artifact");
        Ok(path)
    }
}

/// Write `bytes` to a temporary sibling and rename it onto `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    let io_err = |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        io_err(e)
    })
}

/// Keep a name usable as a path component.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
