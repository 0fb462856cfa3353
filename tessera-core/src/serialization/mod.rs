//! Interchange format: saving and loading projects
//!
//! A project is stored as one JSON document holding every presentation with
//! its metadata, data providers, media data, channels and node tree. Each
//! entity is a [`Record`](record::Record) tagged with its qualified name;
//! cross references are plain id strings.
//!
//! Provider payloads live in each presentation's data directory, which the
//! document names relative to its own location. Small payloads can instead
//! be embedded in the document as base64 (see [`SaveSettings`]); they are
//! written back into the data directory on load.
//!
//! Loading is two-phase. Phase one constructs every entity through the
//! [`FactoryRegistry`] and registers it under its declared id; phase two
//! links cross references by id, so entities may refer to others declared
//! later in the document. A failed load exposes nothing and removes the
//! payload files it materialised.

pub(crate) mod reader;
pub mod record;
pub(crate) mod writer;

use crate::error::{Error, Result};
use crate::factory::FactoryRegistry;
use crate::file_types::MediaKind;
use crate::ids::{DataProviderId, PresentationId};
use crate::progress::ProgressNotifier;
use crate::project::Project;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use record::Record;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Value of the document's `format` attribute
pub const FORMAT_NAME: &str = "tessera";

/// Version written into new documents
pub const FORMAT_VERSION: &str = "1.0";

/// Settings for saving a project
#[derive(Debug, Clone)]
pub struct SaveSettings {
    /// Indent the JSON document
    pub pretty: bool,

    /// Embed provider payloads smaller than this size (in bytes)
    pub auto_embed_threshold_bytes: u64,

    /// Force embedding every payload
    pub force_embed_all: bool,

    /// Force linking every payload (don't embed any)
    pub force_link_all: bool,
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            pretty: true,
            auto_embed_threshold_bytes: 0,
            force_embed_all: false,
            force_link_all: false,
        }
    }
}

/// Settings for loading a project
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Abort on unknown mandatory kinds and dangling references
    pub strict: bool,

    /// Data directory to use for every presentation instead of the one
    /// named in the document
    pub data_dir: Option<PathBuf>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            strict: true,
            data_dir: None,
        }
    }
}

/// Result of loading a project
#[derive(Debug)]
pub struct LoadedProject {
    pub project: Project,

    /// Entities skipped or references dropped while loading
    pub warnings: Vec<String>,

    /// Linked payload files that couldn't be found
    pub missing_files: Vec<MissingFileInfo>,
}

/// Information about a missing payload file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFileInfo {
    pub presentation: PresentationId,
    pub provider: DataProviderId,

    /// Where the file was expected
    pub path: PathBuf,

    pub mime_type: String,

    /// Kind of media the payload holds, if the mime type tells
    pub media_kind: Option<MediaKind>,
}

/// Where a provider's bytes come from in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSource {
    /// File name inside the presentation's data directory
    Linked(String),
    /// Payload carried inline
    Embedded(Vec<u8>),
}

/// A data provider as read from a document, before it is registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataProviderDraft {
    pub id: DataProviderId,
    pub mime_type: String,
    pub source: ProviderSource,
}

impl DataProviderDraft {
    pub(crate) fn from_record(record: &Record) -> Result<Self> {
        let source = match (record.opt_str("path")?, record.opt_str("data")?) {
            (Some(path), None) => ProviderSource::Linked(path.to_string()),
            (None, Some(data)) => ProviderSource::Embedded(STANDARD.decode(data)?),
            _ => {
                return Err(Error::structural(format!(
                    "{} needs exactly one of \"path\" and \"data\"",
                    record.describe()
                )))
            }
        };
        Ok(Self {
            id: record.get("id")?,
            mime_type: record.str("mimeType")?.to_string(),
            source,
        })
    }
}

fn document_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Serialize a project to JSON text
///
/// Data directories are written relative to `document_dir`, the directory
/// the document will live in.
pub fn project_to_string(project: &Project, document_dir: &Path, settings: &SaveSettings) -> Result<String> {
    let created = chrono::Utc::now().to_rfc3339();
    let document = writer::write_project(project, document_dir, settings, &created)?;
    let text = if settings.pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };
    Ok(text)
}

/// Reconstruct a project from JSON text
///
/// Relative data directories in the document resolve against `document_dir`.
pub fn project_from_str(
    text: &str,
    document_dir: &Path,
    options: &LoadOptions,
    registry: &FactoryRegistry,
    progress: &mut ProgressNotifier,
) -> Result<LoadedProject> {
    let document: serde_json::Value = serde_json::from_str(text)?;
    reader::read_project(document, document_dir, options, registry, progress)
}

/// Save a project to `path`
///
/// The document is written next to its destination first and moved into
/// place, so a failed save leaves any previous file intact. On success every
/// presentation is marked clean.
pub fn save_project(project: &Project, path: &Path, settings: &SaveSettings) -> Result<()> {
    let start = Instant::now();
    let dir = document_dir(path);
    let created = writer::previous_created(path).unwrap_or_else(|| chrono::Utc::now().to_rfc3339());
    let document = writer::write_project(project, dir, settings, &created)?;
    let text = if settings.pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };

    let temp_path = path.with_extension("tessera.tmp");
    fs::write(&temp_path, text)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    for presentation in project.iter() {
        presentation.mark_clean();
    }
    log::debug!(
        "Saved {} presentation(s) to {} in {:.2}ms",
        project.len(),
        path.display(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

/// Load a project from `path`
pub fn load_project(
    path: &Path,
    options: &LoadOptions,
    registry: &FactoryRegistry,
    progress: &mut ProgressNotifier,
) -> Result<LoadedProject> {
    let start = Instant::now();
    let text = fs::read_to_string(path)?;
    let loaded = project_from_str(&text, document_dir(path), options, registry, progress)?;
    log::debug!(
        "Loaded {} presentation(s) from {} in {:.2}ms ({} warning(s), {} missing file(s))",
        loaded.project.len(),
        path.display(),
        start.elapsed().as_secs_f64() * 1000.0,
        loaded.warnings.len(),
        loaded.missing_files.len()
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_draft_sources() {
        let linked = Record::from_value(json!({
            "type": "FileDataProvider", "id": "dp1", "mimeType": "audio/x-wav", "path": "dp1.wav"
        }))
        .unwrap();
        let draft = DataProviderDraft::from_record(&linked).unwrap();
        assert_eq!(draft.source, ProviderSource::Linked("dp1.wav".to_string()));

        let embedded = Record::from_value(json!({
            "type": "FileDataProvider", "id": "dp2", "mimeType": "text/plain", "data": "aGVsbG8="
        }))
        .unwrap();
        let draft = DataProviderDraft::from_record(&embedded).unwrap();
        assert_eq!(draft.source, ProviderSource::Embedded(b"hello".to_vec()));

        let neither = Record::from_value(json!({
            "type": "FileDataProvider", "id": "dp3", "mimeType": "text/plain"
        }))
        .unwrap();
        assert!(matches!(DataProviderDraft::from_record(&neither), Err(Error::Structural(_))));

        let garbled = Record::from_value(json!({
            "type": "FileDataProvider", "id": "dp4", "mimeType": "text/plain", "data": "***"
        }))
        .unwrap();
        assert!(matches!(DataProviderDraft::from_record(&garbled), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_document_dir_of_bare_file_name() {
        assert_eq!(document_dir(Path::new("book.tessera")), Path::new("."));
        assert_eq!(document_dir(Path::new("/tmp/x/book.tessera")), Path::new("/tmp/x"));
    }
}
