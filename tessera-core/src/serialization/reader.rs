//! Interchange document to project
//!
//! Phase one builds each presentation's tables and tree through the factory
//! registry; phase two links properties against those tables. Sweeps are
//! deferred until every presentation of the document has linked, and even
//! then only drop table entries: files a document declares stay on disk.

use super::record::Record;
use super::{DataProviderDraft, LoadOptions, LoadedProject, MissingFileInfo, ProviderSource, FORMAT_NAME};
use crate::data_provider::DataProvider;
use crate::error::{Error, Result};
use crate::factory::{Factory, FactoryRegistry};
use crate::file_types;
use crate::ids::{DataProviderId, MediaDataId, NodeId, PresentationId};
use crate::media_data::{MediaData, MediaDataKind};
use crate::presentation::Presentation;
use crate::progress::ProgressNotifier;
use crate::project::Project;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Build a media data from its record
pub(crate) fn media_data_from_record(local_name: &str, record: &Record) -> Result<MediaData> {
    let kind = match local_name {
        "AudioMediaData" => MediaDataKind::Audio(record.opt("pcmFormat")?.unwrap_or_default()),
        "VideoMediaData" => MediaDataKind::Video,
        "ImageMediaData" => MediaDataKind::Image,
        "BinaryMediaData" => MediaDataKind::Binary,
        other => {
            return Err(Error::structural(format!("{} is not a media data kind", other)));
        }
    };
    let id: MediaDataId = record.get("id")?;
    let providers: Vec<DataProviderId> = record.opt("providers")?.unwrap_or_default();
    let mut data = MediaData::new(id, record.str("mimeType")?, kind);
    for provider in providers {
        data.push_provider(provider);
    }
    Ok(data)
}

/// Bookkeeping shared by every presentation of one load
struct LoadState<'a> {
    options: &'a LoadOptions,
    registry: &'a FactoryRegistry,
    progress: &'a mut ProgressNotifier,
    completed: u64,
    total: u64,
    warnings: Vec<String>,
    missing_files: Vec<MissingFileInfo>,
    /// Payload files this load created, removed again if it fails
    written: Vec<PathBuf>,
}

impl LoadState<'_> {
    fn step(&mut self) -> Result<()> {
        self.completed += 1;
        self.progress.step("load", self.completed, self.total)
    }

    /// Construct an entity, applying the unknown-kind policy
    fn construct<T>(&mut self, factory: &Factory<T>, record: &Record) -> Result<Option<T>> {
        if let Some(entity) = factory.construct(record)? {
            return Ok(Some(entity));
        }
        let name = record.qualified_name()?;
        if self.options.strict && !record.is_optional() {
            return Err(Error::unsupported(&name));
        }
        log::warn!("Skipping {} of unknown kind {}", factory.kind(), name);
        self.warnings
            .push(format!("skipped {} of unknown kind {}", factory.kind(), name));
        Ok(None)
    }

    fn dangling(&mut self, what: String) -> Result<()> {
        if self.options.strict {
            return Err(Error::NotFound(what));
        }
        log::warn!("Dropping dangling reference: {}", what);
        self.warnings.push(format!("dropped dangling reference: {}", what));
        Ok(())
    }
}

fn check_header(document: &Value) -> Result<()> {
    let format = document.get("format").and_then(Value::as_str).unwrap_or_default();
    if format != FORMAT_NAME {
        return Err(Error::UnsupportedFormat(format!("document format {:?}", format)));
    }
    let version = document.get("version").and_then(Value::as_str).unwrap_or_default();
    if version.split('.').next() != Some("1") {
        return Err(Error::UnsupportedFormat(format!("document version {:?}", version)));
    }
    for key in ["created", "modified"] {
        if let Some(stamp) = document.get(key).and_then(Value::as_str) {
            if chrono::DateTime::parse_from_rfc3339(stamp).is_err() {
                log::warn!("Ignoring malformed {} timestamp {:?}", key, stamp);
            }
        }
    }
    Ok(())
}

fn count_work(presentations: &[Record]) -> Result<u64> {
    let mut total = 0u64;
    for record in presentations {
        total += record.records("dataProviders")?.len() as u64 + 1;
    }
    Ok(total)
}

pub(crate) fn read_project(
    document: Value,
    document_dir: &Path,
    options: &LoadOptions,
    registry: &FactoryRegistry,
    progress: &mut ProgressNotifier,
) -> Result<LoadedProject> {
    check_header(&document)?;
    let document = Record::from_value(document)?;
    let presentations = document.records("presentations")?;

    let mut state = LoadState {
        options,
        registry,
        progress,
        completed: 0,
        total: count_work(&presentations)?,
        warnings: Vec::new(),
        missing_files: Vec::new(),
        written: Vec::new(),
    };

    match read_presentations(&presentations, document_dir, &mut state) {
        Ok(project) => Ok(LoadedProject {
            project,
            warnings: state.warnings,
            missing_files: state.missing_files,
        }),
        Err(e) => {
            for path in &state.written {
                if let Err(remove) = fs::remove_file(path) {
                    log::warn!("Could not remove {} after failed load: {}", path.display(), remove);
                }
            }
            log::debug!("Load aborted, removed {} materialised payload(s): {}", state.written.len(), e);
            Err(e)
        }
    }
}

fn read_presentations(records: &[Record], document_dir: &Path, state: &mut LoadState<'_>) -> Result<Project> {
    state.progress.check()?;
    let mut loaded = Vec::with_capacity(records.len());
    for record in records {
        loaded.push(read_presentation(record, document_dir, state)?);
    }

    // Every presentation linked; only now may tables shrink
    let mut project = Project::new();
    let mut stale = Vec::new();
    for mut presentation in loaded {
        let (report, paths) = presentation.finish_load();
        if !report.is_empty() {
            state.warnings.push(format!(
                "presentation {} left {} media data and {} data provider(s) unreferenced",
                presentation.id(),
                report.media_data.len(),
                report.data_providers.len()
            ));
        }
        stale.extend(paths.into_iter().filter(|path| state.written.contains(path)));
        project.add_presentation(presentation)?;
    }

    // Payloads this load materialised for providers nothing uses
    for path in stale {
        if let Err(e) = fs::remove_file(&path) {
            log::warn!("Could not remove unused payload {}: {}", path.display(), e);
        }
    }
    Ok(project)
}

fn read_presentation(record: &Record, document_dir: &Path, state: &mut LoadState<'_>) -> Result<Presentation> {
    let id: PresentationId = record.get("id")?;
    let data_dir = match &state.options.data_dir {
        Some(dir) => dir.clone(),
        None => document_dir.join(record.opt_str("dataDir")?.unwrap_or("data")),
    };
    let mut presentation = Presentation::with_id(id, record.opt_str("name")?.unwrap_or_default(), data_dir);
    presentation.enter_deferred();
    let registry = state.registry;

    // Phase one: construct and register under declared ids
    for entry in record.records("metadata")? {
        if let Some(entry) = state.construct(&registry.metadata, &entry)? {
            presentation.metadata_mut().push(entry)?;
        }
    }
    for provider in record.records("dataProviders")? {
        if let Some(draft) = state.construct(&registry.data_providers, &provider)? {
            register_provider(&mut presentation, draft, state)?;
        }
        state.step()?;
    }
    for data in record.records("mediaData")? {
        if let Some(mut data) = state.construct(&registry.media_data, &data)? {
            let mut dangling = Vec::new();
            for provider in data.providers() {
                if !presentation.data_providers().contains(provider) {
                    dangling.push(provider.clone());
                }
            }
            for provider in &dangling {
                state.dangling(format!("data provider {} used by media data {}", provider, data.id()))?;
            }
            data.retain_providers(|p| !dangling.contains(p));
            presentation.media_data_mut().add_media_data(data)?;
        }
    }
    for channel in record.records("channels")? {
        if let Some(channel) = state.construct(&registry.channels, &channel)? {
            presentation.channels_mut().add_channel(channel)?;
        }
    }
    if let Some(root) = record.record("root")? {
        let root = read_node(&mut presentation, &root, state)?;
        presentation.tree_mut().set_root(&root)?;
    }

    // Phase two: resolve references by id
    presentation.link_properties(registry, state.options.strict, &mut state.warnings)?;
    state.step()?;
    Ok(presentation)
}

fn register_provider(presentation: &mut Presentation, draft: DataProviderDraft, state: &mut LoadState<'_>) -> Result<()> {
    match draft.source {
        ProviderSource::Linked(file_name) => {
            let provider = DataProvider::existing(draft.id.clone(), draft.mime_type.clone(), file_name)?;
            presentation.data_providers_mut().add_data_provider(provider)?;
            let path = presentation.data_providers().path_of(&draft.id)?;
            if !path.exists() {
                log::warn!("Payload of provider {} is missing at {}", draft.id, path.display());
                state.missing_files.push(MissingFileInfo {
                    presentation: presentation.id().clone(),
                    provider: draft.id,
                    path,
                    media_kind: file_types::media_kind_of(&draft.mime_type),
                    mime_type: draft.mime_type,
                });
            }
        }
        ProviderSource::Embedded(bytes) => {
            let manager = presentation.data_providers_mut();
            manager.create_data_provider_with_id(draft.id.clone(), &draft.mime_type)?;
            let path = manager.path_of(&draft.id)?;
            let existed = path.exists();
            manager.write_all(&draft.id, &bytes)?;
            if !existed {
                state.written.push(path);
            }
        }
    }
    Ok(())
}

/// Build a node and its subtree, detached; returns the node id
fn read_node(presentation: &mut Presentation, record: &Record, state: &mut LoadState<'_>) -> Result<NodeId> {
    let id: NodeId = record.get("id")?;
    presentation.tree_mut().create_node_with_id(id.clone())?;
    let registry = state.registry;

    for property in record.records("properties")? {
        if let Some(property) = state.construct(&registry.properties, &property)? {
            let kind = property.qualified_name();
            let properties = presentation.tree_mut().node_mut(&id)?.properties_mut();
            if properties.contains(&kind) {
                return Err(Error::structural(format!("node {} has two {} properties", id, kind)));
            }
            properties.set(property);
        }
    }

    for (index, child) in record.records("children")?.iter().enumerate() {
        let child = read_node(presentation, child, state)?;
        presentation.tree_mut().insert(&child, &id, index)?;
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_media_data_from_record() {
        let record = Record::from_value(json!({
            "type": "AudioMediaData", "id": "md1", "mimeType": "audio/x-wav",
            "providers": ["dp1"], "pcmFormat": {"sampleRate": 8000, "channels": 1, "bitsPerSample": 8}
        }))
        .unwrap();
        let data = media_data_from_record("AudioMediaData", &record).unwrap();
        assert_eq!(data.pcm_format().map(|f| f.sample_rate), Some(8000));
        assert_eq!(data.providers(), &[DataProviderId::new("dp1")]);

        let image = Record::from_value(json!({"type": "ImageMediaData", "id": "md2", "mimeType": "image/png"})).unwrap();
        let data = media_data_from_record("ImageMediaData", &image).unwrap();
        assert_eq!(data.kind(), &MediaDataKind::Image);
        assert!(data.providers().is_empty());
    }

    #[test]
    fn test_header_checks() {
        assert!(check_header(&json!({"format": "tessera", "version": "1.3"})).is_ok());
        assert!(matches!(
            check_header(&json!({"format": "tessera", "version": "2.0"})),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            check_header(&json!({"format": "other", "version": "1.0"})),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
