//! Project to interchange document

use super::record::Record;
use super::{SaveSettings, FORMAT_NAME, FORMAT_VERSION};
use crate::channels_property::ChannelsProperty;
use crate::data_provider::DataProvider;
use crate::error::{Error, Result};
use crate::factory::QualifiedName;
use crate::ids::{DataProviderId, MediaDataId, NodeId};
use crate::media_data::{MediaData, MediaDataKind};
use crate::presentation::Presentation;
use crate::project::Project;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::Path;

/// `created` timestamp of an existing document, kept across saves
pub(crate) fn previous_created(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let document: Value = serde_json::from_str(&text).ok()?;
    let created = document.get("created")?.as_str()?;
    chrono::DateTime::parse_from_rfc3339(created).ok()?;
    Some(created.to_string())
}

pub(crate) fn write_project(
    project: &Project,
    document_dir: &Path,
    settings: &SaveSettings,
    created: &str,
) -> Result<Value> {
    let presentations = project
        .iter()
        .map(|p| write_presentation(p, document_dir, settings).map(Record::into_value))
        .collect::<Result<Vec<_>>>()?;
    Ok(json!({
        "format": FORMAT_NAME,
        "version": FORMAT_VERSION,
        "created": created,
        "modified": chrono::Utc::now().to_rfc3339(),
        "presentations": presentations,
    }))
}

/// Media data bound somewhere in the rooted tree
///
/// Media data kept alive only by the undo history, or by detached nodes,
/// is not part of the saved document.
fn reachable_media_data(presentation: &Presentation) -> BTreeSet<MediaDataId> {
    presentation
        .tree()
        .iter()
        .filter_map(|node| node.properties().get_as::<ChannelsProperty>())
        .flat_map(|property| property.iter())
        .filter_map(|(_, media)| media.media_data().map(|data| data.id().clone()))
        .collect()
}

fn write_presentation(presentation: &Presentation, document_dir: &Path, settings: &SaveSettings) -> Result<Record> {
    let mut record = Record::new(&QualifiedName::core("Presentation"));
    record.set("id", presentation.id())?;
    record.set("name", presentation.name())?;
    let data_dir = pathdiff::diff_paths(presentation.data_dir(), document_dir)
        .unwrap_or_else(|| presentation.data_dir().to_path_buf());
    record.set("dataDir", data_dir.to_string_lossy())?;

    let metadata = presentation
        .metadata()
        .iter()
        .map(|entry| entry.to_record())
        .collect::<Result<Vec<_>>>()?;
    record.set_records("metadata", metadata);

    let reachable = reachable_media_data(presentation);
    let media_data: Vec<&MediaData> = presentation
        .media_data()
        .iter()
        .filter(|data| reachable.contains(data.id()))
        .collect();
    let providers: BTreeSet<&DataProviderId> = media_data.iter().flat_map(|data| data.providers()).collect();

    let provider_records = presentation
        .data_providers()
        .iter()
        .filter(|provider| providers.contains(provider.id()))
        .map(|provider| write_provider(presentation, provider, settings))
        .collect::<Result<Vec<_>>>()?;
    record.set_records("dataProviders", provider_records);

    let media_data_records = media_data
        .iter()
        .map(|data| write_media_data(data))
        .collect::<Result<Vec<_>>>()?;
    record.set_records("mediaData", media_data_records);

    let channels = presentation
        .channels()
        .iter()
        .map(|channel| channel.to_record())
        .collect::<Result<Vec<_>>>()?;
    record.set_records("channels", channels);

    if let Some(root) = presentation.root() {
        record.set_record("root", write_node(presentation, root)?);
    }
    Ok(record)
}

fn should_embed(presentation: &Presentation, provider: &DataProvider, settings: &SaveSettings) -> bool {
    if settings.force_link_all {
        return false;
    }
    if settings.force_embed_all {
        return true;
    }
    match presentation.data_providers().byte_len(provider.id()) {
        Ok(len) => len < settings.auto_embed_threshold_bytes,
        Err(e) => {
            log::warn!("Linking provider {} instead of embedding it: {}", provider.id(), e);
            false
        }
    }
}

fn write_provider(presentation: &Presentation, provider: &DataProvider, settings: &SaveSettings) -> Result<Record> {
    let mut record = Record::new(&QualifiedName::core("FileDataProvider"));
    record.set("id", provider.id())?;
    record.set("mimeType", provider.mime_type())?;
    if should_embed(presentation, provider, settings) {
        let bytes = presentation.data_providers().read_all(provider.id())?;
        record.set("data", STANDARD.encode(bytes))?;
    } else {
        record.set("path", provider.file_name())?;
    }
    Ok(record)
}

pub(crate) fn write_media_data(data: &MediaData) -> Result<Record> {
    let mut record = Record::new(&data.qualified_name());
    record.set("id", data.id())?;
    record.set("mimeType", data.mime_type())?;
    record.set("providers", data.providers())?;
    if let MediaDataKind::Audio(format) = data.kind() {
        record.set("pcmFormat", format)?;
    }
    Ok(record)
}

fn write_node(presentation: &Presentation, id: &NodeId) -> Result<Record> {
    let node = presentation
        .node(id)
        .ok_or_else(|| Error::not_found(format!("node {}", id)))?;
    let mut record = Record::new(&QualifiedName::core("TreeNode"));
    record.set("id", node.id())?;

    let mut properties = node.properties().iter().collect::<Vec<_>>();
    properties.sort_by_key(|p| p.qualified_name());
    let properties = properties
        .into_iter()
        .map(|p| p.write_record())
        .collect::<Result<Vec<_>>>()?;
    record.set_records("properties", properties);

    let children = node
        .children()
        .iter()
        .map(|child| write_node(presentation, child))
        .collect::<Result<Vec<_>>>()?;
    record.set_records("children", children);
    Ok(record)
}
