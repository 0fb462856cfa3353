//! Import media command
//!
//! Creates a data provider from bytes or a file, describes it with a new
//! media data and binds the resulting media to a channel of a node, all as
//! one undoable step.
//!
//! The provider and media data ids are chosen when the command is built.
//! Undo only unbinds the media: once nothing refers to the media data any
//! more, the orphan sweep closing the undo deletes it together with the
//! provider file. Redo then recreates both under the same ids.

use crate::command::Command;
use crate::commands::set_media::{has_channels_property, restore_binding};
use crate::error::{Error, Result};
use crate::ids::{ChannelId, DataProviderId, MediaDataId, NodeId};
use crate::media::Media;
use crate::media_data::{MediaData, MediaDataKind, MediaDataRef};
use crate::presentation::Presentation;
use std::fs::File;
use std::io;
use std::path::PathBuf;

/// Where the imported bytes come from
#[derive(Clone, Debug)]
pub enum ImportSource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

pub struct ImportMediaCommand {
    node: NodeId,
    channel: ChannelId,
    source: ImportSource,
    mime_type: String,
    kind: MediaDataKind,
    provider: DataProviderId,
    media_data: MediaDataId,
    previous: Option<Media>,
    created_property: bool,
}

impl ImportMediaCommand {
    pub fn new(
        node: NodeId,
        channel: ChannelId,
        source: ImportSource,
        mime_type: impl Into<String>,
        kind: MediaDataKind,
    ) -> Self {
        Self {
            node,
            channel,
            source,
            mime_type: mime_type.into(),
            kind,
            provider: DataProviderId::generate(),
            media_data: MediaDataId::generate(),
            previous: None,
            created_property: false,
        }
    }

    /// Id of the provider the import creates
    pub fn provider(&self) -> &DataProviderId {
        &self.provider
    }

    /// Id of the media data the import creates
    pub fn media_data(&self) -> &MediaDataId {
        &self.media_data
    }

    fn media_for(&self, data: MediaDataRef) -> Result<Media> {
        match &self.kind {
            MediaDataKind::Audio(_) => Ok(Media::audio(data)),
            MediaDataKind::Video => Ok(Media::video(data)),
            MediaDataKind::Image => Ok(Media::image(data)),
            MediaDataKind::Binary => Err(Error::structural(format!(
                "binary media data {} cannot be bound to a channel",
                self.media_data
            ))),
        }
    }

    fn create_media(&self, presentation: &mut Presentation) -> Result<Media> {
        presentation.create_data_provider_with_id(self.provider.clone(), &self.mime_type)?;
        match &self.source {
            ImportSource::Bytes(bytes) => presentation.write_data(&self.provider, bytes)?,
            ImportSource::File(path) => {
                let mut input = File::open(path)?;
                presentation.append_data(&self.provider, |writer| {
                    io::copy(&mut input, writer)?;
                    Ok(())
                })?;
            }
        }
        let data = MediaData::new(self.media_data.clone(), self.mime_type.clone(), self.kind.clone())
            .with_provider(self.provider.clone());
        let data = presentation.add_media_data(data)?;
        self.media_for(data)
    }
}

impl Command for ImportMediaCommand {
    /// Anything created before a failure is left unreferenced, so the sweep
    /// that closes command execution removes it again.
    fn apply(&mut self, presentation: &mut Presentation) -> Result<()> {
        let had_property = has_channels_property(presentation, &self.node);
        let media = self.create_media(presentation)?;
        self.previous = presentation.set_media(&self.node, &self.channel, Some(media))?;
        self.created_property = !had_property;
        Ok(())
    }

    fn invert(&mut self, presentation: &mut Presentation) -> Result<()> {
        restore_binding(
            presentation,
            &self.node,
            &self.channel,
            self.previous.take(),
            self.created_property,
        )
    }

    fn description(&self) -> String {
        match &self.source {
            ImportSource::Bytes(_) => "Import media".to_string(),
            ImportSource::File(path) => match path.file_name() {
                Some(name) => format!("Import {}", name.to_string_lossy()),
                None => "Import media".to_string(),
            },
        }
    }
}
