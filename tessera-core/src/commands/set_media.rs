//! Set media command
//!
//! Binds (or unbinds) media on one channel of one node. The displaced media
//! stays in the command while it is in the history, so its data is not
//! collected before an undo can bring it back.

use crate::channels_property::ChannelsProperty;
use crate::command::Command;
use crate::error::Result;
use crate::ids::{ChannelId, NodeId};
use crate::media::Media;
use crate::presentation::Presentation;

/// Command that binds `media` to `channel` on `node`, or unbinds with `None`
pub struct SetMediaCommand {
    node: NodeId,
    channel: ChannelId,
    media: Option<Media>,
    previous: Option<Media>,
    /// Whether applying had to create the node's channels property
    created_property: bool,
}

impl SetMediaCommand {
    pub fn new(node: NodeId, channel: ChannelId, media: Option<Media>) -> Self {
        Self {
            node,
            channel,
            media,
            previous: None,
            created_property: false,
        }
    }
}

/// Unbind `channel` and drop a channels property the binding had created
pub(crate) fn restore_binding(
    presentation: &mut Presentation,
    node: &NodeId,
    channel: &ChannelId,
    previous: Option<Media>,
    created_property: bool,
) -> Result<()> {
    presentation.set_media(node, channel, previous)?;
    if created_property {
        let empty = presentation
            .node(node)
            .and_then(|n| n.properties().get_as::<ChannelsProperty>())
            .map(ChannelsProperty::is_empty)
            .unwrap_or(false);
        if empty {
            presentation.remove_property(node, &ChannelsProperty::kind())?;
        }
    }
    Ok(())
}

pub(crate) fn has_channels_property(presentation: &Presentation, node: &NodeId) -> bool {
    presentation
        .node(node)
        .map(|n| n.properties().contains(&ChannelsProperty::kind()))
        .unwrap_or(false)
}

impl Command for SetMediaCommand {
    fn apply(&mut self, presentation: &mut Presentation) -> Result<()> {
        let had_property = has_channels_property(presentation, &self.node);
        self.previous = presentation.set_media(&self.node, &self.channel, self.media.clone())?;
        self.created_property = !had_property && self.media.is_some();
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
        match &self.media {
            Some(_) => "Set media".to_string(),
            None => "Clear media".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Channel, ChannelKind};
    use crate::ids::MediaDataId;
    use crate::media_data::{MediaData, PcmFormat};

    #[test]
    fn test_set_media_undo_restores_exact_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Presentation::new("Test", dir.path().join("data"));
        let root = p.create_root().unwrap();
        let text = p.add_channel(Channel::new("Text", ChannelKind::Text)).unwrap();

        p.execute(Box::new(SetMediaCommand::new(
            root.clone(),
            text.clone(),
            Some(Media::text("hello")),
        )))
        .unwrap();
        assert_eq!(p.get_media(&root, &text).unwrap(), Some(&Media::text("hello")));

        p.undo().unwrap();
        assert_eq!(p.get_media(&root, &text).unwrap(), None);
        assert!(p.node(&root).unwrap().properties().is_empty());

        p.redo().unwrap();
        assert_eq!(p.get_media(&root, &text).unwrap(), Some(&Media::text("hello")));
    }

    #[test]
    fn test_replaced_media_survives_until_history_drops_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Presentation::new("Test", dir.path().join("data"));
        let root = p.create_root().unwrap();
        let audio = p.add_channel(Channel::new("Audio", ChannelKind::Audio)).unwrap();

        let data_id = MediaDataId::generate();
        let data = p
            .batch(|p| {
                let provider = p.create_data_provider("audio/x-wav");
                p.write_data(&provider, &[0u8; 8])?;
                p.add_media_data(MediaData::audio(
                    data_id.clone(),
                    "audio/x-wav",
                    PcmFormat::default(),
                    vec![provider],
                ))
            })
            .unwrap();
        p.set_media(&root, &audio, Some(Media::audio(data))).unwrap();

        p.execute(Box::new(SetMediaCommand::new(root.clone(), audio.clone(), None)))
            .unwrap();
        // The command still holds the displaced media
        assert!(p.media_data().contains(&data_id));
        assert_eq!(p.media_data().reference_count(&data_id).unwrap(), 1);

        p.undo().unwrap();
        assert!(p.get_media(&root, &audio).unwrap().is_some());

        p.redo().unwrap();
        p.history_mut().clear_history();
        p.collect_orphans().unwrap();
        assert!(!p.media_data().contains(&data_id));
        assert!(p.data_providers().is_empty());
    }
}
