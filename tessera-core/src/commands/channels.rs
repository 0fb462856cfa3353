//! Channel commands: add, rename and remove presentation channels

use crate::channel::Channel;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::ids::ChannelId;
use crate::presentation::{Presentation, RemovedChannel};

/// Command that adds a channel at the end of the channel list
pub struct AddChannelCommand {
    channel: Channel,
}

impl AddChannelCommand {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    pub fn channel_id(&self) -> &ChannelId {
        self.channel.id()
    }
}

impl Command for AddChannelCommand {
    fn apply(&mut self, presentation: &mut Presentation) -> Result<()> {
        presentation.add_channel(self.channel.clone())?;
        Ok(())
    }

    fn invert(&mut self, presentation: &mut Presentation) -> Result<()> {
        let removed = presentation.remove_channel(self.channel.id())?;
        if !removed.mappings().is_empty() {
            log::warn!(
                "Undoing the addition of channel {:?} dropped {} binding(s) made outside the history",
                self.channel.name(),
                removed.mappings().len()
            );
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!("Add channel {}", self.channel.name())
    }
}

pub struct RenameChannelCommand {
    channel: ChannelId,
    name: String,
    previous: Option<String>,
}

impl RenameChannelCommand {
    pub fn new(channel: ChannelId, name: impl Into<String>) -> Self {
        Self {
            channel,
            name: name.into(),
            previous: None,
        }
    }
}

impl Command for RenameChannelCommand {
    fn apply(&mut self, presentation: &mut Presentation) -> Result<()> {
        self.previous = Some(presentation.rename_channel(&self.channel, &self.name)?);
        Ok(())
    }

    fn invert(&mut self, presentation: &mut Presentation) -> Result<()> {
        let previous = self
            .previous
            .take()
            .ok_or_else(|| Error::structural("rename channel command was never applied"))?;
        if let Err(e) = presentation.rename_channel(&self.channel, &previous) {
            self.previous = Some(previous);
            return Err(e);
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!("Rename channel to {}", self.name)
    }
}

/// Command that removes a channel with every binding it has
///
/// Undo puts the channel back at its old position and rebinds the media.
pub struct RemoveChannelCommand {
    channel: ChannelId,
    removed: Option<RemovedChannel>,
}

impl RemoveChannelCommand {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            removed: None,
        }
    }
}

impl Command for RemoveChannelCommand {
    fn apply(&mut self, presentation: &mut Presentation) -> Result<()> {
        self.removed = Some(presentation.remove_channel(&self.channel)?);
        Ok(())
    }

    fn invert(&mut self, presentation: &mut Presentation) -> Result<()> {
        let removed = self
            .removed
            .take()
            .ok_or_else(|| Error::structural("remove channel command was never applied"))?;
        presentation.restore_channel(removed)
    }

    fn description(&self) -> String {
        "Remove channel".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelKind;
    use crate::media::Media;

    fn setup() -> (tempfile::TempDir, Presentation) {
        let dir = tempfile::tempdir().unwrap();
        let p = Presentation::new("Test", dir.path().join("data"));
        (dir, p)
    }

    #[test]
    fn test_add_channel_undo() {
        let (_dir, mut p) = setup();
        let command = AddChannelCommand::new(Channel::new("Narration", ChannelKind::Audio));
        let id = command.channel_id().clone();
        p.execute(Box::new(command)).unwrap();
        assert_eq!(p.channels().by_name("Narration").map(|c| c.id()), Some(&id));
        assert_eq!(p.history().undo_description().as_deref(), Some("Add channel Narration"));

        p.undo().unwrap();
        assert!(p.channels().is_empty());
        p.redo().unwrap();
        assert!(p.channels().contains(&id));
    }

    #[test]
    fn test_rename_channel_undo() {
        let (_dir, mut p) = setup();
        let id = p.add_channel(Channel::new("Text", ChannelKind::Text)).unwrap();
        p.add_channel(Channel::new("Notes", ChannelKind::Text)).unwrap();

        p.execute(Box::new(RenameChannelCommand::new(id.clone(), "Body"))).unwrap();
        assert_eq!(p.channels().get(&id).unwrap().name(), "Body");
        p.undo().unwrap();
        assert_eq!(p.channels().get(&id).unwrap().name(), "Text");

        // Names stay unique
        let clash = p.execute(Box::new(RenameChannelCommand::new(id, "Notes")));
        assert!(matches!(clash, Err(Error::Structural(_))));
        assert_eq!(p.history().redo_depth(), 1);
    }

    #[test]
    fn test_remove_channel_restores_order_and_bindings() {
        let (_dir, mut p) = setup();
        let root = p.create_root().unwrap();
        let first = p.add_channel(Channel::new("A", ChannelKind::Text)).unwrap();
        let second = p.add_channel(Channel::new("B", ChannelKind::Text)).unwrap();
        p.set_media(&root, &first, Some(Media::text("a"))).unwrap();
        let before = p.channels().clone();

        p.execute(Box::new(RemoveChannelCommand::new(first.clone()))).unwrap();
        assert_eq!(p.channels().len(), 1);
        assert_eq!(p.channels().index_of(&second), Some(0));

        p.undo().unwrap();
        assert_eq!(p.channels(), &before);
        assert_eq!(p.get_media(&root, &first).unwrap(), Some(&Media::text("a")));
    }
}
