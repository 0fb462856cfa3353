//! Channels: named presentation tracks
//!
//! A channel is an independent track (narration audio, page text, ...) that
//! nodes bind media to through their [`ChannelsProperty`]. Channels are
//! typed; a channel only carries media of its kind, or anything if it is an
//! `Any` channel.
//!
//! [`ChannelsProperty`]: crate::channels_property::ChannelsProperty

use crate::error::{Error, Result};
use crate::factory::QualifiedName;
use crate::file_types::MediaKind;
use crate::ids::ChannelId;
use crate::serialization::record::Record;

/// What a channel may carry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Any,
    Audio,
    Video,
    Text,
    Image,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 5] = [
        ChannelKind::Any,
        ChannelKind::Audio,
        ChannelKind::Video,
        ChannelKind::Text,
        ChannelKind::Image,
    ];

    pub fn accepts(self, media: MediaKind) -> bool {
        match self {
            ChannelKind::Any => true,
            ChannelKind::Audio => media == MediaKind::Audio,
            ChannelKind::Video => media == MediaKind::Video,
            ChannelKind::Text => media == MediaKind::Text,
            ChannelKind::Image => media == MediaKind::Image,
        }
    }

    pub fn qualified_name(self) -> QualifiedName {
        QualifiedName::core(match self {
            ChannelKind::Any => "Channel",
            ChannelKind::Audio => "AudioChannel",
            ChannelKind::Video => "VideoChannel",
            ChannelKind::Text => "TextChannel",
            ChannelKind::Image => "ImageChannel",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    id: ChannelId,
    name: String,
    kind: ChannelKind,
}

impl Channel {
    /// New channel with a fresh id
    pub fn new(name: impl Into<String>, kind: ChannelKind) -> Self {
        Self::with_id(ChannelId::generate(), name, kind)
    }

    pub fn with_id(id: ChannelId, name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }

    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub(crate) fn from_record(kind: ChannelKind, record: &Record) -> Result<Self> {
        Ok(Self::with_id(record.get("id")?, record.str("name")?, kind))
    }

    pub fn to_record(&self) -> Result<Record> {
        let mut record = Record::new(&self.kind.qualified_name());
        record.set("id", &self.id)?;
        record.set("name", &self.name)?;
        Ok(record)
    }
}

/// Ordered set of the channels of a presentation
///
/// Ids and names are both unique. Mutation goes through the presentation so
/// that every change is announced and mappings stay consistent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelsManager {
    channels: Vec<Channel>,
}

impl ChannelsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| &c.id == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, id: &ChannelId) -> bool {
        self.get(id).is_some()
    }

    pub fn index_of(&self, id: &ChannelId) -> Option<usize> {
        self.channels.iter().position(|c| &c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub(crate) fn add_channel(&mut self, channel: Channel) -> Result<()> {
        let index = self.channels.len();
        self.insert_channel(index, channel)
    }

    pub(crate) fn insert_channel(&mut self, index: usize, channel: Channel) -> Result<()> {
        if self.contains(&channel.id) {
            return Err(Error::structural(format!("duplicate channel id {}", channel.id)));
        }
        if self.by_name(&channel.name).is_some() {
            return Err(Error::structural(format!(
                "a channel named {:?} already exists",
                channel.name
            )));
        }
        if index > self.channels.len() {
            return Err(Error::structural(format!(
                "channel index {} out of range 0..={}",
                index,
                self.channels.len()
            )));
        }
        self.channels.insert(index, channel);
        Ok(())
    }

    /// Remove a channel, returning it with its former position
    pub(crate) fn remove_channel(&mut self, id: &ChannelId) -> Result<(usize, Channel)> {
        let index = self
            .index_of(id)
            .ok_or_else(|| Error::not_found(format!("channel {}", id)))?;
        Ok((index, self.channels.remove(index)))
    }

    /// Rename a channel, returning the previous name
    pub(crate) fn rename_channel(&mut self, id: &ChannelId, name: &str) -> Result<String> {
        if let Some(other) = self.by_name(name) {
            if &other.id != id {
                return Err(Error::structural(format!(
                    "a channel named {:?} already exists",
                    name
                )));
            }
        }
        let channel = self
            .channels
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| Error::not_found(format!("channel {}", id)))?;
        Ok(std::mem::replace(&mut channel.name, name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_acceptance() {
        assert!(ChannelKind::Audio.accepts(MediaKind::Audio));
        assert!(!ChannelKind::Audio.accepts(MediaKind::Text));
        assert!(ChannelKind::Any.accepts(MediaKind::Image));
    }

    #[test]
    fn test_unique_ids_and_names() {
        let mut manager = ChannelsManager::new();
        let audio = Channel::with_id(ChannelId::new("c1"), "Audio", ChannelKind::Audio);
        manager.add_channel(audio.clone()).unwrap();

        assert!(manager.add_channel(audio).is_err());
        let same_name = Channel::new("Audio", ChannelKind::Text);
        assert!(matches!(manager.add_channel(same_name), Err(Error::Structural(_))));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_rename_and_remove() {
        let mut manager = ChannelsManager::new();
        manager.add_channel(Channel::with_id(ChannelId::new("a"), "Audio", ChannelKind::Audio)).unwrap();
        manager.add_channel(Channel::with_id(ChannelId::new("t"), "Text", ChannelKind::Text)).unwrap();

        assert!(manager.rename_channel(&ChannelId::new("a"), "Text").is_err());
        let previous = manager.rename_channel(&ChannelId::new("a"), "Narration").unwrap();
        assert_eq!(previous, "Audio");
        assert_eq!(manager.by_name("Narration").unwrap().id(), &ChannelId::new("a"));

        let (index, removed) = manager.remove_channel(&ChannelId::new("a")).unwrap();
        assert_eq!(index, 0);
        assert_eq!(removed.name(), "Narration");
        assert!(matches!(
            manager.remove_channel(&ChannelId::new("a")),
            Err(Error::NotFound(_))
        ));

        manager.insert_channel(index, removed).unwrap();
        assert_eq!(manager.iter().next().unwrap().id(), &ChannelId::new("a"));
    }

    #[test]
    fn test_record_round_trip() {
        let channel = Channel::with_id(ChannelId::new("c7"), "Pictures", ChannelKind::Image);
        let record = channel.to_record().unwrap();
        assert_eq!(record.qualified_name().unwrap(), QualifiedName::core("ImageChannel"));
        assert_eq!(Channel::from_record(ChannelKind::Image, &record).unwrap(), channel);
    }
}
