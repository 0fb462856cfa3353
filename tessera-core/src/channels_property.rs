//! Channel to media bindings of one node

use crate::error::Result;
use crate::factory::QualifiedName;
use crate::ids::ChannelId;
use crate::media::Media;
use crate::property::{LinkContext, Property};
use crate::serialization::record::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;

/// Maps each channel to at most one media for the owning node
///
/// Mutating an attached property goes through
/// [`Presentation::set_media`](crate::presentation::Presentation::set_media),
/// which checks the channel and announces the change. The methods here
/// operate on the bare value.
#[derive(Clone, Debug, Default)]
pub struct ChannelsProperty {
    mappings: BTreeMap<ChannelId, Media>,
    /// Mappings read from a document, resolved by `link`
    pending: Vec<(ChannelId, Record)>,
}

#[derive(Serialize, Deserialize)]
struct MappingRecord {
    channel: ChannelId,
    media: Value,
}

impl ChannelsProperty {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind() -> QualifiedName {
        QualifiedName::core("ChannelsProperty")
    }

    /// Media bound to `channel`, if any
    pub fn get_media(&self, channel: &ChannelId) -> Option<&Media> {
        self.mappings.get(channel)
    }

    /// Bind `media` to `channel` (or unbind with `None`), returning what was bound before
    pub fn set_media(&mut self, channel: ChannelId, media: Option<Media>) -> Option<Media> {
        match media {
            Some(media) => self.mappings.insert(channel, media),
            None => self.mappings.remove(&channel),
        }
    }

    /// Channels with a binding, in id order
    pub fn used_channels(&self) -> impl Iterator<Item = &ChannelId> {
        self.mappings.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChannelId, &Media)> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub(crate) fn from_record(record: &Record) -> Result<Self> {
        let mappings: Vec<MappingRecord> = record.opt("mappings")?.unwrap_or_default();
        let pending = mappings
            .into_iter()
            .map(|m| Ok((m.channel, Record::from_value(m.media)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            mappings: BTreeMap::new(),
            pending,
        })
    }
}

impl PartialEq for ChannelsProperty {
    fn eq(&self, other: &Self) -> bool {
        self.mappings == other.mappings
    }
}

impl Property for ChannelsProperty {
    fn qualified_name(&self) -> QualifiedName {
        Self::kind()
    }

    fn write_record(&self) -> Result<Record> {
        let mut record = Record::new(&Self::kind());
        let mappings = self
            .mappings
            .iter()
            .map(|(channel, media)| {
                Ok(MappingRecord {
                    channel: channel.clone(),
                    media: media.to_record()?.into_value(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        record.set("mappings", mappings)?;
        Ok(record)
    }

    fn clone_box(&self) -> Box<dyn Property> {
        Box::new(self.clone())
    }

    fn eq_property(&self, other: &dyn Property) -> bool {
        other.as_any().downcast_ref::<Self>() == Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn link(&mut self, links: &mut LinkContext<'_>) -> Result<()> {
        for (channel, record) in std::mem::take(&mut self.pending) {
            if !links.has_channel(&channel) {
                links.dangling(format!("channel {} bound in {}", channel, record.describe()))?;
                continue;
            }
            if let Some(media) = links.media(&record)? {
                self.mappings.insert(channel, media);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_media_replaces_and_returns_previous() {
        let mut property = ChannelsProperty::new();
        let channel = ChannelId::new("text");

        assert!(property.set_media(channel.clone(), Some(Media::text("one"))).is_none());
        let previous = property.set_media(channel.clone(), Some(Media::text("two")));
        assert_eq!(previous, Some(Media::text("one")));
        assert_eq!(property.get_media(&channel), Some(&Media::text("two")));
        assert_eq!(property.len(), 1);

        assert_eq!(property.set_media(channel.clone(), None), Some(Media::text("two")));
        assert!(property.get_media(&channel).is_none());
    }

    #[test]
    fn test_record_keeps_mappings_pending_until_linked() {
        let mut property = ChannelsProperty::new();
        property.set_media(ChannelId::new("c1"), Some(Media::text("hello")));
        let record = property.write_record().unwrap();

        let read = ChannelsProperty::from_record(&record).unwrap();
        assert!(read.is_empty());
        assert_eq!(read.pending.len(), 1);
        assert_eq!(read.pending[0].0, ChannelId::new("c1"));
    }
}
