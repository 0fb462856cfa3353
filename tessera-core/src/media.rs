//! Media: typed content bound to channels
//!
//! Continuous media (audio, video) point at a managed media data and select a
//! clip of it; discrete media are either inline text or an image backed by
//! media data. Media never own their media data, they hold a counted
//! [`MediaDataRef`].

use crate::error::{Error, Result};
use crate::factory::QualifiedName;
use crate::file_types::MediaKind;
use crate::ids::MediaDataId;
use crate::media_data::{MediaDataManager, MediaDataRef};
use crate::serialization::record::Record;
use std::time::Duration;

/// A clip of a continuous media data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContinuousMedia {
    data: MediaDataRef,
    clip_begin: Duration,
    /// `None` plays to the end of the data
    clip_end: Option<Duration>,
}

impl ContinuousMedia {
    /// Whole-data clip
    pub fn new(data: MediaDataRef) -> Self {
        Self {
            data,
            clip_begin: Duration::ZERO,
            clip_end: None,
        }
    }

    pub fn with_clip(data: MediaDataRef, clip_begin: Duration, clip_end: Option<Duration>) -> Result<Self> {
        if let Some(end) = clip_end {
            if end < clip_begin {
                return Err(Error::structural(format!(
                    "clip end {:?} precedes clip begin {:?}",
                    end, clip_begin
                )));
            }
        }
        Ok(Self {
            data,
            clip_begin,
            clip_end,
        })
    }

    pub fn data(&self) -> &MediaDataRef {
        &self.data
    }

    pub fn clip_begin(&self) -> Duration {
        self.clip_begin
    }

    pub fn clip_end(&self) -> Option<Duration> {
        self.clip_end
    }

    /// Clip length, if the clip end is known
    pub fn duration(&self) -> Option<Duration> {
        self.clip_end.map(|end| end - self.clip_begin)
    }

    /// Split the clip `at` past its beginning
    ///
    /// `self` keeps the first part; the returned media holds the rest and
    /// shares the same media data.
    pub fn split(&mut self, at: Duration) -> Result<ContinuousMedia> {
        if at.is_zero() {
            return Err(Error::structural("cannot split a clip at its beginning"));
        }
        let point = self.clip_begin + at;
        if let Some(end) = self.clip_end {
            if point >= end {
                return Err(Error::structural(format!(
                    "split point {:?} is outside the clip {:?}..{:?}",
                    point, self.clip_begin, end
                )));
            }
        }
        let second = ContinuousMedia {
            data: self.data.clone(),
            clip_begin: point,
            clip_end: self.clip_end,
        };
        self.clip_end = Some(point);
        Ok(second)
    }
}

/// Inline text
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextMedia {
    pub text: String,
}

/// Still image backed by media data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageMedia {
    data: MediaDataRef,
}

impl ImageMedia {
    pub fn new(data: MediaDataRef) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &MediaDataRef {
        &self.data
    }
}

/// Content a channel can carry for one node
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Media {
    Audio(ContinuousMedia),
    Video(ContinuousMedia),
    Text(TextMedia),
    Image(ImageMedia),
}

impl Media {
    pub fn audio(data: MediaDataRef) -> Self {
        Media::Audio(ContinuousMedia::new(data))
    }

    pub fn video(data: MediaDataRef) -> Self {
        Media::Video(ContinuousMedia::new(data))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Media::Text(TextMedia { text: text.into() })
    }

    pub fn image(data: MediaDataRef) -> Self {
        Media::Image(ImageMedia::new(data))
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Media::Audio(_) => MediaKind::Audio,
            Media::Video(_) => MediaKind::Video,
            Media::Text(_) => MediaKind::Text,
            Media::Image(_) => MediaKind::Image,
        }
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, Media::Audio(_) | Media::Video(_))
    }

    /// The media data this media points at, if any
    pub fn media_data(&self) -> Option<&MediaDataRef> {
        match self {
            Media::Audio(clip) | Media::Video(clip) => Some(clip.data()),
            Media::Image(image) => Some(image.data()),
            Media::Text(_) => None,
        }
    }

    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::core(match self {
            Media::Audio(_) => "AudioMedia",
            Media::Video(_) => "VideoMedia",
            Media::Text(_) => "TextMedia",
            Media::Image(_) => "ImageMedia",
        })
    }

    pub fn to_record(&self) -> Result<Record> {
        let mut record = Record::new(&self.qualified_name());
        match self {
            Media::Audio(clip) | Media::Video(clip) => {
                record.set("mediaData", clip.data.id())?;
                record.set("clipBegin", clip.clip_begin.as_micros() as u64)?;
                record.set("clipEnd", clip.clip_end.map(|end| end.as_micros() as u64))?;
            }
            Media::Text(text) => record.set("text", &text.text)?,
            Media::Image(image) => record.set("mediaData", image.data.id())?,
        }
        Ok(record)
    }

    /// Id-only form of this media
    pub fn unlink(&self) -> UnlinkedMedia {
        match self {
            Media::Audio(clip) => UnlinkedMedia::Audio(UnlinkedClip::of(clip)),
            Media::Video(clip) => UnlinkedMedia::Video(UnlinkedClip::of(clip)),
            Media::Text(text) => UnlinkedMedia::Text(text.clone()),
            Media::Image(image) => UnlinkedMedia::Image {
                data: image.data.id().clone(),
            },
        }
    }
}

/// Clip whose media data is named by id only
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnlinkedClip {
    pub data: MediaDataId,
    pub clip_begin: Duration,
    pub clip_end: Option<Duration>,
}

impl UnlinkedClip {
    fn of(clip: &ContinuousMedia) -> Self {
        Self {
            data: clip.data.id().clone(),
            clip_begin: clip.clip_begin,
            clip_end: clip.clip_end,
        }
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            data: record.get("mediaData")?,
            clip_begin: Duration::from_micros(record.opt::<u64>("clipBegin")?.unwrap_or(0)),
            clip_end: record.opt::<u64>("clipEnd")?.map(Duration::from_micros),
        })
    }

    fn link(&self, manager: &MediaDataManager) -> Result<ContinuousMedia> {
        ContinuousMedia::with_clip(manager.reference(&self.data)?, self.clip_begin, self.clip_end)
    }
}

/// Media as read from a document, before its media data is resolved
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnlinkedMedia {
    Audio(UnlinkedClip),
    Video(UnlinkedClip),
    Text(TextMedia),
    Image { data: MediaDataId },
}

impl UnlinkedMedia {
    pub(crate) fn from_record(local_name: &str, record: &Record) -> Result<Self> {
        match local_name {
            "AudioMedia" => Ok(UnlinkedMedia::Audio(UnlinkedClip::from_record(record)?)),
            "VideoMedia" => Ok(UnlinkedMedia::Video(UnlinkedClip::from_record(record)?)),
            "TextMedia" => Ok(UnlinkedMedia::Text(TextMedia {
                text: record.opt::<String>("text")?.unwrap_or_default(),
            })),
            "ImageMedia" => Ok(UnlinkedMedia::Image {
                data: record.get("mediaData")?,
            }),
            other => Err(Error::unsupported(&QualifiedName::core(other))),
        }
    }

    /// Media data this media needs, if any
    pub fn media_data_id(&self) -> Option<&MediaDataId> {
        match self {
            UnlinkedMedia::Audio(clip) | UnlinkedMedia::Video(clip) => Some(&clip.data),
            UnlinkedMedia::Image { data } => Some(data),
            UnlinkedMedia::Text(_) => None,
        }
    }

    /// Resolve against a media data manager; `NotFound` if the id is unknown
    pub fn link(&self, manager: &MediaDataManager) -> Result<Media> {
        Ok(match self {
            UnlinkedMedia::Audio(clip) => Media::Audio(clip.link(manager)?),
            UnlinkedMedia::Video(clip) => Media::Video(clip.link(manager)?),
            UnlinkedMedia::Text(text) => Media::Text(text.clone()),
            UnlinkedMedia::Image { data } => Media::image(manager.reference(data)?),
        })
    }
}
