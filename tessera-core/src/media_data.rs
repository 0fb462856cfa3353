//! Media data descriptors and their reference counting
//!
//! A [`MediaData`] describes one content payload: its mime type, the data
//! providers that hold its bytes, and (for audio) the PCM layout needed to
//! turn byte counts into durations. The payload itself is opaque.
//!
//! ## Reference counting
//!
//! The [`MediaDataManager`] keeps one anchor `Arc` per media data. Every
//! [`Media`](crate::media::Media) that points at it holds a [`MediaDataRef`],
//! a clone of that anchor, so the reference count is simply the number of
//! live refs: `strong_count - 1`. Media parked in an undo command count just
//! like media bound in the tree. Once the count reaches zero the media data
//! and the providers only it used become eligible for collection.

use crate::data_provider::DataProviderManager;
use crate::error::{Error, Result};
use crate::factory::QualifiedName;
use crate::ids::{DataProviderId, MediaDataId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Layout of uncompressed PCM audio
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            bits_per_sample: 16,
        }
    }
}

impl PcmFormat {
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// Bytes per frame (one sample for every channel)
    pub fn block_align(&self) -> u64 {
        u64::from(self.channels) * u64::from(self.bits_per_sample / 8)
    }

    pub fn byte_rate(&self) -> u64 {
        u64::from(self.sample_rate) * self.block_align()
    }

    /// Playing time of `bytes` of PCM, truncated to whole frames
    pub fn duration_of(&self, bytes: u64) -> Duration {
        let rate = self.byte_rate();
        if rate == 0 {
            return Duration::ZERO;
        }
        let frames = bytes / self.block_align();
        Duration::from_micros(frames * 1_000_000 / u64::from(self.sample_rate))
    }

    /// Byte count of `duration` of PCM, rounded down to a frame boundary
    pub fn bytes_for(&self, duration: Duration) -> u64 {
        let frames = duration.as_micros() as u64 * u64::from(self.sample_rate) / 1_000_000;
        frames * self.block_align()
    }
}

/// Type-specific part of a media data descriptor
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaDataKind {
    Audio(PcmFormat),
    Video,
    Image,
    Binary,
}

/// Descriptor of one content payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaData {
    id: MediaDataId,
    mime_type: String,
    /// Providers holding the payload, in playback order
    providers: Vec<DataProviderId>,
    kind: MediaDataKind,
}

impl MediaData {
    pub fn new(id: MediaDataId, mime_type: impl Into<String>, kind: MediaDataKind) -> Self {
        Self {
            id,
            mime_type: mime_type.into(),
            providers: Vec::new(),
            kind,
        }
    }

    /// Audio media data backed by the given providers
    pub fn audio(
        id: MediaDataId,
        mime_type: impl Into<String>,
        format: PcmFormat,
        providers: Vec<DataProviderId>,
    ) -> Self {
        Self {
            providers,
            ..Self::new(id, mime_type, MediaDataKind::Audio(format))
        }
    }

    pub fn with_provider(mut self, provider: DataProviderId) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn id(&self) -> &MediaDataId {
        &self.id
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn providers(&self) -> &[DataProviderId] {
        &self.providers
    }

    pub fn kind(&self) -> &MediaDataKind {
        &self.kind
    }

    pub fn pcm_format(&self) -> Option<PcmFormat> {
        match self.kind {
            MediaDataKind::Audio(format) => Some(format),
            _ => None,
        }
    }

    pub(crate) fn push_provider(&mut self, provider: DataProviderId) {
        self.providers.push(provider);
    }

    pub(crate) fn retain_providers(&mut self, keep: impl Fn(&DataProviderId) -> bool) {
        self.providers.retain(|p| keep(p));
    }

    /// Interchange name of this media data variant
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::core(match self.kind {
            MediaDataKind::Audio(_) => "AudioMediaData",
            MediaDataKind::Video => "VideoMediaData",
            MediaDataKind::Image => "ImageMediaData",
            MediaDataKind::Binary => "BinaryMediaData",
        })
    }

    /// Total payload size across all providers
    ///
    /// Fails with `MissingData` if any provider's storage is gone.
    pub fn byte_len(&self, providers: &DataProviderManager) -> Result<u64> {
        self.providers.iter().try_fold(0u64, |total, id| {
            let len = providers
                .byte_len(id)
                .map_err(|e| match e {
                    Error::NotFound(_) => Error::missing_data(id, "provider is not managed"),
                    other => other,
                })?;
            Ok::<u64, Error>(total + len)
        })
    }

    /// Playing time of audio media data; `None` for other kinds
    pub fn duration(&self, providers: &DataProviderManager) -> Result<Option<Duration>> {
        match self.kind {
            MediaDataKind::Audio(format) => Ok(Some(format.duration_of(self.byte_len(providers)?))),
            _ => Ok(None),
        }
    }
}

/// Counted reference to a media data
///
/// Cloning a ref adds one to the media data's reference count, dropping it
/// removes one.
#[derive(Clone)]
pub struct MediaDataRef(Arc<MediaDataId>);

impl MediaDataRef {
    pub fn id(&self) -> &MediaDataId {
        &self.0
    }
}

impl PartialEq for MediaDataRef {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MediaDataRef {}

impl fmt::Debug for MediaDataRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MediaDataRef({})", self.0)
    }
}

#[derive(Debug)]
struct Entry {
    data: MediaData,
    anchor: Arc<MediaDataId>,
}

/// Owner of the media data descriptors of a presentation
#[derive(Debug, Default)]
pub struct MediaDataManager {
    entries: BTreeMap<MediaDataId, Entry>,
}

impl MediaDataManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a media data under its id
    pub fn add_media_data(&mut self, data: MediaData) -> Result<()> {
        if self.entries.contains_key(&data.id) {
            return Err(Error::structural(format!("duplicate media data id {}", data.id)));
        }
        let anchor = Arc::new(data.id.clone());
        self.entries.insert(data.id.clone(), Entry { data, anchor });
        Ok(())
    }

    /// Take a counted reference to a registered media data
    pub fn reference(&self, id: &MediaDataId) -> Result<MediaDataRef> {
        self.entries
            .get(id)
            .map(|entry| MediaDataRef(Arc::clone(&entry.anchor)))
            .ok_or_else(|| Error::not_found(format!("media data {}", id)))
    }

    /// Number of live media pointing at a media data
    pub fn reference_count(&self, id: &MediaDataId) -> Result<usize> {
        self.entries
            .get(id)
            .map(|entry| Arc::strong_count(&entry.anchor) - 1)
            .ok_or_else(|| Error::not_found(format!("media data {}", id)))
    }

    /// Whether `reference` was handed out by this manager
    pub fn owns(&self, reference: &MediaDataRef) -> bool {
        self.entries
            .get(reference.id())
            .map(|entry| Arc::ptr_eq(&entry.anchor, &reference.0))
            .unwrap_or(false)
    }

    pub fn get(&self, id: &MediaDataId) -> Option<&MediaData> {
        self.entries.get(id).map(|entry| &entry.data)
    }

    pub fn contains(&self, id: &MediaDataId) -> bool {
        self.entries.contains_key(id)
    }

    /// Media data in id order
    pub fn iter(&self) -> impl Iterator<Item = &MediaData> {
        self.entries.values().map(|entry| &entry.data)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unregister a media data nothing refers to any more
    pub fn remove_media_data(&mut self, id: &MediaDataId) -> Result<MediaData> {
        let count = self.reference_count(id)?;
        if count > 0 {
            return Err(Error::structural(format!(
                "media data {} is still referenced by {} media",
                id, count
            )));
        }
        self.entries
            .remove(id)
            .map(|entry| entry.data)
            .ok_or_else(|| Error::not_found(format!("media data {}", id)))
    }

    /// Remove every media data whose reference count is zero
    pub(crate) fn collect_unreferenced(&mut self) -> Vec<MediaData> {
        let orphans: Vec<MediaDataId> = self
            .entries
            .iter()
            .filter(|(_, entry)| Arc::strong_count(&entry.anchor) == 1)
            .map(|(id, _)| id.clone())
            .collect();
        orphans
            .iter()
            .filter_map(|id| self.entries.remove(id))
            .map(|entry| entry.data)
            .collect()
    }

    /// Providers used by at least one registered media data
    pub fn referenced_providers(&self) -> HashSet<DataProviderId> {
        self.entries
            .values()
            .flat_map(|entry| entry.data.providers.iter().cloned())
            .collect()
    }
}

impl PartialEq for MediaDataManager {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_count_follows_live_refs() {
        let mut manager = MediaDataManager::new();
        let id = MediaDataId::new("md-1");
        manager
            .add_media_data(MediaData::new(id.clone(), "image/png", MediaDataKind::Image))
            .unwrap();
        assert_eq!(manager.reference_count(&id).unwrap(), 0);

        let first = manager.reference(&id).unwrap();
        let second = first.clone();
        assert_eq!(manager.reference_count(&id).unwrap(), 2);

        drop(first);
        assert_eq!(manager.reference_count(&id).unwrap(), 1);
        assert!(manager.owns(&second));
        drop(second);
        assert_eq!(manager.reference_count(&id).unwrap(), 0);
    }

    #[test]
    fn test_collect_unreferenced_keeps_referenced() {
        let mut manager = MediaDataManager::new();
        let kept = MediaDataId::new("kept");
        let dropped = MediaDataId::new("dropped");
        manager
            .add_media_data(
                MediaData::new(kept.clone(), "image/png", MediaDataKind::Image)
                    .with_provider(DataProviderId::new("dp-kept")),
            )
            .unwrap();
        manager
            .add_media_data(
                MediaData::new(dropped.clone(), "image/png", MediaDataKind::Image)
                    .with_provider(DataProviderId::new("dp-dropped")),
            )
            .unwrap();
        let _hold = manager.reference(&kept).unwrap();

        let collected = manager.collect_unreferenced();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].id(), &dropped);
        assert!(manager.contains(&kept));

        let providers = manager.referenced_providers();
        assert!(providers.contains(&DataProviderId::new("dp-kept")));
        assert!(!providers.contains(&DataProviderId::new("dp-dropped")));
    }

    #[test]
    fn test_remove_refuses_referenced_data() {
        let mut manager = MediaDataManager::new();
        let id = MediaDataId::new("md");
        manager
            .add_media_data(MediaData::new(id.clone(), "video/mp4", MediaDataKind::Video))
            .unwrap();
        let hold = manager.reference(&id).unwrap();
        assert!(matches!(manager.remove_media_data(&id), Err(Error::Structural(_))));
        drop(hold);
        assert!(manager.remove_media_data(&id).is_ok());
    }

    #[test]
    fn test_refs_from_another_manager_are_not_owned() {
        let id = MediaDataId::new("same-id");
        let mut a = MediaDataManager::new();
        let mut b = MediaDataManager::new();
        a.add_media_data(MediaData::new(id.clone(), "image/png", MediaDataKind::Image)).unwrap();
        b.add_media_data(MediaData::new(id.clone(), "image/png", MediaDataKind::Image)).unwrap();

        let foreign = b.reference(&id).unwrap();
        assert!(!a.owns(&foreign));
    }

    #[test]
    fn test_pcm_arithmetic() {
        let format = PcmFormat::new(48_000, 2, 16);
        assert_eq!(format.block_align(), 4);
        assert_eq!(format.byte_rate(), 192_000);
        assert_eq!(format.duration_of(192_000), Duration::from_secs(1));
        assert_eq!(format.bytes_for(Duration::from_millis(500)), 96_000);
        // Partial frames do not count
        assert_eq!(format.duration_of(3), Duration::ZERO);
    }

    #[test]
    fn test_audio_duration_from_providers() {
        let dir = tempfile::tempdir().unwrap();
        let mut providers = DataProviderManager::new(dir.path());
        let format = PcmFormat::new(8_000, 1, 16);
        let first = providers.create_data_provider("audio/x-wav");
        let second = providers.create_data_provider("audio/x-wav");
        providers.write_all(&first, &vec![0u8; 16_000]).unwrap();
        providers.write_all(&second, &vec![0u8; 8_000]).unwrap();

        let data = MediaData::audio(
            MediaDataId::new("md"),
            "audio/x-wav",
            format,
            vec![first.clone(), second],
        );
        assert_eq!(
            data.duration(&providers).unwrap(),
            Some(Duration::from_millis(1_500))
        );

        std::fs::remove_file(providers.path_of(&first).unwrap()).unwrap();
        assert!(matches!(
            data.duration(&providers),
            Err(Error::MissingData { .. })
        ));
    }
}
