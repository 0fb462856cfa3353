//! Audio capture devices
//!
//! The core never talks to recording hardware. A host wraps its device in an
//! [`AudioCapture`] and hands it to [`record_to_provider`], which drains the
//! device into a fresh data provider and describes the result as audio media
//! data.

use crate::error::{Error, Result};
use crate::ids::MediaDataId;
use crate::media_data::{MediaData, MediaDataRef, PcmFormat};
use crate::presentation::Presentation;
use crate::progress::ProgressNotifier;

/// Mime type of recorded payloads
pub const RECORDING_MIME_TYPE: &str = "audio/x-wav";

/// Lifecycle of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Paused,
    /// The device delivered its last chunk
    Ended,
}

/// A source of PCM audio, typically a microphone
///
/// Chunks are raw interleaved PCM in the device's [`PcmFormat`].
pub trait AudioCapture {
    fn format(&self) -> PcmFormat;

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn resume(&mut self) -> Result<()>;

    /// Next chunk of captured bytes; empty when nothing is buffered yet
    fn read_chunk(&mut self) -> Result<Vec<u8>>;

    fn state(&self) -> CaptureState;

    /// Whether the device reported the end of the recording
    fn has_ended(&self) -> bool {
        self.state() == CaptureState::Ended
    }
}

/// Record from `device` until it ends, into a new provider
///
/// Returns a reference to the new audio media data; bind it to a channel
/// before the next sweep or it is collected again. Progress is reported per
/// chunk with the byte count so far. If the device fails or the operation is
/// cancelled, the device is stopped and the partial provider removed.
pub fn record_to_provider(
    presentation: &mut Presentation,
    device: &mut dyn AudioCapture,
    progress: &mut ProgressNotifier,
) -> Result<MediaDataRef> {
    presentation.batch(|p| {
        let provider = p.create_data_provider(RECORDING_MIME_TYPE);
        p.data_providers_mut().ensure_storage(&provider)?;
        device.start()?;

        let mut recorded = 0u64;
        let drained = loop {
            if let Err(e) = progress.check() {
                break Err(e);
            }
            let chunk = match device.read_chunk() {
                Ok(chunk) => chunk,
                Err(e) => break Err(e),
            };
            if !chunk.is_empty() {
                if let Err(e) = p.append_data(&provider, |writer| Ok(writer.write_all(&chunk)?)) {
                    break Err(e);
                }
                recorded += chunk.len() as u64;
                if let Err(e) = progress.step("record", recorded, 0) {
                    break Err(e);
                }
            }
            if device.has_ended() {
                break Ok(());
            }
        };

        if let Err(stop) = device.stop() {
            log::warn!("Stopping the capture device failed: {}", stop);
        }
        if let Err(e) = drained {
            // The unreferenced provider goes with the batch's closing sweep
            log::debug!("Recording into provider {} abandoned: {}", provider, e);
            return Err(e);
        }

        log::debug!("Recorded {} bytes into provider {}", recorded, provider);
        let data = MediaData::audio(
            MediaDataId::generate(),
            RECORDING_MIME_TYPE,
            device.format(),
            vec![provider],
        );
        p.add_media_data(data)
    })
}

/// Pause a recording device, or resume a paused one; returns the new state
pub fn toggle_pause(device: &mut dyn AudioCapture) -> Result<CaptureState> {
    match device.state() {
        CaptureState::Recording => device.pause()?,
        CaptureState::Paused => device.resume()?,
        other => {
            return Err(Error::structural(format!(
                "cannot pause or resume a device that is {:?}",
                other
            )))
        }
    }
    Ok(device.state())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Device that replays a fixed list of chunks, then ends
    struct ScriptedCapture {
        chunks: VecDeque<Vec<u8>>,
        state: CaptureState,
        fail_after: Option<usize>,
        reads: usize,
    }

    impl ScriptedCapture {
        fn new(chunks: Vec<Vec<u8>>) -> Self {
            Self {
                chunks: chunks.into(),
                state: CaptureState::Idle,
                fail_after: None,
                reads: 0,
            }
        }
    }

    impl AudioCapture for ScriptedCapture {
        fn format(&self) -> PcmFormat {
            PcmFormat::new(8_000, 1, 8)
        }

        fn start(&mut self) -> Result<()> {
            self.state = CaptureState::Recording;
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            if self.state != CaptureState::Ended {
                self.state = CaptureState::Idle;
            }
            Ok(())
        }

        fn pause(&mut self) -> Result<()> {
            self.state = CaptureState::Paused;
            Ok(())
        }

        fn resume(&mut self) -> Result<()> {
            self.state = CaptureState::Recording;
            Ok(())
        }

        fn read_chunk(&mut self) -> Result<Vec<u8>> {
            self.reads += 1;
            if Some(self.reads) == self.fail_after.map(|n| n + 1) {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "device unplugged",
                )));
            }
            let chunk = self.chunks.pop_front().unwrap_or_default();
            if self.chunks.is_empty() {
                self.state = CaptureState::Ended;
            }
            Ok(chunk)
        }

        fn state(&self) -> CaptureState {
            self.state
        }
    }

    fn presentation() -> (tempfile::TempDir, Presentation) {
        let dir = tempfile::tempdir().unwrap();
        let p = Presentation::new("Test", dir.path().join("data"));
        (dir, p)
    }

    #[test]
    fn test_record_until_device_ends() {
        let (_dir, mut p) = presentation();
        let mut device = ScriptedCapture::new(vec![vec![1; 4000], Vec::new(), vec![2; 4000]]);
        let mut progress = ProgressNotifier::new();

        let data = record_to_provider(&mut p, &mut device, &mut progress).unwrap();
        let media_data = p.media_data().get(data.id()).unwrap();
        assert_eq!(media_data.byte_len(p.data_providers()).unwrap(), 8000);
        assert_eq!(
            media_data.duration(p.data_providers()).unwrap(),
            Some(std::time::Duration::from_secs(1))
        );
        assert_eq!(device.state(), CaptureState::Ended);
    }

    #[test]
    fn test_failed_device_leaves_nothing() {
        let (_dir, mut p) = presentation();
        let mut device = ScriptedCapture::new(vec![vec![1; 10], vec![2; 10], vec![3; 10]]);
        device.fail_after = Some(1);
        let mut progress = ProgressNotifier::new();

        assert!(matches!(
            record_to_provider(&mut p, &mut device, &mut progress),
            Err(Error::Io(_))
        ));
        assert!(p.data_providers().is_empty());
        assert!(p.media_data().is_empty());
        assert_eq!(device.state(), CaptureState::Idle);
    }

    #[test]
    fn test_cancelled_recording() {
        let (_dir, mut p) = presentation();
        let mut device = ScriptedCapture::new(vec![vec![1; 10], vec![2; 10]]);
        let mut progress = ProgressNotifier::new();
        progress.subscribe(|event| event.cancel());

        assert!(matches!(
            record_to_provider(&mut p, &mut device, &mut progress),
            Err(Error::Cancelled)
        ));
        assert!(p.data_providers().is_empty());
    }

    #[test]
    fn test_toggle_pause() {
        let mut device = ScriptedCapture::new(vec![vec![0; 2]]);
        assert!(toggle_pause(&mut device).is_err());
        device.start().unwrap();
        assert_eq!(toggle_pause(&mut device).unwrap(), CaptureState::Paused);
        assert_eq!(toggle_pause(&mut device).unwrap(), CaptureState::Recording);
    }
}
