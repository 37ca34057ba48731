//! Core media types shared across the pipeline
//!
//! This module defines:
//! - Track classification and source metadata
//! - Raw frames/samples with explicit release-exactly-once semantics
//! - Encoded units and their per-track metadata

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Track class of a media stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
        }
    }
}

/// Audio sample attributes, resolved from static track settings or by
/// probing the first pulled sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioAttributes {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl AudioAttributes {
    pub fn new(sample_rate: u32, channels: u16) -> Option<Self> {
        if sample_rate == 0 || channels == 0 {
            return None;
        }
        Some(Self {
            sample_rate,
            channels,
        })
    }
}

/// Measured properties of the decoded source
///
/// Dimensions, frame rate and duration may be unknown until probed; audio
/// sample attributes are resolved lazily (see `TrackIngestor`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<f64>,
    /// Total duration in seconds, if known
    pub duration_secs: Option<f64>,
    pub has_video: bool,
    pub has_audio: bool,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl SourceDescriptor {
    /// Audio attributes from static track settings, if both are known.
    pub fn audio_attributes(&self) -> Option<AudioAttributes> {
        AudioAttributes::new(self.sample_rate?, self.channels?)
    }
}

/// Release hook invoked exactly once when a frame is closed or dropped
pub type ReleaseHook = Box<dyn FnOnce() + Send>;

/// A raw frame or audio sample pulled from a track
///
/// Ownership transfers to the consumer on pull; the consumer must release it
/// after use to bound memory. Release runs exactly once, either via
/// [`Frame::close`] or on drop.
pub struct Frame {
    data: Bytes,
    timestamp_us: Option<i64>,
    duration_us: Option<i64>,
    audio: Option<AudioAttributes>,
    release: Option<ReleaseHook>,
}

impl Frame {
    pub fn new(data: Bytes, timestamp_us: Option<i64>) -> Self {
        Self {
            data,
            timestamp_us,
            duration_us: None,
            audio: None,
            release: None,
        }
    }

    pub fn with_duration(mut self, duration_us: i64) -> Self {
        self.duration_us = Some(duration_us);
        self
    }

    pub fn with_audio_attributes(mut self, attrs: AudioAttributes) -> Self {
        self.audio = Some(attrs);
        self
    }

    pub fn with_release_hook(mut self, hook: ReleaseHook) -> Self {
        self.release = Some(hook);
        self
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Presentation timestamp in microseconds, if the source stamped one
    pub fn timestamp_us(&self) -> Option<i64> {
        self.timestamp_us
    }

    pub fn duration_us(&self) -> Option<i64> {
        self.duration_us
    }

    /// Sample attributes carried by this frame (audio samples only)
    pub fn audio_attributes(&self) -> Option<AudioAttributes> {
        self.audio
    }

    /// Explicitly release the frame's underlying resources.
    pub fn close(self) {
        // Drop runs the release hook.
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if let Some(hook) = self.release.take() {
            hook();
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("len", &self.data.len())
            .field("timestamp_us", &self.timestamp_us)
            .field("duration_us", &self.duration_us)
            .field("audio", &self.audio)
            .finish()
    }
}

/// An encoded payload emitted by a track encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedUnit {
    pub data: Bytes,
    /// Presentation timestamp in microseconds
    pub timestamp_us: i64,
    pub duration_us: Option<i64>,
    pub keyframe: bool,
}

/// Per-track metadata required by the container writer
///
/// The encoder emits it with the first unit of a track and may omit it on
/// subsequent units; the writer funnel reuses the most recently seen value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    pub codec: String,
    /// Codec-specific configuration record (e.g. avcC / AudioSpecificConfig)
    pub description: Option<Bytes>,
}

impl TrackMetadata {
    pub fn new(codec: impl Into<String>) -> Self {
        Self {
            codec: codec.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: Bytes) -> Self {
        self.description = Some(description);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counted_frame(counter: &Arc<AtomicUsize>) -> Frame {
        let counter = Arc::clone(counter);
        Frame::new(Bytes::from_static(b"frame"), Some(0))
            .with_release_hook(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
    }

    #[test]
    fn test_frame_release_on_close() {
        let released = Arc::new(AtomicUsize::new(0));
        let frame = counted_frame(&released);
        frame.close();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_frame_release_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        {
            let _frame = counted_frame(&released);
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_audio_attributes_reject_zero() {
        assert!(AudioAttributes::new(0, 2).is_none());
        assert!(AudioAttributes::new(48000, 0).is_none());
        assert_eq!(
            AudioAttributes::new(48000, 2),
            Some(AudioAttributes {
                sample_rate: 48000,
                channels: 2
            })
        );
    }

    #[test]
    fn test_descriptor_audio_attributes_require_both() {
        let mut desc = SourceDescriptor {
            has_audio: true,
            sample_rate: Some(44100),
            ..Default::default()
        };
        assert!(desc.audio_attributes().is_none());
        desc.channels = Some(2);
        assert_eq!(
            desc.audio_attributes(),
            AudioAttributes::new(44100, 2)
        );
    }

    #[test]
    fn test_track_kind_display() {
        assert_eq!(TrackKind::Video.to_string(), "video");
        assert_eq!(TrackKind::Audio.to_string(), "audio");
    }
}
