//! Container writer seam
//!
//! The muxing library is an external collaborator; the pipeline drives it
//! through these traits. The writer is constructed with its track layout up
//! front, accepts encoded chunks strictly sequentially from a single funnel
//! point, and finalizes at most once.

use bytes::Bytes;

use crate::error::{Result, TranscodeError};
use crate::media::{EncodedUnit, TrackKind, TrackMetadata};

/// Video track layout passed to the writer at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTrackConfig {
    pub codec: String,
    pub width: u32,
    pub height: u32,
}

/// Audio track layout passed to the writer at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrackConfig {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
}

pub type BoxedWriter = Box<dyn ContainerWriter + Send>;

/// Assembles encoded chunks into the output container
pub trait ContainerWriter: Send {
    fn add_video(&mut self, unit: &EncodedUnit, metadata: &TrackMetadata) -> Result<()>;

    fn add_audio(&mut self, unit: &EncodedUnit, metadata: &TrackMetadata) -> Result<()>;

    /// Produce the complete container bytes. One-shot; consuming the writer
    /// makes reuse impossible.
    fn finalize(self: Box<Self>) -> Result<Bytes>;
}

/// Constructs a writer once the negotiated track layout is known
pub trait ContainerFactory: Send + Sync {
    fn create(
        &self,
        video: &VideoTrackConfig,
        audio: Option<&AudioTrackConfig>,
    ) -> Result<BoxedWriter>;
}

/// Sticky per-track metadata for the writer funnel
///
/// Encoders may omit metadata after a track's first unit; the latch replays
/// the last seen value. A unit arriving before any metadata has ever been
/// seen is an upstream contract breach and fails the run.
#[derive(Debug)]
pub struct MetadataLatch {
    kind: TrackKind,
    current: Option<TrackMetadata>,
}

impl MetadataLatch {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            current: None,
        }
    }

    pub fn absorb(&mut self, incoming: Option<TrackMetadata>) -> Result<&TrackMetadata> {
        if let Some(metadata) = incoming {
            self.current = Some(metadata);
        }
        self.current.as_ref().ok_or_else(|| {
            TranscodeError::EncoderProtocol(format!(
                "{} unit arrived before any track metadata",
                self.kind
            ))
        })
    }
}
