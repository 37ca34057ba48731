//! Encoder seam
//!
//! The encode primitives themselves live in a lower-level media toolkit;
//! this module defines the traits the pipeline drives them through. Encoder
//! output flows through an explicit per-track channel instead of callbacks,
//! so the orchestrator consumes encoded units from a single place.

use tokio::sync::mpsc;

use crate::error::Result;
use crate::media::{EncodedUnit, Frame, TrackMetadata};
use crate::negotiate::{CodecConfiguration, CodecSupport};

/// One encoded unit plus, on the first unit of a track, its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderOutput {
    pub unit: EncodedUnit,
    /// May be omitted after the first unit; the writer funnel reuses the
    /// most recently seen value per track.
    pub metadata: Option<TrackMetadata>,
}

pub type EncoderOutputSender = mpsc::UnboundedSender<EncoderOutput>;
pub type EncoderOutputReceiver = mpsc::UnboundedReceiver<EncoderOutput>;

pub type BoxedEncoder = Box<dyn TrackEncoder + Send>;

/// A configured encoder for one track
pub trait TrackEncoder: Send {
    /// Submit one raw frame, optionally forcing a keyframe. Encoded units
    /// are delivered on the output channel the encoder was opened with.
    fn submit(&mut self, frame: &Frame, keyframe: bool) -> Result<()>;

    /// Number of submitted frames not yet emitted as encoded units.
    fn pending(&self) -> usize;

    /// Emit all internally buffered units to the output channel and close.
    /// The encoder must not be used after a flush.
    fn flush(&mut self) -> Result<()>;
}

/// Platform encoder backend: capability probe plus encoder construction
pub trait EncoderBackend: CodecSupport + Send + Sync {
    fn open_video(
        &self,
        config: &CodecConfiguration,
        output: EncoderOutputSender,
    ) -> Result<BoxedEncoder>;

    fn open_audio(
        &self,
        config: &CodecConfiguration,
        output: EncoderOutputSender,
    ) -> Result<BoxedEncoder>;
}
