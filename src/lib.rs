//! mp4press — streaming transcode pipeline
//!
//! Turns a decoded source media track into a compact output container:
//! codec capability negotiation with ordered fallback, synchronized
//! dual-track (video + audio) encoding under producer/consumer
//! backpressure, timestamp-based progress accounting, and graceful
//! degradation when a track or feature is unavailable.
//!
//! The decode/capture source, the encoders, and the container writer are
//! external collaborators injected through the [`ingest::MediaSource`],
//! [`encode::EncoderBackend`], and [`sink::ContainerFactory`] traits. One
//! [`pipeline::EncodePipeline`] performs exactly one conversion.

pub mod config;
pub mod encode;
pub mod error;
pub mod ingest;
pub mod media;
pub mod negotiate;
pub mod params;
pub mod pipeline;
pub mod progress;
pub mod sink;

#[cfg(test)]
pub(crate) mod tests;

pub use config::{ConversionOptions, PipelineConfig, QualityPreset, SpeedPreset};
pub use encode::{BoxedEncoder, EncoderBackend, EncoderOutput, EncoderOutputSender, TrackEncoder};
pub use error::{Result, TranscodeError};
pub use ingest::{MediaSource, SourceEnd, TrackIngestor};
pub use media::{
    AudioAttributes, EncodedUnit, Frame, SourceDescriptor, TrackKind, TrackMetadata,
};
pub use negotiate::{
    negotiate, CodecConfiguration, CodecSupport, CodecVerdict, HardwareAcceleration, LatencyMode,
    TrackParams,
};
pub use params::{derive_parameters, EncodeParameters};
pub use pipeline::{ConversionOutput, EncodePipeline};
pub use progress::{ProgressTracker, ProgressUpdate, RunStatus};
pub use sink::{
    AudioTrackConfig, BoxedWriter, ContainerFactory, ContainerWriter, VideoTrackConfig,
};
