use thiserror::Error;

use crate::media::TrackKind;

/// Main error type for the transcode pipeline
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("platform capability missing: {0}")]
    UnsupportedPlatform(String),

    #[error("no supported {0} codec configuration")]
    Negotiation(TrackKind),

    #[error("source load failed: {0}")]
    SourceLoad(String),

    #[error("source has no {0} track")]
    TrackMissing(TrackKind),

    #[error("encoder protocol violation: {0}")]
    EncoderProtocol(String),

    #[error("playback failed: {0}")]
    Playback(String),

    #[error("encoder error: {0}")]
    Encoder(String),

    #[error("muxing error: {0}")]
    Muxing(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscodeError {
    /// Whether the run can proceed in degraded form instead of aborting.
    ///
    /// Only audio-side negotiation and audio track absence are recoverable;
    /// the pipeline drops the audio track and continues video-only.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            TranscodeError::Negotiation(TrackKind::Audio)
                | TranscodeError::TrackMissing(TrackKind::Audio)
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TranscodeError>;
