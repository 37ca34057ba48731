//! Track ingestion
//!
//! Wraps a live media track as a cancellable pull source producing an
//! ordered, finite, non-restartable sequence of raw frames/samples. The
//! source does not buffer ahead; each pulled frame is owned by the consumer
//! and must be released after use.

use tokio::sync::{mpsc, oneshot};

use crate::media::{AudioAttributes, Frame, SourceDescriptor, TrackKind};

/// Terminal signal of the driving clock, fired exactly once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEnd {
    Ended,
    Error(String),
}

/// Decode/capture collaborator contract
///
/// Provides source metadata, pull-based per-track frame channels, the
/// driving clock position, and the one-shot completion signal. Track
/// channels and the completion signal are take-once; the source closes the
/// track channels when the driving clock reaches its end.
pub trait MediaSource: Send {
    fn descriptor(&self) -> SourceDescriptor;

    /// Take the video frame channel. `None` if absent or already taken.
    fn take_video(&mut self) -> Option<mpsc::Receiver<Frame>>;

    /// Take the audio sample channel. `None` if absent or already taken.
    fn take_audio(&mut self) -> Option<mpsc::Receiver<Frame>>;

    /// Take the completion signal. Fired exactly once with `Ended` or
    /// `Error`; a dropped sender counts as `Ended`.
    fn take_completion(&mut self) -> Option<oneshot::Receiver<SourceEnd>>;

    /// Current position of the driving clock in microseconds, if playing.
    fn position_us(&self) -> Option<i64>;

    /// Stop the underlying tracks. Idempotent; called on both completion
    /// and abort.
    fn stop(&mut self);
}

/// Pull-based consumer of one track
///
/// Holds at most one buffered frame in an explicit lookahead slot, filled by
/// the audio attribute probe and drained by the next pull.
pub struct TrackIngestor {
    kind: TrackKind,
    rx: mpsc::Receiver<Frame>,
    lookahead: Option<Frame>,
    pulled: u64,
    stopped: bool,
}

impl TrackIngestor {
    pub fn new(kind: TrackKind, rx: mpsc::Receiver<Frame>) -> Self {
        Self {
            kind,
            rx,
            lookahead: None,
            pulled: 0,
            stopped: false,
        }
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Total frames pulled from the source so far, including any frame
    /// currently held in the lookahead slot.
    pub fn pulled(&self) -> u64 {
        self.pulled
    }

    /// Pull the next frame in capture order. Yields the lookahead frame
    /// first if one is buffered; returns `None` at end of stream.
    pub async fn next(&mut self) -> Option<Frame> {
        if self.stopped {
            return None;
        }
        if let Some(frame) = self.lookahead.take() {
            return Some(frame);
        }
        let frame = self.rx.recv().await;
        if frame.is_some() {
            self.pulled += 1;
        }
        frame
    }

    /// Resolve audio attributes by pulling at most one sample.
    ///
    /// If the sample carries attributes it is kept in the lookahead slot and
    /// becomes the first sample encoded. If attributes are still unknown the
    /// sample is released and `None` is returned; the caller must disable
    /// audio for the run.
    pub async fn probe_audio_attributes(&mut self) -> Option<AudioAttributes> {
        debug_assert!(self.lookahead.is_none(), "probe with occupied lookahead");
        let frame = self.rx.recv().await?;
        self.pulled += 1;
        match frame.audio_attributes() {
            Some(attrs) => {
                tracing::debug!(
                    sample_rate = attrs.sample_rate,
                    channels = attrs.channels,
                    "audio attributes resolved from first sample"
                );
                self.lookahead = Some(frame);
                Some(attrs)
            }
            None => {
                tracing::warn!("first audio sample carries no attributes; discarding");
                frame.close();
                None
            }
        }
    }

    /// Cancel the sequence: release the lookahead frame and everything
    /// still queued, and refuse further pulls.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.rx.close();
        if let Some(frame) = self.lookahead.take() {
            frame.close();
        }
        while let Ok(frame) = self.rx.try_recv() {
            frame.close();
        }
    }
}

impl Drop for TrackIngestor {
    fn drop(&mut self) {
        self.stop();
    }
}
