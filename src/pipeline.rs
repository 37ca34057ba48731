//! Encode pipeline orchestration
//!
//! The central orchestrator of one conversion run:
//! - negotiates codec configurations for each requested track
//! - runs one encode task per enabled track concurrently, with a keyframe
//!   cadence and cooperative queue-depth backpressure
//! - funnels encoder output into the container writer from a single point
//! - flushes and finalizes on source exhaustion, or aborts with full
//!   resource release on any fatal error
//!
//! Scheduling is cooperative: the track tasks, the writer funnel, and the
//! clock-driven progress sampler interleave inside one future via
//! `join!`/`select!`; there are no OS-level threads involved.

use std::pin::pin;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::config::{ConversionOptions, PipelineConfig};
use crate::encode::{BoxedEncoder, EncoderBackend, EncoderOutputReceiver};
use crate::error::{Result, TranscodeError};
use crate::ingest::{MediaSource, SourceEnd, TrackIngestor};
use crate::media::{AudioAttributes, SourceDescriptor, TrackKind};
use crate::negotiate::{audio_candidates, negotiate, video_candidates, CodecConfiguration};
use crate::params::{derive_parameters, EncodeParameters};
use crate::progress::{ProgressReporter, ProgressUpdate, RunStatus};
use crate::sink::{
    AudioTrackConfig, BoxedWriter, ContainerFactory, MetadataLatch, VideoTrackConfig,
};

/// The complete output of a successful run
#[derive(Debug)]
pub struct ConversionOutput {
    /// Finalized container bytes
    pub data: Bytes,
    pub size: usize,
    pub video_frames: u64,
    pub audio_samples: u64,
    /// False when audio was requested but disabled during the run
    pub audio_enabled: bool,
}

/// Single-use conversion pipeline
///
/// Owns the negotiated configurations, the per-track tasks, and the
/// container writer for the duration of one run. `convert` consumes the
/// pipeline, so a run cannot be reentered.
pub struct EncodePipeline<B, C> {
    backend: B,
    container: C,
    config: PipelineConfig,
    run_id: Uuid,
    reporter: Arc<ProgressReporter>,
}

impl<B: EncoderBackend, C: ContainerFactory> EncodePipeline<B, C> {
    pub fn new(backend: B, container: C) -> Self {
        Self::with_config(backend, container, PipelineConfig::default())
    }

    pub fn with_config(backend: B, container: C, config: PipelineConfig) -> Self {
        Self {
            backend,
            container,
            config,
            run_id: Uuid::new_v4(),
            reporter: ProgressReporter::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Subscribe to `{status, percent}` updates before starting the run.
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<ProgressUpdate> {
        self.reporter.subscribe()
    }

    /// Run the conversion to completion.
    ///
    /// Fatal errors abort the run: tasks stop, every outstanding frame is
    /// released, the source is stopped, and the writer is dropped
    /// unfinalized. Cleanup is unconditional on both paths.
    pub async fn convert<S: MediaSource>(
        self,
        mut source: S,
        options: &ConversionOptions,
    ) -> Result<ConversionOutput> {
        tracing::info!(
            run = %self.run_id,
            quality = ?options.quality,
            speed = ?options.speed,
            include_audio = options.include_audio,
            "starting conversion"
        );
        let result = self.run(&mut source, options).await;
        source.stop();
        match &result {
            Ok(output) => {
                self.reporter.finish();
                tracing::info!(
                    run = %self.run_id,
                    size = output.size,
                    video_frames = output.video_frames,
                    audio_samples = output.audio_samples,
                    "conversion finalized"
                );
            }
            Err(error) => {
                self.reporter.set_status(RunStatus::Failed);
                tracing::error!(run = %self.run_id, %error, "conversion failed");
            }
        }
        result
    }

    async fn run<S: MediaSource>(
        &self,
        source: &mut S,
        options: &ConversionOptions,
    ) -> Result<ConversionOutput> {
        if !self.backend.available() {
            return Err(TranscodeError::UnsupportedPlatform(
                "no encoder backend available".into(),
            ));
        }

        let descriptor = source.descriptor();
        self.reporter.set_duration(descriptor.duration_secs);
        self.reporter.set_status(RunStatus::Negotiating);

        if !descriptor.has_video {
            return Err(TranscodeError::TrackMissing(TrackKind::Video));
        }

        let params = derive_parameters(&descriptor, options.quality, options.speed);
        tracing::debug!(
            run = %self.run_id,
            width = params.width,
            height = params.height,
            video_bitrate = params.video_bitrate,
            keyframe_interval = params.keyframe_interval,
            "derived encode parameters"
        );

        let video_config = negotiate(
            &self.backend,
            &video_candidates(&params, options.speed.latency_mode()),
        )
        .ok_or(TranscodeError::Negotiation(TrackKind::Video))?;
        tracing::debug!(run = %self.run_id, codec = %video_config.codec, "video configuration negotiated");

        let video_rx = source
            .take_video()
            .ok_or(TranscodeError::TrackMissing(TrackKind::Video))?;
        let video_ingestor = TrackIngestor::new(TrackKind::Video, video_rx);

        let mut audio = None;
        if options.include_audio {
            audio = self.prepare_audio(source, &descriptor, &params).await;
            if audio.is_none() {
                tracing::warn!(run = %self.run_id, "audio unavailable; continuing video-only");
            }
        }

        // Writer layout is fixed before any encoding starts.
        let writer_video = VideoTrackConfig {
            codec: video_config.codec.clone(),
            width: params.width,
            height: params.height,
        };
        let writer_audio = audio.as_ref().map(|(_, config, attrs)| AudioTrackConfig {
            codec: config.codec.clone(),
            sample_rate: attrs.sample_rate,
            channels: attrs.channels,
        });
        let writer = self.container.create(&writer_video, writer_audio.as_ref())?;

        let (video_out_tx, video_out_rx) = mpsc::unbounded_channel();
        let video_encoder = self.backend.open_video(&video_config, video_out_tx)?;

        let mut audio_out_rx = None;
        let mut audio_ctx = None;
        if let Some((ingestor, config, _)) = audio {
            let (tx, rx) = mpsc::unbounded_channel();
            let encoder = self.backend.open_audio(&config, tx)?;
            audio_out_rx = Some(rx);
            audio_ctx = Some((ingestor, encoder));
        }

        let (mut completion, mut clock_done) = match source.take_completion() {
            Some(rx) => (rx, false),
            None => {
                // Source offers no clock signal; rely on track exhaustion.
                let (_tx, rx) = oneshot::channel();
                (rx, true)
            }
        };

        self.reporter.set_status(RunStatus::Encoding);

        let video_task = run_track(
            video_ingestor,
            video_encoder,
            TrackKind::Video,
            Some(params.keyframe_interval),
            self.config.video_queue_depth,
            Arc::clone(&self.reporter),
        );
        let audio_depth = self.config.audio_queue_depth;
        let audio_reporter = Arc::clone(&self.reporter);
        let audio_task = async move {
            match audio_ctx {
                Some((ingestor, encoder)) => run_track(
                    ingestor,
                    encoder,
                    TrackKind::Audio,
                    None,
                    audio_depth,
                    audio_reporter,
                )
                .await
                .map(Some),
                None => Ok(None),
            }
        };

        // try_join short-circuits: the first fatal track error drops the
        // sibling task, which releases its ingestor and queued frames.
        let mut encode = pin!(async move { tokio::try_join!(video_task, audio_task) });
        let mut funnel = pin!(run_funnel(writer, video_out_rx, audio_out_rx));
        let mut sampler = tokio::time::interval(self.config.progress_interval());
        sampler.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let (mut video_encoder, video_frames, audio_done) = loop {
            tokio::select! {
                res = &mut encode => {
                    let ((encoder, frames), audio_done) = res?;
                    break (encoder, frames, audio_done);
                }
                res = &mut funnel => {
                    // Only reachable on a writer or protocol error; the
                    // funnel cannot drain to completion while encoders hold
                    // their output senders.
                    return Err(match res {
                        Err(e) => e,
                        Ok(_) => TranscodeError::Muxing("writer funnel ended early".into()),
                    });
                }
                end = &mut completion, if !clock_done => {
                    clock_done = true;
                    match end {
                        Ok(SourceEnd::Error(message)) => {
                            return Err(TranscodeError::Playback(message));
                        }
                        Ok(SourceEnd::Ended) | Err(_) => {
                            tracing::debug!(run = %self.run_id, "driving clock ended");
                        }
                    }
                }
                _ = sampler.tick() => {
                    self.reporter.observe_timestamp(source.position_us());
                }
            }
        };

        self.reporter.set_status(RunStatus::Flushing);
        tracing::debug!(run = %self.run_id, "flushing encoders");
        video_encoder.flush()?;
        drop(video_encoder);
        let (audio_samples, audio_enabled) = match audio_done {
            Some((mut encoder, samples)) => {
                encoder.flush()?;
                (samples, true)
            }
            None => (0, false),
        };

        // All output senders are gone; drain the funnel and take the writer
        // back for finalization.
        let writer = funnel.await?;
        let data = writer.finalize()?;
        let size = data.len();

        Ok(ConversionOutput {
            data,
            size,
            video_frames,
            audio_samples,
            audio_enabled,
        })
    }

    /// Resolve everything audio needs, degrading to `None` on any missing
    /// piece: no track, unknown attributes after one probed sample, or no
    /// supported codec configuration.
    async fn prepare_audio<S: MediaSource>(
        &self,
        source: &mut S,
        descriptor: &SourceDescriptor,
        params: &EncodeParameters,
    ) -> Option<(TrackIngestor, CodecConfiguration, AudioAttributes)> {
        if !descriptor.has_audio {
            tracing::debug!(run = %self.run_id, "source reports no audio track");
            return None;
        }
        let rx = source.take_audio()?;
        let mut ingestor = TrackIngestor::new(TrackKind::Audio, rx);

        let attrs = match descriptor.audio_attributes() {
            Some(attrs) => Some(attrs),
            None => ingestor.probe_audio_attributes().await,
        }?;

        let config = negotiate(&self.backend, &audio_candidates(params, &attrs));
        match config {
            Some(config) => {
                tracing::debug!(run = %self.run_id, codec = %config.codec, "audio configuration negotiated");
                Some((ingestor, config, attrs))
            }
            None => {
                tracing::warn!(run = %self.run_id, "no supported audio codec configuration");
                None
            }
        }
    }
}

/// One per-track encode task: pull, submit with keyframe cadence, account
/// progress, release, and yield under encoder queue pressure.
async fn run_track(
    mut ingestor: TrackIngestor,
    mut encoder: BoxedEncoder,
    kind: TrackKind,
    keyframe_interval: Option<u32>,
    queue_depth: usize,
    reporter: Arc<ProgressReporter>,
) -> Result<(BoxedEncoder, u64)> {
    let mut submitted: u64 = 0;
    while let Some(frame) = ingestor.next().await {
        submitted += 1;
        // 1-based count; a video frame is forced as a keyframe exactly on
        // multiples of the interval.
        let keyframe =
            keyframe_interval.is_some_and(|interval| submitted % u64::from(interval.max(1)) == 0);
        let timestamp = frame.timestamp_us();
        encoder.submit(&frame, keyframe)?;
        reporter.observe_timestamp(timestamp);
        drop(frame);

        if encoder.pending() > queue_depth {
            // Breathing room for the funnel and the other track.
            tokio::task::yield_now().await;
        }
    }
    tracing::debug!(track = %kind, submitted, "track end of stream");
    Ok((encoder, submitted))
}

/// Single funnel point for the container writer: drains both per-track
/// output channels and performs strictly sequential writer calls.
async fn run_funnel(
    mut writer: BoxedWriter,
    mut video_rx: EncoderOutputReceiver,
    audio_rx: Option<EncoderOutputReceiver>,
) -> Result<BoxedWriter> {
    let mut video_latch = MetadataLatch::new(TrackKind::Video);
    let mut audio_latch = MetadataLatch::new(TrackKind::Audio);
    let mut video_open = true;
    let (mut audio_rx, mut audio_open) = match audio_rx {
        Some(rx) => (rx, true),
        None => {
            let (_tx, rx) = mpsc::unbounded_channel();
            (rx, false)
        }
    };

    loop {
        tokio::select! {
            out = video_rx.recv(), if video_open => match out {
                Some(out) => {
                    let metadata = video_latch.absorb(out.metadata)?;
                    writer.add_video(&out.unit, metadata)?;
                }
                None => video_open = false,
            },
            out = audio_rx.recv(), if audio_open => match out {
                Some(out) => {
                    let metadata = audio_latch.absorb(out.metadata)?;
                    writer.add_audio(&out.unit, metadata)?;
                }
                None => audio_open = false,
            },
            else => break,
        }
    }

    Ok(writer)
}
