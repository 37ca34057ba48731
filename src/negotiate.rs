//! Codec capability negotiation
//!
//! Probes an ordered list of codec configuration candidates against the
//! platform encoder and picks the first supported one. Candidate order
//! encodes the fallback policy: increasingly conservative profiles and
//! hardware-acceleration hints before giving up.

use serde::{Deserialize, Serialize};

use crate::media::{AudioAttributes, TrackKind};
use crate::params::EncodeParameters;

/// AAC-LC codec string
pub const AAC_LC: &str = "mp4a.40.2";
/// Opus codec string
pub const OPUS: &str = "opus";

const AVC_PROFILE_BASELINE: u8 = 0x42;
const AVC_PROFILE_MAIN: u8 = 0x4d;
const AVC_PROFILE_HIGH: u8 = 0x64;

/// Encoder latency mode hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyMode {
    Realtime,
    Quality,
}

/// Hardware acceleration preference hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HardwareAcceleration {
    NoPreference,
    PreferHardware,
    PreferSoftware,
}

/// Track-class-specific encode parameters of a candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackParams {
    Video {
        width: u32,
        height: u32,
        bitrate: u64,
        frame_rate: f64,
    },
    Audio {
        sample_rate: u32,
        channels: u16,
        bitrate: u64,
    },
}

/// One codec configuration candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecConfiguration {
    pub codec: String,
    pub params: TrackParams,
    pub hardware: Option<HardwareAcceleration>,
    pub latency: Option<LatencyMode>,
}

impl CodecConfiguration {
    pub fn kind(&self) -> TrackKind {
        match self.params {
            TrackParams::Video { .. } => TrackKind::Video,
            TrackParams::Audio { .. } => TrackKind::Audio,
        }
    }
}

/// Platform verdict on a single candidate
#[derive(Debug, Clone, PartialEq)]
pub enum CodecVerdict {
    Rejected,
    Accepted,
    /// Supported, with the platform's own normalized form of the candidate
    Normalized(CodecConfiguration),
}

/// Capability probe injected into the negotiator
///
/// Implemented by encoder backends; tests substitute fake platforms without
/// touching global state.
pub trait CodecSupport {
    /// Whether the platform offers encoding at all. A `false` here aborts
    /// the run before negotiation starts.
    fn available(&self) -> bool {
        true
    }

    fn query(&self, config: &CodecConfiguration) -> CodecVerdict;
}

/// Return the first supported candidate, preferring the platform's
/// normalized form when offered. `None` means no candidate is supported.
pub fn negotiate(
    support: &dyn CodecSupport,
    candidates: &[CodecConfiguration],
) -> Option<CodecConfiguration> {
    for candidate in candidates {
        match support.query(candidate) {
            CodecVerdict::Accepted => {
                tracing::debug!(codec = %candidate.codec, "codec candidate accepted");
                return Some(candidate.clone());
            }
            CodecVerdict::Normalized(config) => {
                tracing::debug!(
                    codec = %candidate.codec,
                    normalized = %config.codec,
                    "codec candidate accepted with platform normalization"
                );
                return Some(config);
            }
            CodecVerdict::Rejected => {
                tracing::debug!(codec = %candidate.codec, "codec candidate rejected");
            }
        }
    }
    None
}

/// AVC level byte for a resolution, by pixel count.
pub fn avc_level_for(width: u32, height: u32) -> u8 {
    let pixels = u64::from(width) * u64::from(height);
    if pixels <= 130_000 {
        21 // 2.1
    } else if pixels <= 414_720 {
        30 // 3.0
    } else if pixels <= 921_600 {
        31 // 3.1
    } else if pixels <= 2_073_600 {
        40 // 4.0
    } else if pixels <= 8_847_360 {
        51 // 5.1
    } else {
        52 // 5.2
    }
}

fn avc_codec_string(profile: u8, level: u8) -> String {
    format!("avc1.{:02x}00{:02x}", profile, level)
}

/// Ordered video candidates: High profile preferring hardware, then Main
/// with no preference, then Baseline preferring software.
pub fn video_candidates(
    params: &EncodeParameters,
    latency: LatencyMode,
) -> Vec<CodecConfiguration> {
    let level = avc_level_for(params.width, params.height);
    let track_params = TrackParams::Video {
        width: params.width,
        height: params.height,
        bitrate: params.video_bitrate,
        frame_rate: params.frame_rate,
    };
    let candidate = |profile: u8, hardware: HardwareAcceleration| CodecConfiguration {
        codec: avc_codec_string(profile, level),
        params: track_params.clone(),
        hardware: Some(hardware),
        latency: Some(latency),
    };

    vec![
        candidate(AVC_PROFILE_HIGH, HardwareAcceleration::PreferHardware),
        candidate(AVC_PROFILE_MAIN, HardwareAcceleration::NoPreference),
        candidate(AVC_PROFILE_BASELINE, HardwareAcceleration::PreferSoftware),
    ]
}

/// Ordered audio candidates: AAC-LC, then Opus.
pub fn audio_candidates(
    params: &EncodeParameters,
    attrs: &AudioAttributes,
) -> Vec<CodecConfiguration> {
    let track_params = TrackParams::Audio {
        sample_rate: attrs.sample_rate,
        channels: attrs.channels,
        bitrate: params.audio_bitrate,
    };
    [AAC_LC, OPUS]
        .into_iter()
        .map(|codec| CodecConfiguration {
            codec: codec.to_string(),
            params: track_params.clone(),
            hardware: None,
            latency: None,
        })
        .collect()
}
