//! Conversion and pipeline configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TranscodeError};
use crate::negotiate::LatencyMode;

/// Output quality preset selected by the caller before a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    High,
    #[default]
    Balanced,
    Small,
}

impl QualityPreset {
    /// Multiplier applied to the derived video bitrate
    pub fn bitrate_scale(self) -> f64 {
        match self {
            QualityPreset::High => 1.5,
            QualityPreset::Balanced => 1.0,
            QualityPreset::Small => 0.6,
        }
    }

    /// Fixed audio bitrate in bits/sec for this preset
    pub fn audio_bitrate(self) -> u64 {
        match self {
            QualityPreset::High => 192_000,
            QualityPreset::Balanced => 128_000,
            QualityPreset::Small => 96_000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityPreset::High => "High quality",
            QualityPreset::Balanced => "Balanced",
            QualityPreset::Small => "Small file",
        }
    }
}

/// Encode speed preset: trades latency mode and keyframe cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeedPreset {
    Fast,
    #[default]
    Standard,
    Quality,
}

impl SpeedPreset {
    pub fn latency_mode(self) -> LatencyMode {
        match self {
            SpeedPreset::Fast => LatencyMode::Realtime,
            SpeedPreset::Standard | SpeedPreset::Quality => LatencyMode::Quality,
        }
    }

    /// Target keyframe interval in seconds
    pub fn gop_seconds(self) -> f64 {
        match self {
            SpeedPreset::Fast => 2.0,
            SpeedPreset::Standard => 2.5,
            SpeedPreset::Quality => 4.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpeedPreset::Fast => "Fastest encode",
            SpeedPreset::Standard => "Standard",
            SpeedPreset::Quality => "Best quality",
        }
    }
}

/// Caller-supplied options for one conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    pub quality: QualityPreset,
    pub speed: SpeedPreset,
    pub include_audio: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Balanced,
            speed: SpeedPreset::Standard,
            include_audio: true,
        }
    }
}

impl ConversionOptions {
    /// Load options from a TOML file; missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&text).map_err(|e| {
            TranscodeError::Config(format!(
                "failed to parse {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }
}

/// Pipeline tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pending-submission threshold for the video encoder before the encode
    /// task yields
    pub video_queue_depth: usize,
    /// Pending-submission threshold for the audio encoder before the encode
    /// task yields
    pub audio_queue_depth: usize,
    /// Interval of the clock-driven progress sampler in milliseconds
    pub progress_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            video_queue_depth: 12,
            audio_queue_depth: 20,
            progress_interval_ms: 200,
        }
    }
}

impl PipelineConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }
}
