//! Encode parameter derivation
//!
//! Computes target bitrate, even-dimension resolution, and keyframe interval
//! from the selected presets and measured source properties. All inputs are
//! clamped to sane defaults; derivation never fails.

use serde::{Deserialize, Serialize};

use crate::config::{QualityPreset, SpeedPreset};
use crate::media::SourceDescriptor;

/// Lower bound on the derived video bitrate before quality scaling
pub const MIN_VIDEO_BITRATE: u64 = 1_500_000;

/// Empirical bits per pixel-frame balancing quality against size
pub const BITS_PER_PIXEL_FRAME: f64 = 0.07;

/// Fallback resolution when the source dimensions are unavailable
pub const FALLBACK_WIDTH: u32 = 1280;
pub const FALLBACK_HEIGHT: u32 = 720;

/// Fallback frame rate when the source does not report one
pub const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Derived, per-run encode parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeParameters {
    /// Target width; always even and >= 2
    pub width: u32,
    /// Target height; always even and >= 2
    pub height: u32,
    pub frame_rate: f64,
    /// Video bitrate in bits/sec
    pub video_bitrate: u64,
    /// Audio bitrate in bits/sec, from the quality preset
    pub audio_bitrate: u64,
    /// Keyframe interval in frames; always >= 1
    pub keyframe_interval: u32,
}

/// Floor a dimension to the nearest even integer, never below 2.
fn even_dimension(dim: u32) -> u32 {
    (dim & !1).max(2)
}

/// Derive encode parameters from the source and the selected presets.
pub fn derive_parameters(
    source: &SourceDescriptor,
    quality: QualityPreset,
    speed: SpeedPreset,
) -> EncodeParameters {
    let width = even_dimension(source.width.filter(|w| *w > 0).unwrap_or(FALLBACK_WIDTH));
    let height = even_dimension(source.height.filter(|h| *h > 0).unwrap_or(FALLBACK_HEIGHT));
    let frame_rate = source
        .frame_rate
        .filter(|f| f.is_finite() && *f > 0.0)
        .unwrap_or(FALLBACK_FRAME_RATE);

    let pixel_rate =
        (f64::from(width) * f64::from(height) * frame_rate * BITS_PER_PIXEL_FRAME).round() as u64;
    let video_bitrate =
        (pixel_rate.max(MIN_VIDEO_BITRATE) as f64 * quality.bitrate_scale()).round() as u64;

    let keyframe_interval = ((frame_rate * speed.gop_seconds()).round() as u32).max(1);

    EncodeParameters {
        width,
        height,
        frame_rate,
        video_bitrate,
        audio_bitrate: quality.audio_bitrate(),
        keyframe_interval,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(width: u32, height: u32, frame_rate: f64) -> SourceDescriptor {
        SourceDescriptor {
            width: Some(width),
            height: Some(height),
            frame_rate: Some(frame_rate),
            has_video: true,
            ..Default::default()
        }
    }

    const ALL_QUALITIES: [QualityPreset; 3] = [
        QualityPreset::High,
        QualityPreset::Balanced,
        QualityPreset::Small,
    ];
    const ALL_SPEEDS: [SpeedPreset; 3] = [
        SpeedPreset::Fast,
        SpeedPreset::Standard,
        SpeedPreset::Quality,
    ];

    #[test]
    fn test_dimensions_even_and_bounded() {
        let sources = [
            descriptor(1281, 721, 30.0),
            descriptor(1, 1, 24.0),
            descriptor(3841, 2161, 60.0),
            SourceDescriptor::default(),
        ];
        for source in &sources {
            for quality in ALL_QUALITIES {
                for speed in ALL_SPEEDS {
                    let p = derive_parameters(source, quality, speed);
                    assert_eq!(p.width % 2, 0);
                    assert_eq!(p.height % 2, 0);
                    assert!(p.width >= 2);
                    assert!(p.height >= 2);
                    assert!(p.keyframe_interval >= 1);
                    let floor =
                        (MIN_VIDEO_BITRATE as f64 * quality.bitrate_scale()).round() as u64;
                    assert!(p.video_bitrate >= floor);
                }
            }
        }
    }

    #[test]
    fn test_odd_dimensions_floored() {
        let p = derive_parameters(
            &descriptor(1919, 1079, 30.0),
            QualityPreset::Balanced,
            SpeedPreset::Standard,
        );
        assert_eq!(p.width, 1918);
        assert_eq!(p.height, 1078);
    }

    #[test]
    fn test_missing_dimensions_fall_back_to_720p() {
        let source = SourceDescriptor {
            frame_rate: Some(30.0),
            has_video: true,
            ..Default::default()
        };
        let p = derive_parameters(&source, QualityPreset::Balanced, SpeedPreset::Standard);
        assert_eq!(p.width, 1280);
        assert_eq!(p.height, 720);
    }

    #[test]
    fn test_reference_720p30_balanced_standard() {
        let p = derive_parameters(
            &descriptor(1280, 720, 30.0),
            QualityPreset::Balanced,
            SpeedPreset::Standard,
        );
        // 1280 * 720 * 30 * 0.07 = 1_935_360, above the floor, scale 1.0
        assert_eq!(p.video_bitrate, 1_935_360);
        assert_eq!(p.audio_bitrate, 128_000);
        // round(30 * 2.5) = 75
        assert_eq!(p.keyframe_interval, 75);
    }

    #[test]
    fn test_bitrate_floor_applies_before_scaling() {
        // 160 * 120 * 10 * 0.07 = 13_440, far below the floor
        let p = derive_parameters(
            &descriptor(160, 120, 10.0),
            QualityPreset::Small,
            SpeedPreset::Standard,
        );
        assert_eq!(
            p.video_bitrate,
            (MIN_VIDEO_BITRATE as f64 * QualityPreset::Small.bitrate_scale()).round() as u64
        );
    }

    #[test]
    fn test_keyframe_interval_minimum_one() {
        let p = derive_parameters(
            &descriptor(640, 480, 0.1),
            QualityPreset::Balanced,
            SpeedPreset::Fast,
        );
        assert_eq!(p.keyframe_interval, 1);
    }

    #[test]
    fn test_unknown_frame_rate_falls_back() {
        let source = SourceDescriptor {
            width: Some(1280),
            height: Some(720),
            has_video: true,
            ..Default::default()
        };
        let p = derive_parameters(&source, QualityPreset::Balanced, SpeedPreset::Standard);
        assert_eq!(p.frame_rate, FALLBACK_FRAME_RATE);
        assert_eq!(p.keyframe_interval, 75);
    }
}
