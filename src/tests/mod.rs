//! Integration testing module
//!
//! End-to-end tests for the transcode pipeline:
//! - Full dual-track conversion with keyframe cadence and progress
//! - Degradation paths (audio probe failure, audio negotiation failure)
//! - Abort paths (playback error, negotiation failure) with release
//!   accounting
