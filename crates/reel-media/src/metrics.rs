//! Rendering metrics.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const ENCODE_TOTAL: &str = "reel_encode_total";
    pub const ENCODE_DURATION_SECONDS: &str = "reel_encode_duration_seconds";
    pub const MOTION_FRAMES_TOTAL: &str = "reel_motion_frames_total";
    pub const PIPELINE_TOTAL: &str = "reel_pipeline_total";
}

/// Record one final encode.
pub fn record_encode(acceleration: &str, success: bool, duration_secs: f64) {
    let labels = [
        ("acceleration", acceleration.to_string()),
        ("status", if success { "success" } else { "failure" }.to_string()),
    ];
    counter!(names::ENCODE_TOTAL, &labels).increment(1);
    histogram!(names::ENCODE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record frames pushed through the motion engine.
pub fn record_motion_frames(effect: &str, frames: u64) {
    let labels = [("effect", effect.to_string())];
    counter!(names::MOTION_FRAMES_TOTAL, &labels).increment(frames);
}

/// Record a finished pipeline run.
pub fn record_pipeline(pipeline: &str, outcome: &str) {
    let labels = [
        ("pipeline", pipeline.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::PIPELINE_TOTAL, &labels).increment(1);
}
