#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper and media engines for reelcast.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with a typed filter graph
//! - Progress parsing from `-progress pipe:2`
//! - Media probing via FFprobe
//! - Aspect-normalizing crop geometry
//! - The camera-motion engine (zoom and pan)
//! - Subtitle conversion and adaptive style synthesis
//! - Encoder planning with a cached hardware probe

pub mod command;
pub mod encoder;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod geometry;
pub mod metrics;
pub mod motion;
pub mod probe;
pub mod progress;
pub mod subtitles;
pub mod watermark;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegInput, FfmpegRunner};
pub use encoder::{
    encode, probe_acceleration, AccelerationCache, AccelerationMode, EncodeRequest, EncoderPlan,
    SubtitleStage, VideoSource,
};
pub use error::{MediaError, MediaResult};
pub use filters::{FilterGraph, FilterNode};
pub use fs_utils::move_file;
pub use geometry::FrameGeometry;
pub use motion::{choose_effect, render_motion, MotionInput, MotionOutput, MotionPlan, MotionRequest};
pub use probe::{probe_media, MediaAsset, MediaKind};
pub use progress::FfmpegProgress;
pub use subtitles::{prepare_subtitles, resolve_font, PreparedSubtitles, ResolvedFont, StyleRequest, SubtitleStyle};
pub use watermark::WatermarkConfig;
