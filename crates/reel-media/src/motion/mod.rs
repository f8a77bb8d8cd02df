//! Camera-motion engine: smooth zoom and pan over decoded frames.
//!
//! Frames flow from a [`FrameSource`] through a [`MotionPlan`] into a
//! [`FrameSink`] that writes a lossless intermediate. Batches are transformed
//! in parallel with rayon; output order always matches input order.

pub mod frames;
pub mod plan;
pub mod resample;

pub use frames::{AudioPassthrough, FrameSink, FrameSource, StillImageSource, VideoDecoder};
pub use plan::{choose_effect, MotionPlan, ZOOM_MAX, ZOOM_MIN};

use image::RgbImage;
use rayon::prelude::*;
use reel_models::encoding::OUTPUT_FPS;
use reel_models::{Effect, Orientation};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use crate::command::check_ffmpeg;
use crate::error::{MediaError, MediaResult};
use crate::geometry::FrameGeometry;
use crate::metrics;
use crate::probe::{MediaAsset, MediaKind};

/// Frames read and transformed per parallel batch.
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// Where motion frames come from.
#[derive(Debug, Clone)]
pub enum MotionInput {
    /// Decoded video; its audio (if any) is copied into the intermediate
    Video {
        path: PathBuf,
        width: u32,
        height: u32,
        fps: f64,
        duration: f64,
        /// Frames in the video stream, when known
        frames: Option<u64>,
        has_audio: bool,
    },
    /// Still image held for `duration` seconds at the output frame rate
    Still { path: PathBuf, duration: f64 },
}

impl MotionInput {
    /// Video input from a probed asset.
    pub fn from_video(asset: &MediaAsset) -> MediaResult<Self> {
        if asset.kind != MediaKind::Video {
            return Err(MediaError::invalid_input(format!(
                "{} is not a video",
                asset.path.display()
            )));
        }
        let (width, height) = asset.dimensions()?;
        Ok(MotionInput::Video {
            path: asset.path.clone(),
            width,
            height,
            fps: asset.fps.filter(|f| *f > 0.0).unwrap_or(OUTPUT_FPS as f64),
            duration: asset.duration.unwrap_or(0.0),
            frames: asset.frames,
            has_audio: asset.has_audio,
        })
    }

    pub fn still(path: impl Into<PathBuf>, duration: f64) -> Self {
        MotionInput::Still {
            path: path.into(),
            duration,
        }
    }

    pub fn fps(&self) -> f64 {
        match self {
            MotionInput::Video { fps, .. } => *fps,
            MotionInput::Still { .. } => OUTPUT_FPS as f64,
        }
    }

    /// Expected frame count used to spread the sweep; at least 2.
    ///
    /// A video's own frame count wins over its container duration, which
    /// also covers trailing audio.
    pub fn frame_count(&self) -> u64 {
        let (duration, fps) = match self {
            MotionInput::Video {
                frames: Some(frames),
                ..
            } => return (*frames).max(2),
            MotionInput::Video { duration, fps, .. } => (*duration, *fps),
            MotionInput::Still { duration, .. } => (*duration, OUTPUT_FPS as f64),
        };
        ((duration * fps).ceil().max(0.0) as u64).max(2)
    }
}

/// One motion render.
#[derive(Debug, Clone)]
pub struct MotionRequest {
    pub input: MotionInput,
    pub effect: Effect,
    /// Intermediate output (`.mkv`)
    pub output: PathBuf,
    pub batch_size: usize,
    /// Framing to plan pans against; `None` follows the frame shape
    pub orientation: Option<Orientation>,
}

impl MotionRequest {
    /// Geometry of a `width`×`height` source under the requested framing.
    pub fn geometry(&self, width: u32, height: u32) -> FrameGeometry {
        match self.orientation {
            Some(orientation) => FrameGeometry::derive_for(width, height, orientation),
            None => FrameGeometry::derive(width, height),
        }
    }
}

/// Result of a motion render.
#[derive(Debug, Clone)]
pub struct MotionOutput {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub frames: u64,
    pub effect: Effect,
    /// Whether the intermediate carries the source audio
    pub has_audio: bool,
}

/// Render the effect into a lossless intermediate.
///
/// The frame loop runs on a blocking thread. On any failure the partial
/// intermediate is removed.
pub async fn render_motion(request: MotionRequest) -> MediaResult<MotionOutput> {
    let started = Instant::now();
    let output = request.output.clone();
    let effect = request.effect;

    let result = tokio::task::spawn_blocking(move || run_motion(&request))
        .await
        .map_err(|e| MediaError::internal(format!("motion task failed: {e}")))?;

    match result {
        Ok(out) => {
            metrics::record_motion_frames(effect.as_str(), out.frames);
            info!(
                effect = %effect,
                frames = out.frames,
                width = out.width,
                height = out.height,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Motion render complete"
            );
            Ok(out)
        }
        Err(e) => {
            warn!(effect = %effect, error = %e, "Motion render failed");
            if let Err(rm) = tokio::fs::remove_file(&output).await {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %output.display(), error = %rm, "Failed to remove partial intermediate");
                }
            }
            Err(e)
        }
    }
}

fn run_motion(request: &MotionRequest) -> MediaResult<MotionOutput> {
    check_ffmpeg()?;

    let frame_count = request.input.frame_count();
    let (mut source, audio): (Box<dyn FrameSource>, Option<AudioPassthrough>) = match &request.input {
        MotionInput::Still { path, .. } => (
            Box::new(StillImageSource::open(path, frame_count)?) as Box<dyn FrameSource>,
            None,
        ),
        MotionInput::Video {
            path,
            width,
            height,
            has_audio,
            ..
        } => (
            Box::new(VideoDecoder::spawn(path, *width, *height)?) as Box<dyn FrameSource>,
            has_audio.then(|| AudioPassthrough {
                source: path.clone(),
            }),
        ),
    };

    let (width, height) = source.dimensions();
    let geometry = request.geometry(width, height);
    let plan = MotionPlan::new(request.effect, frame_count, &geometry)?;
    let (out_width, out_height) = plan.output_size(width, height);

    let mut sink = FrameSink::spawn(
        &request.output,
        out_width,
        out_height,
        request.input.fps(),
        audio.as_ref(),
    )?;

    let batch_size = request.batch_size.max(1);
    let mut index: u64 = 0;
    loop {
        let mut batch: Vec<RgbImage> = Vec::with_capacity(batch_size);
        while batch.len() < batch_size {
            match source.next_frame()? {
                Some(frame) => batch.push(frame),
                None => break,
            }
        }
        if batch.is_empty() {
            break;
        }

        let transformed: Vec<RgbImage> = batch
            .par_iter()
            .enumerate()
            .map(|(k, frame)| plan.apply(frame, index + k as u64))
            .collect();

        for frame in &transformed {
            sink.write_frame(frame)?;
        }
        index += transformed.len() as u64;
    }

    source.finish()?;

    if index == 0 {
        return Err(MediaError::decode_failed("source yielded no frames"));
    }

    let path = sink.finish()?;
    Ok(MotionOutput {
        path,
        width: out_width,
        height: out_height,
        frames: index,
        effect: request.effect,
        has_audio: audio.is_some(),
    })
}
