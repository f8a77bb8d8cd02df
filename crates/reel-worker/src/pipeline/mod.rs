//! Rendering pipelines.
//!
//! Every pipeline follows the same order: check inputs exist and are
//! non-empty (before any process is launched), probe, derive geometry,
//! optional motion, optional subtitles, one final encode, then move the
//! verified artifact to `output_path`. All scratch files live in a
//! per-invocation `TempDir` that is removed on every path.

pub mod image_audio;
pub mod onestep;
pub mod video_subtitles;

use reel_media::metrics::record_pipeline;
use reel_media::{
    choose_effect, encode, move_file, prepare_subtitles, render_motion, resolve_font,
    AccelerationCache, EncodeRequest, EncoderPlan, FfmpegRunner, FrameGeometry, MediaError,
    MediaAsset, MotionInput, MotionOutput, MotionRequest, StyleRequest, SubtitleStage,
    VideoSource, WatermarkConfig,
};
use reel_models::{
    Acceleration, EffectSelection, JobInputs, Orientation, PipelineResult, RenderJob,
    RenderParams, StyleProfile,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info, Instrument};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::store::{sweep_expired, OutputRecord, OutputStore};

/// Name of the final encode inside the work directory.
const WORK_OUTPUT: &str = "output.mp4";
/// Name of the motion intermediate inside the work directory.
const MOTION_OUTPUT: &str = "motion.mkv";

/// What a successful pipeline delivered.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub output_path: PathBuf,
    pub acceleration: Acceleration,
    pub message: String,
}

/// Builds the acceleration cache for one job.
type AccelerationSource = Arc<dyn Fn() -> AccelerationCache + Send + Sync>;

/// Shared state for pipeline runs.
pub struct PipelineContext {
    config: WorkerConfig,
    acceleration: AccelerationSource,
    runner: FfmpegRunner,
    store: Option<Arc<dyn OutputStore>>,
}

impl PipelineContext {
    pub fn new(config: WorkerConfig) -> Self {
        let (mode, timeout) = (config.acceleration_mode(), config.probe_timeout);
        let acceleration: AccelerationSource = Arc::new(move || AccelerationCache::new(mode, timeout));
        let runner = match config.ffmpeg_timeout {
            Some(timeout) => FfmpegRunner::new().with_timeout(timeout.as_secs().max(1)),
            None => FfmpegRunner::new(),
        };
        Self {
            config,
            acceleration,
            runner,
            store: None,
        }
    }

    /// Replace how each job's acceleration cache is built.
    pub fn with_acceleration<F>(mut self, source: F) -> Self
    where
        F: Fn() -> AccelerationCache + Send + Sync + 'static,
    {
        self.acceleration = Arc::new(source);
        self
    }

    /// Pin every job to one encoder path.
    pub fn with_fixed_acceleration(self, acceleration: Acceleration) -> Self {
        self.with_acceleration(move || AccelerationCache::fixed(acceleration))
    }

    /// Register delivered outputs in `store`.
    pub fn with_store(mut self, store: Arc<dyn OutputStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Resolve the encoder path for one job. Every call starts from a fresh
    /// cache, so a probe answer never outlives the job that asked for it.
    pub async fn acceleration(&self) -> Acceleration {
        (self.acceleration)().get().await
    }

    /// Fresh invocation directory under the work root.
    pub fn work_dir(&self) -> WorkerResult<TempDir> {
        std::fs::create_dir_all(&self.config.work_dir)?;
        let dir = tempfile::Builder::new()
            .prefix("reel-")
            .tempdir_in(&self.config.work_dir)?;
        debug!(dir = %dir.path().display(), "Created work directory");
        Ok(dir)
    }

    /// Run one job to a terminal result. Never panics on job errors.
    pub async fn run(&self, job: &RenderJob) -> PipelineResult {
        let pipeline = job.inputs.kind();
        let logger = JobLogger::new(&job.id, pipeline);
        let span = logger.create_span();
        self.run_logged(job, &logger).instrument(span).await
    }

    async fn run_logged(&self, job: &RenderJob, logger: &JobLogger) -> PipelineResult {
        let started = Instant::now();
        let pipeline = job.inputs.kind();
        logger.started(&job.params.output_path, job.params.force_redo);

        if let Some(store) = &self.store {
            if let Err(e) = sweep_expired(store.as_ref(), chrono::Utc::now()).await {
                logger.warning(&format!("output sweep failed: {e}"));
            }
        }

        match self.dispatch(job).await {
            Ok(outcome) => {
                let elapsed = elapsed_ms(started);
                self.register_output(job, &outcome.output_path, logger);
                logger.completed(&outcome.output_path, outcome.acceleration, elapsed);
                record_pipeline(pipeline, "success");
                PipelineResult::success(
                    outcome.output_path,
                    outcome.message,
                    Some(outcome.acceleration),
                    elapsed,
                )
            }
            Err(Stop::Skipped(path)) => {
                logger.skipped(&path);
                record_pipeline(pipeline, "skipped");
                let message = format!("Output already exists at {}; skipped", path.display());
                PipelineResult::success(path, message, None, elapsed_ms(started))
            }
            Err(Stop::Failed(e)) => {
                let elapsed = elapsed_ms(started);
                let kind = e.kind();
                logger.failed(kind, &e.to_string(), elapsed);
                record_pipeline(pipeline, kind.as_str());
                PipelineResult::failure(kind, e.report(), elapsed)
            }
        }
    }

    async fn dispatch(&self, job: &RenderJob) -> Result<RenderOutcome, Stop> {
        let params = &job.params;
        params.check().map_err(WorkerError::invalid_params)?;

        if !params.force_redo && is_nonempty_file(&params.output_path) {
            return Err(Stop::Skipped(params.output_path.clone()));
        }

        let outcome = match &job.inputs {
            JobInputs::ImageAudio {
                image,
                audio,
                watermark,
            } => image_audio::run(self, image, audio, watermark.as_deref(), params).await?,
            JobInputs::VideoSubtitles {
                video,
                subtitles,
                watermark,
                portrait_profile,
            } => {
                let profile = if *portrait_profile {
                    StyleProfile::Portrait
                } else {
                    StyleProfile::Standard
                };
                video_subtitles::run(self, video, subtitles, watermark.as_deref(), profile, params)
                    .await?
            }
            JobInputs::OneStep {
                image,
                audio,
                subtitles,
                watermark,
            } => {
                onestep::run(
                    self,
                    image,
                    audio,
                    subtitles.as_deref(),
                    watermark.as_deref(),
                    params,
                )
                .await?
            }
        };
        Ok(outcome)
    }

    fn register_output(&self, job: &RenderJob, path: &Path, logger: &JobLogger) {
        let Some(store) = &self.store else {
            return;
        };
        let ttl = chrono::Duration::from_std(self.config.output_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        let record = OutputRecord::new(job.id.as_str(), path, ttl);
        if let Err(e) = store.register(record) {
            logger.warning(&format!("could not register output: {e}"));
        }
    }

    /// Pick an effect and render it into the work directory, if any was chosen.
    pub(crate) async fn apply_motion(
        &self,
        work_dir: &Path,
        input: MotionInput,
        selection: &EffectSelection,
        orientation: Orientation,
    ) -> WorkerResult<Option<MotionOutput>> {
        let effect = {
            let mut rng = rand::rng();
            choose_effect(selection, &mut rng)
        };
        let Some(effect) = effect else {
            return Ok(None);
        };
        info!(effect = %effect, "Applying motion effect");
        let output = render_motion(MotionRequest {
            input,
            effect,
            output: work_dir.join(MOTION_OUTPUT),
            batch_size: self.config.motion_batch_size,
            orientation: Some(orientation),
        })
        .await?;
        Ok(Some(output))
    }

    /// Convert and style `source` for burning into a `geometry`-sized canvas.
    ///
    /// `None` when the file holds no cues; the render goes ahead uncaptioned.
    pub(crate) async fn subtitle_stage(
        &self,
        work_dir: &Path,
        source: &Path,
        geometry: &FrameGeometry,
        params: &RenderParams,
        profile: StyleProfile,
    ) -> WorkerResult<Option<SubtitleStage>> {
        let (width, height) = geometry.canvas();
        let font = resolve_font(params.language, self.config.font_override.as_deref()).await;
        let request = StyleRequest {
            video_width: width,
            video_height: height,
            orientation: geometry.orientation,
            language: params.language,
            font_size: params.font_size,
            outline_colour: params.outline_color.clone(),
            background_box: params.background_box,
            background_opacity: params.background_opacity,
            profile,
            font: font.family.clone(),
        };
        let prepared = prepare_subtitles(source, work_dir, &request, &font).await?;
        Ok(prepared.map(|prepared| SubtitleStage {
            script: prepared.script,
            fonts_dir: prepared.fonts_dir,
        }))
    }

    /// Plan, encode, verify and move the result to `destination`.
    pub(crate) async fn encode_and_deliver(
        &self,
        work_dir: &Path,
        mut request: EncodeRequest,
        destination: &Path,
    ) -> WorkerResult<Acceleration> {
        request.output = work_dir.join(WORK_OUTPUT);
        let acceleration = self.acceleration().await;
        let plan = EncoderPlan::build(&request, acceleration);
        encode(&plan, &self.runner).await?;

        move_file(&plan.output, destination).await?;
        info!(output = %destination.display(), "Delivered output");
        Ok(acceleration)
    }
}

/// Why a dispatch stopped without producing a fresh render.
enum Stop {
    Skipped(PathBuf),
    Failed(WorkerError),
}

impl From<WorkerError> for Stop {
    fn from(e: WorkerError) -> Self {
        Stop::Failed(e)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn is_nonempty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Fail unless `path` is an existing, non-empty file.
pub fn require_input(path: &Path) -> WorkerResult<()> {
    let meta = std::fs::metadata(path).map_err(|_| MediaError::FileNotFound(path.to_path_buf()))?;
    if !meta.is_file() {
        return Err(MediaError::invalid_input(format!("{} is not a file", path.display())).into());
    }
    if meta.len() == 0 {
        return Err(MediaError::EmptyInput(path.to_path_buf()).into());
    }
    Ok(())
}

/// Validated watermark configuration for an optional path.
pub fn watermark_for(path: Option<&Path>, config: &WorkerConfig) -> WorkerResult<Option<WatermarkConfig>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let watermark = WatermarkConfig::new(path);
    watermark.validate()?;
    Ok(Some(match config.watermark_opacity {
        Some(opacity) => watermark.with_opacity(opacity),
        None => watermark,
    }))
}

/// Requested orientation, or the one implied by the frame.
pub fn orientation_for(params: &RenderParams, width: u32, height: u32) -> Orientation {
    params
        .orientation
        .unwrap_or_else(|| Orientation::from_dimensions(width, height))
}

/// Encoder input for a still image, or for the motion intermediate rendered from it.
pub(crate) fn still_source(
    image: &Path,
    motion: Option<&MotionOutput>,
    width: u32,
    height: u32,
    orientation: Orientation,
) -> (VideoSource, FrameGeometry) {
    match motion {
        Some(out) => (
            VideoSource::Video {
                path: out.path.clone(),
                has_audio: false,
            },
            FrameGeometry::derive_for(out.width, out.height, orientation),
        ),
        None => (
            VideoSource::Still(image.to_path_buf()),
            FrameGeometry::derive_for(width, height, orientation),
        ),
    }
}

/// Encoder input for a probed video, or for its motion intermediate.
///
/// Geometry is always derived from the frames the encoder will actually read.
pub(crate) fn video_source(
    asset: &MediaAsset,
    motion: Option<&MotionOutput>,
    width: u32,
    height: u32,
    orientation: Orientation,
) -> (VideoSource, FrameGeometry) {
    match motion {
        Some(out) => (
            VideoSource::Video {
                path: out.path.clone(),
                has_audio: out.has_audio,
            },
            FrameGeometry::derive_for(out.width, out.height, orientation),
        ),
        None => (
            VideoSource::Video {
                path: asset.path.clone(),
                has_audio: asset.has_audio,
            },
            FrameGeometry::derive_for(width, height, orientation),
        ),
    }
}

fn motion_note(motion: Option<&MotionOutput>) -> String {
    match motion {
        Some(out) => format!(" with {} over {} frames", out.effect, out.frames),
        None => String::new(),
    }
}
