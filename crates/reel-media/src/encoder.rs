//! Encoder planning: hardware probe, filter graph and the final FFmpeg invocation.

use reel_models::encoding::{OUTPUT_FPS, OUTPUT_PIX_FMT};
use reel_models::{Acceleration, AudioParams, EncodingConfig};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegInput, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{FilterGraph, FilterNode, WatermarkStage};
use crate::geometry::FrameGeometry;
use crate::metrics;
use crate::watermark::WatermarkConfig;

/// Default bound on the hardware probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Arguments of the disposable NVENC test encode.
pub const PROBE_ARGS: &[&str] = &[
    "-hide_banner",
    "-f",
    "lavfi",
    "-i",
    "nullsrc=s=256x256:d=0.1",
    "-c:v",
    "h264_nvenc",
    "-f",
    "null",
    "-",
];

/// Run the test encode; any failure selects the software path.
pub async fn probe_acceleration(timeout: Duration) -> Acceleration {
    let child = Command::new("ffmpeg")
        .args(PROBE_ARGS)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();

    match tokio::time::timeout(timeout, child).await {
        Ok(Ok(status)) if status.success() => {
            info!("NVENC available, using hardware encoding");
            Acceleration::Hardware
        }
        Ok(Ok(status)) => {
            info!(status = %status, "NVENC probe failed, using software encoding");
            Acceleration::Software
        }
        Ok(Err(e)) => {
            info!(error = %e, "NVENC probe could not run, using software encoding");
            Acceleration::Software
        }
        Err(_) => {
            info!(timeout_secs = timeout.as_secs(), "NVENC probe timed out, using software encoding");
            Acceleration::Software
        }
    }
}

/// How the encoder path is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccelerationMode {
    /// Probe once, then reuse the answer
    #[default]
    Auto,
    /// Never probe; always libx264
    ForceSoftware,
}

/// Per-invocation memo of the hardware probe.
#[derive(Debug)]
pub struct AccelerationCache {
    mode: AccelerationMode,
    timeout: Duration,
    cell: OnceCell<Acceleration>,
}

impl AccelerationCache {
    pub fn new(mode: AccelerationMode, timeout: Duration) -> Self {
        Self {
            mode,
            timeout,
            cell: OnceCell::new(),
        }
    }

    /// Cache pinned to one answer without probing.
    pub fn fixed(acceleration: Acceleration) -> Self {
        Self {
            mode: AccelerationMode::Auto,
            timeout: DEFAULT_PROBE_TIMEOUT,
            cell: OnceCell::new_with(Some(acceleration)),
        }
    }

    pub async fn get(&self) -> Acceleration {
        if self.mode == AccelerationMode::ForceSoftware {
            return Acceleration::Software;
        }
        *self
            .cell
            .get_or_init(|| probe_acceleration(self.timeout))
            .await
    }
}

impl Default for AccelerationCache {
    fn default() -> Self {
        Self::new(AccelerationMode::Auto, DEFAULT_PROBE_TIMEOUT)
    }
}

/// Primary video input of an encode.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoSource {
    /// Still image looped at the output frame rate
    Still(PathBuf),
    /// Video file (source or motion intermediate)
    Video { path: PathBuf, has_audio: bool },
}

impl VideoSource {
    fn to_input(&self) -> FfmpegInput {
        match self {
            VideoSource::Still(path) => FfmpegInput::new(path)
                .arg("-loop")
                .arg("1")
                .arg("-framerate")
                .arg(OUTPUT_FPS.to_string()),
            VideoSource::Video { path, .. } => FfmpegInput::new(path),
        }
    }
}

/// Burned-in subtitle stage.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleStage {
    pub script: PathBuf,
    pub fonts_dir: Option<PathBuf>,
}

/// Everything needed to plan the final encode.
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub video: VideoSource,
    /// Separate audio track; without it the video's own audio is used
    pub audio: Option<PathBuf>,
    /// Geometry of the primary video input
    pub geometry: FrameGeometry,
    pub subtitles: Option<SubtitleStage>,
    pub watermark: Option<WatermarkConfig>,
    pub output: PathBuf,
}

/// A complete, reproducible FFmpeg invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderPlan {
    pub encoding: EncodingConfig,
    pub audio: AudioParams,
    pub inputs: Vec<FfmpegInput>,
    pub graph: FilterGraph,
    /// Audio stream specifier, e.g. `1:a?`
    pub audio_map: Option<String>,
    pub canvas: (u32, u32),
    pub fps: u32,
    pub output: PathBuf,
}

impl EncoderPlan {
    /// Plan an encode. Identical requests and acceleration give identical plans.
    pub fn build(request: &EncodeRequest, acceleration: Acceleration) -> Self {
        let geometry = &request.geometry;
        let (canvas_w, canvas_h) = geometry.canvas();

        let graph = FilterGraph::new("0:v")
            .push_opt(geometry.needs_crop().then_some(FilterNode::Crop(geometry.crop)))
            .push(FilterNode::ScaleFit {
                width: canvas_w,
                height: canvas_h,
            })
            .push(FilterNode::PadCenter {
                width: canvas_w,
                height: canvas_h,
            })
            .push(FilterNode::SetSar)
            .push_opt(request.subtitles.as_ref().map(|s| FilterNode::Subtitles {
                script: s.script.clone(),
                fonts_dir: s.fonts_dir.clone(),
            }))
            .watermark(request.watermark.as_ref().map(|config| WatermarkStage {
                config: config.clone(),
                canvas_width: canvas_w,
            }));

        let mut inputs = vec![request.video.to_input()];
        let audio_map = match (&request.audio, &request.video) {
            (Some(audio), _) => {
                inputs.push(FfmpegInput::new(audio));
                Some(format!("{}:a?", inputs.len() - 1))
            }
            (None, VideoSource::Video { has_audio: true, .. }) => Some("0:a?".to_string()),
            (None, _) => None,
        };

        Self {
            encoding: EncodingConfig::for_acceleration(acceleration),
            audio: AudioParams::default(),
            inputs,
            graph,
            audio_map,
            canvas: (canvas_w, canvas_h),
            fps: OUTPUT_FPS,
            output: request.output.clone(),
        }
    }

    pub fn acceleration(&self) -> Acceleration {
        self.encoding.acceleration
    }

    pub fn to_command(&self) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(&self.output);
        for input in &self.inputs {
            cmd = cmd.with_input(input.clone());
        }
        cmd = cmd.filter_complex(&self.graph).map(self.graph.output_pad());
        if let Some(audio_map) = &self.audio_map {
            cmd = cmd.map(audio_map.clone());
        }
        cmd = cmd.output_args(self.encoding.to_ffmpeg_args());
        if self.audio_map.is_some() {
            cmd = cmd.output_args(self.audio.to_ffmpeg_args());
        }
        cmd.output_args([
            "-pix_fmt".to_string(),
            OUTPUT_PIX_FMT.to_string(),
            "-r".to_string(),
            self.fps.to_string(),
            "-fps_mode".to_string(),
            "cfr".to_string(),
            "-shortest".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ])
    }

    /// Full argument vector (without the program name).
    pub fn args(&self) -> Vec<String> {
        self.to_command().build_args()
    }
}

/// Run the plan and verify the artifact. No retry on failure.
pub async fn encode(plan: &EncoderPlan, runner: &FfmpegRunner) -> MediaResult<()> {
    let started = Instant::now();
    let cmd = plan.to_command();
    info!(
        acceleration = %plan.acceleration(),
        canvas_w = plan.canvas.0,
        canvas_h = plan.canvas.1,
        output = %plan.output.display(),
        "Encoding"
    );
    debug!("{}", cmd.to_command_line());

    let progress = runner
        .run_with_progress(&cmd, |p| {
            debug!(
                frame = p.frame,
                out_time_ms = p.out_time_ms,
                speed = p.speed,
                done = p.is_complete,
                "Encode progress"
            );
        })
        .await;
    let result = match progress {
        Ok(()) => verify_output(&plan.output).await,
        Err(e) => Err(e),
    };

    let elapsed = started.elapsed().as_secs_f64();
    metrics::record_encode(plan.acceleration().as_str(), result.is_ok(), elapsed);
    if result.is_ok() {
        info!(elapsed_secs = elapsed, "Encode complete");
    }
    result
}

/// Require a non-empty file at `path`.
pub async fn verify_output(path: &Path) -> MediaResult<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(MediaError::EmptyOutput(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn still_request() -> EncodeRequest {
        EncodeRequest {
            video: VideoSource::Still(PathBuf::from("/in/cover.png")),
            audio: Some(PathBuf::from("/in/voice.mp3")),
            geometry: FrameGeometry::derive(1920, 1080),
            subtitles: None,
            watermark: None,
            output: PathBuf::from("/work/out.mp4"),
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
    }

    #[test]
    fn test_plan_is_deterministic() {
        let request = still_request();
        let first = EncoderPlan::build(&request, Acceleration::Software).args();
        let second = EncoderPlan::build(&request, Acceleration::Software).args();
        assert_eq!(first, second);
    }

    #[test]
    fn test_image_audio_1080p_contract() {
        let plan = EncoderPlan::build(&still_request(), Acceleration::Software);
        assert_eq!(plan.canvas, (1920, 1080));
        let args = plan.args();

        assert_eq!(value_after(&args, "-loop"), Some("1"));
        assert_eq!(value_after(&args, "-framerate"), Some("30"));
        assert_eq!(value_after(&args, "-c:v"), Some("libx264"));
        assert_eq!(value_after(&args, "-crf"), Some("23"));
        assert_eq!(value_after(&args, "-ar"), Some("48000"));
        assert_eq!(value_after(&args, "-ac"), Some("2"));
        assert_eq!(value_after(&args, "-b:a"), Some("128k"));
        assert_eq!(value_after(&args, "-r"), Some("30"));
        assert_eq!(value_after(&args, "-pix_fmt"), Some("yuv420p"));
        assert_eq!(value_after(&args, "-movflags"), Some("+faststart"));
        assert!(args.contains(&"-shortest".to_string()));
        let maps: Vec<&str> = args
            .windows(2)
            .filter(|w| w[0] == "-map")
            .map(|w| w[1].as_str())
            .collect();
        assert_eq!(maps, vec!["[vout]", "1:a?"]);
        // No crop stage for a 16:9 source
        assert!(!value_after(&args, "-filter_complex").unwrap().contains("crop="));
    }

    #[test]
    fn test_hardware_plan_uses_nvenc() {
        let args = EncoderPlan::build(&still_request(), Acceleration::Hardware).args();
        assert_eq!(value_after(&args, "-c:v"), Some("h264_nvenc"));
        assert_eq!(value_after(&args, "-cq:v"), Some("19"));
        assert_eq!(value_after(&args, "-preset"), Some("p4"));
    }

    #[test]
    fn test_stage_order() {
        let request = EncodeRequest {
            video: VideoSource::Video {
                path: PathBuf::from("/in/wide.mp4"),
                has_audio: true,
            },
            audio: None,
            geometry: FrameGeometry::derive(2560, 1080),
            subtitles: Some(SubtitleStage {
                script: PathBuf::from("/work/subtitles.ass"),
                fonts_dir: None,
            }),
            watermark: Some(WatermarkConfig::new("/assets/wm.png")),
            output: PathBuf::from("/work/out.mp4"),
        };
        let plan = EncoderPlan::build(&request, Acceleration::Software);
        let graph = plan.graph.to_string();
        let pos = |needle: &str| graph.find(needle).unwrap();
        assert!(pos("crop=") < pos("scale="));
        assert!(pos("scale=") < pos("pad="));
        assert!(pos("pad=") < pos("setsar=1"));
        assert!(pos("setsar=1") < pos("ass="));
        assert!(pos("ass=") < pos("movie="));
        assert_eq!(plan.audio_map.as_deref(), Some("0:a?"));
    }

    #[test]
    fn test_silent_video_has_no_audio_args() {
        let request = EncodeRequest {
            video: VideoSource::Video {
                path: PathBuf::from("/in/silent.mp4"),
                has_audio: false,
            },
            audio: None,
            geometry: FrameGeometry::derive(1280, 720),
            subtitles: None,
            watermark: None,
            output: PathBuf::from("/work/out.mp4"),
        };
        let args = EncoderPlan::build(&request, Acceleration::Software).args();
        assert!(!args.contains(&"-c:a".to_string()));
    }

    #[tokio::test]
    async fn test_forced_software_never_probes() {
        let cache = AccelerationCache::new(AccelerationMode::ForceSoftware, Duration::from_millis(1));
        assert_eq!(cache.get().await, Acceleration::Software);
        let fixed = AccelerationCache::fixed(Acceleration::Hardware);
        assert_eq!(fixed.get().await, Acceleration::Hardware);
    }

    #[tokio::test]
    async fn test_verify_output_rejects_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mp4");
        tokio::fs::write(&path, b"").await.unwrap();
        assert!(matches!(verify_output(&path).await, Err(MediaError::EmptyOutput(_))));
        tokio::fs::write(&path, b"data").await.unwrap();
        tokio_test::assert_ok!(verify_output(&path).await);
        assert!(verify_output(&dir.path().join("missing.mp4")).await.is_err());
    }
}
