//! Video + subtitle file → video with burned-in, restyled captions.

use reel_media::{probe_media, EncodeRequest, MotionInput};
use reel_models::{RenderParams, StyleProfile};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{
    motion_note, orientation_for, require_input, video_source, watermark_for, PipelineContext,
    RenderOutcome,
};
use crate::error::WorkerResult;

pub async fn run(
    ctx: &PipelineContext,
    video: &Path,
    subtitles: &Path,
    watermark: Option<&Path>,
    profile: StyleProfile,
    params: &RenderParams,
) -> WorkerResult<RenderOutcome> {
    require_input(video)?;
    require_input(subtitles)?;
    let watermark = watermark_for(watermark, ctx.config())?;

    let asset = probe_media(video).await?;
    let (width, height) = asset.dimensions()?;
    let orientation = orientation_for(params, width, height);
    info!(
        width,
        height,
        orientation = %orientation,
        profile = %profile,
        has_audio = asset.has_audio,
        "Probed video"
    );

    let work = ctx.work_dir()?;
    let motion = if params.effects.is_empty() {
        None
    } else {
        ctx.apply_motion(
            work.path(),
            MotionInput::from_video(&asset)?,
            &params.effects,
            orientation,
        )
        .await?
    };

    let (source, geometry) = video_source(&asset, motion.as_ref(), width, height, orientation);
    let stage = ctx
        .subtitle_stage(work.path(), subtitles, &geometry, params, profile)
        .await?;
    let captioned = stage.is_some();

    let request = EncodeRequest {
        video: source,
        audio: None,
        geometry,
        subtitles: stage,
        watermark,
        output: PathBuf::new(),
    };
    let acceleration = ctx
        .encode_and_deliver(work.path(), request, &params.output_path)
        .await?;

    Ok(RenderOutcome {
        output_path: params.output_path.clone(),
        acceleration,
        message: if captioned {
            format!(
                "Burned {} subtitles into video{}",
                profile,
                motion_note(motion.as_ref())
            )
        } else {
            format!(
                "Re-encoded video without subtitles (no cues){}",
                motion_note(motion.as_ref())
            )
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use reel_media::{MediaAsset, MediaKind, MotionOutput, VideoSource};
    use reel_models::{Acceleration, Effect, Orientation};
    use tempfile::TempDir;

    fn asset(width: u32, height: u32) -> MediaAsset {
        MediaAsset {
            path: PathBuf::from("/in/clip.mp4"),
            kind: MediaKind::Video,
            width: Some(width),
            height: Some(height),
            duration: Some(12.0),
            fps: Some(25.0),
            frames: Some(300),
            has_audio: true,
        }
    }

    #[test]
    fn test_source_keeps_video_audio() {
        let asset = asset(1920, 1080);
        let (source, geometry) = video_source(&asset, None, 1920, 1080, Orientation::Landscape);
        assert_eq!(
            source,
            VideoSource::Video {
                path: PathBuf::from("/in/clip.mp4"),
                has_audio: true
            }
        );
        assert_eq!(geometry.canvas(), (1920, 1080));
    }

    #[test]
    fn test_geometry_follows_motion_output() {
        let asset = asset(1920, 1080);
        let motion = MotionOutput {
            path: PathBuf::from("/work/motion.mkv"),
            width: 608,
            height: 1080,
            frames: 300,
            effect: Effect::PanLeft,
            has_audio: true,
        };
        let (source, geometry) =
            video_source(&asset, Some(&motion), 1920, 1080, Orientation::Portrait);
        assert!(matches!(source, VideoSource::Video { ref path, has_audio: true } if path == Path::new("/work/motion.mkv")));
        assert_eq!(geometry.source_width, 608);
        assert_eq!(geometry.orientation, Orientation::Portrait);
    }

    #[tokio::test]
    async fn test_empty_subtitle_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("clip.mp4");
        let subtitles = dir.path().join("captions.srt");
        std::fs::write(&video, b"data").unwrap();
        std::fs::write(&subtitles, b"").unwrap();

        let ctx = PipelineContext::new(WorkerConfig {
            work_dir: dir.path().join("work"),
            ..Default::default()
        })
        .with_fixed_acceleration(Acceleration::Software);
        let params = RenderParams::new(dir.path().join("out.mp4"));

        let err = run(&ctx, &video, &subtitles, None, StyleProfile::Portrait, &params)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), reel_models::ErrorKind::Precondition);
        assert!(!dir.path().join("work").exists());
    }
}
