//! Image + audio + optional subtitles and watermark → video in one encode.

use reel_media::{probe_media, EncodeRequest, MotionInput};
use reel_models::{RenderParams, StyleProfile};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{
    motion_note, orientation_for, require_input, still_source, watermark_for, PipelineContext,
    RenderOutcome,
};
use crate::error::WorkerResult;

pub async fn run(
    ctx: &PipelineContext,
    image: &Path,
    audio: &Path,
    subtitles: Option<&Path>,
    watermark: Option<&Path>,
    params: &RenderParams,
) -> WorkerResult<RenderOutcome> {
    require_input(image)?;
    require_input(audio)?;
    if let Some(subtitles) = subtitles {
        require_input(subtitles)?;
    }
    let watermark = watermark_for(watermark, ctx.config())?;

    let (width, height) = probe_media(image).await?.dimensions()?;
    let duration = probe_media(audio).await?.require_duration()?;
    let orientation = orientation_for(params, width, height);
    info!(
        width,
        height,
        duration,
        orientation = %orientation,
        subtitles = subtitles.is_some(),
        watermark = watermark.is_some(),
        "Probed inputs"
    );

    let work = ctx.work_dir()?;
    let motion = ctx
        .apply_motion(
            work.path(),
            MotionInput::still(image, duration),
            &params.effects,
            orientation,
        )
        .await?;
    let (video, geometry) = still_source(image, motion.as_ref(), width, height, orientation);

    let stage = match subtitles {
        Some(source) => {
            ctx.subtitle_stage(work.path(), source, &geometry, params, StyleProfile::OneStep)
                .await?
        }
        None => None,
    };
    let captioned = stage.is_some();

    let request = EncodeRequest {
        video,
        audio: Some(audio.to_path_buf()),
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
        message: format!(
            "Rendered image and audio{}{}",
            if captioned { " with subtitles" } else { "" },
            motion_note(motion.as_ref())
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use reel_media::MediaError;
    use reel_models::Acceleration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_watermark_checked_before_probe() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("a.png");
        let audio = dir.path().join("a.mp3");
        std::fs::write(&image, b"png").unwrap();
        std::fs::write(&audio, b"mp3").unwrap();

        let ctx = PipelineContext::new(WorkerConfig {
            work_dir: dir.path().join("work"),
            ..Default::default()
        })
        .with_fixed_acceleration(Acceleration::Software);
        let params = RenderParams::new(dir.path().join("out.mp4"));

        let err = run(
            &ctx,
            &image,
            &audio,
            None,
            Some(dir.path().join("logo.png").as_path()),
            &params,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            crate::error::WorkerError::Media(MediaError::FileNotFound(ref p)) if p.ends_with("logo.png")
        ));
    }

    #[tokio::test]
    async fn test_missing_optional_subtitles_rejected() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("a.png");
        let audio = dir.path().join("a.mp3");
        std::fs::write(&image, b"png").unwrap();
        std::fs::write(&audio, b"mp3").unwrap();

        let ctx = PipelineContext::new(WorkerConfig {
            work_dir: dir.path().join("work"),
            ..Default::default()
        });
        let params = RenderParams::new(dir.path().join("out.mp4"));
        let missing = dir.path().join("captions.srt");

        let err = run(&ctx, &image, &audio, Some(missing.as_path()), None, &params)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), reel_models::ErrorKind::Precondition);
    }
}
