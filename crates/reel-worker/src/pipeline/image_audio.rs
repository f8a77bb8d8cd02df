//! Still image + audio track → video.

use reel_media::{probe_media, EncodeRequest, MotionInput};
use reel_models::{EffectSelection, RenderParams};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{
    motion_note, orientation_for, require_input, still_source, watermark_for, PipelineContext,
    RenderOutcome,
};
use crate::error::WorkerResult;

/// Effects used when the job names none.
pub fn effects_or_default(selection: &EffectSelection) -> EffectSelection {
    if selection.is_empty() {
        EffectSelection::zooms()
    } else {
        selection.clone()
    }
}

pub async fn run(
    ctx: &PipelineContext,
    image: &Path,
    audio: &Path,
    watermark: Option<&Path>,
    params: &RenderParams,
) -> WorkerResult<RenderOutcome> {
    require_input(image)?;
    require_input(audio)?;
    let watermark = watermark_for(watermark, ctx.config())?;

    let (width, height) = probe_media(image).await?.dimensions()?;
    let duration = probe_media(audio).await?.require_duration()?;
    let orientation = orientation_for(params, width, height);
    info!(width, height, duration, orientation = %orientation, "Probed inputs");

    let work = ctx.work_dir()?;
    let motion = ctx
        .apply_motion(
            work.path(),
            MotionInput::still(image, duration),
            &effects_or_default(&params.effects),
            orientation,
        )
        .await?;

    let (video, geometry) = still_source(image, motion.as_ref(), width, height, orientation);
    let request = EncodeRequest {
        video,
        audio: Some(audio.to_path_buf()),
        geometry,
        subtitles: None,
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
            "Merged image and audio ({:.1}s){}",
            duration,
            motion_note(motion.as_ref())
        ),
    })
}
