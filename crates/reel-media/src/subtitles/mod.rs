//! Adaptive subtitle styling.
//!
//! Turns a SubRip or ASS input into an ASS script in the work directory whose
//! style table (and, for vertical output, layout header) is computed from the
//! video geometry and language. A failed rewrite is never fatal: the script
//! is used as-is and a warning is logged.

pub mod ass;
pub mod fonts;
pub mod srt;
pub mod style;

pub use fonts::{resolve_font, ResolvedFont};
pub use style::{synthesize, BorderStyle, StyleRequest, SubtitleStyle};

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::error::{MediaError, MediaResult};

/// Subtitle script ready for the `ass` filter.
#[derive(Debug, Clone)]
pub struct PreparedSubtitles {
    /// Script inside the work directory
    pub script: PathBuf,
    pub fonts_dir: Option<PathBuf>,
    pub style: SubtitleStyle,
    /// Whether the style rewrite was applied
    pub styled: bool,
}

/// Input flavour, by extension first and content second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubtitleFormat {
    SubRip,
    Ass,
}

fn detect_format(path: &Path, text: &str) -> SubtitleFormat {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("ass") | Some("ssa") => SubtitleFormat::Ass,
        Some("srt") => SubtitleFormat::SubRip,
        _ if text.contains("[Events]") => SubtitleFormat::Ass,
        _ => SubtitleFormat::SubRip,
    }
}

/// Convert or copy `source` into `work_dir`, then apply the synthesized style.
///
/// Returns `None` for a SubRip file without a single timed cue; the caller
/// renders without subtitles.
pub async fn prepare_subtitles(
    source: &Path,
    work_dir: &Path,
    request: &StyleRequest,
    font: &ResolvedFont,
) -> MediaResult<Option<PreparedSubtitles>> {
    if !source.exists() {
        return Err(MediaError::FileNotFound(source.to_path_buf()));
    }

    let bytes = fs::read(source).await?;
    let script = work_dir.join("subtitles.ass");

    // Non-UTF-8 input: copy verbatim and let the style rewrite report it
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            fs::write(&script, e.as_bytes()).await?;
            let style = synthesize(request);
            warn!(
                path = %source.display(),
                error = %MediaError::style_synthesis("subtitle file is not valid UTF-8"),
                "Using subtitle script without style rewrite"
            );
            return Ok(Some(PreparedSubtitles {
                script,
                fonts_dir: font.fonts_dir.clone(),
                style,
                styled: false,
            }));
        }
    };

    let format = detect_format(source, &text);
    let ass_text = match format {
        SubtitleFormat::SubRip => {
            let cues = srt::parse_cues(&text);
            if cues.is_empty() {
                warn!(path = %source.display(), "Subtitle file has no cues; rendering without subtitles");
                return Ok(None);
            }
            srt::cues_to_ass(&cues)
        }
        SubtitleFormat::Ass => text,
    };
    fs::write(&script, &ass_text).await?;

    let style = synthesize(request);
    let styled = match apply_style(&script, &ass_text, request, &style).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                path = %script.display(),
                error = %e,
                "Subtitle style rewrite failed; using script unmodified"
            );
            false
        }
    };

    info!(
        source = %source.display(),
        format = ?format,
        font = %style.font,
        font_size = style.font_size,
        margin_v = style.margin_v,
        bold = style.bold,
        border_style = style.border_style.code(),
        styled,
        "Prepared subtitles"
    );

    Ok(Some(PreparedSubtitles {
        script,
        fonts_dir: font.fonts_dir.clone(),
        style,
        styled,
    }))
}

/// Rewrite the style table and, when needed, the layout header; the file is
/// only replaced once both rewrites succeeded.
async fn apply_style(
    script: &Path,
    text: &str,
    request: &StyleRequest,
    style: &SubtitleStyle,
) -> MediaResult<()> {
    let mut rewritten = ass::rewrite_styles(text, style)?;
    if request.rewrites_layout() {
        rewritten = ass::rewrite_layout_header(&rewritten, request.video_width, request.video_height)?;
    }
    fs::write(script, rewritten)
        .await
        .map_err(|e| MediaError::style_synthesis(format!("cannot write styled script: {e}")))
}
