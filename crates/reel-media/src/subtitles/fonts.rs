//! Font resolution for burned-in subtitles.

use reel_models::Language;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Latin-script default family.
pub const DEFAULT_FONT_FAMILY: &str = "Ubuntu";
/// Preferred CJK family when installed system-wide.
pub const CJK_FONT_FAMILY: &str = "LXGW WenKai Bold";
/// Family substring looked for in `fc-list` output.
const CJK_FAMILY_PROBE: &str = "LXGW WenKai";

/// Known CJK font files, in preference order.
pub const CJK_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/lxgw/LXGWWenKai-Bold.ttf",
    "/usr/local/share/fonts/LXGWWenKai-Bold.ttf",
    "/home/ubuntu/.local/share/fonts/LXGWWenKai-Bold.ttf",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Bold.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
];

/// Family name for the style line plus an optional directory for libass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFont {
    pub family: String,
    /// Passed as `fontsdir` to the `ass` filter
    pub fonts_dir: Option<PathBuf>,
}

impl ResolvedFont {
    pub fn family(name: impl Into<String>) -> Self {
        Self {
            family: name.into(),
            fonts_dir: None,
        }
    }

    /// Font shipped as a file: the stem names the family, the parent is the fonts dir.
    pub fn from_file(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string());
        if stem.starts_with("LXGWWenKai") {
            return Self {
                family: CJK_FONT_FAMILY.to_string(),
                fonts_dir: path.parent().map(Path::to_path_buf),
            };
        }
        Self {
            family: stem,
            fonts_dir: path.parent().map(Path::to_path_buf),
        }
    }
}

/// Resolve the font for `language`, honouring a configured override.
///
/// The override may be a family name or a path to a font file.
pub async fn resolve_font(language: Language, font_override: Option<&str>) -> ResolvedFont {
    let families = if language.is_cjk() && font_override.is_none() {
        list_font_families().await
    } else {
        String::new()
    };
    let font = resolve_from(language, font_override, &families, |p| p.is_file());
    info!(
        language = %language,
        family = %font.family,
        fonts_dir = ?font.fonts_dir,
        "Resolved subtitle font"
    );
    font
}

/// Pure resolution step over pre-collected `fc-list` output.
pub fn resolve_from<F>(
    language: Language,
    font_override: Option<&str>,
    fc_families: &str,
    exists: F,
) -> ResolvedFont
where
    F: Fn(&Path) -> bool,
{
    if let Some(value) = font_override.map(str::trim).filter(|v| !v.is_empty()) {
        let path = Path::new(value);
        if exists(path) {
            return ResolvedFont::from_file(path);
        }
        return ResolvedFont::family(value);
    }

    if !language.is_cjk() {
        return ResolvedFont::family(DEFAULT_FONT_FAMILY);
    }

    if fc_families.lines().any(|l| l.contains(CJK_FAMILY_PROBE)) {
        return ResolvedFont::family(CJK_FONT_FAMILY);
    }

    CJK_FONT_PATHS
        .iter()
        .map(Path::new)
        .find(|p| exists(p))
        .map(ResolvedFont::from_file)
        .unwrap_or_else(|| ResolvedFont::family(DEFAULT_FONT_FAMILY))
}

/// Installed families as printed by `fc-list :family`; empty when unavailable.
async fn list_font_families() -> String {
    if which::which("fc-list").is_err() {
        debug!("fc-list not found, skipping installed font lookup");
        return String::new();
    }
    match Command::new("fc-list")
        .arg(":family")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
    {
        Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout).to_string(),
        Ok(output) => {
            debug!(status = %output.status, "fc-list failed");
            String::new()
        }
        Err(e) => {
            debug!(error = %e, "fc-list could not be spawned");
            String::new()
        }
    }
}
