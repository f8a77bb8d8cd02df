//! Resolution-, orientation- and language-driven subtitle style computation.

use reel_models::{Language, Orientation, StyleProfile};
use serde::{Deserialize, Serialize};

/// Reference height the font-size bands are tuned for.
const REFERENCE_HEIGHT: f64 = 1080.0;

/// Canonical field list of a `[V4+ Styles]` section.
pub const STYLE_FORMAT_LINE: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";

pub const PRIMARY_COLOUR: &str = "&H00FFFFFF";
pub const SECONDARY_COLOUR: &str = "&H00000000";
/// Translucent black used when no box is drawn.
pub const OUTLINE_MODE_BACK_COLOUR: &str = "&H80000000";
/// Bottom centre.
pub const ALIGNMENT_BOTTOM_CENTER: u8 = 2;
pub const HORIZONTAL_MARGIN: u32 = 10;

/// ASS `BorderStyle` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    /// Outline plus drop shadow
    Outline,
    /// Filled box behind each line (libass style 4)
    OpaqueBox,
}

impl BorderStyle {
    pub fn code(&self) -> u8 {
        match self {
            BorderStyle::Outline => 1,
            BorderStyle::OpaqueBox => 4,
        }
    }
}

/// A fully synthesized style line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleStyle {
    pub font: String,
    pub font_size: u32,
    pub primary_colour: String,
    pub secondary_colour: String,
    pub outline_colour: String,
    pub back_colour: String,
    pub border_style: BorderStyle,
    pub outline: u32,
    pub shadow: u32,
    pub alignment: u8,
    pub margin_l: u32,
    pub margin_r: u32,
    pub margin_v: u32,
    pub bold: bool,
}

impl SubtitleStyle {
    /// Render as a `Style:` line matching [`STYLE_FORMAT_LINE`].
    pub fn to_style_line(&self, name: &str) -> String {
        format!(
            "Style: {},{},{},{},{},{},{},{},0,0,0,100,100,0,0,{},{},{},{},{},{},{},1",
            name,
            self.font,
            self.font_size,
            self.primary_colour,
            self.secondary_colour,
            self.outline_colour,
            self.back_colour,
            if self.bold { 1 } else { 0 },
            self.border_style.code(),
            self.outline,
            self.shadow,
            self.alignment,
            self.margin_l,
            self.margin_r,
            self.margin_v,
        )
    }

    /// Same style with both horizontal margins set to `margin`.
    pub fn with_horizontal_margins(mut self, margin: u32) -> Self {
        self.margin_l = margin;
        self.margin_r = margin;
        self
    }
}

/// Inputs to [`synthesize`].
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRequest {
    pub video_width: u32,
    pub video_height: u32,
    pub orientation: Orientation,
    pub language: Language,
    /// Explicit size; skips the band computation
    pub font_size: Option<u32>,
    pub outline_colour: String,
    pub background_box: bool,
    pub background_opacity: f64,
    pub profile: StyleProfile,
    /// Resolved font family name
    pub font: String,
}

impl StyleRequest {
    /// Whether the script's `[Script Info]` layout is rewritten to the video size.
    pub fn rewrites_layout(&self) -> bool {
        self.orientation.is_portrait() || self.profile == StyleProfile::Portrait
    }
}

/// Font-size band: `round(h / 1080 × base)` clamped to `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontBand {
    pub base: u32,
    pub min: u32,
    pub max: u32,
}

impl FontBand {
    const fn new(base: u32, min: u32, max: u32) -> Self {
        Self { base, min, max }
    }

    pub fn size_for_height(&self, height: u32) -> u32 {
        let scaled = (height as f64 / REFERENCE_HEIGHT * self.base as f64).round() as u32;
        scaled.clamp(self.min, self.max)
    }
}

/// Band for a profile, orientation and language.
pub fn font_band(profile: StyleProfile, orientation: Orientation, language: Language) -> FontBand {
    match (profile, orientation, language) {
        (StyleProfile::Standard, _, _) => FontBand::new(16, 18, 32),
        (StyleProfile::Portrait, Orientation::Portrait, _) => FontBand::new(33, 22, 39),
        (StyleProfile::Portrait, Orientation::Landscape, _) => FontBand::new(30, 24, 48),
        (StyleProfile::OneStep, Orientation::Portrait, Language::Chinese) => FontBand::new(21, 18, 39),
        (StyleProfile::OneStep, Orientation::Portrait, Language::English) => FontBand::new(30, 24, 48),
        (StyleProfile::OneStep, Orientation::Landscape, _) => FontBand::new(16, 18, 32),
    }
}

/// Vertical margin: a quarter of the height for portrait video, fixed otherwise.
pub fn vertical_margin(profile: StyleProfile, orientation: Orientation, height: u32) -> u32 {
    match orientation {
        Orientation::Portrait => ((height as f64 * 0.25).round() as u32).clamp(100, 350),
        Orientation::Landscape => match profile {
            StyleProfile::Portrait => 60,
            StyleProfile::Standard | StyleProfile::OneStep => 30,
        },
    }
}

/// `&H{AA}000000` with `AA = round(opacity × 255)` in upper-case hex.
pub fn box_back_colour(opacity: f64) -> String {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("&H{alpha:02X}000000")
}

/// Horizontal margin used with a rewritten layout header: 5 % of the width.
pub fn layout_horizontal_margin(width: u32) -> u32 {
    (width as f64 * 0.05).round() as u32
}

/// Compute the style for a render.
pub fn synthesize(request: &StyleRequest) -> SubtitleStyle {
    let font_size = request.font_size.unwrap_or_else(|| {
        font_band(request.profile, request.orientation, request.language)
            .size_for_height(request.video_height)
    });

    let portrait_video = request.orientation.is_portrait();
    let (border_style, back_colour, outline, shadow) = if request.background_box {
        (
            BorderStyle::OpaqueBox,
            box_back_colour(request.background_opacity),
            0,
            0,
        )
    } else {
        let outline = match request.profile {
            StyleProfile::Standard => 2,
            StyleProfile::Portrait | StyleProfile::OneStep if portrait_video => 3,
            StyleProfile::Portrait | StyleProfile::OneStep => 2,
        };
        let shadow = if request.profile == StyleProfile::Portrait { 1 } else { 0 };
        (
            BorderStyle::Outline,
            OUTLINE_MODE_BACK_COLOUR.to_string(),
            outline,
            shadow,
        )
    };

    let bold = request.language.is_cjk() || request.profile == StyleProfile::Portrait;

    let style = SubtitleStyle {
        font: request.font.clone(),
        font_size,
        primary_colour: PRIMARY_COLOUR.to_string(),
        secondary_colour: SECONDARY_COLOUR.to_string(),
        outline_colour: request.outline_colour.clone(),
        back_colour,
        border_style,
        outline,
        shadow,
        alignment: ALIGNMENT_BOTTOM_CENTER,
        margin_l: HORIZONTAL_MARGIN,
        margin_r: HORIZONTAL_MARGIN,
        margin_v: vertical_margin(request.profile, request.orientation, request.video_height),
        bold,
    };

    if request.rewrites_layout() {
        style.with_horizontal_margins(layout_horizontal_margin(request.video_width))
    } else {
        style
    }
}
