//! Validated render parameters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::{Validate, ValidationError};

use crate::style::{EffectSelection, Language, Orientation, RawEffects};

/// Default outline colour (opaque black, ASS `&HAABBGGRR`).
pub const DEFAULT_OUTLINE_COLOUR: &str = "&H00000000";
/// Default background box opacity.
pub const DEFAULT_BACKGROUND_OPACITY: f64 = 0.5;

/// User-facing parameters shared by every pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct RenderParams {
    /// Explicit font size; bypasses the resolution-based computation
    #[serde(default)]
    #[validate(range(min = 8, max = 200))]
    pub font_size: Option<u32>,

    /// Outline colour as an ASS colour literal
    #[serde(default = "default_outline_colour", alias = "outline_colour")]
    #[validate(custom(function = "validate_ass_colour"))]
    pub outline_color: String,

    /// Draw a filled box behind subtitle text
    #[serde(default = "default_true")]
    pub background_box: bool,

    /// Box opacity in [0, 1]
    #[serde(default = "default_background_opacity")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub background_opacity: f64,

    #[serde(default)]
    pub language: Language,

    /// Orientation override; derived from the frame dimensions when absent
    #[serde(default)]
    pub orientation: Option<Orientation>,

    /// Motion effects to pick from
    #[serde(default)]
    #[schemars(with = "Option<RawEffects>")]
    pub effects: EffectSelection,

    /// Final artifact location
    #[validate(custom(function = "validate_output_path"))]
    pub output_path: PathBuf,

    /// Re-render even if `output_path` already exists
    #[serde(default)]
    pub force_redo: bool,
}

fn default_outline_colour() -> String {
    DEFAULT_OUTLINE_COLOUR.to_string()
}

fn default_true() -> bool {
    true
}

fn default_background_opacity() -> f64 {
    DEFAULT_BACKGROUND_OPACITY
}

impl RenderParams {
    /// Parameters with defaults for everything but the output path.
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            font_size: None,
            outline_color: default_outline_colour(),
            background_box: true,
            background_opacity: DEFAULT_BACKGROUND_OPACITY,
            language: Language::default(),
            orientation: None,
            effects: EffectSelection::default(),
            output_path: output_path.into(),
            force_redo: false,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_effects(mut self, effects: EffectSelection) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_background(mut self, enabled: bool, opacity: f64) -> Self {
        self.background_box = enabled;
        self.background_opacity = opacity;
        self
    }

    pub fn with_font_size(mut self, size: u32) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn with_force_redo(mut self, force: bool) -> Self {
        self.force_redo = force;
        self
    }

    /// Validate and flatten errors into one message.
    pub fn check(&self) -> Result<(), String> {
        self.validate().map_err(|e| e.to_string())
    }
}

/// Check an ASS colour literal: `&H` followed by 6 or 8 hex digits, optional trailing `&`.
pub fn is_ass_colour(value: &str) -> bool {
    let Some(hex) = value
        .strip_prefix("&H")
        .or_else(|| value.strip_prefix("&h"))
    else {
        return false;
    };
    let hex = hex.strip_suffix('&').unwrap_or(hex);
    matches!(hex.len(), 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn validate_ass_colour(value: &String) -> Result<(), ValidationError> {
    if is_ass_colour(value) {
        Ok(())
    } else {
        Err(ValidationError::new("ass_colour"))
    }
}

fn validate_output_path(value: &PathBuf) -> Result<(), ValidationError> {
    if value.as_os_str().is_empty() {
        return Err(ValidationError::new("empty_output_path"));
    }
    if value.is_dir() {
        return Err(ValidationError::new("output_path_is_directory"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let params: RenderParams = serde_json::from_str(r#"{"output_path": "out.mp4"}"#).unwrap();
        assert_eq!(params.outline_color, "&H00000000");
        assert!(params.background_box);
        assert!((params.background_opacity - 0.5).abs() < f64::EPSILON);
        assert_eq!(params.language, Language::English);
        assert!(params.effects.is_empty());
        assert!(params.check().is_ok());
    }

    #[test]
    fn test_opacity_out_of_range_rejected() {
        let params = RenderParams::new("out.mp4").with_background(true, 1.5);
        assert!(params.check().is_err());
    }

    #[test]
    fn test_bad_colour_rejected() {
        let mut params = RenderParams::new("out.mp4");
        params.outline_color = "black".to_string();
        assert!(params.check().is_err());
    }

    #[test]
    fn test_font_size_range() {
        assert!(RenderParams::new("o.mp4").with_font_size(24).check().is_ok());
        assert!(RenderParams::new("o.mp4").with_font_size(2).check().is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = serde_json::from_str::<RenderParams>(r#"{"output_path": "o.mp4", "blur": 3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_ass_colour_literals() {
        assert!(is_ass_colour("&H00000000"));
        assert!(is_ass_colour("&HFFFFFF"));
        assert!(is_ass_colour("&H80FF00FF&"));
        assert!(!is_ass_colour("#000000"));
        assert!(!is_ass_colour("&H0000"));
    }
}
