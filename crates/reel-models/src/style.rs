//! Orientation, language, motion effect and subtitle profile definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Frame orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Wider than tall (16:9 target)
    Landscape,
    /// Taller than wide, or square (9:16 target)
    Portrait,
}

impl Orientation {
    /// Orientation rule shared by every pipeline: strictly wider is landscape.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// Target aspect ratio (width / height) for this orientation.
    pub fn target_aspect(&self) -> f64 {
        match self {
            Orientation::Landscape => 16.0 / 9.0,
            Orientation::Portrait => 9.0 / 16.0,
        }
    }

    pub fn is_portrait(&self) -> bool {
        matches!(self, Orientation::Portrait)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "landscape" => Ok(Orientation::Landscape),
            "portrait" => Ok(Orientation::Portrait),
            _ => Err(ParseEnumError::new("orientation", s)),
        }
    }
}

/// Subtitle language. Drives font choice and weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    /// CJK text; rendered bold to compensate for thin default glyphs
    Chinese,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Chinese => "chinese",
        }
    }

    pub fn is_cjk(&self) -> bool {
        matches!(self, Language::Chinese)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Language {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "chinese" | "zh" => Ok(Language::Chinese),
            _ => Err(ParseEnumError::new("language", s)),
        }
    }
}

/// Camera-motion effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    ZoomIn,
    ZoomOut,
    PanLeft,
    PanRight,
}

impl Effect {
    pub const ALL: &'static [Effect] = &[
        Effect::ZoomIn,
        Effect::ZoomOut,
        Effect::PanLeft,
        Effect::PanRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::ZoomIn => "zoom_in",
            Effect::ZoomOut => "zoom_out",
            Effect::PanLeft => "pan_left",
            Effect::PanRight => "pan_right",
        }
    }

    pub fn is_zoom(&self) -> bool {
        matches!(self, Effect::ZoomIn | Effect::ZoomOut)
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Effect {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zoom_in" => Ok(Effect::ZoomIn),
            "zoom_out" => Ok(Effect::ZoomOut),
            "pan_left" => Ok(Effect::PanLeft),
            "pan_right" => Ok(Effect::PanRight),
            _ => Err(ParseEnumError::new("effect", s)),
        }
    }
}

/// Wire form of an effect selection: the keyword `"random"` or a list.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawEffects {
    Keyword(String),
    List(Vec<String>),
}

/// Which motion effect a pipeline run may apply.
///
/// A list picks one entry at random per run; an empty list disables motion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEffects", into = "RawEffects")]
pub enum EffectSelection {
    /// Any of the four effects
    Random,
    /// One of the listed effects (deduplicated, order preserved)
    OneOf(Vec<Effect>),
}

impl EffectSelection {
    pub fn none() -> Self {
        EffectSelection::OneOf(Vec::new())
    }

    /// Zoom in or out, the default for image + audio renders.
    pub fn zooms() -> Self {
        EffectSelection::OneOf(vec![Effect::ZoomIn, Effect::ZoomOut])
    }

    pub fn single(effect: Effect) -> Self {
        EffectSelection::OneOf(vec![effect])
    }

    /// Candidate effects for this selection.
    pub fn candidates(&self) -> &[Effect] {
        match self {
            EffectSelection::Random => Effect::ALL,
            EffectSelection::OneOf(effects) => effects,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates().is_empty()
    }
}

impl Default for EffectSelection {
    fn default() -> Self {
        Self::none()
    }
}

impl TryFrom<RawEffects> for EffectSelection {
    type Error = ParseEnumError;

    fn try_from(raw: RawEffects) -> Result<Self, Self::Error> {
        match raw {
            RawEffects::Keyword(k) if k.eq_ignore_ascii_case("random") => {
                Ok(EffectSelection::Random)
            }
            RawEffects::Keyword(k) => Ok(EffectSelection::single(k.parse()?)),
            RawEffects::List(items) => {
                let mut effects: Vec<Effect> = Vec::with_capacity(items.len());
                for item in &items {
                    if item.eq_ignore_ascii_case("random") {
                        return Ok(EffectSelection::Random);
                    }
                    let effect: Effect = item.parse()?;
                    if !effects.contains(&effect) {
                        effects.push(effect);
                    }
                }
                Ok(EffectSelection::OneOf(effects))
            }
        }
    }
}

impl From<EffectSelection> for RawEffects {
    fn from(selection: EffectSelection) -> Self {
        match selection {
            EffectSelection::Random => RawEffects::Keyword("random".to_string()),
            EffectSelection::OneOf(effects) => {
                RawEffects::List(effects.iter().map(|e| e.as_str().to_string()).collect())
            }
        }
    }
}

/// Parameter band used by the subtitle style synthesizer.
///
/// The three render paths historically tuned their own font and margin
/// constants; each profile keeps its own numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StyleProfile {
    /// Burn-in onto an existing video
    #[default]
    Standard,
    /// Burn-in tuned for vertical video (layout header rewrite)
    Portrait,
    /// Image + audio + subtitles rendered in one encoder pass
    OneStep,
}

impl StyleProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleProfile::Standard => "standard",
            StyleProfile::Portrait => "portrait",
            StyleProfile::OneStep => "one_step",
        }
    }
}

impl fmt::Display for StyleProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error for unknown enum literals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
