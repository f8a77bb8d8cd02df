//! Shared data models for the reelcast rendering pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Render jobs and validated parameters
//! - Orientation, language, motion effects and subtitle style profiles
//! - Crop rectangles
//! - Encoding configuration and the fixed audio contract
//! - Pipeline results

pub mod encoding;
pub mod job;
pub mod params;
pub mod rect;
pub mod result;
pub mod style;

// Re-export common types
pub use encoding::{Acceleration, AudioParams, EncodingConfig};
pub use job::{JobId, JobInputs, RenderJob};
pub use params::RenderParams;
pub use rect::CropRect;
pub use result::{ErrorKind, PipelineResult};
pub use style::{Effect, EffectSelection, Language, Orientation, StyleProfile};
