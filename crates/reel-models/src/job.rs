//! Render job definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::params::RenderParams;

/// Unique identifier for a render job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which pipeline a job runs, with its materialized input paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum JobInputs {
    /// Still image + audio track
    ImageAudio {
        image: PathBuf,
        audio: PathBuf,
        #[serde(default)]
        watermark: Option<PathBuf>,
    },
    /// Existing video + subtitle script
    VideoSubtitles {
        video: PathBuf,
        subtitles: PathBuf,
        #[serde(default)]
        watermark: Option<PathBuf>,
        /// Use the portrait-tuned style profile
        #[serde(default)]
        portrait_profile: bool,
    },
    /// Still image + audio + optional subtitles in a single encoder pass
    OneStep {
        image: PathBuf,
        audio: PathBuf,
        #[serde(default)]
        subtitles: Option<PathBuf>,
        #[serde(default)]
        watermark: Option<PathBuf>,
    },
}

impl JobInputs {
    pub fn kind(&self) -> &'static str {
        match self {
            JobInputs::ImageAudio { .. } => "image_audio",
            JobInputs::VideoSubtitles { .. } => "video_subtitles",
            JobInputs::OneStep { .. } => "one_step",
        }
    }
}

/// A complete render request as read from a job file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RenderJob {
    #[serde(default)]
    pub id: JobId,
    pub inputs: JobInputs,
    pub params: RenderParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_display() {
        let id = JobId::from_string("job-1");
        assert_eq!(id.to_string(), "job-1");
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_render_job_from_json() {
        let json = r#"{
            "inputs": {"kind": "one_step", "image": "/in/a.png", "audio": "/in/a.mp3"},
            "params": {"output_path": "/out/a.mp4", "language": "chinese"}
        }"#;
        let job: RenderJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.inputs.kind(), "one_step");
        assert!(!job.id.as_str().is_empty());
    }

    #[test]
    fn test_render_job_rejects_unknown_keys() {
        let json = r#"{
            "inputs": {"kind": "image_audio", "image": "a.png", "audio": "a.mp3", "extra": 1},
            "params": {"output_path": "a.mp4"}
        }"#;
        assert!(serde_json::from_str::<RenderJob>(json).is_err());
    }
}
