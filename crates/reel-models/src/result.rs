//! Terminal pipeline result.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::encoding::Acceleration;

/// Failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Required input missing, empty or invalid; nothing was launched
    Precondition,
    /// Source stream unreadable or yielded no frames
    Decode,
    /// Subtitle style rewrite failed; recovered by keeping the script as-is
    StyleSynthesis,
    /// Hardware encoder missing; recovered by the software path
    EncoderUnavailable,
    /// External encoder failed or produced no output
    EncodeFailure,
    /// Anything else (I/O, configuration)
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Precondition => "precondition",
            ErrorKind::Decode => "decode",
            ErrorKind::StyleSynthesis => "style_synthesis",
            ErrorKind::EncoderUnavailable => "encoder_unavailable",
            ErrorKind::EncodeFailure => "encode_failure",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Outcome of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PipelineResult {
    pub success: bool,
    /// Final artifact; owned by the caller on success
    pub output_path: Option<PathBuf>,
    /// Human-readable status or diagnostic text
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Encoder path used for the final pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceleration: Option<Acceleration>,
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Utc>,
}

impl PipelineResult {
    pub fn success(
        output_path: impl Into<PathBuf>,
        message: impl Into<String>,
        acceleration: Option<Acceleration>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            success: true,
            output_path: Some(output_path.into()),
            message: message.into(),
            error_kind: None,
            acceleration,
            elapsed_ms,
            finished_at: Utc::now(),
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            success: false,
            output_path: None,
            message: message.into(),
            error_kind: Some(kind),
            acceleration: None,
            elapsed_ms,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_serialization() {
        let result = PipelineResult::failure(ErrorKind::Precondition, "missing subtitle", 3);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_kind"], "precondition");
        assert!(json.get("acceleration").is_none());
    }

    #[test]
    fn test_success_carries_path() {
        let result = PipelineResult::success("/out/a.mp4", "ok", Some(Acceleration::Software), 10);
        assert!(result.success);
        assert_eq!(result.output_path.unwrap(), PathBuf::from("/out/a.mp4"));
        assert!(result.error_kind.is_none());
    }
}
