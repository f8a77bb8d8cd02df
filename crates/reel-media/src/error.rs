//! Error types for media operations.

use reel_models::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Input file is empty: {0}")]
    EmptyInput(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    #[error("Subtitle style synthesis failed: {0}")]
    StyleSynthesis(String),

    #[error("Encoder produced no output at {0}")]
    EmptyOutput(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a decode failure error.
    pub fn decode_failed(message: impl Into<String>) -> Self {
        Self::DecodeFailed(message.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a style synthesis error.
    pub fn style_synthesis(message: impl Into<String>) -> Self {
        Self::StyleSynthesis(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Category reported in a `PipelineResult`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::FileNotFound(_)
            | MediaError::EmptyInput(_)
            | MediaError::InvalidInput(_) => ErrorKind::Precondition,
            MediaError::DecodeFailed(_) | MediaError::Image(_) => ErrorKind::Decode,
            MediaError::StyleSynthesis(_) => ErrorKind::StyleSynthesis,
            MediaError::FfmpegFailed { .. }
            | MediaError::EmptyOutput(_)
            | MediaError::Timeout(_) => ErrorKind::EncodeFailure,
            MediaError::FfmpegNotFound
            | MediaError::FfprobeNotFound
            | MediaError::FfprobeFailed { .. }
            | MediaError::Io(_)
            | MediaError::JsonParse(_)
            | MediaError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Captured encoder diagnostics, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            MediaError::FfmpegFailed { stderr, .. } | MediaError::FfprobeFailed { stderr, .. } => {
                stderr.as_deref()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            MediaError::FileNotFound(PathBuf::from("a.srt")).kind(),
            ErrorKind::Precondition
        );
        assert_eq!(MediaError::decode_failed("no frames").kind(), ErrorKind::Decode);
        assert_eq!(
            MediaError::ffmpeg_failed("boom", Some("x".into()), Some(1)).kind(),
            ErrorKind::EncodeFailure
        );
        assert_eq!(MediaError::Timeout(5).kind(), ErrorKind::EncodeFailure);
    }

    #[test]
    fn test_stderr_accessor() {
        let err = MediaError::ffmpeg_failed("boom", Some("Invalid argument".into()), Some(1));
        assert_eq!(err.stderr(), Some("Invalid argument"));
        assert!(MediaError::internal("x").stderr().is_none());
    }
}
