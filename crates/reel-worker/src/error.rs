//! Worker error types.

use reel_media::MediaError;
use reel_models::ErrorKind;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Output store error: {0}")]
    Store(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Category reported in a `PipelineResult`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::InvalidParams(_) => ErrorKind::Precondition,
            WorkerError::Media(e) => e.kind(),
            WorkerError::ConfigError(_)
            | WorkerError::Store(_)
            | WorkerError::Io(_)
            | WorkerError::Json(_) => ErrorKind::Internal,
        }
    }

    /// Message for the result, with encoder diagnostics appended when present.
    pub fn report(&self) -> String {
        match self {
            WorkerError::Media(e) => match e.stderr() {
                Some(stderr) if !stderr.is_empty() => format!("{e}\n{stderr}"),
                _ => e.to_string(),
            },
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_kind_mapping() {
        let missing: WorkerError = MediaError::FileNotFound(PathBuf::from("/x.srt")).into();
        assert_eq!(missing.kind(), ErrorKind::Precondition);
        assert_eq!(WorkerError::invalid_params("bad").kind(), ErrorKind::Precondition);
        assert_eq!(WorkerError::store("locked").kind(), ErrorKind::Internal);

        let decode: WorkerError = MediaError::decode_failed("no frames").into();
        assert_eq!(decode.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_report_includes_stderr() {
        let err: WorkerError = MediaError::ffmpeg_failed(
            "exit status 1",
            Some("Unknown encoder 'h264_nvenc'".to_string()),
            Some(1),
        )
        .into();
        assert_eq!(err.kind(), ErrorKind::EncodeFailure);
        let report = err.report();
        assert!(report.contains("exit status 1"));
        assert!(report.ends_with("Unknown encoder 'h264_nvenc'"));
    }
}
