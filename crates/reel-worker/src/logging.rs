//! Structured job logging.
//!
//! Every render runs inside one span carrying the job id and pipeline, so
//! the media crate's logs line up with the job that caused them.

use reel_models::{Acceleration, ErrorKind, JobId};
use std::path::Path;
use tracing::{error, info, warn, Span};

/// Lifecycle logger for one render job.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    pipeline: &'static str,
}

impl JobLogger {
    /// # Arguments
    /// * `job_id` - The unique identifier for the job
    /// * `pipeline` - Pipeline name, e.g. `"video_subtitles"`
    pub fn new(job_id: &JobId, pipeline: &'static str) -> Self {
        Self {
            job_id: job_id.to_string(),
            pipeline,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn pipeline(&self) -> &'static str {
        self.pipeline
    }

    /// Span wrapping the whole render.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("render", job_id = %self.job_id, pipeline = self.pipeline)
    }

    pub fn started(&self, output: &Path, force_redo: bool) {
        info!(
            job_id = %self.job_id,
            pipeline = self.pipeline,
            output = %output.display(),
            force_redo,
            "Render started"
        );
    }

    pub fn skipped(&self, output: &Path) {
        info!(
            job_id = %self.job_id,
            pipeline = self.pipeline,
            output = %output.display(),
            "Output exists, render skipped"
        );
    }

    /// Non-fatal problem outside the render itself.
    pub fn warning(&self, message: &str) {
        warn!(job_id = %self.job_id, pipeline = self.pipeline, "{}", message);
    }

    pub fn failed(&self, kind: ErrorKind, message: &str, elapsed_ms: u64) {
        error!(
            job_id = %self.job_id,
            pipeline = self.pipeline,
            error_kind = kind.as_str(),
            elapsed_ms,
            "Render failed: {}", message
        );
    }

    pub fn completed(&self, output: &Path, acceleration: Acceleration, elapsed_ms: u64) {
        info!(
            job_id = %self.job_id,
            pipeline = self.pipeline,
            output = %output.display(),
            acceleration = %acceleration,
            elapsed_ms,
            "Render completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_fields() {
        let logger = JobLogger::new(&JobId::from_string("job-42"), "one_step");
        assert_eq!(logger.job_id(), "job-42");
        assert_eq!(logger.pipeline(), "one_step");
    }

    #[test]
    fn test_lifecycle_without_subscriber() {
        let logger = JobLogger::new(&JobId::new(), "image_audio");
        let _guard = logger.create_span().entered();
        let output = Path::new("/out/a.mp4");
        logger.started(output, false);
        logger.skipped(output);
        logger.warning("output sweep failed");
        logger.failed(ErrorKind::EncodeFailure, "exit status 1", 1200);
        logger.completed(output, Acceleration::Software, 5400);
    }
}
