//! Rendering pipelines for reelcast.
//!
//! This crate provides:
//! - Image + audio, video + subtitles and one-step pipelines
//! - Environment-driven configuration
//! - Structured job logging
//! - A registry of delivered outputs with expiry

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod store;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use pipeline::{PipelineContext, RenderOutcome};
pub use store::{sweep_expired, InMemoryOutputStore, OutputRecord, OutputStore};
