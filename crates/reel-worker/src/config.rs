//! Worker configuration.

use reel_media::AccelerationMode;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root under which each invocation gets its own temp directory
    pub work_dir: PathBuf,
    /// Wall-clock limit for one encoder run (`None` = unbounded)
    pub ffmpeg_timeout: Option<Duration>,
    /// Limit for the NVENC capability probe
    pub probe_timeout: Duration,
    /// Probe for hardware encoding at all
    pub hardware_probe: bool,
    /// Always encode with libx264
    pub force_software: bool,
    /// Subtitle font family or font file that replaces the language default
    pub font_override: Option<String>,
    /// Watermark opacity (0.0 to 1.0); unset keeps the image alpha
    pub watermark_opacity: Option<f32>,
    /// How long finished outputs stay registered before the sweep deletes them
    pub output_ttl: Duration,
    /// Frames per parallel motion batch
    pub motion_batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("reelcast"),
            ffmpeg_timeout: None,
            probe_timeout: Duration::from_secs(10),
            hardware_probe: true,
            force_software: false,
            font_override: None,
            watermark_opacity: None,
            output_ttl: Duration::from_secs(24 * 3600),
            motion_batch_size: reel_media::motion::DEFAULT_BATCH_SIZE,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: env_string("REEL_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            ffmpeg_timeout: env_parse::<u64>("REEL_FFMPEG_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            probe_timeout: Duration::from_secs(
                env_parse("REEL_PROBE_TIMEOUT_SECS").unwrap_or(defaults.probe_timeout.as_secs()),
            ),
            hardware_probe: env_flag("REEL_HARDWARE_PROBE", defaults.hardware_probe),
            force_software: env_flag("REEL_FORCE_SOFTWARE", defaults.force_software),
            font_override: env_string("REEL_SUBTITLE_FONT"),
            watermark_opacity: env_parse("REEL_WATERMARK_OPACITY"),
            output_ttl: Duration::from_secs(
                env_parse("REEL_OUTPUT_TTL_SECS").unwrap_or(defaults.output_ttl.as_secs()),
            ),
            motion_batch_size: env_parse("REEL_MOTION_BATCH_SIZE")
                .unwrap_or(defaults.motion_batch_size),
        }
    }

    /// Reject values the pipelines cannot work with.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.motion_batch_size == 0 {
            return Err(WorkerError::config_error("motion batch size must be at least 1"));
        }
        if self.probe_timeout.is_zero() {
            return Err(WorkerError::config_error("probe timeout must be positive"));
        }
        if let Some(opacity) = self.watermark_opacity {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(WorkerError::config_error(format!(
                    "watermark opacity {opacity} outside 0.0..=1.0"
                )));
            }
        }
        Ok(())
    }

    /// How the encoder path is chosen.
    pub fn acceleration_mode(&self) -> AccelerationMode {
        if self.force_software || !self.hardware_probe {
            AccelerationMode::ForceSoftware
        } else {
            AccelerationMode::Auto
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = WorkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.acceleration_mode(), AccelerationMode::Auto);
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert!(config.ffmpeg_timeout.is_none());
    }

    #[test]
    fn test_force_software_wins() {
        let config = WorkerConfig {
            force_software: true,
            ..Default::default()
        };
        assert_eq!(config.acceleration_mode(), AccelerationMode::ForceSoftware);

        let config = WorkerConfig {
            hardware_probe: false,
            ..Default::default()
        };
        assert_eq!(config.acceleration_mode(), AccelerationMode::ForceSoftware);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = WorkerConfig {
            motion_batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(WorkerError::ConfigError(_))));

        let config = WorkerConfig {
            watermark_opacity: Some(1.5),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_flag_parsing() {
        std::env::set_var("REEL_TEST_FLAG_ON", "Yes");
        std::env::set_var("REEL_TEST_FLAG_OFF", "0");
        assert!(env_flag("REEL_TEST_FLAG_ON", false));
        assert!(!env_flag("REEL_TEST_FLAG_OFF", true));
        assert!(env_flag("REEL_TEST_FLAG_UNSET", true));
    }
}
