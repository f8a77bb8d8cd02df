//! Output encoding contract.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Software H.264 encoder
pub const SOFTWARE_VIDEO_CODEC: &str = "libx264";
/// NVIDIA hardware H.264 encoder
pub const HARDWARE_VIDEO_CODEC: &str = "h264_nvenc";
/// Default software preset
pub const SOFTWARE_PRESET: &str = "medium";
/// Default NVENC preset
pub const HARDWARE_PRESET: &str = "p4";
/// Default CRF for libx264
pub const SOFTWARE_CRF: u8 = 23;
/// Default constant-quality target for NVENC
pub const HARDWARE_CQ: u8 = 19;

/// Output frame rate (constant)
pub const OUTPUT_FPS: u32 = 30;
/// Output pixel format
pub const OUTPUT_PIX_FMT: &str = "yuv420p";

/// Audio output settings
pub const AUDIO_CODEC: &str = "aac";
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;
pub const AUDIO_CHANNELS: u32 = 2;
pub const AUDIO_BITRATE: &str = "128k";

/// Encoder acceleration mode chosen by the capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Acceleration {
    /// NVENC
    Hardware,
    /// libx264
    Software,
}

impl Acceleration {
    pub fn as_str(&self) -> &'static str {
        match self {
            Acceleration::Hardware => "hardware",
            Acceleration::Software => "software",
        }
    }
}

impl fmt::Display for Acceleration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Video encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264", "h264_nvenc")
    pub codec: String,

    /// Encoding preset (e.g., "medium", "p4")
    pub preset: String,

    /// Quality factor: CRF for libx264, CQ for NVENC (lower is better)
    pub quality: u8,

    /// Acceleration mode this config belongs to
    pub acceleration: Acceleration,
}

impl EncodingConfig {
    /// libx264 settings.
    pub fn software() -> Self {
        Self {
            codec: SOFTWARE_VIDEO_CODEC.to_string(),
            preset: SOFTWARE_PRESET.to_string(),
            quality: SOFTWARE_CRF,
            acceleration: Acceleration::Software,
        }
    }

    /// NVENC settings.
    pub fn hardware() -> Self {
        Self {
            codec: HARDWARE_VIDEO_CODEC.to_string(),
            preset: HARDWARE_PRESET.to_string(),
            quality: HARDWARE_CQ,
            acceleration: Acceleration::Hardware,
        }
    }

    pub fn for_acceleration(acceleration: Acceleration) -> Self {
        match acceleration {
            Acceleration::Hardware => Self::hardware(),
            Acceleration::Software => Self::software(),
        }
    }

    /// Convert to FFmpeg video codec arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        // NVENC uses -cq:v instead of -crf
        let quality_flag = match self.acceleration {
            Acceleration::Hardware => "-cq:v",
            Acceleration::Software => "-crf",
        };

        vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            quality_flag.to_string(),
            self.quality.to_string(),
        ]
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self::software()
    }
}

/// Fixed audio normalization applied to every output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AudioParams {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u32,
    pub bitrate: String,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            codec: AUDIO_CODEC.to_string(),
            sample_rate: AUDIO_SAMPLE_RATE,
            channels: AUDIO_CHANNELS,
            bitrate: AUDIO_BITRATE.to_string(),
        }
    }
}

impl AudioParams {
    /// Convert to FFmpeg audio arguments, including the explicit resample stage.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-af".to_string(),
            format!("aresample={}", self.sample_rate),
            "-c:a".to_string(),
            self.codec.clone(),
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-ac".to_string(),
            self.channels.to_string(),
            "-b:a".to_string(),
            self.bitrate.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EncodingConfig::default();
        assert_eq!(config.codec, "libx264");
        assert_eq!(config.quality, 23);
        assert_eq!(config.acceleration, Acceleration::Software);
    }

    #[test]
    fn test_software_args() {
        let args = EncodingConfig::software().to_ffmpeg_args();
        assert_eq!(args, vec!["-c:v", "libx264", "-preset", "medium", "-crf", "23"]);
    }

    #[test]
    fn test_nvenc_config() {
        let args = EncodingConfig::hardware().to_ffmpeg_args();
        assert!(args.contains(&"h264_nvenc".to_string()));
        assert!(args.contains(&"-cq:v".to_string())); // NVENC uses -cq instead of -crf
        assert!(!args.contains(&"-crf".to_string()));
    }

    #[test]
    fn test_audio_args() {
        let args = AudioParams::default().to_ffmpeg_args();
        assert_eq!(args[1], "aresample=48000");
        assert!(args.windows(2).any(|w| w[0] == "-ac" && w[1] == "2"));
        assert!(args.windows(2).any(|w| w[0] == "-b:a" && w[1] == "128k"));
    }
}
