//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Broad media category of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

/// Probed input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub kind: MediaKind,
    /// Displayed width in pixels (image/video), after any rotation
    pub width: Option<u32>,
    /// Displayed height in pixels (image/video), after any rotation
    pub height: Option<u32>,
    /// Duration in seconds (audio/video)
    pub duration: Option<f64>,
    /// Frame rate (video)
    pub fps: Option<f64>,
    /// Frames in the video stream itself (video)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<u64>,
    pub has_audio: bool,
}

impl MediaAsset {
    /// Frame dimensions, rejecting missing or zero sizes.
    pub fn dimensions(&self) -> MediaResult<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Ok((w, h)),
            _ => Err(MediaError::invalid_input(format!(
                "no usable frame dimensions in {}",
                self.path.display()
            ))),
        }
    }

    /// Positive duration, rejecting missing or zero values.
    pub fn require_duration(&self) -> MediaResult<f64> {
        match self.duration {
            Some(d) if d > 0.0 => Ok(d),
            _ => Err(MediaError::invalid_input(format!(
                "no usable duration in {}",
                self.path.display()
            ))),
        }
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    format_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    #[serde(default)]
    disposition: FfprobeDisposition,
    #[serde(default)]
    tags: FfprobeTags,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
}

impl FfprobeStream {
    /// Display rotation in degrees, normalized to `0..360`. The display
    /// matrix wins over the legacy `rotate` tag.
    fn rotation(&self) -> i32 {
        let degrees = self
            .side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .or_else(|| self.tags.rotate.as_deref().and_then(|r| r.trim().parse().ok()))
            .unwrap_or(0.0);
        (degrees.round() as i32).rem_euclid(360)
    }

    /// Coded size swapped for quarter-turn rotations.
    fn display_dimensions(&self) -> (Option<u32>, Option<u32>) {
        match self.rotation() {
            90 | 270 => (self.height, self.width),
            _ => (self.width, self.height),
        }
    }

    fn duration(&self) -> Option<f64> {
        self.duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| *d > 0.0)
    }

    /// Frame count from `nb_frames`, else the stream's own duration.
    fn frame_count(&self, fps: Option<f64>) -> Option<u64> {
        self.nb_frames
            .as_deref()
            .and_then(|n| n.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .or_else(|| Some((self.duration()? * fps?).ceil() as u64))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    rotation: Option<f64>,
}

/// Containers FFprobe reports for still images.
const IMAGE_FORMATS: &[&str] = &["image2", "png_pipe", "jpeg_pipe", "webp_pipe", "bmp_pipe"];

/// Probe a media file.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaAsset> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("FFprobe failed on {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    let asset = asset_from_probe(path, probe)?;
    debug!(
        path = %path.display(),
        kind = ?asset.kind,
        width = ?asset.width,
        height = ?asset.height,
        duration = ?asset.duration,
        frames = ?asset.frames,
        "Probed media"
    );
    Ok(asset)
}

fn asset_from_probe(path: &Path, probe: FfprobeOutput) -> MediaResult<MediaAsset> {
    let format_name = probe
        .format
        .as_ref()
        .and_then(|f| f.format_name.clone())
        .unwrap_or_default();

    // Cover art in audio files shows up as an attached-picture video stream
    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video" && s.disposition.attached_pic == 0);
    let has_audio = probe.streams.iter().any(|s| s.codec_type == "audio");

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or_else(|| video_stream.and_then(|s| s.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok());

    let kind = match video_stream {
        Some(_) if IMAGE_FORMATS.iter().any(|f| format_name.split(',').any(|n| n == *f)) => {
            MediaKind::Image
        }
        Some(_) => MediaKind::Video,
        None if has_audio => MediaKind::Audio,
        None => {
            return Err(MediaError::invalid_input(format!(
                "no audio or video stream in {}",
                path.display()
            )))
        }
    };

    let fps = match kind {
        MediaKind::Video => video_stream.and_then(|s| {
            s.avg_frame_rate
                .as_deref()
                .and_then(parse_frame_rate)
                .or_else(|| s.r_frame_rate.as_deref().and_then(parse_frame_rate))
        }),
        _ => None,
    };
    let frames = match kind {
        MediaKind::Video => video_stream.and_then(|s| s.frame_count(fps)),
        _ => None,
    };
    let (width, height) = video_stream
        .map(FfprobeStream::display_dimensions)
        .unwrap_or((None, None));

    Ok(MediaAsset {
        path: path.to_path_buf(),
        kind,
        width,
        height,
        duration: if kind == MediaKind::Image { None } else { duration },
        fps,
        frames,
        has_audio,
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> MediaResult<MediaAsset> {
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        asset_from_probe(Path::new("/in/x"), probe)
    }

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_video_with_audio() {
        let asset = parse(
            r#"{"format": {"duration": "10.0", "format_name": "mov,mp4,m4a,3gp,3g2,mj2"},
                "streams": [
                  {"codec_type": "video", "width": 1920, "height": 1080, "avg_frame_rate": "30/1"},
                  {"codec_type": "audio"}
                ]}"#,
        )
        .unwrap();
        assert_eq!(asset.kind, MediaKind::Video);
        assert_eq!(asset.dimensions().unwrap(), (1920, 1080));
        assert!(asset.has_audio);
        assert!((asset.fps.unwrap() - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_frames_come_from_the_video_stream() {
        let asset = parse(
            r#"{"format": {"duration": "12.0", "format_name": "mov,mp4,m4a,3gp,3g2,mj2"},
                "streams": [
                  {"codec_type": "video", "width": 1280, "height": 720, "avg_frame_rate": "25/1",
                   "duration": "10.000000", "nb_frames": "250"},
                  {"codec_type": "audio", "duration": "12.000000"}
                ]}"#,
        )
        .unwrap();
        assert_eq!(asset.frames, Some(250));
        assert!((asset.require_duration().unwrap() - 12.0).abs() < 1e-9);

        // No nb_frames (e.g. Matroska): the stream's own duration decides
        let asset = parse(
            r#"{"format": {"duration": "12.0", "format_name": "matroska,webm"},
                "streams": [{"codec_type": "video", "width": 1280, "height": 720,
                             "avg_frame_rate": "25/1", "duration": "10.0"}]}"#,
        )
        .unwrap();
        assert_eq!(asset.frames, Some(250));

        let asset = parse(
            r#"{"format": {"duration": "12.0", "format_name": "matroska,webm"},
                "streams": [{"codec_type": "video", "width": 1280, "height": 720, "avg_frame_rate": "25/1"}]}"#,
        )
        .unwrap();
        assert!(asset.frames.is_none());
    }

    #[test]
    fn test_rotated_phone_video_reports_display_size() {
        let asset = parse(
            r#"{"format": {"duration": "5.0", "format_name": "mov,mp4,m4a,3gp,3g2,mj2"},
                "streams": [{"codec_type": "video", "width": 1920, "height": 1080, "avg_frame_rate": "30/1",
                             "side_data_list": [{"side_data_type": "Display Matrix", "rotation": -90}]}]}"#,
        )
        .unwrap();
        assert_eq!(asset.dimensions().unwrap(), (1080, 1920));

        let asset = parse(
            r#"{"format": {"duration": "5.0", "format_name": "mov,mp4,m4a,3gp,3g2,mj2"},
                "streams": [{"codec_type": "video", "width": 1920, "height": 1080,
                             "tags": {"rotate": "270", "language": "und"}}]}"#,
        )
        .unwrap();
        assert_eq!(asset.dimensions().unwrap(), (1080, 1920));

        let asset = parse(
            r#"{"format": {"duration": "5.0", "format_name": "mov,mp4,m4a,3gp,3g2,mj2"},
                "streams": [{"codec_type": "video", "width": 1920, "height": 1080,
                             "side_data_list": [{"rotation": 180}]}]}"#,
        )
        .unwrap();
        assert_eq!(asset.dimensions().unwrap(), (1920, 1080));
    }

    #[test]
    fn test_still_image() {
        let asset = parse(
            r#"{"format": {"format_name": "png_pipe"},
                "streams": [{"codec_type": "video", "width": 800, "height": 1200}]}"#,
        )
        .unwrap();
        assert_eq!(asset.kind, MediaKind::Image);
        assert!(asset.duration.is_none());
        assert!(!asset.has_audio);
    }

    #[test]
    fn test_audio_with_cover_art() {
        let asset = parse(
            r#"{"format": {"duration": "12.5", "format_name": "mp3"},
                "streams": [
                  {"codec_type": "audio"},
                  {"codec_type": "video", "width": 300, "height": 300, "disposition": {"attached_pic": 1}}
                ]}"#,
        )
        .unwrap();
        assert_eq!(asset.kind, MediaKind::Audio);
        assert!((asset.require_duration().unwrap() - 12.5).abs() < 1e-9);
        assert!(asset.dimensions().is_err());
    }

    #[test]
    fn test_no_streams_is_invalid() {
        let err = parse(r#"{"format": {}, "streams": []}"#).unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }
}
