//! Raw RGB frame sources and sinks backed by FFmpeg pipes.
//!
//! These run on a blocking thread, so they use `std::process` directly.
//! Every child is wrapped in a [`ChildGuard`] that kills and reaps it when
//! dropped, whatever path the caller leaves by.

use image::RgbImage;
use std::io::{ErrorKind as IoErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Bytes per pixel for `rgb24`.
const RGB_CHANNELS: usize = 3;

/// Kills and reaps a child process on drop unless it was already waited on.
pub struct ChildGuard {
    child: Option<Child>,
    name: &'static str,
}

impl ChildGuard {
    pub fn new(child: Child, name: &'static str) -> Self {
        Self {
            child: Some(child),
            name,
        }
    }

    /// Wait for normal exit and disarm the guard.
    pub fn wait(mut self) -> MediaResult<ExitStatus> {
        let mut child = self
            .child
            .take()
            .ok_or_else(|| MediaError::internal(format!("{} already reaped", self.name)))?;
        Ok(child.wait()?)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Ok(None) = child.try_wait() {
                debug!(process = self.name, "Killing unfinished child process");
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

/// Drains a child's stderr on a thread so the pipe never fills up.
struct StderrCollector(Option<JoinHandle<String>>);

impl StderrCollector {
    fn spawn(child: &mut Child) -> Self {
        let handle = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text);
                text
            })
        });
        Self(handle)
    }

    fn collect(mut self) -> String {
        self.0
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default()
    }
}

/// A stream of RGB frames.
pub trait FrameSource: Send {
    /// Frame size in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> MediaResult<Option<RgbImage>>;

    /// Release the source, reporting a failed decode.
    fn finish(self: Box<Self>) -> MediaResult<()>;
}

/// A still image repeated a fixed number of times.
pub struct StillImageSource {
    frame: RgbImage,
    remaining: u64,
}

impl StillImageSource {
    /// Decode `path` and repeat it `frame_count` times.
    pub fn open(path: &Path, frame_count: u64) -> MediaResult<Self> {
        let frame = image::open(path)
            .map_err(|e| {
                MediaError::decode_failed(format!("cannot decode image {}: {e}", path.display()))
            })?
            .to_rgb8();
        Ok(Self::from_image(frame, frame_count))
    }

    pub fn from_image(frame: RgbImage, frame_count: u64) -> Self {
        Self {
            frame,
            remaining: frame_count,
        }
    }
}

impl FrameSource for StillImageSource {
    fn dimensions(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn next_frame(&mut self) -> MediaResult<Option<RgbImage>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(self.frame.clone()))
    }

    fn finish(self: Box<Self>) -> MediaResult<()> {
        Ok(())
    }
}

/// Decodes a video file to raw RGB frames through `ffmpeg`.
pub struct VideoDecoder {
    // Field order matters: the pipe closes before the guard reaps the child
    stdout: ChildStdout,
    stderr: StderrCollector,
    guard: ChildGuard,
    path: PathBuf,
    width: u32,
    height: u32,
}

impl VideoDecoder {
    pub fn spawn(path: &Path, width: u32, height: u32) -> MediaResult<Self> {
        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-v", "error", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("decoder stdout not captured"))?;
        let stderr = StderrCollector::spawn(&mut child);

        Ok(Self {
            stdout,
            stderr,
            guard: ChildGuard::new(child, "decoder"),
            path: path.to_path_buf(),
            width,
            height,
        })
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * RGB_CHANNELS
    }
}

impl FrameSource for VideoDecoder {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> MediaResult<Option<RgbImage>> {
        let mut buf = vec![0u8; self.frame_len()];
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < buf.len() {
            warn!(
                path = %self.path.display(),
                bytes = filled,
                "Dropping truncated trailing frame"
            );
            return Ok(None);
        }

        RgbImage::from_raw(self.width, self.height, buf)
            .map(Some)
            .ok_or_else(|| MediaError::decode_failed("frame buffer size mismatch"))
    }

    fn finish(self: Box<Self>) -> MediaResult<()> {
        let VideoDecoder {
            stdout,
            stderr,
            guard,
            path,
            ..
        } = *self;
        drop(stdout);
        let status = guard.wait()?;
        let diagnostics = stderr.collect();
        if status.success() {
            Ok(())
        } else {
            Err(MediaError::decode_failed(format!(
                "decoding {} failed ({status}): {}",
                path.display(),
                diagnostics.trim()
            )))
        }
    }
}

/// Audio carried from the source into the intermediate.
#[derive(Debug, Clone)]
pub struct AudioPassthrough {
    pub source: PathBuf,
}

/// Encodes raw RGB frames into a lossless FFV1/MKV intermediate.
pub struct FrameSink {
    stdin: Option<ChildStdin>,
    stderr: StderrCollector,
    guard: ChildGuard,
    output: PathBuf,
    frame_len: usize,
    written: u64,
}

impl FrameSink {
    pub fn spawn(
        output: &Path,
        width: u32,
        height: u32,
        fps: f64,
        audio: Option<&AudioPassthrough>,
    ) -> MediaResult<Self> {
        let args = sink_args(output, width, height, fps, audio);
        debug!("Running FFmpeg sink: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::internal("sink stdin not captured"))?;
        let stderr = StderrCollector::spawn(&mut child);

        Ok(Self {
            stdin: Some(stdin),
            stderr,
            guard: ChildGuard::new(child, "sink"),
            output: output.to_path_buf(),
            frame_len: width as usize * height as usize * RGB_CHANNELS,
            written: 0,
        })
    }

    pub fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()> {
        if frame.as_raw().len() != self.frame_len {
            return Err(MediaError::internal(format!(
                "frame of {} bytes does not match sink size {}",
                frame.as_raw().len(),
                self.frame_len
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::internal("sink already closed"))?;
        stdin.write_all(frame.as_raw())?;
        self.written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.written
    }

    /// Close stdin and wait for the encoder to finalize the file.
    pub fn finish(mut self) -> MediaResult<PathBuf> {
        drop(self.stdin.take());
        let FrameSink {
            stderr,
            guard,
            output,
            ..
        } = self;
        let status = guard.wait()?;
        let diagnostics = stderr.collect();
        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                "frame sink exited with non-zero status",
                Some(diagnostics),
                status.code(),
            ));
        }
        Ok(output)
    }
}

fn sink_args(
    output: &Path,
    width: u32,
    height: u32,
    fps: f64,
    audio: Option<&AudioPassthrough>,
) -> Vec<String> {
    let mut args: Vec<String> = [
        "-y",
        "-hide_banner",
        "-v",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-s",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(format!("{width}x{height}"));
    args.push("-framerate".to_string());
    args.push(format_fps(fps));
    args.push("-i".to_string());
    args.push("pipe:0".to_string());

    if let Some(audio) = audio {
        args.push("-i".to_string());
        args.push(audio.source.to_string_lossy().to_string());
        args.extend(["-map", "0:v", "-map", "1:a?", "-c:a", "copy"].map(String::from));
    }

    args.extend(["-c:v", "ffv1", "-level", "3", "-pix_fmt", "yuv444p"].map(String::from));
    args.push(output.to_string_lossy().to_string());
    args
}

fn format_fps(fps: f64) -> String {
    if (fps - fps.round()).abs() < 1e-6 {
        format!("{}", fps.round() as u64)
    } else {
        format!("{fps:.3}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_still_source_repeats() {
        let frame = RgbImage::from_pixel(4, 2, Rgb([1, 2, 3]));
        let mut source = StillImageSource::from_image(frame.clone(), 3);
        assert_eq!(source.dimensions(), (4, 2));
        let mut count = 0;
        while let Some(f) = source.next_frame().unwrap() {
            assert_eq!(f, frame);
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn test_still_source_rejects_undecodable_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        let err = StillImageSource::open(&path, 10).err().unwrap();
        assert!(matches!(err, MediaError::DecodeFailed(_)));
    }

    #[test]
    fn test_sink_args_with_audio_copy() {
        let audio = AudioPassthrough {
            source: PathBuf::from("/in/clip.mp4"),
        };
        let args = sink_args(Path::new("/w/motion.mkv"), 1920, 1080, 29.97, Some(&audio));
        assert!(args.windows(2).any(|w| w[0] == "-s" && w[1] == "1920x1080"));
        assert!(args.windows(2).any(|w| w[0] == "-framerate" && w[1] == "29.970"));
        assert!(args.windows(2).any(|w| w[0] == "-c:a" && w[1] == "copy"));
        assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "ffv1"));
        assert_eq!(args.last().unwrap(), "/w/motion.mkv");
    }

    #[test]
    fn test_sink_args_without_audio() {
        let args = sink_args(Path::new("m.mkv"), 640, 360, 30.0, None);
        assert!(args.windows(2).any(|w| w[0] == "-framerate" && w[1] == "30"));
        assert!(!args.iter().any(|a| a == "-c:a"));
    }
}
