//! Watermark overlay stage.
//!
//! The watermark is read with the `movie` source filter so the encoder
//! keeps a single video input, scaled to an eighth of the canvas width and
//! placed in the top-left corner.

use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};

/// Pixels from the left and top edges.
pub const WATERMARK_OFFSET: u32 = 10;
/// Watermark width as a fraction of the canvas width.
pub const WATERMARK_WIDTH_DIVISOR: f64 = 8.0;

/// Configuration for the watermark overlay.
///
/// ```ignore
/// let config = WatermarkConfig::new("/assets/logo.png").with_opacity(0.8);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkConfig {
    /// Path to watermark image (PNG with transparency)
    pub image_path: PathBuf,
    /// Horizontal offset from the left edge (pixels)
    pub offset_x: u32,
    /// Vertical offset from the top edge (pixels)
    pub offset_y: u32,
    /// Opacity (0.0 to 1.0); `None` keeps the image's own alpha
    pub opacity: Option<f32>,
}

impl WatermarkConfig {
    pub fn new(image_path: impl AsRef<Path>) -> Self {
        Self {
            image_path: image_path.as_ref().to_path_buf(),
            offset_x: WATERMARK_OFFSET,
            offset_y: WATERMARK_OFFSET,
            opacity: None,
        }
    }

    /// Set watermark opacity (0.0 = invisible, 1.0 = fully opaque).
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity.clamp(0.0, 1.0));
        self
    }

    /// Check if the watermark image exists.
    pub fn is_available(&self) -> bool {
        self.image_path.is_file()
    }

    /// Reject a missing or empty watermark image.
    pub fn validate(&self) -> MediaResult<()> {
        let meta = std::fs::metadata(&self.image_path)
            .map_err(|_| MediaError::FileNotFound(self.image_path.clone()))?;
        if meta.len() == 0 {
            return Err(MediaError::EmptyInput(self.image_path.clone()));
        }
        Ok(())
    }

    /// Overlay width for a canvas.
    pub fn width_for_canvas(canvas_width: u32) -> u32 {
        ((canvas_width as f64 / WATERMARK_WIDTH_DIVISOR).round() as u32).max(2)
    }

    /// Filter chains overlaying the watermark on `input_label`, producing `output_label`.
    pub fn overlay_chain(&self, input_label: &str, output_label: &str, canvas_width: u32) -> String {
        let escaped_path = escape_filter_path(&self.image_path.to_string_lossy());
        let width = Self::width_for_canvas(canvas_width);
        let alpha = match self.opacity {
            Some(opacity) if opacity < 1.0 => {
                format!(",format=rgba,colorchannelmixer=aa={:.2}", opacity)
            }
            _ => String::new(),
        };
        format!(
            "movie='{}',scale={}:-1{}[wm];[{}][wm]overlay={}:{}:format=auto[{}]",
            escaped_path, width, alpha, input_label, self.offset_x, self.offset_y, output_label
        )
    }
}

/// Escape a path for use inside a quoted filter option.
pub fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "\\\\").replace('\'', "\\'").replace(':', "\\:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_is_an_eighth_of_canvas() {
        assert_eq!(WatermarkConfig::width_for_canvas(1920), 240);
        assert_eq!(WatermarkConfig::width_for_canvas(1080), 135);
    }

    #[test]
    fn test_overlay_chain_with_opacity() {
        let config = WatermarkConfig::new("/assets/logo.png").with_opacity(0.7);
        let chain = config.overlay_chain("base", "vout", 1920);
        assert_eq!(
            chain,
            "movie='/assets/logo.png',scale=240:-1,format=rgba,colorchannelmixer=aa=0.70[wm];[base][wm]overlay=10:10:format=auto[vout]"
        );
    }

    #[test]
    fn test_overlay_chain_full_opacity() {
        let chain = WatermarkConfig::new("/a/b.png").with_opacity(1.0).overlay_chain("x", "y", 1080);
        assert!(!chain.contains("colorchannelmixer"));
        assert!(chain.contains("scale=135:-1"));
    }

    #[test]
    fn test_opacity_clamping() {
        let config = WatermarkConfig::new("a.png").with_opacity(1.5);
        assert_eq!(config.opacity, Some(1.0));
        let config = WatermarkConfig::new("a.png").with_opacity(-0.5);
        assert_eq!(config.opacity, Some(0.0));
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(escape_filter_path("C:\\a'b"), "C\\:\\\\a\\'b");
    }

    #[test]
    fn test_validate_missing() {
        let config = WatermarkConfig::new("/nonexistent/path.png");
        assert!(!config.is_available());
        assert!(matches!(config.validate(), Err(MediaError::FileNotFound(_))));
    }
}
