//! Typed FFmpeg filter graph.
//!
//! Stages are kept as values and only serialized into a `-filter_complex`
//! string when the command line is built.

use reel_models::CropRect;
use std::fmt;
use std::path::PathBuf;

use crate::watermark::{escape_filter_path, WatermarkConfig};

/// Label of the graph's final video pad.
pub const OUTPUT_LABEL: &str = "vout";

/// One single-input, single-output video filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// `crop=w:h:x:y`
    Crop(CropRect),
    /// Fit inside `width`×`height` keeping the aspect ratio
    ScaleFit { width: u32, height: u32 },
    /// Letterbox to exactly `width`×`height`, centered
    PadCenter { width: u32, height: u32 },
    /// Square pixels
    SetSar,
    /// Burn in an ASS script
    Subtitles {
        script: PathBuf,
        fonts_dir: Option<PathBuf>,
    },
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNode::Crop(rect) => write!(
                f,
                "crop={}:{}:{}:{}",
                rect.width, rect.height, rect.x, rect.y
            ),
            FilterNode::ScaleFit { width, height } => write!(
                f,
                "scale={}:{}:force_original_aspect_ratio=decrease",
                width, height
            ),
            FilterNode::PadCenter { width, height } => {
                write!(f, "pad={}:{}:(ow-iw)/2:(oh-ih)/2", width, height)
            }
            FilterNode::SetSar => write!(f, "setsar=1"),
            FilterNode::Subtitles { script, fonts_dir } => {
                write!(f, "ass='{}'", escape_filter_path(&script.to_string_lossy()))?;
                if let Some(dir) = fonts_dir {
                    write!(f, ":fontsdir='{}'", escape_filter_path(&dir.to_string_lossy()))?;
                }
                Ok(())
            }
        }
    }
}

/// Watermark stage appended after the linear chain.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkStage {
    pub config: WatermarkConfig,
    pub canvas_width: u32,
}

/// Linear chain from one input pad to `[vout]`, optionally ending in an overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    input_label: String,
    nodes: Vec<FilterNode>,
    watermark: Option<WatermarkStage>,
}

impl FilterGraph {
    /// Empty graph reading from `input_label` (e.g. `"0:v"`).
    pub fn new(input_label: impl Into<String>) -> Self {
        Self {
            input_label: input_label.into(),
            nodes: Vec::new(),
            watermark: None,
        }
    }

    /// Append a stage.
    pub fn push(mut self, node: FilterNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Append a stage when present.
    pub fn push_opt(self, node: Option<FilterNode>) -> Self {
        match node {
            Some(node) => self.push(node),
            None => self,
        }
    }

    /// Finish with a watermark overlay.
    pub fn watermark(mut self, stage: Option<WatermarkStage>) -> Self {
        self.watermark = stage;
        self
    }

    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    pub fn has_watermark(&self) -> bool {
        self.watermark.is_some()
    }

    /// Pad label to `-map`.
    pub fn output_pad(&self) -> String {
        format!("[{OUTPUT_LABEL}]")
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain = if self.nodes.is_empty() {
            "null".to_string()
        } else {
            self.nodes
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };

        match &self.watermark {
            None => write!(f, "[{}]{}[{}]", self.input_label, chain, OUTPUT_LABEL),
            Some(stage) => write!(
                f,
                "[{}]{}[base];{}",
                self.input_label,
                chain,
                stage
                    .config
                    .overlay_chain("base", OUTPUT_LABEL, stage.canvas_width)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_chain() {
        let graph = FilterGraph::new("0:v")
            .push(FilterNode::Crop(CropRect::new(320, 0, 1920, 1080)))
            .push(FilterNode::ScaleFit {
                width: 1920,
                height: 1080,
            })
            .push(FilterNode::PadCenter {
                width: 1920,
                height: 1080,
            })
            .push(FilterNode::SetSar);
        assert_eq!(
            graph.to_string(),
            "[0:v]crop=1920:1080:320:0,scale=1920:1080:force_original_aspect_ratio=decrease,pad=1920:1080:(ow-iw)/2:(oh-ih)/2,setsar=1[vout]"
        );
        assert_eq!(graph.output_pad(), "[vout]");
    }

    #[test]
    fn test_subtitles_node_escapes_paths() {
        let node = FilterNode::Subtitles {
            script: PathBuf::from("/work/job:1/subtitles.ass"),
            fonts_dir: Some(PathBuf::from("/usr/share/fonts/truetype/wqy")),
        };
        assert_eq!(
            node.to_string(),
            "ass='/work/job\\:1/subtitles.ass':fontsdir='/usr/share/fonts/truetype/wqy'"
        );
    }

    #[test]
    fn test_watermark_closes_graph() {
        let graph = FilterGraph::new("0:v")
            .push(FilterNode::SetSar)
            .watermark(Some(WatermarkStage {
                config: WatermarkConfig::new("/assets/wm.png"),
                canvas_width: 1080,
            }));
        let text = graph.to_string();
        assert!(text.starts_with("[0:v]setsar=1[base];movie='/assets/wm.png',scale=135:-1[wm]"));
        assert!(text.ends_with("[base][wm]overlay=10:10:format=auto[vout]"));
    }

    #[test]
    fn test_empty_graph_passes_through() {
        assert_eq!(FilterGraph::new("0:v").to_string(), "[0:v]null[vout]");
    }
}
