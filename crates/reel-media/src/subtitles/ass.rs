//! Structural rewriting of ASS scripts: style table and layout header.

use crate::error::{MediaError, MediaResult};
use crate::subtitles::style::{SubtitleStyle, STYLE_FORMAT_LINE};

const SCRIPT_INFO: &str = "[Script Info]";
const STYLES: &str = "[V4+ Styles]";
const EVENTS: &str = "[Events]";
const DEFAULT_STYLE_NAME: &str = "Default";

/// A `[Header]` and the lines under it.
#[derive(Debug, Clone, PartialEq)]
struct Section {
    header: String,
    lines: Vec<String>,
}

impl Section {
    fn is(&self, name: &str) -> bool {
        self.header.eq_ignore_ascii_case(name)
    }

    fn is_styles(&self) -> bool {
        // Legacy SSA scripts use [V4 Styles]
        self.is(STYLES) || self.is("[V4 Styles]")
    }
}

/// Script split into sections; text before the first header is kept verbatim.
#[derive(Debug, Clone, PartialEq)]
struct Script {
    preamble: Vec<String>,
    sections: Vec<Section>,
}

impl Script {
    fn parse(text: &str) -> Self {
        let text = text.trim_start_matches('\u{feff}');
        let mut preamble = Vec::new();
        let mut sections: Vec<Section> = Vec::new();

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                sections.push(Section {
                    header: trimmed.to_string(),
                    lines: Vec::new(),
                });
                continue;
            }
            match sections.last_mut() {
                Some(section) => section.lines.push(line.trim_end().to_string()),
                None => preamble.push(line.trim_end().to_string()),
            }
        }

        Self { preamble, sections }
    }

    fn position(&self, pred: impl Fn(&Section) -> bool) -> Option<usize> {
        self.sections.iter().position(pred)
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for line in self.preamble.iter().filter(|l| !l.trim().is_empty()) {
            out.push_str(line);
            out.push('\n');
        }
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 || !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&section.header);
            out.push('\n');
            // Blank separators are re-added between sections
            let end = section
                .lines
                .iter()
                .rposition(|l| !l.trim().is_empty())
                .map_or(0, |p| p + 1);
            for line in &section.lines[..end] {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

/// Name of the first `Style:` line in a section, if any.
fn first_style_name(section: &Section) -> Option<String> {
    section.lines.iter().find_map(|line| {
        let rest = line.trim_start().strip_prefix("Style:")?;
        let name = rest.split(',').next()?.trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}

/// Replace the style table with the canonical format line and a single style.
///
/// The first existing style keeps its name so dialogue lines still resolve;
/// a missing style section is synthesized in front of `[Events]`.
pub fn rewrite_styles(text: &str, style: &SubtitleStyle) -> MediaResult<String> {
    let mut script = Script::parse(text);

    let events = script
        .position(|s| s.is(EVENTS))
        .ok_or_else(|| MediaError::style_synthesis("script has no [Events] section"))?;

    match script.position(Section::is_styles) {
        Some(idx) => {
            let section = &mut script.sections[idx];
            let name = first_style_name(section).unwrap_or_else(|| DEFAULT_STYLE_NAME.to_string());
            section.header = STYLES.to_string();
            section.lines = vec![STYLE_FORMAT_LINE.to_string(), style.to_style_line(&name)];
        }
        None => {
            script.sections.insert(
                events,
                Section {
                    header: STYLES.to_string(),
                    lines: vec![
                        STYLE_FORMAT_LINE.to_string(),
                        style.to_style_line(DEFAULT_STYLE_NAME),
                    ],
                },
            );
        }
    }

    Ok(script.render())
}

/// Replace `[Script Info]` with a layout sized to the video.
///
/// `WrapStyle: 0` (smart wrapping) plus a PlayRes equal to the frame size
/// makes libass wrap long lines at the style's horizontal margins.
pub fn rewrite_layout_header(text: &str, width: u32, height: u32) -> MediaResult<String> {
    if width == 0 || height == 0 {
        return Err(MediaError::style_synthesis(format!(
            "invalid layout size {width}x{height}"
        )));
    }

    let mut script = Script::parse(text);
    if script.position(|s| s.is(EVENTS)).is_none() {
        return Err(MediaError::style_synthesis("script has no [Events] section"));
    }

    let info = Section {
        header: SCRIPT_INFO.to_string(),
        lines: vec![
            "ScriptType: v4.00+".to_string(),
            "WrapStyle: 0".to_string(),
            format!("PlayResX: {width}"),
            format!("PlayResY: {height}"),
            "ScaledBorderAndShadow: yes".to_string(),
        ],
    };

    match script.position(|s| s.is(SCRIPT_INFO)) {
        Some(idx) => script.sections[idx] = info,
        None => script.sections.insert(0, info),
    }

    Ok(script.render())
}

/// Count `Style:` lines across all style sections.
pub fn style_line_count(text: &str) -> usize {
    Script::parse(text)
        .sections
        .iter()
        .filter(|s| s.is_styles())
        .flat_map(|s| s.lines.iter())
        .filter(|l| l.trim_start().starts_with("Style:"))
        .count()
}
