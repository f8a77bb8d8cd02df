//! SubRip parsing and conversion to a styled (ASS) script.

use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

use crate::error::{MediaError, MediaResult};

/// Header FFmpeg writes when converting SubRip to ASS. PlayRes 384×288 keeps
/// font sizes on the same scale the style bands are tuned for.
const ASS_HEADER: &str = "[Script Info]
; Script generated by FFmpeg/Lavc
ScriptType: v4.00+
PlayResX: 384
PlayResY: 288
ScaledBorderAndShadow: yes
YCbCr Matrix: None

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial,16,&Hffffff,&Hffffff,&H0,&H0,0,0,0,0,100,100,0,0,1,1,0,2,10,10,10,0

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
";

/// One timed caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub start_ms: u64,
    pub end_ms: u64,
    pub lines: Vec<String>,
}

fn timing_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})\s*-->\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})")
            .expect("valid timing pattern")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<\s*(/?)\s*([a-z]+)[^>]*>").expect("valid tag pattern")
    })
}

fn to_ms(h: &str, m: &str, s: &str, frac: &str) -> u64 {
    let h: u64 = h.parse().unwrap_or(0);
    let m: u64 = m.parse().unwrap_or(0);
    let s: u64 = s.parse().unwrap_or(0);
    // "5" after the separator means 500 ms
    let ms: u64 = format!("{frac:0<3}").parse().unwrap_or(0);
    ((h * 60 + m) * 60 + s) * 1000 + ms
}

/// Group lines into cue blocks; any blank or whitespace-only line separates.
fn blocks(text: &str) -> Vec<Vec<&str>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Parse SubRip text, rejecting input without a single cue.
pub fn parse_srt(input: &str) -> MediaResult<Vec<Cue>> {
    let cues = parse_cues(input);
    if cues.is_empty() {
        return Err(MediaError::invalid_input("subtitle file contains no cues"));
    }
    Ok(cues)
}

/// Every timed cue in `input`. Tolerates a BOM, CRLF line endings, missing
/// cue numbers and `.` as the millisecond separator.
pub fn parse_cues(input: &str) -> Vec<Cue> {
    let text = input.trim_start_matches('\u{feff}').replace("\r\n", "\n").replace('\r', "\n");
    let timing = timing_regex();

    let mut cues = Vec::new();
    for lines in blocks(&text) {
        let block = lines.join("\n");
        let Some(pos) = lines.iter().position(|l| l.contains("-->")) else {
            if !block.trim().is_empty() {
                warn!(block = %block.trim(), "Skipping subtitle block without timing");
            }
            continue;
        };
        let Some(caps) = timing.captures(lines[pos]) else {
            warn!(line = %lines[pos], "Skipping malformed subtitle timing");
            continue;
        };

        let start_ms = to_ms(&caps[1], &caps[2], &caps[3], &caps[4]);
        let end_ms = to_ms(&caps[5], &caps[6], &caps[7], &caps[8]);
        let body: Vec<String> = lines[pos + 1..]
            .iter()
            .map(|l| l.trim_end().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        cues.push(Cue {
            start_ms,
            end_ms: end_ms.max(start_ms),
            lines: body,
        });
    }
    cues
}

/// `H:MM:SS.cc` as used in ASS dialogue lines.
pub fn format_ass_time(ms: u64) -> String {
    let cs = (ms + 5) / 10;
    let h = cs / 360_000;
    let m = (cs / 6_000) % 60;
    let s = (cs / 100) % 60;
    format!("{}:{:02}:{:02}.{:02}", h, m, s, cs % 100)
}

/// Convert SubRip inline markup to ASS override tags.
///
/// `<i>`, `<b>`, `<u>` and `<s>` map to `{\i1}`…`{\i0}` and friends;
/// `<font>` and unknown tags are dropped.
pub fn convert_markup(line: &str) -> String {
    tag_regex()
        .replace_all(line, |caps: &regex::Captures<'_>| {
            let closing = !caps[1].is_empty();
            let tag = caps[2].to_ascii_lowercase();
            match tag.as_str() {
                "i" | "b" | "u" | "s" => format!("{{\\{}{}}}", tag, if closing { 0 } else { 1 }),
                _ => String::new(),
            }
        })
        .into_owned()
}

/// Render cues as a complete ASS script.
pub fn cues_to_ass(cues: &[Cue]) -> String {
    let mut out = String::from(ASS_HEADER);
    for cue in cues {
        let text = cue
            .lines
            .iter()
            .map(|l| convert_markup(l))
            .collect::<Vec<_>>()
            .join("\\N");
        out.push_str(&format!(
            "Dialogue: 0,{},{},Default,,0,0,0,,{}\n",
            format_ass_time(cue.start_ms),
            format_ass_time(cue.end_ms),
            text
        ));
    }
    out
}

/// Parse SubRip text and render it as ASS.
pub fn srt_to_ass(input: &str) -> MediaResult<String> {
    Ok(cues_to_ass(&parse_srt(input)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,500\r\nHello <i>world</i>\r\nsecond line\r\n\r\n2\r\n00:00:03.2 --> 00:00:04,000\r\n<font color=\"#ff0000\">red</font>\r\n";

    #[test]
    fn test_parse_handles_bom_crlf_and_dot_separator() {
        let cues = parse_srt(SAMPLE).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].start_ms, 1000);
        assert_eq!(cues[0].end_ms, 2500);
        assert_eq!(cues[0].lines, vec!["Hello <i>world</i>", "second line"]);
        assert_eq!(cues[1].start_ms, 3200);
    }

    #[test]
    fn test_missing_index_is_tolerated() {
        let cues = parse_srt("00:00:00,000 --> 00:00:01,000\nno number\n").unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].lines, vec!["no number"]);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(parse_srt("").is_err());
        assert!(parse_srt("just text\nwithout timing").is_err());
    }

    #[test]
    fn test_whitespace_only_line_separates_cues() {
        let input = "1\n00:00:01,000 --> 00:00:02,000\nA\n \n2\n00:00:03,000 --> 00:00:04,000\nB\n";
        let cues = parse_srt(input).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].lines, vec!["A"]);
        assert_eq!(cues[1].start_ms, 3000);
        assert_eq!(cues[1].lines, vec!["B"]);

        let tabbed = input.replace("\n \n", "\r\n\t \r\n");
        assert_eq!(parse_cues(&tabbed).len(), 2);
    }

    #[test]
    fn test_ass_time_format() {
        assert_eq!(format_ass_time(0), "0:00:00.00");
        assert_eq!(format_ass_time(2500), "0:00:02.50");
        assert_eq!(format_ass_time(3_723_456), "1:02:03.46");
    }

    #[test]
    fn test_markup_conversion() {
        assert_eq!(convert_markup("<i>a</i> <B>b</B>"), "{\\i1}a{\\i0} {\\b1}b{\\b0}");
        assert_eq!(convert_markup("<font color=\"red\">x</font>"), "x");
    }

    #[test]
    fn test_full_conversion() {
        let ass = srt_to_ass(SAMPLE).unwrap();
        assert!(ass.starts_with("[Script Info]"));
        assert!(ass.contains("PlayResX: 384"));
        assert!(ass.contains(
            "Dialogue: 0,0:00:01.00,0:00:02.50,Default,,0,0,0,,Hello {\\i1}world{\\i0}\\Nsecond line"
        ));
        assert!(ass.contains("Dialogue: 0,0:00:03.20,0:00:04.00,Default,,0,0,0,,red"));
    }
}
