//! The line type stored in `ringlog`'s [`ringlog_core::ring::Ring`], plus the
//! parsers that produce it.
//!
//! `ringlog-core` leaves ANSI interpretation as an external collaborator;
//! this module supplies it via SGR-run splitting, without pulling a
//! terminal-aware dependency into the core crate. `RenderedLine` carries
//! styled runs (byte ranges into its de-escaped text) alongside the plain
//! text the [`ringlog_core::filter::Filter`] matches against.

use ringlog_core::line::{Line, Mark, SourceId};

/// A minimal style description independent of any particular rendering
/// crate; `ringlog::ui` converts these into `ratatui::style::Style`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStyle {
    pub fg: Option<(u8, u8, u8)>,
    pub bg: Option<(u8, u8, u8)>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub reverse: bool,
}

/// One styled run: `[start, end)` byte range into the line's plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
    style: TextStyle,
}

/// A line of de-escaped text carrying optional ANSI-derived style spans and
/// filter-attached highlight marks.
#[derive(Debug, Clone)]
pub struct RenderedLine {
    source: SourceId,
    text: String,
    spans: Vec<Span>,
    marks: Vec<Mark>,
}

impl RenderedLine {
    fn plain(source: SourceId, text: String) -> Self {
        Self {
            source,
            text,
            spans: Vec::new(),
            marks: Vec::new(),
        }
    }

    /// Styled, width/offset-sliced runs ready for the renderer: plain style
    /// spans from ANSI parsing with filter `Mark`s overlaid as reverse
    /// video. Offsets/width are in chars, matching `Line::render`'s
    /// contract; mark/span boundaries are bytes, so chars are mapped to
    /// bytes before slicing.
    #[must_use]
    pub fn styled_runs(&self, width: usize, offset: usize) -> Vec<(String, TextStyle)> {
        let mut boundaries: Vec<usize> = self.text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(self.text.len());
        if offset >= boundaries.len().saturating_sub(1) {
            return Vec::new();
        }
        let end_char = (offset + width).min(boundaries.len() - 1);
        let start_byte = boundaries[offset];
        let end_byte = boundaries[end_char];
        if start_byte >= end_byte {
            return Vec::new();
        }

        let spans: Vec<Span> = if self.spans.is_empty() {
            vec![Span {
                start: 0,
                end: self.text.len(),
                style: TextStyle::default(),
            }]
        } else {
            self.spans.clone()
        };

        let mut out = Vec::new();
        for span in &spans {
            let lo = span.start.max(start_byte);
            let hi = span.end.min(end_byte);
            if lo >= hi {
                continue;
            }
            let marked = self
                .marks
                .iter()
                .any(|m| (m.offset as usize) < hi && (m.offset as usize + m.length as usize) > lo);
            let mut style = span.style;
            style.reverse |= marked;
            out.push((self.text[lo..hi].to_string(), style));
        }
        out
    }
}

impl Line for RenderedLine {
    fn source_id(&self) -> SourceId {
        self.source
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn display_len(&self) -> usize {
        self.text.chars().count()
    }

    fn marks(&self) -> &[Mark] {
        &self.marks
    }

    fn set_marks(&mut self, marks: Vec<Mark>) {
        self.marks = marks;
    }
}

/// Stores the raw line verbatim, with no ANSI or JSON interpretation.
/// Used when `--no-ansi` is set.
#[must_use]
pub fn parse_plain(source: SourceId, raw: &str) -> RenderedLine {
    RenderedLine::plain(source, raw.to_string())
}

/// Pretty-compacts `raw` if it parses as JSON, else falls back to the raw
/// text. Never errors, preserving the Parser total-ness contract.
#[must_use]
pub fn parse_json(source: SourceId, raw: &str) -> RenderedLine {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => RenderedLine::plain(source, value.to_string()),
        Err(_) => RenderedLine::plain(source, raw.to_string()),
    }
}

/// Drives a `vte::Parser` over one line's bytes, splitting it into the
/// de-escaped text plus the `TextStyle` spans the SGR sequences describe.
/// `vte` owns the escape-sequence state machine (CSI parameter collection,
/// UTF-8 reassembly, unterminated-sequence handling); this performer only
/// reacts to the `m`-terminated (SGR) dispatches and otherwise accumulates
/// printable/control bytes as plain text.
struct SgrSplitter {
    text: String,
    spans: Vec<Span>,
    style: TextStyle,
    run_start: usize,
}

impl SgrSplitter {
    fn new(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            spans: Vec::new(),
            style: TextStyle::default(),
            run_start: 0,
        }
    }

    fn close_run(&mut self) {
        if self.run_start < self.text.len() {
            self.spans.push(Span {
                start: self.run_start,
                end: self.text.len(),
                style: self.style,
            });
        }
        self.run_start = self.text.len();
    }

    fn finish(mut self) -> (String, Vec<Span>) {
        self.close_run();
        (self.text, self.spans)
    }
}

impl vte::Perform for SgrSplitter {
    fn print(&mut self, c: char) {
        self.text.push(c);
    }

    fn execute(&mut self, byte: u8) {
        // C0 control bytes (tab and friends) carry no escape meaning here;
        // a single static line has nowhere to act on them, so they pass
        // through as literal text rather than being dropped.
        self.text.push(byte as char);
    }

    fn csi_dispatch(&mut self, params: &vte::Params, _intermediates: &[u8], _ignore: bool, action: char) {
        if action != 'm' {
            // Non-SGR CSI sequence (cursor movement etc.): no effect on a
            // single static line's rendering.
            return;
        }
        self.close_run();
        apply_sgr(&mut self.style, params);
    }
}

/// Interprets ANSI SGR escape sequences in `raw`, producing styled runs
/// over the de-escaped text. Ported from `ParseANSILine` in
/// `parser_ansi.go`: unparseable or absent escapes simply leave the text
/// unstyled, never an error.
#[must_use]
pub fn parse_ansi(source: SourceId, raw: &str) -> RenderedLine {
    let mut performer = SgrSplitter::new(raw.len());
    let mut parser = vte::Parser::new();
    for &byte in raw.as_bytes() {
        parser.advance(&mut performer, byte);
    }
    let (text, spans) = performer.finish();

    RenderedLine {
        source,
        text,
        spans,
        marks: Vec::new(),
    }
}

fn apply_sgr(style: &mut TextStyle, params: &vte::Params) {
    let mut codes: Vec<u16> = params.iter().map(|sub| sub.first().copied().unwrap_or(0)).collect();
    if codes.is_empty() {
        codes.push(0);
    }

    let mut idx = 0;
    while idx < codes.len() {
        match codes[idx] {
            0 => *style = TextStyle::default(),
            1 => style.bold = true,
            3 => style.italic = true,
            4 => style.underline = true,
            7 => style.reverse = true,
            22 => style.bold = false,
            23 => style.italic = false,
            24 => style.underline = false,
            27 => style.reverse = false,
            30..=37 => style.fg = Some(ansi_16_color((codes[idx] - 30) as u8)),
            38 => {
                if codes.get(idx + 1) == Some(&2) && codes.len() > idx + 4 {
                    style.fg = Some((
                        codes[idx + 2] as u8,
                        codes[idx + 3] as u8,
                        codes[idx + 4] as u8,
                    ));
                    idx += 4;
                } else if codes.get(idx + 1) == Some(&5) && codes.len() > idx + 2 {
                    style.fg = Some(ansi_256_color(codes[idx + 2] as u8));
                    idx += 2;
                }
            }
            39 => style.fg = None,
            40..=47 => style.bg = Some(ansi_16_color((codes[idx] - 40) as u8)),
            48 => {
                if codes.get(idx + 1) == Some(&2) && codes.len() > idx + 4 {
                    style.bg = Some((
                        codes[idx + 2] as u8,
                        codes[idx + 3] as u8,
                        codes[idx + 4] as u8,
                    ));
                    idx += 4;
                } else if codes.get(idx + 1) == Some(&5) && codes.len() > idx + 2 {
                    style.bg = Some(ansi_256_color(codes[idx + 2] as u8));
                    idx += 2;
                }
            }
            49 => style.bg = None,
            90..=97 => style.fg = Some(ansi_16_color((codes[idx] - 90) as u8)),
            100..=107 => style.bg = Some(ansi_16_color((codes[idx] - 100) as u8)),
            _ => {}
        }
        idx += 1;
    }
}

fn ansi_16_color(index: u8) -> (u8, u8, u8) {
    const TABLE: [(u8, u8, u8); 8] = [
        (0, 0, 0),
        (205, 0, 0),
        (0, 205, 0),
        (205, 205, 0),
        (0, 0, 238),
        (205, 0, 205),
        (0, 205, 205),
        (229, 229, 229),
    ];
    TABLE[(index % 8) as usize]
}

fn ansi_256_color(index: u8) -> (u8, u8, u8) {
    if index < 16 {
        return ansi_16_color(index % 8);
    }
    if index < 232 {
        let i = index - 16;
        let levels = [0u8, 95, 135, 175, 215, 255];
        let r = levels[(i / 36) as usize];
        let g = levels[((i / 6) % 6) as usize];
        let b = levels[(i % 6) as usize];
        return (r, g, b);
    }
    let v = 8 + (index - 232) * 10;
    (v, v, v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_parser_preserves_text_and_has_no_spans() {
        let line = parse_plain(SourceId(0), "\x1b[31mhello\x1b[0m");
        assert_eq!(line.text(), "\x1b[31mhello\x1b[0m");
        assert!(line.spans.is_empty());
    }

    #[test]
    fn ansi_parser_strips_escapes_and_records_style() {
        let line = parse_ansi(SourceId(0), "\x1b[31mred\x1b[0m plain");
        assert_eq!(line.text(), "red plain");
        let runs = line.styled_runs(20, 0);
        assert_eq!(runs[0].0, "red");
        assert_eq!(runs[0].1.fg, Some(ansi_16_color(1)));
        assert_eq!(runs[1].0, " plain");
        assert_eq!(runs[1].1.fg, None);
    }

    #[test]
    fn ansi_parser_handles_bold_and_reset() {
        let line = parse_ansi(SourceId(0), "\x1b[1mbold\x1b[22mnormal");
        let runs = line.styled_runs(20, 0);
        assert!(runs[0].1.bold);
        assert!(!runs[1].1.bold);
    }

    #[test]
    fn ansi_parser_tolerates_unterminated_escape() {
        let line = parse_ansi(SourceId(0), "abc\x1b[31");
        assert!(line.text().starts_with("abc"));
    }

    #[test]
    fn marks_render_as_reverse_video() {
        let mut line = parse_plain(SourceId(0), "needle in haystack".to_string());
        line.set_marks(vec![Mark {
            group: 0,
            offset: 0,
            length: 6,
        }]);
        let runs = line.styled_runs(20, 0);
        assert!(runs[0].1.reverse);
    }

    #[test]
    fn json_parser_compacts_valid_json() {
        let line = parse_json(SourceId(0), "{\"a\": 1,  \"b\": 2}");
        assert_eq!(line.text(), "{\"a\":1,\"b\":2}");
    }

    #[test]
    fn json_parser_falls_back_on_non_json() {
        let line = parse_json(SourceId(0), "not json at all");
        assert_eq!(line.text(), "not json at all");
    }

    #[test]
    fn styled_runs_respects_width_and_offset() {
        let line = parse_plain(SourceId(0), "0123456789".to_string());
        let runs = line.styled_runs(4, 2);
        assert_eq!(runs[0].0, "2345");
    }
}
