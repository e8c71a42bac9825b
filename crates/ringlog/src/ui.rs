//! Render a `BufferWindow<RenderedLine>` snapshot as a `ratatui` frame: a
//! filter-input row on top, the scrollback view in the middle (newest at
//! the bottom, `~` padding for an under-full view), a status row on the
//! bottom naming the window position and follow/lock state.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line as UiLine, Span as UiSpan};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use ringlog_core::line::Line as _;

use crate::line::{RenderedLine, TextStyle};
use crate::palette;

/// Everything the status row needs, read out of `BufferWindow` once per
/// frame rather than threaded through as separate arguments.
pub struct Status {
    pub following: bool,
    pub locked: bool,
    pub total_lines: u64,
    pub window_capacity: usize,
    pub window_len: usize,
}

/// Color-tagging options from `--no-color`/`--bg-source-color`/
/// `--fg-source-color`, read once per frame from `Config`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorConfig {
    pub no_color: bool,
    pub fg_source: bool,
    pub bg_source: bool,
}

pub fn draw(
    frame: &mut Frame<'_>,
    lines: &[RenderedLine],
    offset: usize,
    filter_input: &str,
    status: Status,
    color: ColorConfig,
) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    draw_filter_row(frame, chunks[0], filter_input);
    draw_view(frame, chunks[1], lines, offset, color);
    draw_status_row(frame, chunks[2], &status);
}

fn draw_filter_row(frame: &mut Frame<'_>, area: Rect, filter_input: &str) {
    let text = if filter_input.is_empty() {
        "(no filter)".to_string()
    } else {
        format!("/{filter_input}")
    };
    let style = if filter_input.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    };
    frame.render_widget(Paragraph::new(text).style(style), area);
}

fn draw_view(frame: &mut Frame<'_>, area: Rect, lines: &[RenderedLine], offset: usize, color: ColorConfig) {
    let height = area.height as usize;
    let width = area.width as usize;

    let mut rows: Vec<UiLine> = Vec::with_capacity(height);
    let pad = height.saturating_sub(lines.len());
    for _ in 0..pad {
        rows.push(UiLine::from(UiSpan::styled("~", Style::default().fg(Color::DarkGray))));
    }
    let visible_start = lines.len().saturating_sub(height);
    for line in &lines[visible_start..] {
        let runs = line.styled_runs(width, offset);
        let source_tag = (!color.no_color && (color.fg_source || color.bg_source))
            .then(|| palette::color_for(line.source_id(), 0.0));
        let spans: Vec<UiSpan> = if runs.is_empty() {
            vec![UiSpan::raw("")]
        } else {
            runs.into_iter()
                .map(|(text, style)| {
                    let base = to_ratatui_style(style, color.no_color);
                    UiSpan::styled(text, apply_source_tag(base, source_tag, color))
                })
                .collect()
        };
        rows.push(UiLine::from(spans));
    }

    frame.render_widget(Paragraph::new(rows), area);
}

/// Overlay a source's tag color onto `style`, filling only the channel
/// (`fg`/`bg`) the CLI flags requested and that the line's own ANSI styling
/// left unset — an already-styled line keeps its author's color, a plain
/// one picks up the source tag.
fn apply_source_tag(mut style: Style, tag: Option<(u8, u8, u8)>, color: ColorConfig) -> Style {
    let Some((r, g, b)) = tag else { return style };
    if color.fg_source && style.fg.is_none() {
        style = style.fg(Color::Rgb(r, g, b));
    }
    if color.bg_source && style.bg.is_none() {
        style = style.bg(Color::Rgb(r, g, b));
    }
    style
}

fn draw_status_row(frame: &mut Frame<'_>, area: Rect, status: &Status) {
    let mode = if status.locked {
        "PAUSED"
    } else if status.following {
        "FOLLOWING"
    } else {
        "PAUSED"
    };
    let text = format!(
        " {mode}  window {}/{}  lines seen {}",
        status.window_len, status.window_capacity, status.total_lines
    );
    let style = Style::default().bg(Color::Blue).fg(Color::White);
    frame.render_widget(Paragraph::new(text).style(style), area);
}

/// Convert a de-escaped `TextStyle` to a `ratatui::style::Style`. `no_color`
/// drops the fg/bg channels (per `--no-color`'s "ANSI parsed but rendered
/// in the default style") while keeping bold/italic/underline/reverse,
/// which aren't color.
fn to_ratatui_style(style: TextStyle, no_color: bool) -> Style {
    let mut s = Style::default();
    if !no_color {
        if let Some((r, g, b)) = style.fg {
            s = s.fg(Color::Rgb(r, g, b));
        }
        if let Some((r, g, b)) = style.bg {
            s = s.bg(Color::Rgb(r, g, b));
        }
    }
    if style.bold {
        s = s.add_modifier(Modifier::BOLD);
    }
    if style.italic {
        s = s.add_modifier(Modifier::ITALIC);
    }
    if style.underline {
        s = s.add_modifier(Modifier::UNDERLINED);
    }
    if style.reverse {
        s = s.add_modifier(Modifier::REVERSED);
    }
    s
}
