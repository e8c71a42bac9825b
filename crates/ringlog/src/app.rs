//! The event loop: turns keyboard/mouse/resize events into
//! [`ringlog_core::buffer_window::BufferWindow`] calls and redraws.
//!
//! One task polls input, one (or more, via `MultiReader`) reads lines, one
//! drains a coalescing redraw signal, all multiplexed as `tokio` tasks with
//! `select!`.

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;

use ringlog_core::buffer_window::BufferWindow;

use crate::line::RenderedLine;
use crate::ui;

/// Horizontal scroll position. Renderer-local: left/right scrolling is not
/// a core buffer operation, unlike the vertical `move`/`follow`/`locked`
/// state the core tracks.
#[derive(Debug, Default)]
struct Position {
    offset: usize,
    max_offset: usize,
}

impl Position {
    fn add(&mut self, delta: i64) {
        let new = i64::try_from(self.offset).unwrap_or(i64::MAX) + delta;
        self.offset = new.clamp(0, i64::try_from(self.max_offset).unwrap_or(i64::MAX)) as usize;
    }

    fn set(&mut self, value: usize) {
        self.offset = value.min(self.max_offset);
    }

    fn set_max(&mut self, max: usize) {
        self.max_offset = max;
        if self.offset > max {
            self.offset = max;
        }
    }
}

/// Application state driving the render loop.
pub struct App {
    bw: Arc<BufferWindow<RenderedLine>>,
    position: Position,
    should_quit: bool,
    color: ui::ColorConfig,
}

impl App {
    #[must_use]
    pub fn new(bw: Arc<BufferWindow<RenderedLine>>, color: ui::ColorConfig) -> Self {
        Self {
            bw,
            position: Position::default(),
            should_quit: false,
            color,
        }
    }

    /// Run the full event loop until shutdown. Owns the terminal via
    /// `terminal`; tears it down (via `TerminalGuard`'s `Drop`) when this
    /// returns, regardless of why.
    pub async fn run(
        mut self,
        terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    ) -> ringlog_core::error::Result<()> {
        let (redraw_tx, mut redraw_rx) = mpsc::channel::<()>(1);
        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<Event>();

        // Input-event task: crossterm's poll/read is blocking, so it runs on
        // a dedicated blocking thread and forwards events over a channel.
        let input_task = tokio::task::spawn_blocking(move || loop {
            match crossterm::event::poll(Duration::from_millis(100)) {
                Ok(true) => {
                    if let Ok(ev) = crossterm::event::read() {
                        if input_tx.send(ev).is_err() {
                            return;
                        }
                    }
                }
                Ok(false) => continue,
                Err(_) => return,
            }
        });

        // Producer task: drives BufferWindow::read_one() until end-of-stream.
        // EndOfStream is not fatal: the UI stays usable over the frozen
        // history, it simply stops receiving new redraw signals from this
        // source.
        let producer_bw = Arc::clone(&self.bw);
        let producer_redraw = redraw_tx.clone();
        let producer_task = tokio::spawn(async move {
            loop {
                match producer_bw.read_one().await {
                    Ok(changed) => {
                        if changed {
                            let _ = producer_redraw.try_send(());
                        }
                    }
                    Err(ringlog_core::error::Error::EndOfStream) => {
                        tracing::info!("reader reached end of stream");
                        return;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "transient reader error");
                        tokio::time::sleep(Duration::from_millis(200)).await;
                    }
                }
            }
        });

        self.redraw(terminal)?;
        let _ = redraw_tx.try_send(());

        loop {
            tokio::select! {
                Some(()) = redraw_rx.recv() => {
                    // Coalesce: drain any further pending signals so a burst
                    // of producer pushes collapses to one redraw.
                    while redraw_rx.try_recv().is_ok() {}
                    self.redraw(terminal)?;
                }
                Some(ev) = input_rx.recv() => {
                    self.handle_event(ev);
                    if self.should_quit {
                        break;
                    }
                    self.redraw(terminal)?;
                }
                else => break,
            }
        }

        input_task.abort();
        producer_task.abort();
        Ok(())
    }

    fn redraw(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    ) -> ringlog_core::error::Result<()> {
        let snapshot = self.bw.snapshot();
        let max_width = snapshot
            .iter()
            .map(ringlog_core::line::Line::display_len)
            .max()
            .unwrap_or(0);
        let area_width = crossterm::terminal::size().map(|(w, _)| w as usize).unwrap_or(80);
        self.position
            .set_max(max_width.saturating_sub(area_width.min(max_width.max(1))));

        let input = self.bw.filter_input();
        let following = self.bw.is_following();
        let locked = self.bw.is_locked();
        let total = self.bw.total_lines();
        let (cap, len) = self.bw.window_size();

        terminal
            .draw(|frame| {
                ui::draw(
                    frame,
                    &snapshot,
                    self.position.offset,
                    &input,
                    ui::Status {
                        following,
                        locked,
                        total_lines: total,
                        window_capacity: cap,
                        window_len: len,
                    },
                    self.color,
                );
            })
            .map_err(|e| ringlog_core::error::Error::Terminal(e.to_string()))?;
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            // Width affects rendering only; the Window's capacity tracks
            // the view's height (filter row and status row excluded).
            Event::Resize(_w, h) => self.bw.resize(h.saturating_sub(2) as usize),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            self.handle_ctrl(key.code);
            return;
        }

        let factor: i64 = if key.modifiers.contains(KeyModifiers::ALT) { 5 } else { 1 };

        match key.code {
            KeyCode::Up => self.move_view(factor),
            KeyCode::Down => self.move_view(-factor),
            KeyCode::Right => self.position.add(2 * factor),
            KeyCode::Left => self.position.add(-2 * factor),
            KeyCode::Backspace => {
                let mut input = self.bw.filter_input();
                input.pop();
                self.bw.set_filter(&input);
            }
            KeyCode::Enter => self.jump_to_newest(),
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(c) if c.is_ascii_graphic() || c == ' ' => {
                let mut input = self.bw.filter_input();
                input.push(c);
                self.bw.set_filter(&input);
            }
            _ => {}
        }
    }

    fn handle_ctrl(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('c') => self.should_quit = true,
            KeyCode::Char('a') => self.position.set(0),
            KeyCode::Char('e') => self.position.set(self.position.max_offset),
            KeyCode::Char('l') => self.bw.clear(),
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.move_view(1),
            MouseEventKind::ScrollDown => self.move_view(-1),
            MouseEventKind::ScrollLeft => self.position.add(-2),
            MouseEventKind::ScrollRight => self.position.add(2),
            _ => {}
        }
    }

    fn move_view(&mut self, n: i64) {
        self.bw.move_by(n);
        if n > 0 {
            self.bw.set_locked(true);
        }
    }

    fn jump_to_newest(&mut self) {
        self.bw.move_to_newest();
        self.bw.set_locked(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_clamps_to_max_offset() {
        let mut p = Position::default();
        p.set_max(10);
        p.add(100);
        assert_eq!(p.offset, 10);
        p.add(-1000);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn position_set_clamps_to_max() {
        let mut p = Position::default();
        p.set_max(5);
        p.set(100);
        assert_eq!(p.offset, 5);
    }

    #[test]
    fn position_lowers_offset_when_max_shrinks() {
        let mut p = Position::default();
        p.set_max(10);
        p.set(10);
        p.set_max(3);
        assert_eq!(p.offset, 3);
    }
}
