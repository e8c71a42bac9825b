//! Terminal session lifecycle: raw mode, alternate screen, mouse capture.
//!
//! A thin RAII guard: `ringlog` has exactly one backend (`ratatui`/
//! `crossterm`) and no command-handoff/suspend story, so teardown just
//! needs to run regardless of how the session ends (clean shutdown or
//! fatal error).

use std::io::{self, Stdout};

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use ringlog_core::error::{Error, Result};

/// Owns the terminal for the process's lifetime; `Drop` restores it
/// unconditionally, including on panic unwind, so a `Filter` panic still
/// leaves the shell usable.
pub struct TerminalGuard {
    pub terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        crossterm::terminal::enable_raw_mode().map_err(|e| Error::Terminal(e.to_string()))?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, crossterm::event::EnableMouseCapture)
            .map_err(|e| Error::Terminal(e.to_string()))?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend).map_err(|e| Error::Terminal(e.to_string()))?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::event::DisableMouseCapture
        );
        let _ = self.terminal.show_cursor();
    }
}
