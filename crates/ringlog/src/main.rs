//! Entry point: parse flags, load configuration, build the Reader and the
//! BufferWindow, and run the TUI until the user quits.
//!
//! Resolves config, opens the named files (and stdin, if piped), picks a
//! parser, then hands off to the screen loop. Exit codes: `0` on a clean
//! quit, `2` when a named file cannot be opened, `3` on a terminal
//! lifecycle failure.

mod app;
mod cli;
mod line;
mod logging;
mod palette;
mod terminal;
mod ui;

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use ringlog_core::buffer_window::BufferWindow;
use ringlog_core::config::Config;
use ringlog_core::error::Error;
use ringlog_core::reader::{MultiReader, PipeReader, Reader, TailedFileReader};

use crate::app::App;
use crate::cli::Cli;
use crate::line::RenderedLine;
use crate::terminal::TerminalGuard;
use crate::ui;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config_path();
    let file_config = match Config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ringlog: {e}");
            return ExitCode::from(2);
        }
    };
    let config = cli.merge(file_config);

    if let Err(e) = logging::init(&config.log_level, &logging::default_log_path()) {
        eprintln!("ringlog: failed to initialize logging: {e}");
        // Logging failure is not fatal to the viewer itself.
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("ringlog: failed to start async runtime: {e}");
            return ExitCode::from(3);
        }
    };

    match runtime.block_on(run(cli, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ Error::Reader(_)) => {
            eprintln!("ringlog: {e}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("ringlog: {e}");
            ExitCode::from(3)
        }
    }
}

async fn run(cli: Cli, config: Config) -> ringlog_core::error::Result<()> {
    let readers = build_readers(&cli, &config)?;
    let reader: Box<dyn Reader> = match readers.len() {
        0 => {
            tracing::warn!("no input sources; reading stdin by default");
            Box::new(PipeReader::new(config.line_size))
        }
        1 => readers.into_iter().next().unwrap(),
        _ => Box::new(MultiReader::new(readers.into_iter().map(Arc::from).collect())),
    };

    let parser = select_parser(&config);
    let window_capacity = cli.window_size.unwrap_or_else(|| {
        crossterm::terminal::size()
            .map(|(_, h)| (h as usize).saturating_sub(2).max(1))
            .unwrap_or(24)
    });

    let bw = Arc::new(BufferWindow::new(config.ring_size, window_capacity, reader, parser));

    let color = ui::ColorConfig {
        no_color: config.no_color,
        fg_source: config.fg_source_color,
        bg_source: config.bg_source_color,
    };

    let mut guard = TerminalGuard::enter()?;
    let app = App::new(bw, color);
    let result = app.run(&mut guard.terminal).await;
    drop(guard);
    result
}

fn build_readers(cli: &Cli, config: &Config) -> ringlog_core::error::Result<Vec<Box<dyn Reader>>> {
    let mut readers: Vec<Box<dyn Reader>> = Vec::new();

    for path in &cli.files {
        let tail_lines = config.ring_size as u64;
        let reader = TailedFileReader::open(path, tail_lines, config.line_size)?;
        readers.push(Box::new(reader));
    }

    if !std::io::stdin().is_terminal() {
        readers.push(Box::new(PipeReader::new(config.line_size)));
    }

    Ok(readers)
}

fn select_parser(config: &Config) -> impl Fn(ringlog_core::line::SourceId, &str) -> RenderedLine + Send + Sync + 'static {
    let json = config.json;
    let no_ansi = config.no_ansi;
    move |source, raw| {
        if json {
            line::parse_json(source, raw)
        } else if no_ansi {
            line::parse_plain(source, raw)
        } else {
            line::parse_ansi(source, raw)
        }
    }
}
