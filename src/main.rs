//! mdr - Main Entry Point
//!
//! A fast markdown previewer with live in-document search. Renders a file,
//! runs a search against the rendered page, and writes the highlighted HTML.

mod app;
mod config;
mod dom;
mod error;
mod preview;
mod render;
mod search;
mod theme;
mod watcher;

use app::Previewer;
use clap::Parser;
use config::{load_config, load_config_from, Palette, Settings, Theme};
use error::{Error, Result};
use log::{info, warn};
use search::Direction;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

/// Application name constant.
const APP_NAME: &str = "mdr";

/// How often `--watch` polls for file changes.
const WATCH_INTERVAL: Duration = Duration::from_millis(200);

/// Preview a markdown file and search inside the rendered page.
#[derive(Parser, Debug)]
#[command(name = "mdr", version, about)]
struct Cli {
    /// Markdown file to preview.
    #[arg(required_unless_present = "list_themes")]
    file: Option<PathBuf>,

    /// Search the rendered page for this text.
    #[arg(long, value_name = "QUERY")]
    find: Option<String>,

    /// Match case when searching.
    #[arg(long, conflicts_with = "ignore_case")]
    case_sensitive: bool,

    /// Ignore case when searching, even if matching case is saved.
    #[arg(long, short = 'i')]
    ignore_case: bool,

    /// Step forward through matches N times.
    #[arg(long, value_name = "N", default_value_t = 0)]
    next: usize,

    /// Step backward through matches N times.
    #[arg(long, value_name = "N", default_value_t = 0)]
    prev: usize,

    /// Page theme (light, dark).
    #[arg(long)]
    theme: Option<String>,

    /// Content palette (theme, light, dark).
    #[arg(long)]
    palette: Option<String>,

    /// Font scale in percent.
    #[arg(long, value_name = "PERCENT")]
    font_scale: Option<u16>,

    /// User stylesheet from the themes directory.
    #[arg(long, value_name = "NAME")]
    css_theme: Option<String>,

    /// List the available user stylesheets and exit.
    #[arg(long)]
    list_themes: bool,

    /// Scroll to the heading with this anchor.
    #[arg(long, value_name = "ID")]
    goto: Option<String>,

    /// Use this config file instead of the platform one.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the page here instead of stdout.
    #[arg(long, short, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Keep running and re-render when the file changes.
    #[arg(long)]
    watch: bool,
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    info!("Starting {}", APP_NAME);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", APP_NAME, e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Command-line overrides apply to this run only and are never saved
    let mut settings = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config(),
    };
    apply_overrides(&cli, &mut settings);

    let mut previewer = Previewer::new(settings);
    if let Some(path) = &cli.config {
        previewer = previewer.with_config_path(path);
    }

    if cli.list_themes {
        for name in previewer.list_themes() {
            println!("{}", name);
        }
        return Ok(());
    }

    let file = cli
        .file
        .clone()
        .ok_or_else(|| Error::Application("no markdown file given".to_string()))?;
    let start = Instant::now();
    previewer.open(&file, start)?;

    if let Some(query) = &cli.find {
        previewer.open_search();
        previewer.set_query(query, start);
    }
    let mut clock = previewer.run_pending(start);

    for _ in 0..cli.next {
        previewer.navigate(Direction::Next, clock);
    }
    for _ in 0..cli.prev {
        previewer.navigate(Direction::Prev, clock);
    }
    clock = previewer.run_pending(clock);

    if let Some(id) = &cli.goto {
        if previewer.scroll_to_heading(id) {
            info!("Scrolled to #{}", id);
        } else {
            warn!("No heading with id {:?}", id);
        }
    }

    report(&previewer, cli.find.is_some());
    write_page(&previewer, cli.output.as_ref())?;

    if cli.watch {
        previewer.start_watching()?;
        info!("Watching {} for changes", file.display());
        loop {
            thread::sleep(WATCH_INTERVAL);
            let now = clock.max(Instant::now());
            if previewer.poll_file_events(now) {
                clock = previewer.run_pending(now);
                report(&previewer, cli.find.is_some());
                write_page(&previewer, cli.output.as_ref())?;
            }
        }
    }

    Ok(())
}

/// Layer command-line appearance and search flags over loaded settings.
///
/// Flags left unset keep the saved value.
fn apply_overrides(cli: &Cli, settings: &mut Settings) {
    if let Some(theme) = &cli.theme {
        settings.theme = Theme::from_name(theme);
    }
    if let Some(palette) = &cli.palette {
        settings.palette = Palette::from_name(palette);
    }
    if let Some(scale) = cli.font_scale {
        settings.font_scale = scale;
    }
    if let Some(name) = &cli.css_theme {
        settings.css_theme = name.clone();
    }
    if cli.case_sensitive {
        settings.search_case_sensitive = true;
    }
    if cli.ignore_case {
        settings.search_case_sensitive = false;
    }
}

/// Print the outline and search counter to stderr.
fn report(previewer: &Previewer, searching: bool) {
    for heading in previewer.outline() {
        let indent = "  ".repeat(usize::from(heading.level.saturating_sub(1)));
        eprintln!("{}{} (#{})", indent, heading.text, heading.id);
    }
    eprintln!(
        "{} words, {} characters",
        previewer.word_count(),
        previewer.char_count()
    );
    if searching {
        let status = previewer.search_status();
        eprintln!("{:?}: {}", status.query, status.label);
    }
}

fn write_page(previewer: &Previewer, output: Option<&PathBuf>) -> Result<()> {
    let Some(html) = previewer.html() else {
        warn!("Nothing rendered");
        return Ok(());
    };
    match output {
        Some(path) => {
            fs::write(path, html)?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", html),
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
