//! Inkmark CLI - Terminal reader with two-color highlighting

mod app;
mod config;
mod cursor;
mod io;
mod ui;

use std::fs::{self, OpenOptions};
use std::io::stdout;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use inkmark_core::{Gesture, HighlightColor, Session};

use crate::app::{App, Mode};
use crate::config::Config;
use crate::io::FileStore;

struct Args {
    file: String,
    session: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut file = None;
    let mut session = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--session" | "-s" => {
                session = Some(args.next().context("--session needs a key")?);
            }
            "--help" | "-h" => {
                println!("usage: inkmark <file> [--session KEY]");
                std::process::exit(0);
            }
            _ if file.is_none() => file = Some(arg),
            _ => bail!("unexpected argument: {}", arg),
        }
    }

    let file = file.context("usage: inkmark <file> [--session KEY]")?;
    Ok(Args { file, session })
}

/// Log to a file; the terminal belongs to the UI
fn init_logging(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())
        .with_context(|| format!("Failed to open {}", config.log_path().display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("INKMARK_LOG")
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args()?;
    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config)?;

    let document = io::load_file(&args.file, &config.highlight)?;
    let session_key = args.session.unwrap_or_else(|| document.title.clone());
    let session = Session::open_with(
        FileStore::new(config.sessions_dir()),
        &session_key,
        &config.session,
    );
    info!(file = %document.path.display(), session = %session_key, "opened document");

    let mut app = App::new(document, session, config.highlight.clone())
        .context("Failed to parse document markup")?;
    if app.containers.is_empty() {
        app.set_status("No containers found");
    } else {
        app.set_status(&format!("Loaded {} container(s)", app.containers.len()));
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, &config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if app.session.has_pending_write() {
        if let Err(e) = app.session.flush() {
            warn!(error = %e, "final highlight write failed");
            eprintln!("Warning: highlights could not be saved: {}", e);
        }
    }

    res
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App<FileStore>,
    config: &Config,
) -> Result<()> {
    while app.running {
        terminal.draw(|f| ui::draw(f, app))?;

        if let Event::Key(key) = event::read()? {
            app.clear_status();

            if app.has_prompt() {
                handle_prompt(app, key.code);
                continue;
            }
            match app.mode {
                Mode::Normal => handle_normal_mode(app, key.code, key.modifiers, config),
                Mode::Visual => handle_visual_mode(app, key.code),
                Mode::Help => {
                    app.mode = Mode::Normal;
                }
            }
        }
    }
    Ok(())
}

fn handle_normal_mode(
    app: &mut App<FileStore>,
    code: KeyCode,
    modifiers: KeyModifiers,
    config: &Config,
) {
    match code {
        KeyCode::Char('q') => app.running = false,
        KeyCode::Char('?') => app.mode = Mode::Help,

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => app.cursor.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.cursor.move_up(),
        KeyCode::Char('h') | KeyCode::Left => app.cursor.move_left(),
        KeyCode::Char('l') | KeyCode::Right => app.cursor.move_right(),
        KeyCode::Char('w') => app.cursor.move_word_forward(),
        KeyCode::Char('b') => app.cursor.move_word_back(),
        KeyCode::Char('0') => app.cursor.move_to_start(),
        KeyCode::Char('$') => app.cursor.move_to_end(),
        KeyCode::Char('g') => app.cursor.move_to_top(),
        KeyCode::Char('G') => app.cursor.move_to_bottom(),

        // Containers
        KeyCode::BackTab => app.prev_container(),
        KeyCode::Tab if modifiers.contains(KeyModifiers::SHIFT) => app.prev_container(),
        KeyCode::Tab => app.next_container(),

        // Highlight navigation
        KeyCode::Char(']') => app.next_highlight(),
        KeyCode::Char('[') => app.prev_highlight(),

        // Visual mode
        KeyCode::Char('v') => app.enter_visual_mode(),

        // Highlight actions
        KeyCode::Char('x') => {
            app.start_removal();
        }
        KeyCode::Char('t') => app.toggle_active_color(),
        KeyCode::Char('X') => app.clear_container(),

        // Export
        KeyCode::Char('e') => export(app, config),

        _ => {}
    }
}

fn handle_visual_mode(app: &mut App<FileStore>, code: KeyCode) {
    match code {
        KeyCode::Esc => app.cancel_visual_mode(),
        KeyCode::Char('j') | KeyCode::Down => app.cursor.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.cursor.move_up(),
        KeyCode::Char('h') | KeyCode::Left => app.cursor.move_left(),
        KeyCode::Char('l') | KeyCode::Right => app.cursor.move_right(),
        KeyCode::Char('w') => app.cursor.move_word_forward(),
        KeyCode::Char('b') => app.cursor.move_word_back(),
        KeyCode::Char('$') => app.cursor.move_to_end(),
        KeyCode::Enter | KeyCode::Char('a') => {
            app.finish_selection();
        }
        _ => {}
    }
}

fn handle_prompt(app: &mut App<FileStore>, code: KeyCode) {
    use crate::app::Prompt;

    let is_color_prompt = matches!(app.prompts.active, Some(Prompt::Color { .. }));
    match code {
        KeyCode::Esc => {
            app.dismiss(Gesture::Escape);
        }
        KeyCode::Char('j') | KeyCode::Char('k') | KeyCode::Up | KeyCode::Down
        | KeyCode::PageUp | KeyCode::PageDown => {
            app.dismiss(Gesture::Scroll);
        }
        KeyCode::Char('y') if is_color_prompt => {
            app.pick_color(HighlightColor::Yellow);
        }
        KeyCode::Char('g') if is_color_prompt => {
            app.pick_color(HighlightColor::Green);
        }
        KeyCode::Enter if is_color_prompt => {
            app.pick_active_color();
        }
        KeyCode::Char('c') if is_color_prompt => {
            app.dismiss(Gesture::Cancel);
        }
        KeyCode::Char('y') | KeyCode::Enter => {
            app.confirm_removal();
        }
        KeyCode::Char('n') => {
            app.dismiss(Gesture::Cancel);
        }
        _ => {}
    }
}

fn export(app: &mut App<FileStore>, config: &Config) {
    let result = app
        .render_highlighted()
        .context("Failed to render highlights")
        .and_then(|rendered| {
            if !rendered.report.skipped.is_empty() {
                warn!(
                    skipped = rendered.report.skipped.len(),
                    "some highlights no longer fit their container"
                );
            }
            io::export_markup(&config.exports_dir(), &app.title, &rendered.markup)
        });
    match result {
        Ok(path) => app.set_status(&format!("Exported to {}", path.display())),
        Err(e) => app.set_status(&format!("Export failed: {}", e)),
    }
}
