//! Terminal UI rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

use inkmark_core::{HighlightColor, KeyValueStore};

use crate::app::{preview, App, Mode, Prompt};

// Catppuccin Mocha colors
const BASE: Color = Color::Rgb(30, 30, 46);
const SURFACE0: Color = Color::Rgb(49, 50, 68);
const SURFACE1: Color = Color::Rgb(69, 71, 90);
const TEXT: Color = Color::Rgb(205, 214, 244);
const SUBTEXT0: Color = Color::Rgb(166, 173, 200);
const RED: Color = Color::Rgb(243, 139, 168);
const YELLOW: Color = Color::Rgb(249, 226, 175);
const GREEN: Color = Color::Rgb(166, 227, 161);
const BLUE: Color = Color::Rgb(137, 180, 250);
const MAUVE: Color = Color::Rgb(203, 166, 247);

pub fn draw<S: KeyValueStore>(frame: &mut Frame, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_title_bar(frame, app, chunks[0]);
    draw_main_area(frame, app, chunks[1]);
    draw_status_bar(frame, app, chunks[2]);

    match &app.prompts.active {
        Some(Prompt::Color { text }) => draw_color_prompt(frame, app, text),
        Some(Prompt::Remove { text, color }) => draw_removal_prompt(frame, text, *color),
        None => {}
    }
    if app.mode == Mode::Help {
        draw_help(frame);
    }
}

fn draw_title_bar<S: KeyValueStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let container = app.current_container().unwrap_or("-");
    let title_text = format!(
        " Inkmark - {} [{} {}/{}] session {}",
        app.title,
        container,
        if app.containers.is_empty() { 0 } else { app.current + 1 },
        app.containers.len(),
        app.session.key(),
    );

    let title_bar = Paragraph::new(title_text).style(Style::default().fg(TEXT).bg(SURFACE0));

    frame.render_widget(title_bar, area);
}

fn draw_main_area<S: KeyValueStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Reader
            Constraint::Length(32), // Sidebar
        ])
        .split(area);

    draw_reader(frame, app, chunks[0]);
    draw_sidebar(frame, app, chunks[1]);
}

fn draw_reader<S: KeyValueStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let mode_indicator = match app.mode {
        Mode::Visual => " [VISUAL]",
        _ => "",
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BLUE))
        .title(format!("Reader{}", mode_indicator));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let selection = app.selection_range();
    let cursor_offset = app.cursor.offset();
    let mut lines: Vec<Line> = Vec::new();
    let mut line_start = 0;

    for line_text in app.content_lines() {
        let mut spans: Vec<Span> = Vec::new();

        for (col, ch) in line_text.chars().enumerate() {
            let offset = line_start + col;
            let mut style = Style::default().fg(TEXT);

            if let Some(annotation) = app.highlight_at(offset) {
                style = style.fg(BASE).bg(highlight_color(annotation.color));
            }
            if let Some((sel_start, sel_end)) = selection {
                if offset >= sel_start && offset < sel_end {
                    style = style.fg(TEXT).bg(SURFACE1).add_modifier(Modifier::BOLD);
                }
            }
            if offset == cursor_offset {
                style = style.add_modifier(Modifier::REVERSED);
            }

            spans.push(Span::styled(ch.to_string(), style));
        }
        if line_start + line_text.chars().count() == cursor_offset {
            spans.push(Span::styled(" ", Style::default().add_modifier(Modifier::REVERSED)));
        }

        lines.push(Line::from(spans));
        line_start += line_text.chars().count() + 1; // +1 for newline
    }

    // Scroll so the cursor row stays visible
    let (row, col) = app.cursor.cursor();
    let visible_height = inner.height as usize;
    let scroll_offset = if row >= visible_height {
        row - visible_height + 1
    } else {
        0
    };

    let paragraph = Paragraph::new(lines).scroll((scroll_offset as u16, 0));
    frame.render_widget(paragraph, inner);

    let cursor_y = inner.y + (row - scroll_offset) as u16;
    let cursor_x = inner.x + col as u16;
    if cursor_x < inner.right() && cursor_y < inner.bottom() {
        frame.set_cursor_position(Position::new(cursor_x, cursor_y));
    }
}

fn draw_sidebar<S: KeyValueStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let highlights = app.highlights();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(SUBTEXT0))
        .title(format!("Highlights ({})", highlights.len()));

    let items: Vec<ListItem> = highlights
        .iter()
        .enumerate()
        .map(|(i, annotation)| {
            let selected = i == app.highlight_selected;
            let marker = if selected { ">" } else { " " };

            let line1 = format!(
                "{} {}..{}",
                marker, annotation.range.start_offset, annotation.range.end_offset
            );
            let line2 = format!("   \"{}\"", preview(&annotation.source_text, 22));

            let style = if selected {
                Style::default().fg(TEXT).bg(SURFACE1)
            } else {
                Style::default().fg(TEXT)
            };

            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(line1, style),
                    Span::raw(" "),
                    Span::styled(
                        annotation.color.as_str(),
                        Style::default().fg(highlight_color(annotation.color)),
                    ),
                ]),
                Line::from(Span::styled(line2, style.fg(SUBTEXT0))),
            ])
        })
        .collect();

    let list = List::new(items).block(block);
    frame.render_widget(list, area);
}

fn draw_status_bar<S: KeyValueStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let mode_str = match (&app.prompts.active, app.mode) {
        (Some(Prompt::Color { .. }), _) => "COLOR",
        (Some(Prompt::Remove { .. }), _) => "REMOVE",
        (None, Mode::Normal) => "NORMAL",
        (None, Mode::Visual) => "VISUAL",
        (None, Mode::Help) => "HELP",
    };

    let status = app.status_message.as_deref().unwrap_or("");
    let help_hint = "v select | x remove | Tab container | e export | ? help";
    let pending = if app.session.has_pending_write() {
        " | unsaved"
    } else {
        ""
    };

    let line = Line::from(vec![
        Span::raw(format!(" {} | ", mode_str)),
        Span::styled(
            app.session.active_color().as_str(),
            Style::default().fg(highlight_color(app.session.active_color())),
        ),
        Span::raw(format!(
            "{} | {}",
            pending,
            if status.is_empty() { help_hint } else { status }
        )),
    ]);

    let status_bar = Paragraph::new(line).style(Style::default().fg(SUBTEXT0).bg(SURFACE0));

    frame.render_widget(status_bar, area);
}

fn draw_color_prompt<S: KeyValueStore>(frame: &mut Frame, app: &App<S>, text: &str) {
    let area = centered_rect(44, 7, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(MAUVE))
        .title("Highlight selection");

    let active = app.session.active_color();
    let body = vec![
        Line::from(Span::styled(
            format!("\"{}\"", preview(text, 36)),
            Style::default().fg(TEXT),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(" y ", Style::default().fg(BASE).bg(YELLOW)),
            Span::raw(" yellow   "),
            Span::styled(" g ", Style::default().fg(BASE).bg(GREEN)),
            Span::raw(" green"),
        ]),
        Line::from(Span::styled(
            format!("Enter {}, Esc cancel", active),
            Style::default().fg(SUBTEXT0),
        )),
    ];

    frame.render_widget(Paragraph::new(body).block(block), area);
}

fn draw_removal_prompt(frame: &mut Frame, text: &str, color: HighlightColor) {
    let area = centered_rect(44, 6, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(RED))
        .title("Remove highlight?");

    let body = vec![
        Line::from(Span::styled(
            format!("\"{}\"", preview(text, 36)),
            Style::default().fg(BASE).bg(highlight_color(color)),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "y/Enter remove, n/Esc keep",
            Style::default().fg(SUBTEXT0),
        )),
    ];

    frame.render_widget(Paragraph::new(body).block(block), area);
}

fn draw_help(frame: &mut Frame) {
    let area = centered_rect(60, 20, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BLUE))
        .title("Help (press any key to close)");

    let heading = Style::default().fg(MAUVE).add_modifier(Modifier::BOLD);
    let help_text = vec![
        Line::from(Span::styled("Navigation", heading)),
        Line::from("  h/j/k/l  Move cursor"),
        Line::from("  w/b      Next/prev word"),
        Line::from("  g/G      Go to top/bottom"),
        Line::from("  Tab      Next container (S-Tab prev)"),
        Line::from("  ]/[      Next/prev highlight"),
        Line::from(""),
        Line::from(Span::styled("Highlights", heading)),
        Line::from("  v        Start selection, Enter to finish"),
        Line::from("  y/g      Pick yellow/green in the prompt"),
        Line::from("  x        Remove highlight under cursor"),
        Line::from("  t        Toggle active color"),
        Line::from("  X        Clear container"),
        Line::from(""),
        Line::from(Span::styled("File", heading)),
        Line::from("  e        Export highlighted markup"),
        Line::from("  q        Quit"),
    ];

    let paragraph = Paragraph::new(help_text).block(block);
    frame.render_widget(paragraph, area);
}

fn highlight_color(color: HighlightColor) -> Color {
    match color {
        HighlightColor::Yellow => YELLOW,
        HighlightColor::Green => GREEN,
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
