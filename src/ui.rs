//! HUD rendering: indicator strip + session list
//!
//! Everything drawn here comes out of the pure projections in [`crate::view`]
//! over the frame's registry snapshot; this module only places and colors it.

use crate::app::App;
use crate::config::colors::Palette;
use crate::registry::SessionState;
use crate::view::{self, IndicatorState, NotchState};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    prelude::*,
    style::{Modifier, Style},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

/// Main render function
pub fn render(f: &mut Frame, app: &App) {
    let palette = app.theme.palette();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // indicator strip
            Constraint::Min(4),    // session list
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    render_indicator(f, chunks[0], app, palette);
    render_session_list(f, chunks[1], app, palette);
    render_footer(f, chunks[2], palette);

    if app.show_help {
        render_help(f, palette);
    }
}

fn indicator_style(state: IndicatorState, palette: &Palette) -> (&'static str, Color) {
    match state {
        IndicatorState::Idle => ("idle", palette.idle),
        IndicatorState::Attention => ("attention", palette.attention),
        IndicatorState::Waiting => ("waiting", palette.waiting),
        IndicatorState::Running => ("running", palette.running),
    }
}

fn notch_label(state: NotchState) -> &'static str {
    match state {
        NotchState::NoSessions => "no sessions",
        NotchState::Running => "running",
        NotchState::Compacting => "compacting",
        NotchState::Idle => "idle",
        NotchState::Stale => "stale",
    }
}

fn render_indicator(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let aggregate = view::aggregate_indicator(&app.sessions);
    let (label, color) = indicator_style(aggregate, palette);

    let title = if app.sessions.is_empty() {
        format!("● {label}")
    } else {
        format!(
            "● {label} — {} session{} · {}",
            app.sessions.len(),
            if app.sessions.len() == 1 { "" } else { "s" },
            notch_label(view::notch_state(&app.sessions)),
        )
    };

    let strip = Paragraph::new(title)
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.border))
                .title(" aura "),
        );
    f.render_widget(strip, area);
}

fn state_color(state: SessionState, palette: &Palette) -> Color {
    match state {
        SessionState::Running => palette.running,
        SessionState::Idle => palette.idle,
        SessionState::Attention => palette.attention,
        SessionState::Waiting => palette.waiting,
        SessionState::Compacting => palette.compacting,
        SessionState::Stale => palette.stale,
    }
}

fn render_session_list(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let now_ms = app.now_ms();

    let items: Vec<ListItem> = app
        .sessions
        .iter()
        .map(|session| {
            let row = view::session_row(session, now_ms);
            let lines = vec![
                Line::from(vec![
                    Span::styled(
                        row.title,
                        Style::default()
                            .fg(state_color(row.state, palette))
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  {}", view::agent_badge(row.agent_kind)),
                        Style::default().fg(palette.dim),
                    ),
                ]),
                Line::from(Span::styled(
                    format!("  {}", row.subtitle),
                    Style::default().fg(palette.dim),
                )),
            ];
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.border))
                .title(" sessions "),
        )
        .highlight_style(
            Style::default()
                .fg(palette.highlight)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    let mut state = ListState::default();
    if !app.sessions.is_empty() {
        state.select(Some(app.selected));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn render_footer(f: &mut Frame, area: Rect, palette: &Palette) {
    let footer = Paragraph::new("j/k select · x remove · ? help · q quit")
        .style(Style::default().fg(palette.dim))
        .alignment(Alignment::Center);
    f.render_widget(footer, area);
}

fn render_help(f: &mut Frame, palette: &Palette) {
    let area = centered_rect(40, 9, f.area());
    let text = vec![
        Line::from("j / ↓   next session"),
        Line::from("k / ↑   previous session"),
        Line::from("x       remove session"),
        Line::from("?       toggle this help"),
        Line::from("q / Esc quit"),
    ];
    let help = Paragraph::new(text).style(Style::default().fg(palette.fg)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.highlight))
            .title(" keys "),
    );
    f.render_widget(Clear, area);
    f.render_widget(help, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}
