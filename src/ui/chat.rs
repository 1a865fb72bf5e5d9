// SPDX-License-Identifier: MPL-2.0

//! Chat screen — header, message list, composer, status bar.

use chrono::{DateTime, Local};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::app::App;
use crate::config::{FALLBACK_AVATAR, ROOM_TITLE};
use crate::ui::modal;

pub fn draw(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(0),    // messages
            Constraint::Length(3), // composer
            Constraint::Length(1), // status bar
        ])
        .split(f.area());

    draw_header(f, rows[0], app);
    draw_messages(f, rows[1], app);
    draw_composer(f, rows[2], app);
    draw_status(f, rows[3], app);

    modal::draw(f, app);
}

// ── Header ────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let left = format!(" 🏰 {ROOM_TITLE}");
    let right = app
        .session
        .as_ref()
        .map(|s| format!("{} {} ", s.user.avatar, s.user.nickname))
        .unwrap_or_default();

    let pad = area
        .width
        .saturating_sub(left.chars().count() as u16)
        .saturating_sub(right.chars().count() as u16);

    let line = Line::from(vec![
        Span::styled(left, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" ".repeat(pad as usize)),
        Span::raw(right),
    ]);

    f.render_widget(
        Paragraph::new(line).style(Style::default().bg(Color::DarkGray).fg(Color::White)),
        area,
    );
}

// ── Messages ──────────────────────────────────────────────────────────────

fn draw_messages(f: &mut Frame, area: Rect, app: &App) {
    let Some(session) = &app.session else {
        return;
    };

    let items: Vec<ListItem> = session
        .log
        .messages()
        .iter()
        .map(|message| {
            let avatar = message.avatar.as_deref().unwrap_or(FALLBACK_AVATAR);
            let author_style = if session.is_own(message) {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };

            let header = Line::from(vec![
                Span::raw(format!("{avatar} ")),
                Span::styled(message.nickname.clone(), author_style),
                Span::styled(
                    format!("  {}", time_label(&message.created_at)),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            let body = Line::from(format!("   {}", message.contents));

            ListItem::new(Text::from(vec![header, body]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} messages ", session.log.len()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    // Follow the newest row unless the user moved the cursor up.
    let mut state = ListState::default();
    state.select(match app.selected {
        Some(i) => Some(i),
        None if session.log.is_empty() => None,
        None => Some(session.log.len() - 1),
    });

    let highlight = if app.selected.is_some() {
        Style::default().bg(Color::Blue).fg(Color::White)
    } else {
        Style::default()
    };

    f.render_stateful_widget(
        List::new(items).highlight_style(highlight),
        inner,
        &mut state,
    );
}

/// `HH:MM` in local time, falling back to the raw clock field when the
/// timestamp doesn't parse.
fn time_label(created_at: &str) -> String {
    DateTime::parse_from_rfc3339(created_at)
        .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|_| created_at.get(11..16).unwrap_or_default().to_string())
}

// ── Composer ──────────────────────────────────────────────────────────────

fn draw_composer(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Message ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let line = Line::from(vec![
        Span::raw(app.composer.clone()),
        Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    f.render_widget(Paragraph::new(line), inner);
}

// ── Status bar ────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let (text, style) = if let Some(notice) = &app.notice {
        (notice.clone(), Style::default().fg(Color::Yellow))
    } else if app.selected.is_some() {
        (
            "Enter view profile   ↑↓ move   Esc follow live".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (
            "Enter send   ↑↓ messages   Ctrl-P my profile   Ctrl-Q quit".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    };

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(format!(" {text}"), style))),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_label_falls_back_to_the_clock_field() {
        assert_eq!(time_label("2024-05-01T12:34:00"), "12:34");
        assert_eq!(time_label("garbage"), "");
    }

    #[test]
    fn time_label_parses_server_timestamps() {
        // Parses; exact output depends on the local timezone.
        assert_eq!(time_label("2024-05-01T12:34:56.789+00:00").len(), 5);
    }
}
