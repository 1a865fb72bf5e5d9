// SPDX-License-Identifier: MPL-2.0

//! Login card — nickname, PIN, and registration steps.

use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::app::App;
use crate::config::AVATARS;
use crate::state::LoginStep;
use crate::ui::centered_rect;

pub fn draw(f: &mut Frame, app: &App) {
    let area = centered_rect(f.area(), 52, 12);

    let block = Block::default()
        .title(" THE PLAZA ")
        .title_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines: Vec<Line> = vec![Line::default()];

    match app.flow.step() {
        LoginStep::Nickname => {
            lines.push(Line::from("Enter your name to join."));
            lines.push(Line::default());
            lines.push(input_line(&app.nickname_input));
            lines.push(Line::default());
            lines.push(hint_line("Enter continue   Ctrl-Q quit"));
        }
        LoginStep::Pin => {
            lines.push(Line::from(vec![
                Span::styled(
                    app.flow.nickname().to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(", enter your 4-digit PIN."),
            ]));
            lines.push(Line::default());
            lines.push(input_line(&masked(&app.pin_input)));
            lines.push(Line::default());
            lines.push(hint_line("Enter log in   Esc back   Ctrl-Q quit"));
        }
        LoginStep::Register => {
            lines.push(Line::from(
                "First time here! Pick a character and a 4-digit PIN.",
            ));
            lines.push(Line::default());
            lines.push(avatar_row(app.avatar_index));
            lines.push(Line::default());
            lines.push(input_line(&masked(&app.pin_input)));
            lines.push(Line::default());
            lines.push(hint_line("←→ character   Enter join   Esc back"));
        }
    }

    if let Some(notice) = &app.notice {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

fn input_line(value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::DarkGray)),
        Span::raw(value.to_string()),
        Span::styled("_", Style::default().fg(Color::Yellow)),
    ])
}

fn hint_line(hint: &str) -> Line<'static> {
    Line::from(Span::styled(
        hint.to_string(),
        Style::default().fg(Color::DarkGray),
    ))
}

fn masked(pin: &str) -> String {
    "*".repeat(pin.chars().count())
}

/// One button per avatar, the chosen one highlighted.
fn avatar_row(selected: usize) -> Line<'static> {
    let mut spans = Vec::with_capacity(AVATARS.len() * 2);
    for (i, avatar) in AVATARS.iter().enumerate() {
        let style = if i == selected {
            Style::default().bg(Color::Blue).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        spans.push(Span::styled(format!(" {avatar} "), style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}
