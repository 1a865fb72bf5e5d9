// SPDX-License-Identifier: MPL-2.0

//! Profile modals drawn over the chat screen.

use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use unicode_segmentation::UnicodeSegmentation;

use crate::app::{App, Modal};
use crate::config::STATUS_MESSAGE_MAX;
use crate::supabase::User;
use crate::ui::centered_rect;

pub fn draw(f: &mut Frame, app: &App) {
    match &app.modal {
        Some(Modal::MyProfile) => draw_my_profile(f, app),
        Some(Modal::PeerProfile(user)) => draw_peer_profile(f, user),
        None => {}
    }
}

fn draw_my_profile(f: &mut Frame, app: &App) {
    let Some(session) = &app.session else {
        return;
    };

    let area = centered_rect(f.area(), 48, 10);
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" MY PROFILE ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let used = app.status_input.graphemes(true).count();

    let lines = vec![
        Line::default(),
        Line::from(Span::styled(
            format!("{} {}", session.user.avatar, session.user.nickname),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(vec![
            Span::styled("Status message ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!("({used}/{STATUS_MESSAGE_MAX})"),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::DarkGray)),
            Span::raw(app.status_input.clone()),
            Span::styled("_", Style::default().fg(Color::Yellow)),
        ]),
        Line::default(),
        Line::from(Span::styled(
            "Enter save   Esc close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_peer_profile(f: &mut Frame, user: &User) {
    let area = centered_rect(f.area(), 48, 9);
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" PROFILE ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let status = if user.status_message.is_empty() {
        Span::styled(
            "This adventurer is hiding their identity...",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Span::raw(user.status_message.clone())
    };

    let lines = vec![
        Line::default(),
        Line::from(Span::styled(
            format!("{} {}", user.avatar, user.nickname),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "MESSAGE",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(status),
        Line::default(),
        Line::from(Span::styled(
            "Esc close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    f.render_widget(Paragraph::new(lines), inner);
}
