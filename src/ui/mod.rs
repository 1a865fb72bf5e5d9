// SPDX-License-Identifier: MPL-2.0

//! TUI rendering — one draw function per screen, modals on top.

mod chat;
mod login;
mod modal;

use ratatui::Frame;
use ratatui::layout::Rect;

use crate::app::{App, Screen};

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
    match app.screen {
        Screen::Login => login::draw(f, app),
        Screen::Chat => chat::draw(f, app),
    }
}

/// A `width` × `height` rect centered in `area`, clamped to fit.
fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
